//! Transport module - TCP listen/connect.
//!
//! The pipeline sees only byte chunks; this is the only place sockets are
//! created.

mod tcp;

pub use tcp::{connect, listen};
