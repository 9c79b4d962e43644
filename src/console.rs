//! Operator-facing console output.
//!
//! stdout carries only the chat display (`server:hello`, `client:hello`);
//! logs go to stderr through `tracing`.

use std::io::Write;

/// Write a line to stdout.
///
/// Writes the string followed by a single `\n` and flushes, holding the
/// stdout lock so lines from concurrent connections never interleave.
///
/// # Errors
///
/// Returns IO error if write or flush fails.
pub fn write_stdout_line(line: &str) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(line.as_bytes())?;
    handle.write_all(b"\n")?;
    handle.flush()?;
    Ok(())
}

/// Whether an input line asks the client to stop (`exit`, any case).
pub fn is_exit_command(line: &str) -> bool {
    line.eq_ignore_ascii_case("exit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_stdout_line_does_not_panic() {
        assert!(write_stdout_line("server:test").is_ok());
    }

    #[test]
    fn test_exit_command_case_insensitive() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("EXIT"));
        assert!(is_exit_command("eXiT"));
    }

    #[test]
    fn test_exit_command_exact() {
        assert!(!is_exit_command("exit now"));
        assert!(!is_exit_command(" exit"));
        assert!(!is_exit_command(""));
        assert!(!is_exit_command("quit"));
    }
}
