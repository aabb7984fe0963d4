//! Terminal output helpers

use colored::*;
use kiln_core::domain::status::{StatusSnapshot, TERMINAL_STATUS};
use kiln_poller::{AttemptError, ErrorKind, PollError};

/// Colorize an application status code
pub fn colorize_status(status: u16) -> ColoredString {
    if status >= TERMINAL_STATUS {
        status.to_string().green()
    } else if status >= 50 {
        status.to_string().cyan()
    } else {
        status.to_string().yellow()
    }
}

/// Print one progress line for a snapshot
pub fn print_snapshot(snapshot: &StatusSnapshot) {
    let time = snapshot.received_at.format("%H:%M:%S").to_string();

    if snapshot.is_accepted() {
        println!(
            "  {} [{}] status {}",
            "▸".cyan(),
            time.dimmed(),
            colorize_status(snapshot.application_status)
        );
    } else {
        println!(
            "  {} [{}] service answered {}: {}",
            "▸".red(),
            time.dimmed(),
            snapshot.http_status,
            snapshot.message.as_deref().unwrap_or("no message").dimmed()
        );
    }
}

/// Print the outputs of a finished job
pub fn print_outputs(snapshot: &StatusSnapshot) {
    if let Some(prompt) = snapshot.prompt() {
        println!("  Prompt: {}", prompt.dimmed());
    }

    let outputs = snapshot.outputs();
    if outputs.is_empty() {
        println!("{}", "Job finished without outputs.".yellow());
        return;
    }

    println!("{}", format!("Job finished with {} output(s):", outputs.len()).bold());
    for url in outputs {
        println!("  {} {}", "•".green(), url);
    }
}

/// One-line reason for a failed operation
///
/// Exhausted operations also name what the last attempt ran into.
pub fn failure_message(error: &PollError) -> String {
    match error.last_error() {
        Some(AttemptError::Client(last)) => {
            format!("{} ({}): {}", error.kind(), ErrorKind::from(last), error)
        }
        _ => format!("{}: {}", error.kind(), error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_client::ClientError;

    #[test]
    fn test_failure_message_names_last_cause() {
        let error = PollError::Exhausted {
            attempts: 11,
            last: AttemptError::Client(ClientError::api_error(503, "unavailable")),
        };
        let message = failure_message(&error);
        assert!(message.starts_with("service never finished (network unreachable)"));
        assert!(message.contains("11 attempts"));
    }

    #[test]
    fn test_failure_message_for_fatal_error() {
        let error = PollError::Fatal(ClientError::Upload("file too large".into()));
        assert!(failure_message(&error).starts_with("upload failed: "));
    }
}
