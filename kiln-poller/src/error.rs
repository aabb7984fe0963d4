//! Error types for polling operations

use kiln_client::ClientError;
use thiserror::Error;

/// Why a single poll attempt did not produce a terminal snapshot
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The status query itself failed (network, HTTP status or decoding)
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The query succeeded but the job is still running
    #[error("job not done yet (status {status})")]
    NotDoneYet { status: u16 },

    /// The service answered but refused the status request
    #[error("status request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Terminal failure of a polling operation
///
/// Cancellation is not an error and never shows up here.
#[derive(Debug, Error)]
pub enum PollError {
    /// The retry budget was spent before the job reached a terminal status
    #[error("generation service never finished after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: AttemptError,
    },

    /// A failure that retrying cannot fix
    #[error(transparent)]
    Fatal(ClientError),

    /// The polling task stopped unexpectedly
    #[error("polling task aborted: {0}")]
    Aborted(String),
}

impl PollError {
    /// Classification exposed to presentation layers
    pub fn kind(&self) -> ErrorKind {
        match self {
            PollError::Exhausted { .. } => ErrorKind::Exhausted,
            PollError::Fatal(err) => ErrorKind::from(err),
            PollError::Aborted(_) => ErrorKind::Aborted,
        }
    }

    /// The last underlying failure, for exhausted operations
    pub fn last_error(&self) -> Option<&AttemptError> {
        match self {
            PollError::Exhausted { last, .. } => Some(last),
            _ => None,
        }
    }
}

/// Coarse error category shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The service never finished the job
    Exhausted,
    /// The service could not be reached
    Transport,
    /// The service answered with something unreadable
    Decode,
    /// The service refused the request
    Rejected,
    /// A reference image could not be uploaded
    Upload,
    InvalidRequest,
    Aborted,
}

impl From<&ClientError> for ErrorKind {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Api { .. } => ErrorKind::Transport,
            ClientError::Decode(_) => ErrorKind::Decode,
            ClientError::Rejected { .. } => ErrorKind::Rejected,
            ClientError::Upload(_) => ErrorKind::Upload,
            ClientError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ErrorKind::Exhausted => "service never finished",
            ErrorKind::Transport => "network unreachable",
            ErrorKind::Decode => "unreadable response",
            ErrorKind::Rejected => "request rejected",
            ErrorKind::Upload => "upload failed",
            ErrorKind::InvalidRequest => "invalid request",
            ErrorKind::Aborted => "polling aborted",
        };
        f.write_str(text)
    }
}
