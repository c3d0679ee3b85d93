//! Error types for the optimizer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    #[error("Search cancelled")]
    Cancelled,

    #[error("Worker disconnected before replying")]
    WorkerLost,

    #[error("Timed out after {0} seconds waiting for a candidate")]
    Timeout(u64),

    #[error("Unsupported snapshot: {0}")]
    UnsupportedSnapshot(String),

    #[error("Committed {committed} bytes but the candidate cost was {cost}")]
    CommitMismatch { cost: f64, committed: u64 },
}

impl Error {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }

    /// Whether this error is the cooperative cancellation condition.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::parse(3, "unexpected 'end'");
        assert_eq!(err.to_string(), "Parse error at line 3: unexpected 'end'");

        let err = Error::CommitMismatch {
            cost: 12.0,
            committed: 13,
        };
        assert_eq!(
            err.to_string(),
            "Committed 13 bytes but the candidate cost was 12"
        );
    }

    #[test]
    fn test_is_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::WorkerLost.is_cancelled());
    }

    #[test]
    fn test_from_serde_json() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
