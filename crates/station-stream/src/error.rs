use std::time::Duration;
use thiserror::Error;

/// Why a streaming turn failed.
///
/// The session controller picks its user-visible wording from [`FailureKind`],
/// so the variants here stay close to what actually went wrong on the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("No frame received within {}ms", after.as_millis())]
    Timeout { after: Duration },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Server responded with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Coarse classification used to pick the inline failure notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NoResponse,
    ConnectionFailed,
    MalformedResponse,
}

impl StreamError {
    pub fn kind(&self) -> FailureKind {
        match self {
            StreamError::Timeout { .. } => FailureKind::NoResponse,
            StreamError::Connection(_) | StreamError::Http { .. } => FailureKind::ConnectionFailed,
            StreamError::Protocol(_) => FailureKind::MalformedResponse,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StreamError::Timeout { .. })
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        StreamError::Connection(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let timeout = StreamError::Timeout { after: Duration::from_secs(10) };
        assert_eq!(timeout.kind(), FailureKind::NoResponse);
        assert!(timeout.is_timeout());

        let http = StreamError::Http { status: 502, body: "bad gateway".to_string() };
        assert_eq!(http.kind(), FailureKind::ConnectionFailed);

        let protocol = StreamError::Protocol("not json".to_string());
        assert_eq!(protocol.kind(), FailureKind::MalformedResponse);
        assert!(!protocol.is_timeout());
    }

    #[test]
    fn test_timeout_display() {
        let err = StreamError::Timeout { after: Duration::from_millis(1500) };
        assert_eq!(err.to_string(), "No frame received within 1500ms");
    }
}
