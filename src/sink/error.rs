//! Report sink error types and handling

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors raised by a report sink
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    /// Operation attempted before `open` or after `close`
    #[error("Sink is not connected")]
    NotConnected,
    /// Connection to the tracking server could not be established
    #[error("Connection to {endpoint} failed: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },
    /// Writing a report failed
    #[error("Send failed: {reason}")]
    SendFailed { reason: String },
    /// Pushing buffered data to the server failed
    #[error("Flush failed: {reason}")]
    FlushFailed { reason: String },
    /// Shutting down the connection failed
    #[error("Close failed: {reason}")]
    CloseFailed { reason: String },
    /// Report could not be encoded
    #[error("Encoding failed: {reason}")]
    Encoding { reason: String },
}

/// Recovery strategy for sink failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecoveryStrategy {
    /// Retry the operation on the same connection
    Retry,
    /// Fail permanently
    Fail,
}

impl SinkError {
    /// Get the recommended recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            SinkError::SendFailed { .. } => RecoveryStrategy::Retry,
            SinkError::FlushFailed { .. } => RecoveryStrategy::Retry,
            SinkError::NotConnected => RecoveryStrategy::Fail,
            SinkError::ConnectionFailed { .. } => RecoveryStrategy::Fail,
            SinkError::CloseFailed { .. } => RecoveryStrategy::Fail,
            SinkError::Encoding { .. } => RecoveryStrategy::Fail,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.recovery_strategy(), RecoveryStrategy::Fail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_classification() {
        let send = SinkError::SendFailed {
            reason: "broken pipe".to_string(),
        };
        assert!(send.is_recoverable());
        assert!(!SinkError::NotConnected.is_recoverable());

        let conn = SinkError::ConnectionFailed {
            endpoint: "localhost:8087".to_string(),
            reason: "refused".to_string(),
        };
        assert_eq!(conn.recovery_strategy(), RecoveryStrategy::Fail);
        assert_eq!(conn.to_string(), "Connection to localhost:8087 failed: refused");
    }
}
