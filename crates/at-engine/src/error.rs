//! Error types for the engine

use at_detect::DetectError;
use at_protocol::Rejection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can end a modem operation
#[derive(Debug, Error)]
pub enum ModemError {
    /// The serial port could not be opened
    #[error("failed to open serial port {port}: {reason}")]
    PortOpen { port: String, reason: String },

    /// The initial `AT` test got no answer
    #[error("modem not responding: {reason}")]
    ModemUnresponsive { reason: String },

    /// No terminal token arrived before the deadline
    #[error("{command}: timeout after {after_ms}ms")]
    Timeout {
        command: String,
        after_ms: u64,
        /// Bytes received before the deadline
        partial: String,
    },

    /// The operation was cancelled
    #[error("{command}: cancelled")]
    Cancelled {
        command: String,
        /// Bytes received before cancellation
        partial: String,
    },

    /// The modem never asked for the message body
    #[error("modem did not provide the SMS input prompt {attempted}")]
    NoInputPrompt { attempted: &'static str },

    /// Writing to the port failed
    #[error("write failed: {reason}")]
    WriteFailure { reason: String },

    /// The modem refused the message
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// Ports could not be listed
    #[error(transparent)]
    Enumeration(#[from] DetectError),
}

impl ModemError {
    /// Failure category reported to callers
    pub fn kind(&self) -> FailureKind {
        match self {
            ModemError::PortOpen { .. } => FailureKind::PortOpenFailure,
            ModemError::ModemUnresponsive { .. } => FailureKind::ModemUnresponsive,
            ModemError::Timeout { .. } => FailureKind::Timeout,
            ModemError::Cancelled { .. } => FailureKind::Cancelled,
            ModemError::NoInputPrompt { .. } => FailureKind::NoInputPrompt,
            ModemError::WriteFailure { .. } => FailureKind::WriteFailure,
            ModemError::Rejected(rejection) if rejection.is_balance() => {
                FailureKind::InsufficientBalance
            }
            ModemError::Rejected(Rejection::IncompleteResponse) => FailureKind::IncompleteResponse,
            ModemError::Rejected(_) => FailureKind::ProtocolError,
            ModemError::Enumeration(_) => FailureKind::PortEnumeration,
        }
    }

    /// Whether this error came from the cancellation token
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ModemError::Cancelled { .. })
    }

    /// Response text received before a timeout or cancellation
    pub fn partial(&self) -> Option<&str> {
        match self {
            ModemError::Timeout { partial, .. } | ModemError::Cancelled { partial, .. } => {
                Some(partial)
            }
            _ => None,
        }
    }
}

/// Failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    PortOpenFailure,
    ModemUnresponsive,
    Timeout,
    Cancelled,
    NoInputPrompt,
    WriteFailure,
    ProtocolError,
    InsufficientBalance,
    IncompleteResponse,
    PortEnumeration,
}

/// A classified failure as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&ModemError> for Failure {
    fn from(err: &ModemError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_kinds() {
        let balance = ModemError::Rejected(Rejection::BalanceOrBlocked {
            code: "1".into(),
            description: "Unassigned (unallocated) number",
        });
        assert_eq!(balance.kind(), FailureKind::InsufficientBalance);

        let incomplete = ModemError::Rejected(Rejection::IncompleteResponse);
        assert_eq!(incomplete.kind(), FailureKind::IncompleteResponse);

        let cms = ModemError::Rejected(Rejection::Cms {
            code: "96".into(),
            description: "Invalid mandatory information",
        });
        assert_eq!(cms.kind(), FailureKind::ProtocolError);
    }

    #[test]
    fn test_partial_preserved() {
        let err = ModemError::Timeout {
            command: "AT".into(),
            after_ms: 5000,
            partial: "+CSQ: 1".into(),
        };
        assert_eq!(err.partial(), Some("+CSQ: 1"));
        assert_eq!(err.to_string(), "AT: timeout after 5000ms");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_failure_from_error() {
        let err = ModemError::NoInputPrompt {
            attempted: "in either mode",
        };
        let failure = Failure::from(&err);
        assert_eq!(failure.kind, FailureKind::NoInputPrompt);
        assert_eq!(
            failure.message,
            "modem did not provide the SMS input prompt in either mode"
        );
    }
}
