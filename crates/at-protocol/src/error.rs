//! Error types for final-response classification

use thiserror::Error;

/// Why the modem refused or failed to confirm a message submission
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// CMS code observed to correlate with an empty balance or a blocked number
    #[error("insufficient balance or blocked number (CMS error {code}: {description})")]
    BalanceOrBlocked {
        code: String,
        description: &'static str,
    },

    /// Any other numeric CMS error
    #[error("CMS ERROR {code}: {description}")]
    Cms {
        code: String,
        description: &'static str,
    },

    /// Balance exhausted, detected from free text
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Network registration or signal problem
    #[error("network error or weak signal")]
    Network,

    /// Destination number rejected
    #[error("destination number is invalid or does not exist")]
    InvalidDestination,

    /// ERROR with nothing more specific to go on
    #[error("SMS send failed: balance, destination number or network problem")]
    Unspecified,

    /// Neither OK nor ERROR in the final response
    #[error("incomplete response: SMS send did not complete")]
    IncompleteResponse,
}

impl Rejection {
    /// Whether this rejection points at an exhausted balance
    pub fn is_balance(&self) -> bool {
        matches!(
            self,
            Rejection::BalanceOrBlocked { .. } | Rejection::InsufficientBalance(_)
        )
    }
}
