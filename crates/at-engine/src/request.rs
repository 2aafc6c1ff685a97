//! Send request validation
//!
//! Requests arrive from an outer surface (CLI, HTTP) and are checked here
//! before anything touches a port.

use std::time::Duration;

use at_protocol::SmsMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{EngineConfig, SUPPORTED_BAUD_RATES};

/// Longest message accepted (single-part SMS)
pub const MAX_MESSAGE_CHARS: usize = 160;

/// Default operation timeout for a send
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Accepted operation timeout range in seconds
pub const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 5..=300;

/// Why a request was refused before it reached the modem
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequest {
    #[error("invalid destination number {0:?}: expected 9-16 digits with optional leading +")]
    Destination(String),

    #[error("message is empty")]
    EmptyMessage,

    #[error("message is {0} characters, at most 160 allowed")]
    MessageTooLong(usize),

    #[error("unsupported baud rate {0}")]
    BaudRate(u32),

    #[error("timeout {0}s outside 5-300s")]
    Timeout(u64),
}

/// An inbound send request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub to: String,
    pub message: String,
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub mode: Option<SmsMode>,
    pub timeout_secs: Option<u64>,
}

/// A validated request with defaults filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSend {
    pub to: String,
    pub message: String,
    pub port: String,
    pub baud_rate: u32,
    pub mode: SmsMode,
    pub timeout: Duration,
}

impl SendRequest {
    pub fn new(to: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Check the request against the boundary rules
    pub fn validate(&self) -> Result<(), InvalidRequest> {
        if !is_valid_destination(&self.to) {
            return Err(InvalidRequest::Destination(self.to.clone()));
        }
        if self.message.trim().is_empty() {
            return Err(InvalidRequest::EmptyMessage);
        }
        let chars = self.message.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(InvalidRequest::MessageTooLong(chars));
        }
        if let Some(baud) = self.baud_rate {
            if !SUPPORTED_BAUD_RATES.contains(&baud) {
                return Err(InvalidRequest::BaudRate(baud));
            }
        }
        if let Some(secs) = self.timeout_secs {
            if !TIMEOUT_RANGE_SECS.contains(&secs) {
                return Err(InvalidRequest::Timeout(secs));
            }
        }
        Ok(())
    }

    /// Validate and fill defaults from `config`
    pub fn resolve(self, config: &EngineConfig) -> Result<ResolvedSend, InvalidRequest> {
        self.validate()?;
        Ok(ResolvedSend {
            to: self.to,
            message: self.message,
            port: self
                .port
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| config.default_port.clone()),
            baud_rate: self.baud_rate.unwrap_or(config.default_baud_rate),
            mode: self.mode.unwrap_or_default(),
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }
}

/// `^\+?[0-9]{9,16}$`
fn is_valid_destination(to: &str) -> bool {
    let digits = to.strip_prefix('+').unwrap_or(to);
    (9..=16).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}
