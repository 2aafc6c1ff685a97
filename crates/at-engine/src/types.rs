//! Operation results

use std::time::Duration;

use at_protocol::{step_entry, step_error, AccessTechnology, SmsMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Failure, ModemError};

/// Ordered log of exchanged commands and responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepLog(Vec<String>);

impl StepLog {
    /// Record a `"<command> -> <response>"` entry
    pub fn entry(&mut self, command: &str, response: &str) {
        self.0.push(step_entry(command, response));
    }

    /// Record a `"<command> -> ERROR: <reason>"` entry
    pub fn error(&mut self, command: &str, err: &ModemError) {
        self.0.push(step_error(command, &err.to_string()));
    }

    /// Record a free-form note
    pub fn note(&mut self, text: &str) {
        self.0.push(text.to_string());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Result of one send operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOutcome {
    pub success: bool,
    /// Message reference from `+CMGS: <n>`, when the modem printed one
    pub message_id: Option<String>,
    pub steps: StepLog,
    pub duration_ms: u64,
    pub failure: Option<Failure>,
    pub to: String,
    pub port: String,
    pub mode: SmsMode,
    pub timestamp: DateTime<Utc>,
}

impl SendOutcome {
    pub(crate) fn new(
        to: &str,
        port: &str,
        mode: SmsMode,
        steps: StepLog,
        duration: Duration,
        result: Result<Option<String>, ModemError>,
    ) -> Self {
        let (success, message_id, failure) = match result {
            Ok(id) => (true, id, None),
            Err(e) => (false, None, Some(Failure::from(&e))),
        };
        Self {
            success,
            message_id,
            steps,
            duration_ms: duration.as_millis() as u64,
            failure,
            to: to.to_string(),
            port: port.to_string(),
            mode,
            timestamp: Utc::now(),
        }
    }
}

/// Identity and network state of one modem
///
/// Every field is best-effort: a failed query leaves it empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub port: String,
    pub baud_rate: u32,
    pub connected: bool,
    pub phone_number: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub imei: Option<String>,
    pub imsi: Option<String>,
    pub operator: Option<String>,
    pub network_type: Option<AccessTechnology>,
    /// Signal level in dBm, 0 when unknown
    pub signal_level: i32,
    pub balance: Option<String>,
    pub error: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl DeviceInfo {
    pub(crate) fn unreachable(port: &str, baud_rate: u32, error: String) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            error: Some(error),
            timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }
}

/// Whether a port can be opened, plus an optional balance probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStatus {
    pub port: String,
    pub available: bool,
    pub balance: Option<String>,
    pub error: Option<String>,
}
