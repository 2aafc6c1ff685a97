//! Engine configuration
//!
//! Every field has a default, so a partial settings file deserializes into a
//! complete configuration.

use std::time::Duration;

use at_protocol::command::DEFAULT_TEXT_PARAMS;
use at_protocol::BalanceMarkers;
use serde::{Deserialize, Serialize};

/// Baud rates accepted at the request boundary
pub const SUPPORTED_BAUD_RATES: &[u32] = &[9600, 19200, 38400, 57600, 115200, 230400];

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Port used when a request names none
    pub default_port: String,
    /// Baud rate used when a request names none
    pub default_baud_rate: u32,
    /// USSD code for the balance probe (`None` skips the probe)
    pub balance_ussd: Option<String>,
    /// `AT+CSMP` parameters for text mode
    pub text_params: String,
    /// Issue `AT+CFUN=1,1` before each send
    pub reset_before_send: bool,
    /// Only ports whose name contains this pattern are listed and scanned
    pub port_filter: Option<String>,
    /// Markers that flag a USSD balance answer as insufficient
    pub balance_markers: BalanceMarkers,
    /// Transaction timeouts
    pub timings: Timings,
    /// Multi-port scan settings
    pub scan: ScanConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_port: "/dev/ttyUSB0".to_string(),
            default_baud_rate: 115200,
            balance_ussd: Some("*101#".to_string()),
            text_params: DEFAULT_TEXT_PARAMS.to_string(),
            reset_before_send: true,
            port_filter: Some("ttyUSB".to_string()),
            balance_markers: BalanceMarkers::default(),
            timings: Timings::default(),
            scan: ScanConfig::default(),
        }
    }
}

/// Transaction timeouts, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Bounded read length inside a transaction
    pub poll_ms: u64,
    /// Ordinary status and identity queries
    pub command_ms: u64,
    /// Message format and parameter changes
    pub mode_ms: u64,
    /// Waiting for the `>` body prompt
    pub prompt_ms: u64,
    /// USSD balance answer
    pub ussd_ms: u64,
    /// Final confirmation after the message body
    pub final_ms: u64,
    /// Settle delay after a modem reset
    pub reset_settle_ms: u64,
    /// USSD balance answer during a port status check
    pub status_balance_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_ms: 100,
            command_ms: 5_000,
            mode_ms: 10_000,
            prompt_ms: 10_000,
            ussd_ms: 10_000,
            final_ms: 30_000,
            reset_settle_ms: 5_000,
            status_balance_ms: 8_000,
        }
    }
}

impl Timings {
    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(1))
    }

    pub fn command(&self) -> Duration {
        Duration::from_millis(self.command_ms)
    }

    pub fn mode(&self) -> Duration {
        Duration::from_millis(self.mode_ms)
    }

    pub fn prompt(&self) -> Duration {
        Duration::from_millis(self.prompt_ms)
    }

    pub fn ussd(&self) -> Duration {
        Duration::from_millis(self.ussd_ms)
    }

    pub fn final_response(&self) -> Duration {
        Duration::from_millis(self.final_ms)
    }

    pub fn reset_settle(&self) -> Duration {
        Duration::from_millis(self.reset_settle_ms)
    }

    pub fn status_balance(&self) -> Duration {
        Duration::from_millis(self.status_balance_ms)
    }
}

/// Multi-port scan settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Collector runs allowed at once (forced to 1 for a single port)
    pub max_concurrent: usize,
    /// Delay between worker starts (ms)
    pub stagger_ms: u64,
    /// Budget per device (ms)
    pub per_device_ms: u64,
    /// Cap on the whole scan (ms)
    pub overall_cap_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            stagger_ms: 500,
            per_device_ms: 15_000,
            overall_cap_ms: 60_000,
        }
    }
}

impl ScanConfig {
    /// Worker pool size for `ports` candidates
    pub fn pool_size(&self, ports: usize) -> usize {
        if ports <= 1 {
            1
        } else {
            self.max_concurrent.clamp(1, ports)
        }
    }

    /// Overall deadline for `ports` candidates: per-device budget each, capped
    pub fn overall_timeout(&self, ports: usize) -> Duration {
        let total = self.per_device_ms.saturating_mul(ports.max(1) as u64);
        Duration::from_millis(total.min(self.overall_cap_ms))
    }

    pub fn per_device(&self) -> Duration {
        Duration::from_millis(self.per_device_ms)
    }

    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }
}
