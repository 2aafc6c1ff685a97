//! Device info collector and port status check
//!
//! Runs a fixed battery of best-effort queries against one modem. Each query
//! has its own timeout and a failed query leaves its field empty.

use std::time::Duration;

use at_protocol::response::{
    clean, identity_value, parse_access_technology, parse_operator, parse_signal_dbm,
    parse_subscriber_number, parse_ussd,
};
use at_protocol::AtCommand;
use chrono::Utc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::connector::Connector;
use crate::link::Link;
use crate::types::{DeviceInfo, PortStatus};

/// Open `port` and collect its device info
///
/// Never fails: an unopenable port yields a record with `connected: false`
/// and the open error.
pub async fn device_info<C: Connector>(
    connector: &C,
    config: &EngineConfig,
    port: &str,
    baud_rate: u32,
    cancel: &CancellationToken,
) -> DeviceInfo {
    let io = match connector.open(port, baud_rate) {
        Ok(io) => io,
        Err(e) => {
            info!("Cannot open {}: {}", port, e);
            return DeviceInfo::unreachable(port, baud_rate, format!("Failed to open port: {}", e));
        }
    };

    let mut link = Link::new(port, baud_rate, io, config.timings.poll());
    let info = collect(&mut link, config, cancel).await;
    link.close().await;
    info
}

/// Run the query battery over an open link
pub async fn collect<T>(
    link: &mut Link<T>,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> DeviceInfo
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let timeout = config.timings.command();
    let mut info = DeviceInfo {
        port: link.port().to_string(),
        baud_rate: link.baud_rate(),
        connected: true,
        timestamp: Some(Utc::now()),
        ..Default::default()
    };

    info.phone_number = query(link, &AtCommand::SubscriberNumber, timeout, cancel)
        .await
        .and_then(|r| parse_subscriber_number(&r));
    info.manufacturer = query(link, &AtCommand::Manufacturer, timeout, cancel)
        .await
        .and_then(|r| identity_value(&r));
    info.model = query(link, &AtCommand::Model, timeout, cancel)
        .await
        .and_then(|r| identity_value(&r));
    info.firmware_version = query(link, &AtCommand::Revision, timeout, cancel)
        .await
        .and_then(|r| identity_value(&r));
    info.imei = query(link, &AtCommand::Imei, timeout, cancel)
        .await
        .and_then(|r| identity_value(&r));
    info.imsi = query(link, &AtCommand::Imsi, timeout, cancel)
        .await
        .and_then(|r| identity_value(&r));
    info.operator = query(link, &AtCommand::Operator, timeout, cancel)
        .await
        .and_then(|r| parse_operator(&r));
    info.network_type = query(link, &AtCommand::NetworkRegistration, timeout, cancel)
        .await
        .and_then(|r| parse_access_technology(&r));
    info.signal_level = query(link, &AtCommand::SignalQuality, timeout, cancel)
        .await
        .and_then(|r| parse_signal_dbm(&r))
        .unwrap_or(0);

    if let Some(code) = balance_code(config) {
        info.balance = balance(link, code, config.timings.ussd(), cancel).await;
    }

    if cancel.is_cancelled() {
        info.error = Some("collection interrupted".to_string());
    }
    debug!("Collected {:?}", info);
    info
}

/// Check whether `port` opens, probing the balance when configured
pub async fn port_status<C: Connector>(
    connector: &C,
    config: &EngineConfig,
    port: &str,
    cancel: &CancellationToken,
) -> PortStatus {
    let baud_rate = config.default_baud_rate;
    let io = match connector.open(port, baud_rate) {
        Ok(io) => io,
        Err(e) => {
            return PortStatus {
                port: port.to_string(),
                available: false,
                balance: None,
                error: Some(e.to_string()),
            }
        }
    };

    let mut link = Link::new(port, baud_rate, io, config.timings.poll());
    let balance = match balance_code(config) {
        Some(code) => balance(&mut link, code, config.timings.status_balance(), cancel).await,
        None => None,
    };
    link.close().await;

    PortStatus {
        port: port.to_string(),
        available: true,
        balance,
        error: None,
    }
}

fn balance_code(config: &EngineConfig) -> Option<&str> {
    config
        .balance_ussd
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

/// Enable USSD and run the balance code, both within `budget`
async fn balance<T>(
    link: &mut Link<T>,
    code: &str,
    budget: Duration,
    cancel: &CancellationToken,
) -> Option<String>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let deadline = Instant::now() + budget;
    query(link, &AtCommand::UssdEnable, budget, cancel).await?;

    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        debug!("Balance budget on {} spent before USSD query", link.port());
        return None;
    }
    let response = query(link, &AtCommand::Ussd(code.to_string()), remaining, cancel).await?;
    parse_ussd(&response).or_else(|| Some(clean(&response)).filter(|s| !s.is_empty()))
}

/// One best-effort query
async fn query<T>(
    link: &mut Link<T>,
    command: &AtCommand,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Option<String>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    match link
        .transact(command, command.terminators(), timeout, cancel)
        .await
    {
        Ok(response) => Some(response),
        Err(e) => {
            debug!("{} on {} failed: {}", command, link.port(), e);
            None
        }
    }
}
