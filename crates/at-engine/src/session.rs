//! Session manager
//!
//! A [`ModemSession`] owns the connector, the configuration and the
//! [`ResourceGuard`] every operation goes through. Sends hold the guard
//! exclusively; status checks, device info and scans share it.

use std::sync::Arc;

use at_detect::{PortScanner, ScannerConfig, SerialPortInfo};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::collector;
use crate::config::EngineConfig;
use crate::connector::Connector;
use crate::coordinator;
use crate::error::ModemError;
use crate::request::ResolvedSend;
use crate::sender;
use crate::types::{DeviceInfo, PortStatus, SendOutcome, StepLog};

/// Exclusive/shared guard over the modem subsystem
#[derive(Debug, Default)]
pub struct ResourceGuard {
    lock: RwLock<()>,
}

impl ResourceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access (sends)
    pub async fn exclusive(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RwLockWriteGuard<'_, ()>, ModemError> {
        debug!("Waiting for exclusive modem access");
        tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(lock_cancelled()),
            guard = self.lock.write() => Ok(guard),
        }
    }

    /// Wait for shared access (read-only operations)
    pub async fn shared(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RwLockReadGuard<'_, ()>, ModemError> {
        debug!("Waiting for shared modem access");
        tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(lock_cancelled()),
            guard = self.lock.read() => Ok(guard),
        }
    }
}

fn lock_cancelled() -> ModemError {
    ModemError::Cancelled {
        command: "waiting for modem access".to_string(),
        partial: String::new(),
    }
}

/// Entry point for every modem operation
pub struct ModemSession<C> {
    connector: Arc<C>,
    config: Arc<EngineConfig>,
    guard: Arc<ResourceGuard>,
}

impl<C> Clone for ModemSession<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            config: Arc::clone(&self.config),
            guard: Arc::clone(&self.guard),
        }
    }
}

impl<C: Connector> ModemSession<C> {
    /// Create a session with its own resource guard
    pub fn new(connector: C, config: EngineConfig) -> Self {
        Self::with_guard(connector, config, Arc::new(ResourceGuard::new()))
    }

    /// Create a session sharing an existing resource guard
    pub fn with_guard(connector: C, config: EngineConfig, guard: Arc<ResourceGuard>) -> Self {
        Self {
            connector: Arc::new(connector),
            config: Arc::new(config),
            guard,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Send one message; never runs concurrently with any other operation
    pub async fn send(&self, request: &ResolvedSend, cancel: &CancellationToken) -> SendOutcome {
        let _guard = match self.guard.exclusive(cancel).await {
            Ok(guard) => guard,
            Err(e) => {
                return SendOutcome::new(
                    &request.to,
                    &request.port,
                    request.mode,
                    StepLog::default(),
                    std::time::Duration::ZERO,
                    Err(e),
                )
            }
        };
        sender::send_sms(&*self.connector, &self.config, request, cancel).await
    }

    /// Check that a port opens, probing the balance when configured
    pub async fn port_status(
        &self,
        port: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PortStatus, ModemError> {
        let port = port.unwrap_or(self.config.default_port.as_str());
        let _guard = self.guard.shared(cancel).await?;
        Ok(collector::port_status(&*self.connector, &self.config, port, cancel).await)
    }

    /// Collect device info for one port
    pub async fn device_info(
        &self,
        port: Option<&str>,
        baud_rate: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<DeviceInfo, ModemError> {
        let port = port.unwrap_or(self.config.default_port.as_str());
        let baud_rate = baud_rate.unwrap_or(self.config.default_baud_rate);
        let _guard = self.guard.shared(cancel).await?;
        Ok(collector::device_info(&*self.connector, &self.config, port, baud_rate, cancel).await)
    }

    /// Candidate modem ports, filtered by the configured pattern and sorted
    pub fn list_ports(&self) -> Result<Vec<SerialPortInfo>, ModemError> {
        let ports = self.connector.list_ports()?;
        let scanner = PortScanner::with_config(ScannerConfig {
            skip_patterns: Vec::new(),
            include_patterns: self.config.port_filter.iter().cloned().collect(),
        });
        Ok(scanner.filter(ports))
    }

    /// Collect device info for every candidate port
    pub async fn scan_devices(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<DeviceInfo>, ModemError> {
        let ports: Vec<String> = self.list_ports()?.into_iter().map(|p| p.port).collect();
        let _guard = self.guard.shared(cancel).await?;
        Ok(coordinator::scan(
            Arc::clone(&self.connector),
            Arc::clone(&self.config),
            ports,
            cancel,
        )
        .await)
    }
}
