//! Multi-port scan coordinator
//!
//! Runs the collector against every candidate port through a bounded worker
//! pool. Workers start staggered, each device has its own budget, and the
//! whole scan has an overall deadline after which the results gathered so
//! far are returned.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collector;
use crate::config::EngineConfig;
use crate::connector::Connector;
use crate::types::DeviceInfo;

/// Collect device info for `ports`, sorted by port name
pub async fn scan<C: Connector>(
    connector: Arc<C>,
    config: Arc<EngineConfig>,
    ports: Vec<String>,
    cancel: &CancellationToken,
) -> Vec<DeviceInfo> {
    if ports.is_empty() {
        return Vec::new();
    }

    let total = ports.len();
    let pool = config.scan.pool_size(total);
    let overall = config.scan.overall_timeout(total);
    info!(
        "Scanning {} port(s), {} at a time, deadline {:?}",
        total, pool, overall
    );

    let semaphore = Arc::new(Semaphore::new(pool));
    let scan_cancel = cancel.child_token();
    let mut tasks = JoinSet::new();

    for (index, port) in ports.into_iter().enumerate() {
        let connector = Arc::clone(&connector);
        let config = Arc::clone(&config);
        let semaphore = Arc::clone(&semaphore);
        let cancel = scan_cancel.clone();
        let delay = config.scan.stagger() * index as u32;

        tasks.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
            let _permit = tokio::select! {
                _ = cancel.cancelled() => return None,
                permit = semaphore.acquire_owned() => permit.ok()?,
            };
            Some(scan_one(&*connector, &config, &port, &cancel).await)
        });
    }

    let deadline = tokio::time::sleep(overall);
    tokio::pin!(deadline);

    let mut results = Vec::with_capacity(total);
    loop {
        tokio::select! {
            joined = tasks.join_next() => match joined {
                Some(Ok(Some(info))) => results.push(info),
                Some(Ok(None)) => {}
                Some(Err(e)) => warn!("Scan worker failed: {}", e),
                None => break,
            },
            _ = &mut deadline => {
                warn!("Scan deadline reached with {} of {} result(s)", results.len(), total);
                break;
            }
            _ = cancel.cancelled() => {
                info!("Scan cancelled with {} of {} result(s)", results.len(), total);
                break;
            }
        }
    }

    scan_cancel.cancel();
    tasks.shutdown().await;

    results.sort_by(|a, b| a.port.cmp(&b.port));
    results
}

/// Collect one device under the per-device budget
async fn scan_one<C: Connector>(
    connector: &C,
    config: &EngineConfig,
    port: &str,
    cancel: &CancellationToken,
) -> DeviceInfo {
    let budget = config.scan.per_device();
    let device = cancel.child_token();
    debug!("Collecting {}", port);

    let collect = collector::device_info(connector, config, port, config.default_baud_rate, &device);
    tokio::pin!(collect);

    tokio::select! {
        info = &mut collect => info,
        _ = tokio::time::sleep(budget) => {
            warn!("{} exceeded its {:?} budget", port, budget);
            device.cancel();
            let mut info = collect.await;
            info.error = Some(format!("device timeout after {}ms", budget.as_millis()));
            info
        }
    }
}
