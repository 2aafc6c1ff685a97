//! Virtual connector
//!
//! Maps port names to scripted modems. Every `open` spawns a fresh modem
//! task behind an in-memory duplex stream.

use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use at_detect::{DetectError, SerialPortInfo};
use at_engine::Connector;
use tokio::io::{duplex, AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tracing::debug;

use crate::modem::VirtualModem;
use crate::task::run_virtual_modem;

/// Counts open virtual ports
#[derive(Debug, Default)]
pub struct OpenGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

impl OpenGauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    /// Ports open right now
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Most ports ever open at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Successful opens so far
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

/// Client end of a virtual port
pub struct VirtualPort {
    inner: DuplexStream,
    gauge: Arc<OpenGauge>,
}

impl Drop for VirtualPort {
    fn drop(&mut self) {
        self.gauge.leave();
    }
}

impl AsyncRead for VirtualPort {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for VirtualPort {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Connector serving scripted modems
#[derive(Default)]
pub struct VirtualConnector {
    modems: BTreeMap<String, VirtualModem>,
    gauge: Arc<OpenGauge>,
}

impl VirtualConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `modem` at `port`
    pub fn with_modem(mut self, port: impl Into<String>, modem: VirtualModem) -> Self {
        self.modems.insert(port.into(), modem);
        self
    }

    /// Open-port counters
    pub fn gauge(&self) -> Arc<OpenGauge> {
        Arc::clone(&self.gauge)
    }
}

impl Connector for VirtualConnector {
    type Io = VirtualPort;

    fn open(&self, port: &str, baud_rate: u32) -> io::Result<VirtualPort> {
        let modem = self.modems.get(port).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such port: {}", port))
        })?;
        debug!("Opening virtual port {} at {} baud", port, baud_rate);

        let (client, server) = duplex(4096);
        tokio::spawn(run_virtual_modem(server, modem));
        self.gauge.enter();

        Ok(VirtualPort {
            inner: client,
            gauge: Arc::clone(&self.gauge),
        })
    }

    fn list_ports(&self) -> Result<Vec<SerialPortInfo>, DetectError> {
        Ok(self.modems.keys().map(SerialPortInfo::named).collect())
    }
}
