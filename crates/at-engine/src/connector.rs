//! Opening modem ports
//!
//! Operations never open ports directly; they go through a [`Connector`], so
//! the same engine code drives real serial ports and virtual modems.

use std::io;
use std::time::Duration;

use at_detect::{DetectError, PortScanner, SerialPortInfo};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::debug;

/// Source of modem byte streams
pub trait Connector: Send + Sync + 'static {
    /// Stream type of an open port
    type Io: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open `port` at `baud_rate`, 8N1
    fn open(&self, port: &str, baud_rate: u32) -> io::Result<Self::Io>;

    /// Serial ports present on the system
    fn list_ports(&self) -> Result<Vec<SerialPortInfo>, DetectError>;
}

/// Connector for real serial ports
#[derive(Default)]
pub struct SerialConnector {
    scanner: PortScanner,
}

impl SerialConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Connector for SerialConnector {
    type Io = SerialStream;

    fn open(&self, port: &str, baud_rate: u32) -> io::Result<SerialStream> {
        debug!("Opening {} at {} baud", port, baud_rate);
        tokio_serial::new(port, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(Duration::from_millis(100))
            .open_native_async()
            .map_err(io::Error::from)
    }

    fn list_ports(&self) -> Result<Vec<SerialPortInfo>, DetectError> {
        self.scanner.enumerate_ports()
    }
}
