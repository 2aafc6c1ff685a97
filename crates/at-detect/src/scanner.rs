//! Serial port scanner
//!
//! This module provides serial port enumeration and the name filter that
//! decides which ports are treated as modem candidates.

use serde::{Deserialize, Serialize};
use serialport::{available_ports, SerialPortType};
use tracing::info;

use crate::error::DetectError;
use crate::usb_ids;

/// Information about a serial port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialPortInfo {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub port: String,
    /// USB Vendor ID (if USB)
    pub vid: Option<u16>,
    /// USB Product ID (if USB)
    pub pid: Option<u16>,
    /// USB serial number (if available)
    pub serial_number: Option<String>,
    /// USB manufacturer string
    pub manufacturer: Option<String>,
    /// USB product string
    pub product: Option<String>,
    /// Vendor hint from the USB ID table
    pub hint: Option<String>,
}

impl SerialPortInfo {
    /// Create from serialport crate's port info
    fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(usb) => Self {
                port: name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                serial_number: usb.serial_number.clone(),
                manufacturer: usb.manufacturer.clone(),
                product: usb.product.clone(),
                hint: usb_ids::vendor_hint(usb.vid).map(str::to_string),
            },
            _ => Self::named(name),
        }
    }

    /// A port known only by name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            port: name.into(),
            vid: None,
            pid: None,
            serial_number: None,
            manufacturer: None,
            product: None,
            hint: None,
        }
    }

    /// Device name shown in listings: `/dev/ttyUSB0` -> `USB0`,
    /// `/dev/tty.usbserial-1420` -> `usbserial-1420`, `COM3` -> `COM3`
    pub fn device_name(&self) -> &str {
        if let Some(rest) = self.port.strip_prefix("/dev/tty") {
            if rest.starts_with("USB") || rest.starts_with("ACM") {
                return rest;
            }
        }
        if self.port.contains("usbserial") {
            if let Some(last) = self.port.rsplit('/').next() {
                return last.strip_prefix("tty.").unwrap_or(last);
            }
        }
        &self.port
    }
}

/// Serial port scanner configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Skip ports matching these patterns
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    /// Keep only ports matching one of these patterns (empty keeps all)
    #[serde(default)]
    pub include_patterns: Vec<String>,
}

/// Serial port scanner
pub struct PortScanner {
    config: ScannerConfig,
}

impl PortScanner {
    /// Create a new scanner with default configuration
    pub fn new() -> Self {
        Self {
            config: ScannerConfig {
                skip_patterns: vec![
                    // Bluetooth ports on macOS
                    "Bluetooth".to_string(),
                    // Debug/logging ports
                    "debug".to_string(),
                ],
                include_patterns: Vec::new(),
            },
        }
    }

    /// Create a scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Enumerate all available serial ports, sorted by name
    pub fn enumerate_ports(&self) -> Result<Vec<SerialPortInfo>, DetectError> {
        info!("Enumerating serial ports...");
        let ports = available_ports().map_err(|e| DetectError::EnumerationFailed(e.to_string()))?;

        let result = self.filter(
            ports
                .into_iter()
                .map(|p| SerialPortInfo::from_serialport(p.port_name, &p.port_type)),
        );

        if result.is_empty() {
            info!("No serial ports found");
        } else {
            info!("Found {} serial port(s)", result.len());
            for port in &result {
                let desc = port
                    .hint
                    .as_deref()
                    .or(port.product.as_deref())
                    .unwrap_or("Unknown");
                let module = if port.vid.is_some_and(usb_ids::is_modem_vendor) {
                    " [cellular module]"
                } else {
                    ""
                };
                info!("  {} ({}) - {}{}", port.port, port.device_name(), desc, module);
            }
        }

        Ok(result)
    }

    /// Apply the skip and include patterns and sort by port name
    pub fn filter(&self, ports: impl IntoIterator<Item = SerialPortInfo>) -> Vec<SerialPortInfo> {
        let mut result: Vec<_> = ports
            .into_iter()
            .filter(|p| !self.should_skip_port(p))
            .collect();
        result.sort_by(|a, b| a.port.cmp(&b.port));
        result
    }

    /// Check if a port should be skipped
    fn should_skip_port(&self, port: &SerialPortInfo) -> bool {
        if self
            .config
            .skip_patterns
            .iter()
            .any(|pattern| port.port.contains(pattern.as_str()))
        {
            return true;
        }
        !self.config.include_patterns.is_empty()
            && !self
                .config
                .include_patterns
                .iter()
                .any(|pattern| port.port.contains(pattern.as_str()))
    }
}

impl Default for PortScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    #[test]
    fn test_serial_port_info_from_usb() {
        let usb_info = SerialPortType::UsbPort(UsbPortInfo {
            vid: 0x1E0E,
            pid: 0x9001,
            serial_number: Some("12345".to_string()),
            manufacturer: Some("SimTech, Incorporated".to_string()),
            product: Some("SimTech SIM7600".to_string()),
        });

        let info = SerialPortInfo::from_serialport("/dev/ttyUSB2".to_string(), &usb_info);

        assert_eq!(info.vid, Some(0x1E0E));
        assert_eq!(info.pid, Some(0x9001));
        assert_eq!(info.product.as_deref(), Some("SimTech SIM7600"));
        assert_eq!(info.hint.as_deref(), Some("SIMCom modem"));
    }

    #[test]
    fn test_include_patterns_and_sorting() {
        let scanner = PortScanner::with_config(ScannerConfig {
            skip_patterns: vec!["Bluetooth".into()],
            include_patterns: vec!["ttyUSB".into()],
        });

        let ports = scanner.filter(vec![
            SerialPortInfo::named("/dev/ttyUSB3"),
            SerialPortInfo::named("/dev/ttyS0"),
            SerialPortInfo::named("/dev/ttyUSB0"),
            SerialPortInfo::named("/dev/tty.Bluetooth-ttyUSB"),
        ]);

        let names: Vec<_> = ports.iter().map(|p| p.port.as_str()).collect();
        assert_eq!(names, vec!["/dev/ttyUSB0", "/dev/ttyUSB3"]);
    }

    #[test]
    fn test_empty_include_keeps_everything() {
        let scanner = PortScanner::with_config(ScannerConfig::default());
        let ports = scanner.filter(vec![
            SerialPortInfo::named("COM4"),
            SerialPortInfo::named("COM3"),
        ]);
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].port, "COM3");
    }

    #[test]
    fn test_device_names() {
        assert_eq!(SerialPortInfo::named("/dev/ttyUSB0").device_name(), "USB0");
        assert_eq!(SerialPortInfo::named("COM3").device_name(), "COM3");
        assert_eq!(
            SerialPortInfo::named("/dev/tty.usbserial-1420").device_name(),
            "usbserial-1420"
        );
        assert_eq!(SerialPortInfo::named("/dev/ttyS0").device_name(), "/dev/ttyS0");
    }
}
