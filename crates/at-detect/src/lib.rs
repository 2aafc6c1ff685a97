//! Serial Port Detection Library
//!
//! This crate provides serial port enumeration for USB GSM modems, with
//! vendor hints from a small USB ID table and name-based filtering.
//!
//! # Example
//!
//! ```rust,no_run
//! use at_detect::PortScanner;
//!
//! let scanner = PortScanner::new();
//! let ports = scanner.enumerate_ports().unwrap();
//!
//! for port in ports {
//!     println!("Found port: {}", port.port);
//! }
//! ```

pub mod error;
pub mod scanner;
pub mod usb_ids;

pub use error::DetectError;
pub use scanner::{PortScanner, ScannerConfig, SerialPortInfo};
