//! Virtual GSM Modem Library
//!
//! This crate simulates GSM modems for testing the AT engine without
//! hardware:
//!
//! - **VirtualModem**: scripted replies per command line, body capture after
//!   the `>` prompt, and a transcript of everything received
//! - **run_virtual_modem**: serves a modem over any async stream
//! - **VirtualConnector**: a [`Connector`](at_engine::Connector) mapping port
//!   names to modems, counting open ports
//!
//! # Example
//!
//! ```rust
//! use at_sim::{Reply, VirtualModem};
//!
//! let mut modem = VirtualModem::new("SIM800").on("AT+CSQ", Reply::info("+CSQ: 18,0"));
//!
//! let replies = modem.receive(b"AT+CSQ\r");
//! assert_eq!(replies, vec![Reply::info("+CSQ: 18,0")]);
//! ```

pub mod connector;
pub mod modem;
pub mod task;

pub use connector::{OpenGauge, VirtualConnector, VirtualPort};
pub use modem::{Reply, Transcript, VirtualModem};
pub use task::run_virtual_modem;
