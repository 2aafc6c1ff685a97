//! AT Protocol Library
//!
//! This crate provides the I/O-free half of talking to a GSM modem over the
//! Hayes AT command set:
//!
//! - **Commands**: the catalogue of AT commands the engine issues, their
//!   wire encoding and the terminal tokens that end each transaction
//! - **PDU**: SMS-SUBMIT protocol data units for PDU-mode submission
//! - **Responses**: cleanup of CR/LF noise and extraction of single fields
//!   (operator, access technology, signal, USSD text, subscriber number)
//! - **Classification**: mapping of final submit responses to a message
//!   reference or a typed [`Rejection`]
//!
//! # Example
//!
//! ```rust
//! use at_protocol::{classify, pdu, AtCommand, EncodeCommand};
//!
//! assert_eq!(AtCommand::SignalQuality.encode(), b"AT+CSQ\r");
//!
//! let hex = pdu::encode_submit("+84912345678", "hello");
//! assert_eq!(pdu::octet_length(&hex), 18);
//!
//! assert_eq!(classify("\r\n+CMGS: 42\r\n\r\nOK\r\n"), Ok(Some("42".to_string())));
//! ```

pub mod classify;
pub mod command;
pub mod display;
pub mod error;
pub mod network;
pub mod pdu;
pub mod response;

pub use classify::{classify, cms_description, BalanceMarkers};
pub use command::{encode_body, AtCommand, SmsMode, DEFAULT_TERMINATORS};
pub use display::{sanitize, step_entry, step_error};
pub use error::Rejection;
pub use network::AccessTechnology;

/// Trait for commands that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format
    fn encode(&self) -> Vec<u8>;
}
