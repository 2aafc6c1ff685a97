//! AT Engine
//!
//! Talks to GSM modems over serial links:
//!
//! - [`link`]: the transaction engine (one command, one terminal token)
//! - [`sender`]: the SMS send state machine with its text-to-PDU fallback
//! - [`collector`]: best-effort device info and port status
//! - [`coordinator`]: bounded, staggered multi-port scanning
//! - [`session`]: the resource guard and the operations callers use
//!
//! Ports are opened through a [`Connector`], so everything here runs the same
//! against real hardware ([`SerialConnector`]) and virtual modems.

pub mod collector;
pub mod config;
pub mod connector;
pub mod coordinator;
pub mod error;
pub mod link;
pub mod request;
pub mod sender;
pub mod session;
pub mod types;

pub use config::{EngineConfig, ScanConfig, Timings};
pub use connector::{Connector, SerialConnector};
pub use error::{Failure, FailureKind, ModemError};
pub use link::Link;
pub use request::{InvalidRequest, ResolvedSend, SendRequest};
pub use session::{ModemSession, ResourceGuard};
pub use types::{DeviceInfo, PortStatus, SendOutcome, StepLog};
