//! AT command catalogue
//!
//! Every command the engine issues is a variant of [`AtCommand`]. [`AtCommand::line`]
//! is the command line as logged; [`EncodeCommand::encode`] adds the
//! [`LINE_TERMINATOR`] for the wire.

use std::fmt;

use crate::EncodeCommand;

/// Terminator appended to every command line
pub const LINE_TERMINATOR: &str = "\r";

/// Ctrl-Z, ends a message body after the `>` prompt
pub const CTRL_Z: u8 = 0x1A;

/// Prompt the modem prints when it is waiting for a message body
pub const INPUT_PROMPT: &str = ">";

/// Default terminal tokens for an ordinary AT reply
pub const DEFAULT_TERMINATORS: &[&str] = &["OK", "ERROR"];

/// Terminal tokens while waiting for the body prompt
pub const PROMPT_TERMINATORS: &[&str] = &["> ", INPUT_PROMPT, "ERROR"];

/// Terminal tokens for the final submit confirmation
pub const SUBMIT_TERMINATORS: &[&str] = &["OK", "ERROR", "+CMGS:"];

/// Terminal tokens for a USSD session answer
pub const USSD_TERMINATORS: &[&str] = &["+CUSD:", "ERROR"];

/// Default `AT+CSMP` parameters: SMS-SUBMIT with validity period, PID 0, DCS 0
pub const DEFAULT_TEXT_PARAMS: &str = "17,167,0,0";

/// SMS submission mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SmsMode {
    /// Plain text mode (`AT+CMGF=1`)
    #[default]
    Text,
    /// Hex PDU mode (`AT+CMGF=0`)
    Pdu,
}

impl SmsMode {
    /// Returns the mode name used on the wire and in results
    pub fn name(&self) -> &'static str {
        match self {
            SmsMode::Text => "text",
            SmsMode::Pdu => "pdu",
        }
    }

    /// Parse a mode name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" => Some(SmsMode::Text),
            "pdu" => Some(SmsMode::Pdu),
            _ => None,
        }
    }
}

impl fmt::Display for SmsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// AT commands understood by the supported modem dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtCommand {
    /// Attention: `AT`
    Test,
    /// Disable command echo: `ATE0`
    EchoOff,
    /// Signal quality: `AT+CSQ`
    SignalQuality,
    /// SIM PIN status: `AT+CPIN?`
    SimStatus,
    /// Network registration: `AT+CREG?`
    NetworkRegistration,
    /// SMS service centre address: `AT+CSCA?`
    SmsCenter,
    /// Preferred SMS storage: `AT+CPMS?`
    SmsMemory,
    /// Current operator: `AT+COPS?`
    Operator,
    /// Enable USSD result codes: `AT+CUSD=1`
    UssdEnable,
    /// Run a USSD code: `AT+CUSD=1,"*101#",15`
    Ussd(String),
    /// Full functionality with reset: `AT+CFUN=1,1`
    Reset,
    /// Message format: `AT+CMGF=1` (text) or `AT+CMGF=0` (PDU)
    MessageFormat(SmsMode),
    /// Text mode parameters: `AT+CSMP=17,167,0,0`
    TextParams(String),
    /// Begin a text-mode submit: `AT+CMGS="+84912345678"`
    SubmitText(String),
    /// Begin a PDU-mode submit: `AT+CMGS=<octets>`
    SubmitPdu(usize),
    /// Manufacturer: `AT+CGMI`
    Manufacturer,
    /// Model: `AT+CGMM`
    Model,
    /// Firmware revision: `AT+CGMR`
    Revision,
    /// IMEI: `AT+CGSN`
    Imei,
    /// IMSI: `AT+CIMI`
    Imsi,
    /// Subscriber number: `AT+CNUM`
    SubscriberNumber,
}

impl AtCommand {
    /// The command line as sent, without terminator
    pub fn line(&self) -> String {
        match self {
            AtCommand::Test => "AT".into(),
            AtCommand::EchoOff => "ATE0".into(),
            AtCommand::SignalQuality => "AT+CSQ".into(),
            AtCommand::SimStatus => "AT+CPIN?".into(),
            AtCommand::NetworkRegistration => "AT+CREG?".into(),
            AtCommand::SmsCenter => "AT+CSCA?".into(),
            AtCommand::SmsMemory => "AT+CPMS?".into(),
            AtCommand::Operator => "AT+COPS?".into(),
            AtCommand::UssdEnable => "AT+CUSD=1".into(),
            AtCommand::Ussd(code) => format!("AT+CUSD=1,\"{}\",15", code),
            AtCommand::Reset => "AT+CFUN=1,1".into(),
            AtCommand::MessageFormat(SmsMode::Text) => "AT+CMGF=1".into(),
            AtCommand::MessageFormat(SmsMode::Pdu) => "AT+CMGF=0".into(),
            AtCommand::TextParams(params) => format!("AT+CSMP={}", params),
            AtCommand::SubmitText(to) => format!("AT+CMGS=\"{}\"", to),
            AtCommand::SubmitPdu(octets) => format!("AT+CMGS={}", octets),
            AtCommand::Manufacturer => "AT+CGMI".into(),
            AtCommand::Model => "AT+CGMM".into(),
            AtCommand::Revision => "AT+CGMR".into(),
            AtCommand::Imei => "AT+CGSN".into(),
            AtCommand::Imsi => "AT+CIMI".into(),
            AtCommand::SubscriberNumber => "AT+CNUM".into(),
        }
    }

    /// Terminal tokens that end this command's transaction
    pub fn terminators(&self) -> &'static [&'static str] {
        match self {
            AtCommand::SubmitText(_) | AtCommand::SubmitPdu(_) => PROMPT_TERMINATORS,
            AtCommand::Ussd(_) => USSD_TERMINATORS,
            _ => DEFAULT_TERMINATORS,
        }
    }
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line())
    }
}

impl EncodeCommand for AtCommand {
    fn encode(&self) -> Vec<u8> {
        self.line().as_str().encode()
    }
}

/// A raw command line, for commands outside the catalogue
impl EncodeCommand for str {
    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len() + LINE_TERMINATOR.len());
        bytes.extend_from_slice(self.as_bytes());
        bytes.extend_from_slice(LINE_TERMINATOR.as_bytes());
        bytes
    }
}

/// Encode a message body followed by the Ctrl-Z submit byte
pub fn encode_body(body: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(body.len() + 1);
    bytes.extend_from_slice(body.as_bytes());
    bytes.push(CTRL_Z);
    bytes
}
