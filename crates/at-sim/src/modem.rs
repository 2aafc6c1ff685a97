//! Scripted virtual modem
//!
//! A [`VirtualModem`] turns incoming bytes into scripted replies. It has no
//! I/O of its own; [`run_virtual_modem`](crate::run_virtual_modem) drives it
//! over a stream.
//!
//! Command lines end with `\r`. After a reply containing `>` the modem treats
//! everything up to Ctrl-Z as a message body.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use at_protocol::command::{CTRL_Z, INPUT_PROMPT};

/// How the modem answers one command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Write the text at once
    Text(String),
    /// Write the text after a delay
    Delayed(Duration, String),
    /// Write the text `chunk` bytes at a time, pausing between chunks
    Drip {
        text: String,
        chunk: usize,
        interval: Duration,
    },
    /// Never answer
    Silent,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    /// Framed `\r\n<text>\r\n` reply
    pub fn line(text: &str) -> Self {
        Reply::Text(format!("\r\n{}\r\n", text))
    }

    /// Information line followed by `OK`
    pub fn info(text: &str) -> Self {
        Reply::Text(format!("\r\n{}\r\n\r\nOK\r\n", text))
    }

    pub fn ok() -> Self {
        Reply::line("OK")
    }

    fn payload(&self) -> Option<&str> {
        match self {
            Reply::Text(text) | Reply::Delayed(_, text) | Reply::Drip { text, .. } => Some(text),
            Reply::Silent => None,
        }
    }
}

/// Everything a modem received, shared between clones
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<String>>>);

impl Transcript {
    fn push(&self, entry: String) {
        if let Ok(mut entries) = self.0.lock() {
            entries.push(entry);
        }
    }

    /// Command lines and bodies in arrival order
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Whether `line` was received
    pub fn contains(&self, line: &str) -> bool {
        self.entries().iter().any(|e| e == line)
    }
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    exact: bool,
    reply: Reply,
}

/// A scripted modem
#[derive(Debug, Clone)]
pub struct VirtualModem {
    name: String,
    rules: Vec<Rule>,
    default_reply: Reply,
    body_reply: Reply,
    transcript: Transcript,
    line: Vec<u8>,
    body: Option<Vec<u8>>,
}

impl VirtualModem {
    /// A modem that answers `OK` to everything and confirms bodies with
    /// `+CMGS: 1`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            default_reply: Reply::ok(),
            body_reply: Reply::info("+CMGS: 1"),
            transcript: Transcript::default(),
            line: Vec::new(),
            body: None,
        }
    }

    /// A SIM7600-style modem with a registered SIM and credit
    pub fn sim7600(name: impl Into<String>) -> Self {
        Self::new(name)
            .on("AT+CSQ", Reply::info("+CSQ: 20,99"))
            .on("AT+CPIN?", Reply::info("+CPIN: READY"))
            .on("AT+CREG?", Reply::info("+CREG: 2,1,\"1A2B\",\"0C3D4E\",7"))
            .on("AT+CSCA?", Reply::info("+CSCA: \"+84980200030\",145"))
            .on("AT+CPMS?", Reply::info("+CPMS: \"SM\",0,30,\"SM\",0,30,\"SM\",0,30"))
            .on("AT+COPS?", Reply::info("+COPS: 0,0,\"45204\",7"))
            .on("AT+CGMI", Reply::info("SIMCOM INCORPORATED"))
            .on("AT+CGMM", Reply::info("SIMCOM_SIM7600E-H"))
            .on("AT+CGMR", Reply::info("+CGMR: LE20B04SIM7600M22"))
            .on("AT+CGSN", Reply::info("862636051234567"))
            .on("AT+CIMI", Reply::info("452040123456789"))
            .on("AT+CNUM", Reply::info("+CNUM: \"\",\"+84961234567\",145"))
            .on_prefix(
                "AT+CUSD=1,",
                Reply::text("\r\nOK\r\n\r\n+CUSD: 0,\"TK chinh: 52000d, HSD 01/01/2027\",15\r\n"),
            )
            .on_prefix("AT+CMGS=", Reply::text("\r\n> "))
            .on_body(Reply::info("+CMGS: 42"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Answer exactly `line`; later rules override earlier ones
    pub fn on(mut self, line: &str, reply: Reply) -> Self {
        self.rules.push(Rule {
            pattern: line.to_string(),
            exact: true,
            reply,
        });
        self
    }

    /// Answer every line starting with `prefix`; the longest prefix wins
    pub fn on_prefix(mut self, prefix: &str, reply: Reply) -> Self {
        self.rules.push(Rule {
            pattern: prefix.to_string(),
            exact: false,
            reply,
        });
        self
    }

    /// Answer a message body (after Ctrl-Z)
    pub fn on_body(mut self, reply: Reply) -> Self {
        self.body_reply = reply;
        self
    }

    /// Answer unmatched lines
    pub fn otherwise(mut self, reply: Reply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Handle to what this modem (and its clones) received
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }

    /// Feed received bytes, returning the replies they trigger
    pub fn receive(&mut self, data: &[u8]) -> Vec<Reply> {
        let mut replies = Vec::new();
        for &byte in data {
            if let Some(body) = self.body.as_mut() {
                if byte == CTRL_Z {
                    let text = String::from_utf8_lossy(body).into_owned();
                    self.body = None;
                    self.transcript.push(text);
                    replies.push(self.body_reply.clone());
                } else {
                    body.push(byte);
                }
                continue;
            }

            match byte {
                b'\r' => {
                    let line = String::from_utf8_lossy(&self.line).trim().to_string();
                    self.line.clear();
                    if line.is_empty() {
                        continue;
                    }
                    let reply = self.reply_for(&line);
                    if reply
                        .payload()
                        .is_some_and(|text| text.contains(INPUT_PROMPT))
                    {
                        self.body = Some(Vec::new());
                    }
                    self.transcript.push(line);
                    replies.push(reply);
                }
                b'\n' => {}
                _ => self.line.push(byte),
            }
        }
        replies
    }

    fn reply_for(&self, line: &str) -> Reply {
        if let Some(rule) = self
            .rules
            .iter()
            .rev()
            .find(|rule| rule.exact && rule.pattern == line)
        {
            return rule.reply.clone();
        }
        // max_by_key keeps the last maximum, so later rules win ties
        self.rules
            .iter()
            .filter(|rule| !rule.exact && line.starts_with(&rule.pattern))
            .max_by_key(|rule| rule.pattern.len())
            .map(|rule| rule.reply.clone())
            .unwrap_or_else(|| self.default_reply.clone())
    }
}
