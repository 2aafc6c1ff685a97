//! Final-response classification
//!
//! Turns the text the modem printed after the message body into either a
//! message reference or a [`Rejection`]. Numeric `+CMS ERROR` codes are looked
//! up in a fixed 3GPP TS 24.011 cause table; a subset of them is reported as a
//! balance problem because carriers send them for empty prepaid accounts.

use tracing::debug;

use crate::error::Rejection;
use crate::response::{contains_ignore_case, parse_cms_code, parse_message_reference};

/// CMS cause codes and their descriptions
const CMS_CAUSES: &[(&str, &str)] = &[
    ("1", "Unassigned (unallocated) number"),
    ("3", "No route to destination"),
    ("8", "Operator determined barring"),
    ("10", "Call barred"),
    ("21", "Short message transfer rejected"),
    ("27", "Destination out of service"),
    ("28", "Unidentified subscriber"),
    ("29", "Facility rejected"),
    ("30", "Unknown subscriber"),
    ("38", "Network out of order"),
    ("41", "Temporary failure"),
    ("42", "Congestion"),
    ("47", "Resources unavailable"),
    ("50", "Requested facility not subscribed"),
    ("69", "Requested facility not implemented"),
    ("81", "Invalid short message transfer reference value"),
    ("95", "Invalid message, unspecified"),
    ("96", "Invalid mandatory information"),
    ("97", "Message type non-existent or not implemented"),
    ("98", "Message not compatible with short message protocol state"),
    ("99", "Information element non-existent or not implemented"),
    ("111", "Protocol error, unspecified"),
    ("127", "Interworking, unspecified"),
];

/// Codes reported as "insufficient balance or blocked number"
const BALANCE_CAUSES: &[&str] = &[
    "1", "3", "8", "10", "21", "27", "28", "30", "38", "41", "42", "47", "50",
];

/// Description for a CMS cause code
pub fn cms_description(code: &str) -> &'static str {
    let code = code.trim_start_matches('0');
    let code = if code.is_empty() { "0" } else { code };
    CMS_CAUSES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, text)| *text)
        .unwrap_or("Unknown error code")
}

/// Classify the final response of a submit
///
/// Returns the message reference (if the modem printed one) on success.
pub fn classify(response: &str) -> Result<Option<String>, Rejection> {
    if contains_ignore_case(response, "ERROR") {
        let rejection = match parse_cms_code(response) {
            Some(code) => {
                let description = cms_description(code);
                let normalized = code.trim_start_matches('0');
                if BALANCE_CAUSES.contains(&normalized) {
                    Rejection::BalanceOrBlocked {
                        code: code.to_string(),
                        description,
                    }
                } else {
                    Rejection::Cms {
                        code: code.to_string(),
                        description,
                    }
                }
            }
            None => classify_free_text(response),
        };
        debug!("Final response classified as {:?}", rejection);
        return Err(rejection);
    }

    if !contains_ignore_case(response, "OK") {
        return Err(Rejection::IncompleteResponse);
    }

    Ok(parse_message_reference(response).map(str::to_string))
}

/// Heuristics for an ERROR without a numeric cause
fn classify_free_text(response: &str) -> Rejection {
    let lower = response.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if any(&["sim", "balance", "insufficient", "credit"]) {
        Rejection::InsufficientBalance(response.trim().to_string())
    } else if any(&["network", "signal"]) {
        Rejection::Network
    } else if any(&["number", "phone"]) {
        Rejection::InvalidDestination
    } else {
        Rejection::Unspecified
    }
}

/// Substrings that mark a USSD balance answer as "no money left"
///
/// The list is data: deployments on other carriers replace it through
/// configuration instead of code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct BalanceMarkers(pub Vec<String>);

impl Default for BalanceMarkers {
    fn default() -> Self {
        Self(
            [
                "het tien",
                "hết tiền",
                "khong du",
                "không đủ",
                "insufficient",
                "low balance",
                "not enough credit",
            ]
            .iter()
            .map(|m| m.to_string())
            .collect(),
        )
    }
}

impl BalanceMarkers {
    /// Returns the first marker found in `text`, case-insensitively
    pub fn find(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        self.0
            .iter()
            .map(String::as_str)
            .find(|marker| !marker.is_empty() && lower.contains(&marker.to_lowercase()))
    }

    /// Whether `text` reports an exhausted balance
    pub fn is_insufficient(&self, text: &str) -> bool {
        self.find(text).is_some()
    }
}
