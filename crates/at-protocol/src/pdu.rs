//! SMS-SUBMIT PDU encoding
//!
//! Builds the hex string sent after `AT+CMGS=<octets>` in PDU mode:
//!
//! ```text
//! 00 11 00 <len> 91 <swapped digits> 00 00 <udl> <user data>
//! |  |  |   |    |                   |  |   |
//! |  |  |   |    |                   |  |   +-- user data length (characters)
//! |  |  |   |    |                   |  +------ data coding scheme
//! |  |  |   |    |                   +--------- protocol identifier
//! |  |  |   |    +-- type of address: international
//! |  |  |   +------- destination length in digits
//! |  |  +----------- message reference
//! |  +-------------- first octet: SMS-SUBMIT, relative validity
//! +----------------- SMSC length: use the SIM's stored centre
//! ```
//!
//! User data is written one octet per character, not GSM 7-bit packed.
//! Characters outside Latin-1 are sent as `?`.

use std::fmt::Write;

/// SMSC information length: empty, modem uses the stored centre
const SMSC_LENGTH: &str = "00";
/// First octet of an SMS-SUBMIT
const SUBMIT_FIRST_OCTET: &str = "11";
/// Message reference, assigned by the modem
const MESSAGE_REFERENCE: &str = "00";
/// Type of address: international numbering plan
const INTERNATIONAL_TOA: &str = "91";
/// Protocol identifier
const PROTOCOL_ID: &str = "00";
/// Data coding scheme
const DATA_CODING: &str = "00";

/// Byte written for characters that don't fit in one octet
const REPLACEMENT_OCTET: u8 = b'?';

/// Encode a destination and message into a hex SMS-SUBMIT PDU
pub fn encode_submit(destination: &str, message: &str) -> String {
    let digits: String = destination.chars().filter(|c| c.is_ascii_digit()).collect();
    let user_data: Vec<u8> = message
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(REPLACEMENT_OCTET))
        .collect();

    let mut pdu = String::with_capacity(20 + digits.len() + user_data.len() * 2);
    pdu.push_str(SMSC_LENGTH);
    pdu.push_str(SUBMIT_FIRST_OCTET);
    pdu.push_str(MESSAGE_REFERENCE);
    let _ = write!(pdu, "{:02X}", digits.len() & 0xFF);
    pdu.push_str(INTERNATIONAL_TOA);
    pdu.push_str(&swap_nibbles(&digits));
    pdu.push_str(PROTOCOL_ID);
    pdu.push_str(DATA_CODING);
    let _ = write!(pdu, "{:02X}", user_data.len() & 0xFF);
    for byte in user_data {
        let _ = write!(pdu, "{:02X}", byte);
    }
    pdu
}

/// Octet count reported in `AT+CMGS=<n>`: the PDU without the SMSC length octet
pub fn octet_length(pdu_hex: &str) -> usize {
    pdu_hex.len().saturating_sub(2) / 2
}

/// Swap each digit pair, padding odd-length input with `F`
fn swap_nibbles(digits: &str) -> String {
    let mut padded: Vec<char> = digits.chars().collect();
    if padded.len() % 2 == 1 {
        padded.push('F');
    }
    padded
        .chunks(2)
        .flat_map(|pair| [pair[1], pair[0]])
        .collect()
}

/// Recover the destination digits from a PDU produced by [`encode_submit`]
///
/// Returns `None` if the header doesn't look like an SMS-SUBMIT we built.
pub fn decode_destination(pdu_hex: &str) -> Option<String> {
    let header = pdu_hex.get(..10)?;
    if &header[..6] != "001100" || &header[8..10] != INTERNATIONAL_TOA {
        return None;
    }
    let len = usize::from_str_radix(&header[6..8], 16).ok()?;
    let field_len = len.div_ceil(2) * 2;
    let field: Vec<char> = pdu_hex.get(10..10 + field_len)?.chars().collect();

    let mut digits: String = field.chunks(2).flat_map(|pair| [pair[1], pair[0]]).collect();
    if digits.ends_with('F') {
        digits.pop();
    }
    digits.truncate(len);
    Some(digits)
}
