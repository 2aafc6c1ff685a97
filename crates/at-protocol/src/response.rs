//! Response inspection and field extraction
//!
//! Modems answer with CR/LF-framed lines, echo fragments and trailing
//! `OK`/`ERROR` result codes. These helpers strip that noise and pull single
//! fields out of the information lines.

use crate::network::{operator_display_name, AccessTechnology};

/// Returns the first terminal token found in `response`, case-insensitively
pub fn find_terminator<'a>(response: &str, tokens: &[&'a str]) -> Option<&'a str> {
    let upper = response.to_ascii_uppercase();
    tokens
        .iter()
        .copied()
        .find(|token| !token.is_empty() && upper.contains(&token.to_ascii_uppercase()))
}

/// Whether the response contains the body input prompt
pub fn has_prompt(response: &str) -> bool {
    response.contains(crate::command::INPUT_PROMPT)
}

/// Whether the response contains `token`, ignoring ASCII case
pub fn contains_ignore_case(response: &str, token: &str) -> bool {
    response
        .to_ascii_uppercase()
        .contains(&token.to_ascii_uppercase())
}

/// Strip carriage returns, blank lines and a trailing `OK`/`ERROR` result code
pub fn clean(response: &str) -> String {
    let lines: Vec<&str> = response
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut end = lines.len();
    while end > 0 && matches!(lines[end - 1], "OK" | "ERROR") {
        end -= 1;
    }
    lines[..end].join("\n")
}

/// Value of a plain identity query (`AT+CGMI`, `AT+CGSN`, ...)
///
/// Returns `None` when the modem answered only with a result code or with
/// an error line.
pub fn identity_value(response: &str) -> Option<String> {
    if contains_ignore_case(response, "ERROR") {
        return None;
    }
    let cleaned = clean(response);
    let value = cleaned
        .lines()
        .filter(|line| !line.starts_with("AT"))
        .map(|line| line.strip_prefix("+CGMI:").unwrap_or(line))
        .map(|line| line.strip_prefix("+CGMM:").unwrap_or(line))
        .map(|line| line.strip_prefix("+CGMR:").unwrap_or(line))
        .map(|line| line.strip_prefix("+CGSN:").unwrap_or(line))
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ");
    (!value.is_empty()).then_some(value)
}

/// Find the first information line starting with `prefix`
fn info_line<'a>(response: &'a str, prefix: &str) -> Option<&'a str> {
    response
        .split(['\r', '\n'])
        .map(str::trim)
        .find(|line| line.starts_with(prefix))
}

/// Operator name from `+COPS: 0,0,"Viettel",2`
pub fn parse_operator(response: &str) -> Option<String> {
    let line = info_line(response, "+COPS:")?;
    let name = line.split(',').nth(2)?.trim().trim_matches('"');
    (!name.is_empty()).then(|| operator_display_name(name))
}

/// Access technology from the 5th field of `+CREG: 2,1,"1A2B","C3D4",7`
pub fn parse_access_technology(response: &str) -> Option<AccessTechnology> {
    let line = info_line(response, "+CREG:")?;
    let act = line.split(',').nth(4)?.trim();
    AccessTechnology::from_act(act.parse().ok()?)
}

/// Signal level in dBm from `+CSQ: <rssi>,<ber>`
///
/// RSSI 99 means unknown. Values map as `-113 + 2 * rssi`.
pub fn parse_signal_dbm(response: &str) -> Option<i32> {
    let line = info_line(response, "+CSQ:")?;
    let rssi: i32 = line
        .trim_start_matches("+CSQ:")
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()?;
    (0..=31).contains(&rssi).then(|| -113 + 2 * rssi)
}

/// Text of a USSD answer, from `+CUSD: 0,"Tai khoan chinh: 10000d",15`
///
/// Falls back to the first line that is not an echo or a result code.
pub fn parse_ussd(response: &str) -> Option<String> {
    let lines = || {
        response
            .split(['\r', '\n'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
    };

    if let Some(line) = lines().find(|line| line.contains("+CUSD:")) {
        if let (Some(start), Some(end)) = (line.find('"'), line.rfind('"')) {
            if end > start {
                return Some(line[start + 1..end].trim().to_string());
            }
        }
    }

    lines()
        .find(|line| {
            !line.contains("AT+") && !line.contains("OK") && !line.contains("ERROR") && !line.starts_with("+CUSD:")
        })
        .map(str::to_string)
}

/// Subscriber number from `+CNUM: "","+84912345678",145`
pub fn parse_subscriber_number(response: &str) -> Option<String> {
    response
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| line.starts_with("+CNUM:"))
        .flat_map(|line| line.split('"').skip(1).step_by(2))
        .map(str::trim)
        .find(|field| {
            (10..=15).contains(&field.len())
                && (field.starts_with('+') || field.starts_with('0') || field.starts_with('8'))
        })
        .map(str::to_string)
}

/// Numeric code from `+CMS ERROR: <digits>`, if present
pub fn parse_cms_code(response: &str) -> Option<&str> {
    let upper = response.to_ascii_uppercase();
    let start = upper.find("+CMS ERROR")? + "+CMS ERROR".len();
    let rest = response[start..].trim_start_matches(|c: char| c == ':' || c.is_whitespace());
    let len = rest.bytes().take_while(u8::is_ascii_digit).count();
    (len > 0).then(|| &rest[..len])
}

/// Message reference from `+CMGS: <digits>`, if present
pub fn parse_message_reference(response: &str) -> Option<&str> {
    let start = response.find("+CMGS:")? + "+CMGS:".len();
    let rest = response[start..].trim_start();
    let len = rest.bytes().take_while(u8::is_ascii_digit).count();
    (len > 0).then(|| &rest[..len])
}
