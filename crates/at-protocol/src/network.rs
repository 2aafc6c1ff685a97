//! Network identity tables
//!
//! Radio access technologies reported by `+CREG` and the friendly names of
//! operators that report their numeric MCC/MNC instead of a name.

use std::fmt;

/// Access technology (`<AcT>`) reported in the extended `+CREG` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccessTechnology {
    Gsm,
    Utran,
    Egprs,
    Hsdpa,
    Hsupa,
    HsdpaHsupa,
    Lte,
}

impl AccessTechnology {
    /// Map a numeric `<AcT>` value
    pub fn from_act(act: u8) -> Option<Self> {
        match act {
            0 => Some(AccessTechnology::Gsm),
            2 => Some(AccessTechnology::Utran),
            3 => Some(AccessTechnology::Egprs),
            4 => Some(AccessTechnology::Hsdpa),
            5 => Some(AccessTechnology::Hsupa),
            6 => Some(AccessTechnology::HsdpaHsupa),
            7 => Some(AccessTechnology::Lte),
            _ => None,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            AccessTechnology::Gsm => "GSM",
            AccessTechnology::Utran => "UTRAN",
            AccessTechnology::Egprs => "GSM w/EGPRS",
            AccessTechnology::Hsdpa => "UTRAN w/HSDPA",
            AccessTechnology::Hsupa => "UTRAN w/HSUPA",
            AccessTechnology::HsdpaHsupa => "UTRAN w/HSDPA and HSUPA",
            AccessTechnology::Lte => "E-UTRAN (LTE)",
        }
    }
}

impl fmt::Display for AccessTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric PLMN codes and their display names
const OPERATORS: &[(&str, &str)] = &[
    ("45201", "Mobifone"),
    ("45202", "Vinaphone"),
    ("45204", "Viettel"),
    ("45205", "Vietnamobile"),
    ("45207", "Gmobile"),
    ("45208", "Itelecom"),
];

/// Friendly operator name; unknown names pass through unchanged
pub fn operator_display_name(name: &str) -> String {
    OPERATORS
        .iter()
        .find(|(code, _)| *code == name)
        .map(|(_, display)| display.to_string())
        .unwrap_or_else(|| name.to_string())
}
