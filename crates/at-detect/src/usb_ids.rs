//! USB Vendor IDs of GSM modems and the serial bridges found on modem boards
//!
//! Used only to label ports in listings; every port that passes the name
//! filter is probed regardless of its vendor.

/// Cellular module vendors
pub mod modem {
    /// SIMCom (SIM7600, SIM800 USB variants)
    pub const SIMCOM: u16 = 0x1E0E;
    /// Quectel (EC25, EG25, UC20)
    pub const QUECTEL: u16 = 0x2C7C;
    /// Huawei (E3372, E173 in serial mode)
    pub const HUAWEI: u16 = 0x12D1;
    /// ZTE (MF-series sticks)
    pub const ZTE: u16 = 0x19D2;
    /// Sierra Wireless (MC/EM series)
    pub const SIERRA: u16 = 0x1199;
}

/// USB-to-serial bridges used on SIM800/SIM900 breakout boards
pub mod bridge {
    /// FTDI
    pub const FTDI: u16 = 0x0403;
    /// Silicon Labs CP210x
    pub const CP210X: u16 = 0x10C4;
    /// WCH CH340/CH341
    pub const CH340: u16 = 0x1A86;
    /// Prolific PL2303
    pub const PROLIFIC: u16 = 0x067B;
}

/// Whether the VID belongs to a cellular module vendor
pub fn is_modem_vendor(vid: u16) -> bool {
    matches!(
        vid,
        modem::SIMCOM | modem::QUECTEL | modem::HUAWEI | modem::ZTE | modem::SIERRA
    )
}

/// Display hint for a USB vendor
pub fn vendor_hint(vid: u16) -> Option<&'static str> {
    match vid {
        modem::SIMCOM => Some("SIMCom modem"),
        modem::QUECTEL => Some("Quectel modem"),
        modem::HUAWEI => Some("Huawei modem"),
        modem::ZTE => Some("ZTE modem"),
        modem::SIERRA => Some("Sierra Wireless modem"),
        bridge::FTDI => Some("FTDI"),
        bridge::CP210X => Some("CP210x"),
        bridge::CH340 => Some("CH340"),
        bridge::PROLIFIC => Some("PL2303"),
        _ => None,
    }
}
