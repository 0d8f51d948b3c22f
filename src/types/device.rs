//! Device identity and session types

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Factory-assigned identity a unit announces while unclaimed.
///
/// Rendered and parsed as six colon-separated hex octets, e.g.
/// `AB:CD:EF:01:02:03`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BroadcastCode([u8; 6]);

impl BroadcastCode {
    /// Create a code from raw octets
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Raw octets
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for BroadcastCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for BroadcastCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut count = 0;
        for part in s.split(':') {
            if count == 6 {
                return Err(Error::Config(format!("Broadcast code too long: {}", s)));
            }
            octets[count] = u8::from_str_radix(part, 16)
                .map_err(|_| Error::Config(format!("Broadcast code has invalid octet: {}", s)))?;
            count += 1;
        }
        if count != 6 {
            return Err(Error::Config(format!("Broadcast code too short: {}", s)));
        }
        Ok(Self(octets))
    }
}

/// Session-scoped id the transport assigns at connect time.
///
/// Only meaningful between connect and disconnect; events carrying a
/// stale handle are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(u8);

impl DeviceHandle {
    /// Create a handle from the transport's raw id
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Raw id
    pub fn raw(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session lifecycle state of a device-backed scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// No session; nothing acquired yet or the session was lost
    Disconnected,
    /// Session established, emission idle
    Connected,
    /// Session established, points flowing
    Sampling,
    /// Scanner closed; terminal
    Closed,
}

/// Descriptive record a unit reports at discovery and on change
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Identity the unit announced
    pub broadcast_code: BroadcastCode,
    /// Model name
    pub model: String,
    /// Firmware revision
    pub firmware: String,
}

impl DeviceInfo {
    /// Create an info record
    pub fn new(broadcast_code: BroadcastCode, model: &str, firmware: &str) -> Self {
        Self {
            broadcast_code,
            model: model.to_string(),
            firmware: firmware.to_string(),
        }
    }
}

/// Severity class of a device-reported fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSeverity {
    /// Advisory only; session unaffected
    Warning,
    /// Emission cannot continue; session survives
    Error,
    /// Session cannot continue
    Fatal,
}

/// Device-reported fault status
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceFault {
    /// Severity class
    pub severity: FaultSeverity,
    /// Vendor status word
    pub code: u32,
    /// Human-readable description
    pub message: String,
}

impl DeviceFault {
    /// Create a fault record
    pub fn new(severity: FaultSeverity, code: u32, message: &str) -> Self {
        Self {
            severity,
            code,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_code_parse() {
        let code: BroadcastCode = "AB:CD:EF:01:02:03".parse().unwrap();
        assert_eq!(code.as_bytes(), &[0xAB, 0xCD, 0xEF, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_broadcast_code_display_round_trip() {
        let code = BroadcastCode::new([0xAB, 0xCD, 0xEF, 0x01, 0x02, 0x03]);
        let rendered = code.to_string();
        assert_eq!(rendered, "AB:CD:EF:01:02:03");
        assert_eq!(rendered.parse::<BroadcastCode>().unwrap(), code);
    }

    #[test]
    fn test_broadcast_code_lowercase_accepted() {
        let code: BroadcastCode = "ab:cd:ef:01:02:03".parse().unwrap();
        assert_eq!(code.as_bytes()[0], 0xAB);
    }

    #[test]
    fn test_broadcast_code_rejects_bad_input() {
        assert!("AB:CD:EF:01:02".parse::<BroadcastCode>().is_err());
        assert!("AB:CD:EF:01:02:03:04".parse::<BroadcastCode>().is_err());
        assert!("AB:CD:EF:01:02:ZZ".parse::<BroadcastCode>().is_err());
        assert!("".parse::<BroadcastCode>().is_err());
    }
}
