//! Ethernet hardware addresses.

use std::fmt;
use std::str::FromStr;

use crate::error::{MacvtapError, MacvtapResult};

/// A validated 48-bit Ethernet hardware address.
///
/// Accepted input forms:
/// - `0a:59:00:dc:6a:e0`
/// - `0a-59-00-dc-6a-e0`
/// - `0a59.00dc.6ae0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HardwareAddr([u8; 6]);

impl HardwareAddr {
    /// Number of octets in an Ethernet address.
    pub const LEN: usize = 6;

    /// Create an address from raw octets.
    #[must_use]
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Parse an address from its textual form.
    ///
    /// # Errors
    ///
    /// Returns [`MacvtapError::InvalidMac`] if the value is not a 48-bit address.
    pub fn parse(value: &str) -> MacvtapResult<Self> {
        let invalid = || MacvtapError::InvalidMac {
            value: value.to_string(),
        };

        let digits: String = if value.contains('.') {
            // Dotted form: three groups of four hex digits.
            let groups: Vec<&str> = value.split('.').collect();
            if groups.len() != 3 || groups.iter().any(|g| g.len() != 4) {
                return Err(invalid());
            }
            groups.concat()
        } else {
            let separator = if value.contains('-') { '-' } else { ':' };
            let groups: Vec<&str> = value.split(separator).collect();
            if groups.len() != Self::LEN || groups.iter().any(|g| g.len() != 2) {
                return Err(invalid());
            }
            groups.concat()
        };

        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut octets = [0u8; 6];
        for (octet, pair) in octets.iter_mut().zip(digits.as_bytes().chunks(2)) {
            let pair = std::str::from_utf8(pair).map_err(|_| invalid())?;
            *octet = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(Self(octets))
    }

    /// The raw octets.
    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for HardwareAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_octets(&self.0))
    }
}

impl FromStr for HardwareAddr {
    type Err = MacvtapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Format raw link-layer octets as lowercase, colon-separated hex.
///
/// Unlike [`HardwareAddr`], any length is accepted since the kernel reports
/// addresses of other link types too.
#[must_use]
pub fn format_octets(octets: &[u8]) -> String {
    octets
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_colon_form() {
        let mac: HardwareAddr = "0a:59:00:dc:6a:e0".parse().unwrap();
        assert_eq!(mac.octets(), [0x0a, 0x59, 0x00, 0xdc, 0x6a, 0xe0]);
        assert_eq!(mac.to_string(), "0a:59:00:dc:6a:e0");
    }

    #[test]
    fn parse_other_forms() {
        let hyphen: HardwareAddr = "0A-59-00-DC-6A-E0".parse().unwrap();
        let dotted: HardwareAddr = "0a59.00dc.6ae0".parse().unwrap();
        assert_eq!(hyphen, dotted);
        assert_eq!(hyphen.to_string(), "0a:59:00:dc:6a:e0");
    }

    #[test]
    fn reject_invalid() {
        for value in [
            "",
            "0a:59:00:dc:6a",
            "0a:59:00:dc:6a:e0:01",
            "0a:59:00:dc:6a:zz",
            "0a:59:00:dc:6a:e",
            "0a59.00dc",
            "not-a-mac",
        ] {
            let err = HardwareAddr::parse(value).unwrap_err();
            assert!(matches!(err, MacvtapError::InvalidMac { .. }), "{value}");
        }
    }

    #[test]
    fn format_any_length() {
        assert_eq!(format_octets(&[]), "");
        assert_eq!(format_octets(&[0xde, 0xad, 0xbe, 0xef]), "de:ad:be:ef");
    }
}
