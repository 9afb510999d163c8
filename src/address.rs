//! Client address forms accepted by the classifier.

use std::fmt;
use std::net::Ipv6Addr;

use crate::error::AddressError;

/// Literal that local development servers report as the client address.
pub const LOOPBACK: &str = "127.0.0.1";

/// A client address, resolved once at the boundary into one of the shapes
/// the classifier knows how to look up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// Dotted-quad text, validated when it is packed
    Ipv4Text(String),
    /// Already-packed IPv4 address, most significant octet first
    Ipv4Numeric(u32),
    /// Any text containing a colon
    Ipv6Text(String),
}

impl Address {
    /// Classify raw text by shape.
    ///
    /// The presence of a colon selects the IPv6 path; everything else is
    /// treated as a dotted quad.
    pub fn from_text(text: &str) -> Result<Self, AddressError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AddressError::Empty);
        }

        if text.contains(':') {
            let host = text.split('%').next().unwrap_or(text);
            if host.parse::<Ipv6Addr>().is_err() {
                return Err(AddressError::InvalidIpv6(text.to_string()));
            }
            return Ok(Address::Ipv6Text(text.to_string()));
        }

        Ok(Address::Ipv4Text(text.to_string()))
    }

    /// Returns `true` for either IPv4 form.
    pub fn is_ipv4(&self) -> bool {
        !matches!(self, Address::Ipv6Text(_))
    }
}

impl From<u32> for Address {
    fn from(value: u32) -> Self {
        Address::Ipv4Numeric(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Ipv4Text(text) | Address::Ipv6Text(text) => f.write_str(text),
            Address::Ipv4Numeric(value) => f.write_str(&format_ipv4(*value)),
        }
    }
}

/// Pack a dotted quad into a `u32`, most significant octet first.
///
/// Each of the four fields must be non-empty ASCII digits with a value no
/// greater than 255. Leading zeros are accepted and read as decimal.
pub fn parse_ipv4(text: &str) -> Result<u32, AddressError> {
    let fields: Vec<&str> = text.split('.').collect();
    if fields.len() != 4 {
        return Err(AddressError::OctetCount {
            address: text.to_string(),
            count: fields.len(),
        });
    }

    let mut total: u32 = 0;
    for field in fields {
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::NonNumericOctet {
                address: text.to_string(),
                octet: field.to_string(),
            });
        }

        let octet = field
            .parse::<u32>()
            .ok()
            .filter(|v| *v <= 255)
            .ok_or_else(|| AddressError::OctetOutOfRange {
                address: text.to_string(),
                octet: field.to_string(),
            })?;

        total = (total << 8) | octet;
    }

    Ok(total)
}

/// Render a packed IPv4 address as a dotted quad.
pub fn format_ipv4(value: u32) -> String {
    let [a, b, c, d] = value.to_be_bytes();
    format!("{}.{}.{}.{}", a, b, c, d)
}
