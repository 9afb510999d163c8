//! Textual IPv6 prefix matching.

use crate::error::TableError;
use crate::registry::UNKNOWN_ISP;

/// A truncated, uppercase IPv6 address prefix owned by one ISP.
///
/// `bit_length` documents the allocation size only. Matching is a plain
/// textual prefix test and never consults it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ipv6Prefix {
    prefix: String,
    bit_length: u8,
    isp: i32,
}

impl Ipv6Prefix {
    /// Create a prefix entry.
    ///
    /// The prefix is uppercased; it must be non-empty and contain only hex
    /// digits and colons.
    pub fn new(prefix: &str, bit_length: u16, isp: i32) -> Result<Self, TableError> {
        let prefix = prefix.trim().to_uppercase();
        if prefix.is_empty()
            || !prefix.contains(':')
            || !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == ':')
        {
            return Err(TableError::InvalidPrefix(prefix));
        }
        if bit_length > 128 {
            return Err(TableError::PrefixLength(bit_length));
        }

        Ok(Self {
            prefix,
            bit_length: bit_length as u8,
            isp,
        })
    }

    /// The uppercase prefix text.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Declared allocation length in bits.
    pub fn bit_length(&self) -> u8 {
        self.bit_length
    }

    /// Owning ISP index.
    pub fn isp(&self) -> i32 {
        self.isp
    }

    fn matches(&self, upper: &str) -> bool {
        upper.starts_with(&self.prefix)
    }
}

/// Ordered list of IPv6 prefixes; the first entry that textually prefixes
/// the address wins.
#[derive(Debug, Clone, Default)]
pub struct Ipv6PrefixMatcher {
    prefixes: Vec<Ipv6Prefix>,
}

impl Ipv6PrefixMatcher {
    /// Create a matcher; declaration order is match order.
    pub fn new(prefixes: Vec<Ipv6Prefix>) -> Self {
        Self { prefixes }
    }

    /// Find the ISP for an IPv6 address, or `-1` when nothing matches.
    pub fn lookup(&self, address: &str) -> i32 {
        self.find(address).map(|p| p.isp).unwrap_or(UNKNOWN_ISP)
    }

    /// Find the first matching prefix entry.
    pub fn find(&self, address: &str) -> Option<&Ipv6Prefix> {
        let upper = address.to_uppercase();
        self.prefixes.iter().find(|p| p.matches(&upper))
    }

    /// Get the number of prefixes.
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Check if there are no prefixes.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Get the prefixes in match order.
    pub fn prefixes(&self) -> &[Ipv6Prefix] {
        &self.prefixes
    }
}
