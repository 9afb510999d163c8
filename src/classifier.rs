//! Address-to-ISP classification.

use crate::address::{parse_ipv4, Address, LOOPBACK};
use crate::error::Result;
use crate::registry::UNKNOWN_ISP;
use crate::table::{Ipv6PrefixMatcher, NetblockTable};

/// Address used in place of the loopback literal.
///
/// Local servers have no routable client address, so loopback requests are
/// classified as this known TelstraClear content server instead.
pub const DEFAULT_LOOPBACK_SUBSTITUTE: &str = "203.167.129.4";

/// Routes an address to the IPv4 netblock table or the IPv6 prefix list.
#[derive(Debug, Clone)]
pub struct AddressClassifier {
    netblocks: NetblockTable,
    ipv6: Ipv6PrefixMatcher,
    loopback_substitute: String,
}

impl AddressClassifier {
    /// Create a classifier over the given tables.
    pub fn new(netblocks: NetblockTable, ipv6: Ipv6PrefixMatcher) -> Self {
        Self {
            netblocks,
            ipv6,
            loopback_substitute: DEFAULT_LOOPBACK_SUBSTITUTE.to_string(),
        }
    }

    /// Override the address substituted for loopback.
    pub fn with_loopback_substitute(mut self, address: impl Into<String>) -> Self {
        self.loopback_substitute = address.into();
        self
    }

    /// Classify raw address text.
    ///
    /// Returns `-1` for a well-formed address that no table covers, and an
    /// error for malformed input.
    ///
    /// # Examples
    /// ```
    /// use netblock::classifier::AddressClassifier;
    /// use netblock::table::{Ipv6PrefixMatcher, NetblockRange, NetblockTable};
    ///
    /// let range = NetblockRange::new(0xCBA78000, 0xCBA7BFFF, 0);
    /// let table = NetblockTable::from_ranges(vec![range]).unwrap();
    /// let classifier = AddressClassifier::new(table, Ipv6PrefixMatcher::default());
    ///
    /// assert_eq!(classifier.classify("203.167.129.4").unwrap(), 0);
    /// assert_eq!(classifier.classify("127.0.0.1").unwrap(), 0);
    /// assert_eq!(classifier.classify("8.8.8.8").unwrap(), -1);
    /// assert!(classifier.classify("999.1.1.1").is_err());
    /// ```
    pub fn classify(&self, raw: &str) -> Result<i32> {
        let raw = raw.trim();
        let text = if raw == LOOPBACK {
            log::debug!("Substituting {} for loopback", self.loopback_substitute);
            self.loopback_substitute.as_str()
        } else {
            raw
        };

        let address = Address::from_text(text)?;
        self.classify_address(&address)
    }

    /// Classify an already-packed IPv4 address.
    pub fn classify_numeric(&self, ip: u32) -> i32 {
        let isp = self.netblocks.lookup(ip);
        if isp == UNKNOWN_ISP {
            log::debug!("Unknown mapping for numeric IPv4 address {:#010x}", ip);
        }
        isp
    }

    /// Classify a parsed address.
    pub fn classify_address(&self, address: &Address) -> Result<i32> {
        let isp = match address {
            Address::Ipv4Numeric(ip) => return Ok(self.classify_numeric(*ip)),
            Address::Ipv4Text(text) => {
                let ip = parse_ipv4(text)?;
                let isp = self.netblocks.lookup(ip);
                if isp == UNKNOWN_ISP {
                    log::warn!("Unknown mapping for IPv4 address {}", text);
                }
                isp
            }
            Address::Ipv6Text(text) => {
                let isp = self.ipv6.lookup(text);
                if isp == UNKNOWN_ISP {
                    log::warn!("Unknown mapping for IPv6 address {}", text.to_uppercase());
                }
                isp
            }
        };
        Ok(isp)
    }

    /// The IPv4 netblock table.
    pub fn netblocks(&self) -> &NetblockTable {
        &self.netblocks
    }

    /// The IPv6 prefix list.
    pub fn ipv6(&self) -> &Ipv6PrefixMatcher {
        &self.ipv6
    }

    /// The address substituted for loopback.
    pub fn loopback_substitute(&self) -> &str {
        &self.loopback_substitute
    }
}
