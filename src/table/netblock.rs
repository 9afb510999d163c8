//! Sorted IPv4 netblock table.

use std::cmp::Ordering;
use std::fmt;

use ipnet::Ipv4Net;

use crate::address::format_ipv4;
use crate::error::TableError;
use crate::registry::UNKNOWN_ISP;

/// An inclusive IPv4 interval owned by one ISP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetblockRange {
    /// First address in the block
    pub low: u32,
    /// Last address in the block
    pub high: u32,
    /// Owning ISP index
    pub isp: i32,
}

impl NetblockRange {
    /// Create a range from packed bounds.
    pub fn new(low: u32, high: u32, isp: i32) -> Self {
        Self { low, high, isp }
    }

    /// Create a range covering a CIDR block.
    pub fn from_net(net: Ipv4Net, isp: i32) -> Self {
        Self {
            low: u32::from(net.network()),
            high: u32::from(net.broadcast()),
            isp,
        }
    }

    /// Check whether `ip` falls inside this range.
    pub fn contains(&self, ip: u32) -> bool {
        self.low <= ip && ip <= self.high
    }

    /// Number of addresses covered.
    pub fn size(&self) -> u64 {
        u64::from(self.high) - u64::from(self.low) + 1
    }

    /// Place `ip` relative to this range for binary search.
    fn locate(&self, ip: u32) -> Ordering {
        if self.low > ip {
            Ordering::Greater
        } else if self.high >= ip {
            Ordering::Equal
        } else {
            Ordering::Less
        }
    }
}

impl fmt::Display for NetblockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} => {}",
            format_ipv4(self.low),
            format_ipv4(self.high),
            self.isp
        )
    }
}

/// Immutable table of disjoint IPv4 ranges, sorted by start address.
///
/// Lookups are a binary search, so any number of threads may share one
/// table without locking.
///
/// # Examples
/// ```
/// use netblock::table::{NetblockRange, NetblockTable};
///
/// let table = NetblockTable::from_ranges(vec![
///     NetblockRange::new(0x0A000000, 0x0AFFFFFF, 3),
///     NetblockRange::new(0xC0A80000, 0xC0A8FFFF, 7),
/// ])
/// .unwrap();
///
/// assert_eq!(table.lookup(0x0A010203), 3);
/// assert_eq!(table.lookup(0x08080808), -1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NetblockTable {
    ranges: Vec<NetblockRange>,
}

impl NetblockTable {
    /// Build a table from ranges in any order.
    ///
    /// Ranges are sorted by `low`; inverted or overlapping ranges are
    /// rejected.
    pub fn from_ranges(mut ranges: Vec<NetblockRange>) -> Result<Self, TableError> {
        if let Some(bad) = ranges.iter().find(|r| r.low > r.high) {
            return Err(TableError::InvertedRange {
                low: bad.low,
                high: bad.high,
            });
        }

        ranges.sort_by_key(|r| r.low);

        for pair in ranges.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.low <= prev.high {
                return Err(TableError::Overlap {
                    low: prev.low,
                    high: prev.high,
                    isp: prev.isp,
                    next_low: next.low,
                    next_isp: next.isp,
                });
            }
        }

        Ok(Self { ranges })
    }

    /// Find the ISP owning `ip`, or `-1` when no range contains it.
    pub fn lookup(&self, ip: u32) -> i32 {
        self.find(ip).map(|r| r.isp).unwrap_or(UNKNOWN_ISP)
    }

    /// Find the range containing `ip`.
    pub fn find(&self, ip: u32) -> Option<&NetblockRange> {
        self.ranges
            .binary_search_by(|range| range.locate(ip))
            .ok()
            .map(|idx| &self.ranges[idx])
    }

    /// Get the number of ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Check if the table has no ranges.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Get the ranges in ascending order.
    pub fn ranges(&self) -> &[NetblockRange] {
        &self.ranges
    }

    /// Iterate over the ISP index of every range, in address order.
    pub fn isp_indices(&self) -> impl Iterator<Item = i32> + '_ {
        self.ranges.iter().map(|r| r.isp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::parse_ipv4;

    fn ip(text: &str) -> u32 {
        parse_ipv4(text).unwrap()
    }

    fn sample_table() -> NetblockTable {
        NetblockTable::from_ranges(vec![
            NetblockRange::from_net("203.167.128.0/18".parse().unwrap(), 0),
            NetblockRange::from_net("121.98.0.0/16".parse().unwrap(), 1),
            NetblockRange::new(ip("58.28.0.0"), ip("58.28.255.255"), 5),
            NetblockRange::new(ip("196.38.0.0"), ip("196.38.255.255"), 30),
        ])
        .unwrap()
    }

    #[test]
    fn test_sorted_after_build() {
        let table = sample_table();
        let lows: Vec<u32> = table.ranges().iter().map(|r| r.low).collect();
        let mut sorted = lows.clone();
        sorted.sort();
        assert_eq!(lows, sorted);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_lookup_hits() {
        let table = sample_table();
        assert_eq!(table.lookup(ip("203.167.129.4")), 0);
        assert_eq!(table.lookup(ip("121.98.10.20")), 1);
        assert_eq!(table.lookup(ip("58.28.25.146")), 5);
        assert_eq!(table.lookup(ip("196.38.180.3")), 30);
    }

    #[test]
    fn test_lookup_boundaries() {
        let table = sample_table();
        // First and last address of a block are both inside it
        assert_eq!(table.lookup(ip("203.167.128.0")), 0);
        assert_eq!(table.lookup(ip("203.167.191.255")), 0);
        assert_eq!(table.lookup(ip("203.167.127.255")), UNKNOWN_ISP);
        assert_eq!(table.lookup(ip("203.167.192.0")), UNKNOWN_ISP);
    }

    #[test]
    fn test_lookup_misses() {
        let table = sample_table();
        assert_eq!(table.lookup(ip("8.8.8.8")), UNKNOWN_ISP);
        assert_eq!(table.lookup(0), UNKNOWN_ISP);
        assert_eq!(table.lookup(u32::MAX), UNKNOWN_ISP);
    }

    #[test]
    fn test_single_address_range() {
        let table =
            NetblockTable::from_ranges(vec![NetblockRange::new(100, 100, 9)]).unwrap();
        assert_eq!(table.lookup(99), UNKNOWN_ISP);
        assert_eq!(table.lookup(100), 9);
        assert_eq!(table.lookup(101), UNKNOWN_ISP);
    }

    #[test]
    fn test_empty_table() {
        let table = NetblockTable::default();
        assert!(table.is_empty());
        assert_eq!(table.lookup(ip("1.2.3.4")), UNKNOWN_ISP);
    }

    #[test]
    fn test_adjacent_ranges() {
        let table = NetblockTable::from_ranges(vec![
            NetblockRange::new(10, 19, 1),
            NetblockRange::new(20, 29, 2),
        ])
        .unwrap();
        assert_eq!(table.lookup(19), 1);
        assert_eq!(table.lookup(20), 2);
    }

    #[test]
    fn test_overlap_rejected() {
        let result = NetblockTable::from_ranges(vec![
            NetblockRange::new(10, 20, 1),
            NetblockRange::new(20, 30, 2),
        ]);
        assert!(matches!(result, Err(TableError::Overlap { .. })));
    }

    #[test]
    fn test_inverted_rejected() {
        let result = NetblockTable::from_ranges(vec![NetblockRange::new(30, 20, 1)]);
        assert_eq!(
            result.unwrap_err(),
            TableError::InvertedRange { low: 30, high: 20 }
        );
    }

    #[test]
    fn test_every_address_in_range_agrees() {
        let table = sample_table();
        let range = NetblockRange::from_net("58.28.25.0/24".parse().unwrap(), 5);
        for addr in range.low..=range.high {
            assert_eq!(table.lookup(addr), 5);
        }
        assert_eq!(range.size(), 256);
    }

    #[test]
    fn test_display() {
        let range = NetblockRange::from_net("10.0.0.0/8".parse().unwrap(), 3);
        assert_eq!(range.to_string(), "10.0.0.0-10.255.255.255 => 3");
    }
}
