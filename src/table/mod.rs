//! Address-to-ISP lookup tables.

mod ipv6;
mod netblock;

pub use ipv6::{Ipv6Prefix, Ipv6PrefixMatcher};
pub use netblock::{NetblockRange, NetblockTable};
