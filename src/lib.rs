//! Netblock - ISP classification and content server rule resolution.
//!
//! This crate maps a client network address to the ISP that owns it and
//! resolves that ISP's content-delivery rules into a [`Bundle`]: the
//! preferred content server, a filter rule, an optional allow rule, and an
//! optional dual-ISP probe test the client can run to refine the result.
//!
//! # Features
//!
//! - **IPv4 netblocks**: sorted, disjoint ranges searched in O(log n)
//! - **IPv6 prefixes**: ordered textual prefix matching
//! - **ISP registry**: static records loaded from YAML
//! - **Dual-ISP probes**: conditional overrides applied from probe results
//! - **Thread-safe**: all lookup data is immutable after load
//! - **Hot reload**: the process-wide resolver can be swapped atomically
//!
//! # Quick Start
//!
//! ```
//! use netblock::resolve;
//!
//! let bundle = resolve("203.167.129.4", None).unwrap();
//! assert_eq!(bundle.isp_name, "TelstraClear New Zealand");
//! assert_eq!(bundle.filter_rule, "*:27030=wlgwpstmcon01.telstraclear.co.nz");
//!
//! // Addresses outside every netblock resolve to the Unknown ISP
//! let bundle = resolve("8.8.8.8", Some("US")).unwrap();
//! assert_eq!(bundle.isp_name, "Unknown");
//!
//! // Malformed input is an error, never a guess
//! assert!(resolve("999.1.1.1", None).is_err());
//! ```
//!
//! # Custom Data
//!
//! Tests and embedders can build a resolver from their own data instead of
//! the embedded set:
//!
//! ```
//! use netblock::{loader, EngineConfig};
//!
//! let netblocks = "[isp=0]\n10.0.0.0/8\n";
//! let isps = r##"
//! - index: -1
//!   name: Unknown
//!   filter: "# nothing known"
//! - index: 0
//!   name: Example ISP
//!   server: 10.0.0.1
//! "##;
//!
//! let resolver = loader::from_strs(netblocks, isps, EngineConfig::default()).unwrap();
//! let bundle = resolver.resolve("10.1.2.3", None).unwrap();
//! assert_eq!(bundle.filter_rule, "10.0.0.1");
//! ```
//!
//! # Resolution Order
//!
//! 1. `127.0.0.1` is replaced by the configured loopback substitute
//! 2. Addresses containing `:` go to the IPv6 prefix list, others to the
//!    IPv4 netblock table
//! 3. No match resolves to ISP `-1` (Unknown)

mod error;
mod global;

pub mod address;
pub mod classifier;
pub mod loader;
pub mod registry;
pub mod resolver;
pub mod table;

// Re-export core types
pub use address::Address;
pub use classifier::AddressClassifier;
pub use error::{AddressError, Error, Result, TableError};
pub use registry::{IspRecord, IspRegistry, OverrideRule, Probe, TestSpec, UNKNOWN_ISP};
pub use resolver::{Bundle, BundleField, BundleResolver, EngineConfig};
pub use table::{Ipv6Prefix, Ipv6PrefixMatcher, NetblockRange, NetblockTable};

// Re-export global API functions
pub use global::{
    classify, current, ensure_initialized, install, is_initialized, reload_embedded,
    reload_from_files, resolve,
};
