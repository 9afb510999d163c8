//! Error types for netblock.

use thiserror::Error;

/// Error type for netblock operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Client address could not be parsed
    #[error("malformed address: {0}")]
    MalformedAddress(#[from] AddressError),

    /// Netblock table or prefix list failed validation
    #[error("invalid netblock table: {0}")]
    Table(#[from] TableError),

    /// Registry has no record for the Unknown ISP (index -1)
    #[error("ISP registry has no Unknown (-1) record")]
    MissingUnknownIsp,

    /// An ISP index appears twice in the registry
    #[error("duplicate ISP index in registry: {0}")]
    DuplicateIsp(i32),

    /// A probe descriptor is reserved or repeated within one ISP's test
    #[error("ISP {index} test has conflicting probe descriptor {descriptor:?}")]
    ConflictingProbe { index: i32, descriptor: String },

    /// A netblock or prefix refers to an index the registry does not define
    #[error("{context} refers to undefined ISP index {index}")]
    UndefinedIsp { index: i32, context: String },

    /// Netblock list syntax error
    #[error("netblock list line {line}: {message}")]
    Parse { line: usize, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Default engine not initialized
    #[error("netblock engine not initialized")]
    NotInitialized,

    /// Default engine failed to load its embedded data
    #[error("netblock engine failed to initialize: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for netblock operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for address parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Empty input
    #[error("empty address")]
    Empty,

    /// IPv4 literal without exactly four octets
    #[error("expected 4 octets, got {count}: {address}")]
    OctetCount { address: String, count: usize },

    /// IPv4 octet with non-digit characters
    #[error("non-numeric octet {octet:?} in {address}")]
    NonNumericOctet { address: String, octet: String },

    /// IPv4 octet above 255
    #[error("octet {octet} out of range in {address}")]
    OctetOutOfRange { address: String, octet: String },

    /// Colon-bearing address that is not a valid IPv6 literal
    #[error("invalid IPv6 address: {0}")]
    InvalidIpv6(String),
}

/// Error type for netblock table construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// Range with low above high
    #[error("inverted range {low:#010x}-{high:#010x}")]
    InvertedRange { low: u32, high: u32 },

    /// Two ranges share addresses
    #[error("range {low:#010x}-{high:#010x} (ISP {isp}) overlaps range starting {next_low:#010x} (ISP {next_isp})")]
    Overlap {
        low: u32,
        high: u32,
        isp: i32,
        next_low: u32,
        next_isp: i32,
    },

    /// IPv6 prefix that is empty or not hex/colon text
    #[error("invalid IPv6 prefix: {0}")]
    InvalidPrefix(String),

    /// IPv6 prefix length above 128
    #[error("IPv6 prefix length {0} exceeds 128")]
    PrefixLength(u16),
}
