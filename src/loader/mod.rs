//! Loading netblock and ISP data into a resolver.

mod text;

pub use text::{NetblockList, NetblockParser};

use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::classifier::AddressClassifier;
use crate::error::{Error, Result};
use crate::registry::IspRegistry;
use crate::resolver::{BundleResolver, EngineConfig};
use crate::table::{Ipv6PrefixMatcher, NetblockTable};

/// Netblock list compiled into the crate.
pub const EMBEDDED_NETBLOCKS: &str = include_str!("../../data/netblocks.txt");

/// ISP registry compiled into the crate.
pub const EMBEDDED_ISPS: &str = include_str!("../../data/isps.yaml");

/// Build a resolver from a parsed netblock list and a registry.
pub fn build(
    list: NetblockList,
    registry: IspRegistry,
    config: EngineConfig,
) -> Result<BundleResolver> {
    let table = NetblockTable::from_ranges(list.ranges)?;
    let ipv6 = Ipv6PrefixMatcher::new(list.prefixes);
    let classifier = AddressClassifier::new(table, ipv6);
    BundleResolver::new(classifier, registry, config)
}

/// Build a resolver from netblock list text and registry YAML.
pub fn from_strs(netblocks: &str, isps: &str, config: EngineConfig) -> Result<BundleResolver> {
    let list = NetblockParser::parse_str(netblocks)?;
    let registry = IspRegistry::from_yaml(isps)?;
    build(list, registry, config)
}

/// Build a resolver from the embedded data set.
pub fn load_embedded(config: EngineConfig) -> Result<BundleResolver> {
    let resolver = from_strs(EMBEDDED_NETBLOCKS, EMBEDDED_ISPS, config)?;
    log::info!(
        "Loaded embedded data: {} netblocks, {} IPv6 prefixes, {} ISPs",
        resolver.classifier().netblocks().len(),
        resolver.classifier().ipv6().len(),
        resolver.registry().len()
    );
    Ok(resolver)
}

/// Build a resolver from files on disk.
///
/// Either file may be gzip compressed.
pub fn load_files(
    netblocks: impl AsRef<Path>,
    isps: impl AsRef<Path>,
    config: EngineConfig,
) -> Result<BundleResolver> {
    let netblocks = netblocks.as_ref();
    let isps = isps.as_ref();

    let list = NetblockParser::parse(&read_data(netblocks)?[..])?;
    let registry = IspRegistry::from_reader(&read_data(isps)?[..])?;
    let resolver = build(list, registry, config)?;

    log::info!(
        "Loaded {:?} ({} netblocks, {} IPv6 prefixes) and {:?} ({} ISPs)",
        netblocks,
        resolver.classifier().netblocks().len(),
        resolver.classifier().ipv6().len(),
        isps,
        resolver.registry().len()
    );
    Ok(resolver)
}

/// Read a data file, decompressing gzip transparently.
fn read_data(path: &Path) -> Result<Vec<u8>> {
    let raw_data = fs::read(path)?;

    if !is_gzip(&raw_data) {
        return Ok(raw_data);
    }

    let mut decoder = GzDecoder::new(&raw_data[..]);
    let mut data = Vec::new();
    decoder
        .read_to_end(&mut data)
        .map_err(|e| Error::Config(format!("Gzip decompression of {:?} failed: {}", path, e)))?;

    log::debug!(
        "Decompressed {:?}: {} bytes (compressed: {} bytes)",
        path,
        data.len(),
        raw_data.len()
    );
    Ok(data)
}

/// Check if data is gzip compressed.
fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}
