//! Bundle resolution: classify an address and compose its ISP's rules.

mod config;

pub use config::{
    installer_url, EngineConfig, DEFAULT_COUNTRY, DEFAULT_FILE_BASE, DEFAULT_LATEST_VERSION,
};

use serde::Serialize;
use std::fmt;

use crate::address::{format_ipv4, Address};
use crate::classifier::AddressClassifier;
use crate::error::{Error, Result};
use crate::registry::{IspRecord, IspRegistry, TestSpec, UNKNOWN_ISP};

/// Everything a client needs for one address.
///
/// Serializes with the short field names clients read: `latest`,
/// `download`, `country`, `ispname`, `filterip`, `filterrule`, `allow` and,
/// only when the ISP has one, `test`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
    #[serde(rename = "latest")]
    pub latest_version: String,
    #[serde(rename = "download")]
    pub download_url: String,
    pub country: String,
    #[serde(rename = "ispname")]
    pub isp_name: String,
    #[serde(rename = "filterip")]
    pub filter_ip: String,
    #[serde(rename = "filterrule")]
    pub filter_rule: String,
    #[serde(rename = "allow")]
    pub allow_rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<TestSpec>,
    /// Matched ISP index; not part of the wire form
    #[serde(skip)]
    pub isp: i32,
}

impl Bundle {
    /// Apply the outcome of a client-side probe.
    ///
    /// When the bundle's test defines an override for `descriptor` and
    /// `code`, its ISP name and filter rule replace the static ones.
    /// Returns `true` if an override applied.
    pub fn apply_probe(&mut self, descriptor: &str, code: i32) -> bool {
        let rule = match self.test.as_ref().and_then(|t| t.override_for(descriptor, code)) {
            Some(rule) => rule.clone(),
            None => return false,
        };

        if let Some(name) = rule.isp_name {
            self.isp_name = name;
        }
        if let Some(filter) = rule.filter_rule {
            self.filter_rule = filter;
        }
        true
    }

    /// Get a single string field.
    pub fn field(&self, field: BundleField) -> &str {
        match field {
            BundleField::Latest => &self.latest_version,
            BundleField::Download => &self.download_url,
            BundleField::Country => &self.country,
            BundleField::IspName => &self.isp_name,
            BundleField::FilterIp => &self.filter_ip,
            BundleField::FilterRule => &self.filter_rule,
            BundleField::Allow => &self.allow_rule,
        }
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The string fields of a [`Bundle`], by wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleField {
    Latest,
    Download,
    Country,
    IspName,
    FilterIp,
    FilterRule,
    Allow,
}

impl BundleField {
    /// All fields in wire order.
    pub const ALL: [BundleField; 7] = [
        BundleField::Latest,
        BundleField::Download,
        BundleField::Country,
        BundleField::IspName,
        BundleField::FilterIp,
        BundleField::FilterRule,
        BundleField::Allow,
    ];

    /// Parse a wire name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "latest" => Some(BundleField::Latest),
            "download" => Some(BundleField::Download),
            "country" => Some(BundleField::Country),
            "ispname" => Some(BundleField::IspName),
            "filterip" => Some(BundleField::FilterIp),
            "filterrule" => Some(BundleField::FilterRule),
            "allow" => Some(BundleField::Allow),
            _ => None,
        }
    }

    /// Get the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleField::Latest => "latest",
            BundleField::Download => "download",
            BundleField::Country => "country",
            BundleField::IspName => "ispname",
            BundleField::FilterIp => "filterip",
            BundleField::FilterRule => "filterrule",
            BundleField::Allow => "allow",
        }
    }
}

impl fmt::Display for BundleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Top-level entry point: address in, [`Bundle`] out.
///
/// Holds only immutable data, so one resolver can be shared across threads
/// behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct BundleResolver {
    classifier: AddressClassifier,
    registry: IspRegistry,
    config: EngineConfig,
}

impl BundleResolver {
    /// Create a resolver.
    ///
    /// Every ISP index referenced by the classifier's tables must have a
    /// registry record. The classifier's loopback substitute is taken from
    /// `config` and must be a well-formed address.
    pub fn new(
        classifier: AddressClassifier,
        registry: IspRegistry,
        config: EngineConfig,
    ) -> Result<Self> {
        for range in classifier.netblocks().ranges() {
            registry.ensure_defined(range.isp, || format!("netblock {}", range))?;
        }
        for prefix in classifier.ipv6().prefixes() {
            registry.ensure_defined(prefix.isp(), || format!("IPv6 prefix {}", prefix.prefix()))?;
        }

        let classifier = classifier.with_loopback_substitute(config.loopback_substitute.clone());
        let loopback_isp = classify_substitute(&classifier, &config.loopback_substitute)?;
        if loopback_isp == UNKNOWN_ISP {
            log::warn!(
                "Loopback substitute {} maps to the Unknown ISP",
                config.loopback_substitute
            );
        }

        log::debug!(
            "Resolver ready: {} netblocks, {} IPv6 prefixes, {} ISPs",
            classifier.netblocks().len(),
            classifier.ipv6().len(),
            registry.len()
        );

        Ok(Self {
            classifier,
            registry,
            config,
        })
    }

    /// Resolve raw address text into a bundle.
    ///
    /// Fails only when the address is malformed; an address that no table
    /// covers resolves to the Unknown ISP.
    pub fn resolve(&self, address: &str, country: Option<&str>) -> Result<Bundle> {
        let isp = self.classifier.classify(address)?;
        Ok(self.finish(address, isp, country))
    }

    /// Resolve an already-packed IPv4 address.
    pub fn resolve_numeric(&self, ip: u32, country: Option<&str>) -> Bundle {
        let isp = self.classifier.classify_numeric(ip);
        self.finish(&format_ipv4(ip), isp, country)
    }

    /// Classify an address without composing a bundle.
    pub fn classify(&self, address: &str) -> Result<i32> {
        self.classifier.classify(address)
    }

    /// Get the ISP record an address maps to.
    pub fn record_for(&self, address: &str) -> Result<&IspRecord> {
        let isp = self.classifier.classify(address)?;
        Ok(self.registry.get(isp))
    }

    fn finish(&self, address: &str, isp: i32, country: Option<&str>) -> Bundle {
        let country = country
            .filter(|c| !c.is_empty())
            .unwrap_or(self.config.default_country.as_str());

        log::info!("{} (country={}) mapped to {}", address, country, isp);

        self.compose(self.registry.get(isp), country)
    }

    fn compose(&self, record: &IspRecord, country: &str) -> Bundle {
        Bundle {
            latest_version: self.config.latest_version.clone(),
            download_url: self.config.download_url.clone(),
            country: country.to_string(),
            isp_name: record.name.clone(),
            filter_ip: record.server.clone(),
            filter_rule: record.filter_rule().to_string(),
            allow_rule: record.allow_rule().to_string(),
            test: record.test.clone(),
            isp: record.index,
        }
    }

    /// The classifier.
    pub fn classifier(&self) -> &AddressClassifier {
        &self.classifier
    }

    /// The ISP registry.
    pub fn registry(&self) -> &IspRegistry {
        &self.registry
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn classify_substitute(classifier: &AddressClassifier, substitute: &str) -> Result<i32> {
    Address::from_text(substitute)
        .map_err(Error::from)
        .and_then(|address| classifier.classify_address(&address))
        .map_err(|e| Error::Config(format!("loopback substitute {:?}: {}", substitute, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::registry::{IspRecord, OverrideRule, Probe, NO_SERVER, UNKNOWN_ISP};
    use crate::table::{Ipv6Prefix, Ipv6PrefixMatcher, NetblockRange, NetblockTable};

    const WA_PROBE: &str = "steam.wa.co.za icmp *.wa.co.za";

    fn registry() -> IspRegistry {
        IspRegistry::new(vec![
            IspRecord::new(UNKNOWN_ISP, "Unknown", "203.167.129.4")
                .with_filter("# No specific content server for your ISP"),
            IspRecord::new(0, "TelstraClear New Zealand", "203.167.129.4")
                .with_filter("*:27030=wlgwpstmcon01.telstraclear.co.nz"),
            IspRecord::new(3, "Slingshot New Zealand", "119.224.142.146"),
            IspRecord::new(12, "iiNet Australia", NO_SERVER)
                .with_filter("*:27030=steam.cdn.on.net;content?.steampowered.com=")
                .with_allow("//steam.cdn.on.net=*"),
            IspRecord::new(30, "Internet Solutions", "196.38.180.3")
                .with_filter("*:27030=steam.isgaming.co.za")
                .with_test(TestSpec::new(true).with_probe(Probe::new(WA_PROBE).on_result(
                    0,
                    OverrideRule {
                        isp_name: Some("WebAfrica/IS dual ISP".to_string()),
                        filter_rule: Some("*:27030=steam.wa.co.za".to_string()),
                    },
                ))),
        ])
        .unwrap()
    }

    fn classifier() -> AddressClassifier {
        let table = NetblockTable::from_ranges(vec![
            NetblockRange::from_net("203.167.128.0/18".parse().unwrap(), 0),
            NetblockRange::from_net("119.224.0.0/16".parse().unwrap(), 3),
            NetblockRange::from_net("196.38.0.0/16".parse().unwrap(), 30),
        ])
        .unwrap();
        let ipv6 = Ipv6PrefixMatcher::new(vec![Ipv6Prefix::new("2001:4478:", 32, 12).unwrap()]);
        AddressClassifier::new(table, ipv6)
    }

    fn resolver() -> BundleResolver {
        BundleResolver::new(classifier(), registry(), EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_resolve_known() {
        let bundle = resolver().resolve("203.167.129.4", Some("NZ")).unwrap();
        assert_eq!(bundle.isp, 0);
        assert_eq!(bundle.country, "NZ");
        assert_eq!(bundle.isp_name, "TelstraClear New Zealand");
        assert_eq!(bundle.filter_ip, "203.167.129.4");
        assert_eq!(bundle.filter_rule, "*:27030=wlgwpstmcon01.telstraclear.co.nz");
        assert_eq!(bundle.allow_rule, "");
        assert!(bundle.test.is_none());
        assert_eq!(bundle.latest_version, DEFAULT_LATEST_VERSION);
    }

    #[test]
    fn test_resolve_unknown() {
        let bundle = resolver().resolve("8.8.8.8", None).unwrap();
        assert_eq!(bundle.isp, UNKNOWN_ISP);
        assert_eq!(bundle.country, "Unknown");
        assert_eq!(bundle.isp_name, "Unknown");
        assert_eq!(bundle.filter_rule, "# No specific content server for your ISP");
    }

    #[test]
    fn test_empty_country_defaults() {
        let bundle = resolver().resolve("8.8.8.8", Some("")).unwrap();
        assert_eq!(bundle.country, "Unknown");
    }

    #[test]
    fn test_filter_rule_falls_back_to_server() {
        let bundle = resolver().resolve("119.224.142.146", None).unwrap();
        assert_eq!(bundle.filter_rule, "119.224.142.146");
        assert_eq!(bundle.filter_rule, bundle.filter_ip);
    }

    #[test]
    fn test_resolve_ipv6_with_allow() {
        let bundle = resolver().resolve("2001:4478:ABCD::1", None).unwrap();
        assert_eq!(bundle.isp_name, "iiNet Australia");
        assert_eq!(bundle.filter_ip, NO_SERVER);
        assert_eq!(bundle.allow_rule, "//steam.cdn.on.net=*");
    }

    #[test]
    fn test_resolve_numeric() {
        let bundle = resolver().resolve_numeric(0xC426_B403, None); // 196.38.180.3
        assert_eq!(bundle.isp, 30);
    }

    #[test]
    fn test_malformed_address() {
        assert!(matches!(
            resolver().resolve("999.1.1.1", None),
            Err(Error::MalformedAddress(_))
        ));
    }

    #[test]
    fn test_apply_probe() {
        let mut bundle = resolver().resolve("196.38.180.3", None).unwrap();
        assert_eq!(bundle.filter_rule, "*:27030=steam.isgaming.co.za");

        assert!(!bundle.apply_probe(WA_PROBE, 1));
        assert_eq!(bundle.isp_name, "Internet Solutions");

        assert!(bundle.apply_probe(WA_PROBE, 0));
        assert_eq!(bundle.isp_name, "WebAfrica/IS dual ISP");
        assert_eq!(bundle.filter_rule, "*:27030=steam.wa.co.za");
        assert_eq!(bundle.filter_ip, "196.38.180.3");
    }

    #[test]
    fn test_apply_probe_without_test() {
        let mut bundle = resolver().resolve("203.167.129.4", None).unwrap();
        assert!(!bundle.apply_probe(WA_PROBE, 0));
    }

    #[test]
    fn test_json_omits_missing_test() {
        let bundle = resolver().resolve("203.167.129.4", None).unwrap();
        let json: serde_json::Value = serde_json::from_str(&bundle.to_json().unwrap()).unwrap();
        assert!(json.get("test").is_none());
        assert!(json.get("isp").is_none());
        assert_eq!(json["ispname"], "TelstraClear New Zealand");
        assert_eq!(json["latest"], "0.6.1.0");

        let bundle = resolver().resolve("196.38.1.1", None).unwrap();
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["test"]["report"], true);
        assert_eq!(
            json["test"][WA_PROBE]["0"]["ispname"],
            "WebAfrica/IS dual ISP"
        );
    }

    #[test]
    fn test_field_access() {
        let bundle = resolver().resolve("2001:4478::1", Some("AU")).unwrap();
        assert_eq!(bundle.field(BundleField::Country), "AU");
        assert_eq!(bundle.field(BundleField::IspName), "iiNet Australia");
        for field in BundleField::ALL {
            assert_eq!(BundleField::parse(field.as_str()), Some(field));
        }
        assert_eq!(BundleField::parse("ISPNAME"), Some(BundleField::IspName));
        assert_eq!(BundleField::parse("test"), None);
    }

    #[test]
    fn test_undefined_index_rejected_at_build() {
        let table =
            NetblockTable::from_ranges(vec![NetblockRange::from_net("10.0.0.0/8".parse().unwrap(), 99)])
                .unwrap();
        let classifier = AddressClassifier::new(table, Ipv6PrefixMatcher::default());
        let result = BundleResolver::new(classifier, registry(), EngineConfig::default());
        assert!(matches!(result, Err(Error::UndefinedIsp { index: 99, .. })));

        let ipv6 = Ipv6PrefixMatcher::new(vec![Ipv6Prefix::new("2001:4400:", 32, 98).unwrap()]);
        let classifier = AddressClassifier::new(NetblockTable::default(), ipv6);
        let result = BundleResolver::new(classifier, registry(), EngineConfig::default());
        assert!(matches!(result, Err(Error::UndefinedIsp { index: 98, .. })));
    }

    #[test]
    fn test_loopback_from_config() {
        let config = EngineConfig::default().with_loopback_substitute("196.38.180.3");
        let resolver = BundleResolver::new(classifier(), registry(), config).unwrap();
        assert_eq!(resolver.classify("127.0.0.1").unwrap(), 30);
    }

    #[test]
    fn test_malformed_loopback_substitute_rejected_at_build() {
        for bad in ["localhost", "999.1.1.1", "2001:zz::1", ""] {
            let config = EngineConfig::default().with_loopback_substitute(bad);
            let result = BundleResolver::new(classifier(), registry(), config);
            assert!(
                matches!(result, Err(Error::Config(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_unmapped_loopback_substitute_still_builds() {
        let config = EngineConfig::default().with_loopback_substitute("8.8.8.8");
        let resolver = BundleResolver::new(classifier(), registry(), config).unwrap();
        assert_eq!(resolver.classify("127.0.0.1").unwrap(), UNKNOWN_ISP);
    }
}
