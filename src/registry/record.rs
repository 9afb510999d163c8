//! ISP record and dual-ISP probe types.

use ahash::AHashSet;
use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Server value meaning the ISP has no known content server.
pub const NO_SERVER: &str = "0.0.0.0";

/// Wire key of the report flag; no probe descriptor may use it.
pub const REPORT_KEY: &str = "report";

fn no_server() -> String {
    NO_SERVER.to_string()
}

/// Static content-delivery facts for one ISP.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IspRecord {
    /// ISP index; `-1` is the Unknown ISP
    pub index: i32,
    /// Display name
    pub name: String,
    /// Preferred content server, or `0.0.0.0` when there is none
    #[serde(default = "no_server")]
    pub server: String,
    /// Filter rule string
    #[serde(default)]
    pub filter: Option<String>,
    /// Allow-list rule string
    #[serde(default)]
    pub allow: Option<String>,
    /// Client-side connectivity probe with conditional overrides
    #[serde(default)]
    pub test: Option<TestSpec>,
}

impl IspRecord {
    /// Create a record with only a name and server.
    pub fn new(index: i32, name: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            server: server.into(),
            filter: None,
            allow: None,
            test: None,
        }
    }

    /// Set the filter rule.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the allow rule.
    pub fn with_allow(mut self, allow: impl Into<String>) -> Self {
        self.allow = Some(allow.into());
        self
    }

    /// Attach a probe test.
    pub fn with_test(mut self, test: TestSpec) -> Self {
        self.test = Some(test);
        self
    }

    /// Check whether a real content server is configured.
    pub fn has_server(&self) -> bool {
        !self.server.is_empty() && self.server != NO_SERVER
    }

    /// The effective filter rule.
    ///
    /// Falls back to the server address when no non-empty rule is set.
    pub fn filter_rule(&self) -> &str {
        match self.filter.as_deref() {
            Some(rule) if !rule.is_empty() => rule,
            _ => &self.server,
        }
    }

    /// The effective allow rule; empty means no restriction.
    pub fn allow_rule(&self) -> &str {
        self.allow.as_deref().unwrap_or("")
    }
}

/// Replacement values applied when a probe returns a given result code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideRule {
    /// Replacement ISP display name
    #[serde(rename = "ispname", default, skip_serializing_if = "Option::is_none")]
    pub isp_name: Option<String>,
    /// Replacement filter rule
    #[serde(rename = "filterrule", default, skip_serializing_if = "Option::is_none")]
    pub filter_rule: Option<String>,
}

/// One probe: an opaque client-side descriptor and the overrides keyed by
/// the result code the client reports.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Probe {
    /// Probe descriptor, e.g. `"steam.wa.co.za icmp *.wa.co.za"` or
    /// `"193.4.194.101 80"`
    #[serde(rename = "probe")]
    pub descriptor: String,
    /// Overrides by result code
    #[serde(default)]
    pub results: BTreeMap<i32, OverrideRule>,
}

impl Probe {
    /// Create a probe with no overrides.
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            results: BTreeMap::new(),
        }
    }

    /// Add an override for a result code.
    pub fn on_result(mut self, code: i32, rule: OverrideRule) -> Self {
        self.results.insert(code, rule);
        self
    }
}

/// A connectivity test the client runs to detect dual-ISP setups.
///
/// Serializes to the flat object clients expect: a `report` flag plus one
/// key per probe descriptor, each mapping result codes to overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSpec {
    /// Whether the client should report the probe outcome
    #[serde(default)]
    pub report: bool,
    /// Probes in declaration order
    #[serde(default)]
    pub probes: Vec<Probe>,
}

impl TestSpec {
    /// Create an empty test.
    pub fn new(report: bool) -> Self {
        Self {
            report,
            probes: Vec::new(),
        }
    }

    /// Append a probe.
    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probes.push(probe);
        self
    }

    /// Look up the override for a probe descriptor and result code.
    pub fn override_for(&self, descriptor: &str, code: i32) -> Option<&OverrideRule> {
        self.probes
            .iter()
            .find(|p| p.descriptor == descriptor)
            .and_then(|p| p.results.get(&code))
    }

    /// Iterate over probe descriptors.
    pub fn descriptors(&self) -> impl Iterator<Item = &str> {
        self.probes.iter().map(|p| p.descriptor.as_str())
    }

    /// Find a descriptor that cannot be a wire key: the reserved
    /// [`REPORT_KEY`] or one already used by an earlier probe.
    pub fn conflicting_descriptor(&self) -> Option<&str> {
        let mut seen = AHashSet::with_capacity(self.probes.len());
        self.descriptors().find(|d| *d == REPORT_KEY || !seen.insert(*d))
    }
}

impl Serialize for TestSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.probes.len() + 1))?;
        map.serialize_entry(REPORT_KEY, &self.report)?;
        for probe in &self.probes {
            map.serialize_entry(&probe.descriptor, &probe.results)?;
        }
        map.end()
    }
}
