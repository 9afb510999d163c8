//! ISP record registry.

mod record;

pub use record::{IspRecord, OverrideRule, Probe, TestSpec, NO_SERVER, REPORT_KEY};

use ahash::AHashMap;
use std::io::Read;

use crate::error::{Error, Result};

/// Index reserved for the Unknown ISP.
pub const UNKNOWN_ISP: i32 = -1;

/// Immutable mapping from ISP index to its record.
///
/// The Unknown record (index `-1`) is required at construction, so
/// [`IspRegistry::get`] always has something to return.
#[derive(Debug, Clone)]
pub struct IspRegistry {
    records: AHashMap<i32, IspRecord>,
    unknown: IspRecord,
}

impl IspRegistry {
    /// Build a registry from a list of records.
    ///
    /// Fails if an index repeats, the Unknown record is missing, or a
    /// record's test has a reserved or repeated probe descriptor.
    pub fn new(records: Vec<IspRecord>) -> Result<Self> {
        let mut map = AHashMap::with_capacity(records.len());
        let mut unknown = None;

        for record in records {
            let conflict = record.test.as_ref().and_then(TestSpec::conflicting_descriptor);
            if let Some(descriptor) = conflict {
                return Err(Error::ConflictingProbe {
                    index: record.index,
                    descriptor: descriptor.to_string(),
                });
            }

            if record.index == UNKNOWN_ISP {
                if unknown.is_some() {
                    return Err(Error::DuplicateIsp(UNKNOWN_ISP));
                }
                unknown = Some(record);
                continue;
            }

            let index = record.index;
            if map.insert(index, record).is_some() {
                return Err(Error::DuplicateIsp(index));
            }
        }

        let unknown = unknown.ok_or(Error::MissingUnknownIsp)?;
        Ok(Self {
            records: map,
            unknown,
        })
    }

    /// Parse a YAML list of records.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let records: Vec<IspRecord> = serde_yaml::from_str(text)?;
        Self::new(records)
    }

    /// Parse a YAML list of records from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let records: Vec<IspRecord> = serde_yaml::from_reader(reader)?;
        Self::new(records)
    }

    /// Get the record for an index.
    ///
    /// Indices without a record resolve to the Unknown record.
    pub fn get(&self, index: i32) -> &IspRecord {
        self.records.get(&index).unwrap_or(&self.unknown)
    }

    /// Get the Unknown record.
    pub fn unknown(&self) -> &IspRecord {
        &self.unknown
    }

    /// Check whether an index has its own record.
    pub fn contains(&self, index: i32) -> bool {
        index == UNKNOWN_ISP || self.records.contains_key(&index)
    }

    /// Fail unless `index` is defined; `context` names the referrer.
    pub fn ensure_defined(&self, index: i32, context: impl FnOnce() -> String) -> Result<()> {
        if self.contains(index) {
            Ok(())
        } else {
            Err(Error::UndefinedIsp {
                index,
                context: context(),
            })
        }
    }

    /// Get the number of records, including Unknown.
    pub fn len(&self) -> usize {
        self.records.len() + 1
    }

    /// Always `false`; the Unknown record is mandatory.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Get all records ordered by index.
    pub fn records(&self) -> Vec<&IspRecord> {
        let mut all: Vec<&IspRecord> = self.records.values().collect();
        all.push(&self.unknown);
        all.sort_by_key(|r| r.index);
        all
    }
}
