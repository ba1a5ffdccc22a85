//! Resolution of free-text billing region labels ("US East 2") to vendor region
//! ids ("eastus2").

use crate::error::{ProductInfoError, Result};
use std::collections::HashMap;

/// Label prefix -> geography code used in region ids
#[derive(Debug, Clone)]
pub struct RegionCodeTable {
    codes: HashMap<String, String>,
}

impl RegionCodeTable {
    pub fn new<K, V>(codes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            codes: codes
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Geography prefixes used by Azure meter regions
    pub fn azure() -> Self {
        Self::new([
            ("ap", "asia"),
            ("au", "australia"),
            ("br", "brazil"),
            ("ca", "canada"),
            ("eu", "europe"),
            ("fr", "france"),
            ("in", "india"),
            ("ja", "japan"),
            ("kr", "korea"),
            ("uk", "uk"),
            ("us", "us"),
        ])
    }

    /// Unknown prefixes map to an empty geography
    pub fn lookup(&self, prefix: &str) -> &str {
        self.codes.get(prefix).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct RegionResolver {
    table: RegionCodeTable,
}

impl RegionResolver {
    pub fn new(table: RegionCodeTable) -> Self {
        Self { table }
    }

    /// Resolve `label` to one of the ids in `known_regions` (id -> display name).
    ///
    /// The geography code is tried both before and after the remaining words;
    /// a trailing number always stays last.
    pub fn resolve(&self, label: &str, known_regions: &HashMap<String, String>) -> Result<String> {
        self.candidates(label)
            .into_iter()
            .find(|candidate| known_regions.contains_key(candidate))
            .ok_or_else(|| ProductInfoError::RegionNotFound(label.to_string()))
    }

    fn candidates(&self, label: &str) -> Vec<String> {
        let lowered = label.to_lowercase();
        let parts: Vec<&str> = lowered.split_whitespace().collect();
        let Some((first, rest)) = parts.split_first() else {
            return Vec::new();
        };
        let geo = self.table.lookup(first);

        match rest.split_last() {
            Some((last, middle)) if last.parse::<u32>().is_ok() => {
                let middle = middle.concat();
                vec![
                    format!("{geo}{middle}{last}"),
                    format!("{middle}{geo}{last}"),
                ]
            }
            _ => {
                let rest = rest.concat();
                vec![format!("{geo}{rest}"), format!("{rest}{geo}")]
            }
        }
    }
}

impl Default for RegionResolver {
    fn default() -> Self {
        Self::new(RegionCodeTable::azure())
    }
}
