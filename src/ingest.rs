//! Turns raw vendor meter records into a normalized price table.

use crate::error::{error_type_name, ProductInfoError, Result};
use crate::machine_type::MachineTypeNormalizer;
use crate::metrics;
use crate::product::PriceTable;
use crate::region::RegionResolver;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Meter category of compute instances
pub const COMPUTE_CATEGORY: &str = "Virtual Machines";

/// A billing meter as exposed by a vendor rate card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeterRecord {
    #[serde(default)]
    pub meter_category: String,
    #[serde(default)]
    pub meter_sub_category: String,
    #[serde(default)]
    pub meter_region: String,
    #[serde(default)]
    pub meter_tags: Vec<String>,
    /// Price breakpoints keyed by quantity threshold
    #[serde(default)]
    pub meter_rates: BTreeMap<String, f64>,
}

/// A record that passed parsing
#[derive(Debug, Clone, PartialEq)]
struct ParsedMeter {
    region: String,
    instance_type: String,
    unit_price: f64,
    spot: bool,
}

pub struct PriceIngestor {
    vendor: String,
    resolver: RegionResolver,
    normalizer: MachineTypeNormalizer,
}

impl PriceIngestor {
    pub fn new(vendor: &str, resolver: RegionResolver, normalizer: MachineTypeNormalizer) -> Self {
        Self {
            vendor: vendor.to_string(),
            resolver,
            normalizer,
        }
    }

    /// Build the price table from `records`, resolving regions against
    /// `known_regions` (id -> display name).
    ///
    /// Records that fail to parse are logged and skipped; the rest still land in
    /// the table.
    pub fn ingest(&self, records: &[MeterRecord], known_regions: &HashMap<String, String>) -> PriceTable {
        let mut table = PriceTable::new();

        for record in records {
            let meter = match self.parse(record, known_regions) {
                Ok(Some(meter)) => meter,
                Ok(None) => continue,
                Err(e) => {
                    debug!(vendor = %self.vendor, "skipping meter: {}", e);
                    metrics::record_skipped_record(&self.vendor, error_type_name(&e));
                    continue;
                }
            };

            let prices = table.entry(meter.region.clone()).or_default();
            let price = prices.entry(meter.instance_type.clone()).or_default();
            if meter.spot {
                price.spot_price.insert(meter.region.clone(), meter.unit_price);
            } else {
                price.on_demand_price = meter.unit_price;
            }
            let price = price.clone();
            debug!(
                region = %meter.region,
                machinetype = %meter.instance_type,
                ?price,
                "price info added"
            );

            for variant in self.normalizer.variants(&meter.instance_type) {
                debug!(region = %meter.region, machinetype = %variant, ?price, "price info added");
                prices.insert(variant, price.clone());
            }
        }

        table
    }

    /// `Ok(None)` for records that are not priced compute instances
    fn parse(&self, record: &MeterRecord, known_regions: &HashMap<String, String>) -> Result<Option<ParsedMeter>> {
        if record.meter_category != COMPUTE_CATEGORY
            || !record.meter_tags.is_empty()
            || record.meter_region.is_empty()
        {
            return Ok(None);
        }
        let sub_category = record.meter_sub_category.as_str();
        if sub_category.contains("(Windows)") {
            return Ok(None);
        }

        let region = self.resolver.resolve(&record.meter_region, known_regions)?;

        let tokens: Vec<&str> = sub_category.split(' ').collect();
        if tokens.len() < 2 {
            return Err(ProductInfoError::MalformedRecord(format!(
                "couldn't parse meter sub category: {}, region={}",
                sub_category, record.meter_region
            )));
        }
        let raw_type = match tokens[1] {
            "VM" => tokens[0].to_string(),
            "VM_Promo" => format!("{}_Promo", tokens[0]),
            other => {
                return Err(ProductInfoError::MalformedRecord(format!(
                    "unknown pricing tier {} in sub category: {}, region={}",
                    other, sub_category, record.meter_region
                )))
            }
        };
        let instance_type = self.normalizer.canonicalize(&raw_type);

        if record.meter_rates.is_empty() {
            debug!(
                "{} doesn't have rate info in region {}",
                sub_category, record.meter_region
            );
            return Ok(None);
        }
        // breakpoints are summed, matching the vendor's observed rate card totals
        let unit_price: f64 = record.meter_rates.values().sum();
        if unit_price < 0.0 {
            return Err(ProductInfoError::MalformedRecord(format!(
                "negative rate for {}, region={}",
                sub_category, record.meter_region
            )));
        }

        Ok(Some(ParsedMeter {
            region,
            instance_type,
            unit_price,
            spot: is_reduced_availability(sub_category),
        }))
    }
}

fn is_reduced_availability(sub_category: &str) -> bool {
    let lowered = sub_category.to_lowercase();
    lowered.contains("low priority") || lowered.split_whitespace().any(|t| t == "spot")
}
