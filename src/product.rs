use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Canonical cpu attribute name
pub const CPU: &str = "cpu";
/// Canonical memory attribute name
pub const MEMORY: &str = "memory";

/// Spot prices keyed by zone
pub type SpotPriceInfo = HashMap<String, f64>;

/// Price table produced by a vendor's bulk download: region -> instance type -> price
pub type PriceTable = HashMap<String, HashMap<String, Price>>;

/// On-demand and per-zone spot price of one instance type in one region
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub on_demand_price: f64,
    #[serde(default)]
    pub spot_price: SpotPriceInfo,
}

impl Price {
    /// Mean spot price over the requested zones that have a spot price.
    ///
    /// Zones without a recorded price do not count towards the average. If none
    /// of them has one, the result is 0.
    pub fn average_spot(&self, zones: &[String]) -> f64 {
        let requested: BTreeSet<&str> = zones.iter().map(String::as_str).collect();
        let prices: Vec<f64> = requested
            .into_iter()
            .filter_map(|zone| self.spot_price.get(zone).copied())
            .collect();

        if prices.is_empty() {
            return 0.0;
        }
        prices.iter().sum::<f64>() / prices.len() as f64
    }
}

/// Network performance categories understood by the recommender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkPerfCategory {
    Low,
    Medium,
    High,
    Extra,
}

impl NetworkPerfCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkPerfCategory::Low => "low",
            NetworkPerfCategory::Medium => "medium",
            NetworkPerfCategory::High => "high",
            NetworkPerfCategory::Extra => "extra",
        }
    }
}

impl fmt::Display for NetworkPerfCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a virtual machine type as reported by a vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmShape {
    #[serde(rename = "type")]
    pub instance_type: String,
    pub cpus: f64,
    #[serde(rename = "mem")]
    pub memory_gib: f64,
    /// Vendor's own network performance label
    #[serde(default)]
    pub ntw_perf: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntw_perf_category: Option<NetworkPerfCategory>,
    #[serde(default)]
    pub burst: bool,
}

impl VmShape {
    pub fn new(instance_type: impl Into<String>, cpus: f64, memory_gib: f64) -> Self {
        Self {
            instance_type: instance_type.into(),
            cpus,
            memory_gib,
            ntw_perf: String::new(),
            ntw_perf_category: None,
            burst: false,
        }
    }
}

/// A possible value of a vm attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttrValue {
    pub str_value: String,
    pub value: f64,
}

/// Deduplicate attribute values by their numeric value, keeping the first seen
pub fn dedup_attr_values(values: impl IntoIterator<Item = AttrValue>) -> Vec<AttrValue> {
    let mut seen = BTreeSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.value.to_bits()))
        .collect()
}

/// Spot price of a single zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonePrice {
    pub zone: String,
    pub price: f64,
}

/// Vm shape joined with its cached pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    #[serde(flatten)]
    pub shape: VmShape,
    pub on_demand_price: f64,
    #[serde(rename = "spotPrice")]
    pub spot_info: Vec<ZonePrice>,
}

impl ProductDetails {
    pub fn new(shape: VmShape, price: Option<&Price>) -> Self {
        let (on_demand_price, mut spot_info) = match price {
            Some(p) => (
                p.on_demand_price,
                p.spot_price
                    .iter()
                    .map(|(zone, price)| ZonePrice {
                        zone: zone.clone(),
                        price: *price,
                    })
                    .collect::<Vec<_>>(),
            ),
            None => (0.0, Vec::new()),
        };
        spot_info.sort_by(|a, b| a.zone.cmp(&b.zone));

        Self {
            shape,
            on_demand_price,
            spot_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_with_spot(spot: &[(&str, f64)]) -> Price {
        Price {
            on_demand_price: 0.2,
            spot_price: spot.iter().map(|(z, p)| (z.to_string(), *p)).collect(),
        }
    }

    #[test]
    fn test_average_spot_ignores_zones_without_price() {
        let price = price_with_spot(&[("eastus-1", 0.04)]);
        let zones = vec!["eastus-1".to_string(), "eastus-2".to_string()];
        assert_eq!(price.average_spot(&zones), 0.04);
    }

    #[test]
    fn test_average_spot_is_zero_without_data() {
        let price = price_with_spot(&[]);
        assert_eq!(price.average_spot(&["a".to_string()]), 0.0);
        assert_eq!(price.average_spot(&[]), 0.0);
    }

    #[test]
    fn test_average_spot_means_over_present_zones() {
        let price = price_with_spot(&[("a", 0.1), ("b", 0.3), ("c", 1.0)]);
        let zones = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert!((price.average_spot(&zones) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_dedup_attr_values_by_value() {
        let values = vec![
            AttrValue { str_value: "2".into(), value: 2.0 },
            AttrValue { str_value: "4".into(), value: 4.0 },
            AttrValue { str_value: "2".into(), value: 2.0 },
        ];
        let deduped = dedup_attr_values(values);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn test_product_details_sorts_zones() {
        let price = price_with_spot(&[("b", 0.3), ("a", 0.1)]);
        let details = ProductDetails::new(VmShape::new("Standard_D2", 2.0, 7.0), Some(&price));
        assert_eq!(details.on_demand_price, 0.2);
        assert_eq!(details.spot_info[0].zone, "a");
        assert_eq!(details.spot_info[1].zone, "b");
    }

    #[test]
    fn test_price_serializes_camel_case() {
        let json = serde_json::to_value(price_with_spot(&[("a", 0.1)])).unwrap();
        assert_eq!(json["onDemandPrice"], 0.2);
        assert_eq!(json["spotPrice"]["a"], 0.1);
    }
}
