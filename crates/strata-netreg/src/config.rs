use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde::Deserialize;

/// Carrier config key holding the RAT family strings.
pub const KEY_RATCHET_RAT_FAMILIES: &str = "ratchet_rat_families";

/// Platform default families (RIL codes): GPRS/EDGE, EVDO revisions,
/// UMTS/HSPA variants, LTE/LTE-CA.
pub const DEFAULT_RAT_FAMILIES: &[&str] = &["1,2", "7,8,12", "3,11,9,10,15", "14,19"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CarrierConfigInput {
    pub ratchet_rat_families: Option<Vec<String>>,
    #[serde(flatten)]
    pub other: BTreeMap<String, toml::Value>,
}

/// Resolved carrier config bundle for one subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierConfig {
    rat_families: Vec<String>,
    other: BTreeMap<String, toml::Value>,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            rat_families: DEFAULT_RAT_FAMILIES.iter().map(|s| s.to_string()).collect(),
            other: BTreeMap::new(),
        }
    }
}

impl CarrierConfigInput {
    pub fn resolve(self) -> CarrierConfig {
        let rat_families = match self.ratchet_rat_families {
            Some(groups) => groups
                .into_iter()
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect(),
            None => CarrierConfig::default().rat_families,
        };
        CarrierConfig {
            rat_families,
            other: self.other,
        }
    }
}

impl CarrierConfig {
    pub fn with_rat_families<S: AsRef<str>>(groups: &[S]) -> Self {
        Self {
            rat_families: groups.iter().map(|g| g.as_ref().to_string()).collect(),
            other: BTreeMap::new(),
        }
    }

    pub fn from_toml_str(input: &str) -> Result<Self, String> {
        if input.trim().is_empty() {
            return Ok(CarrierConfig::default());
        }
        let parsed: CarrierConfigInput =
            toml::from_str(input).map_err(|e| format!("Invalid carrier config TOML: {}", e))?;
        Ok(parsed.resolve())
    }

    /// Family strings in configured order, e.g. `["1,2", "9,10,11"]`.
    pub fn rat_families(&self) -> &[String] {
        &self.rat_families
    }

    /// Any other key of the bundle, untouched.
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.other.get(key)
    }
}

/// Source of per-subscription carrier config bundles.
pub trait CarrierConfigStore: Send + Sync {
    fn config_for_subscription(&self, sub_id: i32) -> Option<CarrierConfig>;
}

/// Carrier config held in memory, keyed by subscription id.
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    configs: RwLock<HashMap<i32, CarrierConfig>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, sub_id: i32, config: CarrierConfig) {
        self.configs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(sub_id, config);
    }

    pub fn insert_toml(&self, sub_id: i32, input: &str) -> Result<(), String> {
        let config = CarrierConfig::from_toml_str(input)?;
        self.insert(sub_id, config);
        Ok(())
    }

    pub fn remove(&self, sub_id: i32) -> Option<CarrierConfig> {
        self.configs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&sub_id)
    }
}

impl CarrierConfigStore for InMemoryConfigStore {
    fn config_for_subscription(&self, sub_id: i32) -> Option<CarrierConfig> {
        self.configs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&sub_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_toml_config_basic() {
        let toml = r#"
            ratchet_rat_families = ["1,2", " 9, 10, 11 ", ""]
            carrier_name = "Strata Mobile"
        "#;

        let cfg = CarrierConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.rat_families(), &["1,2", "9, 10, 11"]);
        assert_eq!(
            cfg.get("carrier_name").and_then(|v| v.as_str()),
            Some("Strata Mobile")
        );
    }

    #[test]
    fn missing_key_uses_platform_defaults() {
        let cfg = CarrierConfig::from_toml_str("carrier_name = \"x\"").unwrap();
        assert_eq!(cfg.rat_families(), DEFAULT_RAT_FAMILIES);

        let empty = CarrierConfig::from_toml_str("   ").unwrap();
        assert_eq!(empty, CarrierConfig::default());
    }

    #[test]
    fn explicit_empty_list_disables_families() {
        let cfg = CarrierConfig::from_toml_str("ratchet_rat_families = []").unwrap();
        assert!(cfg.rat_families().is_empty());
    }

    #[test]
    fn malformed_family_key_is_rejected() {
        let err = CarrierConfig::from_toml_str("ratchet_rat_families = \"1,2\"").unwrap_err();
        assert!(err.starts_with("Invalid carrier config TOML"));
    }

    #[test]
    fn store_lookup_by_subscription() {
        let store = InMemoryConfigStore::new();
        store
            .insert_toml(3, "ratchet_rat_families = [\"14,19\"]")
            .unwrap();

        let cfg = store.config_for_subscription(3).unwrap();
        assert_eq!(cfg.rat_families(), &["14,19"]);
        assert!(store.config_for_subscription(4).is_none());

        store.remove(3);
        assert!(store.config_for_subscription(3).is_none());
    }
}
