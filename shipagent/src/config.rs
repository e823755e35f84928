use std::collections::BTreeMap;

use wmsfetcher::{FederationConfig, StoreAccount};

pub const API_BASE_ENV: &str = "WAREHOUSE_API_BASE";
pub const KEY_PREFIX: &str = "WAREHOUSE_KEY_";
pub const SECRET_PREFIX: &str = "WAREHOUSE_SECRET_";
pub const DEFAULT_API_BASE: &str = "https://storeapi.warehouselink.example/api/v1";

/// Discover the federation from the process environment: one
/// `WAREHOUSE_KEY_<NAME>` / `WAREHOUSE_SECRET_<NAME>` pair per store,
/// ordered by store name. A store missing half its pair stays configured
/// but credential-less, so it is skipped at call time rather than
/// erroring.
pub fn federation_from_env() -> FederationConfig {
    federation_from_vars(std::env::vars())
}

pub fn federation_from_vars(
    vars: impl IntoIterator<Item = (String, String)>,
) -> FederationConfig {
    let mut api_base = DEFAULT_API_BASE.to_string();
    let mut keys: BTreeMap<String, String> = BTreeMap::new();
    let mut secrets: BTreeMap<String, String> = BTreeMap::new();

    for (name, value) in vars {
        if value.trim().is_empty() {
            continue;
        }
        if name == API_BASE_ENV {
            api_base = value;
        } else if let Some(store) = name.strip_prefix(KEY_PREFIX) {
            keys.insert(store.to_string(), value);
        } else if let Some(store) = name.strip_prefix(SECRET_PREFIX) {
            secrets.insert(store.to_string(), value);
        }
    }

    let mut names: Vec<String> = keys.keys().chain(secrets.keys()).cloned().collect();
    names.sort();
    names.dedup();

    let stores = names
        .into_iter()
        .map(|name| {
            let mut account = StoreAccount::new(name.clone());
            account.api_key = keys.remove(&name);
            account.api_secret = secrets.remove(&name);
            account
        })
        .collect();

    FederationConfig::new(api_base, stores)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn discovers_stores_sorted_by_name() {
        let config = federation_from_vars(vars(&[
            ("WAREHOUSE_KEY_JEEP", "jk"),
            ("WAREHOUSE_SECRET_JEEP", "js"),
            ("WAREHOUSE_KEY_DIESEL", "dk"),
            ("WAREHOUSE_SECRET_DIESEL", "ds"),
            ("UNRELATED", "x"),
        ]));

        let names: Vec<&str> = config.stores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["DIESEL", "JEEP"]);
        assert!(config.stores.iter().all(StoreAccount::has_credentials));
    }

    #[test]
    fn half_a_pair_configures_a_credential_less_store() {
        let config = federation_from_vars(vars(&[("WAREHOUSE_KEY_REEBOK", "rk")]));
        assert_eq!(config.stores.len(), 1);
        assert!(!config.stores[0].has_credentials());
    }

    #[test]
    fn api_base_override_and_default() {
        let config = federation_from_vars(vars(&[(API_BASE_ENV, "https://wms.internal/api/v1")]));
        assert_eq!(config.api_base, "https://wms.internal/api/v1");

        let config = federation_from_vars(vars(&[]));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }
}
