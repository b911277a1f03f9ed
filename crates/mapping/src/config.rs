use anyhow::ensure;
use domstake_primitives::DomainId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MappingConfig {
    /// Domains to derive epoch share prices for, all when absent
    #[serde(default)]
    pub domains: Option<BTreeSet<DomainId>>,
    #[serde(default = "default_true")]
    pub track_operators: bool,
    #[serde(default = "default_true")]
    pub track_bundles: bool
}


impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            domains: None,
            track_operators: true,
            track_bundles: true
        }
    }
}


impl MappingConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(domains) = &self.domains {
            ensure!(!domains.is_empty(), "domain allow-list is present, but empty");
        }
        Ok(())
    }

    pub fn tracks_domain(&self, domain_id: DomainId) -> bool {
        self.domains.as_ref().map_or(true, |domains| domains.contains(&domain_id))
    }
}


fn default_true() -> bool {
    true
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;


    #[test]
    fn defaults() {
        let config: MappingConfig = serde_json::from_value(json!({})).unwrap();
        assert!(config.track_operators);
        assert!(config.track_bundles);
        assert!(config.tracks_domain(42));
        config.validate().unwrap();
    }

    #[test]
    fn domain_allow_list() {
        let config: MappingConfig = serde_json::from_value(json!({
            "domains": [0, 3],
            "trackBundles": false
        })).unwrap();
        assert!(config.tracks_domain(3));
        assert!(!config.tracks_domain(1));
        assert!(!config.track_bundles);

        let config: MappingConfig = serde_json::from_value(json!({"domains": []})).unwrap();
        assert!(config.validate().is_err());

        assert!(serde_json::from_value::<MappingConfig>(json!({"sharesMultiplier": 1})).is_err());
    }
}
