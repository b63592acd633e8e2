//! Configuration for the FastMasker stage

use crate::rules::RULE_NAMES;
use crate::surnames::DEFAULT_MIN_COUNT;
use llm_router_core::{Error, Result, TextScope};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// FastMasker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastMaskerConfig {
    /// Which payload fields are masked
    #[serde(default)]
    pub scope: TextScope,

    /// Enable the surname-based `personal_data` rule
    #[serde(default)]
    pub enable_beta_rules: bool,

    /// Enable the `eu_vat` rule (matches many ordinary words)
    #[serde(default)]
    pub enable_eu_vat: bool,

    /// Rule names removed from the default set
    #[serde(default)]
    pub disabled_rules: Vec<String>,

    /// `surname,count` CSV files used by the beta rule
    #[serde(default)]
    pub surname_files: Vec<PathBuf>,

    /// Minimum count for a surname row to be loaded
    #[serde(default = "default_surname_min_count")]
    pub surname_min_count: u64,
}

fn default_surname_min_count() -> u64 {
    DEFAULT_MIN_COUNT
}

impl Default for FastMaskerConfig {
    fn default() -> Self {
        Self {
            scope: TextScope::default(),
            enable_beta_rules: false,
            enable_eu_vat: false,
            disabled_rules: Vec::new(),
            surname_files: Vec::new(),
            surname_min_count: default_surname_min_count(),
        }
    }
}

impl FastMaskerConfig {
    /// Check settings without loading any file
    pub fn validate(&self) -> Result<()> {
        for name in &self.disabled_rules {
            if !RULE_NAMES.contains(&name.as_str()) {
                return Err(Error::config(format!(
                    "Unknown masking rule '{}' in disabled_rules",
                    name
                )));
            }
        }

        if self.enable_beta_rules && self.surname_files.is_empty() {
            return Err(Error::config(
                "enable_beta_rules requires at least one entry in surname_files",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: FastMaskerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, FastMaskerConfig::default());
        assert_eq!(config.surname_min_count, 150);
        assert_eq!(config.scope, TextScope::AllStrings);
    }

    #[test]
    fn test_parse_full() {
        let yaml = r#"
scope: message_contents
enable_eu_vat: true
disabled_rules: [street, phone]
"#;
        let config: FastMaskerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.scope, TextScope::MessageContents);
        assert!(config.enable_eu_vat);
        assert_eq!(config.disabled_rules, vec!["street", "phone"]);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_unknown_rule() {
        let config = FastMaskerConfig {
            disabled_rules: vec!["no_such_rule".to_string()],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_beta_rules_need_surnames() {
        let config = FastMaskerConfig {
            enable_beta_rules: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
