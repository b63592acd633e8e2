//! FastMasker engine and transform stage

use crate::config::FastMaskerConfig;
use crate::rules::RuleSet;
use crate::surnames::SurnameIndex;
use async_trait::async_trait;
use llm_router_core::{Payload, Result, TextScope, TransformStage};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info};

/// Applies a [`RuleSet`] to every text field of a payload
#[derive(Debug, Clone)]
pub struct FastMasker {
    rules: Arc<RuleSet>,
    scope: TextScope,
}

impl FastMasker {
    /// Stage identifier used in pipeline configuration
    pub const NAME: &'static str = "fast_masker";

    /// Create a masker over `rules`, masking every string of the payload
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(rules),
            scope: TextScope::AllStrings,
        }
    }

    /// Create a masker with the default rule set
    pub fn standard() -> Result<Self> {
        Ok(Self::new(RuleSet::standard()?))
    }

    /// Build the masker described by `config`, loading surname files if needed
    pub fn from_config(config: &FastMaskerConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = RuleSet::builder()
            .with_eu_vat(config.enable_eu_vat)
            .disable_all(config.disabled_rules.iter().cloned());

        if config.enable_beta_rules {
            let index = SurnameIndex::from_csv_files(&config.surname_files, config.surname_min_count)?;
            builder = builder.with_surnames(Arc::new(index));
        }

        let rules = builder.build()?;
        info!(rules = rules.len(), scope = ?config.scope, "FastMasker initialised");

        Ok(Self::new(rules).with_scope(config.scope))
    }

    /// Restrict or widen the masked fields
    pub fn with_scope(mut self, scope: TextScope) -> Self {
        self.scope = scope;
        self
    }

    /// The rule set in use
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The masked fields
    pub fn scope(&self) -> TextScope {
        self.scope
    }

    /// Mask a single text
    pub fn mask_text<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.rules.apply(text)
    }

    /// Mask every text field under the configured scope, field by field.
    ///
    /// The input payload is left untouched.
    pub fn mask_payload(&self, payload: &Payload) -> Payload {
        payload.map_text(self.scope, |text| self.mask_text(text).into_owned())
    }
}

#[async_trait]
impl TransformStage for FastMasker {
    async fn apply(&self, payload: &Payload) -> Result<Payload> {
        let masked = self.mask_payload(payload);
        debug!(changed = masked != *payload, "fast_masker applied");
        Ok(masked)
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
