//! LLM Router Maskers
//!
//! Rule-based anonymization of personal and business identifiers.
//!
//! Every rule replaces what it detects with an `{{UPPER_SNAKE}}` placeholder.
//! Rules run in a fixed order, grouped by certainty:
//! - Checksum-validated identifiers (card numbers, PESEL, NIP, KRS, REGON, VIN)
//! - Strict and structured formats (IBAN, e-mail, URL, IP)
//! - Business references, dates and amounts
//! - Generic patterns (streets, phone numbers) and the beta surname rule
//!
//! Placeholders already in the text are never matched again, so masking an
//! already masked text leaves it unchanged.

pub mod config;
pub mod masker;
pub mod rule;
pub mod rules;
pub mod surnames;
pub mod validators;

pub use config::FastMaskerConfig;
pub use masker::FastMasker;
pub use rule::{Candidate, ContextGuard, Detector, Replacement, Rule, RuleTier};
pub use rules::{RuleSet, RuleSetBuilder, RULE_NAMES};
pub use surnames::SurnameIndex;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::FastMaskerConfig;
    pub use crate::masker::FastMasker;
    pub use crate::rules::{RuleSet, RuleSetBuilder};
    pub use crate::surnames::SurnameIndex;
}
