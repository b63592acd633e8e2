//! Masking rule model
//!
//! A [`Rule`] pairs a compiled pattern with a [`Detector`] deciding whether a
//! match is accepted and a [`Replacement`] describing what gets spliced in.
//! Constraints the `regex` crate cannot express as lookaround are carried as a
//! [`ContextGuard`] checked around each match.

use llm_router_core::{Error, Result};
use regex::{Captures, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Candidate validator
pub type Validator = fn(&str) -> bool;

/// Rule certainty tier, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTier {
    /// Checksum-validated identifiers
    Checksum,
    /// Strict formats with structural validation
    StrictFormat,
    /// Phone numbers with an explicit country prefix
    InternationalPhone,
    /// Well-structured formats (e-mail, URL, IP, IBAN)
    Structured,
    /// Business identifiers
    Business,
    /// Pattern-based with surrounding context (dates, money)
    Contextual,
    /// Specific short formats
    Format,
    /// Generic, potentially noisy patterns
    Generic,
}

impl RuleTier {
    /// All tiers in application order
    pub const ALL: [RuleTier; 8] = [
        Self::Checksum,
        Self::StrictFormat,
        Self::InternationalPhone,
        Self::Structured,
        Self::Business,
        Self::Contextual,
        Self::Format,
        Self::Generic,
    ];
}

/// Decides whether a pattern match is masked
#[derive(Clone)]
pub enum Detector {
    /// Every match is masked
    Pattern,

    /// The match (or one named group of it) must pass a validator
    Validated {
        validator: Validator,
        group: Option<&'static str>,
    },

    /// A stateful predicate over the matched text (e.g. a dictionary lookup)
    Contextual(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern => write!(f, "Pattern"),
            Self::Validated { group, .. } => f.debug_struct("Validated").field("group", group).finish(),
            Self::Contextual(_) => write!(f, "Contextual"),
        }
    }
}

/// What replaces an accepted match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// The whole match becomes the placeholder
    Whole,

    /// Only the named group is replaced; the rest of the match (a label) stays
    Group(&'static str),

    /// `{{IP}}` for the address, plus `:{{PORT}}` when the `port` group matched
    WithPort,
}

/// Port placeholder used by [`Replacement::WithPort`]
pub const PORT_PLACEHOLDER: &str = "{{PORT}}";

/// Characters that must not touch a match
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextGuard {
    group: Option<&'static str>,
    before: Option<fn(char) -> bool>,
    after: Option<fn(char) -> bool>,
}

impl ContextGuard {
    /// Reject matches preceded or followed by a character in `class`
    pub fn not_between(class: fn(char) -> bool) -> Self {
        Self {
            group: None,
            before: Some(class),
            after: Some(class),
        }
    }

    /// Reject matches preceded by a character in `class`
    pub fn not_preceded_by(class: fn(char) -> bool) -> Self {
        Self {
            group: None,
            before: Some(class),
            after: None,
        }
    }

    /// Reject matches followed by a character in `class`
    pub fn not_followed_by(mut self, class: fn(char) -> bool) -> Self {
        self.after = Some(class);
        self
    }

    /// Only check the guard when `group` took part in the match, around that group
    pub fn on_group(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }

    /// An existing placeholder touching a guarded side counts as a character
    /// of the guarded class.
    fn allows(&self, text: &str, caps: &Captures<'_>, reserved: &[Range<usize>]) -> bool {
        let span = match self.group {
            Some(name) => match caps.name(name) {
                Some(m) => m.range(),
                None => return true,
            },
            None => match caps.get(0) {
                Some(m) => m.range(),
                None => return true,
            },
        };

        if let Some(class) = self.before {
            if text[..span.start].chars().next_back().is_some_and(class)
                || reserved.iter().any(|r| r.end == span.start)
            {
                return false;
            }
        }
        if let Some(class) = self.after {
            if text[span.end..].chars().next().is_some_and(class)
                || reserved.iter().any(|r| r.start == span.end)
            {
                return false;
            }
        }
        true
    }
}

/// `\w` as a character predicate
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `\d` as a character predicate
pub fn is_digit_char(c: char) -> bool {
    c.is_numeric()
}

/// ASCII identifier character (`[A-Za-z0-9_]`)
pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// ASCII identifier character or an opening parenthesis
pub fn is_identifier_or_paren(c: char) -> bool {
    is_identifier_char(c) || c == '('
}

/// Spans of `{{UPPER_SNAKE}}` placeholders already present in `text`
pub fn placeholder_spans(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] != b'{' || bytes[i + 1] != b'{' {
            i += 1;
            continue;
        }
        let body_start = i + 2;
        let mut j = body_start;
        while j < bytes.len() && (bytes[j].is_ascii_uppercase() || bytes[j] == b'_') {
            j += 1;
        }
        if j > body_start && j + 1 < bytes.len() && bytes[j] == b'}' && bytes[j + 1] == b'}' {
            spans.push(i..j + 2);
            i = j + 2;
        } else {
            i += 1;
        }
    }
    spans
}

/// A match accepted by a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// Name of the rule that produced the candidate
    pub rule: &'static str,
    /// Byte offset where the replaced span starts
    pub start: usize,
    /// Byte offset where the replaced span ends
    pub end: usize,
    /// Replaced text
    pub text: &'a str,
    /// Text spliced in place of the span
    pub replacement: String,
}

/// A single masking rule
#[derive(Clone)]
pub struct Rule {
    name: &'static str,
    tier: RuleTier,
    regex: Regex,
    placeholder: &'static str,
    detector: Detector,
    replacement: Replacement,
    guard: Option<ContextGuard>,
}

impl Rule {
    /// Compile a rule; the pattern is case-sensitive unless `(?i)` is used
    pub fn new(
        name: &'static str,
        tier: RuleTier,
        pattern: &str,
        placeholder: &'static str,
    ) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .build()
            .map_err(|e| Error::rule(format!("Failed to compile {} regex: {}", name, e)))?;

        Ok(Self {
            name,
            tier,
            regex,
            placeholder,
            detector: Detector::Pattern,
            replacement: Replacement::Whole,
            guard: None,
        })
    }

    /// Require the whole match to pass `validator`
    pub fn validated(mut self, validator: Validator) -> Self {
        self.detector = Detector::Validated {
            validator,
            group: None,
        };
        self
    }

    /// Require the named group to pass `validator`
    pub fn validated_group(mut self, group: &'static str, validator: Validator) -> Self {
        self.detector = Detector::Validated {
            validator,
            group: Some(group),
        };
        self
    }

    /// Require the matched text to pass a stateful predicate
    pub fn contextual(mut self, predicate: Arc<dyn Fn(&str) -> bool + Send + Sync>) -> Self {
        self.detector = Detector::Contextual(predicate);
        self
    }

    /// Set the replacement strategy
    pub fn replacing(mut self, replacement: Replacement) -> Self {
        self.replacement = replacement;
        self
    }

    /// Attach a context guard
    pub fn guarded(mut self, guard: ContextGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Stable rule name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Certainty tier
    pub fn tier(&self) -> RuleTier {
        self.tier
    }

    /// Placeholder token
    pub fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    /// Detector variant
    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Underlying pattern source
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    fn accepts(&self, caps: &Captures<'_>) -> bool {
        match &self.detector {
            Detector::Pattern => true,
            Detector::Validated { validator, group } => {
                let target = match group {
                    Some(name) => caps.name(name),
                    None => caps.get(0),
                };
                target.is_some_and(|m| validator(m.as_str()))
            }
            Detector::Contextual(predicate) => caps.get(0).is_some_and(|m| predicate(m.as_str())),
        }
    }

    fn splice<'a>(&self, text: &'a str, caps: &Captures<'a>) -> Option<Candidate<'a>> {
        let (span, replacement) = match &self.replacement {
            Replacement::Whole => (caps.get(0)?.range(), self.placeholder.to_string()),
            Replacement::Group(name) => (caps.name(name)?.range(), self.placeholder.to_string()),
            Replacement::WithPort => {
                let replacement = if caps.name("port").is_some() {
                    format!("{}:{}", self.placeholder, PORT_PLACEHOLDER)
                } else {
                    self.placeholder.to_string()
                };
                (caps.get(0)?.range(), replacement)
            }
        };

        Some(Candidate {
            rule: self.name,
            start: span.start,
            end: span.end,
            text: &text[span],
            replacement,
        })
    }

    /// Accepted, non-overlapping candidates in `text`, left to right.
    ///
    /// A match rejected by the context guard, or touching an existing
    /// placeholder, lets the scan resume one character later. The guard treats
    /// a placeholder directly on a guarded side as a guarded character. A match rejected
    /// by the detector is consumed.
    pub fn candidates<'a>(&self, text: &'a str) -> Vec<Candidate<'a>> {
        let reserved = placeholder_spans(text);
        let mut out = Vec::new();
        let mut pos = 0;

        while pos <= text.len() {
            let Some(caps) = self.regex.captures_at(text, pos) else {
                break;
            };
            let Some(whole) = caps.get(0) else {
                break;
            };

            let overlaps_reserved = reserved
                .iter()
                .any(|r| whole.start() < r.end && r.start < whole.end());
            let guarded_out = self
                .guard
                .is_some_and(|g| !g.allows(text, &caps, &reserved));

            if whole.is_empty() || overlaps_reserved || guarded_out {
                pos = next_char_boundary(text, whole.start());
                continue;
            }

            if self.accepts(&caps) {
                if let Some(candidate) = self.splice(text, &caps) {
                    out.push(candidate);
                }
            }
            pos = whole.end();
        }

        out
    }

    /// Replace every accepted candidate with its placeholder.
    ///
    /// Borrows `text` when nothing matched.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let candidates = self.candidates(text);
        if candidates.is_empty() {
            return Cow::Borrowed(text);
        }

        metrics::counter!("llm_router_rule_matches_total", "rule" => self.name)
            .increment(candidates.len() as u64);

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for c in &candidates {
            out.push_str(&text[last..c.start]);
            out.push_str(&c.replacement);
            last = c.end;
        }
        out.push_str(&text[last..]);
        Cow::Owned(out)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("tier", &self.tier)
            .field("placeholder", &self.placeholder)
            .field("detector", &self.detector)
            .field("replacement", &self.replacement)
            .finish()
    }
}

fn next_char_boundary(text: &str, at: usize) -> usize {
    text[at..]
        .chars()
        .next()
        .map_or(text.len() + 1, |c| at + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits_rule() -> Rule {
        Rule::new("digits", RuleTier::Generic, r"\d{3}", "{{D}}").unwrap()
    }

    #[test]
    fn test_apply_borrows_when_unchanged() {
        let rule = digits_rule();
        assert!(matches!(rule.apply("no numbers"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_apply_replaces_all() {
        let rule = digits_rule();
        assert_eq!(rule.apply("a 123 b 456"), "a {{D}} b {{D}}");
    }

    #[test]
    fn test_validator_rejection_keeps_text() {
        let rule = digits_rule().validated(|s| s != "123");
        assert_eq!(rule.apply("123 456"), "123 {{D}}");
    }

    #[test]
    fn test_group_replacement_keeps_label() {
        let rule = Rule::new("tagged", RuleTier::Checksum, r"ID:\s*(?P<id>\d+)", "{{ID}}")
            .unwrap()
            .replacing(Replacement::Group("id"));
        assert_eq!(rule.apply("ID: 42 and ID:7"), "ID: {{ID}} and ID:{{ID}}");
    }

    #[test]
    fn test_guard_resumes_one_char_later() {
        let rule = digits_rule().guarded(ContextGuard::not_between(is_digit_char));
        // "1234": every 3-digit window touches another digit
        assert_eq!(rule.apply("1234 567"), "1234 {{D}}");
    }

    #[test]
    fn test_guard_on_group_only() {
        let rule = Rule::new(
            "alt",
            RuleTier::Generic,
            r"(?:x\d+)|(?P<bare>\d+)",
            "{{N}}",
        )
        .unwrap()
        .guarded(ContextGuard::not_preceded_by(is_identifier_char).on_group("bare"));

        assert_eq!(rule.apply("ax12 a12 12"), "a{{N}} a12 {{N}}");
    }

    #[test]
    fn test_placeholders_are_reserved() {
        let rule = Rule::new("upper", RuleTier::Generic, r"[A-Z]{3,}", "{{UP}}").unwrap();
        assert_eq!(rule.apply("{{EMAIL}} ABC"), "{{EMAIL}} {{UP}}");
    }

    #[test]
    fn test_guard_treats_adjacent_placeholder_as_word() {
        let rule = Rule::new("intl", RuleTier::InternationalPhone, r"\+\d{11}", "{{INTL}}")
            .unwrap()
            .guarded(ContextGuard::not_preceded_by(is_word_char));

        assert_eq!(rule.apply("{{SOCIAL_ID}}+48123456789"), "{{SOCIAL_ID}}+48123456789");
        assert_eq!(rule.apply("x+48123456789"), "x+48123456789");
        assert_eq!(rule.apply("{{SOCIAL_ID}} +48123456789"), "{{SOCIAL_ID}} {{INTL}}");
    }

    #[test]
    fn test_unguarded_side_ignores_placeholder() {
        let rule = Rule::new("digits", RuleTier::Generic, r"\d{3}", "{{D}}")
            .unwrap()
            .guarded(ContextGuard::not_preceded_by(is_word_char));
        assert_eq!(rule.apply("a 123{{X}}"), "a {{D}}{{X}}");
    }

    #[test]
    fn test_placeholder_spans() {
        assert_eq!(placeholder_spans("a {{X_Y}} {{}} {{z}} {{Q}}"), vec![2..9, 21..26]);
    }

    #[test]
    fn test_with_port() {
        let rule = Rule::new("ip", RuleTier::Structured, r"\d+\.\d+(?::(?P<port>\d+))?", "{{IP}}")
            .unwrap()
            .replacing(Replacement::WithPort);
        assert_eq!(rule.apply("1.2 and 3.4:80"), "{{IP}} and {{IP}}:{{PORT}}");
    }

    #[test]
    fn test_invalid_pattern_is_rule_error() {
        let err = Rule::new("broken", RuleTier::Generic, r"(", "{{X}}").unwrap_err();
        assert!(matches!(err, Error::Rule(_)));
    }

    #[test]
    fn test_tiers_are_ordered() {
        let mut sorted = RuleTier::ALL;
        sorted.sort();
        assert_eq!(sorted, RuleTier::ALL);
    }
}
