//! Default rule set and ordering policy
//!
//! Rules run from the highest certainty (checksum-validated identifiers) to
//! the lowest (generic patterns), so a validated identifier claims its digits
//! before a broader pattern can. Reordering this list changes masking output.

use crate::rule::{
    is_digit_char, is_identifier_char, is_identifier_or_paren, is_word_char, ContextGuard,
    Replacement, Rule, RuleTier,
};
use crate::surnames::SurnameIndex;
use crate::validators::*;
use llm_router_core::{Error, Result};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Every rule name the builder knows, in application order
pub const RULE_NAMES: [&str; 34] = [
    "credit_card",
    "vin",
    "pesel_tagged",
    "pesel",
    "nip",
    "krs",
    "regon",
    "nrb",
    "mac_address",
    "passport",
    "id_card",
    "ssn",
    "eu_vat",
    "phone_international",
    "email",
    "url",
    "ip",
    "bank_account",
    "jwt",
    "invoice_number",
    "order_number",
    "transaction_ref",
    "date_word",
    "date_number",
    "money",
    "postal_code",
    "health_id",
    "car_plate",
    "sim_card",
    "ssl_cert",
    "street",
    "phone",
    "social_id",
    "personal_data",
];

const PL_MONTHS: &str = "styczeń|stycznia|sty|luty|lutego|lut|marzec|marca|mar|\
kwiecień|kwietnia|kwi|maj|maja|czerwiec|czerwca|cze|lipiec|lipca|lip|sierpień|sierpnia|sie|\
wrzesień|września|wrz|październik|października|paź|listopad|listopada|lis|grudzień|grudnia|gru";

const EN_MONTHS: &str = "January|Jan|February|Feb|March|Mar|April|Apr|May|June|Jun|July|Jul|\
August|Aug|September|Sep|October|Oct|November|Nov|December|Dec";

const CURRENCY_SYMBOLS: &str = r"[$€£¥₽₹]";

const CURRENCY_CODES: &str = "USD|EUR|GBP|PLN|CHF|CAD|AUD|JPY|NOK|SEK|DKK|CZK|HUF|RUB|CNY|INR";

const CURRENCY_WORDS: &str = "zł|zł\\.|złoty|złote|złotych|złotymi|\
dolar|dolara|dolarów|dolary|dolarami|\
euro|eur\\.|eura|eurów|eurem|\
funt|funty|funtów|funtami|\
rubel|rubla|rubli|rublami";

const MAGNITUDE_WORDS: &str = r"tys\.|mln|mld";

const AMOUNT: &str = r"\d{1,3}(?:[ ,.\x{00A0}]\d{3})*(?:[.,]\d{1,2})?";

const STREET_TYPES: &str =
    r"ul\.?|ulica|al\.?|aleja|pl\.?|plac|skwer|os\.?|osiedle|rondo|droga|dr\.?|trakt|t\.?|ścieżka|ś\.?";

const STREET_NAME: &str =
    r"(?:\s+[A-Za-zĄąĆćĘęŁłŃńÓóŚśŹźŻż][A-Za-z0-9ĄąĆćĘęŁłŃńÓóŚśŹźŻż-]*){1,5}";

const URL_TLDS: &str =
    "com|org|net|edu|gov|pl|dev|io|co|uk|de|fr|it|es|ru|cn|jp|br|au|in|nl|se|no|fi|dk|cz|sk|eu|info|biz";

fn date_word_pattern() -> String {
    let pl = format!(r"\d{{1,2}}\s+(?:{pl})\s+\d{{4}}|\d{{4}}\s+(?:{pl})\s+\d{{1,2}}", pl = PL_MONTHS);
    let en = format!(
        r"(?:{en})\s+\d{{1,2}}(?:st|nd|rd|th)?(?:,\s*|\s+)\d{{4}}|\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{en})\s+\d{{4}}",
        en = EN_MONTHS
    );
    format!(r"(?i)(?:{}|{})", pl, en)
}

fn date_number_pattern() -> String {
    let month = r"(?:0[1-9]|1[0-2])";
    let day = r"(?:0[1-9]|[12]\d|3[01])";
    let sep = r"\s*[-./]\s*";
    format!(
        r"\d{{4}}{sep}{month}{sep}{day}|{day}{sep}{month}{sep}\d{{4}}",
        sep = sep,
        month = month,
        day = day
    )
}

fn money_pattern() -> String {
    let prefix = format!("(?:{}|{})", CURRENCY_SYMBOLS, CURRENCY_CODES);
    // Codes and words must end at a word boundary inside the pattern, so "zł"
    // gives way to "złotych" and "EUR" to "euro" without leaving the scan.
    let suffix = format!(
        r"(?:{}|(?:{})(?:\b|_)|(?:{})(?:\b|_))",
        CURRENCY_SYMBOLS, CURRENCY_CODES, CURRENCY_WORDS
    );
    let magnitude = format!(r"(?:\s*(?:{}))?", MAGNITUDE_WORDS);
    format!(
        r"(?i)[_*]*(?:{prefix}\s*?{amount}{magnitude}(?:\s*{suffix})?|{amount}{magnitude}\s*{suffix})[_*]*",
        prefix = prefix,
        amount = AMOUNT,
        magnitude = magnitude,
        suffix = suffix
    )
}

fn url_pattern() -> String {
    format!(
        r"(?i)\bhttps?://(?:[A-Za-z0-9-]+\.)*[A-Za-z0-9-]+\.[A-Za-z]{{2,}}(?:[/:][^\s\)]*)?|(?P<bare>(?:www\.|[A-Za-z0-9-]+\.)[A-Za-z0-9-]+\.(?:{})\b)",
        URL_TLDS
    )
}

fn street_pattern() -> String {
    format!(
        r"(?i)\b(?:{}){}(?:\s+\d+[A-Za-z]?(?:/\d+)?)?\b",
        STREET_TYPES, STREET_NAME
    )
}

/// Spaced lower-case plates read like prose ("at 123", "mam 25"), so a
/// separated letter prefix must be upper case; joined plates match any case.
fn is_plausible_car_plate(plate: &str) -> bool {
    if !is_valid_car_plate(plate) {
        return false;
    }
    let prefix: String = plate.chars().take_while(|c| c.is_alphabetic()).collect();
    let spaced = plate[prefix.len()..].starts_with(char::is_whitespace);
    !spaced || prefix.chars().all(|c| c.is_ascii_uppercase())
}

/// Build one of the standard rules by name
fn standard_rule(name: &str, surnames: Option<&Arc<SurnameIndex>>) -> Result<Rule> {
    use RuleTier::*;

    let rule = match name {
        // 1. checksum-validated identifiers
        "credit_card" => Rule::new(
            "credit_card",
            Checksum,
            r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{1,7}\b",
            "{{CREDIT_CARD}}",
        )?
        .validated(is_valid_credit_card),
        "vin" => Rule::new("vin", Checksum, r"(?i)\b[A-HJ-NPR-Z0-9]{17}\b", "{{VIN}}")?
            .validated(is_valid_vin),
        "pesel_tagged" => Rule::new(
            "pesel_tagged",
            Checksum,
            r"(?i)\bPESEL[:\s]+(?P<pesel>\d{11})\b",
            "{{PESEL_TAGGED}}",
        )?
        .validated_group("pesel", is_valid_pesel)
        .replacing(Replacement::Group("pesel")),
        "pesel" => Rule::new("pesel", Checksum, r"[_*]*(?P<pesel>\d{11})[_*]*", "{{PESEL}}")?
            .validated_group("pesel", is_valid_pesel)
            .guarded(ContextGuard::not_between(is_word_char)),
        "nip" => Rule::new(
            "nip",
            Checksum,
            r"[_*]*(?P<digits>\d{3}-?\d{3}-?\d{2}-?\d{2}|\d{10})[_*]*",
            "{{NIP}}",
        )?
        .validated_group("digits", is_valid_nip)
        .guarded(ContextGuard::not_between(is_digit_char)),
        "krs" => Rule::new(
            "krs",
            Checksum,
            r"\b(?:\d{3}-?\d{3}-?\d{2}-?\d{2}|\d{10})\b",
            "{{KRS}}",
        )?
        .validated(is_valid_krs),
        "regon" => Rule::new(
            "regon",
            Checksum,
            r"\b\d{2}\s?\d{3}\s?\d{4}(?:\s?\d{5})?\b",
            "{{REGON}}",
        )?
        .validated(is_valid_regon),

        // 2. strict formats
        "nrb" => Rule::new(
            "nrb",
            StrictFormat,
            r"\b(?:\d{2}\s?\d{4}(?:\s?\d{4}){5}|\d{26})\b",
            "{{NRB}}",
        )?
        .validated(is_valid_nrb),
        "mac_address" => Rule::new(
            "mac_address",
            StrictFormat,
            r"\b(?:[0-9A-Fa-f]{2}[:\-]?){5}[0-9A-Fa-f]{2}\b",
            "{{MAC_ADDRESS}}",
        )?
        .validated(is_valid_mac),
        "passport" => Rule::new("passport", StrictFormat, r"(?i)\b[A-Z]{2}\d{7}\b", "{{PASSPORT}}")?,
        "id_card" => Rule::new("id_card", StrictFormat, r"(?i)\b[A-Z]{3}\d{6}\b", "{{ID_CARD}}")?,
        "ssn" => Rule::new("ssn", StrictFormat, r"\b\d{3}-\d{2}-\d{4}\b", "{{SSN}}")?
            .validated(is_valid_ssn),
        "eu_vat" => Rule::new("eu_vat", StrictFormat, r"(?i)\b[A-Z]{2}[A-Z0-9]{8,12}\b", "{{EU_VAT}}")?
            .validated(is_valid_eu_vat),

        // 3. international phone numbers
        "phone_international" => Rule::new(
            "phone_international",
            InternationalPhone,
            r"\+\d{1,3}(?:[ \-]?\d{1,4}){2,5}\b",
            "{{PHONE_INTERNATIONAL}}",
        )?
        .guarded(ContextGuard::not_preceded_by(is_word_char)),

        // 4. well-structured formats
        "email" => Rule::new(
            "email",
            Structured,
            r"(?i)_?[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}_?",
            "{{EMAIL}}",
        )?,
        "url" => Rule::new("url", Structured, &url_pattern(), "{{URL}}")?.guarded(
            ContextGuard::not_preceded_by(is_identifier_char)
                .not_followed_by(is_identifier_or_paren)
                .on_group("bare"),
        ),
        "ip" => Rule::new(
            "ip",
            Structured,
            r"\b(?:localhost|(?:\d{1,3}\.){3}\d{1,3}|(?:[A-Fa-f0-9]{1,4}:){7}[A-Fa-f0-9]{1,4})(?::(?P<port>\d{1,5}))?\b",
            "{{IP}}",
        )?
        .replacing(Replacement::WithPort),
        "bank_account" => Rule::new(
            "bank_account",
            Structured,
            r"(?i)\b(?:[A-Z]{2}|XX)?\s*(?:\d{2}|XX)(?:\s*[0-9X]{4}){6}\b",
            "{{BANK_ACCOUNT}}",
        )?,

        // 5. business identifiers
        "jwt" => Rule::new(
            "jwt",
            Business,
            r"\b[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+\b",
            "{{JWT}}",
        )?
        .validated(is_possible_jwt),
        "invoice_number" => Rule::new(
            "invoice_number",
            Business,
            r"(?i)\b(?:FV|INV|INVOICE)[/\-]\d{4}[/\-]\d{3,6}\b",
            "{{INVOICE_NUMBER}}",
        )?,
        "order_number" => Rule::new(
            "order_number",
            Business,
            r"(?i)\b(?:ORD|ORDER)[\-_]?\d{3,10}\b",
            "{{ORDER_NUMBER}}",
        )?,
        "transaction_ref" => Rule::new(
            "transaction_ref",
            Business,
            r"(?i)\b[A-Z]{2,5}[-_]\d{4,8}[-_]\d{3,6}\b",
            "{{TRANSACTION_REF}}",
        )?
        .validated(is_possible_transaction_ref),

        // 6. pattern-based with context
        "date_word" => Rule::new("date_word", Contextual, &date_word_pattern(), "{{DATE_STR}}")?
            .guarded(ContextGuard::not_between(is_word_char)),
        "date_number" => Rule::new("date_number", Contextual, &date_number_pattern(), "{{DATE_NUM}}")?
            .guarded(ContextGuard::not_between(is_digit_char)),
        "money" => Rule::new("money", Contextual, &money_pattern(), "{{MONEY}}")?
            .guarded(ContextGuard::not_between(is_word_char)),

        // 7. specific formats
        "postal_code" => Rule::new("postal_code", Format, r"[_*]*\d{2}-?\d{3}[_*]*", "{{POSTAL_CODE}}")?
            .guarded(ContextGuard::not_between(is_digit_char)),
        "health_id" => Rule::new("health_id", Format, r"\b\d{8}/\d{3}\b", "{{HEALTH_CODE}}")?,
        "car_plate" => Rule::new(
            "car_plate",
            Format,
            r"(?i)\b[A-Z]{2,3}\s?\d{2,5}[A-Z]{0,2}\b",
            "{{CAR_PLATE}}",
        )?
        .validated(is_plausible_car_plate),
        "sim_card" => Rule::new("sim_card", Format, r"\b(?:\d{4}\s?){4}\d{3}\b", "{{SIM_CARD}}")?
            .validated(is_valid_sim_iccid),
        "ssl_cert" => Rule::new("ssl_cert", Format, r"\b[0-9A-Fa-f]{16,40}\b", "{{SSL_CERT}}")?
            .validated(is_valid_ssl_serial),

        // 8. generic patterns
        "street" => Rule::new("street", Generic, &street_pattern(), "{{STREET}}")?,
        "phone" => Rule::new(
            "phone",
            Generic,
            r"\b(?:\d{3}[\s-]?\d{3}[\s-]?\d{3}|\d{2}[\s-]?\d{3}[\s-]?\d{2}[\s-]?\d{2})\b",
            "{{PHONE}}",
        )?,
        "social_id" => Rule::new("social_id", Generic, r"(?i)\bfbid\d{8,}\b", "{{SOCIAL_ID}}")?,
        "personal_data" => {
            let index = surnames
                .cloned()
                .ok_or_else(|| Error::config("personal_data rule requires a surname index"))?;
            Rule::new("personal_data", Generic, r"\b\w+\b", "{{MASKED}}")?
                .contextual(Arc::new(move |token: &str| index.is_surname_token(token)))
        }

        other => return Err(Error::config(format!("Unknown masking rule '{}'", other))),
    };

    Ok(rule)
}

/// Ordered, immutable list of masking rules
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// The default rule set (no EU VAT, no beta rules)
    pub fn standard() -> Result<Self> {
        Self::builder().build()
    }

    /// Start configuring a rule set
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    /// Build a rule set from explicit rules, kept in the given order
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Rule names in application order
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Rules in application order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Look up a rule by name
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the set has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule in order, each one seeing the previous rule's output.
    ///
    /// Passes repeat until one changes nothing, so masking is idempotent. A
    /// changing pass turns unreserved text into placeholders and never touches
    /// existing ones, which bounds the number of passes.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut current = match self.apply_pass(text) {
            Cow::Borrowed(_) => return Cow::Borrowed(text),
            Cow::Owned(s) => s,
        };

        loop {
            let next = match self.apply_pass(&current) {
                Cow::Borrowed(_) => None,
                Cow::Owned(s) => Some(s),
            };
            match next {
                Some(s) => current = s,
                None => return Cow::Owned(current),
            }
        }
    }

    fn apply_pass<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut owned: Option<String> = None;

        for rule in &self.rules {
            let next = match rule.apply(owned.as_deref().unwrap_or(text)) {
                Cow::Borrowed(_) => continue,
                Cow::Owned(s) => s,
            };
            owned = Some(next);
        }

        match owned {
            Some(s) => Cow::Owned(s),
            None => Cow::Borrowed(text),
        }
    }
}

/// Builder for [`RuleSet`]
#[derive(Debug, Clone, Default)]
pub struct RuleSetBuilder {
    surnames: Option<Arc<SurnameIndex>>,
    eu_vat: bool,
    disabled: HashSet<String>,
}

impl RuleSetBuilder {
    /// Enable the beta `personal_data` rule backed by `index`
    pub fn with_surnames(mut self, index: Arc<SurnameIndex>) -> Self {
        self.surnames = Some(index);
        self
    }

    /// Enable the `eu_vat` rule
    pub fn with_eu_vat(mut self, enabled: bool) -> Self {
        self.eu_vat = enabled;
        self
    }

    /// Remove a rule from the set
    pub fn disable(mut self, name: impl Into<String>) -> Self {
        self.disabled.insert(name.into());
        self
    }

    /// Remove several rules from the set
    pub fn disable_all<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled.extend(names.into_iter().map(Into::into));
        self
    }

    /// Compile the rule set
    pub fn build(self) -> Result<RuleSet> {
        if let Some(unknown) = self.disabled.iter().find(|n| !RULE_NAMES.contains(&n.as_str())) {
            return Err(Error::config(format!("Unknown masking rule '{}'", unknown)));
        }

        let mut rules = Vec::with_capacity(RULE_NAMES.len());
        for name in RULE_NAMES {
            let enabled = match name {
                "eu_vat" => self.eu_vat,
                "personal_data" => self.surnames.is_some(),
                _ => true,
            };
            if !enabled || self.disabled.contains(name) {
                continue;
            }
            rules.push(standard_rule(name, self.surnames.as_ref())?);
        }

        debug!(rules = rules.len(), "Compiled masking rule set");
        Ok(RuleSet { rules })
    }
}
