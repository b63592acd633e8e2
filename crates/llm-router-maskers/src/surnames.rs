//! Surname dictionary for the beta personal-data rule
//!
//! Surnames are read from `surname,count` CSV files (header row first) and
//! expanded with heuristic Polish inflected forms. The index is immutable
//! once built and shared between stages through an `Arc`.

use llm_router_core::{Error, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Rows with fewer occurrences than this are skipped by default
pub const DEFAULT_MIN_COUNT: u64 = 150;

/// Lower-cased surnames and their inflected forms
#[derive(Debug, Clone, Default)]
pub struct SurnameIndex {
    forms: HashSet<String>,
}

impl SurnameIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from plain surnames, without frequency filtering
    pub fn from_surnames<I, S>(surnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        for surname in surnames {
            index.insert(surname.as_ref());
        }
        index
    }

    /// Load every CSV file in `paths`
    pub fn from_csv_files<P: AsRef<Path>>(paths: &[P], min_count: u64) -> Result<Self> {
        let mut index = Self::new();
        for path in paths {
            let path = path.as_ref();
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::config(format!("Failed to read surname file {}: {}", path.display(), e))
            })?;
            index.extend_from_csv(&content, min_count, &path.display().to_string())?;
        }

        info!(files = paths.len(), forms = index.len(), "Loaded surname index");
        Ok(index)
    }

    /// Add the rows of one CSV document; `source` only labels errors
    pub fn extend_from_csv(&mut self, content: &str, min_count: u64, source: &str) -> Result<()> {
        for (line_no, line) in content.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (surname, count) = line.split_once(',').ok_or_else(|| {
                Error::config(format!("{}:{}: expected 'surname,count'", source, line_no + 1))
            })?;
            let count: u64 = unquote(count).parse().map_err(|_| {
                Error::config(format!("{}:{}: invalid count '{}'", source, line_no + 1, count))
            })?;

            if count < min_count {
                continue;
            }
            self.insert(unquote(surname));
        }
        Ok(())
    }

    /// Add a surname together with its inflected forms
    pub fn insert(&mut self, surname: &str) {
        let base = surname.trim().to_lowercase();
        if base.is_empty() {
            return;
        }
        self.forms.extend(inflected_forms(&base));
        self.forms.insert(base);
    }

    /// Check a lower-cased form
    pub fn contains(&self, word: &str) -> bool {
        self.forms.contains(&word.to_lowercase())
    }

    /// Whether a text token should be masked as a surname.
    ///
    /// The token must start with an uppercase letter and be longer than two
    /// characters, so "Maj" is masked but "maj" is not.
    pub fn is_surname_token(&self, token: &str) -> bool {
        let starts_upper = token.chars().next().is_some_and(char::is_uppercase);
        starts_upper && token.chars().count() > 2 && self.contains(token)
    }

    /// Number of stored forms
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

fn unquote(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

/// Drop the last `n` characters
fn drop_chars(s: &str, n: usize) -> &str {
    match s.char_indices().rev().nth(n.saturating_sub(1)) {
        Some((idx, _)) if n > 0 => &s[..idx],
        _ if n == 0 => s,
        _ => "",
    }
}

/// Heuristic inflected forms of a lower-cased surname.
///
/// Only non-empty, purely alphabetic forms are returned.
pub fn inflected_forms(base: &str) -> HashSet<String> {
    let mut forms = HashSet::new();
    let mut add = |form: String| {
        if !form.is_empty() && form.chars().all(char::is_alphabetic) {
            forms.insert(form);
        }
    };
    let b = base;

    const ADJECTIVAL: [&str; 5] = ["ski", "cki", "dzki", "owski", "ewski"];

    if ADJECTIVAL.iter().any(|s| b.ends_with(*s)) {
        // feminine endings attach to the stem without the trailing "i"
        let stem = drop_chars(b, 1);
        add(b.to_string());
        add(format!("{}a", stem));
        for suffix in ["ego", "emu", "em", "owie"] {
            add(format!("{}{}", b, suffix));
        }
        for suffix in ["iej", "ą"] {
            add(format!("{}{}", stem, suffix));
        }
    } else if b.ends_with("owicz") || b.ends_with("ewicz") {
        for suffix in ["", "a", "owi", "em", "u", "owie"] {
            add(format!("{}{}", b, suffix));
        }
    } else if ["ak", "ek", "ik", "yk"].iter().any(|s| b.ends_with(*s)) {
        for suffix in ["", "a", "owi", "iem", "u", "owie"] {
            add(format!("{}{}", b, suffix));
        }
    } else if let Some(stem) = b.strip_suffix('a') {
        for suffix in ["", "ą", "u", "e", "owie"] {
            add(format!("{}{}", stem, suffix));
        }
    }

    if let Some(stem) = b.strip_suffix("ko") {
        add(b.to_string());
        for suffix in ["ki", "ce", "ką"] {
            add(format!("{}{}", stem, suffix));
        }
    } else if b.ends_with("iec") || b.ends_with("ec") {
        let cut = if b.ends_with("iec") { 4 } else { 3 };
        let stem = format!("{}ń", drop_chars(b, cut));
        add(b.to_string());
        for suffix in ["ca", "cowi", "cem", "ńcem", "cu", "cowie"] {
            add(format!("{}{}", stem, suffix));
        }
    } else {
        for suffix in [
            "a", "u", "owi", "em", "emu", "om", "ów", "ami", "ach", "y", "ie", "ą", "ę", "owie",
        ] {
            add(format!("{}{}", b, suffix));
        }
    }

    forms
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_adjectival_forms() {
        let forms = inflected_forms("kowalski");
        for expected in ["kowalski", "kowalska", "kowalskiego", "kowalskiemu", "kowalskiej", "kowalską"] {
            assert!(forms.contains(expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_patronymic_and_diminutive_forms() {
        let forms = inflected_forms("mickiewicz");
        assert!(forms.contains("mickiewicza"));
        assert!(forms.contains("mickiewiczowi"));

        let forms = inflected_forms("nowak");
        assert!(forms.contains("nowakiem"));
        assert!(forms.contains("nowakowie"));
    }

    #[test]
    fn test_ko_forms() {
        let forms = inflected_forms("kościuszko");
        assert!(forms.contains("kościuszki"));
        assert!(forms.contains("kościuszką"));
    }

    #[test]
    fn test_feminine_a_forms() {
        let forms = inflected_forms("zima");
        assert!(forms.contains("zimą"));
        assert!(!forms.contains("zimie"));
        assert!(forms.contains("zimowie"));
    }

    #[test]
    fn test_drop_chars() {
        assert_eq!(drop_chars("abc", 1), "ab");
        assert_eq!(drop_chars("żółć", 2), "żó");
        assert_eq!(drop_chars("ab", 4), "");
        assert_eq!(drop_chars("ab", 0), "ab");
    }

    #[test]
    fn test_token_rules() {
        let index = SurnameIndex::from_surnames(["Maj", "Nowak"]);
        assert!(index.is_surname_token("Maj"));
        assert!(!index.is_surname_token("maj"));
        assert!(index.is_surname_token("Nowakiem"));
        assert!(!index.is_surname_token("Xyz"));
    }

    #[test]
    fn test_csv_min_count() {
        let mut index = SurnameIndex::new();
        index
            .extend_from_csv("surname,count\nNOWAK,2000\nRZADKI,10\n\n", DEFAULT_MIN_COUNT, "inline")
            .unwrap();

        assert!(index.contains("nowak"));
        assert!(!index.contains("rzadki"));
    }

    #[test]
    fn test_csv_invalid_count_is_config_error() {
        let mut index = SurnameIndex::new();
        let err = index
            .extend_from_csv("surname,count\nNOWAK,many\n", 1, "inline")
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_from_csv_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Nazwisko aktualne,Liczba").unwrap();
        writeln!(file, "WIŚNIEWSKI,1000").unwrap();
        file.flush().unwrap();

        let index = SurnameIndex::from_csv_files(&[file.path()], 150).unwrap();
        assert!(index.contains("wiśniewska"));
        assert!(index.is_surname_token("Wiśniewskiego"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = SurnameIndex::from_csv_files(&["/nonexistent/surnames.csv"], 150).unwrap_err();
        assert!(err.is_config());
    }
}
