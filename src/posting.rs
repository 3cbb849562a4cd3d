// src/posting.rs
//! Normalized job posting record and its identity fingerprint.
//!
//! Collectors build `Posting`s straight from scraped cards; nothing here does
//! I/O. Missing optional details are `None` rather than "N/A" strings, and
//! the validity check rejects placeholder titles/companies before anything
//! reaches the seen-set.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Posted date used when a board does not publish one.
pub const DEFAULT_POSTED_DATE: &str = "Recent";

/// Text that boards render in place of a missing value.
const PLACEHOLDERS: &[&str] = &["n/a", "na", "-", "none", "null"];

/// ASCII unit separator; cannot appear in cleaned card text.
const FIELD_SEP: char = '\u{1f}';

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Posting {
    pub title: String,
    pub company: String,
    /// Empty when the board does not show a location.
    pub location: String,
    pub url: String,
    /// Display name of the board, e.g. "Naukri".
    pub source: String,
    pub posted_date: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
}

impl Posting {
    /// Minimal constructor; optional details start out empty.
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        location: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            location: location.into(),
            url: url.into(),
            source: source.into(),
            posted_date: DEFAULT_POSTED_DATE.to_string(),
            description: None,
            salary: None,
            job_type: None,
            experience_level: None,
        }
    }

    pub fn with_description(mut self, v: impl Into<String>) -> Self {
        self.description = optional_text(v);
        self
    }

    pub fn with_salary(mut self, v: impl Into<String>) -> Self {
        self.salary = optional_text(v);
        self
    }

    pub fn with_job_type(mut self, v: impl Into<String>) -> Self {
        self.job_type = optional_text(v);
        self
    }

    pub fn with_experience(mut self, v: impl Into<String>) -> Self {
        self.experience_level = optional_text(v);
        self
    }

    pub fn with_posted_date(mut self, v: impl Into<String>) -> Self {
        self.posted_date = v.into();
        self
    }

    /// Title and company must carry real text.
    pub fn is_valid(&self) -> bool {
        is_meaningful(&self.title) && is_meaningful(&self.company)
    }

    /// Identity of the listing across sessions and restarts.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.title, &self.company, &self.location, &self.source)
    }
}

/// Lowercase hex SHA-256 over (title, company, location, source).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(title: &str, company: &str, location: &str, source: &str) -> Self {
        let mut hasher = Sha256::new();
        for (i, field) in [title, company, location, source].iter().enumerate() {
            if i > 0 {
                let mut buf = [0u8; 4];
                hasher.update(FIELD_SEP.encode_utf8(&mut buf).as_bytes());
            }
            hasher.update(field.as_bytes());
        }
        let digest = hasher.finalize();
        let mut out = String::with_capacity(64);
        for b in digest.iter() {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        Fingerprint(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// True when `s` is non-blank and not a placeholder like "N/A".
pub fn is_meaningful(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty() && !PLACEHOLDERS.iter().any(|p| t.eq_ignore_ascii_case(p))
}

/// Map blank/placeholder text to `None`, otherwise the trimmed value.
pub fn optional_text(s: impl Into<String>) -> Option<String> {
    let s = s.into();
    if is_meaningful(&s) {
        Some(s.trim().to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> Posting {
        Posting::new("UI Designer", "Acme", "Pune", "https://x.test/1", "X")
    }

    #[test]
    fn fingerprint_is_deterministic_and_hex() {
        let a = acme().fingerprint();
        let b = acme().fingerprint();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_ignores_url_and_optional_fields() {
        let mut other = acme().with_salary("10 LPA").with_description("Figma");
        other.url = "https://x.test/other".into();
        assert_eq!(acme().fingerprint(), other.fingerprint());
    }

    #[test]
    fn fingerprint_field_boundaries_do_not_collide() {
        let a = Fingerprint::of("ab", "c", "", "X");
        let b = Fingerprint::of("a", "bc", "", "X");
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_is_stable_across_processes() {
        // Pinned value: a change here would re-notify every stored posting.
        let fp = Fingerprint::of("UI Designer", "Acme", "Pune", "X");
        assert_eq!(
            fp.as_str(),
            "55cd854ea7c9ac46435c19e1674fd4adb23f224ea6b87dd817621255ca8d0d0f"
        );
        assert_ne!(fp, Fingerprint::of("UI Designer", "Acme", "Pune", "Y"));
    }

    #[test]
    fn placeholders_are_invalid() {
        assert!(acme().is_valid());
        assert!(!Posting::new("N/A", "Acme", "", "", "X").is_valid());
        assert!(!Posting::new("UI Designer", "  ", "", "", "X").is_valid());
        assert!(!Posting::new("", "Acme", "", "", "X").is_valid());
        assert!(!Posting::new("UI Designer", "n/a", "", "", "X").is_valid());
    }

    #[test]
    fn optional_text_drops_placeholders() {
        assert_eq!(optional_text("N/A"), None);
        assert_eq!(optional_text("  "), None);
        assert_eq!(optional_text(" 3-5 Yrs "), Some("3-5 Yrs".to_string()));
    }
}
