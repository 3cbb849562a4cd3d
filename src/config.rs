// src/config.rs
//! Startup configuration: a TOML file plus environment overrides.
//!
//! Lookup order for the file:
//! 1) `$JOBWATCH_CONFIG`
//! 2) `config/jobwatch.toml`
//!
//! Secrets never need to live in the file; `SMTP_*`, `NOTIFY_EMAIL_*`,
//! `CHECK_INTERVAL_SECS` and `SEEN_STORE_PATH` override it.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::categorize::{CategoryRule, CategoryRules, TitleFilter, OTHER_CATEGORY};
use crate::collect::{sites, HttpSettings, SearchQuery, DEFAULT_USER_AGENT};
use crate::notify::{SmtpSettings, TlsMode};
use crate::store::DEFAULT_STORE_PATH;

pub const ENV_CONFIG_PATH: &str = "JOBWATCH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/jobwatch.toml";

fn default_interval_secs() -> u64 {
    30 * 60
}
fn default_pause_min_ms() -> u64 {
    3_000
}
fn default_pause_max_ms() -> u64 {
    7_000
}
fn default_limit() -> usize {
    15
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}
fn default_sources() -> Vec<String> {
    sites::searchable_site_keys()
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Politeness pause between board fetches, drawn from `[min, max]`.
    #[serde(default = "default_pause_min_ms")]
    pub pause_min_ms: u64,
    #[serde(default = "default_pause_max_ms")]
    pub pause_max_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            pause_min_ms: default_pause_min_ms(),
            pause_max_ms: default_pause_max_ms(),
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Cards taken per board per search.
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Title keywords applied to every search.
    #[serde(default)]
    pub include_title_keywords: Vec<String>,
    /// e.g. `["senior"]`.
    #[serde(default)]
    pub exclude_title_keywords: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            include_title_keywords: Vec::new(),
            exclude_title_keywords: Vec::new(),
        }
    }
}

impl CollectorConfig {
    pub fn title_filter(&self) -> TitleFilter {
        TitleFilter::new(
            self.include_title_keywords.iter().cloned(),
            self.exclude_title_keywords.iter().cloned(),
        )
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self.user_agent.clone(),
            request_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default)]
    pub smtp_port: Option<u16>,
    #[serde(default)]
    pub tls: TlsMode,
    #[serde(default)]
    pub username: Option<String>,
    /// Prefer `SMTP_PASS` in the environment.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl EmailConfig {
    /// SMTP settings when host, credentials and sender are all present.
    /// `None` means email is disabled and digests are only logged.
    pub fn smtp_settings(&self) -> Option<SmtpSettings> {
        let host = self.smtp_host.clone().filter(|s| !s.trim().is_empty())?;
        let from = self.from.clone().filter(|s| !s.trim().is_empty())?;
        let username = self.username.clone().unwrap_or_else(|| from.clone());
        let password = self.password.clone().filter(|s| !s.is_empty())?;
        Some(SmtpSettings {
            host,
            port: self.smtp_port.unwrap_or_else(|| self.tls.default_port()),
            tls: self.tls,
            username,
            password,
            from,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }

    /// Digest recipient; defaults to the sender address.
    pub fn recipient(&self) -> Option<String> {
        self.to
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.from.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub query: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    #[serde(default)]
    pub include_title_keywords: Vec<String>,
    #[serde(default)]
    pub exclude_title_keywords: Vec<String>,
}

impl SearchConfig {
    pub fn query(&self) -> SearchQuery {
        SearchQuery::new(self.query.trim(), self.location.trim())
    }

    pub fn title_filter(&self) -> TitleFilter {
        TitleFilter::new(
            self.include_title_keywords.iter().cloned(),
            self.exclude_title_keywords.iter().cloned(),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DigestConfig {
    /// Recruiter note under each card; `{title}` and `{company}` are filled in.
    #[serde(default)]
    pub outreach_template: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub digest: DigestConfig,
    #[serde(default)]
    pub searches: Vec<SearchConfig>,
    /// Overrides the built-in UI/UX, Data, Internships rules when non-empty.
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s).context("parsing jobwatch config")?;
        Ok(cfg)
    }

    /// Parse, apply environment overrides and validate.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&content)?;
        cfg.apply_env(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Environment wins over the file. `lookup` is injectable for tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SMTP_HOST") {
            self.email.smtp_host = Some(v);
        }
        if let Some(v) = get("SMTP_PORT") {
            let port = v
                .trim()
                .parse::<u16>()
                .with_context(|| format!("SMTP_PORT is not a port: {v}"))?;
            self.email.smtp_port = Some(port);
        }
        if let Some(v) = get("SMTP_USER") {
            self.email.username = Some(v);
        }
        if let Some(v) = get("SMTP_PASS") {
            self.email.password = Some(v);
        }
        if let Some(v) = get("NOTIFY_EMAIL_FROM") {
            self.email.from = Some(v);
        }
        if let Some(v) = get("NOTIFY_EMAIL_TO") {
            self.email.to = Some(v);
        }
        if let Some(v) = get("CHECK_INTERVAL_SECS") {
            self.schedule.interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("CHECK_INTERVAL_SECS is not a number: {v}"))?;
        }
        if let Some(v) = get("SEEN_STORE_PATH") {
            self.store.path = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn validate(&mut self) -> Result<()> {
        if self.searches.is_empty() {
            bail!("config has no [[searches]]");
        }
        if self.schedule.interval_secs == 0 {
            bail!("schedule.interval_secs must be > 0");
        }
        if self.collector.limit == 0 {
            bail!("collector.limit must be > 0");
        }
        if self.schedule.pause_min_ms > self.schedule.pause_max_ms {
            std::mem::swap(
                &mut self.schedule.pause_min_ms,
                &mut self.schedule.pause_max_ms,
            );
        }
        for s in &mut self.searches {
            if s.query.trim().is_empty() {
                bail!("search with empty query");
            }
            s.sources = clean_sources(std::mem::take(&mut s.sources));
            for src in &s.sources {
                if sites::site(src).is_none() {
                    tracing::warn!(source = %src, query = %s.query, "unknown source in search; it will be skipped");
                }
            }
        }
        self.validate_categories()
    }

    /// Bucket names must be unique and must not shadow the fallback bucket.
    fn validate_categories(&self) -> Result<()> {
        let mut names: Vec<String> = Vec::with_capacity(self.categories.len());
        for c in &self.categories {
            let name = c.name.trim();
            if name.is_empty() {
                bail!("category with empty name");
            }
            if name.eq_ignore_ascii_case(OTHER_CATEGORY) {
                bail!("category name `{name}` is reserved for unmatched titles");
            }
            let key = name.to_lowercase();
            if names.contains(&key) {
                bail!("duplicate category name `{name}`");
            }
            names.push(key);
        }
        Ok(())
    }

    pub fn category_rules(&self) -> CategoryRules {
        if self.categories.is_empty() {
            return CategoryRules::default();
        }
        CategoryRules::new(
            self.categories
                .iter()
                .map(|c| CategoryRule::new(c.name.trim(), c.keywords.iter().cloned()))
                .collect(),
        )
    }
}

/// Lowercase, trim, drop blanks and repeats; keeps first-seen order.
fn clean_sources(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_ascii_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
[[searches]]
query = "ui ux designer"
location = "Hyderabad"
"#;

    #[test]
    fn defaults_fill_missing_sections() {
        let mut cfg = AppConfig::from_toml_str(MINIMAL).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.schedule.interval_secs, 1800);
        assert_eq!(cfg.collector.limit, 15);
        assert_eq!(cfg.store.path, PathBuf::from(DEFAULT_STORE_PATH));
        assert_eq!(
            cfg.searches[0].sources,
            vec!["naukri", "internshala", "indeed_india", "foundit", "shine"]
        );
        assert!(cfg.email.smtp_settings().is_none());
    }

    #[test]
    fn sources_are_cleaned() {
        let mut cfg = AppConfig::from_toml_str(
            r#"
[[searches]]
query = "data analyst"
sources = [" Naukri ", "", "naukri", "SHINE"]
"#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.searches[0].sources, vec!["naukri", "shine"]);
        assert_eq!(cfg.searches[0].location, "");
    }

    #[test]
    fn inverted_pause_is_swapped() {
        let mut cfg = AppConfig::from_toml_str(
            r#"
[schedule]
pause_min_ms = 9000
pause_max_ms = 1000

[[searches]]
query = "x"
"#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.schedule.pause_min_ms, 1000);
        assert_eq!(cfg.schedule.pause_max_ms, 9000);
    }

    #[test]
    fn empty_searches_are_rejected() {
        let mut cfg = AppConfig::from_toml_str("").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = AppConfig::from_toml_str(
            r#"
[email]
smtp_host = "smtp.file.test"
from = "file@example.test"

[[searches]]
query = "x"
"#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [
            ("SMTP_HOST", "smtp.gmail.com"),
            ("SMTP_PASS", "app-password"),
            ("NOTIFY_EMAIL_TO", "me@example.test"),
            ("CHECK_INTERVAL_SECS", "600"),
            ("SEEN_STORE_PATH", "/tmp/seen.json"),
        ]
        .into_iter()
        .collect();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

        let smtp = cfg.email.smtp_settings().expect("smtp enabled");
        assert_eq!(smtp.host, "smtp.gmail.com");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.username, "file@example.test");
        assert_eq!(cfg.email.recipient().as_deref(), Some("me@example.test"));
        assert_eq!(cfg.schedule.interval_secs, 600);
        assert_eq!(cfg.store.path, PathBuf::from("/tmp/seen.json"));
    }

    #[test]
    fn bad_port_in_env_is_an_error() {
        let mut cfg = AppConfig::from_toml_str(MINIMAL).unwrap();
        let res = cfg.apply_env(|k| (k == "SMTP_PORT").then(|| "smtp".to_string()));
        assert!(res.is_err());
    }

    #[test]
    fn configured_categories_replace_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
[[searches]]
query = "x"

[[categories]]
name = "Backend"
keywords = ["rust", "go"]
"#,
        )
        .unwrap();
        let rules = cfg.category_rules();
        assert_eq!(rules.bucket_of("Senior Rust Engineer"), "Backend");
        assert_eq!(rules.bucket_of("UI Designer"), "Other");
    }

    fn with_categories(extra: &str) -> AppConfig {
        AppConfig::from_toml_str(&format!("{MINIMAL}{extra}")).unwrap()
    }

    #[test]
    fn category_named_other_is_rejected() {
        let mut cfg = with_categories(
            r#"
[[categories]]
name = "other"
keywords = ["misc"]
"#,
        );
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn duplicate_category_names_are_rejected() {
        let mut cfg = with_categories(
            r#"
[[categories]]
name = "Data"
keywords = ["sql"]

[[categories]]
name = " data "
keywords = ["tableau"]
"#,
        );
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate category"));
    }

    #[test]
    fn title_keywords_build_filters() {
        let mut cfg = AppConfig::from_toml_str(
            r#"
[collector]
exclude_title_keywords = ["Senior"]

[[searches]]
query = "startup roles"
sources = ["ycombinator", "wellfound"]
include_title_keywords = ["ui", "ux", "data"]
"#,
        )
        .unwrap();
        cfg.validate().unwrap();
        let f = cfg
            .collector
            .title_filter()
            .merged(&cfg.searches[0].title_filter());
        assert!(f.allows("Data Engineer"));
        assert!(!f.allows("Senior UX Designer"));
        assert!(!f.allows("Account Executive"));
        assert!(cfg.digest.outreach_template.is_none());
    }
}
