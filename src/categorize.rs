// src/categorize.rs
//! Title-keyword bucketing for the digest.
//!
//! Rules are evaluated in order and the first hit wins, so a posting lands in
//! at most one bucket. Titles matching nothing go to [`OTHER_CATEGORY`].

use serde::{Deserialize, Serialize};

pub const OTHER_CATEGORY: &str = "Other";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new<I, S>(name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keywords: keyword_list(keywords),
        }
    }

    /// Case-insensitive substring match against any keyword.
    pub fn matches(&self, title: &str) -> bool {
        let t = title.to_lowercase();
        self.keywords.iter().any(|k| t.contains(k.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRules {
    rules: Vec<CategoryRule>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self::new(vec![
            CategoryRule::new(
                "UI/UX",
                [
                    "ui",
                    "ux",
                    "designer",
                    "design",
                    "visual",
                    "graphic",
                    "product design",
                ],
            ),
            CategoryRule::new(
                "Data",
                [
                    "data",
                    "analyst",
                    "research",
                    "sql",
                    "power bi",
                    "tableau",
                    "business analyst",
                ],
            ),
            CategoryRule::new(
                "Internships",
                ["intern", "trainee", "fresher", "entry", "junior", "graduate"],
            ),
        ])
    }
}

impl CategoryRules {
    /// Rules with no keywords can never match and are dropped.
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| CategoryRule::new(r.name, r.keywords))
            .filter(|r| !r.keywords.is_empty())
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// First matching rule in precedence order; `None` means "Other".
    pub fn classify(&self, title: &str) -> Option<&CategoryRule> {
        self.rules.iter().find(|r| r.matches(title))
    }

    /// Bucket name for a title, falling back to [`OTHER_CATEGORY`].
    pub fn bucket_of(&self, title: &str) -> &str {
        self.classify(title)
            .map(|r| r.name.as_str())
            .unwrap_or(OTHER_CATEGORY)
    }

    /// Bucket names in display order, `Other` last.
    pub fn bucket_names(&self) -> Vec<&str> {
        self.rules
            .iter()
            .map(|r| r.name.as_str())
            .chain(std::iter::once(OTHER_CATEGORY))
            .collect()
    }
}

/// Title pre-filter applied right after collection.
///
/// A title containing any `exclude` keyword is dropped. When `include` is
/// non-empty a title must also contain one of its keywords. Matching is the
/// same case-insensitive substring test as [`CategoryRule::matches`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

fn keyword_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items
        .into_iter()
        .map(|k| k.into().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

impl TitleFilter {
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            include: keyword_list(include),
            exclude: keyword_list(exclude),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn allows(&self, title: &str) -> bool {
        let t = title.to_lowercase();
        if self.exclude.iter().any(|k| t.contains(k.as_str())) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|k| t.contains(k.as_str()))
    }

    /// Both filters at once: excludes are unioned, includes are unioned.
    pub fn merged(&self, other: &TitleFilter) -> TitleFilter {
        TitleFilter {
            include: self.include.iter().chain(&other.include).cloned().collect(),
            exclude: self.exclude.iter().chain(&other.exclude).cloned().collect(),
        }
    }
}
