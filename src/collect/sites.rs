// src/collect/sites.rs
//! Job-board collectors.
//!
//! Every board renders a list of "cards"; a `SiteProfile` names the CSS
//! selectors for the card and its fields, and `HtmlCardCollector` turns one
//! results page into postings. Selectors track the boards' markup and break
//! whenever they redesign, so they live in one table.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{clean_text, Collector, CollectorError, HttpSettings, SearchQuery};
use crate::posting::{optional_text, Posting};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlStyle {
    /// `{base}{query}-jobs[-in-{location}]` as a single path segment.
    Slug,
    /// `{base}?q={query}&l={location}`.
    Query,
    /// One listing page for every search; relevance comes from title filters.
    Fixed,
}

#[derive(Debug)]
pub struct SiteProfile {
    /// Config key, e.g. `indeed_india`.
    pub key: &'static str,
    /// Display name stored on postings.
    pub name: &'static str,
    pub base: &'static str,
    pub style: UrlStyle,
    pub card: &'static str,
    pub title: &'static str,
    /// Element carrying the posting `href`; `None` when the card itself is
    /// the anchor.
    pub link: Option<&'static str>,
    pub company: &'static str,
    pub location: Option<&'static str>,
    pub experience: Option<&'static str>,
    pub salary: Option<&'static str>,
    pub description: Option<&'static str>,
}

pub const SITES: &[SiteProfile] = &[
    SiteProfile {
        key: "naukri",
        name: "Naukri",
        base: "https://www.naukri.com/",
        style: UrlStyle::Slug,
        card: "article.jobTuple",
        title: "a.title",
        link: Some("a.title"),
        company: "a.subTitle",
        location: Some("span.ellipsis.fleft.locWdth"),
        experience: Some("span.ellipsis.fleft.expwdth"),
        salary: Some("span.ellipsis.fleft.salaryWdth"),
        description: Some("span.job-description"),
    },
    SiteProfile {
        key: "internshala",
        name: "Internshala",
        base: "https://internshala.com/jobs/",
        style: UrlStyle::Slug,
        card: "div.internship_meta",
        title: "h3.job-internship-name",
        link: Some("a[href]"),
        company: "p.company-name",
        location: Some("p.location-names"),
        experience: None,
        salary: Some("span.stipend"),
        description: None,
    },
    SiteProfile {
        key: "indeed_india",
        name: "Indeed India",
        base: "https://in.indeed.com/jobs",
        style: UrlStyle::Query,
        card: "div.job_seen_beacon",
        title: "h2.jobTitle a",
        link: Some("h2.jobTitle a"),
        company: "span.companyName",
        location: Some("div[data-testid='job-location']"),
        experience: None,
        salary: Some("span.salary-snippet"),
        description: Some("div.job-snippet"),
    },
    SiteProfile {
        key: "foundit",
        name: "Foundit",
        base: "https://www.foundit.in/jobs/",
        style: UrlStyle::Slug,
        card: "div.srpResultCardContainer",
        title: "h3.jobTitle a",
        link: Some("h3.jobTitle a"),
        company: "span.companyName",
        location: Some("span.locationsContainer"),
        experience: Some("span.experience"),
        salary: Some("span.salary"),
        description: None,
    },
    SiteProfile {
        key: "shine",
        name: "Shine",
        base: "https://www.shine.com/jobs/",
        style: UrlStyle::Slug,
        card: "div.jobCard",
        title: "h2.jobTitle a",
        link: Some("h2.jobTitle a"),
        company: "div.companyName",
        location: Some("div.jobLocation"),
        experience: Some("div.experience"),
        salary: None,
        description: None,
    },
    SiteProfile {
        key: "ycombinator",
        name: "Y Combinator",
        base: "https://www.ycombinator.com/jobs",
        style: UrlStyle::Fixed,
        card: "a.styles_jobListItem__zF9U6",
        title: "h3",
        link: None,
        company: "h4",
        location: None,
        experience: None,
        salary: None,
        description: None,
    },
    SiteProfile {
        key: "wellfound",
        name: "Wellfound",
        base: "https://wellfound.com/jobs",
        style: UrlStyle::Fixed,
        card: "div.job-listing-template",
        title: "h4:not(.hidden)",
        link: Some("a[href]"),
        company: "div[itemprop='hiringOrganization']",
        location: None,
        experience: None,
        salary: None,
        description: None,
    },
];

/// Keys of every built-in board, in table order.
pub fn site_keys() -> Vec<&'static str> {
    SITES.iter().map(|s| s.key).collect()
}

/// Boards that take the search terms; the default for a search with no
/// explicit `sources`.
pub fn searchable_site_keys() -> Vec<&'static str> {
    SITES
        .iter()
        .filter(|s| s.style != UrlStyle::Fixed)
        .map(|s| s.key)
        .collect()
}

/// Case-insensitive lookup by config key.
pub fn site(key: &str) -> Option<&'static SiteProfile> {
    SITES.iter().find(|s| s.key.eq_ignore_ascii_case(key.trim()))
}

impl SiteProfile {
    pub fn search_url(&self, search: &SearchQuery) -> Result<Url, CollectorError> {
        let mut url = Url::parse(self.base)?;
        match self.style {
            UrlStyle::Slug => {
                let mut slug = format!("{}-jobs", search.query.trim());
                if !search.location.trim().is_empty() {
                    slug.push_str("-in-");
                    slug.push_str(search.location.trim());
                }
                url.path_segments_mut()
                    .map_err(|_| CollectorError::Other(format!("{} is not a base url", self.base)))?
                    .pop_if_empty()
                    .push(&slug);
            }
            UrlStyle::Query => {
                url.query_pairs_mut()
                    .append_pair("q", search.query.trim())
                    .append_pair("l", search.location.trim());
            }
            UrlStyle::Fixed => {}
        }
        Ok(url)
    }
}

struct CardSelectors {
    card: Selector,
    title: Selector,
    link: Option<Selector>,
    company: Selector,
    location: Option<Selector>,
    experience: Option<Selector>,
    salary: Option<Selector>,
    description: Option<Selector>,
}

fn compile(selector: &str) -> Result<Selector, CollectorError> {
    Selector::parse(selector).map_err(|e| CollectorError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn compile_opt(selector: Option<&str>) -> Result<Option<Selector>, CollectorError> {
    selector.map(compile).transpose()
}

impl CardSelectors {
    fn for_profile(p: &SiteProfile) -> Result<Self, CollectorError> {
        Ok(Self {
            card: compile(p.card)?,
            title: compile(p.title)?,
            link: compile_opt(p.link)?,
            company: compile(p.company)?,
            location: compile_opt(p.location)?,
            experience: compile_opt(p.experience)?,
            salary: compile_opt(p.salary)?,
            description: compile_opt(p.description)?,
        })
    }
}

fn first_text(card: &ElementRef<'_>, sel: &Selector) -> Option<String> {
    card.select(sel)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn opt_text(card: &ElementRef<'_>, sel: Option<&Selector>) -> Option<String> {
    sel.and_then(|s| first_text(card, s))
        .and_then(optional_text)
}

/// Collector for one board described by a [`SiteProfile`].
pub struct HtmlCardCollector {
    profile: &'static SiteProfile,
    selectors: CardSelectors,
    client: reqwest::Client,
}

impl HtmlCardCollector {
    pub fn new(
        profile: &'static SiteProfile,
        client: reqwest::Client,
    ) -> Result<Self, CollectorError> {
        Ok(Self {
            profile,
            selectors: CardSelectors::for_profile(profile)?,
            client,
        })
    }

    pub fn profile(&self) -> &'static SiteProfile {
        self.profile
    }

    /// Parse one results page into at most `limit` postings.
    pub fn parse_page(&self, html: &str, limit: usize) -> Vec<Posting> {
        let doc = Html::parse_document(html);
        let base = Url::parse(self.profile.base).ok();
        let s = &self.selectors;

        doc.select(&s.card)
            .take(limit)
            .map(|card| {
                let title = first_text(&card, &s.title).unwrap_or_default();
                let company = first_text(&card, &s.company).unwrap_or_default();
                let location = s
                    .location
                    .as_ref()
                    .and_then(|sel| first_text(&card, sel))
                    .and_then(optional_text)
                    .unwrap_or_default();
                let anchor = match &s.link {
                    Some(sel) => card.select(sel).next(),
                    None => Some(card),
                };
                let url = anchor
                    .and_then(|el| el.value().attr("href"))
                    .map(|href| resolve_href(base.as_ref(), href))
                    .unwrap_or_default();

                let mut posting = Posting::new(title, company, location, url, self.profile.name);
                posting.experience_level = opt_text(&card, s.experience.as_ref());
                posting.salary = opt_text(&card, s.salary.as_ref());
                posting.description = opt_text(&card, s.description.as_ref());
                posting
            })
            .collect()
    }
}

fn resolve_href(base: Option<&Url>, href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

#[async_trait]
impl Collector for HtmlCardCollector {
    async fn collect(
        &self,
        search: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<Posting>, CollectorError> {
        let url = self.profile.search_url(search)?;
        let t0 = Instant::now();

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| CollectorError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CollectorError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await.map_err(|source| CollectorError::Http {
            url: url.to_string(),
            source,
        })?;

        let out = self.parse_page(&body, limit);

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("collector_fetch_ms", "source" => self.profile.key).record(ms);
        counter!("collector_postings_total", "source" => self.profile.key)
            .increment(out.len() as u64);
        tracing::debug!(source = self.profile.name, %url, cards = out.len(), "parsed results page");
        Ok(out)
    }

    fn name(&self) -> &str {
        self.profile.name
    }
}

/// One collector per built-in board, sharing a single HTTP client.
pub fn default_collectors(
    settings: &HttpSettings,
) -> Result<Vec<(&'static str, Arc<dyn Collector>)>, CollectorError> {
    let client = settings.build_client()?;
    SITES
        .iter()
        .map(|p| {
            let c: Arc<dyn Collector> = Arc::new(HtmlCardCollector::new(p, client.clone())?);
            Ok((p.key, c))
        })
        .collect()
}
