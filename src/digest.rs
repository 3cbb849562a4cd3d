// src/digest.rs
//! # Digest
//! Pure projection from new postings to an email: subject line with
//! per-category counts, a short plain-text summary, and an HTML body with one
//! section per non-empty category. Every posting appears exactly once.

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write as _;

use crate::categorize::CategoryRules;
use crate::posting::Posting;

/// Descriptions longer than this are cut in the card.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    pub subject: String,
    pub summary: String,
    pub html: String,
    /// `(bucket, count)` in display order, `Other` last.
    pub counts: Vec<(String, usize)>,
    pub total: usize,
}

impl Digest {
    pub fn count_of(&self, bucket: &str) -> usize {
        self.counts
            .iter()
            .find(|(name, _)| name == bucket)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

pub struct DigestBuilder<'a> {
    rules: &'a CategoryRules,
    outreach: Option<&'a str>,
}

impl<'a> DigestBuilder<'a> {
    pub fn new(rules: &'a CategoryRules) -> Self {
        Self {
            rules,
            outreach: None,
        }
    }

    /// Add a short recruiter note under every card. `{title}` and
    /// `{company}` in the template are replaced per posting.
    pub fn with_outreach(mut self, template: Option<&'a str>) -> Self {
        self.outreach = template.filter(|t| !t.trim().is_empty());
        self
    }

    /// Group postings by bucket, preserving input order within each bucket.
    pub fn group<'p>(&self, postings: &'p [Posting]) -> Vec<(String, Vec<&'p Posting>)> {
        let mut groups: Vec<(String, Vec<&Posting>)> = self
            .rules
            .bucket_names()
            .into_iter()
            .map(|n| (n.to_string(), Vec::new()))
            .collect();
        for p in postings {
            let bucket = self.rules.bucket_of(&p.title);
            if let Some((_, v)) = groups.iter_mut().find(|(n, _)| n == bucket) {
                v.push(p);
            }
        }
        groups
    }

    pub fn build(&self, postings: &[Posting], generated_at: DateTime<Utc>) -> Digest {
        let groups = self.group(postings);
        let counts: Vec<(String, usize)> =
            groups.iter().map(|(n, v)| (n.clone(), v.len())).collect();
        let total = postings.len();

        let breakdown = counts
            .iter()
            .map(|(n, c)| format!("{c} {n}"))
            .collect::<Vec<_>>()
            .join(" | ");
        let subject = format!("{total} New Jobs: {breakdown}");
        let summary = format!(
            "Found {total} new job postings ({breakdown}). Generated {}.",
            generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        let html = render_html(&groups, total, generated_at, self.outreach);

        Digest {
            subject,
            summary,
            html,
            counts,
            total,
        }
    }
}

fn css_class(bucket: &str) -> String {
    let slug: String = bucket
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    format!("cat-{slug}")
}

/// Fill `{title}` and `{company}` in an outreach template.
pub fn outreach_note(template: &str, p: &Posting) -> String {
    template
        .replace("{title}", &p.title)
        .replace("{company}", &p.company)
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max).collect();
        out.push_str("...");
        out
    }
}

const STYLE: &str = r#"
body { font-family: Arial, sans-serif; margin: 20px; }
.header { background-color: #3498db; color: white; padding: 20px; text-align: center; border-radius: 8px; margin-bottom: 20px; }
.stats { display: flex; justify-content: space-around; margin: 20px 0; }
.stat-item { text-align: center; padding: 10px; background-color: #ecf0f1; border-radius: 8px; }
.category-header { background-color: #34495e; color: white; padding: 15px; text-align: center; border-radius: 8px; margin: 20px 0 10px 0; }
.job-card { border: 1px solid #ddd; border-radius: 8px; padding: 15px; margin: 10px 0; background-color: #f9f9f9; }
.job-title { color: #2c3e50; font-size: 18px; font-weight: bold; margin-bottom: 5px; }
.job-company { color: #34495e; font-size: 16px; margin-bottom: 5px; }
.job-location { color: #7f8c8d; font-size: 14px; margin-bottom: 5px; }
.job-platform { color: #3498db; font-size: 14px; font-weight: bold; margin-bottom: 10px; }
.job-description { color: #2c3e50; font-size: 14px; margin-bottom: 10px; }
.job-url { color: #e74c3c; text-decoration: none; font-weight: bold; }
.experience { color: #e67e22; font-weight: bold; }
.salary { color: #27ae60; font-weight: bold; }
.posted { color: #95a5a6; font-size: 12px; margin-top: 5px; }
.outreach { border-left: 3px solid #3498db; margin: 10px 0 0 0; padding-left: 10px; color: #555; font-style: italic; }
.footer { margin-top: 30px; text-align: center; color: #7f8c8d; font-size: 12px; }
"#;

fn render_html(
    groups: &[(String, Vec<&Posting>)],
    total: usize,
    generated_at: DateTime<Utc>,
    outreach: Option<&str>,
) -> String {
    let mut html = String::with_capacity(4096 + total * 512);
    let _ = write!(
        html,
        "<html><head><meta charset=\"utf-8\"><style>{STYLE}</style></head><body>\
         <div class=\"header\"><h1>New job postings</h1>\
         <p>Found {total} new job postings matching your searches</p>\
         <p>Generated on: {}</p></div>",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    html.push_str("<div class=\"stats\">");
    for (name, items) in groups {
        let _ = write!(
            html,
            "<div class=\"stat-item\"><h3>{}</h3><p>{}</p></div>",
            items.len(),
            encode_text(name)
        );
    }
    html.push_str("</div>");

    for (name, items) in groups.iter().filter(|(_, v)| !v.is_empty()) {
        let _ = write!(
            html,
            "<div class=\"category-header\">{}</div>",
            encode_text(&name.to_uppercase())
        );
        for p in items {
            render_card(&mut html, p, &css_class(name), outreach);
        }
    }

    html.push_str(
        "<div class=\"footer\"><p>This is an automated job alert for your configured searches.</p></div>\
         </body></html>",
    );
    html
}

fn render_card(html: &mut String, p: &Posting, class: &str, outreach: Option<&str>) {
    let _ = write!(
        html,
        "<div class=\"job-card {class}\">\
         <div class=\"job-title\">{}</div>\
         <div class=\"job-company\">{}</div>",
        encode_text(&p.title),
        encode_text(&p.company)
    );
    if !p.location.is_empty() {
        let _ = write!(
            html,
            "<div class=\"job-location\">{}</div>",
            encode_text(&p.location)
        );
    }
    let _ = write!(
        html,
        "<div class=\"job-platform\">Platform: {}</div>",
        encode_text(&p.source)
    );
    if let Some(exp) = &p.experience_level {
        let _ = write!(
            html,
            "<div class=\"experience\">Experience: {}</div>",
            encode_text(exp)
        );
    }
    if let Some(kind) = &p.job_type {
        let _ = write!(html, "<div class=\"experience\">Type: {}</div>", encode_text(kind));
    }
    if let Some(salary) = &p.salary {
        let _ = write!(html, "<div class=\"salary\">{}</div>", encode_text(salary));
    }
    if let Some(desc) = &p.description {
        let _ = write!(
            html,
            "<div class=\"job-description\">{}</div>",
            encode_text(&truncate_chars(desc, DESCRIPTION_PREVIEW_CHARS))
        );
    }
    if !p.url.is_empty() {
        let _ = write!(
            html,
            "<div style=\"margin-top: 10px;\"><a href=\"{}\" class=\"job-url\" target=\"_blank\">View Job Posting</a></div>",
            encode_double_quoted_attribute(&p.url)
        );
    }
    let _ = write!(
        html,
        "<div class=\"posted\">Posted: {}</div>",
        encode_text(&p.posted_date)
    );
    if let Some(t) = outreach {
        let _ = write!(
            html,
            "<blockquote class=\"outreach\">{}</blockquote>",
            encode_text(&outreach_note(t, p))
        );
    }
    html.push_str("</div>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn truncation_appends_ellipsis_only_when_needed() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
    }

    #[test]
    fn css_class_is_slugged() {
        assert_eq!(css_class("UI/UX"), "cat-uiux");
        assert_eq!(css_class("Other"), "cat-other");
    }

    #[test]
    fn empty_input_still_renders_counts() {
        let rules = CategoryRules::default();
        let d = DigestBuilder::new(&rules).build(&[], ts());
        assert_eq!(d.total, 0);
        assert_eq!(d.subject, "0 New Jobs: 0 UI/UX | 0 Data | 0 Internships | 0 Other");
        assert!(!d.html.contains("category-header\">"));
    }

    #[test]
    fn outreach_note_fills_placeholders() {
        let p = Posting::new("UI Designer", "Acme", "Pune", "", "X");
        assert_eq!(
            outreach_note("Keen on {title} at {company}!", &p),
            "Keen on UI Designer at Acme!"
        );
    }
}
