// tests/collector_fixtures.rs
//
// Parses saved results pages; no network.
use jobwatch::collect::sites::{site, HtmlCardCollector};
use jobwatch::Posting;

fn parse(key: &str, fixture: &str, limit: usize) -> Vec<Posting> {
    let path = format!("{}/tests/fixtures/{fixture}", env!("CARGO_MANIFEST_DIR"));
    let html = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{path}: {e}"));
    let profile = site(key).expect("known board");
    HtmlCardCollector::new(profile, reqwest::Client::new())
        .expect("selectors compile")
        .parse_page(&html, limit)
}

#[tokio::test]
async fn naukri_cards_parse_with_optional_fields() {
    let cards = parse("naukri", "naukri.html", 15);
    assert_eq!(cards.len(), 3);

    let first = &cards[0];
    assert_eq!(first.title, "UI/UX Designer");
    assert_eq!(first.company, "Pixelworks & Co");
    assert_eq!(first.location, "Hyderabad/Secunderabad");
    assert_eq!(first.source, "Naukri");
    assert_eq!(first.experience_level.as_deref(), Some("2-5 Yrs"));
    assert_eq!(first.salary.as_deref(), Some("Not disclosed"));
    assert_eq!(
        first.description.as_deref(),
        Some("Own the design system for our analytics dashboards.")
    );
    assert!(first.url.starts_with("https://www.naukri.com/job-listings-ui-ux-designer"));
    assert!(first.is_valid());
}

#[tokio::test]
async fn naukri_relative_links_and_placeholders() {
    let cards = parse("naukri", "naukri.html", 15);

    let second = &cards[1];
    assert_eq!(
        second.url,
        "https://www.naukri.com/job-listings-product-designer-120325005678"
    );
    assert_eq!(second.salary, None);
    assert_eq!(second.description, None);

    // Sponsored card without a company is parsed but not valid.
    assert_eq!(cards[2].title, "Visual Designer");
    assert!(cards[2].company.is_empty());
    assert!(!cards[2].is_valid());
}

#[tokio::test]
async fn limit_truncates_card_list() {
    assert_eq!(parse("naukri", "naukri.html", 1).len(), 1);
}

#[tokio::test]
async fn indeed_cards_parse() {
    let cards = parse("indeed_india", "indeed_india.html", 15);
    assert_eq!(cards.len(), 2);

    let a = &cards[0];
    assert_eq!(a.title, "Data Analyst");
    assert_eq!(a.company, "Initech India");
    assert_eq!(a.location, "Pune, Maharashtra");
    assert_eq!(a.source, "Indeed India");
    assert_eq!(a.url, "https://in.indeed.com/rc/clk?jk=8f3a2b1c&fccid=abc");
    assert_eq!(
        a.salary.as_deref(),
        Some("\u{20b9}4,00,000 - \u{20b9}6,00,000 a year")
    );
    assert_eq!(
        a.description.as_deref(),
        Some("Build weekly SQL & Power BI reports for the sales team.")
    );

    let b = &cards[1];
    assert_eq!(b.title, "Junior Business Analyst");
    assert_eq!(b.location, "Remote");
    assert_eq!(b.salary, None);
}

#[tokio::test]
async fn internshala_card_parses() {
    let cards = parse("internshala", "internshala.html", 15);
    assert_eq!(cards.len(), 1);
    let c = &cards[0];
    assert_eq!(c.title, "Graphic Design Trainee");
    assert_eq!(c.company, "BrightLabs");
    assert_eq!(c.location, "Pune");
    assert_eq!(
        c.url,
        "https://internshala.com/job/detail/graphic-design-trainee-job-in-pune-at-brightlabs1700000000"
    );
    assert!(c.salary.as_deref().unwrap().contains("2,40,000"));
    assert_eq!(c.posted_date, "Recent");
}

#[tokio::test]
async fn page_without_cards_yields_nothing() {
    let profile = site("shine").unwrap();
    let c = HtmlCardCollector::new(profile, reqwest::Client::new()).unwrap();
    assert!(c
        .parse_page("<html><body><p>No jobs found</p></body></html>", 15)
        .is_empty());
}

#[tokio::test]
async fn ycombinator_cards_are_their_own_links() {
    let cards = parse("ycombinator", "ycombinator.html", 15);
    assert_eq!(cards.len(), 3);

    let a = &cards[0];
    assert_eq!(a.title, "Product Designer");
    assert_eq!(a.company, "Lumen AI");
    assert_eq!(a.source, "Y Combinator");
    assert_eq!(
        a.url,
        "https://www.ycombinator.com/companies/lumen-ai/jobs/4kTq2-product-designer"
    );
    assert!(a.location.is_empty());
    assert!(a.is_valid());

    assert_eq!(
        cards[1].url,
        "https://www.ycombinator.com/companies/ledgerly/jobs/9Xb1c-senior-data-engineer"
    );
    // Stealth listing without a company name.
    assert!(!cards[2].is_valid());
}

#[tokio::test]
async fn wellfound_skips_hidden_titles() {
    let cards = parse("wellfound", "wellfound.html", 15);
    assert_eq!(cards.len(), 2);

    let a = &cards[0];
    assert_eq!(a.title, "UX Researcher");
    assert_eq!(a.company, "Northwind Robotics");
    assert_eq!(a.source, "Wellfound");
    assert_eq!(a.url, "https://wellfound.com/jobs/2871650-ux-researcher");

    assert_eq!(cards[1].title, "Data Analyst Intern");
    assert_eq!(
        cards[1].url,
        "https://wellfound.com/jobs/2871992-data-analyst-intern"
    );
}
