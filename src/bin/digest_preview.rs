//! Renders a digest of sample postings to stdout (HTML), subject on stderr.
//! Handy for eyeballing the email template without sending anything.

use chrono::Utc;
use jobwatch::{CategoryRules, DigestBuilder, Posting};

fn main() {
    let postings = vec![
        Posting::new(
            "UX Data Analyst Intern",
            "Acme Labs",
            "Pune",
            "https://www.naukri.com/job-listings-ux-data-analyst-intern",
            "Naukri",
        )
        .with_experience("0-1 Yrs")
        .with_salary("Not disclosed"),
        Posting::new(
            "Power BI Analyst",
            "Globex",
            "Hyderabad",
            "https://in.indeed.com/viewjob?jk=demo",
            "Indeed India",
        )
        .with_description("Build dashboards on top of the sales warehouse & keep stakeholders <informed>."),
        Posting::new(
            "Graduate Trainee",
            "Initech",
            "",
            "https://www.shine.com/jobs/graduate-trainee/demo",
            "Shine",
        ),
        Posting::new(
            "Sales Executive",
            "Umbrella",
            "Delhi",
            "https://www.foundit.in/job/demo",
            "Foundit",
        ),
    ];

    let rules = CategoryRules::default();
    let digest = DigestBuilder::new(&rules).build(&postings, Utc::now());

    eprintln!("subject: {}", digest.subject);
    eprintln!("summary: {}", digest.summary);
    println!("{}", digest.html);
}
