use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    models::domain::{PageContent, Task},
    services::heuristic_resolvers::match_known_question,
};

static SUBMISSION_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Post your answer to\s*<strong>(https?://[^<\s]+)</strong>")
        .expect("SUBMISSION_TARGET is a valid regex")
});

const CSV_EXTENSIONS: &[&str] = &[".csv"];
const TEXT_EXTENSIONS: &[&str] = &[".txt", ".pdf"];
const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];

/// Routes a page to a task category. Checks run in priority order and the
/// first hit wins.
pub fn classify(page: &PageContent) -> Task {
    let text = page.text.to_lowercase();
    let links: Vec<String> = page.links.iter().map(|l| l.to_lowercase()).collect();

    if page.url.to_lowercase().contains("csv")
        || text.contains("csv task")
        || links.iter().any(|l| l.contains(".csv"))
    {
        return Task::NumericSum {
            resource: page.first_link_with_extension(CSV_EXTENSIONS),
            page_text: page.text.clone(),
        };
    }

    if text.contains(".txt")
        || text.contains("pdf task")
        || links.iter().any(|l| ends_with_any(l, TEXT_EXTENSIONS))
    {
        return Task::TextLookup {
            resource: page.first_link_with_extension(TEXT_EXTENSIONS),
        };
    }

    if links.iter().any(|l| ends_with_any(l, IMAGE_EXTENSIONS)) || text.contains("image task") {
        return Task::ImageDescribe {
            resource: page.first_link_with_extension(IMAGE_EXTENSIONS),
            question: page.text.clone(),
        };
    }

    if let Some(question) = match_known_question(&page.text) {
        return Task::Trivia { question };
    }

    Task::Unknown {
        page_text: page.text.clone(),
    }
}

/// URL named in the page's "Post your answer to" instruction.
pub fn find_submission_target(page: &PageContent) -> Option<String> {
    SUBMISSION_TARGET
        .captures(&page.text)
        .map(|captures| captures[1].to_string())
}

fn ends_with_any(link: &str, extensions: &[&str]) -> bool {
    extensions.iter().any(|ext| link.ends_with(ext))
}
