/// Decoded content of one fetched quiz page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageContent {
    pub url: String,
    pub text: String,
    /// Absolute resource links, deduplicated in first-seen order.
    pub links: Vec<String>,
}

impl PageContent {
    pub fn new(url: impl Into<String>, text: impl Into<String>, links: Vec<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
            links,
        }
    }

    /// First link whose lower-cased form ends with one of `extensions`.
    pub fn first_link_with_extension(&self, extensions: &[&str]) -> Option<String> {
        self.links
            .iter()
            .find(|link| {
                let lower = link.to_lowercase();
                extensions.iter().any(|ext| lower.ends_with(ext))
            })
            .cloned()
    }
}

/// Raw response for a resource a resolver downloads. Error statuses are kept
/// so the resolver can describe them in its answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedResource {
    pub url: String,
    pub status: u16,
    pub reason: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedResource {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}
