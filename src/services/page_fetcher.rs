use std::collections::HashSet;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header::CONTENT_TYPE, Client, Url};

use crate::{
    errors::{AgentError, AgentResult},
    models::domain::{FetchedResource, PageContent},
};

static EMBEDDED_PAYLOAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"atob\("([A-Za-z0-9+/=]+)"\)"#).expect("EMBEDDED_PAYLOAD is a valid regex")
});

static RESOURCE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^"\s<]+|/files/[^"\s<]+"#).expect("RESOURCE_LINK is a valid regex")
});

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches a quiz page and decodes its embedded payload.
    async fn fetch_page(&self, url: &str) -> AgentResult<PageContent>;

    /// Downloads a resource referenced by a page. Error statuses are returned,
    /// not raised.
    async fn fetch_resource(&self, url: &str) -> AgentResult<FetchedResource>;
}

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> AgentResult<PageContent> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AgentError::transport(url, e))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(AgentError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AgentError::transport(url, e))?;

        Ok(build_page(url, &body))
    }

    async fn fetch_resource(&self, url: &str) -> AgentResult<FetchedResource> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AgentError::transport(url, e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AgentError::transport(url, e))?;

        Ok(FetchedResource {
            url: url.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

/// Decodes the page body and collects its resource links.
pub fn build_page(url: &str, body: &str) -> PageContent {
    let text = decode_embedded_payload(url, body);
    let links = extract_resource_links(&text, url);
    PageContent::new(url, text, links)
}

/// Returns the content hidden in an `atob("...")` wrapper, or the raw body
/// when there is no wrapper or it does not decode.
pub fn decode_embedded_payload(url: &str, body: &str) -> String {
    let Some(captures) = EMBEDDED_PAYLOAD.captures(body) else {
        return body.to_string();
    };

    match STANDARD.decode(&captures[1]) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            log::warn!("base64 decode failed for {}: {}", url, e);
            body.to_string()
        }
    }
}

/// Absolute URLs and `/files/...` paths, resolved against `base_url`, in
/// first-seen order without duplicates.
pub fn extract_resource_links(text: &str, base_url: &str) -> Vec<String> {
    let base = Url::parse(base_url).ok();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for found in RESOURCE_LINK.find_iter(text) {
        let raw = found.as_str();
        let link = if raw.starts_with('/') {
            match base.as_ref().and_then(|b| b.join(raw).ok()) {
                Some(joined) => joined.to_string(),
                None => continue,
            }
        } else {
            raw.to_string()
        };

        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}
