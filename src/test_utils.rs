#[cfg(test)]
pub mod fixtures {
    use crate::{
        mock_server::render_quiz_page,
        models::domain::{FetchedResource, PageContent},
        services::page_fetcher::build_page,
    };

    pub const CITIES_CSV: &str = "ID,Name,Population
1,New York,8175133
2,Los Angeles,3792621
3,Chicago,2695598
4,Houston,2100263";

    /// Wraps question HTML the way the quiz server does.
    pub fn quiz_page_html(question_html: &str) -> String {
        render_quiz_page(question_html)
    }

    /// Decoded page whose only instruction is where to post the answer.
    pub fn quiz_page(url: &str, question_html: &str) -> PageContent {
        build_page(url, &quiz_page_html(question_html))
    }

    pub fn submit_instruction(target: &str) -> String {
        format!("<p>Post your answer to <strong>{}</strong>.</p>", target)
    }

    pub fn resource(url: &str, status: u16, body: &str) -> FetchedResource {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();

        FetchedResource {
            url: url.to_string(),
            status,
            reason,
            content_type: None,
            bytes: body.as_bytes().to_vec(),
        }
    }
}

#[cfg(test)]
pub mod fakes {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use tokio::sync::RwLock;

    use crate::{
        errors::{AgentError, AgentResult},
        models::{
            domain::{FetchedResource, PageContent},
            dto::{request::SubmissionEnvelope, response::SubmissionResult},
        },
        services::{page_fetcher::PageFetcher, submission_client::SubmissionClient},
    };

    type PageResponder = Box<dyn Fn(&str) -> AgentResult<PageContent> + Send + Sync>;
    type SubmitResponder = Box<dyn Fn(&str, usize) -> AgentResult<SubmissionResult> + Send + Sync>;

    /// Page source driven by a closure; records every URL fetched.
    pub struct ScriptedFetcher {
        responder: PageResponder,
        resources: HashMap<String, FetchedResource>,
        fetched: RwLock<Vec<String>>,
    }

    impl ScriptedFetcher {
        pub fn new(responder: impl Fn(&str) -> AgentResult<PageContent> + Send + Sync + 'static) -> Self {
            Self {
                responder: Box::new(responder),
                resources: HashMap::new(),
                fetched: RwLock::new(Vec::new()),
            }
        }

        pub fn with_resource(mut self, resource: FetchedResource) -> Self {
            self.resources.insert(resource.url.clone(), resource);
            self
        }

        pub async fn fetched(&self) -> Vec<String> {
            self.fetched.read().await.clone()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_page(&self, url: &str) -> AgentResult<PageContent> {
            self.fetched.write().await.push(url.to_string());
            (self.responder)(url)
        }

        async fn fetch_resource(&self, url: &str) -> AgentResult<FetchedResource> {
            self.resources
                .get(url)
                .cloned()
                .ok_or_else(|| AgentError::transport(url, "no such resource"))
        }
    }

    /// Submission endpoint driven by a closure that also sees how many times
    /// the same target was hit before.
    pub struct RecordingSubmitter {
        responder: SubmitResponder,
        submissions: RwLock<Vec<(String, SubmissionEnvelope)>>,
    }

    impl RecordingSubmitter {
        pub fn new(
            responder: impl Fn(&str, usize) -> AgentResult<SubmissionResult> + Send + Sync + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                submissions: RwLock::new(Vec::new()),
            }
        }

        pub async fn submissions(&self) -> Vec<(String, SubmissionEnvelope)> {
            self.submissions.read().await.clone()
        }

        pub async fn count_to(&self, target: &str) -> usize {
            self.submissions
                .read()
                .await
                .iter()
                .filter(|(url, _)| url == target)
                .count()
        }
    }

    #[async_trait]
    impl SubmissionClient for RecordingSubmitter {
        async fn submit(&self, url: &str, envelope: &SubmissionEnvelope) -> AgentResult<SubmissionResult> {
            let previous = {
                let mut submissions = self.submissions.write().await;
                let previous = submissions.iter().filter(|(u, _)| u == url).count();
                submissions.push((url.to_string(), envelope.clone()));
                previous
            };
            (self.responder)(url, previous)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_quiz_page_round_trips_question() {
        let page = quiz_page("http://quiz/q", &submit_instruction("http://quiz/submit"));

        assert!(page.text.contains("Post your answer to"));
        assert_eq!(page.links, vec!["http://quiz/submit".to_string()]);
    }

    #[test]
    fn test_resource_fixture_sets_reason() {
        let res = resource("http://quiz/a.txt", 404, "");
        assert_eq!(res.reason, "Not Found");
        assert!(!res.is_ok());
    }
}
