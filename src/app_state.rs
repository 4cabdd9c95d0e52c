use std::{sync::Arc, time::Duration};

use reqwest::{redirect::Policy, Client};

use crate::{
    config::Config,
    errors::{AgentError, AppResult},
    services::{
        answer_resolver::ResolverRegistry,
        chain_controller::ChainController,
        model_service::OpenAiModel,
        page_fetcher::{HttpPageFetcher, PageFetcher},
        submission_client::{HttpSubmissionClient, SubmissionClient},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ChainController>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.http_timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(10))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {}", e)))?;

        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new(client.clone()));
        let submitter: Arc<dyn SubmissionClient> = Arc::new(HttpSubmissionClient::new(client));

        let resolver = match &config.openai_api_key {
            Some(api_key) => {
                log::info!("Model resolvers enabled ({})", config.openai_model);
                let model = OpenAiModel::new(
                    api_key,
                    config.openai_api_base.as_deref(),
                    config.openai_model.clone(),
                    timeout,
                );
                ResolverRegistry::model_augmented(fetcher.clone(), Arc::new(model))
            }
            None => ResolverRegistry::heuristic(fetcher.clone()),
        };

        let agent = ChainController::new(
            fetcher,
            Arc::new(resolver),
            submitter,
            config.diagnostic_url(),
        );

        Ok(Self {
            agent: Arc::new(agent),
            config: Arc::new(config),
        })
    }
}
