use std::env;
use secrecy::SecretString;

const DEFAULT_SECRET: &str = "my-secret-value";
const LOCAL_BASE_URL: &str = "http://localhost:8001";
const DOCKER_BASE_URL: &str = "http://host.docker.internal:8001";

#[derive(Clone, Debug)]
pub struct Config {
    pub secret: SecretString,
    pub email: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub base_url: String,
    pub http_timeout_secs: u64,
    pub openai_api_key: Option<SecretString>,
    pub openai_api_base: Option<String>,
    pub openai_model: String,
    pub mock_server_port: u16,
    pub agent_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        let docker_testing = env::var("DOCKER_TESTING")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        let web_server_port = env::var("PORT")
            .or_else(|_| env::var("EXTERNAL_PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        Self {
            secret: SecretString::from(
                env::var("MY_SECRET").unwrap_or_else(|_| DEFAULT_SECRET.to_string()),
            ),
            email: env::var("MY_EMAIL").unwrap_or_else(|_| "test@example.com".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_server_port,
            base_url: env::var("BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default_base_url(docker_testing).to_string()),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(20),
            openai_api_key: env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
            openai_api_base: env::var("OPENAI_API_BASE").ok(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            mock_server_port: env::var("MOCK_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8001),
            agent_url: env::var("AGENT_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}/quiz", web_server_port)),
        }
    }

    /// Endpoint that receives best-effort failure reports from the agent.
    pub fn diagnostic_url(&self) -> String {
        format!("{}/mock-submit/fail-safe", self.base_url.trim_end_matches('/'))
    }

    /// Logs a warning for every setting still on its development default.
    pub fn warn_on_insecure_defaults(&self) {
        use secrecy::ExposeSecret;

        if self.secret.expose_secret() == DEFAULT_SECRET {
            log::warn!(
                "MY_SECRET is using the default value; set MY_SECRET before exposing this server"
            );
        }

        if self.openai_api_key.is_none() {
            log::info!("OPENAI_API_KEY not set, using heuristic resolvers only");
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            secret: SecretString::from("test-secret".to_string()),
            email: "agent@example.com".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            base_url: "http://127.0.0.1:8001".to_string(),
            http_timeout_secs: 5,
            openai_api_key: None,
            openai_api_base: None,
            openai_model: "gpt-4o-mini".to_string(),
            mock_server_port: 8001,
            agent_url: "http://127.0.0.1:8080/quiz".to_string(),
        }
    }
}

pub fn default_base_url(docker_testing: bool) -> &'static str {
    if docker_testing {
        DOCKER_BASE_URL
    } else {
        LOCAL_BASE_URL
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}
