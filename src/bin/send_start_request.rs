use quiz_agent_server::config::Config;
use secrecy::ExposeSecret;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    let start_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("{}/", config.base_url.trim_end_matches('/')));

    let payload = json!({
        "email": config.email,
        "secret": config.secret.expose_secret(),
        "url": start_url,
    });

    log::info!("Sending start request to {} for {}", config.agent_url, start_url);

    let response = reqwest::Client::new()
        .post(&config.agent_url)
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    log::info!("Agent responded with {}: {}", status, body);

    if !status.is_success() {
        return Err(format!("agent rejected the start request ({})", status).into());
    }
    Ok(())
}
