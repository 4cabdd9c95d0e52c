use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use quiz_agent_server::{config::Config, mock_server};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    let mut state = mock_server::MockQuizState::new(config.base_url.clone());
    if let Ok(dir) = std::env::var("MOCK_FIXTURE_DIR") {
        state = state.with_fixture_dir(dir);
    }
    let state = Arc::new(state);

    log::info!(
        "Starting mock quiz server on http://0.0.0.0:{} (links point at {})",
        config.mock_server_port,
        state.base_url()
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .configure(mock_server::configure)
    })
    .bind(("0.0.0.0", config.mock_server_port))?
    .run()
    .await
}
