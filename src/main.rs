use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use quiz_agent_server::{app_state::AppState, config::Config, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    config.warn_on_insecure_defaults();

    let host = config.web_server_host.clone();
    let port = config.web_server_port;

    let state = AppState::new(config).map_err(|e| std::io::Error::other(e.to_string()))?;
    let state = Arc::new(state);

    log::info!("Starting quiz agent on http://{}:{}", host, port);
    log::info!("Diagnostic endpoint: {}", state.config.diagnostic_url());

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .service(handlers::root)
            .service(handlers::health_check)
            .service(handlers::start_quiz)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    log::info!("Quiz agent shut down");
    Ok(())
}
