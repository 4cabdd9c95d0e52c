use std::sync::Arc;

use actix_web::{post, web, HttpResponse};
use secrecy::ExposeSecret;

use crate::{
    app_state::AppState,
    errors::AppError,
    models::{
        domain::Credentials,
        dto::{request::StartQuizRequest, response::StartQuizResponse},
    },
};

/// Accepts a start request and hands the chain to a background task.
#[post("/quiz")]
async fn start_quiz(
    state: web::Data<Arc<AppState>>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let request = StartQuizRequest::from_body(&body)?.into_valid()?;

    if request.secret != state.config.secret.expose_secret() {
        log::warn!("Rejected start request for {}: invalid secret", request.email);
        return Err(AppError::InvalidSecret("Invalid secret key".to_string()));
    }

    log::info!("Received valid task for {}: {}", request.email, request.url);

    let credentials = Credentials::new(request.email, request.secret);
    let run_id = state.agent.spawn_run(request.url, credentials);

    Ok(HttpResponse::Ok().json(StartQuizResponse {
        message: "Agent started in background".to_string(),
        run_id,
    }))
}
