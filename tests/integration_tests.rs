use std::{net::TcpListener, sync::Arc, time::Duration};

use actix_web::{dev::ServerHandle, test, web, App, HttpRequest, HttpResponse, HttpServer};
use quiz_agent_server::{
    app_state::AppState,
    config::Config,
    errors::AgentError,
    handlers,
    mock_server::{self, render_quiz_page, MockQuizState, RecordedSubmission},
    models::{
        domain::{AnswerValue, ChainStatus, Credentials, StopReason},
        dto::request::SubmissionEnvelope,
    },
    services::{
        answer_resolver::ResolverRegistry,
        chain_controller::{ChainController, ChainPolicy},
        page_fetcher::HttpPageFetcher,
        submission_client::{HttpSubmissionClient, SubmissionClient},
    },
};
use secrecy::SecretString;
use serde_json::{json, Value};
use tokio::sync::RwLock;

struct MockQuiz {
    state: Arc<MockQuizState>,
    handle: ServerHandle,
}

impl MockQuiz {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.state.base_url(), path)
    }

    async fn steps(&self) -> Vec<String> {
        self.state
            .submissions()
            .await
            .into_iter()
            .map(|s| s.step)
            .collect()
    }

    async fn stop(self) {
        self.handle.stop(true).await;
    }
}

async fn start_mock_quiz(include_image_step: bool) -> MockQuiz {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut state = MockQuizState::new(format!("http://127.0.0.1:{}", port));
    if !include_image_step {
        state = state.without_image_step();
    }
    let state = Arc::new(state);

    let app_state = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .configure(mock_server::configure)
    })
    .workers(1)
    .disable_signals()
    .listen(listener)
    .unwrap()
    .run();

    let handle = server.handle();
    actix_web::rt::spawn(server);

    MockQuiz { state, handle }
}

fn agent_for(mock: &MockQuiz) -> ChainController {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let fetcher = Arc::new(HttpPageFetcher::new(client.clone()));
    let resolver = Arc::new(ResolverRegistry::heuristic(fetcher.clone()));

    ChainController::new(
        fetcher,
        resolver,
        Arc::new(HttpSubmissionClient::new(client)),
        mock.url("/mock-submit/fail-safe"),
    )
    .with_policy(ChainPolicy::without_delays())
}

fn agent_config(mock: &MockQuiz) -> Config {
    Config {
        secret: SecretString::from("integration-secret".to_string()),
        email: "agent@example.com".to_string(),
        web_server_host: "127.0.0.1".to_string(),
        web_server_port: 0,
        base_url: mock.state.base_url().to_string(),
        http_timeout_secs: 5,
        openai_api_key: None,
        openai_api_base: None,
        openai_model: "gpt-4o-mini".to_string(),
        mock_server_port: 0,
        agent_url: String::new(),
    }
}

fn answers(submissions: &[RecordedSubmission]) -> Vec<Value> {
    submissions.iter().map(|s| s.payload["answer"].clone()).collect()
}

#[actix_web::test]
async fn test_full_chain_against_mock_quiz() {
    let mock = start_mock_quiz(false).await;
    let agent = agent_for(&mock);

    let report = agent
        .run(
            mock.url("/"),
            Credentials::new("agent@example.com", "s3cret"),
        )
        .await;

    assert_eq!(report.status, ChainStatus::TerminatedOk);
    assert_eq!(report.stop_reason, StopReason::ChainExhausted);
    assert_eq!(report.pages_visited(), 5);
    assert_eq!(
        mock.steps().await,
        vec!["START", "CSV", "PDF", "RETRY_ATTEMPT", "RETRY_ATTEMPT", "STOP"]
    );

    let submissions = mock.state.submissions().await;
    assert_eq!(
        answers(&submissions),
        vec![
            json!("start"),
            json!(16763615),
            json!("supercalifragilisticexpialidocious"),
            json!("Paris"),
            json!("Paris"),
            json!(4),
        ]
    );
    assert_eq!(submissions[3].payload, submissions[4].payload);
    assert!(submissions
        .iter()
        .all(|s| s.payload["email"] == "agent@example.com" && s.payload["secret"] == "s3cret"));

    mock.stop().await;
}

#[actix_web::test]
async fn test_image_step_uses_placeholder_without_model() {
    let mock = start_mock_quiz(true).await;
    let agent = agent_for(&mock);

    let report = agent
        .run(
            mock.url("/mock-quiz/image"),
            Credentials::new("agent@example.com", "s3cret"),
        )
        .await;

    assert_eq!(report.status, ChainStatus::TerminatedOk);
    let submissions = mock.state.submissions().await;
    assert_eq!(submissions[0].step, "IMAGE");
    assert_eq!(submissions[0].payload["answer"], "A blank white image or canvas.");

    mock.stop().await;
}

#[actix_web::test]
async fn test_missing_page_sends_single_diagnostic() {
    let mock = start_mock_quiz(false).await;
    let agent = agent_for(&mock);
    let missing = mock.url("/mock-quiz/does-not-exist");

    let report = agent
        .run(
            missing.clone(),
            Credentials::new("agent@example.com", "s3cret"),
        )
        .await;

    assert_eq!(report.status, ChainStatus::TerminatedFail);
    assert_eq!(report.pages_visited(), 1);

    let submissions = mock.state.submissions().await;
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].step, "FAIL_SAFE");
    assert_eq!(submissions[0].payload["url"], missing.as_str());
    assert_eq!(
        submissions[0].payload["answer"],
        format!("Error: HTTP 404 for {}", missing)
    );

    mock.stop().await;
}

#[actix_web::test]
async fn test_broken_resource_link_submits_error_marker() {
    let mock = start_mock_quiz(false).await;
    let agent = agent_for(&mock);

    let report = agent
        .run(
            mock.url("/mock-quiz/broken-link"),
            Credentials::new("agent@example.com", "s3cret"),
        )
        .await;

    assert_eq!(report.status, ChainStatus::TerminatedOk);
    let submissions = mock.state.submissions().await;
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].step, "BROKEN_LINK");

    let answer = submissions[0].payload["answer"].as_str().unwrap();
    assert!(answer.starts_with("Error: could not fetch CSV"));
    assert!(answer.ends_with("(status 404)"));

    mock.stop().await;
}

#[actix_web::test]
async fn test_start_endpoint_runs_chain_in_background() {
    let mock = start_mock_quiz(false).await;
    let state = Arc::new(AppState::new(agent_config(&mock)).unwrap());

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .service(handlers::start_quiz),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/quiz")
        .set_json(json!({
            "email": "agent@example.com",
            "secret": "integration-secret",
            "url": mock.url("/mock-quiz/stop-test")
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Agent started in background");

    let mut steps = Vec::new();
    for _ in 0..100 {
        steps = mock.steps().await;
        if !steps.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(steps, vec!["STOP"]);

    mock.stop().await;
}

type PostLog = Arc<RwLock<Vec<(String, Value)>>>;

/// Quiz pages whose submit endpoints answer with plain text (`/quiz/plain`)
/// or a 500 (`/quiz/broken`). `/submit/fail-safe` accepts diagnostics.
struct MisbehavingQuiz {
    base_url: String,
    posts: PostLog,
    handle: ServerHandle,
}

impl MisbehavingQuiz {
    async fn posts_to(&self, kind: &str) -> Vec<Value> {
        let path = format!("/submit/{}", kind);
        self.posts
            .read()
            .await
            .iter()
            .filter(|(p, _)| *p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

async fn misbehaving_page(req: HttpRequest) -> HttpResponse {
    let host = req.connection_info().host().to_string();
    let kind = req.match_info().get("kind").unwrap_or_default().to_string();

    HttpResponse::Ok().content_type("text/html").body(render_quiz_page(&format!(
        "<p>What is 2+2?</p><p>Post your answer to <strong>http://{}/submit/{}</strong>.</p>",
        host, kind
    )))
}

async fn misbehaving_submit(req: HttpRequest, body: web::Bytes, posts: web::Data<PostLog>) -> HttpResponse {
    let payload = serde_json::from_slice(&body).unwrap_or(Value::Null);
    posts.write().await.push((req.path().to_string(), payload));

    match req.match_info().get("kind").unwrap_or_default() {
        "plain" => HttpResponse::Ok().content_type("text/plain").body("Thanks for your answer!"),
        "broken" => HttpResponse::InternalServerError().body("upstream exploded"),
        _ => HttpResponse::Ok().json(json!({ "correct": true, "url": null })),
    }
}

async fn start_misbehaving_quiz() -> MisbehavingQuiz {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
    let posts: PostLog = Arc::new(RwLock::new(Vec::new()));

    let server_posts = posts.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(server_posts.clone()))
            .route("/quiz/{kind}", web::get().to(misbehaving_page))
            .route("/submit/{kind}", web::post().to(misbehaving_submit))
    })
    .workers(1)
    .disable_signals()
    .listen(listener)
    .unwrap()
    .run();

    let handle = server.handle();
    actix_web::rt::spawn(server);

    MisbehavingQuiz {
        base_url,
        posts,
        handle,
    }
}

fn agent_with_diagnostics_at(diagnostic_url: String) -> ChainController {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let fetcher = Arc::new(HttpPageFetcher::new(client.clone()));
    let resolver = Arc::new(ResolverRegistry::heuristic(fetcher.clone()));

    ChainController::new(
        fetcher,
        resolver,
        Arc::new(HttpSubmissionClient::new(client)),
        diagnostic_url,
    )
    .with_policy(ChainPolicy::without_delays())
}

#[actix_web::test]
async fn test_http_submission_error_mapping() {
    let quiz = start_misbehaving_quiz().await;
    let client = HttpSubmissionClient::new(reqwest::Client::new());
    let envelope = SubmissionEnvelope::new(
        &Credentials::new("agent@example.com", "s3cret"),
        "http://quiz/page",
        AnswerValue::Integer(4),
    );

    let plain = client
        .submit(&format!("{}/submit/plain", quiz.base_url), &envelope)
        .await;
    assert!(matches!(plain, Err(AgentError::Protocol { .. })), "{:?}", plain);

    let broken = client
        .submit(&format!("{}/submit/broken", quiz.base_url), &envelope)
        .await;
    assert!(
        matches!(broken, Err(AgentError::HttpStatus { status: 500, .. })),
        "{:?}",
        broken
    );

    quiz.handle.stop(true).await;
}

#[actix_web::test]
async fn test_non_json_submission_reply_stops_without_retry() {
    let quiz = start_misbehaving_quiz().await;
    let agent = agent_with_diagnostics_at(format!("{}/submit/fail-safe", quiz.base_url));
    let page_url = format!("{}/quiz/plain", quiz.base_url);

    let report = agent
        .run(page_url.clone(), Credentials::new("agent@example.com", "s3cret"))
        .await;

    assert_eq!(report.status, ChainStatus::TerminatedFail);
    assert!(matches!(report.stop_reason, StopReason::SubmissionFailed(_)));
    assert_eq!(quiz.posts_to("plain").await.len(), 1);

    let diagnostics = quiz.posts_to("fail-safe").await;
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["url"], page_url.as_str());
    assert!(diagnostics[0]["answer"]
        .as_str()
        .unwrap()
        .starts_with("Error: submission failed: "));

    quiz.handle.stop(true).await;
}

#[actix_web::test]
async fn test_server_error_on_submission_stops_without_retry() {
    let quiz = start_misbehaving_quiz().await;
    let agent = agent_with_diagnostics_at(format!("{}/submit/fail-safe", quiz.base_url));

    let report = agent
        .run(
            format!("{}/quiz/broken", quiz.base_url),
            Credentials::new("agent@example.com", "s3cret"),
        )
        .await;

    assert_eq!(report.status, ChainStatus::TerminatedFail);
    assert_eq!(quiz.posts_to("broken").await.len(), 1);

    let diagnostics = quiz.posts_to("fail-safe").await;
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0]["answer"].as_str().unwrap().contains("HTTP 500"));

    quiz.handle.stop(true).await;
}
