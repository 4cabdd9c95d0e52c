//! Local stand-in for a remote quiz chain: JS-wrapped quiz pages, downloadable
//! fixtures and submission endpoints that record every payload they receive.

use std::{path::PathBuf, sync::Arc};

use actix_web::{get, http::header::ContentType, post, web, HttpResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::errors::{AppError, AppResult};

const CITIES_CSV: &str = "ID,Name,Population
1,New York,8175133
2,Los Angeles,3792621
3,Chicago,2695598
4,Houston,2100263";

const FALLBACK_NOTES: &str = "The secret word is 'supercalifragilisticexpialidocious'.";

/// 1x1 PNG.
const BLANK_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8/5+hHgAHggJ/PchI7wAAAABJRU5ErkJggg==";

/// Wraps question HTML in a page that only reveals it after running `atob`.
pub fn render_quiz_page(question_html: &str) -> String {
    let encoded = STANDARD.encode(question_html.as_bytes());
    format!(
        r#"<html>
    <head><title>Mock Quiz</title></head>
    <body style="font-family: sans-serif; padding: 20px;">
        <h1>Mock Quiz Page</h1>
        <div id="result-container">
            <p>Loading quiz...</p>
        </div>
        <script>
            document.addEventListener("DOMContentLoaded", () => {{
                setTimeout(() => {{
                    const decodedContent = atob("{encoded}");
                    document.getElementById("result-container").innerHTML = decodedContent;
                }}, 500);
            }});
        </script>
    </body>
</html>"#
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordedSubmission {
    pub step: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

pub struct MockQuizState {
    base_url: String,
    include_image_step: bool,
    fixture_dir: Option<PathBuf>,
    log: RwLock<Vec<RecordedSubmission>>,
}

impl MockQuizState {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            include_image_step: true,
            fixture_dir: None,
            log: RwLock::new(Vec::new()),
        }
    }

    /// Routes the PDF step straight to the retry page.
    pub fn without_image_step(mut self) -> Self {
        self.include_image_step = false;
        self
    }

    /// Directory holding optional `sales.csv` / `dummy_doc.pdf` fixtures.
    pub fn with_fixture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixture_dir = Some(dir.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn submissions(&self) -> Vec<RecordedSubmission> {
        self.log.read().await.clone()
    }

    /// Appends a payload and returns how many logged payloads now carry
    /// `counted_url` as their `url`. Both happen under one write guard.
    async fn record(&self, step: &str, payload: Value, counted_url: Option<&str>) -> usize {
        let mut log = self.log.write().await;
        log::info!("Mock server received submission ({}): {}", step, payload);
        log.push(RecordedSubmission {
            step: step.to_string(),
            payload,
            received_at: Utc::now(),
        });

        counted_url
            .map(|url| {
                log.iter()
                    .filter(|entry| entry.payload.get("url").and_then(Value::as_str) == Some(url))
                    .count()
            })
            .unwrap_or(0)
    }

    async fn clear(&self) {
        self.log.write().await.clear();
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn question_page(&self, question_html: &str) -> HttpResponse {
        HttpResponse::Ok()
            .content_type(ContentType::html())
            .body(render_quiz_page(question_html))
    }

    fn verdict(&self, correct: bool, next_path: Option<&str>, reason: &str) -> HttpResponse {
        HttpResponse::Ok().json(json!({
            "correct": correct,
            "url": next_path.map(|p| self.url(p)),
            "reason": reason,
        }))
    }
}

type MockState = web::Data<Arc<MockQuizState>>;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(cities_csv)
        .service(simple_txt)
        .service(test_png)
        .service(sales_csv)
        .service(dummy_pdf)
        .service(start_page)
        .service(csv_page)
        .service(pdf_page)
        .service(image_page)
        .service(retry_page)
        .service(stop_page)
        .service(end_page)
        .service(broken_link_page)
        .service(llm_fail_page)
        .service(submit_start)
        .service(submit_csv)
        .service(submit_pdf)
        .service(submit_image)
        .service(submit_fail_with_reason)
        .service(submit_stop)
        .service(submit_broken_link)
        .service(submit_llm_fail)
        .service(submit_fail_safe)
        .service(submission_log)
        .service(clear_log);
}

fn parse_payload(body: &[u8]) -> AppResult<Value> {
    serde_json::from_slice(body).map_err(|_| AppError::ValidationError("JSON decode error".to_string()))
}

async fn optional_fixture(state: &MockQuizState, name: &str, mime: &str, missing: &str) -> HttpResponse {
    if let Some(dir) = &state.fixture_dir {
        if let Ok(bytes) = tokio::fs::read(dir.join(name)).await {
            return HttpResponse::Ok().content_type(mime.to_string()).body(bytes);
        }
    }
    HttpResponse::NotFound().json(json!({ "error": missing }))
}

// Files

#[get("/files/local_cities.csv")]
async fn cities_csv() -> HttpResponse {
    HttpResponse::Ok().content_type("text/csv").body(CITIES_CSV)
}

#[get("/files/simple.txt")]
async fn simple_txt(state: MockState) -> HttpResponse {
    if let Some(dir) = &state.fixture_dir {
        if let Ok(notes) = tokio::fs::read_to_string(dir.join("dummy_notes.txt")).await {
            return HttpResponse::Ok().content_type(ContentType::plaintext()).body(notes);
        }
    }
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(FALLBACK_NOTES)
}

#[get("/files/PNG_Test.png")]
async fn test_png() -> AppResult<HttpResponse> {
    let bytes = STANDARD
        .decode(BLANK_PNG_BASE64)
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    Ok(HttpResponse::Ok().content_type(ContentType::png()).body(bytes))
}

#[get("/files/sales.csv")]
async fn sales_csv(state: MockState) -> HttpResponse {
    optional_fixture(&state, "sales.csv", "text/csv", "Dummy CSV not found on server.").await
}

#[get("/files/dummy_doc.pdf")]
async fn dummy_pdf(state: MockState) -> HttpResponse {
    optional_fixture(&state, "dummy_doc.pdf", "application/pdf", "Dummy PDF not found on server.").await
}

// Quiz pages

#[get("/")]
async fn start_page(state: MockState) -> HttpResponse {
    state.question_page(&format!(
        r#"<h2>Q0: The Start of the Test</h2>
<p>This is the first task. The answer is simply the string "start".</p>
<p>Post your answer to <strong>{}</strong>.</p>"#,
        state.url("/mock-submit/start")
    ))
}

#[get("/mock-quiz/csv")]
async fn csv_page(state: MockState) -> HttpResponse {
    state.question_page(&format!(
        r#"<h2>Q1: CSV Task (Local File)</h2>
<p>Download the file at <strong>{}</strong></p>
<p>What is the sum of the "Population" column?</p>
<p>Post your answer to <strong>{}</strong>.</p>"#,
        state.url("/files/local_cities.csv"),
        state.url("/mock-submit/csv")
    ))
}

#[get("/mock-quiz/pdf")]
async fn pdf_page(state: MockState) -> HttpResponse {
    state.question_page(&format!(
        r#"<h2>Q2: TXT Task (Local File)</h2>
<p>Download the file at <strong>{}</strong></p>
<p>What is the secret word in the file?</p>
<p>Post your answer to <strong>{}</strong>.</p>"#,
        state.url("/files/simple.txt"),
        state.url("/mock-submit/pdf")
    ))
}

#[get("/mock-quiz/image")]
async fn image_page(state: MockState) -> HttpResponse {
    state.question_page(&format!(
        r#"<h2>Q3: Image Task (Local File)</h2>
<p>Analyze the image at <strong>{}</strong></p>
<p>What is the main subject of this image?</p>
<p>Post your answer to <strong>{}</strong>.</p>"#,
        state.url("/files/PNG_Test.png"),
        state.url("/mock-submit/image")
    ))
}

#[get("/mock-quiz/retry-test")]
async fn retry_page(state: MockState) -> HttpResponse {
    state.question_page(&format!(
        r#"<h2>Q4: Retry Task</h2>
<p>This is a simple text question.</p>
<p>What is the capital of France?</p>
<p>Post your answer to <strong>{}</strong>.</p>"#,
        state.url("/mock-submit/fail-with-reason")
    ))
}

#[get("/mock-quiz/stop-test")]
async fn stop_page(state: MockState) -> HttpResponse {
    state.question_page(&format!(
        r#"<h2>Q5: Stop Task</h2>
<p>This quiz will stop the chain. What is 2+2?</p>
<p>Post your answer to <strong>{}</strong>.</p>"#,
        state.url("/mock-submit/stop")
    ))
}

#[get("/mock-quiz/end")]
async fn end_page(state: MockState) -> HttpResponse {
    state.question_page("<h2>Quiz Finished!</h2>\n<p>This is a fallback end page.</p>")
}

#[get("/mock-quiz/broken-link")]
async fn broken_link_page(state: MockState) -> HttpResponse {
    state.question_page(&format!(
        r#"<h2>Edge Case: Broken Link</h2>
<p>Download the file at <strong>{}</strong></p>
<p>This should fail gracefully. What is the error?</p>
<p>Post your answer to <strong>{}</strong>.</p>"#,
        state.url("/files/non-existent-file.csv"),
        state.url("/mock-submit/broken-link")
    ))
}

#[get("/mock-quiz/llm-fail")]
async fn llm_fail_page(state: MockState) -> HttpResponse {
    state.question_page(&format!(
        r#"<h2>Edge Case: Missing 'answer' Key</h2>
<p>The question is: Please respond with a valid JSON object, but use a key other than "answer". For example, `{{"response": "some text"}}`.</p>
<p>Post your answer to <strong>{}</strong>.</p>"#,
        state.url("/mock-submit/llm-fail")
    ))
}

// Submissions

#[post("/mock-submit/start")]
async fn submit_start(state: MockState, body: web::Bytes) -> AppResult<HttpResponse> {
    state.record("START", parse_payload(&body)?, None).await;
    Ok(state.verdict(true, Some("/mock-quiz/csv"), "Initial task correct."))
}

#[post("/mock-submit/csv")]
async fn submit_csv(state: MockState, body: web::Bytes) -> AppResult<HttpResponse> {
    state.record("CSV", parse_payload(&body)?, None).await;
    Ok(state.verdict(true, Some("/mock-quiz/pdf"), "CSV task correct."))
}

#[post("/mock-submit/pdf")]
async fn submit_pdf(state: MockState, body: web::Bytes) -> AppResult<HttpResponse> {
    state.record("PDF", parse_payload(&body)?, None).await;
    let next = if state.include_image_step {
        "/mock-quiz/image"
    } else {
        "/mock-quiz/retry-test"
    };
    Ok(state.verdict(true, Some(next), "PDF task correct."))
}

#[post("/mock-submit/image")]
async fn submit_image(state: MockState, body: web::Bytes) -> AppResult<HttpResponse> {
    state.record("IMAGE", parse_payload(&body)?, None).await;
    Ok(state.verdict(true, Some("/mock-quiz/retry-test"), "Image task correct."))
}

#[post("/mock-submit/fail-with-reason")]
async fn submit_fail_with_reason(state: MockState, body: web::Bytes) -> AppResult<HttpResponse> {
    let retry_url = state.url("/mock-quiz/retry-test");
    let attempts = state
        .record("RETRY_ATTEMPT", parse_payload(&body)?, Some(&retry_url))
        .await;

    if attempts > 1 {
        return Ok(state.verdict(true, Some("/mock-quiz/stop-test"), "Retry successful!"));
    }
    Ok(state.verdict(false, None, "The first answer was wrong. Please try again."))
}

#[post("/mock-submit/stop")]
async fn submit_stop(state: MockState, body: web::Bytes) -> AppResult<HttpResponse> {
    state.record("STOP", parse_payload(&body)?, None).await;
    Ok(state.verdict(true, None, "Quiz chain finished."))
}

#[post("/mock-submit/broken-link")]
async fn submit_broken_link(state: MockState, body: web::Bytes) -> AppResult<HttpResponse> {
    state.record("BROKEN_LINK", parse_payload(&body)?, None).await;
    Ok(state.verdict(true, None, "Broken link test finished."))
}

#[post("/mock-submit/llm-fail")]
async fn submit_llm_fail(state: MockState, body: web::Bytes) -> AppResult<HttpResponse> {
    state.record("LLM_FAIL", parse_payload(&body)?, None).await;
    Ok(state.verdict(true, None, "LLM fail test finished."))
}

#[post("/mock-submit/fail-safe")]
async fn submit_fail_safe(state: MockState, body: web::Bytes) -> AppResult<HttpResponse> {
    state.record("FAIL_SAFE", parse_payload(&body)?, None).await;
    Ok(state.verdict(true, None, "Failure recorded."))
}

#[get("/mock-submit/log")]
async fn submission_log(state: MockState) -> HttpResponse {
    HttpResponse::Ok().json(state.submissions().await)
}

#[get("/mock-submit/clear")]
async fn clear_log(state: MockState) -> HttpResponse {
    state.clear().await;
    HttpResponse::Ok().json(json!({ "status": "cleared" }))
}
