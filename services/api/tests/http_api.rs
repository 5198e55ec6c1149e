//! End-to-end tests of the HTTP surface with in-memory model and fetcher fakes.

use api_lib::web::{build_router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use snapstudy_core::{
    domain::{ExtractedText, FetchOutcome},
    ports::{
        ContentFetcher, LanguageModelService, ModelPurpose, ModelRequest, PortError, PortResult,
    },
    ChatRole,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tower::ServiceExt;

const UPLOAD_LIMIT: usize = 1024 * 1024;
const BOUNDARY: &str = "snapstudy-test-boundary";

//=========================================================================================
// Fakes
//=========================================================================================

fn materials_reply(brief: &str) -> String {
    json!({
        "studyMaterials": {
            "shortNotes": { "key_points": ["Plants make sugar from light"] },
            "summary": { "brief": brief, "detailed": "Chlorophyll absorbs light." },
            "flashcards": {
                "basic": [{ "front": "What absorbs light?", "back": "Chlorophyll" }]
            },
            "quizQuestions": {
                "multipleChoice": [{
                    "question": "Where does photosynthesis happen?",
                    "options": { "A": "Mitochondria", "B": "Chloroplast" },
                    "correctAnswer": "B",
                    "answerExplanation": "Chloroplasts hold chlorophyll."
                }]
            }
        }
    })
    .to_string()
}

/// Wraps a reply in a markdown fence the way chat models often do.
fn fenced(reply: &str) -> String {
    format!("```json\n{}\n```", reply)
}

struct FakeModel {
    generation_reply: String,
    tutor_fails: bool,
    calls: AtomicUsize,
    tutor_inputs: std::sync::Mutex<Vec<String>>,
    /// When set, generation calls signal `entered` and wait for `release`.
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FakeModel {
    fn replying(reply: String) -> Self {
        Self {
            generation_reply: reply,
            tutor_fails: false,
            calls: AtomicUsize::new(0),
            tutor_inputs: std::sync::Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModelService for FakeModel {
    async fn complete(&self, request: &ModelRequest) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match request.purpose {
            ModelPurpose::Generation => {
                if let Some((entered, release)) = &self.gate {
                    entered.notify_one();
                    release.notified().await;
                }
                Ok(self.generation_reply.clone())
            }
            ModelPurpose::Tutor => {
                self.tutor_inputs.lock().unwrap().push(request.input.clone());
                if self.tutor_fails {
                    Err(PortError::Unexpected("model is down".into()))
                } else {
                    Ok("Chlorophyll absorbs the light.".to_string())
                }
            }
        }
    }
}

enum FakeFetch {
    Page(&'static str),
    Empty,
    Status(u16, &'static str),
}

struct FakeFetcher(FakeFetch);

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> PortResult<FetchOutcome> {
        match &self.0 {
            FakeFetch::Page(text) => {
                Ok(FetchOutcome::Content(ExtractedText::from_link(*text, url)))
            }
            FakeFetch::Empty => Ok(FetchOutcome::NoContentFound),
            FakeFetch::Status(status, reason) => Err(PortError::UpstreamFetch {
                status: *status,
                reason: reason.to_string(),
            }),
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn app_with(model: Arc<FakeModel>, fetch: FakeFetch) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(model, Arc::new(FakeFetcher(fetch))));
    (build_router(state.clone(), UPLOAD_LIMIT), state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_file(uri: &str, file_name: &str, media_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {media_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

//=========================================================================================
// Stateless endpoints
//=========================================================================================

#[tokio::test]
async fn response_returns_the_raw_model_text() {
    let reply = fenced(&materials_reply("Plants eat light."));
    let model = Arc::new(FakeModel::replying(reply.clone()));
    let (app, _) = app_with(model.clone(), FakeFetch::Empty);

    let (status, body) = send(
        &app,
        post_json("/api/response", json!({"content": "Photosynthesis"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], Value::String(reply));
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn missing_content_is_a_bad_request() {
    let model = Arc::new(FakeModel::replying(materials_reply("x")));
    let (app, _) = app_with(model.clone(), FakeFetch::Empty);

    let (status, body) = send(&app, post_json("/api/response", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Content is required");

    let (status, _) = send(&app, post_json("/api/response", json!({"content": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn uploaded_text_file_reaches_the_model() {
    let model = Arc::new(FakeModel::replying(materials_reply("x")));
    let (app, _) = app_with(model.clone(), FakeFetch::Empty);

    let request = post_file("/api/upload", "notes.txt", "text/plain", b"Mitochondria make ATP.");
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response"].is_string());
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn unsupported_upload_never_reaches_the_model() {
    let model = Arc::new(FakeModel::replying(materials_reply("x")));
    let (app, _) = app_with(model.clone(), FakeFetch::Empty);

    let request = post_file("/api/upload", "clip.mp4", "video/mp4", b"\x00\x00\x00\x18ftyp");
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("video/mp4"));
    assert!(body["details"].as_str().unwrap().contains("application/pdf"));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn empty_text_upload_is_a_bad_request() {
    let model = Arc::new(FakeModel::replying(materials_reply("x")));
    let (app, _) = app_with(model.clone(), FakeFetch::Empty);

    let request = post_file("/api/upload", "blank.txt", "text/plain", b"  \n\t ");
    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn upload_without_a_file_field_is_rejected() {
    let model = Arc::new(FakeModel::replying(materials_reply("x")));
    let (app, _) = app_with(model, FakeFetch::Empty);

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("No file uploaded."));
}

#[tokio::test]
async fn link_upstream_404_is_mirrored_without_invoking_the_model() {
    let model = Arc::new(FakeModel::replying(materials_reply("x")));
    let (app, _) = app_with(model.clone(), FakeFetch::Status(404, "Not Found"));

    let (status, body) = send(
        &app,
        post_json("/api/link", json!({"link": "https://example.org/gone"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Not Found"));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn empty_page_is_an_informational_message() {
    let model = Arc::new(FakeModel::replying(materials_reply("x")));
    let (app, _) = app_with(model.clone(), FakeFetch::Empty);

    let (status, body) = send(
        &app,
        post_json("/api/link", json!({"link": "https://example.org/empty"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("response").is_none());
    assert_eq!(body["message"], "No text content found at the provided link.");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn link_page_text_reaches_the_model() {
    let model = Arc::new(FakeModel::replying(materials_reply("x")));
    let (app, _) = app_with(model.clone(), FakeFetch::Page("Photosynthesis happens in leaves."));

    let (status, body) = send(
        &app,
        post_json("/api/link", json!({"link": "https://example.org/leaf"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response"].is_string());
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn ask_requires_both_fields() {
    let model = Arc::new(FakeModel::replying(materials_reply("x")));
    let (app, _) = app_with(model.clone(), FakeFetch::Empty);

    let (status, body) = send(&app, post_json("/api/ask", json!({"question": "Why?"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Question and AI content are required.");

    let (status, body) = send(
        &app,
        post_json("/api/ask", json!({"question": "Why green?", "aiContent": "Chlorophyll."})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Chlorophyll absorbs the light.");
    let inputs = model.tutor_inputs.lock().unwrap();
    assert!(inputs[0].contains("Chlorophyll."));
    assert!(inputs[0].contains("Why green?"));
}

#[tokio::test]
async fn normalize_accepts_every_envelope() {
    let model = Arc::new(FakeModel::replying(String::new()));
    let (app, _) = app_with(model, FakeFetch::Empty);
    let reply = materials_reply("Plants eat light.");
    let parsed: Value = serde_json::from_str(&reply).unwrap();

    let (s1, bare) = send(
        &app,
        post_json("/api/normalize", json!({"response": fenced(&reply)})),
    )
    .await;
    let (s2, nested) = send(
        &app,
        post_json("/api/normalize", json!({"data": {"response": reply}})),
    )
    .await;
    let (s3, structured) = send(&app, post_json("/api/normalize", json!({"data": parsed}))).await;

    assert_eq!((s1, s2, s3), (StatusCode::OK, StatusCode::OK, StatusCode::OK));
    assert_eq!(bare, nested);
    assert_eq!(nested, structured);
    assert_eq!(bare["studyMaterials"]["quizQuestions"][0]["answerIndex"], 1);

    // The normalized form goes back through unchanged.
    let (status, again) = send(
        &app,
        post_json("/api/normalize", json!({"data": bare.clone()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, bare);
}

#[tokio::test]
async fn normalize_rejects_unparseable_replies() {
    let model = Arc::new(FakeModel::replying(String::new()));
    let (app, _) = app_with(model, FakeFetch::Empty);

    let (status, body) = send(
        &app,
        post_json("/api/normalize", json!({"response": "Sure! Here are your notes"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"].as_str().unwrap().contains("Sure! Here"));

    let (status, _) = send(
        &app,
        post_json("/api/normalize", json!({"response": "{\"notes\": []}"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

//=========================================================================================
// Sessions
//=========================================================================================

#[tokio::test]
async fn session_generate_then_ask_builds_chat_history() {
    let model = Arc::new(FakeModel::replying(fenced(&materials_reply("Plants eat light."))));
    let (app, state) = app_with(model.clone(), FakeFetch::Empty);
    let id = state.sessions.lock().await.current_id();

    let (status, body) = send(
        &app,
        post_json(&format!("/api/sessions/{id}/generate"), json!({"text": "Photosynthesis"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["studyMaterials"]["summary"]["brief"], "Plants eat light.");

    let (status, body) = send(
        &app,
        post_json(&format!("/api/sessions/{id}/ask"), json!({"question": "What absorbs light?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Chlorophyll absorbs the light.");

    let tutor_input = model.tutor_inputs.lock().unwrap()[0].clone();
    assert!(tutor_input.contains("Brief Summary: Plants eat light."));
    assert!(tutor_input.contains("Q1: What absorbs light?"));

    let store = state.sessions.lock().await;
    let history = &store.get(id).unwrap().chat_history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, ChatRole::User);
    assert_eq!(history[1].role, ChatRole::Ai);
}

#[tokio::test]
async fn tutor_failure_appends_a_system_message() {
    let mut fake = FakeModel::replying(materials_reply("x"));
    fake.tutor_fails = true;
    let (app, state) = app_with(Arc::new(fake), FakeFetch::Empty);
    let id = state.sessions.lock().await.current_id();

    let (status, body) = send(
        &app,
        post_json(&format!("/api/sessions/{id}/ask"), json!({"question": "Anything?"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to process the request.");
    let store = state.sessions.lock().await;
    let session = store.get(id).unwrap();
    assert_eq!(session.chat_history.len(), 2);
    assert_eq!(session.chat_history[1].role, ChatRole::System);
    assert!(!session.is_answering());
}

#[tokio::test]
async fn generate_requires_exactly_one_input() {
    let model = Arc::new(FakeModel::replying(materials_reply("x")));
    let (app, state) = app_with(model.clone(), FakeFetch::Empty);
    let id = state.sessions.lock().await.current_id();
    let uri = format!("/api/sessions/{id}/generate");

    let (status, _) = send(
        &app,
        post_json(&uri, json!({"text": "a", "link": "https://b.example"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, post_json(&uri, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn failed_generation_keeps_previous_materials() {
    let (app, state) = app_with(
        Arc::new(FakeModel::replying(materials_reply("First pass."))),
        FakeFetch::Empty,
    );
    let id = state.sessions.lock().await.current_id();
    let uri = format!("/api/sessions/{id}/generate");

    let (status, _) = send(&app, post_json(&uri, json!({"text": "Photosynthesis"}))).await;
    assert_eq!(status, StatusCode::OK);

    // Same session list, but the model now answers with prose.
    let broken = Arc::new(AppState {
        orchestrator: snapstudy_core::PromptOrchestrator::new(Arc::new(FakeModel::replying(
            "I cannot help with that.".to_string(),
        ))),
        fetcher: state.fetcher.clone(),
        sessions: state.sessions.clone(),
    });
    let broken_app = build_router(broken, UPLOAD_LIMIT);

    let (status, body) = send(
        &broken_app,
        post_json(&uri, json!({"text": "Photosynthesis"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["details"].as_str().unwrap().contains("I cannot help"));

    let store = state.sessions.lock().await;
    let session = store.get(id).unwrap();
    assert_eq!(session.materials.summary.brief, "First pass.");
    assert!(!session.is_generating());
}

#[tokio::test]
async fn concurrent_generation_for_one_session_is_rejected() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut fake = FakeModel::replying(materials_reply("Winner."));
    fake.gate = Some((entered.clone(), release.clone()));
    let (app, state) = app_with(Arc::new(fake), FakeFetch::Empty);
    let id = state.sessions.lock().await.current_id();
    let uri = format!("/api/sessions/{id}/generate");

    let first = tokio::spawn(app.clone().oneshot(post_json(&uri, json!({"text": "one"}))));
    entered.notified().await;

    let (status, body) = send(&app, post_json(&uri, json!({"text": "two"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already in progress"));

    release.notify_one();
    let response = first.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let store = state.sessions.lock().await;
    let session = store.get(id).unwrap();
    assert_eq!(session.materials.summary.brief, "Winner.");
    assert!(!session.is_generating());
}

#[tokio::test]
async fn generation_in_one_session_leaves_others_alone() {
    let model = Arc::new(FakeModel::replying(materials_reply("Only here.")));
    let (app, state) = app_with(model, FakeFetch::Empty);
    let first = state.sessions.lock().await.current_id();

    let (status, created) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/sessions")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let second = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["isCurrent"], true);

    let (status, _) = send(
        &app,
        post_json(&format!("/api/sessions/{first}/generate"), json!({"text": "cells"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, view) = send(&app, get(&format!("/api/sessions/{second}"))).await;
    assert_eq!(view["hasMaterials"], false);
    let (_, view) = send(&app, get(&format!("/api/sessions/{first}"))).await;
    assert_eq!(view["hasMaterials"], true);
    assert_eq!(view["inputKind"], "text");

    let (status, _) = send(
        &app,
        post_json(&format!("/api/sessions/{first}/select"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, list) = send(&app, get("/api/sessions")).await;
    assert_eq!(list["sessions"].as_array().unwrap().len(), 2);
    assert_eq!(list["currentSessionId"], first.to_string());
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let model = Arc::new(FakeModel::replying(materials_reply("x")));
    let (app, _) = app_with(model, FakeFetch::Empty);

    let (status, body) = send(&app, get(&format!("/api/sessions/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Session not found"));
}
