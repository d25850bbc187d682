//! HTTP routes for the quiz UI.
//!
//! Every POST handler applies one session action and redirects back
//! to `/` (post/redirect/get).

use crate::models::{Letter, QuestionKey, QuizError, Settings};
use crate::session::Upload;
use crate::web::{views, AppState};
use async_trait::async_trait;
use axum::{
    extract::{multipart::MultipartError, FromRequestParts, Multipart, Path, State},
    http::{
        header::{self, HeaderName},
        request::Parts,
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type AppStateArc = Arc<AppState>;
type Rejection = (StatusCode, String);

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "quizforge_session";

// ============================================================================
// Session extraction
// ============================================================================

/// Session id resolved from the cookie (fresh if missing or unknown).
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppStateArc> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppStateArc,
    ) -> Result<Self, Self::Rejection> {
        let (id, created) = state.sessions.resolve(session_cookie(&parts.headers));
        if created {
            debug!(session = %id, "New browser session");
        }
        Ok(Self { id })
    }
}

impl Session {
    fn set_cookie(&self) -> [(HeaderName, String); 1] {
        [(
            header::SET_COOKIE,
            format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id),
        )]
    }

    fn redirect(&self) -> Response {
        (self.set_cookie(), Redirect::to("/")).into_response()
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

// ============================================================================
// Page Routes
// ============================================================================

pub fn page_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

async fn index(session: Session, State(state): State<AppStateArc>) -> Response {
    let markup = state
        .sessions
        .with(session.id, |s| views::page(s, &state.config));
    (session.set_cookie(), markup).into_response()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub sessions: usize,
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.pipeline.generator().model_id().to_string(),
        sessions: state.sessions.len(),
    })
}

// ============================================================================
// Document Routes
// ============================================================================

pub fn document_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/upload", post(upload))
        .route("/settings", post(update_settings))
        .route("/generate", post(generate))
}

async fn upload(
    session: Session,
    State(state): State<AppStateArc>,
    mut multipart: Multipart,
) -> Result<Response, Rejection> {
    let mut received = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some("pdf") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("document.pdf").to_string();
        let bytes = field.bytes().await.map_err(bad_multipart)?;
        received = Some(Upload::new(file_name, bytes.to_vec()));
    }

    state.sessions.with(session.id, |s| match received {
        Some(upload) if !upload.is_empty() => {
            info!(session = %session.id, file = %upload.file_name, bytes = upload.len(), "PDF uploaded");
            s.set_upload(upload);
        }
        _ => s.notify("Please choose a PDF file to upload."),
    });
    Ok(session.redirect())
}

fn bad_multipart(err: MultipartError) -> Rejection {
    warn!(error = %err, "Rejected upload");
    (err.status(), err.body_text())
}

/// Settings form fields.
#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub questions_per_level: usize,
}

async fn update_settings(
    session: Session,
    State(state): State<AppStateArc>,
    Form(form): Form<SettingsForm>,
) -> Response {
    let settings = Settings {
        chunk_size: form.chunk_size,
        chunk_overlap: form.chunk_overlap,
        questions_per_level: form.questions_per_level,
    }
    .clamped(&state.config);

    let changed = state.sessions.with(session.id, |s| s.set_settings(settings));
    debug!(session = %session.id, changed = changed, ?settings, "Settings updated");
    session.redirect()
}

async fn generate(session: Session, State(state): State<AppStateArc>) -> Response {
    let job = state.sessions.with(session.id, |s| {
        let settings = s.settings();
        let upload = s.upload().cloned()?;
        Some((upload, settings, s.begin_generation()))
    });
    let Some((upload, settings, ticket)) = job else {
        state
            .sessions
            .with(session.id, |s| s.notify("Please upload a PDF first."));
        return session.redirect();
    };

    info!(
        session = %session.id,
        file = %upload.file_name,
        chunk_size = settings.chunk_size,
        chunk_overlap = settings.chunk_overlap,
        per_level = settings.questions_per_level,
        "Generating quiz"
    );

    // No session entry is borrowed while the model call runs.
    let result = state.pipeline.run(&upload.bytes, &settings).await;

    state.sessions.with(session.id, |s| {
        if !s.is_current_generation(ticket) {
            info!(session = %session.id, "Session moved on during generation, result dropped");
            return;
        }
        match result {
            Ok(generated) => s.install_quiz(generated.quiz, generated.material.info()),
            Err(e) => {
                error!(session = %session.id, error = %e, "Quiz generation failed");
                s.fail_generation(&e);
            }
        }
    });
    session.redirect()
}

// ============================================================================
// Question Routes
// ============================================================================

pub fn question_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/question/:key/select", post(select_choice))
        .route("/question/:key/clear", post(clear_choice))
        .route("/question/:key/submit", post(submit_choice))
}

/// Radio group of a question card.
#[derive(Debug, Default, Deserialize)]
pub struct ChoiceForm {
    #[serde(default)]
    pub letter: Option<String>,
}

fn bad_request(err: QuizError) -> Rejection {
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn parse_key(raw: &str) -> Result<QuestionKey, Rejection> {
    raw.parse::<QuestionKey>().map_err(bad_request)
}

fn parse_letter(raw: Option<&str>) -> Result<Option<Letter>, Rejection> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => raw.parse::<Letter>().map(Some).map_err(bad_request),
    }
}

async fn select_choice(
    session: Session,
    State(state): State<AppStateArc>,
    Path(key): Path<String>,
    Form(form): Form<ChoiceForm>,
) -> Result<Response, Rejection> {
    let key = parse_key(&key)?;
    if let Some(letter) = parse_letter(form.letter.as_deref())? {
        state.sessions.with(session.id, |s| s.select(key, letter));
    }
    Ok(session.redirect())
}

async fn clear_choice(
    session: Session,
    State(state): State<AppStateArc>,
    Path(key): Path<String>,
) -> Result<Response, Rejection> {
    let key = parse_key(&key)?;
    state.sessions.with(session.id, |s| s.clear(key));
    Ok(session.redirect())
}

async fn submit_choice(
    session: Session,
    State(state): State<AppStateArc>,
    Path(key): Path<String>,
    Form(form): Form<ChoiceForm>,
) -> Result<Response, Rejection> {
    let key = parse_key(&key)?;
    let letter = parse_letter(form.letter.as_deref())?;

    let outcome = state.sessions.with(session.id, |s| {
        if let Some(letter) = letter {
            s.select(key, letter);
        }
        s.submit(key)
    });
    if let Some(outcome) = outcome {
        debug!(session = %session.id, question = %key, %outcome, "Answer submitted");
    }
    Ok(session.redirect())
}

// ============================================================================
// Session Routes
// ============================================================================

pub fn session_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/finish", post(finish))
        .route("/retry", post(retry))
        .route("/reset", post(reset))
}

async fn finish(session: Session, State(state): State<AppStateArc>) -> Response {
    let score = state
        .sessions
        .with(session.id, |s| s.finish().map(|e| (e.score, e.total)));
    if let Some((score, total)) = score {
        info!(session = %session.id, score = score, total = total, "Quiz evaluated");
    }
    session.redirect()
}

async fn retry(session: Session, State(state): State<AppStateArc>) -> Response {
    state.sessions.with(session.id, |s| s.retry());
    session.redirect()
}

async fn reset(session: Session, State(state): State<AppStateArc>) -> Response {
    state.sessions.with(session.id, |s| s.start_over());
    info!(session = %session.id, "Session reset");
    session.redirect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::build_pdf;
    use crate::models::{Config, Outcome, Tier};
    use crate::quiz::generator::tests::FakeChatModel;
    use crate::quiz::parse::tests::quiz_json;
    use crate::web::router;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "quizforge-test-boundary";

    fn app(replies: Vec<crate::models::Result<String>>) -> (Router, AppStateArc) {
        let fake = Arc::new(FakeChatModel::new(replies));
        let state = Arc::new(AppState::new(Config::default(), fake));
        (router(state.clone()), state)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form(uri: &str, cookie: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart(cookie: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"pdf\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    /// Open a session with `GET /`; returns the cookie pair and the id.
    async fn open_session(app: &Router) -> (String, Uuid) {
        let response = send(app, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string();
        let id = Uuid::parse_str(cookie.split_once('=').unwrap().1).unwrap();
        (cookie, id)
    }

    fn assert_redirect(response: &Response) {
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    }

    #[test]
    fn test_session_cookie_parsing() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("theme=dark; {SESSION_COOKIE}={id}; other=1").parse().unwrap(),
        );
        assert_eq!(session_cookie(&headers), Some(id));

        headers.insert(header::COOKIE, format!("{SESSION_COOKIE}=garbage").parse().unwrap());
        assert_eq!(session_cookie(&headers), None);
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_full_quiz_flow() {
        let (app, state) = app(vec![Ok(quiz_json(3, 3, 3).to_string())]);
        let (cookie, id) = open_session(&app).await;

        let pdf = build_pdf(&[Some("Photosynthesis converts light into chemical energy.")]);
        assert_redirect(&send(&app, multipart(&cookie, "bio.pdf", &pdf)).await);

        let settings = "chunk_size=1000&chunk_overlap=200&questions_per_level=3";
        assert_redirect(&send(&app, form("/settings", &cookie, settings)).await);

        assert_redirect(&send(&app, form("/generate", &cookie, "")).await);
        let counts = state.sessions.with(id, |s| {
            s.quiz()
                .map(|q| Tier::ALL.map(|t| q.tier(t).len()))
        });
        assert_eq!(counts, Some([3, 3, 3]));

        let key = QuestionKey::new(Tier::Basic, 0);
        let submit = send(&app, form("/question/basic_0/submit", &cookie, "letter=a")).await;
        assert_redirect(&submit);
        assert_redirect(&send(&app, form("/question/basic_0/clear", &cookie, "")).await);
        let (locked, outcome) = state
            .sessions
            .with(id, |s| (s.is_locked(key), s.outcome(key)));
        assert!(locked);
        assert_eq!(outcome, Some(Outcome::Correct));

        assert_redirect(&send(&app, form("/finish", &cookie, "")).await);
        let score = state
            .sessions
            .with(id, |s| s.results().map(|e| (e.score, e.total)));
        assert_eq!(score, Some((1, 9)));

        let page = send(
            &app,
            Request::get("/")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let html = body_text(page).await;
        assert!(html.contains("Results"));
        assert!(html.contains("Using 1 chunks. Sent 1 chunk(s) to the model."));

        assert_redirect(&send(&app, form("/reset", &cookie, "")).await);
        let cleared = state
            .sessions
            .with(id, |s| s.upload().is_none() && s.quiz().is_none());
        assert!(cleared);
    }

    fn slow_app(delay: Duration) -> (Router, AppStateArc, Arc<FakeChatModel>) {
        let fake = Arc::new(
            FakeChatModel::new(vec![Ok(quiz_json(3, 3, 3).to_string())]).with_delay(delay),
        );
        let state = Arc::new(AppState::new(Config::default(), fake.clone()));
        (router(state.clone()), state, fake)
    }

    async fn wait_for_model_call(fake: &FakeChatModel) {
        while fake.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_reset_during_generation_discards_result() {
        let (app, state, fake) = slow_app(Duration::from_millis(300));
        let (cookie, id) = open_session(&app).await;
        let pdf = build_pdf(&[Some("Mitochondria produce ATP.")]);
        send(&app, multipart(&cookie, "cells.pdf", &pdf)).await;

        let pending = tokio::spawn(app.clone().oneshot(form("/generate", &cookie, "")));
        wait_for_model_call(&fake).await;
        assert_redirect(&send(&app, form("/reset", &cookie, "")).await);

        assert_redirect(&pending.await.unwrap().unwrap());
        let (has_upload, has_quiz) = state
            .sessions
            .with(id, |s| (s.upload().is_some(), s.quiz().is_some()));
        assert!(!has_upload);
        assert!(!has_quiz);
    }

    #[tokio::test]
    async fn test_retry_during_generation_discards_result() {
        let (app, state, fake) = slow_app(Duration::from_millis(300));
        let (cookie, id) = open_session(&app).await;
        let pdf = build_pdf(&[Some("Mitochondria produce ATP.")]);
        send(&app, multipart(&cookie, "cells.pdf", &pdf)).await;

        let pending = tokio::spawn(app.clone().oneshot(form("/generate", &cookie, "")));
        wait_for_model_call(&fake).await;
        assert_redirect(&send(&app, form("/retry", &cookie, "")).await);

        assert_redirect(&pending.await.unwrap().unwrap());
        let (has_upload, has_quiz, alert) = state.sessions.with(id, |s| {
            (s.upload().is_some(), s.quiz().is_some(), s.alert().cloned())
        });
        assert!(has_upload);
        assert!(!has_quiz);
        assert_eq!(alert, None);
    }

    #[tokio::test]
    async fn test_generate_without_upload_shows_message() {
        let (app, state) = app(vec![]);
        let (cookie, id) = open_session(&app).await;

        assert_redirect(&send(&app, form("/generate", &cookie, "")).await);
        let alert = state
            .sessions
            .with(id, |s| s.alert().map(|a| a.text().to_string()));
        assert_eq!(alert.as_deref(), Some("Please upload a PDF first."));
    }

    #[tokio::test]
    async fn test_malformed_model_output_surfaces_failure() {
        let (app, state) = app(vec![
            Ok("Sorry, no quiz today.".to_string()),
            Ok("Still no quiz.".to_string()),
        ]);
        let (cookie, id) = open_session(&app).await;
        let pdf = build_pdf(&[Some("Enzymes lower activation energy.")]);
        send(&app, multipart(&cookie, "enzymes.pdf", &pdf)).await;

        assert_redirect(&send(&app, form("/generate", &cookie, "")).await);

        let (has_quiz, has_upload) = state
            .sessions
            .with(id, |s| (s.quiz().is_some(), s.upload().is_some()));
        assert!(!has_quiz);
        assert!(has_upload);

        let page = send(
            &app,
            Request::get("/")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let html = body_text(page).await;
        assert!(html.contains("Quiz generation failed."));
        assert!(html.contains("No JSON object found in model output."));
    }

    #[tokio::test]
    async fn test_settings_are_clamped() {
        let (app, state) = app(vec![]);
        let (cookie, id) = open_session(&app).await;

        let body = "chunk_size=100&chunk_overlap=5000&questions_per_level=50";
        assert_redirect(&send(&app, form("/settings", &cookie, body)).await);

        let settings = state.sessions.with(id, |s| s.settings());
        assert_eq!(settings.chunk_size, 800);
        assert_eq!(settings.chunk_overlap, 600);
        assert_eq!(settings.questions_per_level, 8);
    }

    #[tokio::test]
    async fn test_bad_question_key_rejected() {
        let (app, _) = app(vec![]);
        let (cookie, _) = open_session(&app).await;

        let response = send(&app, form("/question/extreme_0/submit", &cookie, "")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, form("/question/basic_0/select", &cookie, "letter=Z")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(vec![]);
        let response = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let health: HealthResponse = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.model, "gpt-4o-mini");
    }
}
