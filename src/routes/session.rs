use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::session::{SessionView, SubmitInputRequest},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes driving terminal sessions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(close_session))
        .route("/sessions/{id}/input", post(submit_input))
}

/// Open a new terminal session; its boot sequence starts immediately.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    responses(
        (status = 201, description = "Session created", body = SessionView)
    )
)]
pub async fn create_session(State(state): State<SharedState>) -> (StatusCode, Json<SessionView>) {
    let view = session_service::create_session(&state);
    (StatusCode::CREATED, Json(view))
}

/// Current snapshot of a session.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionView),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(session_service::get_session(&state, &id)?))
}

/// Submit one line typed into the terminal.
#[utoipa::path(
    post,
    path = "/sessions/{id}/input",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    request_body = SubmitInputRequest,
    responses(
        (status = 200, description = "Input processed", body = SessionView),
        (status = 400, description = "Input rejected"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn submit_input(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<SubmitInputRequest>, JsonRejection>,
) -> Result<Json<SessionView>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;
    let view = session_service::submit_input(&state, &id, &payload.text).await?;
    Ok(Json(view))
}

/// Close a session and stop its countdown.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    responses(
        (status = 204, description = "Session closed"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn close_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    session_service::close_session(&state, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, header},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::{
        routes,
        state::AppState,
        testing::{FakeQuizService, instant_config},
    };

    use super::*;

    fn app() -> Router {
        routes::router(AppState::new(instant_config(), FakeQuizService::new()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create(app: &Router) -> String {
        let request = Request::post("/sessions").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["phase"], "boot");
        body["sessionId"].as_str().unwrap().to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_sessions_are_not_found() {
        let app = app();
        let request = Request::get("/sessions/nope").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("nope"));

        let (status, _) = send(&app, post_json("/sessions/nope/input", json!({ "text": "x" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn email_submission_opens_the_profile_menu() {
        let app = app();
        let id = create(&app).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        let uri = format!("/sessions/{id}/input");
        let (status, body) = send(&app, post_json(&uri, json!({ "text": "ada@delfos.io" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "profile_menu");
        assert_eq!(body["userEmail"], "ada@delfos.io");
        assert_eq!(body["awaitingResponse"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_input_answers_with_a_json_message() {
        let app = app();
        let id = create(&app).await;
        let uri = format!("/sessions/{id}/input");

        let (status, body) = send(&app, post_json(&uri, json!({ "text": "x".repeat(600) }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["message"].as_str().unwrap();
        assert_eq!(message, "bad request: validation failed: text (length)");

        let request = Request::post(&uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("bad request:"));

        let (status, body) = send(&app, post_json(&uri, json!({ "text": "a\nb" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "bad request: input must be a single line");
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_sessions_disappear() {
        let app = app();
        let id = create(&app).await;
        let uri = format!("/sessions/{id}");

        let (status, _) = send(&app, Request::delete(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Request::get(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
