/// Cancellable one-second countdown.
pub mod countdown;
/// OpenAPI documentation generation.
pub mod documentation;
/// Scoring of finished attempts.
pub mod evaluation;
/// Health check service.
pub mod health_service;
/// Question-by-question prompt and answer cycle.
pub mod question_loop;
/// Prize draw decisions.
pub mod roulette;
/// Phase orchestration of a single terminal session.
pub mod session_flow;
/// Background closing of idle sessions.
pub mod session_reaper;
/// Session lifecycle operations used by the HTTP routes.
pub mod session_service;
/// Server-Sent Events streaming of session snapshots.
pub mod sse_service;
