use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Healthcheck payloads.
pub mod health;
/// Phases as seen by clients.
pub mod phase;
/// Session snapshots and input bodies.
pub mod session;
/// Server-sent event payloads.
pub mod sse;
/// Input validators.
pub mod validation;

fn format_rfc3339(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
