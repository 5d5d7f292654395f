use serde::Serialize;

use crate::dto::session::SessionView;

/// Name of the event carrying a full session snapshot.
pub const SNAPSHOT_EVENT: &str = "session.snapshot";

/// Named SSE payload, already serialised.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    /// SSE event name.
    pub event: &'static str,
    /// JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Serialise `payload` under the given event name.
    pub fn json<T: Serialize>(event: &'static str, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            event,
            data: serde_json::to_string(payload)?,
        })
    }

    /// A `session.snapshot` event for one view.
    pub fn snapshot(view: &SessionView) -> serde_json::Result<Self> {
        Self::json(SNAPSHOT_EVENT, view)
    }
}
