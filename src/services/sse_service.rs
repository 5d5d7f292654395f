use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::{
        session::SessionView,
        sse::ServerEvent,
    },
    error::ServiceError,
    state::{SessionSnapshot, SharedState},
};

/// Subscribe to the snapshots of one session.
pub fn subscribe(
    state: &SharedState,
    session_id: &str,
) -> Result<watch::Receiver<SessionSnapshot>, ServiceError> {
    state
        .session(session_id)
        .map(|flow| flow.session().subscribe())
        .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}`")))
}

/// Convert a snapshot receiver into an SSE response.
///
/// The current snapshot is sent first. After that each event carries the
/// latest snapshot once a change is published; changes landing while the
/// client is behind coalesce into a single event, so no state is lost but
/// intermediate snapshots may be skipped.
pub fn to_sse_stream(
    session_id: String,
    mut receiver: watch::Receiver<SessionSnapshot>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        let initial = snapshot_event(&receiver.borrow_and_update());
        if let Some(event) = initial {
            if tx.send(Ok(event)).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                changed = receiver.changed() => {
                    // The session was dropped.
                    if changed.is_err() {
                        break;
                    }
                    let event = snapshot_event(&receiver.borrow_and_update());
                    if let Some(event) = event {
                        if tx.send(Ok(event)).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        info!(session_id, "session SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn snapshot_event(snapshot: &SessionSnapshot) -> Option<Event> {
    match ServerEvent::snapshot(&SessionView::from(snapshot)) {
        Ok(payload) => Some(Event::default().event(payload.event).data(payload.data)),
        Err(err) => {
            warn!(error = %err, "failed to serialise session snapshot");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;

    use super::*;
    use crate::state::{SessionState, transcript::LineKind};

    async fn next_frame(body: &mut axum::body::Body) -> String {
        let frame = body.frame().await.unwrap().unwrap();
        String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn streams_the_current_snapshot_then_each_change() {
        let session = SessionState::new("sse-1", 300);
        let response = to_sse_stream("sse-1".into(), session.subscribe()).into_response();
        let mut body = response.into_body();

        let first = next_frame(&mut body).await;
        assert!(first.starts_with("event: session.snapshot\n"));
        assert!(first.contains(r#""sessionId":"sse-1""#));
        assert!(first.contains(r#""phase":"boot""#));

        session.append_line(LineKind::System, "Terminal ready.");
        let second = next_frame(&mut body).await;
        assert!(second.contains("Terminal ready."));
    }

    #[tokio::test]
    async fn a_burst_of_changes_arrives_as_the_latest_snapshot() {
        let session = SessionState::new("sse-2", 300);
        let response = to_sse_stream("sse-2".into(), session.subscribe()).into_response();
        let mut body = response.into_body();
        next_frame(&mut body).await;

        for line in ["first", "second", "third"] {
            session.append_line(LineKind::Output, line);
        }
        let frame = next_frame(&mut body).await;
        for line in ["first", "second", "third"] {
            assert!(frame.contains(line), "missing {line} in {frame}");
        }
    }
}
