use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info};

use crate::state::{AppState, SharedState};

/// Start the background task closing sessions nobody has touched for
/// `session_idle`. It stops once the application state is dropped.
pub fn spawn(state: &SharedState) -> JoinHandle<()> {
    let ttl = state.config().session_idle;
    let weak = Arc::downgrade(state);
    let period = (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(state) = weak.upgrade() else {
                debug!("application state dropped; session reaper exiting");
                break;
            };
            reap(&state, ttl);
        }
    })
}

/// Close every session idle for at least `ttl`, returning how many went.
pub fn reap(state: &AppState, ttl: Duration) -> usize {
    let stale = state.reap_idle(ttl);
    for flow in &stale {
        info!(
            session_id = %flow.session().id(),
            idle_secs = flow.idle_for().as_secs(),
            "closing idle session"
        );
        flow.shutdown();
    }
    stale.len()
}
