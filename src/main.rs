//! Delfos terminal binary entrypoint wiring the REST and SSE layers to the quiz service.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use delfos_terminal::{
    config::AppConfig,
    dao::http::{HttpQuizConfig, HttpQuizService},
    routes,
    services::session_reaper,
    state::{AppState, SharedState},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    info!(quiz_service = %config.quiz_service_url, "using quiz service");
    let service = HttpQuizService::new(HttpQuizConfig::from_app_config(&config))
        .context("building quiz service client")?;

    let app_state = AppState::new(config, Arc::new(service));
    let reaper = session_reaper::spawn(&app_state);
    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    reaper.abort();
    close_sessions(&app_state);
    Ok(())
}

/// Stop every countdown still running once the server is down.
fn close_sessions(state: &SharedState) {
    let sessions = state.drain_sessions();
    if !sessions.is_empty() {
        info!(count = sessions.len(), "closing remaining sessions");
    }
    for flow in sessions {
        flow.shutdown();
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
