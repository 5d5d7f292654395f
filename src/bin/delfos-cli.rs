use std::{sync::Arc, time::Duration};

use anyhow::Context;
use delfos_terminal::{
    config::AppConfig,
    dao::http::{HttpQuizConfig, HttpQuizService},
    services::session_flow::SessionFlow,
    state::{
        SessionSnapshot,
        session::RouletteStage,
        state_machine::SessionPhase,
        transcript::LineId,
    },
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
    time::timeout,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let outcome = runtime.block_on(run());
    // the stdin reader may still be parked on a blocking read
    runtime.shutdown_background();
    outcome
}

/// Logs go to stderr; stdout belongs to the transcript.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load();
    let service = HttpQuizService::new(HttpQuizConfig::from_app_config(&config))
        .context("building quiz service client")?;
    let flow = SessionFlow::new(
        Uuid::new_v4().simple().to_string(),
        Arc::new(service),
        config.flow.clone(),
    );

    // final lines of a session land after its phase changes
    let pacing = &config.flow.pacing;
    let grace = pacing.result_reveal.max(pacing.settle) + Duration::from_secs(1);
    let mut printer = tokio::spawn(print_transcript(flow.session().subscribe(), grace));
    let boot = tokio::spawn({
        let flow = flow.clone();
        async move { flow.start().await }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = &mut printer => break,
            line = lines.next_line() => {
                match line.context("reading stdin")? {
                    Some(line) => flow.submit(&line).await,
                    None => break,
                }
            }
        }
    }

    flow.shutdown();
    boot.abort();
    drop(flow);
    if !printer.is_finished() {
        // flush whatever the last submission printed
        let _ = timeout(grace, printer).await;
    }
    Ok(())
}

/// Print every new transcript line until the session is over and has been
/// quiet for `grace`.
async fn print_transcript(mut receiver: watch::Receiver<SessionSnapshot>, grace: Duration) {
    let mut last_printed: Option<LineId> = None;
    loop {
        let finished = {
            let snapshot = receiver.borrow_and_update();
            let lines = snapshot.transcript.lines();
            let start = last_printed
                .and_then(|id| lines.iter().position(|line| line.id == id))
                .map_or(0, |index| index + 1);
            for line in &lines[start..] {
                println!("{}", line.content);
            }
            if let Some(line) = lines.last() {
                last_printed = Some(line.id);
            }
            is_finished(&snapshot)
        };

        let changed = if finished {
            matches!(timeout(grace, receiver.changed()).await, Ok(Ok(())))
        } else {
            receiver.changed().await.is_ok()
        };
        if !changed {
            break;
        }
    }
}

fn is_finished(snapshot: &SessionSnapshot) -> bool {
    matches!(
        snapshot.phase(),
        SessionPhase::TimedOut | SessionPhase::Failed
    ) || matches!(snapshot.roulette, Some(RouletteStage::Settled(_)))
}
