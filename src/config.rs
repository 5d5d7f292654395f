//! Application-level configuration loading, including the session flow settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DELFOS_TERMINAL_CONFIG_PATH";
/// Environment variable that overrides the quiz service base URL.
const SERVICE_URL_ENV: &str = "QUIZ_SERVICE_URL";

const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SESSION_IDLE_SECONDS: u64 = 900;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Base URL of the question/evaluation service.
    pub quiz_service_url: String,
    /// Per-request timeout applied to every service call.
    pub request_timeout: Duration,
    /// Sessions without input for this long are closed and dropped.
    pub session_idle: Duration,
    /// Rules and pacing of a terminal session.
    pub flow: FlowSettings,
}

/// Rules and pacing applied to every session.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSettings {
    /// Countdown budget of a quiz attempt.
    pub countdown_seconds: u32,
    /// Minimum score (inclusive, in percent) to pass.
    pub pass_threshold: f64,
    /// Once more winners than this exist, the roulette only hands out honor prizes.
    pub winner_cap: u32,
    /// Probability of an honor-only outcome when prizes are still available.
    pub honor_only_probability: f64,
    /// Delays between scripted steps.
    pub pacing: Pacing,
}

/// Artificial pauses inserted to give the terminal its rhythm.
#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    /// Gap between two boot messages.
    pub boot_step: Duration,
    /// Pause after the last boot message before the terminal opens.
    pub boot_settle: Duration,
    /// "Analysing" pause before the evaluation request.
    pub thinking: Duration,
    /// Delay between latching the result and revealing it.
    pub result_reveal: Duration,
    /// How long the roulette spins.
    pub spin: Duration,
    /// Delay between the wheel stopping and the announcement.
    pub settle: Duration,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            countdown_seconds: 300,
            pass_threshold: 75.0,
            winner_cap: 40,
            honor_only_probability: 0.7,
            pacing: Pacing::default(),
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            boot_step: Duration::from_millis(1_000),
            boot_settle: Duration::from_millis(2_000),
            thinking: Duration::from_millis(1_500),
            result_reveal: Duration::from_millis(2_000),
            spin: Duration::from_millis(4_000),
            settle: Duration::from_millis(1_000),
        }
    }
}

impl Pacing {
    /// Pacing with every pause removed.
    pub fn instant() -> Self {
        Self {
            boot_step: Duration::ZERO,
            boot_settle: Duration::ZERO,
            thinking: Duration::ZERO,
            result_reveal: Duration::ZERO,
            spin: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        if let Some(url) = env::var(SERVICE_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            config.quiz_service_url = url;
        }

        config
    }

    /// Parse a JSON document; missing keys keep their default value.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            quiz_service_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECONDS),
            flow: FlowSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    quiz_service_url: Option<String>,
    request_timeout_ms: Option<u64>,
    session_idle_seconds: Option<u64>,
    countdown_seconds: Option<u32>,
    pass_threshold: Option<f64>,
    winner_cap: Option<u32>,
    honor_only_probability: Option<f64>,
    #[serde(default)]
    pacing: RawPacing,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the `pacing` block, in milliseconds.
struct RawPacing {
    boot_step_ms: Option<u64>,
    boot_settle_ms: Option<u64>,
    thinking_ms: Option<u64>,
    result_reveal_ms: Option<u64>,
    spin_ms: Option<u64>,
    settle_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let flow = FlowSettings::default();
        Self {
            quiz_service_url: value
                .quiz_service_url
                .unwrap_or(defaults.quiz_service_url),
            request_timeout: value
                .request_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            session_idle: value
                .session_idle_seconds
                .map(|seconds| Duration::from_secs(seconds.max(1)))
                .unwrap_or(defaults.session_idle),
            flow: FlowSettings {
                countdown_seconds: value.countdown_seconds.unwrap_or(flow.countdown_seconds),
                pass_threshold: value
                    .pass_threshold
                    .map(|threshold| threshold.clamp(0.0, 100.0))
                    .unwrap_or(flow.pass_threshold),
                winner_cap: value.winner_cap.unwrap_or(flow.winner_cap),
                honor_only_probability: value
                    .honor_only_probability
                    .map(|p| p.clamp(0.0, 1.0))
                    .unwrap_or(flow.honor_only_probability),
                pacing: value.pacing.into_pacing(flow.pacing),
            },
        }
    }
}

impl RawPacing {
    fn into_pacing(self, defaults: Pacing) -> Pacing {
        let pick = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_millis).unwrap_or(fallback)
        };
        Pacing {
            boot_step: pick(self.boot_step_ms, defaults.boot_step),
            boot_settle: pick(self.boot_settle_ms, defaults.boot_settle),
            thinking: pick(self.thinking_ms, defaults.thinking),
            result_reveal: pick(self.result_reveal_ms, defaults.result_reveal),
            spin: pick(self.spin_ms, defaults.spin),
            settle: pick(self.settle_ms, defaults.settle),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
