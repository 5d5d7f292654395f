use std::time::Duration;

use crate::config::AppConfig;

/// Runtime configuration describing how to reach the quiz service.
#[derive(Debug, Clone)]
pub struct HttpQuizConfig {
    /// Root URL of the quiz service; a trailing slash is ignored.
    pub base_url: String,
    /// Applied to each request individually.
    pub timeout: Duration,
}

impl HttpQuizConfig {
    /// Construct a configuration from an explicit base URL and timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Extract the client settings from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(config.quiz_service_url.clone(), config.request_timeout)
    }
}
