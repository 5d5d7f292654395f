//! Error types of the HTTP quiz service client.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::quiz_service::QuizServiceError;

/// Convenient result alias returning [`HttpQuizError`] failures.
pub type HttpResult<T> = Result<T, HttpQuizError>;

/// Failures that can occur while talking to the quiz service over HTTP.
#[derive(Debug, Error)]
pub enum HttpQuizError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build quiz service client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent or no response arrived.
    #[error("failed to send quiz service request to `{path}`")]
    RequestSend {
        operation: &'static str,
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// The per-request timeout elapsed.
    #[error("quiz service request to `{path}` timed out")]
    RequestTimeout {
        operation: &'static str,
        path: &'static str,
    },
    /// The service returned an unexpected status code.
    #[error("unexpected quiz service response status {status} for `{path}`")]
    RequestStatus {
        operation: &'static str,
        path: &'static str,
        status: StatusCode,
    },
    /// Response payload could not be parsed into the expected JSON shape.
    #[error("failed to decode quiz service response for `{path}`")]
    DecodeResponse {
        operation: &'static str,
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl HttpQuizError {
    /// Classify a transport failure, separating timeouts from other errors.
    pub(super) fn send(operation: &'static str, path: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            HttpQuizError::RequestTimeout { operation, path }
        } else {
            HttpQuizError::RequestSend {
                operation,
                path,
                source,
            }
        }
    }

    /// Classify a body read failure; a timeout while streaming the body is still a timeout.
    pub(super) fn decode(operation: &'static str, path: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            HttpQuizError::RequestTimeout { operation, path }
        } else {
            HttpQuizError::DecodeResponse {
                operation,
                path,
                source,
            }
        }
    }
}

impl From<HttpQuizError> for QuizServiceError {
    fn from(err: HttpQuizError) -> Self {
        match err {
            HttpQuizError::ClientBuilder { source } => {
                QuizServiceError::unavailable("connect", source)
            }
            HttpQuizError::RequestSend {
                operation, source, ..
            } => QuizServiceError::unavailable(operation, source),
            HttpQuizError::RequestTimeout { operation, .. } => {
                QuizServiceError::Timeout { operation }
            }
            HttpQuizError::RequestStatus {
                operation, status, ..
            } => QuizServiceError::Rejected {
                operation,
                status: status.as_u16(),
            },
            HttpQuizError::DecodeResponse {
                operation, source, ..
            } => QuizServiceError::malformed(operation, source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_keep_the_operation_and_code() {
        let err: QuizServiceError = HttpQuizError::RequestStatus {
            operation: "evaluate",
            path: "evaluate-answers",
            status: StatusCode::BAD_GATEWAY,
        }
        .into();

        match err {
            QuizServiceError::Rejected { operation, status } => {
                assert_eq!(operation, "evaluate");
                assert_eq!(status, 502);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn timeouts_map_to_the_timeout_variant() {
        let err: QuizServiceError = HttpQuizError::RequestTimeout {
            operation: "get_question",
            path: "question",
        }
        .into();
        assert!(matches!(
            err,
            QuizServiceError::Timeout {
                operation: "get_question"
            }
        ));
    }
}
