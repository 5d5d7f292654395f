//! JSON shapes spoken by the quiz service.

use serde::{Deserialize, Serialize};

use crate::dao::models::{AttemptRecord, EvaluationReport, QuestionBody, WinnerClaim};

pub const STATUS_SUCCESS: &str = "success";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest<'a> {
    pub user_email: &'a str,
    pub session_id: &'a str,
}

/// Envelope shared by acknowledgement-style responses.
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_SUCCESS)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChooseQuestionsResponse {
    #[serde(default)]
    pub question_ids: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionDocument {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl From<QuestionDocument> for QuestionBody {
    fn from(doc: QuestionDocument) -> Self {
        Self {
            id: doc.id,
            question: doc.question,
            options: doc.options,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub user_email: String,
    pub session_id: String,
    pub question_ids: Vec<u32>,
    pub user_answers: Vec<String>,
}

impl From<AttemptRecord> for UpdateUserRequest {
    fn from(record: AttemptRecord) -> Self {
        Self {
            user_email: record.user_email,
            session_id: record.session_id,
            question_ids: record.question_ids,
            user_answers: record.answers,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub question_ids: Vec<String>,
    pub user_answers: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub incorrect_answers: u32,
    #[serde(default)]
    pub score_percentage: f64,
}

impl From<EvaluateResponse> for EvaluationReport {
    fn from(response: EvaluateResponse) -> Self {
        Self {
            success: response.status.eq_ignore_ascii_case(STATUS_SUCCESS),
            message: response.message,
            total_questions: response.total_questions,
            correct_answers: response.correct_answers,
            incorrect_answers: response.incorrect_answers,
            score_percentage: response.score_percentage,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerCountResponse {
    pub winner_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementWinnerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl From<WinnerClaim> for IncrementWinnerRequest {
    fn from(claim: WinnerClaim) -> Self {
        Self {
            user_email: claim.user_email,
            session_id: claim.session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn evaluation_payload_uses_camel_case() {
        let body = serde_json::to_value(EvaluateRequest {
            question_ids: vec!["CRD0001".into()],
            user_answers: vec!["a".into()],
        })
        .unwrap();
        assert_eq!(
            body,
            json!({ "questionIds": ["CRD0001"], "userAnswers": ["a"] })
        );
    }

    #[test]
    fn evaluation_response_maps_status_to_success() {
        let response: EvaluateResponse = serde_json::from_value(json!({
            "status": "success",
            "message": "ok",
            "totalQuestions": 8,
            "correctAnswers": 6,
            "incorrectAnswers": 2,
            "scorePercentage": 75.0,
            "results": []
        }))
        .unwrap();
        let report = EvaluationReport::from(response);
        assert!(report.success);
        assert_eq!(report.correct_answers, 6);
        assert_eq!(report.score_percentage, 75.0);

        let failed: EvaluateResponse =
            serde_json::from_value(json!({ "status": "error", "message": "boom" })).unwrap();
        assert!(!EvaluationReport::from(failed).success);
    }

    #[test]
    fn anonymous_winner_claims_send_an_empty_object() {
        let body = serde_json::to_value(IncrementWinnerRequest::from(WinnerClaim::default())).unwrap();
        assert_eq!(body, json!({}));
    }
}
