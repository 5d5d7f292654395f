use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    dao::{
        models::{AttemptRecord, EvaluationReport, QuestionBody, QuestionSet, WinnerClaim},
        quiz_service::{QuizResult, QuizService},
    },
    state::session::Profile,
};

use super::{
    config::HttpQuizConfig,
    error::{HttpQuizError, HttpResult},
    models::{
        ChooseQuestionsResponse, CreateUserRequest, EvaluateRequest, EvaluateResponse,
        IncrementWinnerRequest, QuestionDocument, StatusResponse, UpdateUserRequest,
        WinnerCountResponse,
    },
};

const CREATE_USER: &str = "user/create";
const UPDATE_USER: &str = "user/update";
const CHOOSE_QUESTIONS: &str = "choose-questions";
const QUESTION: &str = "question";
const EVALUATE: &str = "evaluate-answers";
const WINNER_COUNT: &str = "winner/count";
const WINNER_INCREMENT: &str = "winner/increment";

/// [`QuizService`] backed by the question service's JSON API.
#[derive(Clone)]
pub struct HttpQuizService {
    client: Client,
    base_url: Arc<str>,
    timeout: Duration,
}

impl HttpQuizService {
    /// Build a client for the configured service. No request is sent.
    pub fn new(config: HttpQuizConfig) -> HttpResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| HttpQuizError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            timeout: config.timeout,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        self.client.request(method, url).timeout(self.timeout)
    }

    /// Issue a request and decode its JSON body. A 404 yields `None`.
    async fn exchange<T>(
        &self,
        operation: &'static str,
        path: &'static str,
        builder: reqwest::RequestBuilder,
    ) -> HttpResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = builder
            .send()
            .await
            .map_err(|source| HttpQuizError::send(operation, path, source))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|source| HttpQuizError::decode(operation, path, source)),
            other => Err(HttpQuizError::RequestStatus {
                operation,
                path,
                status: other,
            }),
        }
    }

    /// Like [`Self::exchange`] but a missing resource is an error.
    async fn exchange_required<T>(
        &self,
        operation: &'static str,
        path: &'static str,
        builder: reqwest::RequestBuilder,
    ) -> HttpResult<T>
    where
        T: DeserializeOwned,
    {
        self.exchange(operation, path, builder)
            .await?
            .ok_or(HttpQuizError::RequestStatus {
                operation,
                path,
                status: StatusCode::NOT_FOUND,
            })
    }

    async fn post_json<B, T>(
        &self,
        operation: &'static str,
        path: &'static str,
        body: &B,
    ) -> HttpResult<T>
    where
        B: ?Sized + Serialize,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).json(body);
        self.exchange_required(operation, path, builder).await
    }
}

impl QuizService for HttpQuizService {
    fn create_user(&self, email: String, session_id: String) -> BoxFuture<'static, QuizResult<()>> {
        let service = self.clone();
        Box::pin(async move {
            let body = CreateUserRequest {
                user_email: &email,
                session_id: &session_id,
            };
            let response: StatusResponse = service
                .post_json("create_user", CREATE_USER, &body)
                .await?;
            debug!(status = %response.status, "user record created");
            Ok(())
        })
    }

    fn choose_questions(&self, profile: Profile) -> BoxFuture<'static, QuizResult<QuestionSet>> {
        let service = self.clone();
        Box::pin(async move {
            let builder = service
                .request(Method::GET, CHOOSE_QUESTIONS)
                .query(&[("profile", profile.menu_digit())]);
            let response: ChooseQuestionsResponse = service
                .exchange_required("choose_questions", CHOOSE_QUESTIONS, builder)
                .await?;
            Ok(QuestionSet {
                profile,
                question_ids: response.question_ids,
            })
        })
    }

    fn get_question(
        &self,
        prefixed_id: String,
    ) -> BoxFuture<'static, QuizResult<Option<QuestionBody>>> {
        let service = self.clone();
        Box::pin(async move {
            let builder = service
                .request(Method::GET, QUESTION)
                .query(&[("id", prefixed_id.as_str())]);
            let document: Option<QuestionDocument> =
                service.exchange("get_question", QUESTION, builder).await?;
            Ok(document.map(QuestionBody::from))
        })
    }

    fn update_user_answers(&self, record: AttemptRecord) -> BoxFuture<'static, QuizResult<bool>> {
        let service = self.clone();
        Box::pin(async move {
            let body = UpdateUserRequest::from(record);
            let response: StatusResponse = service
                .post_json("update_user_answers", UPDATE_USER, &body)
                .await?;
            Ok(response.is_success())
        })
    }

    fn evaluate(
        &self,
        prefixed_ids: Vec<String>,
        answers: Vec<String>,
    ) -> BoxFuture<'static, QuizResult<EvaluationReport>> {
        let service = self.clone();
        Box::pin(async move {
            let body = EvaluateRequest {
                question_ids: prefixed_ids,
                user_answers: answers,
            };
            let response: EvaluateResponse = service.post_json("evaluate", EVALUATE, &body).await?;
            Ok(response.into())
        })
    }

    fn get_winner_count(&self) -> BoxFuture<'static, QuizResult<u32>> {
        let service = self.clone();
        Box::pin(async move {
            let builder = service.request(Method::GET, WINNER_COUNT);
            let response: WinnerCountResponse = service
                .exchange_required("get_winner_count", WINNER_COUNT, builder)
                .await?;
            Ok(response.winner_count)
        })
    }

    fn increment_winner_count(&self, claim: WinnerClaim) -> BoxFuture<'static, QuizResult<u32>> {
        let service = self.clone();
        Box::pin(async move {
            let body = IncrementWinnerRequest::from(claim);
            let response: WinnerCountResponse = service
                .post_json("increment_winner_count", WINNER_INCREMENT, &body)
                .await?;
            Ok(response.winner_count)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, QuizResult<()>> {
        let service = self.clone();
        Box::pin(async move {
            // The service has no health route; the winner counter is the cheapest read.
            let builder = service.request(Method::GET, WINNER_COUNT);
            service
                .exchange_required::<WinnerCountResponse>("health_check", WINNER_COUNT, builder)
                .await?;
            Ok(())
        })
    }
}
