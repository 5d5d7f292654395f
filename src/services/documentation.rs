use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the Delfos terminal backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::create_session,
        crate::routes::session::get_session,
        crate::routes::session::submit_input,
        crate::routes::session::close_session,
        crate::routes::sse::session_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::SubmitInputRequest,
            crate::dto::session::SessionView,
            crate::dto::session::LineView,
            crate::dto::session::LineKindView,
            crate::dto::session::EvaluationView,
            crate::dto::session::RouletteView,
            crate::dto::session::PrizeView,
            crate::dto::phase::VisibleSessionPhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Terminal session lifecycle and input"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
