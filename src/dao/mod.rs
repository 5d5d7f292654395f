/// HTTP implementation of the quiz service boundary.
pub mod http;
/// Domain-side models exchanged with the quiz service.
pub mod models;
/// Abstraction over the question/evaluation service.
pub mod quiz_service;
