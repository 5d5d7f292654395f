mod client;
mod config;
mod error;
mod models;

pub use client::HttpQuizService;
pub use config::HttpQuizConfig;
