//! Library crate for delfos-terminal, exposing modules for binaries and tests.

/// Application configuration loading.
pub mod config;
/// Access to the remote quiz service.
pub mod dao;
mod dto;
mod error;
/// HTTP routes.
pub mod routes;
/// Session flow and the operations built on it.
pub mod services;
/// Session state, transcript and phase machine.
pub mod state;

#[cfg(test)]
mod testing;
