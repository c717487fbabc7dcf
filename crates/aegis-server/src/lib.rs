//! Aegis Gateway Server
//!
//! HTTP surface and startup wiring for the guarded LLM gateway:
//! - `POST /api/v1/completions` runs the full request pipeline
//! - `GET  /api/v1/health` liveness
//! - `GET  /api/v1/analytics/*` operational reads, plus a cache reset

pub mod analytics;
pub mod api;
pub mod bootstrap;
pub mod config;

pub use bootstrap::{build_router, build_state, AppState};
pub use config::ServerConfig;
