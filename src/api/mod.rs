//! HTTP API for the reshaping pipeline.
//!
//! - `server`: axum routes (upload, SSE logs, health)
//! - `types`: response payloads for clients
//! - `logs`: broadcast log streaming

pub mod logs;
pub mod server;
pub mod types;
