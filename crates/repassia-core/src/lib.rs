//! Shared service plumbing: env config, tracing, HTTP layers, health, shutdown.

pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod shutdown;
pub mod tracing;
