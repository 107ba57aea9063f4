pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod infra;
pub mod rate_limit;
pub mod router;
pub mod state;
pub mod usecase;
