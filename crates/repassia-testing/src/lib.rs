//! Test utilities for RepassIA services.
//!
//! Dev-dependency only.

pub mod auth;
