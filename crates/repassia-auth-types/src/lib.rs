//! Auth types shared by RepassIA services.
//!
//! Provides access-token validation, bearer-credential extraction, and the
//! `Identity` extractor populated by the auth gateway.

pub mod bearer;
pub mod identity;
pub mod token;
