//! Input rules shared by RepassIA services.
//!
//! Pure functions with no framework dependencies.

pub mod email;
pub mod otp;
