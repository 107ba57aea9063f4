//! sea-orm entities owned by the auth service.

pub mod auth_codes;
pub mod outbox_events;
pub mod profiles;
pub mod refresh_tokens;
