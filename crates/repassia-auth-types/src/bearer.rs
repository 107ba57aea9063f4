//! `Authorization: Bearer <token>` extraction.

use http::HeaderMap;
use http::header::AUTHORIZATION;

/// Return the credential from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively. Missing header, another scheme,
/// non-ASCII header bytes, or an empty credential all yield `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
