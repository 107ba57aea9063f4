//! Email address input rules.

/// Longest address accepted (RFC 5321 path limit).
pub const MAX_EMAIL_LEN: usize = 254;

/// Trim surrounding whitespace and check the address is plausible:
/// exactly one `@`, a non-empty local part, a dotted domain without empty
/// labels, and no whitespace or control characters.
///
/// Returns the trimmed address, or `None` when it is rejected. Case is kept
/// as given since profile emails are stored verbatim.
///
/// ```
/// use repassia_domain::email::normalize_email;
///
/// assert_eq!(normalize_email("  ana@loja.com.br "), Some("ana@loja.com.br".to_owned()));
/// assert_eq!(normalize_email("ana@localhost"), None);
/// ```
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim();
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return None;
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return None;
    }

    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.contains('@') {
        return None;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return None;
    }
    if labels
        .iter()
        .any(|l| l.starts_with('-') || l.ends_with('-'))
    {
        return None;
    }

    Some(email.to_owned())
}
