//! One-time login code shape.

/// Default number of digits in an emailed login code.
pub const DEFAULT_CODE_LENGTH: u32 = 6;

/// Accepted range for a configured code length.
pub const CODE_LENGTH_RANGE: std::ops::RangeInclusive<u32> = 4..=9;

/// Inclusive bounds `[10^(len-1), 10^len - 1]` for a code of `len` digits, so
/// the leading digit is never zero. For the default length this is
/// `[100000, 999999]`.
pub fn code_bounds(len: u32) -> (u32, u32) {
    let low = 10u32.pow(len - 1);
    let high = 10u32.pow(len) - 1;
    (low, high)
}

/// `true` if `code` is exactly `len` ASCII digits.
pub fn is_well_formed(code: &str, len: u32) -> bool {
    code.len() == len as usize && code.bytes().all(|b| b.is_ascii_digit())
}
