//! Inlining rule for values
//!
//! A value is stored inside its record when its bytes are exactly the
//! canonical decimal form of an `i32`: optional minus sign, no plus sign,
//! no leading zeros, no surrounding whitespace. Anything else goes to an
//! overflow store.

/// Returns the integer to inline, or `None` if the value must overflow.
pub fn inline_int(value: &[u8]) -> Option<i32> {
    // "-2147483648" is the longest canonical form
    if value.is_empty() || value.len() > 11 {
        return None;
    }
    let text = std::str::from_utf8(value).ok()?;
    let parsed: i32 = text.parse().ok()?;
    // rejects "+1", "007" and "-0"
    if parsed.to_string() == text {
        Some(parsed)
    } else {
        None
    }
}
