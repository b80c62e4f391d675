//! Topic suffix validation.
//!
//! A suffix is valid iff it is non-empty and every character is an ASCII
//! digit, a lowercase ASCII letter, or `/`. Anything else, including
//! uppercase, whitespace, wildcards, and any non-ASCII code point, rejects the
//! whole suffix.

/// Returns `true` if `suffix` matches `^[0-9a-z/]+$` in its entirety.
#[inline]
pub fn validate(suffix: &str) -> bool {
    !suffix.is_empty() && suffix.bytes().all(is_topic_byte)
}

#[inline]
fn is_topic_byte(b: u8) -> bool {
    b.is_ascii_digit() || b.is_ascii_lowercase() || b == b'/'
}

/// Validated split of a suffix list: `(valid, invalid)`, order preserved.
pub fn partition<'a, S: AsRef<str>>(suffixes: &'a [S]) -> (Vec<&'a str>, Vec<&'a str>) {
    suffixes.iter().map(AsRef::as_ref).partition(|s| validate(s))
}
