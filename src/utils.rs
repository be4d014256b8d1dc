use libc::c_char;

/// Converts a fixed-size, NUL-padded C string field into an owned `String`.
///
/// Bytes after the first NUL are ignored; invalid UTF-8 is replaced lossily.
#[must_use]
pub fn fixed_cstr_to_string(raw: &[c_char]) -> String {
    #[allow(clippy::cast_sign_loss)]
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Sysman fills unset identity strings with "Unknown" (older loaders) or "unknown".
#[must_use]
pub fn is_unknown_sentinel(value: &str) -> bool {
    value.eq_ignore_ascii_case("unknown")
}

/// Parses a leading decimal integer: leading whitespace
/// and trailing garbage are ignored, anything unparsable reads as zero.
#[must_use]
pub fn parse_leading_int(value: &str) -> i64 {
    let trimmed = value.trim_start();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(trimmed.len(), |(i, _)| i);
    trimmed[..end].parse().unwrap_or(0)
}
