//! Request path canonicalization.

use percent_encoding::percent_decode_str;

/// Percent-decode a request path. `None` if the result is not UTF-8.
pub fn decode_path(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// A path is acceptable when it is absolute and contains neither `..` nor `//`.
pub fn is_valid_path(path: &str) -> bool {
    path.starts_with('/') && !path.contains("..") && !path.contains("//")
}
