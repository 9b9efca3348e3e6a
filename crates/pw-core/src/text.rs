//! Pure string functions bound into the word store's SQL engine.
//!
//! They run once per row during a query, so none of them touch shared state.

use std::cmp::Ordering;
use std::ffi::CString;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Escape character used with `LIKE ... ESCAPE '!'`.
pub const ESCAPE_CHAR: char = '!';

const LIKE_WILDCARDS: [char; 2] = ['%', '_'];

/// Case-fold for case-insensitive matching.
pub fn lower(text: &str) -> String {
    text.to_lowercase()
}

/// Loose form for matching: compatibility decomposition with every combining
/// mark dropped. `café` → `cafe`, `ｆｏｏ` → `foo`.
pub fn normalize(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Turn a user-supplied prefix into a literal-prefix LIKE pattern.
/// `%`, `_` and the escape character itself are escaped, then a trailing `%`
/// is appended.
pub fn like_escape(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 2);
    for c in prefix.chars() {
        if c == ESCAPE_CHAR || LIKE_WILDCARDS.contains(&c) {
            escaped.push(ESCAPE_CHAR);
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Locale-aware ordering using the process `LC_COLLATE`.
///
/// Strings with an interior NUL cannot be passed to C and compare ordinally.
pub fn collate(a: &str, b: &str) -> Ordering {
    match (CString::new(a), CString::new(b)) {
        (Ok(a), Ok(b)) => {
            // SAFETY: both pointers are valid NUL-terminated strings that
            // outlive the call.
            let rc = unsafe { libc::strcoll(a.as_ptr(), b.as_ptr()) };
            rc.cmp(&0)
        }
        _ => a.cmp(b),
    }
}
