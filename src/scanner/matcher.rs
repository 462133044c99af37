//! Hex token matcher
//!
//! Finds 64-character hexadecimal runs bounded by ASCII word boundaries.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::model::Token;

static HEX64: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u:\b)[0-9a-fA-F]{64}(?-u:\b)").expect("hex pattern is valid")
});

/// Find every token in `content`, in order of appearance.
///
/// Duplicates are returned as-is. Content that is not UTF-8 text yields
/// no tokens.
pub fn find_tokens(content: &[u8]) -> Vec<Token> {
    if std::str::from_utf8(content).is_err() {
        log::debug!("content is not valid UTF-8 ({} bytes), no tokens", content.len());
        return Vec::new();
    }

    HEX64
        .find_iter(content)
        .filter_map(|m| std::str::from_utf8(m.as_bytes()).ok())
        .filter_map(Token::parse)
        .collect()
}
