use std::fmt;

/// A 64-character hexadecimal candidate secret.
///
/// Equality is exact string equality: `AB..` and `ab..` are distinct tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(String);

impl Token {
    /// Length of every token in characters
    pub const LEN: usize = 64;

    /// Wrap a string that is already known to be a token.
    ///
    /// Returns `None` unless the input is exactly 64 ASCII hex digits.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() == Self::LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
