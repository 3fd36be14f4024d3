//! SQL LIKE patterns compiled to regular expressions.

use pipedb_core::{Error, Result};
use regex::Regex;

/// A LIKE pattern compiled once and matched per row.
///
/// `%` matches any run of characters (including none), `_` matches exactly
/// one character, everything else matches itself. The match is anchored at
/// both ends and case-sensitive.
#[derive(Clone, Debug)]
pub struct LikePattern {
    source: String,
    regex: Regex,
}

impl LikePattern {
    /// Compiles a LIKE pattern.
    pub fn compile(pattern: &str) -> Result<Self> {
        let mut translated = String::with_capacity(pattern.len() * 2 + 6);
        translated.push_str("(?s)^");
        let mut buf = [0u8; 4];
        for c in pattern.chars() {
            match c {
                '%' => translated.push_str(".*"),
                '_' => translated.push('.'),
                c => translated.push_str(&regex::escape(c.encode_utf8(&mut buf))),
            }
        }
        translated.push('$');

        let regex = Regex::new(&translated).map_err(|e| {
            Error::invalid_expression(format!("LIKE pattern {pattern:?} does not compile: {e}"))
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Returns the original LIKE pattern.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Tests a value against the pattern.
    #[inline]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_and_underscore() {
        let p = LikePattern::compile("A%").unwrap();
        assert!(p.is_match("Alice"));
        assert!(p.is_match("A"));
        assert!(!p.is_match("Bob"));
        assert!(!p.is_match("bA"));

        let p = LikePattern::compile("_ob").unwrap();
        assert!(p.is_match("Bob"));
        assert!(!p.is_match("Boob"));
        assert!(!p.is_match("ob"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let p = LikePattern::compile("a.b*(c)%").unwrap();
        assert!(p.is_match("a.b*(c)"));
        assert!(p.is_match("a.b*(c)zzz"));
        assert!(!p.is_match("axb*(c)"));
    }

    #[test]
    fn test_match_spans_newlines() {
        let p = LikePattern::compile("a%z").unwrap();
        assert!(p.is_match("a\nz"));
    }

    #[test]
    fn test_case_sensitive() {
        let p = LikePattern::compile("abc").unwrap();
        assert!(!p.is_match("ABC"));
        assert_eq!(p.source(), "abc");
    }
}
