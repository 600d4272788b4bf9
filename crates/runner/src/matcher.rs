//! String matching shared by output and response expectations

use regex::Regex;

use crate::error::Result;
use crate::expectations::MatchType;

/// Compiled form of one expected string
#[derive(Debug, Clone)]
pub enum Matcher {
    Exact(String),
    Regexp(Regex),
    Prefix(String),
    Suffix(String),
    Infix(String),
}

impl Matcher {
    /// Compile `pattern`; an invalid regular expression is an error.
    pub fn new(match_type: MatchType, pattern: &str) -> Result<Self> {
        Ok(match match_type {
            MatchType::Exact => Matcher::Exact(pattern.to_string()),
            MatchType::Regexp => Matcher::Regexp(Regex::new(pattern)?),
            MatchType::Prefix => Matcher::Prefix(pattern.to_string()),
            MatchType::Suffix => Matcher::Suffix(pattern.to_string()),
            MatchType::Infix => Matcher::Infix(pattern.to_string()),
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Exact(expected) => text == expected,
            Matcher::Regexp(re) => re.is_match(text),
            Matcher::Prefix(prefix) => text.starts_with(prefix.as_str()),
            Matcher::Suffix(suffix) => text.ends_with(suffix.as_str()),
            Matcher::Infix(infix) => text.contains(infix.as_str()),
        }
    }

    pub fn pattern(&self) -> &str {
        match self {
            Matcher::Regexp(re) => re.as_str(),
            Matcher::Exact(s) | Matcher::Prefix(s) | Matcher::Suffix(s) | Matcher::Infix(s) => s,
        }
    }
}
