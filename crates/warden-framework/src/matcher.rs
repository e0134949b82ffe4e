//! Text matching strategies.
//!
//! A [`MatchType`] decides how a filter compares the text extracted from an
//! event against its [`Keyword`]:
//!
//! | Match type      | Passes when                                  |
//! |-----------------|----------------------------------------------|
//! | `Equals`        | text equals the keyword source text          |
//! | `Contains`      | text contains the keyword source text        |
//! | `StartsWith`    | text starts with the keyword source text     |
//! | `EndsWith`      | text ends with the keyword source text       |
//! | `RegexMatches`  | the keyword regex matches the *whole* text   |
//! | `RegexFind`     | the keyword regex matches *somewhere* in it  |
//!
//! The four string variants compare against the keyword's source text as
//! written, so placeholders are not expanded there. A case-insensitive
//! keyword folds both sides before comparing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::keyword::Keyword;

/// How a filter compares event text with its keyword.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Text equals the keyword source text.
    Equals,
    /// Text contains the keyword source text.
    Contains,
    /// Text starts with the keyword source text.
    StartsWith,
    /// Text ends with the keyword source text.
    EndsWith,
    /// The keyword regex matches the entire text.
    #[default]
    RegexMatches,
    /// The keyword regex matches a substring of the text.
    RegexFind,
}

impl MatchType {
    /// Returns `true` if `text` matches `keyword` under this strategy.
    pub fn matches(self, text: &str, keyword: &Keyword) -> bool {
        match self {
            Self::Equals => keyword.fold(text) == keyword.comparable_text(),
            Self::Contains => keyword.fold(text).contains(keyword.comparable_text()),
            Self::StartsWith => keyword.fold(text).starts_with(keyword.comparable_text()),
            Self::EndsWith => keyword.fold(text).ends_with(keyword.comparable_text()),
            Self::RegexMatches => keyword.full_regex().is_match(text),
            Self::RegexFind => keyword.regex().is_match(text),
        }
    }

    /// Returns the configuration name of this match type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::RegexMatches => "regex_matches",
            Self::RegexFind => "regex_find",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "equals" => Ok(Self::Equals),
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            "regex_matches" => Ok(Self::RegexMatches),
            "regex_find" => Ok(Self::RegexFind),
            other => Err(format!("unknown match type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(text: &str) -> Keyword {
        Keyword::new(text).unwrap()
    }

    #[test]
    fn test_string_match_types() {
        let keyword = kw("ping");
        assert!(MatchType::Equals.matches("ping", &keyword));
        assert!(!MatchType::Equals.matches("ping!", &keyword));
        assert!(MatchType::Contains.matches("say ping now", &keyword));
        assert!(MatchType::StartsWith.matches("ping me", &keyword));
        assert!(!MatchType::StartsWith.matches("a ping", &keyword));
        assert!(MatchType::EndsWith.matches("a ping", &keyword));
    }

    #[test]
    fn test_regex_matches_is_anchored() {
        let keyword = kw(r"\d+");
        assert!(MatchType::RegexMatches.matches("12345", &keyword));
        assert!(!MatchType::RegexMatches.matches("abc123", &keyword));
        assert!(MatchType::RegexFind.matches("abc123", &keyword));
    }

    #[test]
    fn test_alternation_is_fully_anchored() {
        let keyword = kw("a|b");
        assert!(MatchType::RegexMatches.matches("b", &keyword));
        assert!(!MatchType::RegexMatches.matches("ab", &keyword));
    }

    #[test]
    fn test_string_types_use_source_text() {
        let keyword = kw("ban {{target}}");
        assert!(MatchType::Equals.matches("ban {{target}}", &keyword));
        assert!(!MatchType::Equals.matches("ban bob", &keyword));
        assert!(MatchType::RegexMatches.matches("ban bob", &keyword));
    }

    #[test]
    fn test_case_insensitive_string_match() {
        let keyword = Keyword::builder("Ping").case_sensitive(false).build().unwrap();
        assert!(MatchType::Equals.matches("PING", &keyword));
        assert!(MatchType::Contains.matches("well, pInG", &keyword));
        assert!(MatchType::RegexMatches.matches("pInG", &keyword));
    }

    #[test]
    fn test_serde_names() {
        let parsed: MatchType = serde_json::from_str("\"regex_find\"").unwrap();
        assert_eq!(parsed, MatchType::RegexFind);
        assert_eq!("starts-with".parse::<MatchType>(), Ok(MatchType::StartsWith));
        assert_eq!(MatchType::default(), MatchType::RegexMatches);
        assert!("fuzzy".parse::<MatchType>().is_err());
    }
}
