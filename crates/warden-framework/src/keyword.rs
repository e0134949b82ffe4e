//! Compiled keyword patterns with named captures.
//!
//! A [`Keyword`] is built once, when a listener is registered, and then
//! reused for every event. It serves two purposes:
//!
//! - **Matching**: [`MatchType`](crate::matcher::MatchType) compares event
//!   text against the keyword's source text or its compiled regex.
//! - **Extraction**: [`Keyword::get_param`] pulls named captures out of the
//!   event text so they can be bound to handler parameters.
//!
//! # Placeholders
//!
//! Keyword text may contain named placeholders:
//!
//! - `{{name}}` captures `.+` into the group `name`
//! - `{{name,regex}}` captures `regex` into the group `name`
//!
//! ```rust,ignore
//! let keyword = Keyword::new("ban {{target}}")?;
//! assert_eq!(keyword.get_param("ban user42", "target").as_deref(), Some("user42"));
//!
//! let keyword = Keyword::new(r"roll {{count,\d+}}d{{sides,\d+}}")?;
//! assert_eq!(keyword.get_param("roll 2d6", "sides").as_deref(), Some("6"));
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::{KeywordError, KeywordResult};

const PLACEHOLDER_OPEN: &str = "{{";
const PLACEHOLDER_CLOSE: &str = "}}";
const DEFAULT_CAPTURE: &str = ".+";

struct KeywordInner {
    text: String,
    /// Lower-cased `text`, only for case-insensitive keywords.
    folded: Option<String>,
    find: Regex,
    full: Regex,
    params: Vec<String>,
}

/// An immutable compiled pattern with named-capture extraction.
///
/// Cloning is cheap; all clones share the compiled regexes.
#[derive(Clone)]
pub struct Keyword {
    inner: Arc<KeywordInner>,
}

impl Keyword {
    /// Compiles a case-sensitive keyword whose non-placeholder text is
    /// regex source.
    pub fn new(text: impl Into<String>) -> KeywordResult<Self> {
        Self::builder(text).build()
    }

    /// Compiles a case-sensitive keyword whose non-placeholder text is
    /// matched literally.
    pub fn literal(text: impl Into<String>) -> KeywordResult<Self> {
        Self::builder(text).literal(true).build()
    }

    /// Starts building a keyword with non-default options.
    pub fn builder(text: impl Into<String>) -> KeywordBuilder {
        KeywordBuilder {
            text: text.into(),
            case_sensitive: true,
            literal: false,
        }
    }

    /// Returns the keyword's source text.
    pub fn text(&self) -> &str {
        &self.inner.text
    }

    /// Returns `true` unless the keyword was built case-insensitive.
    pub fn is_case_sensitive(&self) -> bool {
        self.inner.folded.is_none()
    }

    /// Returns the placeholder names declared in this keyword, in order.
    pub fn params(&self) -> &[String] {
        &self.inner.params
    }

    /// Returns the find-style regex.
    pub fn regex(&self) -> &Regex {
        &self.inner.find
    }

    /// Returns the regex anchored to the whole input.
    pub fn full_regex(&self) -> &Regex {
        &self.inner.full
    }

    /// Returns the source text as compared by the string match types.
    pub(crate) fn comparable_text(&self) -> &str {
        self.inner.folded.as_deref().unwrap_or(&self.inner.text)
    }

    /// Folds `candidate` the same way the keyword's own text was folded.
    pub(crate) fn fold<'a>(&self, candidate: &'a str) -> Cow<'a, str> {
        if self.is_case_sensitive() {
            Cow::Borrowed(candidate)
        } else {
            Cow::Owned(candidate.to_lowercase())
        }
    }

    /// Extracts the substring captured by group `name` from `text`.
    ///
    /// Runs a find-style match. Returns `None` if the pattern does not match
    /// `text` at all, or if the group did not participate in the match.
    pub fn get_param(&self, text: &str, name: &str) -> Option<String> {
        self.inner
            .find
            .captures(text)?
            .name(name)
            .map(|m| m.as_str().to_string())
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyword")
            .field("text", &self.inner.text)
            .field("case_sensitive", &self.is_case_sensitive())
            .field("params", &self.inner.params)
            .finish()
    }
}

impl PartialEq for Keyword {
    fn eq(&self, other: &Self) -> bool {
        self.inner.text == other.inner.text
            && self.is_case_sensitive() == other.is_case_sensitive()
            && self.inner.find.as_str() == other.inner.find.as_str()
    }
}

/// Builder for [`Keyword`].
#[derive(Debug, Clone)]
pub struct KeywordBuilder {
    text: String,
    case_sensitive: bool,
    literal: bool,
}

impl KeywordBuilder {
    /// Sets case sensitivity (default: `true`).
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Treats non-placeholder text literally instead of as regex source.
    pub fn literal(mut self, literal: bool) -> Self {
        self.literal = literal;
        self
    }

    /// Compiles the keyword.
    pub fn build(self) -> KeywordResult<Keyword> {
        let (body, params) = translate(&self.text, self.literal)?;
        let flags = if self.case_sensitive { "" } else { "(?i)" };

        let compile = |source: String| {
            Regex::new(&source).map_err(|source| KeywordError::InvalidPattern {
                text: self.text.clone(),
                source,
            })
        };
        let find = compile(format!("{flags}{body}"))?;
        let full = compile(format!(r"{flags}\A(?:{body})\z"))?;

        let folded = (!self.case_sensitive).then(|| self.text.to_lowercase());

        Ok(Keyword {
            inner: Arc::new(KeywordInner {
                text: self.text,
                folded,
                find,
                full,
                params,
            }),
        })
    }
}

/// Rewrites placeholders into named groups and returns the regex body plus
/// the declared parameter names.
fn translate(text: &str, literal: bool) -> KeywordResult<(String, Vec<String>)> {
    let mut body = String::with_capacity(text.len() + 16);
    let mut params = Vec::new();
    let mut rest = text;

    let push_plain = |body: &mut String, plain: &str| {
        if literal {
            body.push_str(&regex::escape(plain));
        } else {
            body.push_str(plain);
        }
    };

    while let Some(open) = rest.find(PLACEHOLDER_OPEN) {
        push_plain(&mut body, &rest[..open]);
        let after_open = &rest[open + PLACEHOLDER_OPEN.len()..];
        let Some(close) = find_close(after_open) else {
            return Err(KeywordError::UnclosedPlaceholder {
                text: text.to_string(),
            });
        };

        let placeholder = &after_open[..close];
        let (name, capture) = match placeholder.split_once(',') {
            Some((name, capture)) => (name.trim(), capture),
            None => (placeholder.trim(), DEFAULT_CAPTURE),
        };
        if !is_valid_group_name(name) {
            return Err(KeywordError::InvalidParamName {
                name: name.to_string(),
                text: text.to_string(),
            });
        }

        body.push_str(&format!("(?P<{name}>{capture})"));
        params.push(name.to_string());
        rest = &after_open[close + PLACEHOLDER_CLOSE.len()..];
    }
    push_plain(&mut body, rest);

    Ok((body, params))
}

/// Finds the `}}` that closes a placeholder, skipping braces that belong to
/// the capture regex (`\d{1,2}`) and escaped braces.
fn find_close(placeholder: &str) -> Option<usize> {
    let bytes = placeholder.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' if depth > 0 => depth -= 1,
            b'}' if bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn is_valid_group_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
