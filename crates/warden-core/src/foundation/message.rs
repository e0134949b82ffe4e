//! Platform-agnostic message segments.
//!
//! Adapters convert their native message representation into a sequence of
//! [`RichTextSegment`]s. The dispatch pipeline only reads two things from
//! them: the concatenated plain text and the mention targets.

/// A single, platform-agnostic piece of message content.
///
/// # Variants
///
/// - `Text`: Plain text content
/// - `Image`: An image, identified by a platform-specific reference string
/// - `At`: A user mention, identified by a user ID string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RichTextSegment {
    /// Plain text content.
    Text(String),
    /// An image segment. The string is a platform-specific reference
    /// (file path, URL, base64, etc.).
    Image(String),
    /// A user mention. The string is the user identifier.
    At(String),
}

impl RichTextSegment {
    /// Creates a text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates a mention segment.
    pub fn at(user_id: impl Into<String>) -> Self {
        Self::At(user_id.into())
    }

    /// Returns the text content if this is a text segment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the mentioned user ID if this is a mention segment.
    pub fn mentioned_id(&self) -> Option<&str> {
        match self {
            Self::At(id) => Some(id),
            _ => None,
        }
    }

    /// Concatenates the text content of all text segments, ignoring images
    /// and mentions.
    pub fn extract_plain_text(segments: &[RichTextSegment]) -> String {
        segments.iter().filter_map(RichTextSegment::as_text).collect()
    }
}

impl From<&str> for RichTextSegment {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for RichTextSegment {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}
