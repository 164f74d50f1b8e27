//! Wikilink syntax: `[[Title]]` and `[[Title|Caption]]`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

#[expect(clippy::expect_used)]
static WIKILINK_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\[([^\[\]|]*)(?:\|([^\[\]]*))?\]\]").expect("hardcoded regex pattern is valid")
});

/// Returned when text does not start with a well-formed wikilink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Not a wikilink: {0:?}")]
    NotAWikiLink(String),

    #[error("Wikilink has an empty title: {0:?}")]
    EmptyTitle(String),
}

/// A parsed cross-reference to another document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WikiLink {
    pub title: String,
    pub caption: Option<String>,
}

impl WikiLink {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            caption: None,
        }
    }

    #[must_use]
    pub fn with_caption(title: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            caption: Some(caption.into()),
        }
    }

    /// Parse the wikilink at the start of `text`.
    ///
    /// Anything after the closing `]]` is ignored. Title and caption are
    /// trimmed; a caption that trims to nothing is dropped.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` if `text` does not begin with `[[...]]` or the
    /// title is blank.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let captures = WIKILINK_PREFIX
            .captures(text)
            .ok_or_else(|| FormatError::NotAWikiLink(text.to_string()))?;

        let title = captures.get(1).map_or("", |m| m.as_str()).trim();
        if title.is_empty() {
            return Err(FormatError::EmptyTitle(text.to_string()));
        }

        let caption = captures
            .get(2)
            .map(|m| m.as_str().trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(Self {
            title: title.to_string(),
            caption,
        })
    }
}

impl FromStr for WikiLink {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for WikiLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.caption {
            Some(caption) => write!(f, "[[{}|{}]]", self.title, caption),
            None => write!(f, "[[{}]]", self.title),
        }
    }
}

/// One occurrence of a wikilink inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WikiLinkReference {
    pub wikilink: WikiLink,
    /// 1-based line number of the occurrence.
    pub line_number: usize,
    /// Surrounding text for display, with `...` marking truncation.
    pub context_snippet: String,
    /// Document ID of the document containing the link.
    pub source_document: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn plain_title() {
            assert_eq!(WikiLink::parse("[[Rust]]").unwrap(), WikiLink::new("Rust"));
        }

        #[test]
        fn title_with_caption() {
            assert_eq!(
                WikiLink::parse("[[Error Handling|errors]]").unwrap(),
                WikiLink::with_caption("Error Handling", "errors")
            );
        }

        #[test]
        fn trims_whitespace() {
            assert_eq!(
                WikiLink::parse("[[  Lambda Patterns  |  aws  ]]").unwrap(),
                WikiLink::with_caption("Lambda Patterns", "aws")
            );
        }

        #[test]
        fn blank_caption_is_dropped() {
            assert_eq!(WikiLink::parse("[[Rust| ]]").unwrap(), WikiLink::new("Rust"));
        }

        #[test]
        fn ignores_trailing_text() {
            assert_eq!(
                WikiLink::parse("[[Rust]] and more").unwrap(),
                WikiLink::new("Rust")
            );
        }

        #[test]
        fn rejects_missing_brackets() {
            assert!(matches!(
                WikiLink::parse("[[Rust"),
                Err(FormatError::NotAWikiLink(_))
            ));
            assert!(WikiLink::parse("Rust]]").is_err());
        }

        #[test]
        fn rejects_link_not_at_start() {
            assert!(WikiLink::parse("see [[Rust]]").is_err());
        }

        #[test]
        fn rejects_empty_title() {
            assert!(matches!(
                WikiLink::parse("[[   ]]"),
                Err(FormatError::EmptyTitle(_))
            ));
            assert!(WikiLink::parse("[[|caption]]").is_err());
        }

        #[test]
        fn from_str_matches_parse() {
            let link: WikiLink = "[[Notes|n]]".parse().unwrap();
            assert_eq!(link, WikiLink::with_caption("Notes", "n"));
        }
    }

    mod display_tests {
        use super::*;

        #[test]
        fn renders_plain_and_captioned() {
            assert_eq!(WikiLink::new("Rust").to_string(), "[[Rust]]");
            assert_eq!(
                WikiLink::with_caption("Rust", "the language").to_string(),
                "[[Rust|the language]]"
            );
        }

        #[test]
        fn parse_inverts_display() {
            for link in [
                WikiLink::new("Daily Note 2024-01-01"),
                WikiLink::with_caption("@Alice", "Alice"),
                WikiLink::with_caption("!Inbox", "in box"),
            ] {
                assert_eq!(WikiLink::parse(&link.to_string()).unwrap(), link);
            }
        }
    }
}
