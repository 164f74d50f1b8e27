//! Document identity and title resolution within a corpus.
//!
//! A document is identified by its path relative to the corpus root, always
//! rendered with `/` separators. The same string keys graph nodes and
//! vector-store records.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Prefixes that mark a document as a person, inbox item, etc. They are not
/// part of the document's title.
const TITLE_PREFIXES: [char; 2] = ['@', '!'];

/// Metadata returned alongside a document's content.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMetadata {
    /// Path relative to the corpus root (e.g., "people/@Alice.md").
    pub id: String,
    /// Title derived from the file name.
    pub title: String,
    /// Absolute path on disk.
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Build a document ID from a path relative to the corpus root.
///
/// Returns `None` if the path is absolute or contains `..`.
#[must_use]
pub fn document_id(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Derive a document's title: file name without extension and without a
/// leading `@` or `!`.
#[must_use]
pub fn title_from_id(id: &str) -> String {
    let stem = Path::new(id)
        .file_stem()
        .map_or_else(|| id.to_string(), |s| s.to_string_lossy().into_owned());

    match stem.strip_prefix(TITLE_PREFIXES) {
        Some(rest) => rest.to_string(),
        None => stem,
    }
}

/// Every link title that names `id`: its file name, its file stem and its
/// derived title.
#[must_use]
pub fn title_keys(id: &str) -> [String; 3] {
    let path = Path::new(id);
    let file_name = path
        .file_name()
        .map_or_else(|| id.to_string(), |n| n.to_string_lossy().into_owned());
    let stem = path
        .file_stem()
        .map_or_else(|| file_name.clone(), |s| s.to_string_lossy().into_owned());
    [file_name, stem, title_from_id(id)]
}

/// Lookup table from link titles to document IDs.
///
/// A title matches a document whose file name equals the title, whose file
/// name equals the title plus the document extension, or whose derived title
/// equals the title. When several documents match, the first one inserted
/// wins, so callers should build the table from a sorted listing.
#[derive(Debug, Default, Clone)]
pub struct TitleIndex {
    by_key: HashMap<String, String>,
}

impl TitleIndex {
    #[must_use]
    pub fn build<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::default();
        for id in ids {
            index.insert(id.as_ref());
        }
        index
    }

    fn insert(&mut self, id: &str) {
        for key in title_keys(id) {
            self.by_key.entry(key).or_insert_with(|| id.to_string());
        }
    }

    /// Resolve a link title, accepting it with or without the extension.
    #[must_use]
    pub fn resolve(&self, title: &str) -> Option<&str> {
        self.by_key.get(title.trim()).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod title_tests {
        use super::*;

        #[test]
        fn strips_extension() {
            assert_eq!(title_from_id("rust/error-handling.md"), "error-handling");
        }

        #[test]
        fn strips_identifier_prefixes() {
            assert_eq!(title_from_id("people/@Alice.md"), "Alice");
            assert_eq!(title_from_id("!Inbox.md"), "Inbox");
        }

        #[test]
        fn strips_only_one_prefix() {
            assert_eq!(title_from_id("@@double.md"), "@double");
        }

        #[test]
        fn keeps_inner_dots() {
            assert_eq!(title_from_id("notes/v1.2 release.md"), "v1.2 release");
        }
    }

    mod document_id_tests {
        use super::*;

        #[test]
        fn joins_components_with_slash() {
            let id = document_id(&PathBuf::from("a").join("b").join("c.md"));
            assert_eq!(id.as_deref(), Some("a/b/c.md"));
        }

        #[test]
        fn rejects_parent_components() {
            assert!(document_id(Path::new("../escape.md")).is_none());
        }

        #[test]
        fn rejects_empty() {
            assert!(document_id(Path::new("")).is_none());
        }
    }

    mod title_index_tests {
        use super::*;

        #[test]
        fn resolves_with_and_without_extension() {
            let index = TitleIndex::build(["rust/Ownership.md"]);
            assert_eq!(index.resolve("Ownership"), Some("rust/Ownership.md"));
            assert_eq!(index.resolve("Ownership.md"), Some("rust/Ownership.md"));
            assert_eq!(index.resolve("Borrowing"), None);
        }

        #[test]
        fn resolves_prefixed_documents_by_title() {
            let index = TitleIndex::build(["people/@Alice.md"]);
            assert_eq!(index.resolve("@Alice"), Some("people/@Alice.md"));
            assert_eq!(index.resolve("Alice"), Some("people/@Alice.md"));
        }

        #[test]
        fn title_keys_cover_file_name_stem_and_title() {
            assert_eq!(
                title_keys("people/@Alice.md"),
                ["@Alice.md".to_string(), "@Alice".to_string(), "Alice".to_string()]
            );
        }

        #[test]
        fn first_match_wins() {
            let index = TitleIndex::build(["a/Notes.md", "b/Notes.md"]);
            assert_eq!(index.resolve("Notes"), Some("a/Notes.md"));
        }
    }
}
