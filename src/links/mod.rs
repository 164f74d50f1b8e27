//! Wikilink extraction, resolution and graph queries.
//!
//! [`LinkTraversalService`] reads documents through a [`StorageBackend`],
//! builds a [`LinkGraphIndex`] on demand and answers backlink, forward-link,
//! path and metrics queries. Backlinks fall back to a full corpus scan when
//! no index covers the target.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::corpus::{TitleIndex, title_from_id};
use crate::graph::{LinkGraphIndex, LinkMetrics, LinkPath};
use crate::storage::{StorageBackend, StorageError};
use crate::wikilink::{WikiLink, WikiLinkReference};

/// Characters of surrounding text kept on each side of a link.
const CONTEXT_CHARS: usize = 50;

const ELLIPSIS: &str = "...";

#[expect(clippy::expect_used)]
static WIKILINK_OCCURRENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[[^\[\]]*\]\]").expect("hardcoded regex pattern is valid"));

/// Errors that can occur while traversing links.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A document that links to the queried target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BacklinkResult {
    pub source_document: String,
    pub source_title: String,
    pub target_document: String,
    /// The link as written, e.g. `[[Target|caption]]`.
    pub wikilink: String,
    pub line_number: usize,
    pub context_snippet: String,
}

/// A link found in the queried source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardLinkResult {
    pub source_document: String,
    /// The link as written, e.g. `[[Target|caption]]`.
    pub wikilink: String,
    pub target_title: String,
    /// `None` when no document matches the link title.
    pub resolved_target: Option<String>,
    pub line_number: usize,
    pub context_snippet: String,
}

/// Find every wikilink in `content`.
///
/// Malformed occurrences are logged and skipped; they never abort the scan.
#[must_use]
pub fn extract_wikilinks_from_content(content: &str, source: &str) -> Vec<WikiLinkReference> {
    let mut references = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        for occurrence in WIKILINK_OCCURRENCE.find_iter(line) {
            match WikiLink::parse(occurrence.as_str()) {
                Ok(wikilink) => references.push(WikiLinkReference {
                    wikilink,
                    line_number,
                    context_snippet: context_snippet(line, occurrence.start(), occurrence.end()),
                    source_document: source.to_string(),
                }),
                Err(e) => {
                    warn!(source, line = line_number, error = %e, "Skipping malformed wikilink");
                }
            }
        }
    }

    references
}

/// Text around `line[start..end]`, at most [`CONTEXT_CHARS`] characters on
/// each side, trimmed, with an ellipsis where the line was cut.
fn context_snippet(line: &str, start: usize, end: usize) -> String {
    let snippet_start = line[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map_or(0, |(i, _)| i);
    let snippet_end = line[end..]
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map_or(line.len(), |(i, _)| end + i);

    let mut snippet = String::new();
    if snippet_start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.push_str(line[snippet_start..snippet_end].trim());
    if snippet_end < line.len() {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}

/// Link graph queries over a document source.
pub struct LinkTraversalService {
    storage: Arc<dyn StorageBackend>,
    index: Option<LinkGraphIndex>,
}

impl LinkTraversalService {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            index: None,
        }
    }

    /// The last built index, if any.
    #[must_use]
    pub fn index(&self) -> Option<&LinkGraphIndex> {
        self.index.as_ref()
    }

    /// Extract wikilinks from a stored document.
    ///
    /// A missing document yields no references rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Storage` if the document exists but cannot be read.
    pub fn extract_wikilinks_from_document(
        &self,
        id: &str,
    ) -> Result<Vec<WikiLinkReference>, LinkError> {
        if !self.storage.exists(id) {
            debug!(document = id, "Document not found, no links to extract");
            return Ok(Vec::new());
        }

        let (_, content) = self.storage.read_document(id)?;
        Ok(extract_wikilinks_from_content(&content, id))
    }

    /// Find every reference to `target` from other documents.
    ///
    /// Uses the built index when it knows `target`, otherwise scans the whole
    /// corpus. A document linking twice to `target` yields two results.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Storage` if the corpus cannot be enumerated or a
    /// document cannot be read during the fallback scan.
    pub fn find_backlinks(&self, target: &str) -> Result<Vec<BacklinkResult>, LinkError> {
        if let Some(index) = &self.index
            && index.contains(target)
        {
            let mut results = Vec::new();
            for source in index.get_backward_links(target) {
                let matching = index
                    .references(&source)
                    .iter()
                    .filter(|r| {
                        index.resolved_target(&source, &r.wikilink.title) == Some(target)
                    });
                results.extend(matching.map(|r| backlink(r, target)));
            }
            return Ok(results);
        }

        debug!(document = target, "No index entry, scanning corpus for backlinks");
        let titles = self.storage.title_index()?;
        let mut results = Vec::new();
        for source in self.storage.list_documents()? {
            for reference in self.extract_wikilinks_from_document(&source)? {
                if titles.resolve(&reference.wikilink.title) == Some(target) {
                    results.push(backlink(&reference, target));
                }
            }
        }
        Ok(results)
    }

    /// List every link in `source`, resolved where possible.
    ///
    /// Broken links are returned with `resolved_target: None`.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Storage` if the document cannot be read or the
    /// corpus cannot be enumerated for resolution.
    pub fn find_forward_links(&self, source: &str) -> Result<Vec<ForwardLinkResult>, LinkError> {
        let references = self.extract_wikilinks_from_document(source)?;
        if references.is_empty() {
            return Ok(Vec::new());
        }

        let titles = self.storage.title_index()?;
        let results = references
            .into_iter()
            .map(|reference| {
                let resolved_target = titles.resolve(&reference.wikilink.title).map(str::to_string);
                if resolved_target.is_none() {
                    debug!(source, title = %reference.wikilink.title, "Broken link");
                }
                ForwardLinkResult {
                    source_document: reference.source_document,
                    wikilink: reference.wikilink.to_string(),
                    target_title: reference.wikilink.title,
                    resolved_target,
                    line_number: reference.line_number,
                    context_snippet: reference.context_snippet,
                }
            })
            .collect();
        Ok(results)
    }

    /// Titles in `source` that resolve to no document, building the index if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Storage` if the index has to be built and fails.
    pub fn get_broken_links(&mut self, source: &str) -> Result<BTreeSet<String>, LinkError> {
        Ok(self.ensure_index()?.get_broken_links(source))
    }

    /// Rebuild the link graph from every document in the corpus.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Storage` if the corpus cannot be enumerated or a
    /// document cannot be read. The previous index is kept in that case.
    pub fn build_link_index(&mut self) -> Result<&LinkGraphIndex, LinkError> {
        let index = self.scan_corpus()?;
        Ok(self.index.insert(index))
    }

    fn scan_corpus(&self) -> Result<LinkGraphIndex, LinkError> {
        let documents = self.storage.list_documents()?;
        let titles = TitleIndex::build(&documents);
        debug!(documents = documents.len(), titles = titles.len(), "Scanning corpus for links");
        let mut index = LinkGraphIndex::new();
        let mut reference_count = 0;

        for id in &documents {
            let references = self.extract_wikilinks_from_document(id)?;
            reference_count += references.len();

            let mut resolution: HashMap<String, Option<String>> = HashMap::new();
            for reference in &references {
                let title = &reference.wikilink.title;
                if !resolution.contains_key(title) {
                    let resolved = titles.resolve(title).map(str::to_string);
                    if resolved.is_none() {
                        debug!(source = %id, title = %title, "Broken link");
                    }
                    resolution.insert(title.clone(), resolved);
                }
            }

            index.add_document_links(id, references, &resolution);
        }

        index.mark_built(Utc::now());
        info!(
            documents = documents.len(),
            references = reference_count,
            "Built link index"
        );
        Ok(index)
    }

    fn ensure_index(&mut self) -> Result<&LinkGraphIndex, LinkError> {
        if self.index.is_none() {
            let index = self.scan_corpus()?;
            self.index = Some(index);
        }
        Ok(self.index.get_or_insert_with(LinkGraphIndex::new))
    }

    /// Shortest forward path from `from` to `to`, building the index if needed.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Storage` if the index has to be built and fails.
    pub fn find_link_path(
        &mut self,
        from: &str,
        to: &str,
        max_hops: usize,
    ) -> Result<Option<LinkPath>, LinkError> {
        Ok(self.ensure_index()?.find_path(from, to, max_hops))
    }

    /// Aggregate link statistics, building the index if needed.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Storage` if the index has to be built and fails.
    pub fn get_link_metrics(&mut self, hub_count: usize) -> Result<LinkMetrics, LinkError> {
        Ok(self.ensure_index()?.metrics(hub_count))
    }
}

fn backlink(reference: &WikiLinkReference, target: &str) -> BacklinkResult {
    BacklinkResult {
        source_document: reference.source_document.clone(),
        source_title: title_from_id(&reference.source_document),
        target_document: target.to_string(),
        wikilink: reference.wikilink.to_string(),
        line_number: reference.line_number,
        context_snippet: reference.context_snippet.clone(),
    }
}
