//! In-memory wikilink graph: forward, backward and broken links.
//!
//! The index is rebuilt wholesale by the link traversal service. Adjacency is
//! kept in ordered sets so traversal order, and therefore which of several
//! equally short paths is returned, is the same on every run.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::wikilink::WikiLinkReference;

/// A shortest chain of links between two documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkPath {
    pub from: String,
    pub to: String,
    /// Documents visited, `from` first and `to` last.
    pub path: Vec<String>,
    pub hops: usize,
}

/// Aggregate statistics over the whole graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkMetrics {
    pub total_documents: usize,
    pub total_links: usize,
    pub total_broken_links: usize,
    /// Documents with no incoming links.
    pub orphaned_documents: Vec<String>,
    /// Most-linked-to documents with their incoming link counts.
    pub hub_documents: Vec<(String, usize)>,
    pub average_links_per_document: f64,
    pub link_density: f64,
}

#[derive(Debug, Default, Clone)]
pub struct LinkGraphIndex {
    documents: BTreeSet<String>,
    forward_links: BTreeMap<String, BTreeSet<String>>,
    backward_links: BTreeMap<String, BTreeSet<String>>,
    broken_links: BTreeMap<String, BTreeSet<String>>,
    /// Per source document, the document each resolved link title points at.
    resolved_titles: HashMap<String, HashMap<String, String>>,
    wikilink_references: HashMap<String, Vec<WikiLinkReference>>,
    last_built: Option<DateTime<Utc>>,
}

impl LinkGraphIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything known about `doc`'s outgoing links.
    ///
    /// `resolution` maps each link title to the document it resolves to, or
    /// `None` for a broken link. Titles missing from the map count as broken.
    /// If the same title appears twice the last entry wins.
    pub fn add_document_links(
        &mut self,
        doc: &str,
        references: Vec<WikiLinkReference>,
        resolution: &HashMap<String, Option<String>>,
    ) {
        self.remove_outgoing(doc);
        self.documents.insert(doc.to_string());

        let mut forward = BTreeSet::new();
        let mut broken = BTreeSet::new();
        let mut resolved = HashMap::new();

        for reference in &references {
            let title = &reference.wikilink.title;
            match resolution.get(title).cloned().flatten() {
                Some(target) => {
                    self.backward_links
                        .entry(target.clone())
                        .or_default()
                        .insert(doc.to_string());
                    self.documents.insert(target.clone());
                    resolved.insert(title.clone(), target.clone());
                    forward.insert(target);
                }
                None => {
                    broken.insert(title.clone());
                }
            }
        }

        self.forward_links.insert(doc.to_string(), forward);
        if !broken.is_empty() {
            self.broken_links.insert(doc.to_string(), broken);
        }
        self.resolved_titles.insert(doc.to_string(), resolved);
        self.wikilink_references.insert(doc.to_string(), references);
    }

    fn remove_outgoing(&mut self, doc: &str) {
        if let Some(targets) = self.forward_links.remove(doc) {
            for target in targets {
                if let Some(sources) = self.backward_links.get_mut(&target) {
                    sources.remove(doc);
                    if sources.is_empty() {
                        self.backward_links.remove(&target);
                    }
                }
            }
        }
        self.broken_links.remove(doc);
        self.resolved_titles.remove(doc);
    }

    /// Breadth-first search for the shortest forward path of at most
    /// `max_hops` links.
    #[must_use]
    pub fn find_path(&self, from: &str, to: &str, max_hops: usize) -> Option<LinkPath> {
        if from == to {
            return Some(LinkPath {
                from: from.to_string(),
                to: to.to_string(),
                path: vec![from.to_string()],
                hops: 0,
            });
        }

        let mut parents: HashMap<&str, &str> = HashMap::new();
        let mut frontier: Vec<&str> = vec![from];

        for _ in 0..max_hops {
            let mut next = Vec::new();
            for &current in &frontier {
                let Some(targets) = self.forward_links.get(current) else {
                    continue;
                };
                for target in targets {
                    let target = target.as_str();
                    if target == from || parents.contains_key(target) {
                        continue;
                    }
                    parents.insert(target, current);
                    if target == to {
                        return Some(Self::trace_path(&parents, from, to));
                    }
                    next.push(target);
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        None
    }

    fn trace_path(parents: &HashMap<&str, &str>, from: &str, to: &str) -> LinkPath {
        let mut path = vec![to.to_string()];
        let mut current = to;
        while current != from {
            let Some(&parent) = parents.get(current) else {
                break;
            };
            path.push(parent.to_string());
            current = parent;
        }
        path.reverse();

        LinkPath {
            from: from.to_string(),
            to: to.to_string(),
            hops: path.len() - 1,
            path,
        }
    }

    #[must_use]
    pub fn get_forward_links(&self, doc: &str) -> BTreeSet<String> {
        self.forward_links.get(doc).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn get_backward_links(&self, doc: &str) -> BTreeSet<String> {
        self.backward_links.get(doc).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn get_broken_links(&self, doc: &str) -> BTreeSet<String> {
        self.broken_links.get(doc).cloned().unwrap_or_default()
    }

    /// Cached references extracted from `doc` when the index was built.
    #[must_use]
    pub fn references(&self, doc: &str) -> &[WikiLinkReference] {
        self.wikilink_references
            .get(doc)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Document that `title`, as written in `doc`, resolved to when the
    /// index was built. `None` for broken links and unknown sources.
    #[must_use]
    pub fn resolved_target(&self, doc: &str, title: &str) -> Option<&str> {
        self.resolved_titles
            .get(doc)
            .and_then(|titles| titles.get(title))
            .map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, doc: &str) -> bool {
        self.documents.contains(doc)
    }

    #[must_use]
    pub fn last_built(&self) -> Option<DateTime<Utc>> {
        self.last_built
    }

    pub fn mark_built(&mut self, at: DateTime<Utc>) {
        self.last_built = Some(at);
    }

    #[must_use]
    pub fn metrics(&self, hub_count: usize) -> LinkMetrics {
        let total_documents = self.documents.len();
        let total_links: usize = self.forward_links.values().map(BTreeSet::len).sum();
        let total_broken_links: usize = self.broken_links.values().map(BTreeSet::len).sum();

        let orphaned_documents = self
            .documents
            .iter()
            .filter(|doc| self.backward_links.get(*doc).is_none_or(BTreeSet::is_empty))
            .cloned()
            .collect();

        let mut hub_documents: Vec<(String, usize)> = self
            .backward_links
            .iter()
            .filter(|(_, sources)| !sources.is_empty())
            .map(|(doc, sources)| (doc.clone(), sources.len()))
            .collect();
        // Stable sort keeps lexicographic order among equal counts.
        hub_documents.sort_by(|a, b| b.1.cmp(&a.1));
        hub_documents.truncate(hub_count);

        #[expect(clippy::cast_precision_loss)]
        let (average_links_per_document, link_density) = {
            let n = total_documents as f64;
            let links = total_links as f64;
            let average = if total_documents == 0 { 0.0 } else { links / n };
            let density = if total_documents > 1 {
                links / (n * (n - 1.0))
            } else {
                0.0
            };
            (average, density)
        };

        LinkMetrics {
            total_documents,
            total_links,
            total_broken_links,
            orphaned_documents,
            hub_documents,
            average_links_per_document,
            link_density,
        }
    }

    /// Verify that forward and backward links mirror each other.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let forward_ok = self.forward_links.iter().all(|(source, targets)| {
            targets
                .iter()
                .all(|t| self.backward_links.get(t).is_some_and(|s| s.contains(source)))
        });
        let backward_ok = self.backward_links.iter().all(|(target, sources)| {
            sources
                .iter()
                .all(|s| self.forward_links.get(s).is_some_and(|t| t.contains(target)))
        });
        forward_ok && backward_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wikilink::WikiLink;

    fn reference(source: &str, title: &str, line: usize) -> WikiLinkReference {
        WikiLinkReference {
            wikilink: WikiLink::new(title),
            line_number: line,
            context_snippet: format!("[[{title}]]"),
            source_document: source.to_string(),
        }
    }

    /// Add `doc` linking to each of `targets`, where a target resolves to
    /// `<target>.md` unless it starts with `missing`.
    fn link(index: &mut LinkGraphIndex, doc: &str, targets: &[&str]) {
        let refs = targets
            .iter()
            .enumerate()
            .map(|(i, t)| reference(doc, t, i + 1))
            .collect();
        let resolution = targets
            .iter()
            .map(|t| {
                let resolved = (!t.starts_with("missing")).then(|| format!("{t}.md"));
                ((*t).to_string(), resolved)
            })
            .collect();
        index.add_document_links(doc, refs, &resolution);
    }

    fn chain() -> LinkGraphIndex {
        let mut index = LinkGraphIndex::new();
        link(&mut index, "A.md", &["B"]);
        link(&mut index, "B.md", &["C"]);
        link(&mut index, "C.md", &["D"]);
        link(&mut index, "D.md", &[]);
        index
    }

    mod add_document_links_tests {
        use super::*;

        #[test]
        fn records_forward_and_backward() {
            let mut index = LinkGraphIndex::new();
            link(&mut index, "A.md", &["B", "C"]);

            assert_eq!(index.get_forward_links("A.md").len(), 2);
            assert!(index.get_backward_links("B.md").contains("A.md"));
            assert!(index.get_backward_links("C.md").contains("A.md"));
            assert!(index.is_consistent());
        }

        #[test]
        fn records_broken_titles() {
            let mut index = LinkGraphIndex::new();
            link(&mut index, "A.md", &["B", "missing-note"]);

            assert_eq!(
                index.get_broken_links("A.md"),
                BTreeSet::from(["missing-note".to_string()])
            );
            assert_eq!(index.get_forward_links("A.md").len(), 1);
        }

        #[test]
        fn readding_removes_stale_edges() {
            let mut index = LinkGraphIndex::new();
            link(&mut index, "A.md", &["B", "missing-x"]);
            link(&mut index, "A.md", &["C"]);

            assert!(index.get_backward_links("B.md").is_empty());
            assert!(index.get_backward_links("C.md").contains("A.md"));
            assert!(index.get_broken_links("A.md").is_empty());
            assert!(index.is_consistent());
        }

        #[test]
        fn consistent_after_many_updates() {
            let mut index = LinkGraphIndex::new();
            link(&mut index, "A.md", &["B", "C"]);
            link(&mut index, "B.md", &["A", "C"]);
            link(&mut index, "C.md", &["A"]);
            link(&mut index, "A.md", &["C"]);
            link(&mut index, "B.md", &[]);
            link(&mut index, "C.md", &["B", "A"]);

            assert!(index.is_consistent());
            assert_eq!(
                index.get_backward_links("A.md"),
                BTreeSet::from(["C.md".to_string()])
            );
        }

        #[test]
        fn last_resolution_for_title_wins() {
            let mut index = LinkGraphIndex::new();
            let refs = vec![reference("A.md", "B", 1), reference("A.md", "B", 2)];
            let resolution = HashMap::from([("B".to_string(), Some("B.md".to_string()))]);
            index.add_document_links("A.md", refs, &resolution);

            assert_eq!(index.get_forward_links("A.md").len(), 1);
            assert_eq!(index.references("A.md").len(), 2);
        }

        #[test]
        fn remembers_where_each_title_resolved() {
            let mut index = LinkGraphIndex::new();
            let refs = vec![reference("j.md", "Alice", 1), reference("j.md", "@Alice", 2)];
            let resolution = HashMap::from([
                ("Alice".to_string(), Some("Alice.md".to_string())),
                ("@Alice".to_string(), Some("people/@Alice.md".to_string())),
            ]);
            index.add_document_links("j.md", refs, &resolution);

            assert_eq!(index.resolved_target("j.md", "Alice"), Some("Alice.md"));
            assert_eq!(index.resolved_target("j.md", "@Alice"), Some("people/@Alice.md"));

            link(&mut index, "j.md", &["missing-alice"]);
            assert_eq!(index.resolved_target("j.md", "Alice"), None);
            assert_eq!(index.resolved_target("j.md", "missing-alice"), None);
        }

        #[test]
        fn unknown_document_has_empty_sets() {
            let index = LinkGraphIndex::new();
            assert!(index.get_forward_links("nope.md").is_empty());
            assert!(index.get_backward_links("nope.md").is_empty());
            assert!(index.get_broken_links("nope.md").is_empty());
            assert!(index.references("nope.md").is_empty());
        }
    }

    mod find_path_tests {
        use super::*;

        #[test]
        fn finds_chain_within_hop_limit() {
            let path = chain().find_path("A.md", "D.md", 3).unwrap();
            assert_eq!(path.hops, 3);
            assert_eq!(path.path, vec!["A.md", "B.md", "C.md", "D.md"]);
        }

        #[test]
        fn respects_hop_limit() {
            assert!(chain().find_path("A.md", "D.md", 2).is_none());
        }

        #[test]
        fn same_document_is_zero_hops() {
            let path = chain().find_path("A.md", "A.md", 0).unwrap();
            assert_eq!(path.hops, 0);
            assert_eq!(path.path, vec!["A.md"]);
        }

        #[test]
        fn follows_forward_links_only() {
            assert!(chain().find_path("D.md", "A.md", 10).is_none());
        }

        #[test]
        fn prefers_shortest_path() {
            let mut index = chain();
            link(&mut index, "A.md", &["B", "D"]);
            let path = index.find_path("A.md", "D.md", 5).unwrap();
            assert_eq!(path.hops, 1);
        }

        #[test]
        fn handles_cycles() {
            let mut index = LinkGraphIndex::new();
            link(&mut index, "A.md", &["B"]);
            link(&mut index, "B.md", &["A"]);
            assert!(index.find_path("A.md", "C.md", 10).is_none());
        }
    }

    mod metrics_tests {
        use super::*;

        #[test]
        fn small_chain_counts() {
            let mut index = LinkGraphIndex::new();
            link(&mut index, "A.md", &["B"]);
            link(&mut index, "B.md", &["C"]);

            let metrics = index.metrics(10);
            assert_eq!(metrics.total_documents, 3);
            assert_eq!(metrics.total_links, 2);
            assert_eq!(metrics.total_broken_links, 0);
            assert_eq!(metrics.orphaned_documents, vec!["A.md"]);
            assert!((metrics.average_links_per_document - 2.0 / 3.0).abs() < 1e-9);
            assert!((metrics.link_density - 2.0 / 6.0).abs() < 1e-9);
        }

        #[test]
        fn hubs_sorted_by_incoming_count() {
            let mut index = LinkGraphIndex::new();
            link(&mut index, "A.md", &["Hub", "B"]);
            link(&mut index, "B.md", &["Hub"]);
            link(&mut index, "C.md", &["Hub", "B"]);

            let metrics = index.metrics(1);
            assert_eq!(metrics.hub_documents, vec![("Hub.md".to_string(), 3)]);
        }

        #[test]
        fn counts_broken_links() {
            let mut index = LinkGraphIndex::new();
            link(&mut index, "A.md", &["missing-1", "missing-2"]);

            let metrics = index.metrics(10);
            assert_eq!(metrics.total_broken_links, 2);
            assert_eq!(metrics.total_links, 0);
        }

        #[test]
        fn empty_graph() {
            let metrics = LinkGraphIndex::new().metrics(10);
            assert_eq!(metrics.total_documents, 0);
            assert!(metrics.average_links_per_document.abs() < f64::EPSILON);
            assert!(metrics.link_density.abs() < f64::EPSILON);
        }
    }
}
