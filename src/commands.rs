//! Command implementations shared by the CLI and the tool registry.
//!
//! Each operation takes the [`AppContext`] explicitly. The `render_*`
//! helpers turn results into the markdown printed by the CLI and returned by
//! tools.

use std::collections::BTreeSet;
use std::fmt::Write;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::context::AppContext;
use crate::graph::{LinkMetrics, LinkPath};
use crate::index::{DocumentMatch, IndexCheckpoint, IndexSummary};
use crate::links::{BacklinkResult, ForwardLinkResult};
use crate::vector::QueryResult;

/// Largest possible cosine distance; used when excerpt searches set no
/// ceiling.
pub const MAX_COSINE_DISTANCE: f32 = 2.0;

/// Characters of excerpt or document content shown per search hit.
const PREVIEW_CHARS: usize = 200;

/// Resolve a user-supplied document name: an existing document ID is taken
/// as is, anything else is resolved as a link title.
///
/// # Errors
///
/// Returns an error if no document matches `name`.
pub fn resolve_document(ctx: &AppContext, name: &str) -> anyhow::Result<String> {
    if ctx.storage.exists(name) {
        return Ok(name.to_string());
    }
    ctx.storage
        .resolve_title(name)
        .with_context(|| format!("No document named '{name}'"))
}

/// # Errors
///
/// Returns an error if `document` cannot be resolved or the corpus cannot be
/// read.
pub fn backlinks(ctx: &AppContext, document: &str) -> anyhow::Result<Vec<BacklinkResult>> {
    let id = resolve_document(ctx, document)?;
    Ok(ctx.links.find_backlinks(&id)?)
}

/// # Errors
///
/// Returns an error if `document` cannot be resolved or read.
pub fn forward_links(ctx: &AppContext, document: &str) -> anyhow::Result<Vec<ForwardLinkResult>> {
    let id = resolve_document(ctx, document)?;
    Ok(ctx.links.find_forward_links(&id)?)
}

/// # Errors
///
/// Returns an error if `document` cannot be resolved or the link index cannot
/// be built.
pub fn broken_links(ctx: &mut AppContext, document: &str) -> anyhow::Result<BTreeSet<String>> {
    let id = resolve_document(ctx, document)?;
    Ok(ctx.links.get_broken_links(&id)?)
}

/// # Errors
///
/// Returns an error if either endpoint cannot be resolved or the link index
/// cannot be built.
pub fn link_path(
    ctx: &mut AppContext,
    from: &str,
    to: &str,
    max_hops: Option<usize>,
) -> anyhow::Result<Option<LinkPath>> {
    let from = resolve_document(ctx, from)?;
    let to = resolve_document(ctx, to)?;
    let max_hops = max_hops.unwrap_or(ctx.config.links.max_hops);
    Ok(ctx.links.find_link_path(&from, &to, max_hops)?)
}

/// # Errors
///
/// Returns an error if the link index cannot be built.
pub fn link_metrics(ctx: &mut AppContext, hub_count: Option<usize>) -> anyhow::Result<LinkMetrics> {
    let hub_count = hub_count.unwrap_or(ctx.config.links.hub_count);
    Ok(ctx.links.get_link_metrics(hub_count)?)
}

/// Reindex the corpus and record the checkpoint.
///
/// An incremental run covers documents modified after `since`, or after the
/// last checkpoint when `since` is not given. Without either it falls back to
/// a full reindex.
///
/// # Errors
///
/// Returns an error if indexing fails or the checkpoint cannot be read or
/// written.
pub fn index(
    ctx: &mut AppContext,
    incremental: bool,
    since: Option<DateTime<Utc>>,
) -> anyhow::Result<IndexSummary> {
    let checkpoint = IndexCheckpoint::load(ctx.index_dir())?;
    let started = Utc::now();
    let options = ctx.config.excerpt_options();
    let mut progress = |document: &str, processed: usize, total: usize| {
        info!(document, processed, total, "Indexed document");
    };

    let since = if incremental {
        since.or(checkpoint.last_indexed)
    } else {
        None
    };

    let summary = match since {
        Some(since) => ctx
            .index
            .update_index(since, options, &mut progress)
            .context("Incremental index failed")?,
        None => {
            if incremental {
                info!("No previous index, running a full reindex");
            }
            ctx.index
                .reindex_all(options, &mut progress)
                .context("Reindex failed")?
        }
    };

    IndexCheckpoint {
        last_indexed: Some(started),
    }
    .save(ctx.index_dir())?;

    Ok(summary)
}

/// # Errors
///
/// Returns an error if the query cannot be embedded or the store fails.
pub fn search_excerpts(
    ctx: &AppContext,
    query: &str,
    limit: Option<usize>,
    max_distance: Option<f32>,
) -> anyhow::Result<Vec<QueryResult>> {
    let limit = limit.unwrap_or(ctx.config.search.n_results);
    let max_distance = max_distance.unwrap_or(MAX_COSINE_DISTANCE);
    Ok(ctx.index.query_excerpts(query, limit, max_distance)?)
}

/// # Errors
///
/// Returns an error if the query cannot be embedded, the store fails, or a
/// matched document cannot be read.
pub fn search_documents(
    ctx: &AppContext,
    query: &str,
    limit: Option<usize>,
    max_distance: Option<f32>,
) -> anyhow::Result<Vec<DocumentMatch>> {
    let limit = limit.unwrap_or(ctx.config.search.n_results);
    let max_distance = max_distance.unwrap_or(ctx.config.search.max_distance);
    Ok(ctx.index.query_documents(query, limit, max_distance)?)
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[must_use]
pub fn render_backlinks(document: &str, results: &[BacklinkResult]) -> String {
    if results.is_empty() {
        return format!("No backlinks to '{document}'");
    }

    let mut output = String::new();
    for result in results {
        let _ = write!(
            output,
            "## {}\n**File:** {}\n**Line {}:** {}\n\n",
            result.source_title, result.source_document, result.line_number, result.context_snippet
        );
    }
    let _ = write!(output, "*{} backlink(s) found*", results.len());
    output
}

#[must_use]
pub fn render_forward_links(document: &str, results: &[ForwardLinkResult]) -> String {
    if results.is_empty() {
        return format!("No links in '{document}'");
    }

    let mut output = String::new();
    for result in results {
        let target = result
            .resolved_target
            .as_deref()
            .map_or_else(|| "(broken)".to_string(), |t| format!("`{t}`"));
        let _ = writeln!(
            output,
            "- {} -> {} (line {})",
            result.wikilink, target, result.line_number
        );
    }
    let broken = results.iter().filter(|r| r.resolved_target.is_none()).count();
    let _ = write!(output, "\n*{} link(s), {broken} broken*", results.len());
    output
}

#[must_use]
pub fn render_broken_links(document: &str, titles: &BTreeSet<String>) -> String {
    if titles.is_empty() {
        return format!("No broken links in '{document}'");
    }

    let mut output = String::new();
    for title in titles {
        let _ = writeln!(output, "- [[{title}]]");
    }
    let _ = write!(output, "\n*{} broken link(s)*", titles.len());
    output
}

#[must_use]
pub fn render_path(from: &str, to: &str, path: Option<&LinkPath>) -> String {
    match path {
        Some(path) => format!(
            "{}\n\n*{} hop(s)*",
            path.path
                .iter()
                .map(|doc| format!("`{doc}`"))
                .collect::<Vec<_>>()
                .join(" -> "),
            path.hops
        ),
        None => format!("No path from '{from}' to '{to}'"),
    }
}

#[must_use]
pub fn render_metrics(metrics: &LinkMetrics) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "- **Documents:** {}", metrics.total_documents);
    let _ = writeln!(output, "- **Links:** {}", metrics.total_links);
    let _ = writeln!(output, "- **Broken links:** {}", metrics.total_broken_links);
    let _ = writeln!(
        output,
        "- **Average links per document:** {:.2}",
        metrics.average_links_per_document
    );
    let _ = writeln!(output, "- **Link density:** {:.4}", metrics.link_density);

    if !metrics.hub_documents.is_empty() {
        output.push_str("\n## Hubs\n");
        for (doc, count) in &metrics.hub_documents {
            let _ = writeln!(output, "- `{doc}`: {count}");
        }
    }

    if !metrics.orphaned_documents.is_empty() {
        output.push_str("\n## Orphans\n");
        for doc in &metrics.orphaned_documents {
            let _ = writeln!(output, "- `{doc}`");
        }
    }
    output
}

#[must_use]
pub fn render_summary(summary: &IndexSummary) -> String {
    format!(
        "Indexed {} document(s), {} excerpt(s) ({} empty)",
        summary.documents_indexed, summary.excerpts_indexed, summary.empty_documents
    )
}

#[must_use]
pub fn render_excerpts(query: &str, results: &[QueryResult]) -> String {
    if results.is_empty() {
        return format!("No matches found for '{query}'");
    }

    let mut output = String::new();
    for result in results {
        let _ = write!(
            output,
            "## {}\n**File:** {}\n**Distance:** {:.4}\n{}\n\n",
            result.document.metadata.document_title,
            result.document.metadata.document_id,
            result.distance,
            preview(&result.document.content)
        );
    }
    let _ = write!(output, "*{} result(s) found*", results.len());
    output
}

#[must_use]
pub fn render_documents(query: &str, matches: &[DocumentMatch]) -> String {
    if matches.is_empty() {
        return format!("No matches found for '{query}'");
    }

    let mut output = String::new();
    for hit in matches {
        let _ = write!(
            output,
            "## {}\n**File:** {}\n**Distance:** {:.4}\n{}\n\n",
            hit.document.metadata.document_title,
            hit.document.id,
            hit.distance,
            preview(&hit.document.content)
        );
    }
    let _ = write!(output, "*{} result(s) found*", matches.len());
    output
}
