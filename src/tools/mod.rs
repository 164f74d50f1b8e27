//! Named capabilities callable with JSON arguments.
//!
//! [`registry`] is the complete, fixed list of tools. Each tool parses its
//! arguments, runs a command against the [`AppContext`] and returns markdown.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::commands;
use crate::context::AppContext;

/// Name and description shown when listing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

pub trait Tool {
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool with JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments do not match the tool's parameters
    /// or the underlying command fails.
    fn run(&self, ctx: &mut AppContext, args: &serde_json::Value) -> anyhow::Result<String>;
}

/// Every available tool, in listing order.
#[must_use]
pub fn registry() -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(Backlinks),
        Box::new(ForwardLinks),
        Box::new(BrokenLinks),
        Box::new(LinkPathTool),
        Box::new(LinkMetricsTool),
        Box::new(SearchExcerpts),
        Box::new(SearchDocuments),
        Box::new(Reindex),
    ]
}

/// Look up a tool by name.
#[must_use]
pub fn find(name: &str) -> Option<Box<dyn Tool>> {
    registry()
        .into_iter()
        .find(|tool| tool.descriptor().name == name)
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: &serde_json::Value) -> anyhow::Result<T> {
    // Tools without required arguments accept a missing argument object.
    let args = if args.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        args.clone()
    };
    serde_json::from_value(args)
        .map_err(|e| anyhow::anyhow!("Invalid arguments for {tool}: {e}"))
}

/// Parameters for tools that take a single document.
#[derive(Debug, Deserialize)]
pub struct DocumentParams {
    /// Document ID or link title.
    pub document: String,
}

#[derive(Debug, Deserialize)]
pub struct PathParams {
    pub from: String,
    pub to: String,
    pub max_hops: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MetricsParams {
    pub hubs: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub limit: Option<usize>,
    pub max_distance: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct ReindexParams {
    #[serde(default)]
    pub incremental: bool,
    pub since: Option<DateTime<Utc>>,
}

struct Backlinks;

impl Tool for Backlinks {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "backlinks",
            description: "Find documents that link to a document",
        }
    }

    fn run(&self, ctx: &mut AppContext, args: &serde_json::Value) -> anyhow::Result<String> {
        let params: DocumentParams = parse_args(self.descriptor().name, args)?;
        let results = commands::backlinks(ctx, &params.document)?;
        Ok(commands::render_backlinks(&params.document, &results))
    }
}

struct ForwardLinks;

impl Tool for ForwardLinks {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "forward_links",
            description: "List the links in a document and where they resolve",
        }
    }

    fn run(&self, ctx: &mut AppContext, args: &serde_json::Value) -> anyhow::Result<String> {
        let params: DocumentParams = parse_args(self.descriptor().name, args)?;
        let results = commands::forward_links(ctx, &params.document)?;
        Ok(commands::render_forward_links(&params.document, &results))
    }
}

struct BrokenLinks;

impl Tool for BrokenLinks {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "broken_links",
            description: "List link titles in a document that match no document",
        }
    }

    fn run(&self, ctx: &mut AppContext, args: &serde_json::Value) -> anyhow::Result<String> {
        let params: DocumentParams = parse_args(self.descriptor().name, args)?;
        let titles = commands::broken_links(ctx, &params.document)?;
        Ok(commands::render_broken_links(&params.document, &titles))
    }
}

struct LinkPathTool;

impl Tool for LinkPathTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "link_path",
            description: "Find the shortest chain of links between two documents",
        }
    }

    fn run(&self, ctx: &mut AppContext, args: &serde_json::Value) -> anyhow::Result<String> {
        let params: PathParams = parse_args(self.descriptor().name, args)?;
        let path = commands::link_path(ctx, &params.from, &params.to, params.max_hops)?;
        Ok(commands::render_path(&params.from, &params.to, path.as_ref()))
    }
}

struct LinkMetricsTool;

impl Tool for LinkMetricsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "link_metrics",
            description: "Summarise the link graph: counts, hubs and orphans",
        }
    }

    fn run(&self, ctx: &mut AppContext, args: &serde_json::Value) -> anyhow::Result<String> {
        let params: MetricsParams = parse_args(self.descriptor().name, args)?;
        let metrics = commands::link_metrics(ctx, params.hubs)?;
        Ok(commands::render_metrics(&metrics))
    }
}

struct SearchExcerpts;

impl Tool for SearchExcerpts {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "search_excerpts",
            description: "Semantic search over document excerpts",
        }
    }

    fn run(&self, ctx: &mut AppContext, args: &serde_json::Value) -> anyhow::Result<String> {
        let params: SearchParams = parse_args(self.descriptor().name, args)?;
        let results =
            commands::search_excerpts(ctx, &params.query, params.limit, params.max_distance)?;
        Ok(commands::render_excerpts(&params.query, &results))
    }
}

struct SearchDocuments;

impl Tool for SearchDocuments {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "search_documents",
            description: "Semantic search over whole documents",
        }
    }

    fn run(&self, ctx: &mut AppContext, args: &serde_json::Value) -> anyhow::Result<String> {
        let params: SearchParams = parse_args(self.descriptor().name, args)?;
        let matches =
            commands::search_documents(ctx, &params.query, params.limit, params.max_distance)?;
        Ok(commands::render_documents(&params.query, &matches))
    }
}

struct Reindex;

impl Tool for Reindex {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "reindex",
            description: "Rebuild the semantic index, optionally only for changed documents",
        }
    }

    fn run(&self, ctx: &mut AppContext, args: &serde_json::Value) -> anyhow::Result<String> {
        let params: ReindexParams = parse_args(self.descriptor().name, args)?;
        let summary = commands::index(ctx, params.incremental, params.since)?;
        Ok(commands::render_summary(&summary))
    }
}
