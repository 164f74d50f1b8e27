//! CLI interface for wikivault.
//!
//! Provides command-line argument parsing using clap.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// Command-line interface for wikivault.
#[derive(Parser)]
#[command(name = "wikivault")]
#[command(author, version, about = "Wikilink graph and semantic index for a markdown corpus", long_about = None)]
pub struct Cli {
    /// Log progress at info level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// List documents that link to a document.
    Backlinks {
        /// Document path (e.g., "rust/ownership.md") or link title.
        document: String,
    },

    /// List the links in a document and where they resolve.
    Forward {
        /// Document path or link title.
        document: String,
    },

    /// List link titles in a document that match no document.
    Broken {
        /// Document path or link title.
        document: String,
    },

    /// Find the shortest chain of links between two documents.
    Path {
        /// Starting document path or link title.
        from: String,

        /// Destination document path or link title.
        to: String,

        /// Give up after this many hops (default from config).
        #[arg(short, long)]
        max_hops: Option<usize>,
    },

    /// Summarise the link graph.
    Metrics {
        /// Number of hub documents to show (default from config).
        #[arg(long)]
        hubs: Option<usize>,
    },

    /// Build or update the semantic index.
    Index {
        /// Only index documents modified since the last run.
        #[arg(short, long)]
        incremental: bool,

        /// With --incremental, index documents modified after this RFC 3339
        /// time instead of the last run.
        #[arg(long, requires = "incremental")]
        since: Option<DateTime<Utc>>,
    },

    /// Semantic search over excerpts, or whole documents.
    Search {
        /// The search query string.
        query: String,

        /// Search whole documents instead of excerpts.
        #[arg(short, long)]
        documents: bool,

        /// Maximum number of results to return (default from config).
        #[arg(short, long)]
        limit: Option<usize>,

        /// Drop results farther than this cosine distance. For document
        /// searches 0 disables the filter.
        #[arg(short, long)]
        max_distance: Option<f32>,
    },

    /// List the available tools.
    Tools,

    /// Run a tool with JSON arguments.
    Tool {
        /// Tool name, as shown by `wikivault tools`.
        name: String,

        /// Arguments as a JSON object (e.g., '{"document": "Ownership"}').
        args: Option<String>,
    },
}
