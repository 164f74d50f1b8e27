//! wikivault - Wikilink graph and semantic index for a markdown corpus.
//!
//! This library extracts `[[wikilinks]]` from documents, maintains a
//! forward/backward link graph with path finding and metrics, and keeps a
//! vector index of whole documents and token-window excerpts for semantic
//! search.
//!
//! # Modules
//!
//! - [`wikilink`] - Wikilink parsing and rendering
//! - [`chunker`] - Overlapping token windows
//! - [`corpus`] - Document identity, titles and title resolution
//! - [`storage`] - Storage backend trait and implementations
//! - [`graph`] - Link graph index, shortest paths and metrics
//! - [`links`] - Link extraction and traversal service
//! - [`embedding`] - Tokenizer and embedder traits and implementations
//! - [`vector`] - Vector store trait and implementations
//! - [`index`] - Document and excerpt indexing pipeline
//! - [`config`] - Configuration loading
//! - [`context`] - Service wiring
//! - [`commands`] - High-level operations shared by CLI and tools
//! - [`tools`] - Tool registry
//! - [`cli`] - Command-line interface definitions

pub mod chunker;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod corpus;
pub mod embedding;
pub mod graph;
pub mod index;
pub mod links;
pub mod storage;
pub mod tools;
pub mod vector;
pub mod wikilink;
