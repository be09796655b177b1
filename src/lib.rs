//! Streaming Language Server Index Format (LSIF) dump generation for
//! statically-typed, multi-project workspaces.

pub mod checker;
pub mod cli;
pub mod config;
pub mod driver;
pub mod emit;
pub mod error;
pub mod graph;
pub mod indexer;
pub mod logging;
pub mod manager;
pub mod moniker;
pub mod package;
pub mod report;
pub mod source;
pub mod validate;

#[cfg(test)]
pub mod test_utils;
