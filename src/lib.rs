//! # clonewright: structural clone detection via MinHash/LSH
//!
//! Finds structurally similar functions across a codebase by shingling each
//! function's AST into overlapping node-type windows, fingerprinting the
//! shingle set with a MinHash signature, and indexing signatures in a
//! banded LSH table for sublinear candidate retrieval. Candidates are
//! re-ranked by exact Jaccard similarity and classified into Type-1
//! (identical), Type-2 (renamed-only) and Type-3 (near-miss) clones.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     per-file visitor                          │
//! │  Node tree -> shingles -> Signature -> local report            │
//! │                                   \-> signature export          │
//! ├──────────────────────────────────────────────────────────────┤
//! │                  cross-file aggregator                        │
//! │  signature exports -> global LshIndex -> match_pairs -> report │
//! ├──────────────────────────────────────────────────────────────┤
//! │                  synergy cross-correlator                     │
//! │  clone pairs + file coupling -> refactoring signals            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```
//! use clonewright::config::Config;
//! use clonewright::node::Node;
//! use clonewright::orchestrator::{traverse, Visitor};
//! use clonewright::visitor::{build_report, FunctionCollector, ReportMode};
//!
//! struct Collector<'a, 'b>(&'b mut FunctionCollector<'a>);
//! impl<'a, 'b> Visitor<'a> for Collector<'a, 'b> {
//!     fn on_enter(&mut self, node: &'a Node, depth: usize) {
//!         self.0.on_enter(node, depth);
//!     }
//!     fn on_exit(&mut self, node: &'a Node, depth: usize) {
//!         self.0.on_exit(node, depth);
//!     }
//! }
//!
//! let tree = Node::new("Program")
//!     .with_child(Node::new("Function").with_property("name", "a"));
//! let mut collector = FunctionCollector::new();
//! let mut visitors: Vec<Box<dyn Visitor>> = vec![Box::new(Collector(&mut collector))];
//! traverse(Some(&tree), &mut visitors);
//! drop(visitors);
//!
//! let config = Config::default();
//! let report = build_report(&collector.into_functions(), "example.rs", ReportMode::Local, &config);
//! assert_eq!(report.total_functions, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregator;
pub mod clone_pair;
pub mod config;
pub mod entry;
pub mod error;
pub mod lsh;
pub mod matcher;
pub mod node;
pub mod orchestrator;
pub mod report;
pub mod shingle;
pub mod signature;
pub mod synergy;
pub mod visitor;

pub use crate::error::{Error, Result};

use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Install a `tracing-subscriber` formatting layer reading its filter from
/// `RUST_LOG` (defaulting to `info`). Safe to call more than once —
/// subsequent calls are no-ops — so library consumers and this crate's own
/// binaries/tests can all call it defensively.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
