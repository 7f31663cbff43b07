//! The per-file visitor: collects function nodes during a tree traversal,
//! builds one signature per function, and assembles either a local clone
//! report or a signature-export manifest for the cross-file aggregator.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::Config;
use crate::entry::FunctionEntry;
use crate::lsh::LshIndex;
use crate::matcher::match_pairs;
use crate::node::Node;
use crate::orchestrator::Visitor;
use crate::report::{self, FunctionSignatureExport, Report};
use crate::shingle::extract_shingles;
use crate::signature::Signature;

/// Collects every function-typed node reached during a traversal, borrowing
/// from the tree it walks rather than cloning.
///
/// Dedups by node identity (pointer address): a node reachable via more than
/// one path — not expected in a tree, but cheap to guard against — is kept
/// only once.
pub struct FunctionCollector<'a> {
    functions: Vec<&'a Node>,
    seen: HashSet<*const Node>,
}

impl<'a> FunctionCollector<'a> {
    /// An empty collector.
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// The function nodes collected so far, in traversal order.
    pub fn functions(&self) -> &[&'a Node] {
        &self.functions
    }

    /// Consume the collector, returning its collected function nodes.
    pub fn into_functions(self) -> Vec<&'a Node> {
        self.functions
    }
}

impl<'a> Default for FunctionCollector<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Visitor<'a> for FunctionCollector<'a> {
    fn on_enter(&mut self, node: &'a Node, _depth: usize) {
        if node.is_function() && self.seen.insert(node as *const Node) {
            self.functions.push(node);
        }
    }

    fn on_exit(&mut self, _node: &'a Node, _depth: usize) {}
}

/// Which half of §4.4's split a per-file visitor runs: resolve clones
/// immediately against a scratch index scoped to this one file, or export
/// raw signatures for the aggregator to match globally later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// Build a throwaway LSH index over this file's functions only, and
    /// report the clone pairs found within it.
    Local,
    /// Skip local matching; hand every function's signature to the caller
    /// for a later global pass.
    SignatureExport,
}

/// Build a [`FunctionEntry`] for every function node in `functions`, skip
/// any that shingle to nothing (still counted in `total_functions`, per
/// §4.4's edge case), then assemble a [`Report`] in the requested `mode`.
pub fn build_report(
    functions: &[&Node],
    source_file: &str,
    mode: ReportMode,
    config: &Config,
) -> Report {
    let total_functions = functions.len();
    let mut entries = Vec::with_capacity(functions.len());

    for function in functions {
        let shingles = extract_shingles(function, config.shingle_width);
        if shingles.is_empty() {
            debug!(
                name = %function.function_name(),
                "function produced no shingles, excluding from matching"
            );
            continue;
        }

        let signature = match Signature::with_seed(config.num_hashes, config.base_seed) {
            Ok(sig) => sig,
            Err(err) => {
                warn!(error = %err, "failed to build signature, skipping function");
                continue;
            }
        };
        for shingle in &shingles {
            signature.add(shingle);
        }

        entries.push(FunctionEntry::new(
            function.function_name(),
            source_file,
            signature,
        ));
    }

    match mode {
        ReportMode::Local => build_local_report(total_functions, entries, config),
        ReportMode::SignatureExport => build_export_report(total_functions, entries),
    }
}

fn build_local_report(total_functions: usize, entries: Vec<FunctionEntry>, config: &Config) -> Report {
    if entries.is_empty() {
        return Report::local(total_functions, Vec::new(), report::local_message(0));
    }

    let index = match LshIndex::new(config.num_bands, config.num_rows) {
        Ok(index) => index,
        Err(err) => {
            warn!(error = %err, "failed to build LSH index, returning empty report");
            return Report::local(total_functions, Vec::new(), report::local_message(0));
        }
    };

    for entry in &entries {
        if let Err(err) = index.insert(entry.qualified_name.clone(), entry.signature.clone()) {
            warn!(id = %entry.qualified_name, error = %err, "failed to index function, skipping");
        }
    }

    let pairs = match_pairs(&entries, &index, config);
    let message = report::local_message(pairs.len());
    Report::local(total_functions, pairs, message)
}

fn build_export_report(total_functions: usize, entries: Vec<FunctionEntry>) -> Report {
    let manifest: Vec<FunctionSignatureExport> = entries
        .into_iter()
        .map(|entry| FunctionSignatureExport {
            name: entry.name,
            sig: entry.signature,
            source_file: entry.source_file,
        })
        .collect();
    let message = format!("Exported {} function signature(s)", manifest.len());
    Report::signature_export(total_functions, manifest, message)
}
