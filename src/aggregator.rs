//! The cross-file aggregator: collects every per-file visitor's report,
//! and — when those reports are in signature-export mode — runs one global
//! LSH pass to find clones that span file boundaries.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::Config;
use crate::entry::FunctionEntry;
use crate::lsh::LshIndex;
use crate::matcher::match_pairs;
use crate::report::{self, Report};
use crate::signature::Signature;

/// Accumulates per-file reports across a whole traversal, then produces one
/// aggregate [`Report`] covering the entire set.
#[derive(Debug, Default)]
pub struct CrossFileAggregator {
    total_functions: usize,
    entries: Vec<FunctionEntry>,
}

impl CrossFileAggregator {
    /// A fresh aggregator with nothing accumulated yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold every report in `per_file_reports` into the running total.
    ///
    /// `total_functions` sums across all files regardless of mode. Only
    /// signature-export reports contribute entries to the later global
    /// match; local-mode reports have already resolved their own clones
    /// and contribute nothing further here (mixing modes within one run is
    /// unusual but not rejected — each report is handled on its own terms).
    pub fn aggregate(&mut self, per_file_reports: &HashMap<String, Report>) {
        for (source_file, report) in per_file_reports {
            self.total_functions += report.total_functions;

            let Some(manifest) = report.signature_manifest() else {
                continue;
            };
            for export in manifest {
                if export.sig.is_empty() {
                    warn!(
                        file = %source_file,
                        name = %export.name,
                        "skipping signature export with an empty signature"
                    );
                    continue;
                }
                let owning_file = if export.source_file.is_empty() {
                    source_file.as_str()
                } else {
                    export.source_file.as_str()
                };
                self.entries.push(FunctionEntry::new(
                    export.name.clone(),
                    owning_file,
                    clone_signature(&export.sig),
                ));
            }
        }
        debug!(
            total_functions = self.total_functions,
            entries = self.entries.len(),
            "aggregated per-file reports"
        );
    }

    /// Build the final aggregate report: a global LSH index over every
    /// collected entry, re-matched the same way a single file would be.
    /// Returns an empty report with an explanatory message if nothing was
    /// ever aggregated.
    pub fn get_result(&self, config: &Config) -> Report {
        if self.total_functions == 0 {
            return Report::empty("No functions");
        }
        if self.entries.is_empty() {
            // Every file resolved its own clones locally; nothing left to
            // cross-match globally.
            return Report::local(self.total_functions, Vec::new(), report::local_message(0));
        }

        let index = match LshIndex::new(config.num_bands, config.num_rows) {
            Ok(index) => index,
            Err(err) => {
                warn!(error = %err, "failed to build global LSH index");
                return Report::local(self.total_functions, Vec::new(), report::local_message(0));
            }
        };
        for entry in &self.entries {
            if let Err(err) = index.insert(entry.qualified_name.clone(), entry.signature.clone()) {
                warn!(id = %entry.qualified_name, error = %err, "failed to index entry, skipping");
            }
        }

        let pairs = match_pairs(&self.entries, &index, config);
        let ratio = report::ratio(pairs.len(), self.total_functions);
        let message = report::aggregate_message(ratio);
        Report::local(self.total_functions, pairs, message)
    }
}

fn clone_signature(sig: &Signature) -> Signature {
    sig.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::FunctionSignatureExport;

    fn export(name: &str, tokens: &[&str], config: &Config) -> FunctionSignatureExport {
        let sig = Signature::new(config.num_hashes).unwrap();
        for t in tokens {
            sig.add(t.as_bytes());
        }
        FunctionSignatureExport {
            name: name.to_string(),
            sig,
            source_file: String::new(),
        }
    }

    #[test]
    fn empty_aggregation_reports_no_functions() {
        let config = Config::default();
        let aggregator = CrossFileAggregator::new();
        let report = aggregator.get_result(&config);
        assert_eq!(report.total_functions, 0);
        assert_eq!(report.message, "No functions");
    }

    #[test]
    fn cross_file_clone_is_found_after_aggregation() {
        let config = Config::default();
        let tokens: Vec<String> = (0..40).map(|i| format!("t-{i}")).collect();
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();

        let mut per_file = HashMap::new();
        per_file.insert(
            "a.go".to_string(),
            Report::signature_export(1, vec![export("helper", &refs, &config)], "exported".to_string()),
        );
        per_file.insert(
            "b.go".to_string(),
            Report::signature_export(1, vec![export("helper", &refs, &config)], "exported".to_string()),
        );

        let mut aggregator = CrossFileAggregator::new();
        aggregator.aggregate(&per_file);
        let report = aggregator.get_result(&config);

        assert_eq!(report.total_functions, 2);
        assert_eq!(report.total_clone_pairs, 1);
        assert_eq!(report.clone_pairs()[0].similarity, 1.0);
    }

    #[test]
    fn local_mode_reports_contribute_to_total_but_not_to_rematching() {
        let config = Config::default();
        let mut per_file = HashMap::new();
        per_file.insert(
            "a.go".to_string(),
            Report::local(3, Vec::new(), "No clones".to_string()),
        );

        let mut aggregator = CrossFileAggregator::new();
        aggregator.aggregate(&per_file);
        let report = aggregator.get_result(&config);

        assert_eq!(report.total_functions, 3);
        assert_eq!(report.total_clone_pairs, 0);
    }

    #[test]
    fn empty_signature_exports_are_skipped() {
        let config = Config::default();
        let mut per_file = HashMap::new();
        let empty_sig = Signature::new(config.num_hashes).unwrap();
        per_file.insert(
            "a.go".to_string(),
            Report::signature_export(
                1,
                vec![FunctionSignatureExport {
                    name: "noop".to_string(),
                    sig: empty_sig,
                    source_file: String::new(),
                }],
                "exported".to_string(),
            ),
        );

        let mut aggregator = CrossFileAggregator::new();
        aggregator.aggregate(&per_file);
        assert!(aggregator.entries.is_empty());
        assert_eq!(aggregator.total_functions, 1);
    }
}
