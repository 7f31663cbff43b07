//! The report surface: the key→value shape external formatters (text,
//! JSON, YAML, binary envelope, HTML) consume, expressed here as a typed
//! value instead of a dynamically-typed map (see the design notes on
//! dynamic map payloads).

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::clone_pair::ClonePair;
use crate::signature::Signature;

/// One entry of a signature-export report's manifest: a function's
/// qualified name, its signature, and the source file it came from (empty
/// when unknown).
#[derive(Debug, Clone, Serialize)]
pub struct FunctionSignatureExport {
    /// Bare function name (not yet file-qualified).
    pub name: String,
    /// The function's MinHash signature.
    pub sig: Signature,
    /// Source file path, or empty if not tracked.
    #[serde(rename = "_source_file")]
    pub source_file: String,
}

/// The two shapes a report's payload can take, per §4.4: a per-file visitor
/// either resolves local clones immediately, or exports raw signatures for
/// the cross-file aggregator to match later.
#[derive(Debug, Clone)]
pub enum ReportPayload {
    /// Local mode: clone pairs found within this one file/tree.
    LocalClones(Vec<ClonePair>),
    /// Signature-export mode: raw per-function signatures, not yet matched.
    SignatureExport(Vec<FunctionSignatureExport>),
}

/// Literal analyzer name every report carries.
pub const ANALYZER_NAME: &str = "clones";

/// A per-file or aggregated clone-detection report.
#[derive(Debug, Clone)]
pub struct Report {
    /// Always `"clones"`.
    pub analyzer_name: String,
    /// Number of function nodes detected (regardless of whether they had
    /// enough nodes to shingle).
    pub total_functions: usize,
    /// Number of clone pairs found (`0` in signature-export mode).
    pub total_clone_pairs: usize,
    /// `total_clone_pairs / total_functions`, or `0.0` when there are no
    /// functions.
    pub clone_ratio: f64,
    /// Human-readable grade message.
    pub message: String,
    payload: ReportPayload,
}

impl Report {
    /// Build a local-mode report (clone pairs resolved immediately).
    pub fn local(
        total_functions: usize,
        clone_pairs: Vec<ClonePair>,
        message: String,
    ) -> Self {
        let total_clone_pairs = clone_pairs.len();
        let clone_ratio = ratio(total_clone_pairs, total_functions);
        Self {
            analyzer_name: ANALYZER_NAME.to_string(),
            total_functions,
            total_clone_pairs,
            clone_ratio,
            message,
            payload: ReportPayload::LocalClones(clone_pairs),
        }
    }

    /// Build a signature-export report: no clone pairs, just a manifest for
    /// the aggregator.
    pub fn signature_export(
        total_functions: usize,
        signatures: Vec<FunctionSignatureExport>,
        message: String,
    ) -> Self {
        Self {
            analyzer_name: ANALYZER_NAME.to_string(),
            total_functions,
            total_clone_pairs: 0,
            clone_ratio: 0.0,
            message,
            payload: ReportPayload::SignatureExport(signatures),
        }
    }

    /// An empty report, used for nil roots and empty aggregations.
    pub fn empty(message: impl Into<String>) -> Self {
        Self::local(0, Vec::new(), message.into())
    }

    /// Clone pairs carried by this report (empty unless `LocalClones`).
    pub fn clone_pairs(&self) -> &[ClonePair] {
        match &self.payload {
            ReportPayload::LocalClones(pairs) => pairs,
            ReportPayload::SignatureExport(_) => &[],
        }
    }

    /// The signature manifest, if this report is in signature-export mode.
    pub fn signature_manifest(&self) -> Option<&[FunctionSignatureExport]> {
        match &self.payload {
            ReportPayload::SignatureExport(sigs) => Some(sigs),
            ReportPayload::LocalClones(_) => None,
        }
    }

    /// `true` iff this report was built in signature-export mode.
    pub fn is_signature_export(&self) -> bool {
        matches!(self.payload, ReportPayload::SignatureExport(_))
    }
}

/// `pairs / functions`, or `0.0` when there are no functions, matching
/// §4.5's ratio rule exactly (never divides by zero).
pub fn ratio(pairs: usize, functions: usize) -> f64 {
    if functions == 0 {
        0.0
    } else {
        pairs as f64 / functions as f64
    }
}

/// Per-file grade message, tiered on raw pair *count* (not ratio).
pub fn local_message(pair_count: usize) -> String {
    match pair_count {
        0 => "No clones".to_string(),
        1..=5 => format!("Low ({pair_count} pair(s))"),
        6..=15 => format!("Moderate ({pair_count} pair(s))"),
        _ => format!("High ({pair_count} pair(s))"),
    }
}

/// Ratio thresholds for the aggregator-level message, distinct from the
/// per-file pair-count tiers above.
const AGGREGATE_YELLOW: f64 = 0.1;
const AGGREGATE_RED: f64 = 0.3;

/// Aggregate-level grade message, tiered on the repository-wide clone
/// ratio.
pub fn aggregate_message(ratio: f64) -> String {
    if ratio > AGGREGATE_RED {
        format!("High clone ratio ({:.1}%)", ratio * 100.0)
    } else if ratio > AGGREGATE_YELLOW {
        format!("Moderate clone ratio ({:.1}%)", ratio * 100.0)
    } else {
        format!("Low clone ratio ({:.1}%)", ratio * 100.0)
    }
}

/// Serializes to exactly the key table from the external report contract:
/// `analyzer_name`, `total_functions`, `total_clone_pairs`, `clone_ratio`,
/// `clone_pairs`, `_func_signatures` (only in signature-export mode), and
/// `message`.
impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let export = self.signature_manifest();
        let field_count = if export.is_some() { 7 } else { 6 };
        let mut map = serializer.serialize_map(Some(field_count))?;
        map.serialize_entry("analyzer_name", &self.analyzer_name)?;
        map.serialize_entry("total_functions", &self.total_functions)?;
        map.serialize_entry("total_clone_pairs", &self.total_clone_pairs)?;
        map.serialize_entry("clone_ratio", &self.clone_ratio)?;
        map.serialize_entry("clone_pairs", self.clone_pairs())?;
        if let Some(sigs) = export {
            map.serialize_entry("_func_signatures", sigs)?;
        }
        map.serialize_entry("message", &self.message)?;
        map.end()
    }
}
