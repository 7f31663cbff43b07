//! The synergy cross-correlator: fuses clone pairs with external
//! file-coupling data (e.g. git co-change frequency) to surface functions
//! that are both duplicated *and* habitually edited together — the
//! strongest refactoring candidates.

use crate::clone_pair::ClonePair;
use crate::config::Config;

/// One file pair's historical co-change coupling, as supplied by an
/// external source (not computed by this crate).
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingEntry {
    /// First file in the pair.
    pub file1: String,
    /// Second file in the pair.
    pub file2: String,
    /// Number of commits that touched both files together.
    pub co_changes: u64,
    /// Normalized coupling strength in `[0.0, 1.0]`.
    pub strength: f64,
}

/// A fused refactoring recommendation: a file pair that is both
/// structurally duplicated and habitually co-edited.
#[derive(Debug, Clone, PartialEq)]
pub struct RefactoringSignal {
    /// First file.
    pub file_a: String,
    /// Second file.
    pub file_b: String,
    /// The coupling strength that qualified this pair.
    pub coupling_strength: f64,
    /// The clone similarity that qualified this pair.
    pub clone_similarity: f64,
    /// Human-readable recommendation text.
    pub recommendation: String,
}

/// Derive the source file a clone pair's qualified function name belongs
/// to: everything before the last `"::"`, or an empty string if the name
/// carries no qualification (bare names can't participate in synergy,
/// since there is nothing to correlate against coupling data).
fn file_of(qualified_name: &str) -> &str {
    match qualified_name.rfind("::") {
        Some(idx) => &qualified_name[..idx],
        None => "",
    }
}

/// Cross-correlate `clone_pairs` against `coupling`: for every clone pair
/// whose owning files also appear in a coupling entry, emit a signal when
/// both the coupling strength and the clone similarity strictly exceed
/// their configured floors. Sorted by `coupling_strength * clone_similarity`
/// descending.
pub fn compute_synergy(
    coupling: &[CouplingEntry],
    clone_pairs: &[ClonePair],
    config: &Config,
) -> Vec<RefactoringSignal> {
    let mut signals = Vec::new();

    for pair in clone_pairs {
        if pair.similarity <= config.synergy_similarity_floor {
            continue;
        }
        let file_a = file_of(&pair.func_a);
        let file_b = file_of(&pair.func_b);
        if file_a.is_empty() || file_b.is_empty() || file_a == file_b {
            continue;
        }

        let Some(entry) = find_coupling(coupling, file_a, file_b) else {
            continue;
        };
        if entry.strength <= config.synergy_coupling_floor {
            continue;
        }

        signals.push(RefactoringSignal {
            file_a: file_a.to_string(),
            file_b: file_b.to_string(),
            coupling_strength: entry.strength,
            clone_similarity: pair.similarity,
            recommendation: recommendation_for(file_a, file_b, entry.strength, pair.similarity),
        });
    }

    signals.sort_by(|a, b| {
        let score_a = a.coupling_strength * a.clone_similarity;
        let score_b = b.coupling_strength * b.clone_similarity;
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (a.file_a.as_str(), a.file_b.as_str()).cmp(&(b.file_a.as_str(), b.file_b.as_str())))
    });
    signals
}

fn find_coupling<'a>(coupling: &'a [CouplingEntry], file_a: &str, file_b: &str) -> Option<&'a CouplingEntry> {
    coupling.iter().find(|entry| {
        (entry.file1 == file_a && entry.file2 == file_b) || (entry.file1 == file_b && entry.file2 == file_a)
    })
}

fn recommendation_for(file_a: &str, file_b: &str, strength: f64, similarity: f64) -> String {
    let coupling_pct = strength * 100.0;
    let similarity_pct = similarity * 100.0;
    format!(
        "{file_a} and {file_b} are co-edited ({coupling_pct:.0}% coupling) and share duplicated logic ({similarity_pct:.0}% similar); consider extracting the shared code"
    )
}
