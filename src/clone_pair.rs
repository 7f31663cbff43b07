//! Clone pair records and their canonical, order-independent key.

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// A canonicalized, unordered pair of identifiers: `(min(a,b), max(a,b))`.
///
/// A struct of two sorted fields avoids both the allocation of a
/// concatenated string key and the collision risk that string
/// concatenation carries when an identifier itself contains the chosen
/// separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    /// Lexicographically smaller identifier.
    pub low: String,
    /// Lexicographically larger (or equal) identifier.
    pub high: String,
}

impl PairKey {
    /// Build a canonical key from two identifiers in either order.
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }
}

/// Clone grade, by similarity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloneType {
    /// Structurally identical (`similarity == 1.0`).
    Type1,
    /// Renamed-only (`0.8 <= similarity < 1.0`).
    Type2,
    /// Near-miss, structurally rearranged (`0.5 <= similarity < 0.8`).
    Type3,
}

/// Classify a similarity score using `config`'s thresholds. Callers must
/// only invoke this for scores already known to be `>= config.type3_threshold`;
/// scores below that floor have no clone type and are not emitted as pairs.
pub fn classify(similarity: f64, config: &Config) -> CloneType {
    if similarity >= 1.0 {
        CloneType::Type1
    } else if similarity >= config.type2_threshold {
        CloneType::Type2
    } else {
        CloneType::Type3
    }
}

/// One detected clone: two qualified function names, their measured
/// similarity, and the resulting grade. `func_a < func_b` canonically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClonePair {
    /// Canonically-lesser qualified function name.
    pub func_a: String,
    /// Canonically-greater qualified function name.
    pub func_b: String,
    /// Exact MinHash similarity in `[0, 1]`.
    pub similarity: f64,
    /// Clone grade.
    pub clone_type: CloneType,
}

impl ClonePair {
    /// Build a pair, canonicalizing `a`/`b` order regardless of caller order.
    pub fn new(a: impl Into<String>, b: impl Into<String>, similarity: f64, config: &Config) -> Self {
        let key = PairKey::new(a, b);
        Self {
            func_a: key.low,
            func_b: key.high,
            similarity,
            clone_type: classify(similarity, config),
        }
    }
}
