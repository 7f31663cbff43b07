//! Tunable constants for the clone-detection engine.
//!
//! Every default here reproduces the compatibility table from the engine's
//! external interface contract exactly; changing any of `num_hashes`,
//! `num_bands`, `num_rows`, `base_seed` or the mix constants changes the
//! signature wire format and breaks cross-implementation byte-identity.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `splitmix64`'s additive constant, used to derive per-slot MinHash seeds.
pub const SPLITMIX64_ADDITIVE: u64 = 0x9e3779b97f4a7c15;

/// The two multiplicative constants used by [`crate::signature::mix`].
pub const MIX_MULTIPLIERS: (u64, u64) = (0xbf58476d1ce4e5b9, 0x94d049bb133111eb);

/// The three bit-shift amounts used by [`crate::signature::mix`].
pub const MIX_SHIFTS: (u32, u32, u32) = (30, 27, 31);

/// Shingle separator byte, ASCII `|`.
pub const SHINGLE_SEPARATOR: u8 = 0x7C;

/// Configuration for one analysis pass: MinHash/LSH geometry, shingle width,
/// and the clone/synergy classification thresholds.
///
/// `num_bands * num_rows` must equal `num_hashes`; this is enforced wherever
/// an [`crate::lsh::LshIndex`] is constructed from a `Config`, not here,
/// since a `Config` itself is just data and construction is infallible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `H`: number of MinHash hash functions (signature length).
    pub num_hashes: usize,
    /// `B`: number of LSH bands.
    pub num_bands: usize,
    /// `R`: rows per LSH band.
    pub num_rows: usize,
    /// `k`: shingle width in node-type tokens.
    pub shingle_width: usize,
    /// Lower bound for a Type-3 (near-miss) clone.
    pub type3_threshold: f64,
    /// Lower bound for a Type-2 (renamed-only) clone.
    pub type2_threshold: f64,
    /// Coupling strength must exceed this for synergy to consider a file pair.
    pub synergy_coupling_floor: f64,
    /// Clone similarity must exceed this for synergy to emit a signal.
    pub synergy_similarity_floor: f64,
    /// Base seed for deriving per-slot MinHash seeds via splitmix64.
    pub base_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_hashes: 128,
            num_bands: 16,
            num_rows: 8,
            shingle_width: 5,
            type3_threshold: 0.5,
            type2_threshold: 0.8,
            synergy_coupling_floor: 0.3,
            synergy_similarity_floor: 0.8,
            base_seed: 0x517cc1b727220a95,
        }
    }
}

impl Config {
    /// Parse a `Config` from a YAML document, falling back to defaults for
    /// any field the document omits.
    ///
    /// Loading the document from disk, merging CLI overrides, and similar
    /// driver concerns are out of this crate's scope; callers hand us the
    /// bytes.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::InvalidData(e.to_string()))
    }

    /// Parse a `Config` from any `Read` source, e.g. an already-opened file.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = String::new();
        reader
            .read_to_string(&mut buf)
            .map_err(|e| Error::InvalidData(e.to_string()))?;
        Self::from_yaml_str(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_compatibility_table() {
        let cfg = Config::default();
        assert_eq!(cfg.num_hashes, 128);
        assert_eq!(cfg.num_bands, 16);
        assert_eq!(cfg.num_rows, 8);
        assert_eq!(cfg.shingle_width, 5);
        assert_eq!(cfg.num_bands * cfg.num_rows, cfg.num_hashes);
        assert_eq!(cfg.base_seed, 0x517cc1b727220a95);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let cfg = Config::from_yaml_str("shingle_width: 7\n").unwrap();
        assert_eq!(cfg.shingle_width, 7);
        assert_eq!(cfg.num_hashes, 128);
    }

    #[test]
    fn malformed_yaml_is_invalid_data() {
        let err = Config::from_yaml_str("not: [valid: yaml: at all").unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn from_reader_loads_an_actual_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "num_hashes: 64\nnum_bands: 8\nnum_rows: 8\n").unwrap();
        let cfg = Config::from_reader(file.reopen().unwrap()).unwrap();
        assert_eq!(cfg.num_hashes, 64);
        assert_eq!(cfg.num_bands, 8);
    }
}
