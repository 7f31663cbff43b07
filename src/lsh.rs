//! Banded LSH index over MinHash signatures: sublinear candidate retrieval
//! by bucketing signatures on `B` band hashes instead of comparing all pairs.

use std::collections::{HashMap, HashSet};
use std::hash::Hasher;

use fnv::FnvHasher;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::signature::Signature;

struct IndexInner {
    bands: Vec<HashMap<u64, HashSet<String>>>,
    id_to_sig: HashMap<String, Signature>,
}

/// A banded LSH index parameterized by `(num_bands, num_rows)`, with
/// `num_bands * num_rows` implicitly fixing the signature length it accepts.
///
/// Readers (`query`, `query_threshold`) may run concurrently; `insert` and
/// `clear` take the exclusive writer lock. Re-inserting an id fully removes
/// its prior band entries first, so the index stays idempotent.
pub struct LshIndex {
    num_bands: usize,
    num_rows: usize,
    inner: RwLock<IndexInner>,
}

/// Hash one band's row slice, prefixed with a big-endian encoding of the
/// band index itself — domain separation so identical row tuples occurring
/// in different bands land in different buckets.
fn band_hash(band_idx: usize, rows: &[u64]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(&(band_idx as u64).to_be_bytes());
    for row in rows {
        hasher.write(&row.to_be_bytes());
    }
    hasher.finish()
}

impl LshIndex {
    /// Build an empty index. Fails with `InvalidParams` when either
    /// dimension is zero.
    pub fn new(num_bands: usize, num_rows: usize) -> Result<Self> {
        if num_bands == 0 || num_rows == 0 {
            return Err(Error::InvalidParams {
                bands: num_bands,
                rows: num_rows,
            });
        }
        Ok(Self {
            num_bands,
            num_rows,
            inner: RwLock::new(IndexInner {
                bands: vec![HashMap::new(); num_bands],
                id_to_sig: HashMap::new(),
            }),
        })
    }

    /// Number of bands (`B`).
    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    /// Rows per band (`R`).
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn expected_len(&self) -> usize {
        self.num_bands * self.num_rows
    }

    fn band_hashes(&self, mins: &[u64]) -> Vec<u64> {
        (0..self.num_bands)
            .map(|band_idx| {
                let start = band_idx * self.num_rows;
                band_hash(band_idx, &mins[start..start + self.num_rows])
            })
            .collect()
    }

    /// Insert (or idempotently replace) `id`'s signature. Fails with
    /// `SizeMismatch` if `sig`'s length isn't `num_bands * num_rows`.
    pub fn insert(&self, id: impl Into<String>, sig: Signature) -> Result<()> {
        let id = id.into();
        let expected = self.expected_len();
        if sig.num_hashes() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: sig.num_hashes(),
            });
        }

        let new_mins = sig.snapshot();
        let new_hashes = self.band_hashes(&new_mins);

        let mut inner = self.inner.write();
        if let Some(old_sig) = inner.id_to_sig.remove(&id) {
            let old_mins = old_sig.snapshot();
            let old_hashes = self.band_hashes(&old_mins);
            for (band_idx, hash) in old_hashes.into_iter().enumerate() {
                if let Some(bucket) = inner.bands[band_idx].get_mut(&hash) {
                    bucket.remove(&id);
                    if bucket.is_empty() {
                        inner.bands[band_idx].remove(&hash);
                    }
                }
            }
        }

        for (band_idx, hash) in new_hashes.into_iter().enumerate() {
            inner.bands[band_idx]
                .entry(hash)
                .or_default()
                .insert(id.clone());
        }
        trace!(id = %id, "inserted signature into LSH index");
        inner.id_to_sig.insert(id, sig);
        Ok(())
    }

    /// As [`LshIndex::insert`], but for callers whose signature may be
    /// absent (`None`), returning `NilSignature` in that case rather than
    /// requiring them to branch before calling.
    pub fn insert_opt(&self, id: impl Into<String>, sig: Option<Signature>) -> Result<()> {
        match sig {
            Some(sig) => self.insert(id, sig),
            None => Err(Error::NilSignature),
        }
    }

    /// Deduplicated identifiers sharing at least one band hash with `sig`.
    /// Order is unspecified.
    pub fn query(&self, sig: &Signature) -> Result<Vec<String>> {
        let expected = self.expected_len();
        if sig.num_hashes() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: sig.num_hashes(),
            });
        }
        let mins = sig.snapshot();
        let hashes = self.band_hashes(&mins);

        let inner = self.inner.read();
        let mut seen = HashSet::new();
        for (band_idx, hash) in hashes.into_iter().enumerate() {
            if let Some(bucket) = inner.bands[band_idx].get(&hash) {
                seen.extend(bucket.iter().cloned());
            }
        }
        Ok(seen.into_iter().collect())
    }

    /// `query`, then keep only candidates whose exact MinHash similarity
    /// with `sig` is `>= threshold`.
    pub fn query_threshold(&self, sig: &Signature, threshold: f64) -> Result<Vec<String>> {
        let candidates = self.query(sig)?;
        let inner = self.inner.read();
        let mut out = Vec::new();
        for id in candidates {
            let Some(candidate_sig) = inner.id_to_sig.get(&id) else {
                continue;
            };
            match sig.similarity(candidate_sig) {
                Ok(s) if s >= threshold => out.push(id),
                Ok(_) => {}
                Err(_) => continue,
            }
        }
        Ok(out)
    }

    /// Number of distinct identifiers currently indexed.
    pub fn size(&self) -> usize {
        self.inner.read().id_to_sig.len()
    }

    /// Drop every band bucket and every stored signature.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        for band in inner.bands.iter_mut() {
            band.clear();
        }
        inner.id_to_sig.clear();
        debug!("cleared LSH index");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig_from_tokens(num_hashes: usize, tokens: &[&str]) -> Signature {
        let sig = Signature::new(num_hashes).unwrap();
        for t in tokens {
            sig.add(t.as_bytes());
        }
        sig
    }

    #[test]
    fn rejects_invalid_params() {
        assert!(matches!(
            LshIndex::new(0, 8),
            Err(Error::InvalidParams { bands: 0, rows: 8 })
        ));
        assert!(matches!(LshIndex::new(16, 0), Err(Error::InvalidParams { .. })));
    }

    #[test]
    fn rejects_size_mismatch_on_insert_and_query() {
        let index = LshIndex::new(16, 8).unwrap();
        let wrong = Signature::new(64).unwrap();
        assert!(matches!(
            index.insert("a", wrong),
            Err(Error::SizeMismatch { expected: 128, actual: 64 })
        ));
    }

    #[test]
    fn insert_opt_none_is_nil_signature() {
        let index = LshIndex::new(16, 8).unwrap();
        assert_eq!(index.insert_opt("a", None).unwrap_err(), Error::NilSignature);
    }

    #[test]
    fn finds_similar_candidates() {
        let index = LshIndex::new(16, 8).unwrap();
        let shared: Vec<String> = (0..200).map(|i| format!("shared-{i}")).collect();
        let shared_refs: Vec<&str> = shared.iter().map(|s| s.as_str()).collect();

        let a = sig_from_tokens(128, &shared_refs);
        let b = sig_from_tokens(128, &shared_refs);
        index.insert("a", a).unwrap();
        index.insert("b", b).unwrap();

        let query = sig_from_tokens(128, &shared_refs);
        let candidates = index.query(&query).unwrap();
        assert!(candidates.contains(&"a".to_string()));
        assert!(candidates.contains(&"b".to_string()));
    }

    #[test]
    fn candidates_are_deduplicated() {
        let index = LshIndex::new(16, 8).unwrap();
        let tokens: Vec<String> = (0..200).map(|i| format!("t-{i}")).collect();
        let refs: Vec<&str> = tokens.iter().map(|s| s.as_str()).collect();
        index.insert("a", sig_from_tokens(128, &refs)).unwrap();

        let query = sig_from_tokens(128, &refs);
        let candidates = index.query(&query).unwrap();
        let unique: HashSet<&String> = candidates.iter().collect();
        assert_eq!(candidates.len(), unique.len());
    }

    #[test]
    fn reinsert_is_idempotent() {
        let index = LshIndex::new(16, 8).unwrap();
        let tokens: Vec<String> = (0..200).map(|i| format!("t-{i}")).collect();
        let refs: Vec<&str> = tokens.iter().map(|s| s.as_str()).collect();

        index.insert("a", sig_from_tokens(128, &refs)).unwrap();
        assert_eq!(index.size(), 1);
        index.insert("a", sig_from_tokens(128, &refs)).unwrap();
        assert_eq!(index.size(), 1);

        let query = sig_from_tokens(128, &refs);
        let first = index.query(&query).unwrap();
        index.insert("a", sig_from_tokens(128, &refs)).unwrap();
        let second = index.query(&query).unwrap();
        assert_eq!(
            first.iter().collect::<HashSet<_>>(),
            second.iter().collect::<HashSet<_>>()
        );
    }

    #[test]
    fn query_threshold_filters_by_exact_similarity() {
        let index = LshIndex::new(16, 8).unwrap();
        let tokens: Vec<String> = (0..200).map(|i| format!("t-{i}")).collect();
        let refs: Vec<&str> = tokens.iter().map(|s| s.as_str()).collect();

        index.insert("identical", sig_from_tokens(128, &refs)).unwrap();
        index
            .insert("different", sig_from_tokens(128, &["x", "y", "z"]))
            .unwrap();

        let query = sig_from_tokens(128, &refs);
        let candidates = index.query_threshold(&query, 0.99).unwrap();
        assert!(candidates.contains(&"identical".to_string()));
        assert!(!candidates.contains(&"different".to_string()));
    }

    #[test]
    fn clear_empties_the_index() {
        let index = LshIndex::new(16, 8).unwrap();
        index.insert("a", Signature::new(128).unwrap()).unwrap();
        assert_eq!(index.size(), 1);
        index.clear();
        assert_eq!(index.size(), 0);
        assert!(index.query(&Signature::new(128).unwrap()).unwrap().is_empty());
    }
}
