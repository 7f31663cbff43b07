//! The pair matcher: the algorithmic heart shared by the per-file visitor's
//! local mode and the cross-file aggregator's global pass. Queries an
//! already-populated [`LshIndex`] for each entry, re-ranks candidates by
//! exact MinHash similarity, and classifies survivors by clone type.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::clone_pair::{ClonePair, PairKey};
use crate::config::Config;
use crate::entry::FunctionEntry;
use crate::lsh::LshIndex;

/// Run the matching algorithm over `entries` against `index`, which must
/// already contain every entry's signature (callers build the index before
/// calling this, since both the local-mode visitor and the aggregator
/// populate it differently).
///
/// Per-entry failures — a query error, or a candidate whose signature
/// vanished — are logged and skipped; they never abort the pass. The
/// returned list is sorted by similarity descending, with ties broken by
/// the canonical pair key so the order is reproducible across runs
/// regardless of hash-map iteration order upstream.
pub fn match_pairs(entries: &[FunctionEntry], index: &LshIndex, config: &Config) -> Vec<ClonePair> {
    let signatures_by_id: HashMap<&str, &crate::signature::Signature> = entries
        .iter()
        .map(|e| (e.qualified_name.as_str(), &e.signature))
        .collect();

    let mut seen: HashSet<PairKey> = HashSet::new();
    let mut pairs = Vec::new();

    for entry in entries {
        let candidates = match index.query_threshold(&entry.signature, config.type3_threshold) {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(id = %entry.qualified_name, error = %err, "LSH query failed for entry, skipping");
                continue;
            }
        };

        for candidate_id in candidates {
            if candidate_id == entry.qualified_name {
                continue;
            }
            let key = PairKey::new(entry.qualified_name.clone(), candidate_id.clone());
            if !seen.insert(key) {
                continue;
            }

            let Some(candidate_sig) = signatures_by_id.get(candidate_id.as_str()) else {
                warn!(id = %candidate_id, "candidate signature missing, skipping");
                continue;
            };

            let similarity = match entry.signature.similarity(candidate_sig) {
                Ok(s) => s,
                Err(err) => {
                    warn!(a = %entry.qualified_name, b = %candidate_id, error = %err, "similarity computation failed, skipping");
                    continue;
                }
            };
            if similarity < config.type3_threshold {
                continue;
            }

            pairs.push(ClonePair::new(
                entry.qualified_name.clone(),
                candidate_id,
                similarity,
                config,
            ));
        }
    }

    pairs.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| (a.func_a.as_str(), a.func_b.as_str()).cmp(&(b.func_a.as_str(), b.func_b.as_str())))
    });
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;

    fn entry_with_tokens(name: &str, tokens: &[&str], config: &Config) -> FunctionEntry {
        let sig = Signature::new(config.num_hashes).unwrap();
        for t in tokens {
            sig.add(t.as_bytes());
        }
        FunctionEntry::new(name, "", sig)
    }

    fn index_from(entries: &[FunctionEntry], config: &Config) -> LshIndex {
        let index = LshIndex::new(config.num_bands, config.num_rows).unwrap();
        for e in entries {
            index.insert(e.qualified_name.clone(), e.signature.clone()).unwrap();
        }
        index
    }

    #[test]
    fn identical_functions_produce_one_type1_pair() {
        let config = Config::default();
        let tokens: Vec<String> = (0..50).map(|i| format!("tok-{i}")).collect();
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();

        let entries = vec![
            entry_with_tokens("f1", &refs, &config),
            entry_with_tokens("f2", &refs, &config),
        ];
        let index = index_from(&entries, &config);
        let pairs = match_pairs(&entries, &index, &config);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].similarity, 1.0);
        assert_eq!(pairs[0].clone_type, crate::clone_pair::CloneType::Type1);
    }

    #[test]
    fn unrelated_functions_produce_no_pairs() {
        let config = Config::default();
        let entries = vec![
            entry_with_tokens("f1", &["Function", "Block", "Assignment"], &config),
            entry_with_tokens(
                "f2",
                &["Function", "Loop", "If", "Switch", "Catch", "Throw", "Try", "Break", "Continue"],
                &config,
            ),
        ];
        let index = index_from(&entries, &config);
        let pairs = match_pairs(&entries, &index, &config);
        assert!(pairs.is_empty());
    }

    #[test]
    fn entry_never_pairs_with_itself() {
        let config = Config::default();
        let entries = vec![entry_with_tokens("solo", &["a", "b", "c"], &config)];
        let index = index_from(&entries, &config);
        let pairs = match_pairs(&entries, &index, &config);
        assert!(pairs.is_empty());
    }

    #[test]
    fn pairs_are_sorted_by_similarity_descending() {
        let config = Config::default();
        let shared: Vec<String> = (0..80).map(|i| format!("s-{i}")).collect();
        let shared_refs: Vec<&str> = shared.iter().map(String::as_str).collect();

        let a = entry_with_tokens("a", &shared_refs, &config);
        let b = entry_with_tokens("b", &shared_refs, &config);
        // c overlaps partially with a/b: fewer shared tokens => lower similarity
        let mut partial = shared_refs[..40].to_vec();
        partial.extend(["unique-1", "unique-2", "unique-3"]);
        let c = entry_with_tokens("c", &partial, &config);

        let entries = vec![a, b, c];
        let index = index_from(&entries, &config);
        let pairs = match_pairs(&entries, &index, &config);

        for window in pairs.windows(2) {
            assert!(window[0].similarity >= window[1].similarity);
        }
    }
}
