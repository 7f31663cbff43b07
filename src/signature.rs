//! MinHash signatures: fixed-size probabilistic fingerprints of a shingle
//! multiset, used to estimate Jaccard similarity in O(H) instead of O(|A∪B|).

use std::hash::Hasher;

use fnv::FnvHasher;
use parking_lot::{Mutex, MutexGuard};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

use crate::config::{MIX_MULTIPLIERS, MIX_SHIFTS, SPLITMIX64_ADDITIVE};
use crate::error::{Error, Result};

/// Default base seed for deriving per-slot MinHash seeds, per the
/// compatibility contract. Two independent implementations using this seed,
/// the same `H`, and the same FNV-1a polynomial produce byte-identical
/// signatures for equal token sequences.
pub const DEFAULT_BASE_SEED: u64 = 0x517cc1b727220a95;

/// A MinHash signature: `H` running minimums of seeded hashes over every
/// token added so far, plus the `H` seeds used to compute them.
///
/// `mins` lives behind a mutex so `add`/`similarity`/`merge`/`reset` are all
/// safe under concurrent callers; `seeds` never changes after construction
/// and needs no synchronization to read.
#[derive(Debug)]
pub struct Signature {
    num_hashes: usize,
    seeds: Vec<u64>,
    mins: Mutex<Vec<u64>>,
}

/// `splitmix64`'s mixing step, minus the additive constant: used both to
/// derive seeds (applied to a running state) and, with `mix`, to combine a
/// token's FNV-1a hash with a per-slot seed.
fn splitmix64_next(state: &mut u64) -> u64 {
    *state = state.wrapping_add(SPLITMIX64_ADDITIVE);
    let mut z = *state;
    z = (z ^ (z >> MIX_SHIFTS.0)).wrapping_mul(MIX_MULTIPLIERS.0);
    z = (z ^ (z >> MIX_SHIFTS.1)).wrapping_mul(MIX_MULTIPLIERS.1);
    z ^ (z >> MIX_SHIFTS.2)
}

/// Derive `count` seeds from `base_seed` by iterating the splitmix64
/// recurrence: `seeds[i] = splitmix64^(i+1)(base_seed)`.
fn derive_seeds(base_seed: u64, count: usize) -> Vec<u64> {
    let mut state = base_seed;
    (0..count).map(|_| splitmix64_next(&mut state)).collect()
}

/// Combine a token's base hash with one slot's seed. Not the splitmix64
/// recurrence itself (no additive step) — just its avalanche mixer, applied
/// to `x ^ s`.
fn mix(x: u64, s: u64) -> u64 {
    let mut z = x ^ s;
    z = (z ^ (z >> MIX_SHIFTS.0)).wrapping_mul(MIX_MULTIPLIERS.0);
    z = (z ^ (z >> MIX_SHIFTS.1)).wrapping_mul(MIX_MULTIPLIERS.1);
    z ^ (z >> MIX_SHIFTS.2)
}

/// FNV-1a 64-bit hash of an arbitrary byte string.
fn fnv1a64(data: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(data);
    hasher.finish()
}

/// Lock both signatures' `mins` mutexes in a fixed global order (by
/// reference address) regardless of which is `a` and which is `b`, so two
/// concurrent calls with the operands swapped can never deadlock. The
/// returned guards still correspond to `a` and `b` respectively.
fn ordered_locks<'a>(
    a: &'a Signature,
    b: &'a Signature,
) -> (MutexGuard<'a, Vec<u64>>, MutexGuard<'a, Vec<u64>>) {
    let addr_a = a as *const Signature as usize;
    let addr_b = b as *const Signature as usize;
    if addr_a <= addr_b {
        let ga = a.mins.lock();
        let gb = b.mins.lock();
        (ga, gb)
    } else {
        let gb = b.mins.lock();
        let ga = a.mins.lock();
        (ga, gb)
    }
}

impl Signature {
    /// Build an empty signature (`num_hashes` slots, all at `u64::MAX`)
    /// using the default compatibility-contract base seed.
    pub fn new(num_hashes: usize) -> Result<Self> {
        Self::with_seed(num_hashes, DEFAULT_BASE_SEED)
    }

    /// Build an empty signature using a caller-supplied base seed, for
    /// calibration experiments that run at non-default parameters. Signatures
    /// built with different base seeds are not comparable via `similarity`
    /// even if `num_hashes` matches.
    pub fn with_seed(num_hashes: usize, base_seed: u64) -> Result<Self> {
        if num_hashes == 0 {
            return Err(Error::ZeroHashes(num_hashes));
        }
        Ok(Self {
            num_hashes,
            seeds: derive_seeds(base_seed, num_hashes),
            mins: Mutex::new(vec![u64::MAX; num_hashes]),
        })
    }

    /// Number of hash functions (signature length).
    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    /// Fold `token` into every slot: `mins[i] = min(mins[i], mix(fnv1a(token), seeds[i]))`.
    pub fn add(&self, token: &[u8]) {
        let base = fnv1a64(token);
        let mut mins = self.mins.lock();
        for (slot, seed) in mins.iter_mut().zip(self.seeds.iter()) {
            let h = mix(base, *seed);
            if h < *slot {
                *slot = h;
            }
        }
    }

    /// Fraction of slots where `self` and `other` agree: an unbiased
    /// estimator of the Jaccard similarity of the two underlying shingle
    /// multisets.
    pub fn similarity(&self, other: &Signature) -> Result<f64> {
        if self.num_hashes != other.num_hashes {
            return Err(Error::SizeMismatch {
                expected: self.num_hashes,
                actual: other.num_hashes,
            });
        }
        if std::ptr::eq(self, other) {
            return Ok(1.0);
        }
        let (a, b) = ordered_locks(self, other);
        let matches = a.iter().zip(b.iter()).filter(|(x, y)| x == y).count();
        Ok(matches as f64 / self.num_hashes as f64)
    }

    /// Element-wise minimum of `other` into `self`. A no-op if `other` is
    /// the same signature as `self`.
    pub fn merge(&self, other: &Signature) -> Result<()> {
        if self.num_hashes != other.num_hashes {
            return Err(Error::SizeMismatch {
                expected: self.num_hashes,
                actual: other.num_hashes,
            });
        }
        if std::ptr::eq(self, other) {
            return Ok(());
        }
        let (mut a, b) = ordered_locks(self, other);
        for (slot, other_slot) in a.iter_mut().zip(b.iter()) {
            if *other_slot < *slot {
                *slot = *other_slot;
            }
        }
        Ok(())
    }

    /// Reset every slot back to `u64::MAX`.
    pub fn reset(&self) {
        let mut mins = self.mins.lock();
        mins.iter_mut().for_each(|slot| *slot = u64::MAX);
    }

    /// `true` iff no token has ever been added.
    pub fn is_empty(&self) -> bool {
        self.mins.lock().iter().all(|&slot| slot == u64::MAX)
    }

    /// A point-in-time copy of the slot values, for callers (the LSH index)
    /// that need to read the raw minhashes without holding the signature's
    /// lock for the duration of their own work.
    pub fn snapshot(&self) -> Vec<u64> {
        self.mins.lock().clone()
    }

    /// Serialize: 4-byte big-endian `num_hashes`, then that many big-endian
    /// u64 slot values.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mins = self.mins.lock();
        let mut out = Vec::with_capacity(4 + 8 * mins.len());
        out.extend_from_slice(&(mins.len() as u32).to_be_bytes());
        for slot in mins.iter() {
            out.extend_from_slice(&slot.to_be_bytes());
        }
        out
    }

    /// Inverse of [`Signature::to_bytes`], re-deriving seeds from the
    /// default base seed (seeds are never serialized).
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_seed(data, DEFAULT_BASE_SEED)
    }

    /// As [`Signature::from_bytes`], but re-deriving seeds from a
    /// caller-supplied base seed.
    pub fn from_bytes_with_seed(data: &[u8], base_seed: u64) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::InvalidData(format!(
                "expected at least 4 header bytes, got {}",
                data.len()
            )));
        }
        let header: [u8; 4] = data[0..4].try_into().expect("checked length");
        let num_hashes = u32::from_be_bytes(header) as usize;
        if num_hashes == 0 {
            return Err(Error::ZeroHashes(num_hashes));
        }
        let expected_len = 4 + 8 * num_hashes;
        if data.len() != expected_len {
            return Err(Error::InvalidData(format!(
                "expected {expected_len} bytes for {num_hashes} hashes, got {}",
                data.len()
            )));
        }

        let mut mins = Vec::with_capacity(num_hashes);
        for chunk in data[4..].chunks_exact(8) {
            let bytes: [u8; 8] = chunk.try_into().expect("chunks_exact(8)");
            mins.push(u64::from_be_bytes(bytes));
        }

        trace!(num_hashes, "decoded signature from wire format");
        Ok(Self {
            num_hashes,
            seeds: derive_seeds(base_seed, num_hashes),
            mins: Mutex::new(mins),
        })
    }
}

/// Serializes as the wire format from [`Signature::to_bytes`], so a
/// `Signature` nested in a serialized [`crate::report::Report`] matches the
/// cross-implementation-stable byte layout rather than some ad-hoc JSON
/// shape.
impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Signature::from_bytes(&bytes).map_err(DeError::custom)
    }
}

impl Clone for Signature {
    /// A deep, independent copy: the clone's `mins` no longer shares a lock
    /// with the original.
    fn clone(&self) -> Self {
        let mins = self.mins.lock().clone();
        Self {
            num_hashes: self.num_hashes,
            seeds: self.seeds.clone(),
            mins: Mutex::new(mins),
        }
    }
}
