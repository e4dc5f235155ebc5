//! Path-scoped random streams
//!
//! Every value-generation site gets its own stream, seeded from the root
//! seed and a hash of the site's [`ValuePath`]. Streams hold no shared state,
//! so two sites never influence each other's draws.

use super::value_path::{ValuePath, SEGMENT_SEPARATOR};
use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// First instant handed out by [`GeneratorStream::next_instant`], 2020-01-01T00:00:00Z
pub const INSTANT_RANGE_START: i64 = 1_577_836_800;

/// End of the instant range (exclusive), 2040-01-01T00:00:00Z
pub const INSTANT_RANGE_END: i64 = 2_208_988_800;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Derives per-path streams from a root seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorFactory {
    seed: u64,
}

impl GeneratorFactory {
    /// Create a factory for `seed`
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// The root seed
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fresh stream for `path`; equal paths always give identical streams
    pub fn for_path(&self, path: &ValuePath) -> GeneratorStream {
        GeneratorStream::from_seed(self.stream_seed(path))
    }

    fn stream_seed(&self, path: &ValuePath) -> u64 {
        mix(path_hash(path), self.seed)
    }
}

/// FNV-1a over the segments, each followed by the separator
fn path_hash(path: &ValuePath) -> u64 {
    let mut separator = [0u8; 4];
    let separator = SEGMENT_SEPARATOR.encode_utf8(&mut separator).as_bytes();

    let mut hash = FNV_OFFSET_BASIS;
    for segment in path.segments() {
        for byte in segment.as_bytes().iter().chain(separator) {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// SplitMix64 finalizer over the path hash and the root seed
fn mix(path_hash: u64, seed: u64) -> u64 {
    let mut z = path_hash ^ seed.wrapping_mul(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Deterministic stream of draws for one site
///
/// Ranges are half-open. An empty or inverted range yields its lower bound
/// without consuming the stream.
#[derive(Debug, Clone)]
pub struct GeneratorStream {
    rng: StdRng,
}

impl GeneratorStream {
    /// Stream seeded directly
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `[lo, hi)`
    pub fn next_int(&mut self, lo: i32, hi: i32) -> i32 {
        if lo >= hi {
            lo
        } else {
            self.rng.gen_range(lo..hi)
        }
    }

    /// Uniform long in `[lo, hi)`
    pub fn next_long(&mut self, lo: i64, hi: i64) -> i64 {
        if lo >= hi {
            lo
        } else {
            self.rng.gen_range(lo..hi)
        }
    }

    /// Uniform double in `[lo, hi)`
    pub fn next_double(&mut self, lo: f64, hi: f64) -> f64 {
        if lo >= hi {
            lo
        } else {
            self.rng.gen_range(lo..hi)
        }
    }

    /// Fair coin
    pub fn next_bool(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// One item drawn uniformly, `None` for an empty slice
    pub fn next_choice<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..items.len());
        items.get(index)
    }

    /// Lowercase ASCII letters
    pub fn next_token(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| char::from(self.rng.gen_range(b'a'..=b'z')))
            .collect()
    }

    /// Whole-second instant in [`INSTANT_RANGE_START`, `INSTANT_RANGE_END`)
    pub fn next_instant(&mut self) -> DateTime<Utc> {
        let secs = self.next_long(INSTANT_RANGE_START, INSTANT_RANGE_END);
        Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> ValuePath {
        segments
            .iter()
            .fold(ValuePath::new(), |path, segment| path.append_name(*segment))
    }

    #[test]
    fn test_same_path_same_stream() {
        let factory = GeneratorFactory::new(42);
        let mut a = factory.for_path(&path(&["root", "a", "0"]));
        let mut b = factory.for_path(&path(&["root", "a", "0"]));
        for _ in 0..16 {
            assert_eq!(a.next_long(0, 1_000_000), b.next_long(0, 1_000_000));
        }
        assert_eq!(a.next_token(12), b.next_token(12));
    }

    #[test]
    fn test_paths_and_seeds_are_independent() {
        let first: Vec<i64> = {
            let mut s = GeneratorFactory::new(42).for_path(&path(&["root", "a"]));
            (0..8).map(|_| s.next_long(0, i64::MAX)).collect()
        };
        let other_path: Vec<i64> = {
            let mut s = GeneratorFactory::new(42).for_path(&path(&["root", "b"]));
            (0..8).map(|_| s.next_long(0, i64::MAX)).collect()
        };
        let other_seed: Vec<i64> = {
            let mut s = GeneratorFactory::new(43).for_path(&path(&["root", "a"]));
            (0..8).map(|_| s.next_long(0, i64::MAX)).collect()
        };
        assert_ne!(first, other_path);
        assert_ne!(first, other_seed);
    }

    #[test]
    fn test_segment_boundaries_matter() {
        assert_ne!(path_hash(&path(&["ab", "c"])), path_hash(&path(&["a", "bc"])));
    }

    #[test]
    fn test_empty_ranges_return_lower_bound() {
        let mut s = GeneratorStream::from_seed(1);
        assert_eq!(s.next_int(5, 5), 5);
        assert_eq!(s.next_long(7, 3), 7);
        assert_eq!(s.next_double(1.5, 1.5), 1.5);
        assert_eq!(s.next_long(1, 2), 1);
    }

    #[test]
    fn test_draw_bounds() {
        let mut s = GeneratorStream::from_seed(7);
        for _ in 0..1000 {
            let v = s.next_int(1000, 9999);
            assert!((1000..9999).contains(&v));
            let d = s.next_double(0.0, 10.0);
            assert!((0.0..10.0).contains(&d));
            let t = s.next_instant().timestamp();
            assert!((INSTANT_RANGE_START..INSTANT_RANGE_END).contains(&t));
        }
    }

    #[test]
    fn test_token_and_choice() {
        let mut s = GeneratorStream::from_seed(3);
        let token = s.next_token(6);
        assert_eq!(token.len(), 6);
        assert!(token.chars().all(|c| c.is_ascii_lowercase()));

        let items = ["x", "y", "z"];
        assert!(items.contains(s.next_choice(&items).unwrap()));
        assert_eq!(s.next_choice::<&str>(&[]), None);
    }
}
