//! Weighted selection on top of [`WeightedIndex::find`].
//!
//! A draw picks a point in `[0, total)` and maps it back to the entry whose
//! range contains it, so every key is chosen with probability proportional
//! to its weight. Points come either from a seed, which makes the draw
//! reproducible by anyone holding the same seed and index, or from an rng.

use tracing::debug;

use crate::tree::WeightedIndex;

/// Type constant for hashing a seed into a point.
pub const TYPE_POINT: u8 = 0x00;

/// Type constant for deriving the seed of one selection round.
pub const TYPE_ROUND: u8 = 0x01;

/// Derive a point uniformly distributed in `[0, total)` from a seed.
///
/// Successive little-endian words are read from the blake3 output stream of
/// the seed until one falls below the largest multiple of `total`, so the
/// final modulo is unbiased. Returns None if `total` is not positive.
pub fn point_from_seed(seed: &[u8], total: i64) -> Option<i64> {
    if total <= 0 {
        return None;
    }

    let mut hasher = blake3::Hasher::new();
    hasher.update(&[TYPE_POINT]);
    hasher.update(&(seed.len() as u64).to_le_bytes());
    hasher.update(seed);
    let mut stream = hasher.finalize_xof();

    let bound = total as u64;
    let zone = u64::MAX - u64::MAX % bound;
    loop {
        let mut word = [0u8; 8];
        stream.fill(&mut word);
        let value = u64::from_le_bytes(word);
        if value < zone {
            return Some((value % bound) as i64);
        }
    }
}

/// Seed for round `round` of a multi-draw selection.
fn round_seed(seed: &[u8], round: u64) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[TYPE_ROUND]);
    hasher.update(&(seed.len() as u64).to_le_bytes());
    hasher.update(seed);
    hasher.update(&round.to_le_bytes());
    *hasher.finalize().as_bytes()
}

impl<K: Ord + Clone> WeightedIndex<K> {
    /// Deterministically pick a key, weighted, from a seed.
    /// None if the index holds no positive weight.
    pub fn draw(&self, seed: &[u8]) -> Option<&K> {
        let point = point_from_seed(seed, self.total())?;
        self.find(point)
    }

    /// Deterministically pick up to `count` distinct keys.
    ///
    /// Each round draws from what is left after removing the keys chosen in
    /// earlier rounds, so the odds shift toward the remaining entries.
    /// Stops early once no positive weight remains.
    pub fn select(&self, seed: &[u8], count: usize) -> Vec<K> {
        let mut pool = self.clone();
        let mut chosen = Vec::with_capacity(count.min(self.len()));

        for round in 0..count as u64 {
            let Some(key) = pool.draw(&round_seed(seed, round)).cloned() else {
                break;
            };
            pool.remove(&key);
            chosen.push(key);
        }

        debug!(requested = count, selected = chosen.len(), "weighted selection");
        chosen
    }

    /// Pick a key, weighted, using `rng`.
    /// None if the index holds no positive weight.
    #[cfg(feature = "rand")]
    pub fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Option<&K> {
        let total = self.total();
        if total <= 0 {
            return None;
        }
        self.find(rng.gen_range(0..total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validators() -> WeightedIndex<&'static str> {
        [("ana", 10), ("bo", 30), ("cy", 0), ("di", 60)].into_iter().collect()
    }

    #[test]
    fn point_within_total() {
        for total in [1i64, 2, 3, 7, 100, 1 << 40, i64::MAX] {
            for i in 0u32..50 {
                let point = point_from_seed(&i.to_le_bytes(), total).unwrap();
                assert!((0..total).contains(&point), "{} not in 0..{}", point, total);
            }
        }
    }

    #[test]
    fn point_needs_positive_total() {
        assert_eq!(point_from_seed(b"seed", 0), None);
        assert_eq!(point_from_seed(b"seed", -5), None);
    }

    #[test]
    fn point_is_deterministic() {
        let a = point_from_seed(b"epoch 12", 1_000_003);
        let b = point_from_seed(b"epoch 12", 1_000_003);
        let c = point_from_seed(b"epoch 13", 1_000_003);
        assert_eq!(a, b);
        // Distinct seeds landing on the same point out of a million is
        // possible but would point to the seed being ignored.
        assert_ne!(a, c);
    }

    #[test]
    fn draw_hits_positive_weight() {
        let index = validators();
        for i in 0u32..200 {
            let key = index.draw(&i.to_le_bytes()).unwrap();
            assert_ne!(*key, "cy");
            assert!(index.get(key).unwrap().0 > 0);
        }
    }

    #[test]
    fn draw_is_roughly_proportional() {
        let index = validators();
        let mut counts = [0usize; 3];
        for i in 0u32..10_000 {
            match *index.draw(&i.to_le_bytes()).unwrap() {
                "ana" => counts[0] += 1,
                "bo" => counts[1] += 1,
                "di" => counts[2] += 1,
                other => panic!("unexpected draw {}", other),
            }
        }
        // Expected 1000 / 3000 / 6000, allow a wide margin.
        assert!((700..1300).contains(&counts[0]), "{:?}", counts);
        assert!((2500..3500).contains(&counts[1]), "{:?}", counts);
        assert!((5400..6600).contains(&counts[2]), "{:?}", counts);
    }

    #[test]
    fn draw_on_empty() {
        let index: WeightedIndex<u8> = WeightedIndex::new();
        assert_eq!(index.draw(b"anything"), None);
    }

    #[test]
    fn select_distinct() {
        let index = validators();
        let chosen = index.select(b"committee", 2);
        assert_eq!(chosen.len(), 2);
        assert_ne!(chosen[0], chosen[1]);
        assert!(!chosen.contains(&"cy"));
        assert_eq!(chosen, index.select(b"committee", 2));

        // The index itself is untouched
        assert_eq!(index.len(), 4);
        assert_eq!(index.total(), 100);
    }

    #[test]
    fn select_stops_without_weight() {
        let index = validators();
        let mut chosen = index.select(b"everyone", 10);
        assert_eq!(chosen.len(), 3);
        chosen.sort();
        assert_eq!(chosen, vec!["ana", "bo", "di"]);
    }

    #[cfg(feature = "rand")]
    #[test]
    fn sample_with_rng() {
        use rand::SeedableRng;
        use rand::rngs::StdRng;

        let index = validators();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_ne!(index.sample(&mut rng), Some(&"cy"));
            assert!(index.sample(&mut rng).is_some());
        }

        let empty: WeightedIndex<u8> = WeightedIndex::new();
        assert_eq!(empty.sample(&mut rng), None);
    }
}
