//! Soseg - a sorted sum tree for weighted selection.
//!
//! Entries are `(key, weight)` pairs kept in key order. Each entry owns the
//! half-open range `[offset, offset + weight)`, where offset is the sum of
//! the weights of all smaller keys, so the ranges tile `[0, total)`. The
//! tree answers "where does this key start?" and "which key covers this
//! point?" in time proportional to its height.
//!
//! # Quick Start
//!
//! ```
//! use soseg::WeightedIndex;
//!
//! let mut stake = WeightedIndex::new();
//! stake.put("ana", 10);
//! stake.put("bo", 30);
//! stake.put("di", 60);
//!
//! // bo owns points 10..40
//! assert_eq!(stake.get(&"bo"), Some((30, 10)));
//! assert_eq!(stake.find(39), Some(&"bo"));
//!
//! // Reproducible weighted pick from a seed
//! let leader = stake.draw(b"epoch 7").unwrap();
//! assert!(stake.contains_key(leader));
//! ```

pub mod sample;
pub mod tree;

pub use sample::point_from_seed;
pub use tree::Iter;
pub use tree::WeightedIndex;
