//! Frequency estimation algorithms
//!
//! This module provides sketches for estimating item frequencies and finding
//! frequent items in a data stream.
//!
//! # Algorithms
//!
//! - [`LossyCounter`]: Lossy Counting with bucket-boundary pruning
//!
//! # Example
//!
//! ```
//! use lossycount::frequency::LossyCounter;
//!
//! let mut lc = LossyCounter::new(0.01).unwrap(); // undercount at most 1% of the stream
//!
//! lc.update("item1", 5).unwrap();
//! lc.update("item2", 3).unwrap();
//!
//! let count = lc.estimate("item1");
//! println!("Estimated count: {}", count);
//! ```

mod lossy_count;

pub use lossy_count::LossyCounter;

/// Compute the bucket width for an error tolerance
///
/// The stream is divided into buckets of `ceil(1 / epsilon)` units of weight.
pub fn bucket_width_for_epsilon(epsilon: f64) -> u64 {
    ((1.0 / epsilon).ceil() as u64).max(1)
}

/// Conventional error tolerance for a target support
///
/// Heavy-hitter queries at support `s` are usually run with `epsilon = s / 10`,
/// which keeps false positives within a tenth of the threshold.
pub fn epsilon_for_support(support: f64) -> f64 {
    support / 10.0
}

/// Upper bound on the number of entries retained after `n` units of weight
///
/// Lossy Counting keeps at most `(1/epsilon) * log(epsilon * n)` entries for
/// completed buckets; two more buckets' worth of entries are added for the
/// bucket in progress and for entries that survive one extra boundary because
/// their error is taken from the bucket index before insertion.
pub fn entry_bound(epsilon: f64, n: u64) -> usize {
    let width = bucket_width_for_epsilon(epsilon) as f64;
    let buckets = (epsilon * n as f64).max(1.0);
    (width * (buckets.log2() + 2.0)).ceil() as usize
}
