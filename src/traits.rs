//! Core traits for streaming frequency sketches
//!
//! Every sketch implements the base [`Sketch`] trait; frequency estimators add
//! [`FrequencySketch`] and, when they can enumerate their tracked items,
//! [`HeavyHitters`].

use core::fmt::Debug;

/// Deterministic bounds on the true frequency of an item
///
/// Unlike probabilistic sketches there is no confidence level: the true
/// frequency is always within `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CountBounds {
    /// Guaranteed minimum (the reported estimate)
    pub lower: u64,
    /// Guaranteed maximum
    pub upper: u64,
}

impl CountBounds {
    /// Create new count bounds
    pub fn new(lower: u64, upper: u64) -> Self {
        debug_assert!(lower <= upper, "lower bound exceeds upper bound");
        Self { lower, upper }
    }

    /// Check if a count falls within bounds
    pub fn contains(&self, count: u64) -> bool {
        count >= self.lower && count <= self.upper
    }

    /// Width of the interval (the maximum undercount)
    pub fn width(&self) -> u64 {
        self.upper - self.lower
    }
}

/// Core trait for all streaming sketches
pub trait Sketch: Clone + Debug {
    /// The type of item this sketch processes
    type Item: ?Sized;

    /// Record one occurrence of an item
    fn update(&mut self, item: &Self::Item);

    /// Reset sketch to empty state
    fn clear(&mut self);

    /// Memory usage in bytes
    fn size_bytes(&self) -> usize;

    /// Number of updates processed
    fn count(&self) -> u64;

    /// Check if sketch is empty
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Frequency estimation sketches
pub trait FrequencySketch: Sketch {
    /// Estimate frequency of an item
    fn estimate_frequency(&self, item: &Self::Item) -> u64;

    /// Bounds on the true frequency of an item
    fn frequency_bounds(&self, item: &Self::Item) -> CountBounds;

    /// Check if frequency exceeds threshold
    fn exceeds_threshold(&self, item: &Self::Item, threshold: u64) -> bool {
        self.estimate_frequency(item) >= threshold
    }
}

/// Heavy hitters / Top-K capability
pub trait HeavyHitters: FrequencySketch
where
    Self::Item: Sized + Clone,
{
    /// Get items whose frequency may reach `support` of the total count
    ///
    /// Support is a fraction of total count (0.0 to 1.0)
    fn heavy_hitters(&self, support: f64) -> Vec<(Self::Item, u64)>;

    /// Get top-k most frequent items
    fn top_k(&self, k: usize) -> Vec<(Self::Item, u64)>;
}
