//! Lossy Counting algorithm for frequency estimation and heavy hitters
//!
//! Lossy Counting (Manku & Motwani, 2002) splits the stream into buckets of
//! `ceil(1/epsilon)` units of weight. Each tracked item carries a count and
//! the largest number of occurrences it could have had before it was tracked.
//! Whenever the bucket index advances, items whose count plus error cannot
//! exceed one occurrence per elapsed bucket are dropped.

use crate::error::{LossyCountError, Result};
use crate::frequency::bucket_width_for_epsilon;
use crate::traits::{CountBounds, FrequencySketch, HeavyHitters, Sketch};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use std::collections::HashMap;
use xxhash_rust::xxh3::Xxh3Builder;

/// Entry in the lossy counting table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    /// Occurrences counted since the entry was created
    count: u64,
    /// Maximum undercount, fixed at creation
    max_error: u64,
}

impl Entry {
    fn new(count: u64, max_error: u64) -> Self {
        Self { count, max_error }
    }

    /// An entry survives pruning while `count + max_error` exceeds the floor
    fn survives(&self, floor: u64) -> bool {
        self.count.saturating_add(self.max_error) > floor
    }
}

/// Lossy Counting sketch for approximate frequencies
///
/// With error tolerance `epsilon` and `N` units of weight seen so far, the
/// sketch guarantees for every item:
///
/// - `estimate(x) <= true_count(x) <= estimate(x) + error_bound(x)`
/// - `error_bound(x) <= ceil(N / bucket_width)`, i.e. roughly `epsilon * N`
///
/// and keeps `O((1/epsilon) * log(epsilon * N))` entries.
///
/// Pruning is lossy: an item that is dropped and later seen again starts from
/// a fresh count (with a correspondingly larger error bound), so its estimate
/// does not carry over the pruned value.
///
/// # Example
///
/// ```
/// use lossycount::frequency::LossyCounter;
/// use lossycount::traits::HeavyHitters;
///
/// let mut lc = LossyCounter::new(0.01).unwrap();
///
/// for _ in 0..100 { lc.add("apple"); }
/// for _ in 0..50 { lc.add("banana"); }
/// for _ in 0..25 { lc.add("cherry"); }
/// lc.update("date", 10).unwrap();
///
/// assert_eq!(lc.estimate("apple"), 100);
///
/// // Items with at least 20% of the stream
/// let heavy = lc.heavy_hitters(0.2);
/// println!("Heavy hitters: {:?}", heavy);
/// ```
#[derive(Clone)]
pub struct LossyCounter<K, S = Xxh3Builder> {
    /// Error tolerance
    epsilon: f64,
    /// Units of weight per bucket, `ceil(1/epsilon)`
    bucket_width: u64,
    /// `ceil(total_count / bucket_width)`
    current_bucket: u64,
    /// Total weight of all observations
    total_count: u64,
    /// Number of accepted non-zero updates
    num_updates: u64,
    /// Tracked items
    entries: HashMap<K, Entry, S>,
}

impl<K: Hash + Eq> LossyCounter<K> {
    /// Create a new lossy counter with the given error tolerance
    ///
    /// # Arguments
    ///
    /// * `epsilon` - Maximum undercount as a fraction of the stream (e.g. 0.001)
    ///
    /// # Errors
    ///
    /// Returns [`LossyCountError::InvalidParameter`] if epsilon is not in (0, 1)
    pub fn new(epsilon: f64) -> Result<Self> {
        Self::with_hasher(epsilon, Xxh3Builder::new())
    }
}

impl<K: Hash + Eq, S: BuildHasher> LossyCounter<K, S> {
    /// Create a lossy counter that hashes keys with `hasher`
    pub fn with_hasher(epsilon: f64, hasher: S) -> Result<Self> {
        // Also rejects NaN
        if !(epsilon > 0.0 && epsilon < 1.0) {
            return Err(LossyCountError::InvalidParameter {
                name: "epsilon",
                value: epsilon,
            });
        }

        let bucket_width = bucket_width_for_epsilon(epsilon);

        #[cfg(feature = "tracing")]
        tracing::debug!(epsilon, bucket_width, "created lossy counter");

        Ok(Self {
            epsilon,
            bucket_width,
            current_bucket: 0,
            total_count: 0,
            num_updates: 0,
            entries: HashMap::with_hasher(hasher),
        })
    }

    /// Get the error tolerance
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Get the bucket width, `ceil(1/epsilon)`
    pub fn bucket_width(&self) -> u64 {
        self.bucket_width
    }

    /// Get the index of the bucket in progress
    pub fn current_bucket(&self) -> u64 {
        self.current_bucket
    }

    /// Get the total weight observed
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Get the number of entries currently tracked
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Record one occurrence of `key`
    pub fn add(&mut self, key: K) {
        self.add_weight(key, 1);
    }

    /// Record `weight` occurrences of `key`
    ///
    /// A zero weight leaves the sketch untouched.
    ///
    /// # Errors
    ///
    /// Returns [`LossyCountError::InvalidArgument`] for a negative weight; the
    /// sketch is not modified.
    pub fn update(&mut self, key: K, weight: i64) -> Result<()> {
        if weight < 0 {
            return Err(LossyCountError::InvalidArgument {
                name: "weight",
                value: weight,
            });
        }
        if weight > 0 {
            self.add_weight(key, weight as u64);
        }
        Ok(())
    }

    fn add_weight(&mut self, key: K, weight: u64) {
        let previous_bucket = self.current_bucket;

        self.num_updates += 1;
        self.total_count = self.total_count.saturating_add(weight);

        // A new key may have occurred up to once per completed bucket before now
        self.entries
            .entry(key)
            .and_modify(|e| e.count = e.count.saturating_add(weight))
            .or_insert_with(|| Entry::new(weight, previous_bucket));

        self.current_bucket = self.total_count.div_ceil(self.bucket_width);
        if self.current_bucket > previous_bucket {
            self.prune();
        }
    }

    /// Drop every entry with `count + max_error <= current_bucket - 1`
    fn prune(&mut self) {
        let floor = self.current_bucket - 1;

        #[cfg(feature = "tracing")]
        let before = self.entries.len();

        self.entries.retain(|_, e| e.survives(floor));

        #[cfg(feature = "tracing")]
        tracing::trace!(
            bucket = self.current_bucket,
            pruned = before - self.entries.len(),
            retained = self.entries.len(),
            "lossy counter pruning pass"
        );
    }

    /// Estimate the frequency of an item
    ///
    /// Returns 0 for items that are not tracked. The estimate never exceeds
    /// the true frequency.
    pub fn estimate<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|e| e.count).unwrap_or(0)
    }

    /// Get the maximum undercount of an item's estimate
    ///
    /// Untracked items report the current bucket index: the most they could
    /// have occurred without being retained.
    pub fn error_bound<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .get(key)
            .map(|e| e.max_error)
            .unwrap_or(self.current_bucket)
    }

    /// Get the bounds on an item's true frequency
    pub fn bounds<Q>(&self, key: &Q) -> CountBounds
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let lower = self.estimate(key);
        CountBounds::new(lower, lower.saturating_add(self.error_bound(key)))
    }

    /// Check if an item is currently tracked
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Iterate over tracked items as `(key, count, max_error)`
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64, u64)> + '_ {
        self.entries.iter().map(|(k, e)| (k, e.count, e.max_error))
    }

    /// Get every tracked item whose estimate is at least `min_count`
    ///
    /// Items whose true frequency is at least `min_count + error_bound` are
    /// always reported. Because estimates never exceed true frequencies, every
    /// reported item really occurred at least `min_count` times. Order is
    /// unspecified.
    pub fn enumerate_above_threshold(&self, min_count: u64) -> Vec<(K, u64)>
    where
        K: Clone,
    {
        self.entries
            .iter()
            .filter(|(_, e)| e.count >= min_count)
            .map(|(k, e)| (k.clone(), e.count))
            .collect()
    }
}

impl<K, S> core::fmt::Debug for LossyCounter<K, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LossyCounter")
            .field("epsilon", &self.epsilon)
            .field("bucket_width", &self.bucket_width)
            .field("current_bucket", &self.current_bucket)
            .field("total_count", &self.total_count)
            .field("num_updates", &self.num_updates)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<K, S> Sketch for LossyCounter<K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher + Clone,
{
    type Item = K;

    fn update(&mut self, item: &K) {
        self.add(item.clone());
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.current_bucket = 0;
        self.total_count = 0;
        self.num_updates = 0;
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.entries.capacity() * (core::mem::size_of::<K>() + core::mem::size_of::<Entry>())
    }

    fn count(&self) -> u64 {
        self.num_updates
    }
}

impl<K, S> FrequencySketch for LossyCounter<K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher + Clone,
{
    fn estimate_frequency(&self, item: &K) -> u64 {
        self.estimate(item)
    }

    fn frequency_bounds(&self, item: &K) -> CountBounds {
        self.bounds(item)
    }
}

impl<K, S> HeavyHitters for LossyCounter<K, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher + Clone,
{
    /// Items whose estimate is at least `support * N - current_bucket`
    ///
    /// This is the classic `(support - epsilon) * N` output rule: every item
    /// with true frequency of at least `support * N` is returned, and no item
    /// below `(support - epsilon) * N` is.
    fn heavy_hitters(&self, support: f64) -> Vec<(K, u64)> {
        let target = (support.clamp(0.0, 1.0) * self.total_count as f64).ceil() as u64;
        self.enumerate_above_threshold(target.saturating_sub(self.current_bucket))
    }

    fn top_k(&self, k: usize) -> Vec<(K, u64)> {
        let mut items: Vec<_> = self
            .entries
            .iter()
            .map(|(key, e)| (key.clone(), e.count))
            .collect();

        items.sort_by(|a, b| b.1.cmp(&a.1));
        items.truncate(k);
        items
    }
}

#[cfg(feature = "serde")]
impl<K: Hash + Eq + serde::Serialize, S: BuildHasher> serde::Serialize for LossyCounter<K, S> {
    fn serialize<Ser>(&self, serializer: Ser) -> core::result::Result<Ser::Ok, Ser::Error>
    where
        Ser: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let items: Vec<_> = self.iter().collect();

        let mut state = serializer.serialize_struct("LossyCounter", 5)?;
        state.serialize_field("epsilon", &self.epsilon)?;
        state.serialize_field("bucket_width", &self.bucket_width)?;
        state.serialize_field("current_bucket", &self.current_bucket)?;
        state.serialize_field("total_count", &self.total_count)?;
        state.serialize_field("items", &items)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        let mut lc = LossyCounter::<String>::new(0.01).unwrap();

        lc.add("apple".to_string());
        lc.add("apple".to_string());
        lc.add("banana".to_string());

        assert_eq!(lc.estimate("apple"), 2);
        assert_eq!(lc.estimate("banana"), 1);
        assert_eq!(lc.total_count(), 3);
        assert_eq!(lc.size(), 2);
    }

    #[test]
    fn test_empty() {
        let lc = LossyCounter::<String>::new(0.01).unwrap();
        assert_eq!(lc.estimate("anything"), 0);
        assert_eq!(lc.error_bound("anything"), 0);
        assert_eq!(lc.total_count(), 0);
        assert_eq!(lc.current_bucket(), 0);
        assert_eq!(lc.size(), 0);
        assert!(Sketch::is_empty(&lc));
    }

    #[test]
    fn test_bucket_width() {
        let lc = LossyCounter::<u32>::new(0.1).unwrap();
        assert_eq!(lc.bucket_width(), 10);
        assert_eq!(lc.epsilon(), 0.1);

        let lc = LossyCounter::<u32>::new(0.3).unwrap();
        assert_eq!(lc.bucket_width(), 4);
    }

    #[test]
    fn test_invalid_epsilon() {
        for epsilon in [0.0, 1.0, 1.5, -0.1, f64::NAN, f64::INFINITY] {
            let err = LossyCounter::<u32>::new(epsilon).unwrap_err();
            assert!(
                matches!(err, LossyCountError::InvalidParameter { name: "epsilon", .. }),
                "epsilon {} accepted",
                epsilon
            );
        }
    }

    #[test]
    fn test_hot_then_cold() {
        // bucket_width = 10; "b" arrives in bucket 3 with max_error 3
        let mut lc = LossyCounter::<&str>::new(0.1).unwrap();

        for _ in 0..25 {
            lc.update("a", 1).unwrap();
        }
        for _ in 0..5 {
            lc.update("b", 1).unwrap();
        }

        assert_eq!(lc.estimate("a"), 25);
        assert_eq!(lc.error_bound("a"), 0);
        assert_eq!(lc.estimate("b"), 5);
        assert_eq!(lc.error_bound("b"), 3);
        assert_eq!(lc.current_bucket(), 3);
        assert!(lc.size() <= 3);
    }

    #[test]
    fn test_cold_key_pruned() {
        let mut lc = LossyCounter::<&str>::new(0.1).unwrap();

        lc.add("b");
        for _ in 0..20 {
            lc.add("a");
        }

        // Crossing into bucket 2 dropped "b" (1 + 0 <= 1)
        assert!(!lc.contains("b"));
        assert_eq!(lc.estimate("b"), 0);
        assert_eq!(lc.error_bound("b"), 3);
        assert_eq!(lc.estimate("a"), 20);
        assert_eq!(lc.size(), 1);

        // Reappears with a fresh count, not the pruned one
        lc.add("b");
        assert_eq!(lc.estimate("b"), 1);
        assert_eq!(lc.error_bound("b"), 3);
    }

    #[test]
    fn test_prune_on_boundary() {
        // bucket_width = 2
        let mut lc = LossyCounter::<char>::new(0.5).unwrap();

        lc.add('a'); // total 1, bucket 1, max_error 0
        lc.add('b'); // total 2, bucket 1, max_error 1
        assert_eq!(lc.size(), 2);

        lc.add('c'); // total 3, bucket 2: prune count + max_error <= 1
        assert!(!lc.contains(&'a'));
        assert!(lc.contains(&'b'));
        assert!(lc.contains(&'c'));
        assert_eq!(lc.error_bound(&'c'), 1);
    }

    #[test]
    fn test_weight_spanning_buckets() {
        let mut lc = LossyCounter::<&str>::new(0.1).unwrap();

        lc.add("x");
        lc.update("y", 35).unwrap();

        // Jumped from bucket 1 to bucket 4 in one update
        assert_eq!(lc.current_bucket(), 4);
        assert!(!lc.contains("x"));
        assert_eq!(lc.estimate("y"), 35);
        assert_eq!(lc.error_bound("y"), 1);
        assert_eq!(lc.size(), 1);
    }

    #[test]
    fn test_negative_weight() {
        let mut lc = LossyCounter::<&str>::new(0.1).unwrap();
        lc.update("a", 7).unwrap();

        let err = lc.update("a", -1).unwrap_err();
        assert_eq!(
            err,
            LossyCountError::InvalidArgument {
                name: "weight",
                value: -1
            }
        );

        assert!(lc.update("new", -5).is_err());

        assert_eq!(lc.estimate("a"), 7);
        assert_eq!(lc.size(), 1);
        assert_eq!(lc.total_count(), 7);
        assert!(!lc.contains("new"));
    }

    #[test]
    fn test_zero_weight() {
        let mut lc = LossyCounter::<&str>::new(0.1).unwrap();
        for _ in 0..15 {
            lc.add("a");
        }

        lc.update("a", 0).unwrap();
        lc.update("unseen", 0).unwrap();

        assert_eq!(lc.estimate("a"), 15);
        assert_eq!(lc.error_bound("a"), 0);
        assert_eq!(lc.error_bound("unseen"), 2);
        assert!(!lc.contains("unseen"));
        assert_eq!(lc.size(), 1);
        assert_eq!(lc.total_count(), 15);
        assert_eq!(lc.count(), 15);
    }

    #[test]
    fn test_bounds() {
        let mut lc = LossyCounter::<&str>::new(0.1).unwrap();
        for _ in 0..25 {
            lc.add("a");
        }
        lc.add("b");

        assert_eq!(lc.bounds("a"), CountBounds::new(25, 25));
        assert_eq!(lc.bounds("b"), CountBounds::new(1, 4));
        assert_eq!(lc.frequency_bounds(&"b"), lc.bounds("b"));
        assert!(lc.bounds("never").contains(0));
    }

    #[test]
    fn test_enumerate_above_threshold() {
        let mut lc = LossyCounter::<&str>::new(0.1).unwrap();
        for _ in 0..25 {
            lc.add("a");
        }
        for _ in 0..5 {
            lc.add("b");
        }

        let above = lc.enumerate_above_threshold(10);
        assert_eq!(above, vec![("a", 25)]);

        let mut all = lc.enumerate_above_threshold(0);
        all.sort();
        assert_eq!(all, vec![("a", 25), ("b", 5)]);

        assert!(lc.enumerate_above_threshold(26).is_empty());
    }

    #[test]
    fn test_heavy_hitters() {
        let mut lc = LossyCounter::<&str>::new(0.01).unwrap();

        for _ in 0..100 {
            lc.add("apple");
        }
        for _ in 0..10 {
            lc.add("banana");
        }
        lc.add("cherry");

        // Items with >= 5% of total
        let heavy = lc.heavy_hitters(0.05);
        assert!(heavy.iter().any(|(item, _)| *item == "apple"));
        assert!(heavy.iter().any(|(item, _)| *item == "banana"));
        assert!(!heavy.iter().any(|(item, _)| *item == "cherry"));
    }

    #[test]
    fn test_top_k() {
        let mut lc = LossyCounter::<&str>::new(0.01).unwrap();

        for _ in 0..100 {
            lc.add("apple");
        }
        for _ in 0..50 {
            lc.add("banana");
        }
        for _ in 0..25 {
            lc.add("cherry");
        }

        let top = lc.top_k(2);
        assert_eq!(top, vec![("apple", 100), ("banana", 50)]);
        assert_eq!(lc.top_k(10).len(), 3);
    }

    #[test]
    fn test_iter() {
        let mut lc = LossyCounter::<u32>::new(0.1).unwrap();
        for _ in 0..12 {
            lc.add(1);
        }
        lc.add(2);

        let mut items: Vec<_> = lc.iter().map(|(k, c, e)| (*k, c, e)).collect();
        items.sort();
        assert_eq!(items, vec![(1, 12, 0), (2, 1, 2)]);
    }

    #[test]
    fn test_sketch_trait() {
        let mut lc = LossyCounter::<String>::new(0.1).unwrap();
        let item = "apple".to_string();

        Sketch::update(&mut lc, &item);
        Sketch::update(&mut lc, &item);

        assert_eq!(lc.count(), 2);
        assert_eq!(lc.estimate_frequency(&item), 2);
        assert!(lc.exceeds_threshold(&item, 2));
        assert!(lc.size_bytes() >= core::mem::size_of::<LossyCounter<String>>());
    }

    #[test]
    fn test_clear() {
        let mut lc = LossyCounter::<&str>::new(0.1).unwrap();

        for _ in 0..30 {
            lc.add("apple");
        }
        lc.add("banana");

        lc.clear();

        assert_eq!(lc.size(), 0);
        assert_eq!(lc.total_count(), 0);
        assert_eq!(lc.current_bucket(), 0);
        assert!(!lc.contains("apple"));

        // Behaves like a fresh counter
        lc.add("banana");
        assert_eq!(lc.error_bound("banana"), 0);
    }

    #[test]
    fn test_custom_hasher() {
        use std::collections::hash_map::RandomState;

        let mut lc = LossyCounter::<u64, _>::with_hasher(0.1, RandomState::new()).unwrap();
        for i in 0..100 {
            lc.add(i % 3);
        }
        assert_eq!(lc.estimate(&0), 34);
        assert_eq!(lc.total_count(), 100);
    }

    #[test]
    fn test_debug() {
        let mut lc = LossyCounter::<&str>::new(0.1).unwrap();
        lc.add("a");

        let s = format!("{:?}", lc);
        assert!(s.contains("LossyCounter"));
        assert!(s.contains("bucket_width: 10"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize() {
        let mut lc = LossyCounter::<&str>::new(0.1).unwrap();
        lc.update("a", 12).unwrap();

        let json = serde_json::to_value(&lc).unwrap();
        assert_eq!(json["bucket_width"], 10);
        assert_eq!(json["total_count"], 12);
        assert_eq!(json["current_bucket"], 2);
        assert_eq!(json["items"][0][0], "a");
        assert_eq!(json["items"][0][1], 12);
    }
}
