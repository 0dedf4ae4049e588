//! # Lossycount
//!
//! Bounded-memory frequency estimation for data streams.
//!
//! Lossycount implements the Lossy Counting algorithm: it answers "how often
//! has this item appeared?" and "which items make up at least a fraction of
//! the stream?" with deterministic error bounds, while keeping memory
//! logarithmic in the stream length.
//!
//! ## Features
//!
//! - **Point Estimates**: Lower-bound counts with a per-item maximum undercount
//! - **Heavy Hitters**: Enumerate frequent items by absolute count or support
//! - **Weighted Updates**: Add any non-negative weight per observation
//! - **Error Bounds**: Undercount never exceeds `ceil(epsilon * N)`
//!
//! ## Quick Start
//!
//! ```rust
//! use lossycount::prelude::*;
//!
//! let mut lc = LossyCounter::new(0.001).unwrap();
//! for page in ["/home", "/about", "/home", "/home"] {
//!     lc.add(page);
//! }
//! println!("/home viewed ~{} times", lc.estimate("/home"));
//! ```
//!
//! ## Thread Safety
//!
//! Updates take `&mut self` and queries take `&self`. Share a counter across
//! threads behind a lock, with one writer at a time:
//!
//! ```rust
//! use std::sync::Mutex;
//! use lossycount::frequency::LossyCounter;
//!
//! let lc = Mutex::new(LossyCounter::new(0.01).unwrap());
//! lc.lock().unwrap().update("event", 3).unwrap();
//! assert_eq!(lc.lock().unwrap().estimate("event"), 3);
//! ```
//!
//! ## Feature Flags
//!
//! Algorithm families:
//! - `frequency` (default): Lossy Counting
//! - `full`: Enable all algorithm families
//!
//! Integration features:
//! - `serde`: Serialize sketch snapshots
//! - `tracing`: Emit `tracing` events on construction and pruning passes

#![cfg_attr(docsrs, feature(doc_cfg))]

// Core types always available
pub mod error;
pub mod traits;

#[cfg(feature = "frequency")]
#[cfg_attr(docsrs, doc(cfg(feature = "frequency")))]
pub mod frequency;

pub use error::{LossyCountError, Result};

pub mod prelude {
    pub use crate::error::LossyCountError;
    pub use crate::traits::*;

    #[cfg(feature = "frequency")]
    pub use crate::frequency::LossyCounter;
}

#[cfg(feature = "frequency")]
pub use frequency::LossyCounter;
