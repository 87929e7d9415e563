//! Seeding module: reorders entrants before a stage is built.
//!
//! Strategies mirror the common bracket-tool orderings:
//! - `natural`, `reverse`
//! - `half_shift`, `reverse_half_shift`
//! - `pair_flip`, `inner_outer`
//! - `random` (not reproducible)
//!
//! ## Example
//!
//! ```
//! use brackets::seeding::SeedingStrategy;
//!
//! let order = SeedingStrategy::PairFlip.apply(vec!["P1", "P2", "P3", "P4", "P5"]);
//! assert_eq!(order, ["P2", "P1", "P4", "P3", "P5"]);
//! ```

pub mod strategy;

pub use strategy::{SeedingStrategy, seed_participants};
