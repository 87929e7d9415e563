//! # Brackets
//!
//! A tournament bracket engine: seeding, bracket construction, result
//! progression, standings and stage resets for single elimination, double
//! elimination and round robin formats.
//!
//! ## Architecture
//!
//! A stage's matches form an acyclic graph stored in an arena. Each match
//! knows where its winner and loser go as `(match, slot)` pairs; reporting a
//! result writes those slots and re-evaluates only the matches it touched.
//! Byes resolve automatically, including chains of byes.
//!
//! Every running stage is owned by one actor task. Mutations are serialized
//! through its inbox and persisted before they are published; readers see
//! immutable snapshots.
//!
//! ## Core Modules
//!
//! - [`seeding`]: Entrant reordering strategies
//! - [`bracket`]: Data model, construction, progression and reset
//! - [`stats`]: Standings and progress derived from the match table
//! - [`identity`]: External identifier mapping
//! - [`events`]: Notification payloads and sinks
//! - [`store`]: Repository trait with in-memory and PostgreSQL backends
//! - [`stage`]: Per-stage actors and the manager that routes to them
//!
//! ## Example
//!
//! ```
//! use brackets::bracket::{BracketFactory, StageFormat, StageSettings};
//! use brackets::seeding::{SeedingStrategy, seed_participants};
//!
//! let names: Vec<String> = ["A", "B", "C", "D", "E"].iter().map(|s| s.to_string()).collect();
//! let participants = seed_participants(1, &names, SeedingStrategy::Natural).unwrap();
//! let bracket = BracketFactory::create(
//!     1,
//!     "Open",
//!     StageFormat::SingleElimination,
//!     participants,
//!     StageSettings::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(bracket.matches.len(), 7);
//! ```

/// Stage structure and the operations that mutate it.
pub mod bracket;
pub use bracket::{
    Bracket, BracketError, BracketFactory, BracketResult, ErrorKind, GrandFinalType, Match,
    MatchStatus, MatchUpdate, Slot, Stage, StageFormat, StageSettings, StageStatus,
};

/// Event payloads and sinks.
pub mod events;
pub use events::{BracketEvent, EventSink};

/// External identifier mapping.
pub mod identity;

/// Entrant seeding.
pub mod seeding;
pub use seeding::SeedingStrategy;

/// Per-stage actors and the manager.
pub mod stage;
pub use stage::{BracketManager, CreateBracket, ManagerConfig};

/// Standings and progress.
pub mod stats;

/// Storage.
pub mod store;
