//! Bracket module: the stage structure and the operations that mutate it.
//!
//! This module implements:
//! - Data model: stages, groups, rounds, matches and their slots
//! - BracketFactory: builds and wires single/double elimination and round robin
//! - Progression: applies results and forwards winners and losers
//! - Reset: reverts a stage to its unplayed state
//!
//! ## Architecture
//!
//! Matches live in an arena (`Vec<Match>`) addressed by `MatchId`. Outcomes
//! travel along `(MatchId, SlotIndex)` forward targets that always point to a
//! later match, so the graph is acyclic by construction and validated once
//! after every build.
//!
//! Mutating operations take a `&Bracket` and return an updated copy; nothing
//! is observable until the caller commits the new value.
//!
//! ## Example
//!
//! ```
//! use brackets::bracket::{BracketFactory, MatchUpdate, StageFormat, StageSettings, report_result};
//! use brackets::seeding::{SeedingStrategy, seed_participants};
//!
//! let names = vec!["A".to_string(), "B".to_string()];
//! let participants = seed_participants(1, &names, SeedingStrategy::Natural).unwrap();
//! let bracket = BracketFactory::create(
//!     1,
//!     "Final",
//!     StageFormat::SingleElimination,
//!     participants,
//!     StageSettings::default(),
//! )
//! .unwrap();
//!
//! let outcome = report_result(&bracket, 0, &MatchUpdate::scores(3, 1)).unwrap();
//! assert_eq!(outcome.champion, Some(0));
//! ```

pub mod errors;
pub mod factory;
pub mod models;
pub mod placement;
pub mod progression;
pub mod reset;

pub use errors::{BracketError, BracketResult, ErrorKind};
pub use factory::{BracketFactory, FormatBuilder, StageBuilder, build_structure, validate_graph};
pub use models::{
    Bracket, ForwardTarget, GrandFinalType, Group, GroupId, GroupKind, Match, MatchId,
    MatchStatus, Participant, ParticipantId, Round, RoundId, Slot, SlotIndex, Stage,
    StageFormat, StageId, StageSettings, StageStatus,
};
pub use progression::{MatchOutcome, MatchUpdate, OpponentUpdate, ProgressionOutcome, report_result};
pub use reset::{ResetOutcome, reset_stage};
