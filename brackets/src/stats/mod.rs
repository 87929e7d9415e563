//! Standings and progress, recomputed from the match table on every query.

pub mod engine;
pub mod models;

pub use engine::{compute_stage_progress, compute_standings, rank_order, round_progress, stage_summary};
pub use models::{RoundProgress, StageProgress, StageSummary, Standing};
