//! Derived statistics models.

use crate::bracket::{Participant, ParticipantId, RoundId, StageFormat, StageId, StageStatus};
use serde::{Deserialize, Serialize};

/// One participant's record in a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub participant: Participant,
    pub wins: u32,
    pub losses: u32,
    /// Completed matches only; byes are not counted
    pub played: u32,
    /// `wins / played` as a fraction, 0 when nothing was played
    pub win_rate: f64,
}

/// Match counters for a whole stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProgress {
    pub stage_id: StageId,
    /// Matches with a reported result
    pub completed: usize,
    /// Matches resolved without play
    pub byes: usize,
    /// Matches still waiting or ready
    pub pending: usize,
    pub total: usize,
    /// Settled share of all matches, 0 to 100
    pub percent: f64,
}

/// Match counters for one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundProgress {
    pub stage_id: StageId,
    pub round_id: RoundId,
    /// Settled matches (completed or bye)
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
}

/// Overview of a stage with its per-participant statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage_id: StageId,
    pub name: String,
    pub format: StageFormat,
    pub status: StageStatus,
    pub winner: Option<ParticipantId>,
    pub total_participants: usize,
    pub progress: StageProgress,
    pub standings: Vec<Standing>,
}
