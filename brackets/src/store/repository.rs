//! Repository trait for bracket rows.
//!
//! The engine only needs insert, select-by-filter and update over its
//! entities, so that is all the trait asks of a backend.

use super::errors::StoreResult;
use crate::bracket::{
    Bracket, GroupId, Match, MatchStatus, ParticipantId, RoundId, Stage, StageId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Match selection criteria; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFilter {
    pub group_id: Option<GroupId>,
    pub round_id: Option<RoundId>,
    pub status: Option<MatchStatus>,
    pub participant_id: Option<ParticipantId>,
}

impl MatchFilter {
    /// Matches in one round
    pub fn round(round_id: RoundId) -> Self {
        Self {
            round_id: Some(round_id),
            ..Self::default()
        }
    }

    /// Matches with one status
    pub fn status(status: MatchStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Check a match against the filter
    pub fn accepts(&self, m: &Match) -> bool {
        self.group_id.is_none_or(|id| m.group_id == id)
            && self.round_id.is_none_or(|id| m.round_id == id)
            && self.status.is_none_or(|status| m.status == status)
            && self.participant_id.is_none_or(|id| m.involves(id))
    }
}

/// Storage for stages and everything hanging off them
#[async_trait]
pub trait BracketRepository: Send + Sync {
    /// Reserve a fresh stage ID
    async fn allocate_stage_id(&self) -> StoreResult<StageId>;

    /// Insert a stage with its participants, groups, rounds and matches
    ///
    /// The external identifier, if any, is recorded in the same unit; on a
    /// conflict nothing is written.
    async fn insert_bracket(&self, bracket: &Bracket, external_id: Option<&str>)
    -> StoreResult<()>;

    /// Load a full stage
    async fn select_bracket(&self, stage_id: StageId) -> StoreResult<Option<Bracket>>;

    /// IDs of every stored stage, ascending
    async fn select_stage_ids(&self) -> StoreResult<Vec<StageId>>;

    /// Matches of a stage accepted by the filter, in ID order
    async fn select_matches(
        &self,
        stage_id: StageId,
        filter: &MatchFilter,
    ) -> StoreResult<Vec<Match>>;

    /// Update the stage row and the given match rows as one unit
    async fn update_matches(&self, stage: &Stage, matches: &[Match]) -> StoreResult<()>;

    /// Every recorded external identifier
    async fn select_identities(&self) -> StoreResult<Vec<(String, StageId)>>;
}
