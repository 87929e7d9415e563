//! Bracket data models: stages, groups, rounds, matches and the slots that
//! wire them together.

use super::errors::{BracketError, BracketResult};
use crate::seeding::SeedingStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Stage ID type
pub type StageId = i64;
/// Group ID type (dense per stage)
pub type GroupId = i64;
/// Round ID type (dense per stage)
pub type RoundId = i64;
/// Match ID type (dense per stage, doubles as the arena index)
pub type MatchId = i64;
/// Participant ID type (index in the caller's original list)
pub type ParticipantId = i64;

/// Bracket format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageFormat {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
}

impl fmt::Display for StageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageFormat::SingleElimination => write!(f, "single_elimination"),
            StageFormat::DoubleElimination => write!(f, "double_elimination"),
            StageFormat::RoundRobin => write!(f, "round_robin"),
        }
    }
}

impl FromStr for StageFormat {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_elimination" => Ok(StageFormat::SingleElimination),
            "double_elimination" => Ok(StageFormat::DoubleElimination),
            "round_robin" => Ok(StageFormat::RoundRobin),
            other => Err(BracketError::UnknownFormat(other.to_string())),
        }
    }
}

/// Stage lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// No result reported yet
    Pending,
    /// At least one result reported
    Running,
    /// Terminal match decided
    Completed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Pending => write!(f, "pending"),
            StageStatus::Running => write!(f, "running"),
            StageStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for StageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StageStatus::Pending),
            "running" => Ok(StageStatus::Running),
            "completed" => Ok(StageStatus::Completed),
            other => Err(format!("unknown stage status {other:?}")),
        }
    }
}

/// Grand final variants for double elimination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrandFinalType {
    /// One grand final match regardless of outcome
    Simple,
    /// A reset match is played if the losers-bracket finalist wins
    #[default]
    Double,
}

/// Stage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSettings {
    /// Seeding strategy that produced the seed order
    pub seed_ordering: SeedingStrategy,

    /// Give byes to the highest seeds instead of the last bracket slots
    pub balance_byes: bool,

    /// Grand final variant (double elimination only)
    pub grand_final: GrandFinalType,

    /// Accepted for single elimination and stored, but the structure is the
    /// same either way: first-round byes are always resolved at construction
    pub skip_first_round: bool,

    /// Matches per pairing (round robin only)
    pub matches_per_pair: u32,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            seed_ordering: SeedingStrategy::Natural,
            balance_byes: true,
            grand_final: GrandFinalType::Double,
            skip_first_round: false,
            matches_per_pair: 1,
        }
    }
}

impl StageSettings {
    /// Validate settings against the format they will be used with
    pub fn validate(&self, format: StageFormat) -> BracketResult<()> {
        if self.matches_per_pair == 0 {
            return Err(BracketError::InvalidSettings(
                "matches_per_pair must be at least 1".to_string(),
            ));
        }

        if self.skip_first_round && format != StageFormat::SingleElimination {
            return Err(BracketError::InvalidSettings(format!(
                "skip_first_round is only supported for single elimination, not {format}"
            )));
        }

        if self.matches_per_pair > 1 && format != StageFormat::RoundRobin {
            return Err(BracketError::InvalidSettings(format!(
                "matches_per_pair is only supported for round robin, not {format}"
            )));
        }

        Ok(())
    }
}

/// A stage: one bracket instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    pub format: StageFormat,
    pub participant_count: usize,
    pub settings: StageSettings,
    pub status: StageStatus,
    /// Overall winner once the stage is completed
    pub winner: Option<ParticipantId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A seeded participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub stage_id: StageId,
    pub name: String,
    /// 1-based rank in the seeded order
    pub seed: u32,
}

/// Group kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    WinnersBracket,
    LosersBracket,
    GrandFinal,
    Pool,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKind::WinnersBracket => write!(f, "winners_bracket"),
            GroupKind::LosersBracket => write!(f, "losers_bracket"),
            GroupKind::GrandFinal => write!(f, "grand_final"),
            GroupKind::Pool => write!(f, "pool"),
        }
    }
}

/// A named subdivision of a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub stage_id: StageId,
    /// 1-based
    pub number: u32,
    pub kind: GroupKind,
}

/// An ordered subdivision within a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub stage_id: StageId,
    pub group_id: GroupId,
    /// 1-based, increasing toward the final
    pub number: u32,
}

/// One of the two sides of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotIndex {
    One,
    Two,
}

impl SlotIndex {
    /// The opposite side
    pub fn other(self) -> Self {
        match self {
            SlotIndex::One => SlotIndex::Two,
            SlotIndex::Two => SlotIndex::One,
        }
    }

    /// 1 or 2
    pub fn number(self) -> u8 {
        match self {
            SlotIndex::One => 1,
            SlotIndex::Two => 2,
        }
    }
}

/// Content of a match side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Slot {
    /// Resolved to a participant
    Participant(ParticipantId),
    /// Waiting for the winner of a match
    WinnerOf(MatchId),
    /// Waiting for the loser of a match
    LoserOf(MatchId),
    /// Nobody will ever arrive (bye)
    Empty,
}

impl Slot {
    /// Participant occupying the slot, if resolved
    pub fn participant(&self) -> Option<ParticipantId> {
        match self {
            Slot::Participant(id) => Some(*id),
            _ => None,
        }
    }

    /// True once the slot can no longer change through propagation
    pub fn is_resolved(&self) -> bool {
        matches!(self, Slot::Participant(_) | Slot::Empty)
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// At least one side is still pending
    Waiting,
    /// Both sides hold a participant
    Ready,
    /// Result reported
    Completed,
    /// Resolved without play
    Bye,
}

impl MatchStatus {
    /// Completed or bye
    pub fn is_settled(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Bye)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Waiting => write!(f, "waiting"),
            MatchStatus::Ready => write!(f, "ready"),
            MatchStatus::Completed => write!(f, "completed"),
            MatchStatus::Bye => write!(f, "bye"),
        }
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(MatchStatus::Waiting),
            "ready" => Ok(MatchStatus::Ready),
            "completed" => Ok(MatchStatus::Completed),
            "bye" => Ok(MatchStatus::Bye),
            other => Err(format!("unknown match status {other:?}")),
        }
    }
}

/// Destination of a match outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardTarget {
    pub match_id: MatchId,
    pub slot: SlotIndex,
}

/// A single match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub stage_id: StageId,
    pub group_id: GroupId,
    pub round_id: RoundId,
    /// 0-based index within the round
    pub position: u32,
    pub slot1: Slot,
    pub slot2: Slot,
    pub score1: Option<u32>,
    pub score2: Option<u32>,
    pub status: MatchStatus,
    pub winner_slot: Option<SlotIndex>,
    pub forward_winner_to: Option<ForwardTarget>,
    pub forward_loser_to: Option<ForwardTarget>,
}

impl Match {
    /// Get a side of the match
    pub fn slot(&self, index: SlotIndex) -> Slot {
        match index {
            SlotIndex::One => self.slot1,
            SlotIndex::Two => self.slot2,
        }
    }

    /// Overwrite a side of the match
    pub fn set_slot(&mut self, index: SlotIndex, slot: Slot) {
        match index {
            SlotIndex::One => self.slot1 = slot,
            SlotIndex::Two => self.slot2 = slot,
        }
    }

    /// Participants on both sides, if both are resolved to participants
    pub fn opponents(&self) -> Option<(ParticipantId, ParticipantId)> {
        Some((self.slot1.participant()?, self.slot2.participant()?))
    }

    /// True if the participant occupies either side
    pub fn involves(&self, participant: ParticipantId) -> bool {
        self.slot1.participant() == Some(participant) || self.slot2.participant() == Some(participant)
    }

    /// Winning participant, once decided
    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner_slot.and_then(|idx| self.slot(idx).participant())
    }

    /// Losing participant, once decided (never set for byes)
    pub fn loser(&self) -> Option<ParticipantId> {
        self.winner_slot
            .and_then(|idx| self.slot(idx.other()).participant())
    }
}

/// A stage with its full structure, as stored and as served to readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub stage: Stage,
    pub participants: Vec<Participant>,
    pub groups: Vec<Group>,
    pub rounds: Vec<Round>,
    pub matches: Vec<Match>,
}

impl Bracket {
    /// Stage ID
    pub fn id(&self) -> StageId {
        self.stage.id
    }

    /// Look up a match by ID
    pub fn match_by_id(&self, match_id: MatchId) -> Option<&Match> {
        usize::try_from(match_id)
            .ok()
            .and_then(|idx| self.matches.get(idx))
            .filter(|m| m.id == match_id)
    }

    /// Look up a match by ID for mutation
    pub fn match_by_id_mut(&mut self, match_id: MatchId) -> Option<&mut Match> {
        usize::try_from(match_id)
            .ok()
            .and_then(|idx| self.matches.get_mut(idx))
            .filter(|m| m.id == match_id)
    }

    /// Look up a participant by ID
    pub fn participant(&self, participant_id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }

    /// Participants ordered by seed
    pub fn seeded_participants(&self) -> Vec<&Participant> {
        let mut seeded: Vec<&Participant> = self.participants.iter().collect();
        seeded.sort_by_key(|p| p.seed);
        seeded
    }

    /// Look up a round by ID
    pub fn round(&self, round_id: RoundId) -> Option<&Round> {
        self.rounds.iter().find(|r| r.id == round_id)
    }

    /// Look up the group of a given kind
    pub fn group_of_kind(&self, kind: GroupKind) -> Option<&Group> {
        self.groups.iter().find(|g| g.kind == kind)
    }

    /// Matches belonging to a round, in position order
    pub fn matches_in_round(&self, round_id: RoundId) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(move |m| m.round_id == round_id)
    }

    /// Match in the given round number of the given group
    fn first_match_of(&self, kind: GroupKind, round_number: u32) -> Option<&Match> {
        let group = self.group_of_kind(kind)?;
        let round = self
            .rounds
            .iter()
            .find(|r| r.group_id == group.id && r.number == round_number)?;
        self.matches_in_round(round.id).next()
    }

    /// The match whose completion ends the stage
    ///
    /// Round robin stages have no terminal match.
    pub fn terminal_match(&self) -> Option<&Match> {
        match self.stage.format {
            StageFormat::SingleElimination => self
                .matches
                .iter()
                .find(|m| m.forward_winner_to.is_none()),
            StageFormat::DoubleElimination => self.first_match_of(GroupKind::GrandFinal, 1),
            StageFormat::RoundRobin => None,
        }
    }

    /// The grand final reset match, if the stage has one
    pub fn reset_match(&self) -> Option<&Match> {
        match (self.stage.format, self.stage.settings.grand_final) {
            (StageFormat::DoubleElimination, GrandFinalType::Double) => {
                self.first_match_of(GroupKind::GrandFinal, 2)
            }
            _ => None,
        }
    }
}
