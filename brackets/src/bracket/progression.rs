//! Result reporting and propagation through the forward graph.

use super::{
    errors::{BracketError, BracketResult},
    models::{
        Bracket, ForwardTarget, GrandFinalType, Match, MatchId, MatchStatus, ParticipantId, Slot,
        SlotIndex, StageFormat, StageId, StageStatus,
    },
};
use crate::stats::{self, RoundProgress};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Explicit outcome for one side of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Win,
    Loss,
}

/// Reported data for one side of a match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentUpdate {
    pub score: Option<u32>,
    pub result: Option<MatchOutcome>,
}

impl OpponentUpdate {
    /// Score only
    pub fn score(score: u32) -> Self {
        Self {
            score: Some(score),
            result: None,
        }
    }

    /// Explicit win, no score
    pub fn win() -> Self {
        Self {
            score: None,
            result: Some(MatchOutcome::Win),
        }
    }

    /// Explicit loss, no score
    pub fn loss() -> Self {
        Self {
            score: None,
            result: Some(MatchOutcome::Loss),
        }
    }
}

/// A result report for a match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchUpdate {
    pub opponent1: Option<OpponentUpdate>,
    pub opponent2: Option<OpponentUpdate>,
}

impl MatchUpdate {
    /// Build an update from two scores
    pub fn scores(score1: u32, score2: u32) -> Self {
        Self {
            opponent1: Some(OpponentUpdate::score(score1)),
            opponent2: Some(OpponentUpdate::score(score2)),
        }
    }

    fn result(&self, index: SlotIndex) -> Option<MatchOutcome> {
        self.side(index).and_then(|o| o.result)
    }

    fn score(&self, index: SlotIndex) -> Option<u32> {
        self.side(index).and_then(|o| o.score)
    }

    fn side(&self, index: SlotIndex) -> Option<&OpponentUpdate> {
        match index {
            SlotIndex::One => self.opponent1.as_ref(),
            SlotIndex::Two => self.opponent2.as_ref(),
        }
    }

    /// Decide the winning side
    ///
    /// Explicit results take precedence over scores; without results both
    /// scores are required and must differ.
    pub fn winner(&self) -> Result<SlotIndex, String> {
        use MatchOutcome::{Loss, Win};

        match (self.result(SlotIndex::One), self.result(SlotIndex::Two)) {
            (Some(Win), Some(Win)) => return Err("both sides marked as winner".to_string()),
            (Some(Loss), Some(Loss)) => return Err("both sides marked as loser".to_string()),
            (Some(Win), _) | (_, Some(Loss)) => return Ok(SlotIndex::One),
            (Some(Loss), _) | (_, Some(Win)) => return Ok(SlotIndex::Two),
            (None, None) => {}
        }

        match (self.score(SlotIndex::One), self.score(SlotIndex::Two)) {
            (Some(a), Some(b)) if a > b => Ok(SlotIndex::One),
            (Some(a), Some(b)) if b > a => Ok(SlotIndex::Two),
            (Some(_), Some(_)) => Err("tied scores without an explicit result".to_string()),
            _ => Err("no result and incomplete scores".to_string()),
        }
    }
}

/// Everything a committed report changed
#[derive(Debug, Clone)]
pub struct ProgressionOutcome {
    /// Bracket with the report applied
    pub bracket: Bracket,
    /// The reported match after completion
    pub updated: Match,
    /// Every match whose row changed, in ID order
    pub touched: Vec<MatchId>,
    /// Counters of the reported match's round
    pub round: RoundProgress,
    /// Set when the report completed the stage
    pub champion: Option<ParticipantId>,
    /// Set when the report activated the grand final reset
    pub reset_activated: bool,
}

/// Re-evaluate a match after its slots changed
///
/// Returns the slot writes its outcome causes downstream. Byes resolve here:
/// a lone participant wins immediately and an empty pairing forwards nobody.
pub(crate) fn refresh(m: &mut Match) -> Vec<(ForwardTarget, Slot)> {
    if m.status.is_settled() {
        return Vec::new();
    }

    let winner_slot = match (m.slot1, m.slot2) {
        (Slot::Participant(_), Slot::Participant(_)) => {
            m.status = MatchStatus::Ready;
            return Vec::new();
        }
        (Slot::Participant(_), Slot::Empty) => Some(SlotIndex::One),
        (Slot::Empty, Slot::Participant(_)) => Some(SlotIndex::Two),
        (Slot::Empty, Slot::Empty) => None,
        _ => {
            m.status = MatchStatus::Waiting;
            return Vec::new();
        }
    };

    m.status = MatchStatus::Bye;
    m.winner_slot = winner_slot;
    let advancing = winner_slot.map_or(Slot::Empty, |idx| m.slot(idx));

    let mut writes = Vec::new();
    if let Some(target) = m.forward_winner_to {
        writes.push((target, advancing));
    }
    if let Some(target) = m.forward_loser_to {
        writes.push((target, Slot::Empty));
    }
    writes
}

/// Apply slot writes and re-evaluate each target
///
/// Only matches whose slots changed are re-evaluated; the cascade continues
/// only through byes.
pub(crate) fn propagate(
    stage_id: StageId,
    matches: &mut [Match],
    mut writes: Vec<(ForwardTarget, Slot)>,
    touched: &mut BTreeSet<MatchId>,
) -> BracketResult<()> {
    while let Some((target, slot)) = writes.pop() {
        let Some(dest) = usize::try_from(target.match_id)
            .ok()
            .and_then(|idx| matches.get_mut(idx))
        else {
            return Err(BracketError::MalformedGraph {
                stage_id,
                reason: format!("forward target {} does not exist", target.match_id),
            });
        };

        if dest.slot(target.slot).is_resolved() {
            return Err(BracketError::MalformedGraph {
                stage_id,
                reason: format!(
                    "match {} slot {} is already resolved",
                    dest.id,
                    target.slot.number()
                ),
            });
        }

        dest.set_slot(target.slot, slot);
        touched.insert(dest.id);
        log::debug!(
            "Stage {}: match {} slot {} <- {:?}",
            stage_id,
            dest.id,
            target.slot.number(),
            slot
        );
        writes.extend(refresh(dest));
    }
    Ok(())
}

/// Champion of the stage, if its terminal condition is met
fn detect_champion(bracket: &Bracket) -> Option<ParticipantId> {
    match bracket.stage.format {
        StageFormat::SingleElimination => bracket
            .terminal_match()
            .filter(|m| m.status.is_settled())
            .and_then(Match::winner),
        StageFormat::DoubleElimination => {
            let grand_final = bracket.terminal_match()?;
            if grand_final.status != MatchStatus::Completed {
                return None;
            }
            match (bracket.stage.settings.grand_final, grand_final.winner_slot) {
                (GrandFinalType::Simple, _) | (GrandFinalType::Double, Some(SlotIndex::One)) => {
                    grand_final.winner()
                }
                _ => bracket
                    .reset_match()
                    .filter(|m| m.status == MatchStatus::Completed)
                    .and_then(Match::winner),
            }
        }
        StageFormat::RoundRobin => {
            if bracket.matches.iter().all(|m| m.status.is_settled()) {
                stats::compute_standings(bracket)
                    .first()
                    .map(|s| s.participant.id)
            } else {
                None
            }
        }
    }
}

/// Report a match result
///
/// Works on a copy of `bracket`: on error nothing is changed, on success the
/// returned outcome holds the updated bracket for the caller to commit.
///
/// # Errors
///
/// * `StageCompleted` - the stage already has a champion
/// * `MatchNotFound` - no such match in the stage
/// * `MatchNotReady` - the match does not hold two participants awaiting a result
/// * `InvalidResult` - the update does not determine a winner
/// * `MalformedGraph` - propagation hit inconsistent wiring
pub fn report_result(
    bracket: &Bracket,
    match_id: MatchId,
    update: &MatchUpdate,
) -> BracketResult<ProgressionOutcome> {
    let stage_id = bracket.id();

    if bracket.stage.status == StageStatus::Completed {
        return Err(BracketError::StageCompleted(stage_id));
    }

    let current = bracket
        .match_by_id(match_id)
        .ok_or(BracketError::MatchNotFound { stage_id, match_id })?;

    if current.status != MatchStatus::Ready {
        return Err(BracketError::MatchNotReady {
            stage_id,
            match_id,
            status: current.status,
        });
    }

    let winner_slot = update
        .winner()
        .map_err(|reason| BracketError::InvalidResult {
            stage_id,
            match_id,
            reason,
        })?;

    let mut next = bracket.clone();
    let mut touched = BTreeSet::from([match_id]);

    let reported = &mut next.matches[match_id as usize];
    reported.score1 = update.score(SlotIndex::One);
    reported.score2 = update.score(SlotIndex::Two);
    reported.status = MatchStatus::Completed;
    reported.winner_slot = Some(winner_slot);
    let winner = reported.slot(winner_slot);
    let loser = reported.slot(winner_slot.other());

    let mut writes = Vec::new();
    if let Some(target) = reported.forward_winner_to {
        writes.push((target, winner));
    }
    if let Some(target) = reported.forward_loser_to {
        writes.push((target, loser));
    }
    propagate(stage_id, &mut next.matches, writes, &mut touched)?;

    let mut reset_activated = false;
    let is_grand_final = next.terminal_match().is_some_and(|m| m.id == match_id)
        && next.stage.format == StageFormat::DoubleElimination;
    if is_grand_final && let Some(reset_id) = next.reset_match().map(|m| m.id) {
        let reset = &mut next.matches[reset_id as usize];
        if winner_slot == SlotIndex::Two {
            // the losers-bracket finalist forced a decider
            reset.slot1 = loser;
            reset.slot2 = winner;
            reset.status = MatchStatus::Ready;
            reset_activated = true;
        } else {
            reset.slot1 = Slot::Empty;
            reset.slot2 = Slot::Empty;
            reset.status = MatchStatus::Bye;
        }
        touched.insert(reset_id);
    }

    let champion = detect_champion(&next);
    next.stage.status = if champion.is_some() {
        StageStatus::Completed
    } else {
        StageStatus::Running
    };
    next.stage.winner = champion;
    next.stage.updated_at = Utc::now();

    let updated = next.matches[match_id as usize].clone();
    let round = stats::round_progress(&next, updated.round_id);

    Ok(ProgressionOutcome {
        bracket: next,
        updated,
        touched: touched.into_iter().collect(),
        round,
        champion,
        reset_activated,
    })
}
