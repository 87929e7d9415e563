//! Reverting a stage to its unplayed state.

use super::{
    errors::BracketResult,
    factory::build_structure,
    models::{Bracket, ParticipantId, StageStatus},
};
use chrono::Utc;

/// Result of a reset
#[derive(Debug, Clone)]
pub struct ResetOutcome {
    pub bracket: Bracket,
    /// False when the stage was already pristine
    pub changed: bool,
}

/// Rebuild the matches of a stage from its seeded participants
///
/// Groups, rounds and match IDs are kept; scores, winners and propagated
/// slots are cleared and byes resolve again exactly as at creation. Resetting
/// a pristine stage reports `changed == false` and leaves timestamps alone.
pub fn reset_stage(bracket: &Bracket) -> BracketResult<ResetOutcome> {
    let seeded: Vec<ParticipantId> = bracket
        .seeded_participants()
        .into_iter()
        .map(|p| p.id)
        .collect();

    let draft = build_structure(
        bracket.id(),
        bracket.stage.format,
        &seeded,
        &bracket.stage.settings,
    )?;

    let changed = draft.matches != bracket.matches
        || bracket.stage.status != StageStatus::Pending
        || bracket.stage.winner.is_some();

    if !changed {
        return Ok(ResetOutcome {
            bracket: bracket.clone(),
            changed,
        });
    }

    let mut next = bracket.clone();
    next.matches = draft.matches;
    next.stage.status = StageStatus::Pending;
    next.stage.winner = None;
    next.stage.updated_at = Utc::now();

    log::info!("Stage {} reset to its unplayed state", next.id());

    Ok(ResetOutcome {
        bracket: next,
        changed,
    })
}
