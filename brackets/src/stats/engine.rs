//! Statistics derived on demand from the match table.

use super::models::{RoundProgress, StageProgress, StageSummary, Standing};
use crate::bracket::{Bracket, Match, MatchStatus, RoundId};
use std::cmp::Ordering;

fn percent(settled: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        settled as f64 / total as f64 * 100.0
    }
}

/// Per-participant records, best first
///
/// Ordered by wins, then win rate (both descending), then seed.
pub fn compute_standings(bracket: &Bracket) -> Vec<Standing> {
    let completed: Vec<&Match> = bracket
        .matches
        .iter()
        .filter(|m| m.status == MatchStatus::Completed)
        .collect();

    let mut standings: Vec<Standing> = bracket
        .participants
        .iter()
        .map(|participant| {
            let (wins, played) = completed
                .iter()
                .filter(|m| m.involves(participant.id))
                .fold((0u32, 0u32), |(wins, played), m| {
                    let won = m.winner() == Some(participant.id);
                    (wins + u32::from(won), played + 1)
                });
            let win_rate = if played == 0 {
                0.0
            } else {
                f64::from(wins) / f64::from(played)
            };
            Standing {
                participant: participant.clone(),
                wins,
                losses: played - wins,
                played,
                win_rate,
            }
        })
        .collect();

    standings.sort_by(rank_order);
    standings
}

/// Counters for the whole stage
pub fn compute_stage_progress(bracket: &Bracket) -> StageProgress {
    let count = |status: MatchStatus| bracket.matches.iter().filter(|m| m.status == status).count();
    let completed = count(MatchStatus::Completed);
    let byes = count(MatchStatus::Bye);
    let total = bracket.matches.len();

    StageProgress {
        stage_id: bracket.id(),
        completed,
        byes,
        pending: total - completed - byes,
        total,
        percent: percent(completed + byes, total),
    }
}

/// Counters for one round
pub fn round_progress(bracket: &Bracket, round_id: RoundId) -> RoundProgress {
    let (completed, total) = bracket
        .matches_in_round(round_id)
        .fold((0, 0), |(settled, total), m| {
            (settled + usize::from(m.status.is_settled()), total + 1)
        });

    RoundProgress {
        stage_id: bracket.id(),
        round_id,
        completed,
        total,
        percent: percent(completed, total),
    }
}

/// Stage overview with standings
pub fn stage_summary(bracket: &Bracket) -> StageSummary {
    StageSummary {
        stage_id: bracket.id(),
        name: bracket.stage.name.clone(),
        format: bracket.stage.format,
        status: bracket.stage.status,
        winner: bracket.stage.winner,
        total_participants: bracket.participants.len(),
        progress: compute_stage_progress(bracket),
        standings: compute_standings(bracket),
    }
}

/// Compare two standings the way `compute_standings` orders them
pub fn rank_order(a: &Standing, b: &Standing) -> Ordering {
    b.wins
        .cmp(&a.wins)
        .then_with(|| b.win_rate.total_cmp(&a.win_rate))
        .then_with(|| a.participant.seed.cmp(&b.participant.seed))
}
