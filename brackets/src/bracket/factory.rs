//! Bracket construction: groups, rounds, matches and the forward wiring
//! between them.

use super::{
    errors::{BracketError, BracketResult},
    models::{
        Bracket, ForwardTarget, GrandFinalType, Group, GroupId, GroupKind, Match, MatchId,
        MatchStatus, Participant, ParticipantId, Round, RoundId, Slot, SlotIndex, Stage,
        StageFormat, StageId, StageSettings, StageStatus,
    },
    placement::{bracket_size, place_participants},
    progression::{propagate, refresh},
};
use chrono::Utc;
use enum_dispatch::enum_dispatch;
use std::collections::BTreeSet;

/// Structure under construction
#[derive(Debug, Clone)]
pub struct Draft {
    pub stage_id: StageId,
    pub groups: Vec<Group>,
    pub rounds: Vec<Round>,
    pub matches: Vec<Match>,
}

impl Draft {
    fn new(stage_id: StageId) -> Self {
        Self {
            stage_id,
            groups: Vec::new(),
            rounds: Vec::new(),
            matches: Vec::new(),
        }
    }

    fn add_group(&mut self, kind: GroupKind) -> GroupId {
        let id = self.groups.len() as GroupId;
        self.groups.push(Group {
            id,
            stage_id: self.stage_id,
            number: id as u32 + 1,
            kind,
        });
        id
    }

    fn add_round(&mut self, group_id: GroupId) -> RoundId {
        let id = self.rounds.len() as RoundId;
        let number = self.rounds.iter().filter(|r| r.group_id == group_id).count() as u32 + 1;
        self.rounds.push(Round {
            id,
            stage_id: self.stage_id,
            group_id,
            number,
        });
        id
    }

    fn add_match(&mut self, round_id: RoundId, slot1: Slot, slot2: Slot) -> MatchId {
        let id = self.matches.len() as MatchId;
        let group_id = self.rounds[round_id as usize].group_id;
        let position = self.matches.iter().filter(|m| m.round_id == round_id).count() as u32;
        self.matches.push(Match {
            id,
            stage_id: self.stage_id,
            group_id,
            round_id,
            position,
            slot1,
            slot2,
            score1: None,
            score2: None,
            status: MatchStatus::Waiting,
            winner_slot: None,
            forward_winner_to: None,
            forward_loser_to: None,
        });
        id
    }

    /// Add a match whose sides are both filled by wiring
    fn add_wired_match(&mut self, round_id: RoundId) -> MatchId {
        self.add_match(round_id, Slot::Empty, Slot::Empty)
    }

    fn wire_winner(&mut self, from: MatchId, to: MatchId, slot: SlotIndex) {
        self.matches[from as usize].forward_winner_to = Some(ForwardTarget { match_id: to, slot });
        self.matches[to as usize].set_slot(slot, Slot::WinnerOf(from));
    }

    fn wire_loser(&mut self, from: MatchId, to: MatchId, slot: SlotIndex) {
        self.matches[from as usize].forward_loser_to = Some(ForwardTarget { match_id: to, slot });
        self.matches[to as usize].set_slot(slot, Slot::LoserOf(from));
    }
}

/// Format-specific structure builder
#[enum_dispatch]
pub trait StageBuilder {
    /// Add the groups, rounds and matches of the format to the draft
    fn build(&self, draft: &mut Draft, seeded: &[ParticipantId]);
}

/// Single elimination: one winners bracket
#[derive(Debug, Clone)]
pub struct SingleEliminationBuilder {
    pub balance_byes: bool,
}

/// Double elimination: winners bracket, losers bracket and grand final
#[derive(Debug, Clone)]
pub struct DoubleEliminationBuilder {
    pub balance_byes: bool,
    pub grand_final: GrandFinalType,
}

/// Round robin: one pool, every pair meets `matches_per_pair` times
#[derive(Debug, Clone)]
pub struct RoundRobinBuilder {
    pub matches_per_pair: u32,
}

#[enum_dispatch(StageBuilder)]
#[derive(Debug, Clone)]
pub enum FormatBuilder {
    SingleEliminationBuilder,
    DoubleEliminationBuilder,
    RoundRobinBuilder,
}

impl FormatBuilder {
    /// Pick the builder for a format
    pub fn new(format: StageFormat, settings: &StageSettings) -> Self {
        match format {
            StageFormat::SingleElimination => SingleEliminationBuilder {
                balance_byes: settings.balance_byes,
            }
            .into(),
            StageFormat::DoubleElimination => DoubleEliminationBuilder {
                balance_byes: settings.balance_byes,
                grand_final: settings.grand_final,
            }
            .into(),
            StageFormat::RoundRobin => RoundRobinBuilder {
                matches_per_pair: settings.matches_per_pair,
            }
            .into(),
        }
    }
}

/// Build a winners bracket in `group_id`, returning match IDs per round
fn build_winners_bracket(
    draft: &mut Draft,
    group_id: GroupId,
    seeded: &[ParticipantId],
    balance_byes: bool,
) -> Vec<Vec<MatchId>> {
    let size = bracket_size(seeded.len());
    let slots = place_participants(seeded, size, balance_byes);

    let first_round = draft.add_round(group_id);
    let mut rounds = vec![
        slots
            .chunks_exact(2)
            .map(|pair| draft.add_match(first_round, pair[0], pair[1]))
            .collect::<Vec<_>>(),
    ];

    while let Some(previous) = rounds.last().filter(|r| r.len() > 1).cloned() {
        let round_id = draft.add_round(group_id);
        let current: Vec<MatchId> = previous
            .chunks_exact(2)
            .map(|pair| {
                let m = draft.add_wired_match(round_id);
                draft.wire_winner(pair[0], m, SlotIndex::One);
                draft.wire_winner(pair[1], m, SlotIndex::Two);
                m
            })
            .collect();
        rounds.push(current);
    }

    rounds
}

impl StageBuilder for SingleEliminationBuilder {
    fn build(&self, draft: &mut Draft, seeded: &[ParticipantId]) {
        let group_id = draft.add_group(GroupKind::WinnersBracket);
        build_winners_bracket(draft, group_id, seeded, self.balance_byes);
    }
}

impl DoubleEliminationBuilder {
    /// Build the losers bracket fed by the winners bracket rounds
    ///
    /// Returns the losers final, or `None` when the winners bracket has a
    /// single round.
    fn build_losers_bracket(draft: &mut Draft, winners: &[Vec<MatchId>]) -> Option<MatchId> {
        if winners.len() < 2 {
            return None;
        }

        let group_id = draft.add_group(GroupKind::LosersBracket);

        let first_round = draft.add_round(group_id);
        let mut previous: Vec<MatchId> = winners[0]
            .chunks_exact(2)
            .map(|pair| {
                let m = draft.add_wired_match(first_round);
                draft.wire_loser(pair[0], m, SlotIndex::One);
                draft.wire_loser(pair[1], m, SlotIndex::Two);
                m
            })
            .collect();

        for (drop_round, drops) in winners.iter().enumerate().skip(1) {
            // Losers dropping from the winners bracket enter in reverse order
            // on every other drop-in round so early opponents do not meet again.
            let reversed = drop_round % 2 == 1;
            let round_id = draft.add_round(group_id);
            let merged: Vec<MatchId> = previous
                .iter()
                .enumerate()
                .map(|(i, &survivor)| {
                    let dropped = if reversed {
                        drops[drops.len() - 1 - i]
                    } else {
                        drops[i]
                    };
                    let m = draft.add_wired_match(round_id);
                    draft.wire_winner(survivor, m, SlotIndex::One);
                    draft.wire_loser(dropped, m, SlotIndex::Two);
                    m
                })
                .collect();

            previous = if merged.len() > 1 {
                let round_id = draft.add_round(group_id);
                merged
                    .chunks_exact(2)
                    .map(|pair| {
                        let m = draft.add_wired_match(round_id);
                        draft.wire_winner(pair[0], m, SlotIndex::One);
                        draft.wire_winner(pair[1], m, SlotIndex::Two);
                        m
                    })
                    .collect()
            } else {
                merged
            };
        }

        previous.first().copied()
    }
}

impl StageBuilder for DoubleEliminationBuilder {
    fn build(&self, draft: &mut Draft, seeded: &[ParticipantId]) {
        let winners_group = draft.add_group(GroupKind::WinnersBracket);
        let winners = build_winners_bracket(draft, winners_group, seeded, self.balance_byes);
        let winners_final = winners[winners.len() - 1][0];

        let losers_final = Self::build_losers_bracket(draft, &winners);

        let final_group = draft.add_group(GroupKind::GrandFinal);
        let final_round = draft.add_round(final_group);
        let grand_final = draft.add_wired_match(final_round);
        draft.wire_winner(winners_final, grand_final, SlotIndex::One);
        match losers_final {
            Some(losers_final) => draft.wire_winner(losers_final, grand_final, SlotIndex::Two),
            None => draft.wire_loser(winners_final, grand_final, SlotIndex::Two),
        }

        if self.grand_final == GrandFinalType::Double {
            // Played only if the losers-bracket finalist takes the first grand
            // final; progression fills it from the grand final's outcome.
            let reset_round = draft.add_round(final_group);
            draft.add_match(
                reset_round,
                Slot::LoserOf(grand_final),
                Slot::WinnerOf(grand_final),
            );
        }
    }
}

impl StageBuilder for RoundRobinBuilder {
    fn build(&self, draft: &mut Draft, seeded: &[ParticipantId]) {
        let group_id = draft.add_group(GroupKind::Pool);

        // Circle method: the first entry stays fixed while the rest rotate.
        let mut circle: Vec<Option<ParticipantId>> = seeded.iter().copied().map(Some).collect();
        if circle.len() % 2 == 1 {
            circle.push(None);
        }
        let size = circle.len();

        for leg in 0..self.matches_per_pair {
            let mut rotation = circle.clone();
            for _ in 0..size - 1 {
                let round_id = draft.add_round(group_id);
                for i in 0..size / 2 {
                    if let (Some(a), Some(b)) = (rotation[i], rotation[size - 1 - i]) {
                        let (home, away) = if leg % 2 == 0 { (a, b) } else { (b, a) };
                        draft.add_match(
                            round_id,
                            Slot::Participant(home),
                            Slot::Participant(away),
                        );
                    }
                }
                rotation[1..].rotate_right(1);
            }
        }
    }
}

/// Check the forward wiring of a freshly built structure
///
/// Every forward edge must point to a later match whose slot references the
/// source, every pending slot must be fed by the match it names, and
/// elimination stages must end in exactly one terminal match.
pub fn validate_graph(draft: &Draft, format: StageFormat) -> BracketResult<()> {
    let malformed = |reason: String| BracketError::MalformedGraph {
        stage_id: draft.stage_id,
        reason,
    };

    for (index, m) in draft.matches.iter().enumerate() {
        if m.id != index as MatchId {
            return Err(malformed(format!("match at index {index} has id {}", m.id)));
        }

        let edges = [
            (m.forward_winner_to, Slot::WinnerOf(m.id)),
            (m.forward_loser_to, Slot::LoserOf(m.id)),
        ];
        for (target, expected) in edges {
            let Some(target) = target else { continue };
            if target.match_id <= m.id {
                return Err(malformed(format!(
                    "match {} forwards backwards to match {}",
                    m.id, target.match_id
                )));
            }
            let Some(dest) = draft.matches.get(target.match_id as usize) else {
                return Err(malformed(format!(
                    "match {} forwards to missing match {}",
                    m.id, target.match_id
                )));
            };
            if dest.slot(target.slot) != expected {
                return Err(malformed(format!(
                    "match {} slot {} does not reference match {}",
                    dest.id,
                    target.slot.number(),
                    m.id
                )));
            }
        }
    }

    let reset_match = reset_match_of(draft, format);
    for m in &draft.matches {
        for index in [SlotIndex::One, SlotIndex::Two] {
            if Some(m.id) == reset_match {
                continue;
            }
            let source_match = |source: MatchId| draft.matches.get(source as usize);
            let (source, feed) = match m.slot(index) {
                Slot::WinnerOf(source) => {
                    (source, source_match(source).and_then(|s| s.forward_winner_to))
                }
                Slot::LoserOf(source) => {
                    (source, source_match(source).and_then(|s| s.forward_loser_to))
                }
                _ => continue,
            };
            let fed = feed.is_some_and(|t| t.match_id == m.id && t.slot == index);
            if !fed {
                return Err(malformed(format!(
                    "match {} slot {} waits on match {} which never feeds it",
                    m.id,
                    index.number(),
                    source
                )));
            }
        }
    }

    let terminals = draft
        .matches
        .iter()
        .filter(|m| m.forward_winner_to.is_none() && Some(m.id) != reset_match)
        .count();
    match format {
        StageFormat::RoundRobin => {
            if draft
                .matches
                .iter()
                .any(|m| m.forward_winner_to.is_some() || m.forward_loser_to.is_some())
            {
                return Err(malformed("round robin match has forward wiring".to_string()));
            }
        }
        _ if terminals != 1 => {
            return Err(malformed(format!(
                "expected exactly one terminal match, found {terminals}"
            )));
        }
        _ => {}
    }

    Ok(())
}

/// The reset match is the only match of the grand final's second round
fn reset_match_of(draft: &Draft, format: StageFormat) -> Option<MatchId> {
    if format != StageFormat::DoubleElimination {
        return None;
    }
    let group = draft.groups.iter().find(|g| g.kind == GroupKind::GrandFinal)?;
    let round = draft
        .rounds
        .iter()
        .find(|r| r.group_id == group.id && r.number == 2)?;
    draft
        .matches
        .iter()
        .find(|m| m.round_id == round.id)
        .map(|m| m.id)
}

/// Build, validate and settle the structure of a stage
///
/// `seeded` lists participant IDs in seed order. Byes are resolved here, so
/// the returned matches are exactly what a fresh, unplayed stage looks like.
pub fn build_structure(
    stage_id: StageId,
    format: StageFormat,
    seeded: &[ParticipantId],
    settings: &StageSettings,
) -> BracketResult<Draft> {
    if seeded.len() < 2 {
        return Err(BracketError::InvalidParticipantCount {
            format: format.to_string(),
            count: seeded.len(),
        });
    }
    settings.validate(format)?;

    let mut draft = Draft::new(stage_id);
    FormatBuilder::new(format, settings).build(&mut draft, seeded);
    validate_graph(&draft, format)?;

    let mut touched = BTreeSet::new();
    for id in 0..draft.matches.len() {
        let writes = refresh(&mut draft.matches[id]);
        propagate(stage_id, &mut draft.matches, writes, &mut touched)?;
    }

    Ok(draft)
}

/// Builds stages from seeded participants
pub struct BracketFactory;

impl BracketFactory {
    /// Create a fully wired stage
    ///
    /// # Arguments
    ///
    /// * `stage_id` - ID allocated for the stage
    /// * `name` - Stage name
    /// * `format` - Bracket format
    /// * `participants` - Seeded participants (see [`crate::seeding::seed_participants`])
    /// * `settings` - Stage settings
    ///
    /// # Errors
    ///
    /// `InvalidParticipantCount` for fewer than two participants,
    /// `InvalidSettings` for settings foreign to the format and
    /// `MalformedGraph` if the wiring fails validation.
    pub fn create(
        stage_id: StageId,
        name: &str,
        format: StageFormat,
        participants: Vec<Participant>,
        settings: StageSettings,
    ) -> BracketResult<Bracket> {
        let mut participants = participants;
        participants.sort_by_key(|p| p.seed);
        let seeded: Vec<ParticipantId> = participants.iter().map(|p| p.id).collect();

        let draft = build_structure(stage_id, format, &seeded, &settings)?;

        let now = Utc::now();
        let stage = Stage {
            id: stage_id,
            name: name.to_string(),
            format,
            participant_count: participants.len(),
            settings,
            status: StageStatus::Pending,
            winner: None,
            created_at: now,
            updated_at: now,
        };

        log::debug!(
            "Built {} stage {} with {} matches",
            format,
            stage_id,
            draft.matches.len()
        );

        Ok(Bracket {
            stage,
            participants,
            groups: draft.groups,
            rounds: draft.rounds,
            matches: draft.matches,
        })
    }
}
