//! Notification payloads.

use crate::bracket::{
    Match, MatchId, MatchOutcome, ParticipantId, Participant, RoundId, Slot, SlotIndex,
    StageFormat, StageId,
};
use crate::stats::RoundProgress;
use serde::{Deserialize, Serialize};

/// State of one side of a match after an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideUpdate {
    pub slot: Slot,
    pub score: Option<u32>,
    pub result: Option<MatchOutcome>,
}

impl SideUpdate {
    fn of(m: &Match, index: SlotIndex) -> Self {
        let result = m.winner_slot.filter(|_| m.loser().is_some()).map(|winner| {
            if winner == index {
                MatchOutcome::Win
            } else {
                MatchOutcome::Loss
            }
        });
        Self {
            slot: m.slot(index),
            score: match index {
                SlotIndex::One => m.score1,
                SlotIndex::Two => m.score2,
            },
            result,
        }
    }
}

/// Events produced for the notification collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum BracketEvent {
    TournamentCreated {
        id: StageId,
        name: String,
        format: StageFormat,
        participants: Vec<Participant>,
    },
    MatchUpdated {
        stage_id: StageId,
        match_id: MatchId,
        slot1_update: SideUpdate,
        slot2_update: SideUpdate,
    },
    BracketProgression {
        stage_id: StageId,
        round_id: RoundId,
        completed_matches: usize,
        total_matches: usize,
        progress_percent: f64,
    },
    TournamentCompleted {
        stage_id: StageId,
        winner: ParticipantId,
    },
    TournamentError {
        stage_id: StageId,
        message: String,
    },
}

impl BracketEvent {
    /// `match-updated` for a match's current state
    pub fn match_updated(m: &Match) -> Self {
        BracketEvent::MatchUpdated {
            stage_id: m.stage_id,
            match_id: m.id,
            slot1_update: SideUpdate::of(m, SlotIndex::One),
            slot2_update: SideUpdate::of(m, SlotIndex::Two),
        }
    }

    /// `bracket-progression` from round counters
    pub fn progression(round: &RoundProgress) -> Self {
        BracketEvent::BracketProgression {
            stage_id: round.stage_id,
            round_id: round.round_id,
            completed_matches: round.completed,
            total_matches: round.total,
            progress_percent: round.percent,
        }
    }

    /// Stage the event belongs to
    pub fn stage_id(&self) -> StageId {
        match self {
            BracketEvent::TournamentCreated { id, .. } => *id,
            BracketEvent::MatchUpdated { stage_id, .. }
            | BracketEvent::BracketProgression { stage_id, .. }
            | BracketEvent::TournamentCompleted { stage_id, .. }
            | BracketEvent::TournamentError { stage_id, .. } => *stage_id,
        }
    }

    /// Event name as it appears in the `event` tag
    pub fn name(&self) -> &'static str {
        match self {
            BracketEvent::TournamentCreated { .. } => "tournament-created",
            BracketEvent::MatchUpdated { .. } => "match-updated",
            BracketEvent::BracketProgression { .. } => "bracket-progression",
            BracketEvent::TournamentCompleted { .. } => "tournament-completed",
            BracketEvent::TournamentError { .. } => "tournament-error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::MatchStatus;

    fn completed_match() -> Match {
        Match {
            id: 2,
            stage_id: 9,
            group_id: 0,
            round_id: 1,
            position: 0,
            slot1: Slot::Participant(4),
            slot2: Slot::Participant(1),
            score1: Some(1),
            score2: Some(3),
            status: MatchStatus::Completed,
            winner_slot: Some(SlotIndex::Two),
            forward_winner_to: None,
            forward_loser_to: None,
        }
    }

    #[test]
    fn test_event_tag_and_field_names() {
        let event = BracketEvent::progression(&RoundProgress {
            stage_id: 9,
            round_id: 1,
            completed: 1,
            total: 2,
            percent: 50.0,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "bracket-progression");
        assert_eq!(json["stageId"], 9);
        assert_eq!(json["completedMatches"], 1);
        assert_eq!(json["progressPercent"], 50.0);
        assert_eq!(event.name(), "bracket-progression");
    }

    #[test]
    fn test_match_updated_marks_results() {
        let event = BracketEvent::match_updated(&completed_match());
        let BracketEvent::MatchUpdated {
            slot1_update,
            slot2_update,
            ..
        } = &event
        else {
            panic!("wrong variant");
        };
        assert_eq!(slot1_update.result, Some(MatchOutcome::Loss));
        assert_eq!(slot2_update.result, Some(MatchOutcome::Win));
        assert_eq!(slot2_update.score, Some(3));
        assert_eq!(event.stage_id(), 9);
    }

    #[test]
    fn test_bye_has_no_result() {
        let mut m = completed_match();
        m.slot2 = Slot::Empty;
        m.status = MatchStatus::Bye;
        m.winner_slot = Some(SlotIndex::One);
        let BracketEvent::MatchUpdated { slot1_update, .. } = BracketEvent::match_updated(&m)
        else {
            panic!("wrong variant");
        };
        assert_eq!(slot1_update.result, None);
    }

    #[test]
    fn test_deserialize_round_trip_by_name() {
        let json = r#"{"event":"tournament-completed","stageId":3,"winner":5}"#;
        let event: BracketEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            BracketEvent::TournamentCompleted {
                stage_id: 3,
                winner: 5
            }
        );
    }
}
