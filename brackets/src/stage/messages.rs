//! Stage actor message types.

use crate::bracket::{BracketResult, Match, MatchId, MatchUpdate};
use tokio::sync::oneshot;

/// Messages that can be sent to a StageActor
///
/// Only mutations go through the inbox; reads use the published snapshot.
#[derive(Debug)]
pub enum StageMessage {
    /// Report a match result
    ReportResult {
        match_id: MatchId,
        update: MatchUpdate,
        response: oneshot::Sender<BracketResult<Match>>,
    },

    /// Revert the stage to its unplayed state
    Reset {
        response: oneshot::Sender<BracketResult<bool>>,
    },

    /// Stop the actor
    Close { response: oneshot::Sender<()> },
}
