//! Bracket engine error types.

use super::models::{MatchId, MatchStatus, StageId};
use crate::store::StoreError;
use thiserror::Error;

/// Broad classification of a [`BracketError`].
///
/// Every kind except `Storage` describes a bad request rather than an engine
/// defect, so callers can map them straight to client responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    State,
    Integrity,
    Storage,
}

/// Bracket engine errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Fewer than two participants were supplied for seeding
    #[error("Insufficient participants: need at least 2, got {0}")]
    InsufficientParticipants(usize),

    /// Bracket construction was asked to build a stage it cannot build
    #[error("Invalid participant count for {format}: {count}")]
    InvalidParticipantCount { format: String, count: usize },

    /// Unknown stage format name
    #[error("Unknown stage format: {0}")]
    UnknownFormat(String),

    /// Unknown seeding strategy name (strict parsing only)
    #[error("Unknown seeding strategy: {0}")]
    UnknownStrategy(String),

    /// Settings that do not apply to the requested format
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Stage does not exist
    #[error("Stage not found: {0}")]
    StageNotFound(StageId),

    /// Match does not exist in the stage
    #[error("Match {match_id} not found in stage {stage_id}")]
    MatchNotFound { stage_id: StageId, match_id: MatchId },

    /// No stage is bound to the external identifier
    #[error("No stage mapped to external id {0:?}")]
    ExternalIdNotFound(String),

    /// Match cannot accept a result in its current status
    #[error("Match {match_id} in stage {stage_id} is not ready (status {status})")]
    MatchNotReady {
        stage_id: StageId,
        match_id: MatchId,
        status: MatchStatus,
    },

    /// The result does not determine a winner
    #[error("Invalid result for match {match_id} in stage {stage_id}: {reason}")]
    InvalidResult {
        stage_id: StageId,
        match_id: MatchId,
        reason: String,
    },

    /// Stage already has a champion
    #[error("Stage {0} is already completed")]
    StageCompleted(StageId),

    /// Stage actor is no longer running
    #[error("Stage {0} is closed")]
    StageClosed(StageId),

    /// External identifier already maps elsewhere
    #[error(
        "Identity collision for external id {external_id:?}: bound to stage {existing}, requested {requested}"
    )]
    IdentityCollision {
        external_id: String,
        existing: StageId,
        requested: StageId,
    },

    /// Forward wiring violates the graph invariants
    #[error("Malformed bracket graph in stage {stage_id}: {reason}")]
    MalformedGraph { stage_id: StageId, reason: String },

    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl BracketError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BracketError::InsufficientParticipants(_)
            | BracketError::InvalidParticipantCount { .. }
            | BracketError::UnknownFormat(_)
            | BracketError::UnknownStrategy(_)
            | BracketError::InvalidSettings(_)
            | BracketError::InvalidResult { .. } => ErrorKind::Validation,
            BracketError::StageNotFound(_)
            | BracketError::MatchNotFound { .. }
            | BracketError::ExternalIdNotFound(_) => ErrorKind::NotFound,
            BracketError::MatchNotReady { .. }
            | BracketError::StageCompleted(_)
            | BracketError::StageClosed(_) => ErrorKind::State,
            BracketError::IdentityCollision { .. } | BracketError::MalformedGraph { .. } => {
                ErrorKind::Integrity
            }
            BracketError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Get a client-safe error message
    ///
    /// Storage errors are replaced with a generic message so that SQL details
    /// never leave the process.
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Storage(_) => "Internal storage error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            BracketError::InsufficientParticipants(1).kind(),
            ErrorKind::Validation
        );
        assert_eq!(BracketError::StageNotFound(3).kind(), ErrorKind::NotFound);
        assert_eq!(
            BracketError::MatchNotReady {
                stage_id: 1,
                match_id: 2,
                status: MatchStatus::Waiting,
            }
            .kind(),
            ErrorKind::State
        );
        assert_eq!(
            BracketError::IdentityCollision {
                external_id: "abc".to_string(),
                existing: 1,
                requested: 2,
            }
            .kind(),
            ErrorKind::Integrity
        );
    }

    #[test]
    fn test_messages_carry_ids() {
        let err = BracketError::MatchNotFound {
            stage_id: 7,
            match_id: 42,
        };
        assert_eq!(err.to_string(), "Match 42 not found in stage 7");
    }

    #[test]
    fn test_client_message_hides_storage_details() {
        let err = BracketError::Storage(StoreError::Corrupt("matches row 4".to_string()));
        assert_eq!(err.client_message(), "Internal storage error");
    }
}
