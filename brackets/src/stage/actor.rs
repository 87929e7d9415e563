//! Stage actor: the single writer of one stage.

use super::messages::StageMessage;
use crate::{
    bracket::{
        Bracket, BracketError, BracketResult, Match, MatchId, MatchUpdate, StageId,
        report_result, reset_stage,
    },
    events::{BracketEvent, EventSink},
    store::BracketRepository,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Stage actor handle for sending messages and reading snapshots
#[derive(Clone)]
pub struct StageHandle {
    sender: mpsc::Sender<StageMessage>,
    snapshot: watch::Receiver<Arc<Bracket>>,
    stage_id: StageId,
}

impl StageHandle {
    /// Get stage ID
    pub fn stage_id(&self) -> StageId {
        self.stage_id
    }

    /// Latest committed state of the stage
    pub fn snapshot(&self) -> Arc<Bracket> {
        self.snapshot.borrow().clone()
    }

    /// Receiver that wakes on every commit
    pub fn watch(&self) -> watch::Receiver<Arc<Bracket>> {
        self.snapshot.clone()
    }

    /// Send a message to the stage
    pub async fn send(&self, message: StageMessage) -> BracketResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| BracketError::StageClosed(self.stage_id))
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> StageMessage,
    ) -> BracketResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(message(tx)).await?;
        rx.await.map_err(|_| BracketError::StageClosed(self.stage_id))
    }

    /// Report a match result and wait for the commit
    pub async fn report_result(&self, match_id: MatchId, update: MatchUpdate) -> BracketResult<Match> {
        self.request(|response| StageMessage::ReportResult {
            match_id,
            update,
            response,
        })
        .await?
    }

    /// Reset the stage; returns whether anything changed
    pub async fn reset(&self) -> BracketResult<bool> {
        self.request(|response| StageMessage::Reset { response })
            .await?
    }

    /// Stop the actor
    pub async fn close(&self) -> BracketResult<()> {
        self.request(|response| StageMessage::Close { response })
            .await
    }
}

/// Actor owning a single stage
pub struct StageActor {
    id: StageId,

    /// Committed state
    bracket: Arc<Bracket>,

    /// Message inbox
    inbox: mpsc::Receiver<StageMessage>,

    /// Snapshot publisher for readers
    publisher: watch::Sender<Arc<Bracket>>,

    repository: Arc<dyn BracketRepository>,

    events: Arc<dyn EventSink>,

    is_closed: bool,
}

impl StageActor {
    /// Create a new stage actor
    ///
    /// # Arguments
    ///
    /// * `bracket` - Stored state of the stage
    /// * `repository` - Store that every mutation is written to before commit
    /// * `events` - Sink for notifications
    /// * `inbox_capacity` - Bound of the message inbox
    pub fn new(
        bracket: Bracket,
        repository: Arc<dyn BracketRepository>,
        events: Arc<dyn EventSink>,
        inbox_capacity: usize,
    ) -> (Self, StageHandle) {
        let id = bracket.id();
        let bracket = Arc::new(bracket);
        let (sender, inbox) = mpsc::channel(inbox_capacity.max(1));
        let (publisher, snapshot) = watch::channel(bracket.clone());

        let actor = Self {
            id,
            bracket,
            inbox,
            publisher,
            repository,
            events,
            is_closed: false,
        };

        let handle = StageHandle {
            sender,
            snapshot,
            stage_id: id,
        };

        (actor, handle)
    }

    /// Run the stage actor event loop
    pub async fn run(mut self) {
        log::info!("Stage {} '{}' starting", self.id, self.bracket.stage.name);

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message).await;
            if self.is_closed {
                break;
            }
        }

        log::info!("Stage {} '{}' closed", self.id, self.bracket.stage.name);
    }

    async fn handle_message(&mut self, message: StageMessage) {
        match message {
            StageMessage::ReportResult {
                match_id,
                update,
                response,
            } => {
                let result = self.handle_report(match_id, &update).await;
                if let Err(e) = &result {
                    log::warn!("Stage {}: rejected report for match {}: {}", self.id, match_id, e);
                    self.events.emit(BracketEvent::TournamentError {
                        stage_id: self.id,
                        message: e.client_message(),
                    });
                }
                let _ = response.send(result);
            }
            StageMessage::Reset { response } => {
                let _ = response.send(self.handle_reset().await);
            }
            StageMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(());
            }
        }
    }

    async fn handle_report(&mut self, match_id: MatchId, update: &MatchUpdate) -> BracketResult<Match> {
        let outcome = report_result(&self.bracket, match_id, update)?;

        let changed: Vec<Match> = outcome
            .touched
            .iter()
            .filter_map(|&id| outcome.bracket.match_by_id(id).cloned())
            .collect();
        self.repository
            .update_matches(&outcome.bracket.stage, &changed)
            .await?;

        self.commit(outcome.bracket);

        for m in &changed {
            self.events.emit(BracketEvent::match_updated(m));
        }
        self.events.emit(BracketEvent::progression(&outcome.round));
        if outcome.reset_activated {
            log::info!("Stage {}: grand final reset activated", self.id);
        }
        if let Some(winner) = outcome.champion {
            log::info!("Stage {} completed, winner {}", self.id, winner);
            self.events.emit(BracketEvent::TournamentCompleted {
                stage_id: self.id,
                winner,
            });
        }

        Ok(outcome.updated)
    }

    async fn handle_reset(&mut self) -> BracketResult<bool> {
        let outcome = reset_stage(&self.bracket)?;
        if !outcome.changed {
            return Ok(false);
        }

        self.repository
            .update_matches(&outcome.bracket.stage, &outcome.bracket.matches)
            .await?;
        self.commit(outcome.bracket);
        Ok(true)
    }

    /// Publish a new state to readers
    fn commit(&mut self, bracket: Bracket) {
        self.bracket = Arc::new(bracket);
        self.publisher.send_replace(self.bracket.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{BracketFactory, MatchStatus, StageFormat, StageSettings, StageStatus};
    use crate::events::{BroadcastEventSink, NoopEventSink};
    use crate::seeding::{SeedingStrategy, seed_participants};
    use crate::store::InMemoryBracketRepository;

    async fn spawn_stage(events: Arc<dyn EventSink>) -> (StageHandle, Arc<InMemoryBracketRepository>) {
        let names: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let participants = seed_participants(1, &names, SeedingStrategy::Natural).unwrap();
        let bracket = BracketFactory::create(
            1,
            "Actor",
            StageFormat::SingleElimination,
            participants,
            StageSettings::default(),
        )
        .unwrap();

        let repo = Arc::new(InMemoryBracketRepository::new());
        repo.insert_bracket(&bracket, None).await.unwrap();

        let (actor, handle) = StageActor::new(bracket, repo.clone(), events, 8);
        tokio::spawn(actor.run());
        (handle, repo)
    }

    #[tokio::test]
    async fn test_report_commits_and_persists() {
        let (handle, repo) = spawn_stage(Arc::new(NoopEventSink)).await;

        let updated = handle
            .report_result(0, MatchUpdate::scores(2, 1))
            .await
            .unwrap();
        assert_eq!(updated.status, MatchStatus::Completed);

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.stage.status, StageStatus::Running);
        assert_eq!(snapshot.matches[2].slot1, crate::bracket::Slot::Participant(0));

        let stored = repo.select_bracket(1).await.unwrap().unwrap();
        assert_eq!(stored.matches, snapshot.matches);
    }

    #[tokio::test]
    async fn test_rejected_report_emits_error_and_keeps_state() {
        let sink = Arc::new(BroadcastEventSink::new(16));
        let mut events = sink.subscribe();
        let (handle, _repo) = spawn_stage(sink).await;
        let before = handle.snapshot();

        let result = handle.report_result(2, MatchUpdate::scores(1, 0)).await;
        assert!(matches!(result, Err(BracketError::MatchNotReady { .. })));
        assert_eq!(*handle.snapshot(), *before);

        let event = events.recv().await.unwrap();
        assert_eq!(event.name(), "tournament-error");
    }

    #[tokio::test]
    async fn test_events_follow_commit() {
        let sink = Arc::new(BroadcastEventSink::new(16));
        let mut events = sink.subscribe();
        let (handle, _repo) = spawn_stage(sink).await;

        handle
            .report_result(1, MatchUpdate::scores(0, 3))
            .await
            .unwrap();

        // reported match, its target, then round progress
        let names: Vec<&str> = [
            events.recv().await.unwrap(),
            events.recv().await.unwrap(),
            events.recv().await.unwrap(),
        ]
        .iter()
        .map(BracketEvent::name)
        .collect();
        assert_eq!(names, ["match-updated", "match-updated", "bracket-progression"]);
    }

    #[tokio::test]
    async fn test_closed_stage_rejects_messages() {
        let (handle, _repo) = spawn_stage(Arc::new(NoopEventSink)).await;
        handle.close().await.unwrap();
        let result = handle.report_result(0, MatchUpdate::scores(1, 0)).await;
        assert!(matches!(result, Err(BracketError::StageClosed(1))));
    }
}
