//! Bracket manager for spawning and managing stage actors.

use super::{
    actor::{StageActor, StageHandle},
    config::ManagerConfig,
};
use crate::{
    bracket::{
        Bracket, BracketError, BracketFactory, BracketResult, Match, MatchId, MatchUpdate, Stage,
        StageFormat, StageId, StageSettings,
    },
    events::{BracketEvent, BroadcastEventSink, EventSink},
    identity::IdentityMapper,
    seeding::{SeedingStrategy, seed_participants},
    stats::{self, StageProgress, StageSummary, Standing},
    store::{BracketRepository, MatchFilter},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Bracket creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBracket {
    pub name: String,
    pub format: StageFormat,
    /// Entrant names in the caller's order
    pub participants: Vec<String>,
    #[serde(default)]
    pub seeding: SeedingStrategy,
    #[serde(default)]
    pub settings: StageSettings,
    /// Opaque identifier the caller will use to find the stage again
    #[serde(default)]
    pub external_id: Option<String>,
}

impl CreateBracket {
    /// Request with default seeding and settings
    pub fn new(name: &str, format: StageFormat, participants: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            format,
            participants: participants.iter().map(|p| p.to_string()).collect(),
            seeding: SeedingStrategy::default(),
            settings: StageSettings::default(),
            external_id: None,
        }
    }
}

/// Bracket manager for managing multiple stages
pub struct BracketManager {
    /// Row store
    repository: Arc<dyn BracketRepository>,

    /// Notification sink
    events: Arc<dyn EventSink>,

    /// External identifier table
    identities: IdentityMapper,

    /// Active stage handles
    stages: Arc<RwLock<HashMap<StageId, StageHandle>>>,

    config: ManagerConfig,
}

impl BracketManager {
    /// Create a new bracket manager
    ///
    /// # Arguments
    ///
    /// * `repository` - Row store for stages
    /// * `events` - Notification sink
    /// * `config` - Manager configuration
    pub fn new(
        repository: Arc<dyn BracketRepository>,
        events: Arc<dyn EventSink>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            identities: IdentityMapper::new(repository.clone()),
            repository,
            events,
            stages: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Create a manager that publishes events on a broadcast channel
    ///
    /// Returns the sink so callers can subscribe.
    pub fn with_broadcast(
        repository: Arc<dyn BracketRepository>,
        config: ManagerConfig,
    ) -> (Self, BroadcastEventSink) {
        let sink = BroadcastEventSink::new(config.event_buffer);
        let manager = Self::new(repository, Arc::new(sink.clone()), config);
        (manager, sink)
    }

    /// Load stored stages and identifiers, spawning an actor per stage
    ///
    /// Stages that already have an actor are skipped.
    ///
    /// # Returns
    ///
    /// * `BracketResult<usize>` - Number of stages loaded
    pub async fn load_existing_stages(&self) -> BracketResult<usize> {
        self.identities.load().await?;

        let mut loaded = 0;
        for stage_id in self.repository.select_stage_ids().await? {
            if self.stages.read().await.contains_key(&stage_id) {
                continue;
            }
            let Some(bracket) = self.repository.select_bracket(stage_id).await? else {
                continue;
            };
            self.spawn(bracket).await;
            loaded += 1;
        }

        log::info!("Loaded {} existing stages", loaded);
        Ok(loaded)
    }

    /// Create, persist and spawn a new stage
    ///
    /// # Errors
    ///
    /// * `InsufficientParticipants` - fewer than two entrants
    /// * `InvalidSettings` - settings foreign to the format
    /// * `IdentityCollision` - the external id is already bound
    pub async fn create_bracket(&self, request: CreateBracket) -> BracketResult<Stage> {
        if request.participants.len() < 2 {
            return Err(BracketError::InsufficientParticipants(
                request.participants.len(),
            ));
        }
        request.settings.validate(request.format)?;

        let stage_id = self.repository.allocate_stage_id().await?;
        let external_id = request.external_id.as_deref();

        // hold the id so a concurrent create cannot store a stage for it too
        if let Some(external_id) = external_id {
            self.identities.reserve(external_id, stage_id).await?;
        }
        let stored = self.store_new_stage(stage_id, &request).await;
        if let Some(external_id) = external_id {
            match &stored {
                Ok(_) => self.identities.commit(external_id, stage_id).await?,
                Err(_) => self.identities.release(external_id, stage_id).await,
            }
        }
        let bracket = stored?;

        let stage = bracket.stage.clone();
        self.events.emit(BracketEvent::TournamentCreated {
            id: stage.id,
            name: stage.name.clone(),
            format: stage.format,
            participants: bracket.participants.clone(),
        });
        self.spawn(bracket).await;

        log::info!(
            "Created {} stage {} '{}' with {} participants",
            stage.format,
            stage.id,
            stage.name,
            stage.participant_count
        );

        Ok(stage)
    }

    /// Seed, build and insert a stage along with its external id
    async fn store_new_stage(
        &self,
        stage_id: StageId,
        request: &CreateBracket,
    ) -> BracketResult<Bracket> {
        let participants = seed_participants(stage_id, &request.participants, request.seeding)?;
        let settings = StageSettings {
            seed_ordering: request.seeding,
            ..request.settings.clone()
        };
        let bracket = BracketFactory::create(
            stage_id,
            &request.name,
            request.format,
            participants,
            settings,
        )?;

        self.repository
            .insert_bracket(&bracket, request.external_id.as_deref())
            .await?;
        Ok(bracket)
    }

    async fn spawn(&self, bracket: Bracket) {
        let stage_id = bracket.id();
        let (actor, handle) = StageActor::new(
            bracket,
            self.repository.clone(),
            self.events.clone(),
            self.config.inbox_capacity,
        );

        let mut stages = self.stages.write().await;
        stages.insert(stage_id, handle);
        drop(stages);

        tokio::spawn(actor.run());
    }

    /// Get a stage handle
    pub async fn get_handle(&self, stage_id: StageId) -> BracketResult<StageHandle> {
        let stages = self.stages.read().await;
        stages
            .get(&stage_id)
            .cloned()
            .ok_or(BracketError::StageNotFound(stage_id))
    }

    /// Full committed state of a stage
    pub async fn get_stage(&self, stage_id: StageId) -> BracketResult<Arc<Bracket>> {
        Ok(self.get_handle(stage_id).await?.snapshot())
    }

    /// Matches of a stage accepted by the filter
    pub async fn get_matches(
        &self,
        stage_id: StageId,
        filter: &MatchFilter,
    ) -> BracketResult<Vec<Match>> {
        let bracket = self.get_stage(stage_id).await?;
        Ok(bracket
            .matches
            .iter()
            .filter(|m| filter.accepts(m))
            .cloned()
            .collect())
    }

    /// Report a match result
    pub async fn report_result(
        &self,
        stage_id: StageId,
        match_id: MatchId,
        update: MatchUpdate,
    ) -> BracketResult<Match> {
        self.get_handle(stage_id)
            .await?
            .report_result(match_id, update)
            .await
    }

    /// Revert a stage to its unplayed state
    ///
    /// Returns `false` if the stage was already pristine.
    pub async fn reset_stage(&self, stage_id: StageId) -> BracketResult<bool> {
        let changed = self.get_handle(stage_id).await?.reset().await?;
        if !changed {
            log::debug!("Stage {} already pristine", stage_id);
        }
        Ok(changed)
    }

    /// Standings, best first
    pub async fn compute_standings(&self, stage_id: StageId) -> BracketResult<Vec<Standing>> {
        Ok(stats::compute_standings(&*self.get_stage(stage_id).await?))
    }

    /// Match counters for the stage
    pub async fn stage_progress(&self, stage_id: StageId) -> BracketResult<StageProgress> {
        Ok(stats::compute_stage_progress(&*self.get_stage(stage_id).await?))
    }

    /// Stage overview with standings
    pub async fn stage_summary(&self, stage_id: StageId) -> BracketResult<StageSummary> {
        Ok(stats::stage_summary(&*self.get_stage(stage_id).await?))
    }

    /// Stage bound to an external identifier
    pub async fn resolve_external(&self, external_id: &str) -> BracketResult<StageId> {
        self.identities.resolve(external_id).await
    }

    /// Stop a stage actor and forget its handle
    ///
    /// Stored rows are kept; `load_existing_stages` brings the stage back.
    pub async fn close_stage(&self, stage_id: StageId) -> BracketResult<()> {
        let handle = self.get_handle(stage_id).await?;
        handle.close().await?;

        let mut stages = self.stages.write().await;
        stages.remove(&stage_id);
        drop(stages);

        log::info!("Closed stage {}", stage_id);
        Ok(())
    }

    /// Number of running stage actors
    pub async fn active_stage_count(&self) -> usize {
        self.stages.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::StageStatus;
    use crate::events::NoopEventSink;
    use crate::store::InMemoryBracketRepository;

    fn manager() -> BracketManager {
        BracketManager::new(
            Arc::new(InMemoryBracketRepository::new()),
            Arc::new(NoopEventSink),
            ManagerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_create_allocates_ids() {
        let manager = manager();
        let first = manager
            .create_bracket(CreateBracket::new("One", StageFormat::SingleElimination, &["A", "B"]))
            .await
            .unwrap();
        let second = manager
            .create_bracket(CreateBracket::new("Two", StageFormat::RoundRobin, &["A", "B", "C"]))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.status, StageStatus::Pending);
        assert_eq!(manager.active_stage_count().await, 2);
    }

    #[tokio::test]
    async fn test_create_rejects_single_participant() {
        let manager = manager();
        let result = manager
            .create_bracket(CreateBracket::new("Solo", StageFormat::SingleElimination, &["A"]))
            .await;
        assert!(matches!(
            result,
            Err(BracketError::InsufficientParticipants(1))
        ));
        assert_eq!(manager.active_stage_count().await, 0);
    }

    #[tokio::test]
    async fn test_seeding_is_recorded_in_settings() {
        let manager = manager();
        let mut request = CreateBracket::new("Seeded", StageFormat::SingleElimination, &["A", "B", "C"]);
        request.seeding = SeedingStrategy::Reverse;
        let stage = manager.create_bracket(request).await.unwrap();
        assert_eq!(stage.settings.seed_ordering, SeedingStrategy::Reverse);

        let bracket = manager.get_stage(stage.id).await.unwrap();
        assert_eq!(bracket.seeded_participants()[0].name, "C");
    }

    #[tokio::test]
    async fn test_unknown_stage() {
        let manager = manager();
        assert!(matches!(
            manager.get_stage(99).await,
            Err(BracketError::StageNotFound(99))
        ));
        assert!(matches!(
            manager.report_result(99, 0, MatchUpdate::scores(1, 0)).await,
            Err(BracketError::StageNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_external_id_binding() {
        let manager = manager();
        let mut request = CreateBracket::new("Cup", StageFormat::SingleElimination, &["A", "B"]);
        request.external_id = Some("cup-2026".to_string());
        let stage = manager.create_bracket(request.clone()).await.unwrap();
        assert_eq!(manager.resolve_external("cup-2026").await.unwrap(), stage.id);

        let duplicate = manager.create_bracket(request).await;
        assert!(matches!(
            duplicate,
            Err(BracketError::IdentityCollision { .. })
        ));
    }

    #[tokio::test]
    async fn test_close_stage() {
        let manager = manager();
        let stage = manager
            .create_bracket(CreateBracket::new("Close", StageFormat::SingleElimination, &["A", "B"]))
            .await
            .unwrap();
        manager.close_stage(stage.id).await.unwrap();
        assert_eq!(manager.active_stage_count().await, 0);
        assert!(manager.get_stage(stage.id).await.is_err());
    }
}
