//! In-memory repository, used by tests and the command-line driver.

use super::{
    errors::{StoreError, StoreResult},
    repository::{BracketRepository, MatchFilter},
};
use crate::bracket::{Bracket, Match, Stage, StageId};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicI64, Ordering},
};
use tokio::sync::RwLock;

/// Repository that keeps every row in process memory
#[derive(Debug)]
pub struct InMemoryBracketRepository {
    next_id: AtomicI64,
    stages: RwLock<BTreeMap<StageId, Bracket>>,
    identities: RwLock<HashMap<String, StageId>>,
}

impl InMemoryBracketRepository {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            stages: RwLock::new(BTreeMap::new()),
            identities: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBracketRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BracketRepository for InMemoryBracketRepository {
    async fn allocate_stage_id(&self) -> StoreResult<StageId> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn insert_bracket(
        &self,
        bracket: &Bracket,
        external_id: Option<&str>,
    ) -> StoreResult<()> {
        let stage_id = bracket.id();
        let mut identities = self.identities.write().await;
        let mut stages = self.stages.write().await;

        if stages.contains_key(&stage_id) {
            return Err(StoreError::Conflict(format!(
                "stage {stage_id} already exists"
            )));
        }
        if let Some(external_id) = external_id {
            if identities.contains_key(external_id)
                || identities.values().any(|&id| id == stage_id)
            {
                return Err(StoreError::Conflict(format!(
                    "identity {external_id:?} -> {stage_id}"
                )));
            }
        }

        stages.insert(stage_id, bracket.clone());
        if let Some(external_id) = external_id {
            identities.insert(external_id.to_string(), stage_id);
        }
        Ok(())
    }

    async fn select_bracket(&self, stage_id: StageId) -> StoreResult<Option<Bracket>> {
        Ok(self.stages.read().await.get(&stage_id).cloned())
    }

    async fn select_stage_ids(&self) -> StoreResult<Vec<StageId>> {
        Ok(self.stages.read().await.keys().copied().collect())
    }

    async fn select_matches(
        &self,
        stage_id: StageId,
        filter: &MatchFilter,
    ) -> StoreResult<Vec<Match>> {
        let stages = self.stages.read().await;
        Ok(stages
            .get(&stage_id)
            .map(|bracket| {
                bracket
                    .matches
                    .iter()
                    .filter(|m| filter.accepts(m))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_matches(&self, stage: &Stage, matches: &[Match]) -> StoreResult<()> {
        let mut stages = self.stages.write().await;
        let stored = stages
            .get_mut(&stage.id)
            .ok_or_else(|| StoreError::Missing(format!("stage {}", stage.id)))?;

        // validate every row before writing any of them
        if let Some(m) = matches.iter().find(|m| stored.match_by_id(m.id).is_none()) {
            return Err(StoreError::Missing(format!(
                "match {} in stage {}",
                m.id, stage.id
            )));
        }

        stored.stage = stage.clone();
        for m in matches {
            if let Some(row) = stored.match_by_id_mut(m.id) {
                *row = m.clone();
            }
        }
        Ok(())
    }

    async fn select_identities(&self) -> StoreResult<Vec<(String, StageId)>> {
        let identities = self.identities.read().await;
        Ok(identities
            .iter()
            .map(|(external, &stage_id)| (external.clone(), stage_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{BracketFactory, MatchStatus, StageFormat, StageSettings};
    use crate::seeding::{SeedingStrategy, seed_participants};

    fn bracket(stage_id: StageId) -> Bracket {
        let names: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let participants = seed_participants(stage_id, &names, SeedingStrategy::Natural).unwrap();
        BracketFactory::create(
            stage_id,
            "Memory",
            StageFormat::SingleElimination,
            participants,
            StageSettings::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_select() {
        let repo = InMemoryBracketRepository::new();
        let id = repo.allocate_stage_id().await.unwrap();
        repo.insert_bracket(&bracket(id), None).await.unwrap();

        let loaded = repo.select_bracket(id).await.unwrap().unwrap();
        assert_eq!(loaded.matches.len(), 3);
        assert_eq!(repo.select_stage_ids().await.unwrap(), [id]);
        assert!(repo.select_bracket(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let repo = InMemoryBracketRepository::new();
        repo.insert_bracket(&bracket(1), None).await.unwrap();
        let result = repo.insert_bracket(&bracket(1), None).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_select_matches_by_filter() {
        let repo = InMemoryBracketRepository::new();
        repo.insert_bracket(&bracket(1), None).await.unwrap();

        let ready = repo
            .select_matches(1, &MatchFilter::status(MatchStatus::Ready))
            .await
            .unwrap();
        assert_eq!(ready.len(), 2);

        let final_round = repo.select_matches(1, &MatchFilter::round(1)).await.unwrap();
        assert_eq!(final_round.len(), 1);
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_match_atomically() {
        let repo = InMemoryBracketRepository::new();
        let original = bracket(1);
        repo.insert_bracket(&original, None).await.unwrap();

        let mut changed = original.matches[0].clone();
        changed.score1 = Some(3);
        let mut unknown = changed.clone();
        unknown.id = 42;

        let result = repo
            .update_matches(&original.stage, &[changed, unknown])
            .await;
        assert!(matches!(result, Err(StoreError::Missing(_))));

        let stored = repo.select_bracket(1).await.unwrap().unwrap();
        assert_eq!(stored.matches[0].score1, None);
    }

    #[tokio::test]
    async fn test_identity_is_bijective() {
        let repo = InMemoryBracketRepository::new();
        repo.insert_bracket(&bracket(1), Some("ext-1")).await.unwrap();
        assert!(repo.insert_bracket(&bracket(2), Some("ext-1")).await.is_err());
        assert_eq!(
            repo.select_identities().await.unwrap(),
            [("ext-1".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_identity_conflict_stores_nothing() {
        let repo = InMemoryBracketRepository::new();
        repo.insert_bracket(&bracket(1), Some("cup")).await.unwrap();

        let result = repo.insert_bracket(&bracket(2), Some("cup")).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(repo.select_stage_ids().await.unwrap(), [1]);
        assert!(repo.select_bracket(2).await.unwrap().is_none());
    }
}
