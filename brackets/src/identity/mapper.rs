//! Persistent external identifier mapping.

use super::table::IdentityTable;
use crate::bracket::{BracketError, BracketResult, StageId};
use crate::store::BracketRepository;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Identity table backed by the repository
///
/// The table is loaded once and kept in memory. A new binding is reserved
/// first, written to the repository together with its stage, and only then
/// committed so that it resolves.
pub struct IdentityMapper {
    repository: Arc<dyn BracketRepository>,
    table: RwLock<IdentityTable>,
}

impl IdentityMapper {
    pub fn new(repository: Arc<dyn BracketRepository>) -> Self {
        Self {
            repository,
            table: RwLock::new(IdentityTable::new()),
        }
    }

    /// Load every stored binding
    ///
    /// Reservations of creates still in flight are kept.
    ///
    /// # Errors
    ///
    /// `Storage` on read failure, `IdentityCollision` if stored rows are not
    /// one-to-one.
    pub async fn load(&self) -> BracketResult<usize> {
        let rows = self.repository.select_identities().await?;
        let mut table = IdentityTable::new();
        for (external_id, stage_id) in &rows {
            table.bind(external_id, *stage_id)?;
        }
        let count = table.len();

        let mut current = self.table.write().await;
        table.take_reservations(&mut current);
        *current = table;
        drop(current);

        log::info!("Loaded {} external stage identifiers", count);
        Ok(count)
    }

    /// Hold an external id for a stage that is about to be stored
    ///
    /// # Errors
    ///
    /// `IdentityCollision` if the id is bound or reserved for another stage.
    pub async fn reserve(&self, external_id: &str, stage_id: StageId) -> BracketResult<()> {
        self.table.write().await.reserve(external_id, stage_id)
    }

    /// Make a reserved binding visible once its stage is stored
    pub async fn commit(&self, external_id: &str, stage_id: StageId) -> BracketResult<()> {
        self.table.write().await.bind(external_id, stage_id)
    }

    /// Give up a reservation after a failed create
    pub async fn release(&self, external_id: &str, stage_id: StageId) {
        self.table.write().await.release(external_id, stage_id);
    }

    /// Stage bound to an external id
    ///
    /// # Errors
    ///
    /// `ExternalIdNotFound` if nothing is bound.
    pub async fn resolve(&self, external_id: &str) -> BracketResult<StageId> {
        self.table
            .read()
            .await
            .resolve(external_id)
            .ok_or_else(|| BracketError::ExternalIdNotFound(external_id.to_string()))
    }
}
