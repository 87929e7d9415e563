//! Bijective map between external identifiers and stage IDs.

use crate::bracket::{BracketError, BracketResult, StageId};
use std::collections::HashMap;

/// External id <-> stage id, one-to-one
///
/// A reservation holds an external id for a stage that is still being
/// stored. Reserved ids do not resolve, but they block other stages.
#[derive(Debug, Clone, Default)]
pub struct IdentityTable {
    by_external: HashMap<String, StageId>,
    by_stage: HashMap<StageId, String>,
    reserved: HashMap<String, StageId>,
}

impl IdentityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage bound to an external id
    pub fn resolve(&self, external_id: &str) -> Option<StageId> {
        self.by_external.get(external_id).copied()
    }

    /// External id bound to a stage
    pub fn external_of(&self, stage_id: StageId) -> Option<&str> {
        self.by_stage.get(&stage_id).map(String::as_str)
    }

    /// Check that a binding can be added
    ///
    /// Returns `Ok(true)` if the exact pair is already bound.
    pub fn check(&self, external_id: &str, stage_id: StageId) -> BracketResult<bool> {
        match (self.resolve(external_id), self.external_of(stage_id)) {
            (Some(existing), _) if existing == stage_id => Ok(true),
            (Some(existing), _) => Err(BracketError::IdentityCollision {
                external_id: external_id.to_string(),
                existing,
                requested: stage_id,
            }),
            (None, Some(other)) => Err(BracketError::IdentityCollision {
                external_id: other.to_string(),
                existing: stage_id,
                requested: stage_id,
            }),
            (None, None) => match self.reserved.get(external_id) {
                Some(&holder) if holder != stage_id => Err(BracketError::IdentityCollision {
                    external_id: external_id.to_string(),
                    existing: holder,
                    requested: stage_id,
                }),
                _ => Ok(false),
            },
        }
    }

    /// Hold an external id for a stage until it is bound or released
    ///
    /// # Errors
    ///
    /// `IdentityCollision` if the id is bound or reserved for another stage.
    pub fn reserve(&mut self, external_id: &str, stage_id: StageId) -> BracketResult<()> {
        if !self.check(external_id, stage_id)? {
            self.reserved.insert(external_id.to_string(), stage_id);
        }
        Ok(())
    }

    /// Drop a reservation held by `stage_id`
    pub fn release(&mut self, external_id: &str, stage_id: StageId) {
        if self.reserved.get(external_id) == Some(&stage_id) {
            self.reserved.remove(external_id);
        }
    }

    /// Move every pending reservation out of `other`
    pub fn take_reservations(&mut self, other: &mut IdentityTable) {
        self.reserved.extend(other.reserved.drain());
    }

    /// Add a binding
    ///
    /// Binding the same pair twice is a no-op.
    ///
    /// # Errors
    ///
    /// `IdentityCollision` if either side is already bound to something else.
    pub fn bind(&mut self, external_id: &str, stage_id: StageId) -> BracketResult<()> {
        if self.check(external_id, stage_id)? {
            return Ok(());
        }
        self.reserved.remove(external_id);
        self.by_external.insert(external_id.to_string(), stage_id);
        self.by_stage.insert(stage_id, external_id.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_external.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_resolve() {
        let mut table = IdentityTable::new();
        table.bind("cup-2024", 7).unwrap();
        assert_eq!(table.resolve("cup-2024"), Some(7));
        assert_eq!(table.external_of(7), Some("cup-2024"));
        assert_eq!(table.resolve("cup-2025"), None);
    }

    #[test]
    fn test_rebinding_same_pair_is_noop() {
        let mut table = IdentityTable::new();
        table.bind("cup", 1).unwrap();
        table.bind("cup", 1).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_external_id_collision() {
        let mut table = IdentityTable::new();
        table.bind("cup", 1).unwrap();
        let err = table.bind("cup", 2).unwrap_err();
        assert!(matches!(
            err,
            BracketError::IdentityCollision {
                existing: 1,
                requested: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_stage_already_bound() {
        let mut table = IdentityTable::new();
        table.bind("cup", 1).unwrap();
        assert!(table.bind("league", 1).is_err());
        assert_eq!(table.resolve("league"), None);
    }

    #[test]
    fn test_reservation_blocks_other_stages() {
        let mut table = IdentityTable::new();
        table.reserve("cup", 1).unwrap();
        assert_eq!(table.resolve("cup"), None);

        let err = table.reserve("cup", 2).unwrap_err();
        assert!(matches!(
            err,
            BracketError::IdentityCollision {
                existing: 1,
                requested: 2,
                ..
            }
        ));
        assert!(table.bind("cup", 2).is_err());

        table.bind("cup", 1).unwrap();
        assert_eq!(table.resolve("cup"), Some(1));
    }

    #[test]
    fn test_release_frees_the_id() {
        let mut table = IdentityTable::new();
        table.reserve("cup", 1).unwrap();
        table.release("cup", 2);
        assert!(table.reserve("cup", 2).is_err());

        table.release("cup", 1);
        table.reserve("cup", 2).unwrap();
        table.bind("cup", 2).unwrap();
        assert_eq!(table.resolve("cup"), Some(2));
    }

    #[test]
    fn test_distinct_ids_never_share_a_stage() {
        // strings that collide under a 32-bit rolling hash stay distinct
        let mut table = IdentityTable::new();
        table.bind("Aa", 1).unwrap();
        table.bind("BB", 2).unwrap();
        assert_ne!(table.resolve("Aa"), table.resolve("BB"));
    }
}
