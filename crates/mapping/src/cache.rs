use crate::entity::{Entity, EntityKind, EntityRecord};
use crate::store::EntityStore;
use domstake_primitives::BlockRef;
use std::collections::BTreeMap;


/// Entities derived from a single block, waiting to be flushed as one unit.
///
/// The cache does not deduplicate: records keyed by a content hash collapse
/// at the storage layer, where the same id overwrites.
#[derive(Debug, Default)]
pub struct EntityCache {
    staged: BTreeMap<EntityKind, Vec<Entity>>,
    skipped: usize,
}


impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, entity: impl Into<Entity>) {
        let entity = entity.into();
        self.staged.entry(entity.kind()).or_default().push(entity);
    }

    /// Notes a record that was dropped because its source data could not be parsed.
    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.staged.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entities(&self, kind: EntityKind) -> &[Entity] {
        self.staged.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn records<'a, T: EntityRecord + 'a>(&'a self) -> impl Iterator<Item = &'a T> {
        self.entities(T::KIND).iter().filter_map(T::from_entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.staged.values().flatten()
    }

    /// Hands all staged entities to the store and flushes them for the given block.
    pub async fn flush_into<S: EntityStore + ?Sized>(
        self,
        store: &mut S,
        block: &BlockRef
    ) -> anyhow::Result<()>
    {
        for entity in self.staged.into_values().flatten() {
            store.stage(entity);
        }
        store.flush(block).await
    }
}
