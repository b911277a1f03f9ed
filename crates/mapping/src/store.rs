use crate::entity::{Entity, EntityKind, EntityRecord};
use domstake_primitives::BlockRef;
use futures::future::{ready, BoxFuture};
use futures::FutureExt;
use std::collections::BTreeMap;


/// Persistence side of the mapper.
///
/// Staged records become visible only after `flush`, which stores them by id
/// with upsert semantics, so re-processing a block is idempotent.
pub trait EntityStore: Send {
    fn stage(&mut self, entity: Entity);

    fn flush<'a>(&'a mut self, block: &'a BlockRef) -> BoxFuture<'a, anyhow::Result<()>>;
}


#[derive(Debug, Default)]
pub struct MemoryStore {
    pending: Vec<Entity>,
    entities: BTreeMap<(EntityKind, String), Entity>,
    head: Option<BlockRef>,
}


impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: EntityRecord>(&self, id: &str) -> Option<&T> {
        self.entities.get(&(T::KIND, id.to_string())).and_then(T::from_entity)
    }

    pub fn records<'a, T: EntityRecord + 'a>(&'a self) -> impl Iterator<Item = &'a T> {
        self.entities.values().filter_map(T::from_entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Last flushed block
    pub fn head(&self) -> Option<&BlockRef> {
        self.head.as_ref()
    }
}


impl EntityStore for MemoryStore {
    fn stage(&mut self, entity: Entity) {
        self.pending.push(entity)
    }

    fn flush<'a>(&'a mut self, block: &'a BlockRef) -> BoxFuture<'a, anyhow::Result<()>> {
        for entity in self.pending.drain(..) {
            self.entities.insert((entity.kind(), entity.id().to_string()), entity);
        }
        self.head = Some(block.clone());
        ready(Ok(())).boxed()
    }
}
