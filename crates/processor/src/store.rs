use anyhow::Context;
use domstake_mapping::{Entity, EntityStore};
use domstake_primitives::{BlockNumber, BlockRef};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};


#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntityLine<'a> {
    kind: &'static str,
    id: &'a str,
    block_height: BlockNumber,
    data: &'a Entity,
}


/// Appends flushed entities to a JSON lines sink, one entity per line.
///
/// Consumers apply lines in order, a later line overwriting an earlier one with the same `(kind, id)`.
pub struct JsonLinesStore {
    writer: BufWriter<Box<dyn AsyncWrite + Unpin + Send>>,
    pending: Vec<Entity>,
}


impl JsonLinesStore {
    pub fn new(writer: Box<dyn AsyncWrite + Unpin + Send>) -> Self {
        Self {
            writer: BufWriter::new(writer),
            pending: Vec::new()
        }
    }

    pub async fn append(path: &Path) -> anyhow::Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self::new(Box::new(file)))
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(tokio::io::stdout()))
    }

    async fn write_pending(&mut self, block: &BlockRef) -> anyhow::Result<()> {
        let mut buf = Vec::new();
        for entity in self.pending.drain(..) {
            serde_json::to_writer(&mut buf, &EntityLine {
                kind: entity.kind().as_str(),
                id: entity.id(),
                block_height: block.number,
                data: &entity
            })?;
            buf.push(b'\n');
        }
        self.writer.write_all(&buf).await?;
        self.writer.flush().await?;
        Ok(())
    }
}


impl EntityStore for JsonLinesStore {
    fn stage(&mut self, entity: Entity) {
        self.pending.push(entity)
    }

    fn flush<'a>(&'a mut self, block: &'a BlockRef) -> BoxFuture<'a, anyhow::Result<()>> {
        async move {
            self.write_pending(block)
                .await
                .with_context(|| format!("failed to write entities of block {}", block))
        }.boxed()
    }
}
