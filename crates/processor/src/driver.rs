use crate::cli::Cli;
use crate::config::Config;
use crate::ingest::{ingest_from_file, BlockService};
use crate::metrics;
use crate::progress::Progress;
use crate::server::serve_metrics;
use crate::store::JsonLinesStore;
use anyhow::{bail, ensure, Context};
use domstake_chain::BlockSnapshot;
use domstake_mapping::{BlockMapper, EntityStore};
use domstake_primitives::{Block, BlockNumber, BlockRef};
use futures::{Stream, TryStreamExt};
use prometheus_client::registry::Registry;
use std::pin::pin;
use std::time::{Duration, Instant};
use tracing::{error, info};


pub async fn run(args: &Cli) -> anyhow::Result<()> {
    ensure!(
        args.first_block <= args.last_block.unwrap_or(BlockNumber::MAX),
        "--first-block is greater than --last-block"
    );

    let config = match &args.config {
        Some(file) => Config::read(file)?,
        None => Config::default()
    };

    if let Some(port) = args.prom_port {
        let mut registry = Registry::default();
        metrics::register_metrics(&mut registry);
        tokio::spawn(async move {
            if let Err(err) = serve_metrics(registry, port).await {
                error!(err = ?err, "metrics server terminated");
            }
        });
    }

    let mut store = match &args.output {
        Some(path) => JsonLinesStore::append(path).await?,
        None => JsonLinesStore::stdout()
    };

    let mut driver = Driver::new(BlockMapper::new(config.mapping.clone()), config.report_interval());

    match (&args.input, &args.src) {
        (Some(path), _) => {
            let blocks = ingest_from_file(path.clone(), args.first_block, args.last_block);
            driver.run(blocks, &mut store).await
        },
        (None, Some(url)) => {
            let service = BlockService::new(
                url.clone(),
                Duration::from_secs(args.block_stream_interval as u64)
            );
            let blocks = service.stream(args.first_block, args.last_block);
            driver.run(blocks, &mut store).await
        },
        (None, None) => bail!("either --input or --src must be given")
    }
}


/// Feeds blocks through the mapper one at a time.
///
/// Each block is flushed before the next one is mapped.
pub struct Driver {
    mapper: BlockMapper,
    progress: Progress,
    report_interval: Duration,
    head: Option<BlockRef>,
}


impl Driver {
    pub fn new(mapper: BlockMapper, report_interval: Duration) -> Self {
        Self {
            mapper,
            progress: Progress::new(10, Duration::from_secs(1)),
            report_interval,
            head: None
        }
    }

    pub fn head(&self) -> Option<&BlockRef> {
        self.head.as_ref()
    }

    pub async fn run<S, T>(&mut self, blocks: S, store: &mut T) -> anyhow::Result<()>
    where
        S: Stream<Item = anyhow::Result<BlockSnapshot>>,
        T: EntityStore + ?Sized
    {
        let mut blocks = pin!(blocks);
        let mut last_report = Instant::now();

        while let Some(snapshot) = blocks.try_next().await? {
            self.process(&snapshot, store).await?;

            if last_report.elapsed() > self.report_interval {
                self.report();
                last_report = Instant::now();
            }
        }

        if self.progress.has_news() {
            self.report();
        }

        Ok(())
    }

    pub async fn process<T: EntityStore + ?Sized>(
        &mut self,
        snapshot: &BlockSnapshot,
        store: &mut T
    ) -> anyhow::Result<()>
    {
        let block = snapshot.to_ref();

        if let Some(head) = &self.head {
            ensure!(
                block.number > head.number,
                "block {} arrived after block {}",
                block,
                head
            );
            if block.number == head.number + 1 {
                ensure!(
                    snapshot.parent_hash() == head.hash,
                    "block {} is not a child of {}",
                    block,
                    head
                );
            }
        }

        let cache = self.mapper
            .process_block(&snapshot.block, &snapshot.current_reader(), &snapshot.parent_reader())
            .await
            .with_context(|| format!("failed to map block {}", block))?;

        let staged = cache.len() as u64;
        let skipped = cache.skipped() as u64;

        cache.flush_into(store, &block).await?;

        metrics::STAGED_ENTITIES.inc_by(staged);
        metrics::SKIPPED_RECORDS.inc_by(skipped);
        metrics::LAST_BLOCK.set(i64::try_from(block.number).unwrap_or(i64::MAX));

        self.progress.set_current_value(block.number);
        self.head = Some(block);
        Ok(())
    }

    fn report(&mut self) {
        let speed = self.progress.speed();
        metrics::PROGRESS.set(speed);

        if let Some(head) = &self.head {
            info!(
                "last block: {}, progress: {} blocks/sec",
                head.number,
                speed.round()
            );
        }
    }
}
