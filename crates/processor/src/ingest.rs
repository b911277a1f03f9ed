use anyhow::Context;
use async_stream::try_stream;
use domstake_primitives::{Block, BlockNumber};
use futures::{Stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::pin::pin;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::{info, warn};
use url::Url;


const RETRY_PAUSE: Duration = Duration::from_secs(5);


#[derive(Serialize, Debug, Clone, Copy)]
struct BlockRange {
    from: BlockNumber,
    to: Option<BlockNumber>,
}


/// HTTP service that streams block snapshots of a requested range as JSON lines.
#[derive(Clone)]
pub struct BlockService {
    client: reqwest::Client,
    url: Url,
    poll_interval: Duration,
}


impl BlockService {
    pub fn new(url: Url, poll_interval: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            poll_interval
        }
    }

    /// Streams blocks of `[from, to]`, waiting for new ones once the service runs out of them.
    ///
    /// Failures of the very first request are returned, later ones are retried.
    pub fn stream<B: Block + DeserializeOwned>(
        self,
        from: BlockNumber,
        to: Option<BlockNumber>
    ) -> impl Stream<Item = anyhow::Result<B>>
    {
        try_stream! {
            let mut next_block = from;

            while to.map_or(true, |last_block| next_block <= last_block) {
                let mut blocks = pin!(self.fetch::<B>(BlockRange { from: next_block, to }));
                let mut idle = true;

                while let Some(result) = blocks.next().await {
                    match result {
                        Ok(block) => {
                            idle = false;
                            next_block = block.number() + 1;
                            yield block
                        },
                        Err(err) if next_block > from => {
                            warn!(err = ?err, next_block, "block stream failed, retrying in {} sec", RETRY_PAUSE.as_secs());
                            tokio::time::sleep(RETRY_PAUSE).await;
                            idle = false;
                            break
                        },
                        Err(err) => Err(err)?
                    }
                }

                if idle {
                    info!(
                        next_block,
                        "no new blocks, polling again in {} sec",
                        self.poll_interval.as_secs()
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    fn fetch<'a, B: DeserializeOwned + 'a>(&'a self, range: BlockRange) -> impl Stream<Item = anyhow::Result<B>> + 'a {
        try_stream! {
            let body = self.client
                .post(self.url.clone())
                .json(&range)
                .send()
                .await?
                .error_for_status()?
                .bytes_stream()
                .map_err(std::io::Error::other);

            let mut lines = StreamReader::new(body).lines();

            while let Some(line) = lines.next_line().await? {
                let block: B = serde_json::from_str(&line)
                    .with_context(|| format!("invalid block in range {:?}", range))?;
                yield block;
            }
        }
    }
}


/// Streams blocks of `[from, to]` from a JSON lines file.
pub fn ingest_from_file<B: Block + DeserializeOwned>(
    path: PathBuf,
    from: BlockNumber,
    to: Option<BlockNumber>
) -> impl Stream<Item = anyhow::Result<B>>
{
    try_stream! {
        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;

        let mut lines = tokio::io::BufReader::new(file).lines();
        let mut line_number = 0;

        while let Some(line) = lines.next_line().await? {
            line_number += 1;
            if line.trim().is_empty() {
                continue
            }

            let block: B = serde_json::from_str(&line).with_context(|| {
                format!("failed to parse block at {}:{}", path.display(), line_number)
            })?;

            if block.number() < from {
                continue
            }
            if to.map_or(false, |last_block| block.number() > last_block) {
                break
            }
            yield block;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use domstake_chain::BlockSnapshot;
    use std::io::Write;


    fn line(height: BlockNumber) -> String {
        serde_json::json!({
            "header": {
                "hash": format!("0x{:02x}", height),
                "parentHash": format!("0x{:02x}", height.saturating_sub(1)),
                "height": height
            },
            "state": {"current": {}}
        }).to_string()
    }

    #[tokio::test]
    async fn file_range() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        for height in 1..=5 {
            writeln!(file, "{}", line(height))?;
        }
        writeln!(file)?;

        let blocks: Vec<BlockSnapshot> = ingest_from_file(file.path().to_path_buf(), 2, Some(4))
            .try_collect()
            .await?;

        let heights: Vec<_> = blocks.iter().map(|b| b.number()).collect();
        assert_eq!(heights, vec![2, 3, 4]);
        Ok(())
    }

    #[tokio::test]
    async fn file_parse_error() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "{}", line(1))?;
        writeln!(file, "{{not a block")?;

        let result: anyhow::Result<Vec<BlockSnapshot>> = ingest_from_file(file.path().to_path_buf(), 0, None)
            .try_collect()
            .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains(":2"), "{}", err);
        Ok(())
    }
}
