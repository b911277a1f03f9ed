use crate::{Block, ChainReader, HumanNumber, JsonValue, RawOperator};
use domstake_primitives::{DomainId, OperatorId};
use futures::future::{ready, BoxFuture};
use futures::FutureExt;
use serde::Deserialize;
use std::collections::BTreeMap;


#[derive(Deserialize, Debug, Clone)]
pub struct OperatorEntry {
    #[serde(default)]
    pub owner: Option<String>,
    pub record: JsonValue,
}


type NominatorEntries = BTreeMap<HumanNumber<OperatorId>, BTreeMap<String, JsonValue>>;


/// Human readable storage reads of a single block.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChainState {
    #[serde(default)]
    pub domains: Vec<HumanNumber<DomainId>>,
    #[serde(default)]
    pub staking_summaries: BTreeMap<HumanNumber<DomainId>, JsonValue>,
    #[serde(default)]
    pub operators: BTreeMap<HumanNumber<OperatorId>, OperatorEntry>,
    #[serde(default)]
    pub deposits: NominatorEntries,
    #[serde(default)]
    pub withdrawals: NominatorEntries,
}


#[derive(Deserialize, Debug, Clone, Default)]
pub struct BlockState {
    pub current: ChainState,
    #[serde(default)]
    pub parent: Option<ChainState>,
}


/// A block together with the state reads of itself and its parent.
#[derive(Deserialize, Debug, Clone)]
pub struct BlockSnapshot {
    #[serde(flatten)]
    pub block: Block,
    pub state: BlockState,
}


impl domstake_primitives::Block for BlockSnapshot {
    fn number(&self) -> domstake_primitives::BlockNumber {
        self.block.header.height
    }

    fn hash(&self) -> &str {
        &self.block.header.hash
    }

    fn parent_hash(&self) -> &str {
        &self.block.header.parent_hash
    }

    fn timestamp(&self) -> Option<i64> {
        self.block.header.timestamp
    }
}


impl BlockSnapshot {
    pub fn current_reader(&self) -> SnapshotReader<'_> {
        SnapshotReader::new(Some(&self.state.current))
    }

    pub fn parent_reader(&self) -> SnapshotReader<'_> {
        SnapshotReader::new(self.state.parent.as_ref())
    }
}


/// Serves chain reads from a [ChainState].
///
/// A reader without state stands for a block before genesis: it knows no domains,
/// operators or storage entries.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotReader<'s> {
    state: Option<&'s ChainState>
}


impl<'s> SnapshotReader<'s> {
    pub fn new(state: Option<&'s ChainState>) -> Self {
        Self {
            state
        }
    }

    fn nominator_entry(
        entries: Option<&NominatorEntries>,
        operator_id: OperatorId,
        address: &str
    ) -> Option<JsonValue>
    {
        entries?.get(&HumanNumber(operator_id))?.get(address).cloned()
    }
}


impl<'s> ChainReader for SnapshotReader<'s> {
    fn domains(&self) -> BoxFuture<'_, anyhow::Result<Vec<DomainId>>> {
        let domains = match self.state {
            None => Vec::new(),
            Some(state) if state.domains.is_empty() => {
                state.staking_summaries.keys().map(|id| id.0).collect()
            },
            Some(state) => state.domains.iter().map(|id| id.0).collect()
        };
        ready(Ok(domains)).boxed()
    }

    fn operators(&self) -> BoxFuture<'_, anyhow::Result<Vec<RawOperator>>> {
        let operators = self.state.map_or_else(Vec::new, |state| {
            state.operators.iter().map(|(id, entry)| RawOperator {
                operator_id: id.0,
                owner: entry.owner.clone(),
                record: entry.record.clone()
            }).collect()
        });
        ready(Ok(operators)).boxed()
    }

    fn domain_staking_summary(
        &self,
        domain_id: DomainId
    ) -> BoxFuture<'_, anyhow::Result<Option<JsonValue>>>
    {
        let summary = self.state.and_then(|state| {
            state.staking_summaries.get(&HumanNumber(domain_id)).cloned()
        });
        ready(Ok(summary)).boxed()
    }

    fn operator_deposit<'a>(
        &'a self,
        operator_id: OperatorId,
        address: &'a str
    ) -> BoxFuture<'a, anyhow::Result<Option<JsonValue>>>
    {
        let entry = Self::nominator_entry(
            self.state.map(|state| &state.deposits),
            operator_id,
            address
        );
        ready(Ok(entry)).boxed()
    }

    fn operator_withdrawal<'a>(
        &'a self,
        operator_id: OperatorId,
        address: &'a str
    ) -> BoxFuture<'a, anyhow::Result<Option<JsonValue>>>
    {
        let entry = Self::nominator_entry(
            self.state.map(|state| &state.withdrawals),
            operator_id,
            address
        );
        ready(Ok(entry)).boxed()
    }
}
