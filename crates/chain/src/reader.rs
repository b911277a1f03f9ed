use crate::JsonValue;
use domstake_primitives::{DomainId, OperatorId};
use futures::future::BoxFuture;


/// Raw operator storage entry together with its owner account.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOperator {
    pub operator_id: OperatorId,
    pub owner: Option<String>,
    pub record: JsonValue,
}


/// Read-only access to the chain state as of one particular block.
///
/// Mappers get one reader for the block being processed and one for its parent.
/// Errors returned from here are chain read failures and abort the block;
/// retrying is up to the caller.
pub trait ChainReader: Sync {
    /// Ids of all registered domains
    fn domains(&self) -> BoxFuture<'_, anyhow::Result<Vec<DomainId>>>;

    fn operators(&self) -> BoxFuture<'_, anyhow::Result<Vec<RawOperator>>>;

    /// `None` when the state has no summary for the domain, e.g. at genesis.
    fn domain_staking_summary(
        &self,
        domain_id: DomainId
    ) -> BoxFuture<'_, anyhow::Result<Option<JsonValue>>>;

    /// `domains.deposits(operatorId, address)`, `None` when there is no such entry.
    fn operator_deposit<'a>(
        &'a self,
        operator_id: OperatorId,
        address: &'a str
    ) -> BoxFuture<'a, anyhow::Result<Option<JsonValue>>>;

    /// `domains.withdrawals(operatorId, address)`, `None` when there is no such entry.
    fn operator_withdrawal<'a>(
        &'a self,
        operator_id: OperatorId,
        address: &'a str
    ) -> BoxFuture<'a, anyhow::Result<Option<JsonValue>>>;
}
