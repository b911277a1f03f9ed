//! Aggregation of nominator events into deposit and withdrawal position records.

use crate::entity::{NominatorDeposit, NominatorWithdrawal};
use crate::mapper::BlockContext;
use anyhow::Context;
use domstake_chain::{parse_deposit, parse_withdrawal, ChainReader, DepositRecord, JsonValue, ParseError, WithdrawalRecord};
use domstake_primitives::{BlockNumber, DomainId, OperatorId};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use xxhash_rust::xxh3::xxh3_128;


/// An event that changed the deposit or withdrawal position of a nominator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NominatorEvent {
    pub operator_id: OperatorId,
    pub address: String,
    pub event_id: String,
    pub extrinsic_id: String,
    pub block_height: BlockNumber,
}


/// All events of one `(operator, address)` position within a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NominatorGroup {
    pub operator_id: OperatorId,
    pub address: String,
    pub event_ids: Vec<String>,
    pub extrinsic_ids: Vec<String>,
    pub block_heights: Vec<BlockNumber>,
}


/// Folds events by `(operator, address)`.
///
/// Groups come out in order of first appearance, ids within a group keep event order.
/// An event id seen twice for the same position is recorded once.
pub fn group_nominator_events<'a, I>(events: I) -> Vec<NominatorGroup>
where
    I: IntoIterator<Item = &'a NominatorEvent>
{
    let mut groups: Vec<NominatorGroup> = Vec::new();

    for event in events {
        let position = groups.iter().position(|g| {
            g.operator_id == event.operator_id && g.address == event.address
        });

        let group = match position {
            Some(idx) => &mut groups[idx],
            None => {
                groups.push(NominatorGroup {
                    operator_id: event.operator_id,
                    address: event.address.clone(),
                    event_ids: Vec::new(),
                    extrinsic_ids: Vec::new(),
                    block_heights: Vec::new()
                });
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };

        if group.event_ids.contains(&event.event_id) {
            continue
        }
        group.event_ids.push(event.event_id.clone());
        group.extrinsic_ids.push(event.extrinsic_id.clone());
        group.block_heights.push(event.block_height);
    }

    groups
}


/// Reads `domains.deposits` entries of all groups concurrently, in group order.
pub async fn read_deposits<R: ChainReader + ?Sized>(
    reader: &R,
    groups: &[NominatorGroup]
) -> anyhow::Result<Vec<Option<JsonValue>>>
{
    try_join_all(groups.iter().map(|group| async move {
        reader.operator_deposit(group.operator_id, &group.address).await.with_context(|| {
            format!("failed to read deposit of {} with operator {}", group.address, group.operator_id)
        })
    })).await
}


/// Reads `domains.withdrawals` entries of all groups concurrently, in group order.
pub async fn read_withdrawals<R: ChainReader + ?Sized>(
    reader: &R,
    groups: &[NominatorGroup]
) -> anyhow::Result<Vec<Option<JsonValue>>>
{
    try_join_all(groups.iter().map(|group| async move {
        reader.operator_withdrawal(group.operator_id, &group.address).await.with_context(|| {
            format!("failed to read withdrawal of {} with operator {}", group.address, group.operator_id)
        })
    })).await
}


/// Builds the deposit position of a group.
///
/// `raw` is the deposit map entry, `None` meaning the nominator has no deposit.
/// The domain is taken from the pending deposit's effective epoch and falls back
/// to `operator_domain`.
pub fn build_deposit(
    group: &NominatorGroup,
    raw: Option<&JsonValue>,
    operator_domain: Option<DomainId>,
    ctx: &BlockContext
) -> Result<NominatorDeposit, ParseError>
{
    let record = raw.map(parse_deposit).transpose()?.unwrap_or_default();
    let DepositRecord { known_shares, known_storage_fee_deposit, pending } = record;

    let domain_id = pending.as_ref()
        .map(|p| p.domain_id)
        .or(operator_domain)
        .ok_or(ParseError::missing("deposit", "domainId"))?;

    let pending_amount = pending.as_ref().map_or(0, |p| p.amount);
    let pending_storage_fee_deposit = pending.as_ref().map_or(0, |p| p.storage_fee_deposit);
    let pending_effective_domain_epoch = pending.as_ref().map(|p| p.effective_epoch);

    let id = ContentHash::new("deposit")
        .part(&group.address)
        .part(group.operator_id)
        .part(domain_id)
        .part(known_shares)
        .part(known_storage_fee_deposit)
        .part(pending_amount)
        .part(pending_storage_fee_deposit)
        .part(OptionalPart(pending_effective_domain_epoch))
        .finish();

    Ok(NominatorDeposit {
        id,
        address: group.address.clone(),
        operator_id: group.operator_id,
        domain_id,
        known_shares,
        known_storage_fee_deposit,
        pending_amount,
        pending_storage_fee_deposit,
        pending_effective_domain_epoch,
        event_ids: group.event_ids.clone(),
        extrinsic_ids: group.extrinsic_ids.clone(),
        block_heights: group.block_heights.clone(),
        timestamp: ctx.timestamp,
        block_height: ctx.height,
        processed: false
    })
}


/// Builds the withdrawal position of a group.
///
/// `raw` is the withdrawal map entry, `None` meaning nothing is being withdrawn.
/// The domain is taken from the withdrawal in shares, then from the first unlocking
/// withdrawal, then from `operator_domain`.
pub fn build_withdrawal(
    group: &NominatorGroup,
    raw: Option<&JsonValue>,
    operator_domain: Option<DomainId>,
    ctx: &BlockContext
) -> Result<NominatorWithdrawal, ParseError>
{
    let record = raw.map(parse_withdrawal).transpose()?.unwrap_or_default();
    let WithdrawalRecord {
        total_withdrawal_amount,
        total_storage_fee_withdrawal,
        withdrawals,
        in_shares
    } = record;

    let domain_id = in_shares.as_ref()
        .map(|w| w.domain_id)
        .or_else(|| withdrawals.first().map(|w| w.domain_id))
        .or(operator_domain)
        .ok_or(ParseError::missing("withdrawal", "domainId"))?;

    let withdrawals_json = serde_json::to_string(&withdrawals)
        .map_err(|err| ParseError::shape("withdrawal", err.to_string()))?;

    let total_pending_withdrawals = u32::try_from(withdrawals.len())
        .map_err(|_| ParseError::shape("withdrawal", "too many pending withdrawals"))?;

    let withdrawal_in_shares_amount = in_shares.as_ref().map_or(0, |w| w.shares);
    let withdrawal_in_shares_storage_fee_refund = in_shares.as_ref().map_or(0, |w| w.storage_fee_refund);
    let withdrawal_in_shares_domain_epoch = in_shares.as_ref().map(|w| w.domain_epoch);
    let withdrawal_in_shares_unlock_block = in_shares.as_ref()
        .map(|w| w.unlock_at_confirmed_domain_block_number);

    let id = ContentHash::new("withdrawal")
        .part(&group.address)
        .part(group.operator_id)
        .part(domain_id)
        .part(withdrawal_in_shares_amount)
        .part(withdrawal_in_shares_storage_fee_refund)
        .part(OptionalPart(withdrawal_in_shares_domain_epoch))
        .part(OptionalPart(withdrawal_in_shares_unlock_block))
        .part(total_withdrawal_amount)
        .part(total_storage_fee_withdrawal)
        .part(&withdrawals_json)
        .finish();

    Ok(NominatorWithdrawal {
        id,
        address: group.address.clone(),
        operator_id: group.operator_id,
        domain_id,
        withdrawal_in_shares_amount,
        withdrawal_in_shares_storage_fee_refund,
        withdrawal_in_shares_domain_epoch,
        withdrawal_in_shares_unlock_block,
        total_withdrawal_amount,
        total_storage_fee_withdrawal,
        withdrawals_json,
        total_pending_withdrawals,
        event_ids: group.event_ids.clone(),
        extrinsic_ids: group.extrinsic_ids.clone(),
        block_heights: group.block_heights.clone(),
        timestamp: ctx.timestamp,
        block_height: ctx.height,
        processed: false
    })
}


/// Digest of a record's canonical text, fields separated by `|`.
struct ContentHash {
    text: String
}


impl ContentHash {
    fn new(kind: &str) -> Self {
        Self {
            text: kind.to_string()
        }
    }

    fn part(mut self, value: impl std::fmt::Display) -> Self {
        // writing into a String never fails
        let _ = write!(self.text, "|{}", value);
        self
    }

    fn finish(self) -> String {
        format!("{:032x}", xxh3_128(self.text.as_bytes()))
    }
}


struct OptionalPart<T>(Option<T>);


impl<T: std::fmt::Display> std::fmt::Display for OptionalPart<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("-")
        }
    }
}
