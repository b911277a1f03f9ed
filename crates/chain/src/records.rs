//! Typed views of raw storage reads.
//!
//! Every raw record type has exactly one parse function here, and nothing
//! past this module touches the untyped payloads.

use crate::number::{parse_number, parse_percent};
use crate::shape::{field, unwrap_versioned};
use crate::{JsonValue, ParseError};
use domstake_primitives::{decimal, Balance, BlockNumber, DomainId, EpochIndex, OperatorId};
use serde::Serialize;
use std::collections::BTreeMap;


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorRecord {
    pub operator_id: OperatorId,
    pub owner: Option<String>,
    pub signing_key: String,
    pub current_domain_id: DomainId,
    pub minimum_nominator_stake: Balance,
    /// Percent in 0..=100
    pub nomination_tax: u8,
    pub current_total_stake: Balance,
    pub current_total_shares: Balance,
    pub status: Option<String>,
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainStakingSummary {
    pub current_epoch_index: EpochIndex,
    pub current_epoch_rewards: BTreeMap<OperatorId, Balance>,
}


impl DomainStakingSummary {
    /// Reward of the operator in the current epoch, zero when it earned none.
    pub fn reward_of(&self, operator_id: OperatorId) -> Balance {
        self.current_epoch_rewards.get(&operator_id).copied().unwrap_or(0)
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DepositRecord {
    pub known_shares: Balance,
    pub known_storage_fee_deposit: Balance,
    pub pending: Option<PendingDeposit>,
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeposit {
    pub domain_id: DomainId,
    pub effective_epoch: EpochIndex,
    pub amount: Balance,
    pub storage_fee_deposit: Balance,
}


#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WithdrawalRecord {
    pub total_withdrawal_amount: Balance,
    pub total_storage_fee_withdrawal: Balance,
    pub withdrawals: Vec<WithdrawalDetail>,
    pub in_shares: Option<WithdrawalInShares>,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalDetail {
    pub domain_id: DomainId,
    pub unlock_at_confirmed_domain_block_number: BlockNumber,
    #[serde(with = "decimal")]
    pub amount_to_unlock: Balance,
    #[serde(with = "decimal")]
    pub storage_fee_refund: Balance,
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalInShares {
    pub domain_id: DomainId,
    pub domain_epoch: EpochIndex,
    pub unlock_at_confirmed_domain_block_number: BlockNumber,
    pub shares: Balance,
    pub storage_fee_refund: Balance,
}


fn required<'a>(
    record: &'static str,
    value: &'a JsonValue,
    name: &'static str,
    aliases: &[&str]
) -> Result<&'a JsonValue, ParseError>
{
    let mut names = Vec::with_capacity(aliases.len() + 1);
    names.push(name);
    names.extend_from_slice(aliases);
    field(value, &names).ok_or(ParseError::missing(record, name))
}


fn required_number<T: std::str::FromStr>(
    record: &'static str,
    value: &JsonValue,
    name: &'static str,
    aliases: &[&str]
) -> Result<T, ParseError>
{
    parse_number(name, required(record, value, name, aliases)?)
}


fn ensure_object(record: &'static str, value: &JsonValue) -> Result<(), ParseError> {
    if unwrap_versioned(value).is_object() {
        Ok(())
    } else {
        Err(ParseError::shape(record, format!("expected an object, got {}", value)))
    }
}


/// `(domainId, epochIndex)` as either a two element list or an object.
fn parse_domain_epoch(
    record: &'static str,
    value: &JsonValue
) -> Result<(DomainId, EpochIndex), ParseError>
{
    match unwrap_versioned(value) {
        JsonValue::Array(pair) if pair.len() == 2 => {
            Ok((
                parse_number("domainId", &pair[0])?,
                parse_number("epochIndex", &pair[1])?
            ))
        },
        obj @ JsonValue::Object(_) => {
            Ok((
                required_number(record, obj, "domainId", &["domain_id"])?,
                required_number(record, obj, "epochIndex", &["epoch_index", "epoch"])?
            ))
        },
        other => Err(ParseError::shape(record, format!("invalid domain epoch {}", other)))
    }
}


fn optional_sub_record<'a>(value: &'a JsonValue, names: &[&str]) -> Option<&'a JsonValue> {
    field(value, names).map(unwrap_versioned)
}


/// Operator status is either a bare variant name or a single-key object carrying variant data.
fn status_name(value: &JsonValue) -> Option<String> {
    match unwrap_versioned(value) {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(obj) => obj.keys().next().cloned(),
        _ => None
    }
}


pub fn parse_operator(
    operator_id: OperatorId,
    owner: Option<&str>,
    raw: &JsonValue
) -> Result<OperatorRecord, ParseError>
{
    const RECORD: &str = "operator";
    ensure_object(RECORD, raw)?;

    let signing_key = required(RECORD, raw, "signingKey", &["signing_key"])?;
    let signing_key = signing_key.as_str()
        .ok_or_else(|| ParseError::shape(RECORD, "signing key is not a string"))?
        .to_string();

    Ok(OperatorRecord {
        operator_id,
        owner: owner.map(str::to_string),
        signing_key,
        current_domain_id: required_number(RECORD, raw, "currentDomainId", &["current_domain_id"])?,
        minimum_nominator_stake: required_number(
            RECORD, raw, "minimumNominatorStake", &["minimum_nominator_stake"]
        )?,
        nomination_tax: parse_percent(
            "nominationTax",
            required(RECORD, raw, "nominationTax", &["nomination_tax"])?
        )?,
        current_total_stake: required_number(RECORD, raw, "currentTotalStake", &["current_total_stake"])?,
        current_total_shares: required_number(RECORD, raw, "currentTotalShares", &["current_total_shares"])?,
        status: field(raw, &["status", "partialStatus", "partial_status"]).and_then(status_name),
    })
}


pub fn parse_staking_summary(raw: &JsonValue) -> Result<DomainStakingSummary, ParseError> {
    const RECORD: &str = "domain staking summary";
    ensure_object(RECORD, raw)?;

    let current_epoch_index = required_number(
        RECORD, raw, "currentEpochIndex", &["current_epoch_index"]
    )?;

    let mut current_epoch_rewards = BTreeMap::new();
    match field(raw, &["currentEpochRewards", "current_epoch_rewards"]).map(unwrap_versioned) {
        None => {},
        Some(JsonValue::Object(rewards)) => {
            for (operator_id, reward) in rewards {
                current_epoch_rewards.insert(
                    parse_number("operatorId", &JsonValue::from(operator_id.as_str()))?,
                    parse_number("reward", reward)?
                );
            }
        },
        Some(JsonValue::Array(pairs)) => {
            for pair in pairs {
                match pair.as_array().map(Vec::as_slice) {
                    Some([operator_id, reward]) => {
                        current_epoch_rewards.insert(
                            parse_number("operatorId", operator_id)?,
                            parse_number("reward", reward)?
                        );
                    },
                    _ => return Err(ParseError::shape(RECORD, format!("invalid reward entry {}", pair)))
                }
            }
        },
        Some(other) => {
            return Err(ParseError::shape(RECORD, format!("invalid epoch rewards {}", other)))
        }
    }

    Ok(DomainStakingSummary {
        current_epoch_index,
        current_epoch_rewards
    })
}


pub fn parse_deposit(raw: &JsonValue) -> Result<DepositRecord, ParseError> {
    const RECORD: &str = "deposit";
    ensure_object(RECORD, raw)?;

    let known = optional_sub_record(raw, &["known"])
        .ok_or(ParseError::missing(RECORD, "known"))?;

    let pending = match optional_sub_record(raw, &["pending"]) {
        None => None,
        Some(pending) => {
            let (domain_id, effective_epoch) = parse_domain_epoch(
                RECORD,
                required(RECORD, pending, "effectiveDomainEpoch", &["effective_domain_epoch"])?
            )?;
            Some(PendingDeposit {
                domain_id,
                effective_epoch,
                amount: required_number(RECORD, pending, "amount", &[])?,
                storage_fee_deposit: required_number(
                    RECORD, pending, "storageFeeDeposit", &["storage_fee_deposit"]
                )?
            })
        }
    };

    Ok(DepositRecord {
        known_shares: required_number(RECORD, known, "shares", &[])?,
        known_storage_fee_deposit: required_number(
            RECORD, known, "storageFeeDeposit", &["storage_fee_deposit"]
        )?,
        pending
    })
}


pub fn parse_withdrawal(raw: &JsonValue) -> Result<WithdrawalRecord, ParseError> {
    const RECORD: &str = "withdrawal";
    ensure_object(RECORD, raw)?;

    let withdrawals = match optional_sub_record(raw, &["withdrawals"]) {
        None => Vec::new(),
        Some(JsonValue::Array(list)) => list.iter().map(|item| {
            Ok(WithdrawalDetail {
                domain_id: required_number(RECORD, item, "domainId", &["domain_id"])?,
                unlock_at_confirmed_domain_block_number: required_number(
                    RECORD,
                    item,
                    "unlockAtConfirmedDomainBlockNumber",
                    &["unlock_at_confirmed_domain_block_number"]
                )?,
                amount_to_unlock: required_number(RECORD, item, "amountToUnlock", &["amount_to_unlock"])?,
                storage_fee_refund: required_number(RECORD, item, "storageFeeRefund", &["storage_fee_refund"])?
            })
        }).collect::<Result<Vec<_>, ParseError>>()?,
        Some(other) => {
            return Err(ParseError::shape(RECORD, format!("withdrawals is not a list: {}", other)))
        }
    };

    let in_shares = match optional_sub_record(raw, &["withdrawalInShares", "withdrawal_in_shares"]) {
        None => None,
        Some(in_shares) => {
            let (domain_id, domain_epoch) = parse_domain_epoch(
                RECORD,
                required(RECORD, in_shares, "domainEpoch", &["domain_epoch"])?
            )?;
            Some(WithdrawalInShares {
                domain_id,
                domain_epoch,
                unlock_at_confirmed_domain_block_number: required_number(
                    RECORD,
                    in_shares,
                    "unlockAtConfirmedDomainBlockNumber",
                    &["unlock_at_confirmed_domain_block_number"]
                )?,
                shares: required_number(RECORD, in_shares, "shares", &[])?,
                storage_fee_refund: required_number(
                    RECORD, in_shares, "storageFeeRefund", &["storage_fee_refund"]
                )?
            })
        }
    };

    Ok(WithdrawalRecord {
        total_withdrawal_amount: required_number(
            RECORD, raw, "totalWithdrawalAmount", &["total_withdrawal_amount"]
        )?,
        total_storage_fee_withdrawal: required_number(
            RECORD, raw, "totalStorageFeeWithdrawal", &["total_storage_fee_withdrawal"]
        )?,
        withdrawals,
        in_shares
    })
}
