use domstake_chain::{BlockSnapshot, ChainReader, JsonValue, RawOperator, SnapshotReader};
use domstake_mapping::share_price::SHARES_CALCULATION_MULTIPLIER;
use domstake_mapping::{
    BlockMapper, BundleSubmission, EntityCache, EntityKind, MappingConfig, MemoryStore,
    NominatorDeposit, NominatorWithdrawal, NominatorsUnlockedEvent, Operator,
    OperatorEpochSharePrice, UnlockedEvent
};
use domstake_primitives::{Block, DomainId, OperatorId, U256};
use futures::future::{ready, BoxFuture};
use futures::FutureExt;
use serde_json::json;
use std::collections::BTreeSet;


fn operator(domain_id: u32, tax: &str, stake: &str, shares: &str) -> JsonValue {
    json!({
        "signingKey": "0x9c1f",
        "currentDomainId": domain_id.to_string(),
        "minimumNominatorStake": "1,000",
        "nominationTax": tax,
        "currentTotalStake": stake,
        "currentTotalShares": shares,
        "status": "Registered"
    })
}


fn event(index: u32, name: &str, args: JsonValue) -> JsonValue {
    json!({
        "index": index,
        "name": name,
        "args": args,
        "phase": "ApplyExtrinsic",
        "extrinsicIndex": 1
    })
}


fn item_completed(index: u32) -> JsonValue {
    event(index, "Utility.ItemCompleted", json!({}))
}


fn snapshot(events: Vec<JsonValue>, current: JsonValue, parent: JsonValue) -> BlockSnapshot {
    serde_json::from_value(json!({
        "header": {
            "hash": "0x64",
            "parentHash": "0x63",
            "height": 100,
            "timestamp": 1_700_000_000_000i64
        },
        "extrinsics": [
            {"index": 1, "version": 4, "signature": {"address": {"__kind": "Id", "value": "st9signer"}}}
        ],
        "events": events,
        "state": {
            "current": current,
            "parent": parent
        }
    })).unwrap()
}


async fn map(mapper: &BlockMapper, snapshot: &BlockSnapshot) -> anyhow::Result<EntityCache> {
    mapper.process_block(
        &snapshot.block,
        &snapshot.current_reader(),
        &snapshot.parent_reader()
    ).await
}


#[tokio::test]
async fn share_price_at_epoch_end() -> anyhow::Result<()> {
    let snapshot = snapshot(
        vec![],
        json!({
            "stakingSummaries": {
                "0": {"currentEpochIndex": "6", "currentEpochRewards": {}}
            },
            "operators": {
                "1": {"owner": "st9owner", "record": operator(0, "10%", "50,000", "45,000")},
                "2": {"owner": "st9owner", "record": operator(0, "5%", "0", "0")}
            }
        }),
        json!({
            "stakingSummaries": {
                "0": {"currentEpochIndex": "5", "currentEpochRewards": {"1": "1,000", "2": "10"}}
            },
            "operators": {
                "1": {"owner": "st9owner", "record": operator(0, "10%", "50,000", "45,000")}
            }
        })
    );

    let cache = map(&BlockMapper::new(MappingConfig::default()), &snapshot).await?;

    let prices: Vec<_> = cache.records::<OperatorEpochSharePrice>().collect();
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].id, "1-0-5");
    assert_eq!(prices[0].operator_id, 1);
    assert_eq!(prices[0].epoch_index, 5);
    assert_eq!(prices[0].block_height, 100);
    assert_eq!(prices[0].timestamp, 1_700_000_000_000);
    assert_eq!(
        prices[0].share_price,
        U256::from(50_900u128 * SHARES_CALCULATION_MULTIPLIER / 45_000)
    );

    let operators: Vec<_> = cache.records::<Operator>().map(|op| op.operator_id).collect();
    assert_eq!(operators, vec![2]);
    assert_eq!(cache.skipped(), 0);
    Ok(())
}


#[tokio::test]
async fn fixed_point_nomination_tax() -> anyhow::Result<()> {
    let snapshot = snapshot(
        vec![],
        json!({
            "stakingSummaries": {
                "0": {"currentEpochIndex": "6", "currentEpochRewards": {}}
            },
            "operators": {
                "1": {"owner": "st9owner", "record": operator(0, "10.00%", "50,000", "45,000")}
            }
        }),
        json!({
            "stakingSummaries": {
                "0": {"currentEpochIndex": "5", "currentEpochRewards": {"1": "1,000"}}
            }
        })
    );

    let cache = map(&BlockMapper::new(MappingConfig::default()), &snapshot).await?;

    let prices: Vec<_> = cache.records::<OperatorEpochSharePrice>().collect();
    assert_eq!(prices.len(), 1);
    assert_eq!(
        prices[0].share_price,
        U256::from(50_900u128 * SHARES_CALCULATION_MULTIPLIER / 45_000)
    );
    let operators: Vec<_> = cache.records::<Operator>().map(|op| (op.operator_id, op.nomination_tax)).collect();
    assert_eq!(operators, vec![(1, 10)]);
    assert_eq!(cache.skipped(), 0);
    Ok(())
}


#[tokio::test]
async fn no_transition_without_epoch_change() -> anyhow::Result<()> {
    let state = json!({
        "stakingSummaries": {
            "0": {"currentEpochIndex": "5", "currentEpochRewards": {"1": "1,000"}}
        },
        "operators": {
            "1": {"owner": "st9owner", "record": operator(0, "10%", "50,000", "45,000")}
        }
    });

    let cache = map(
        &BlockMapper::new(MappingConfig::default()),
        &snapshot(vec![], state.clone(), state.clone())
    ).await?;
    assert!(cache.is_empty());

    let cache = map(
        &BlockMapper::new(MappingConfig::default()),
        &snapshot(vec![], state, JsonValue::Null)
    ).await?;
    assert_eq!(cache.entities(EntityKind::OperatorEpochSharePrice).len(), 0);
    assert_eq!(cache.entities(EntityKind::Operator).len(), 1);
    Ok(())
}


#[tokio::test]
async fn domain_allow_list_limits_share_prices() -> anyhow::Result<()> {
    let snapshot = snapshot(
        vec![],
        json!({
            "stakingSummaries": {
                "0": {"currentEpochIndex": 6},
                "1": {"currentEpochIndex": 3}
            },
            "operators": {
                "1": {"record": operator(0, "0", "100", "100")},
                "2": {"record": operator(1, "0", "100", "100")}
            }
        }),
        json!({
            "stakingSummaries": {
                "0": {"currentEpochIndex": 5},
                "1": {"currentEpochIndex": 2}
            }
        })
    );

    let mapper = BlockMapper::new(MappingConfig {
        domains: Some(BTreeSet::from([1])),
        track_operators: false,
        track_bundles: true
    });
    let cache = map(&mapper, &snapshot).await?;

    let prices: Vec<(OperatorId, DomainId)> = cache.records::<OperatorEpochSharePrice>()
        .map(|p| (p.operator_id, p.domain_id))
        .collect();
    assert_eq!(prices, vec![(2, 1)]);
    assert_eq!(cache.entities(EntityKind::Operator).len(), 0);
    Ok(())
}


fn nominator_state() -> JsonValue {
    json!({
        "operators": {
            "1": {"owner": "st9owner", "record": operator(0, "10%", "50,000", "45,000")}
        },
        "deposits": {
            "1": {
                "st9alice": {
                    "known": {"shares": "1,000", "storageFeeDeposit": "200"},
                    "pending": {
                        "effectiveDomainEpoch": ["0", "7"],
                        "amount": "5,000",
                        "storageFeeDeposit": "1,000"
                    }
                },
                "st9bob": {
                    "known": {"shares": "one thousand", "storageFeeDeposit": "0"}
                }
            }
        },
        "withdrawals": {
            "1": {
                "st9carol": {
                    "totalWithdrawalAmount": "300",
                    "totalStorageFeeWithdrawal": "3",
                    "withdrawals": [{
                        "domainId": 0,
                        "unlockAtConfirmedDomainBlockNumber": "2,000",
                        "amountToUnlock": "300",
                        "storageFeeRefund": "3"
                    }],
                    "withdrawalInShares": null
                }
            }
        }
    })
}


#[tokio::test]
async fn deposit_events_of_one_position_coalesce() -> anyhow::Result<()> {
    let snapshot = snapshot(
        vec![
            event(1, "Domains.OperatorNominated", json!({
                "operatorId": 1, "nominatorId": "st9alice", "amount": "2,500"
            })),
            item_completed(2),
            event(3, "domains.StorageFeeDeposited", json!([1, "st9alice", "500"])),
            item_completed(4),
            event(5, "Utility.BatchCompleted", json!({})),
        ],
        nominator_state(),
        JsonValue::Null
    );

    let cache = map(&BlockMapper::new(MappingConfig::default()), &snapshot).await?;

    let deposits: Vec<&NominatorDeposit> = cache.records().collect();
    assert_eq!(deposits.len(), 1);
    let deposit = deposits[0];
    assert_eq!(deposit.address, "st9alice");
    assert_eq!(deposit.operator_id, 1);
    assert_eq!(deposit.domain_id, 0);
    assert_eq!(deposit.event_ids, vec!["100-1", "100-3"]);
    assert_eq!(deposit.extrinsic_ids, vec!["100-1", "100-1"]);
    assert_eq!(deposit.block_heights, vec![100, 100]);
    assert_eq!(deposit.known_shares, 1000);
    assert_eq!(deposit.pending_amount, 5000);
    assert_eq!(deposit.pending_storage_fee_deposit, 1000);
    assert_eq!(deposit.pending_effective_domain_epoch, Some(7));
    assert!(!deposit.processed);
    Ok(())
}


#[tokio::test]
async fn events_after_last_batch_item_are_mapped() -> anyhow::Result<()> {
    let snapshot = snapshot(
        vec![
            event(1, "Domains.StorageFeeDeposited", json!([1, "st9alice", "500"])),
            item_completed(2),
            event(3, "Domains.OperatorNominated", json!([1, "st9alice", "2,500"])),
        ],
        nominator_state(),
        JsonValue::Null
    );

    let cache = map(&BlockMapper::new(MappingConfig::default()), &snapshot).await?;

    let deposits: Vec<&NominatorDeposit> = cache.records().collect();
    assert_eq!(deposits.len(), 1);
    assert_eq!(deposits[0].event_ids, vec!["100-1", "100-3"]);
    assert_eq!(cache.skipped(), 0);
    Ok(())
}


#[tokio::test]
async fn malformed_position_is_skipped() -> anyhow::Result<()> {
    let snapshot = snapshot(
        vec![
            event(1, "Domains.OperatorNominated", json!([1, "st9bob", "10"])),
            event(2, "Domains.OperatorNominated", json!([1, "st9alice", "10"])),
            event(3, "Domains.OperatorNominated", json!({"nominatorId": "st9alice"})),
        ],
        nominator_state(),
        JsonValue::Null
    );

    let cache = map(&BlockMapper::new(MappingConfig::default()), &snapshot).await?;

    let deposits: Vec<_> = cache.records::<NominatorDeposit>().map(|d| d.address.as_str()).collect();
    assert_eq!(deposits, vec!["st9alice"]);
    // bob's record and the event without an operator
    assert_eq!(cache.skipped(), 2);
    Ok(())
}


#[tokio::test]
async fn operator_registration_deposits_for_signer() -> anyhow::Result<()> {
    let snapshot = snapshot(
        vec![event(1, "Domains.OperatorRegistered", json!({"operatorId": "1", "domainId": "0"}))],
        nominator_state(),
        JsonValue::Null
    );

    let cache = map(&BlockMapper::new(MappingConfig::default()), &snapshot).await?;

    let deposit = cache.records::<NominatorDeposit>().next().expect("deposit is staged");
    assert_eq!(deposit.address, "st9signer");
    assert_eq!(deposit.known_shares, 0);
    assert_eq!(deposit.domain_id, 0);
    Ok(())
}


#[tokio::test]
async fn unlocks_and_withdrawals() -> anyhow::Result<()> {
    let snapshot = snapshot(
        vec![
            event(1, "Domains.WithdrewStake", json!({"operatorId": 1, "nominatorId": "st9carol"})),
            event(2, "Domains.NominatedStakedUnlocked", json!({
                "operatorId": 1, "nominatorId": "st9carol", "unlockedAmount": "5,000"
            })),
            event(3, "Domains.NominatorUnlocked", json!([1, "st9dave"])),
        ],
        nominator_state(),
        JsonValue::Null
    );

    let cache = map(&BlockMapper::new(MappingConfig::default()), &snapshot).await?;

    let withdrawals: Vec<&NominatorWithdrawal> = cache.records().collect();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].address, "st9carol");
    assert_eq!(withdrawals[0].event_ids, vec!["100-1", "100-2"]);
    assert_eq!(withdrawals[0].total_withdrawal_amount, 300);
    assert_eq!(withdrawals[0].total_pending_withdrawals, 1);
    assert_eq!(withdrawals[0].withdrawal_in_shares_domain_epoch, None);

    let unlocked: Vec<&UnlockedEvent> = cache.records().collect();
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].id, "100-2");
    assert_eq!(unlocked[0].amount, 5000);
    assert_eq!(unlocked[0].domain_id, 0);

    let nominators_unlocked: Vec<&NominatorsUnlockedEvent> = cache.records().collect();
    assert_eq!(nominators_unlocked.len(), 1);
    assert_eq!(nominators_unlocked[0].address, "st9dave");
    assert_eq!(nominators_unlocked[0].extrinsic_id, "100-1");
    Ok(())
}


fn bundle_snapshot() -> BlockSnapshot {
    serde_json::from_value(json!({
        "header": {"hash": "0x64", "parentHash": "0x63", "height": 100},
        "extrinsics": [{"index": 3, "version": 4}],
        "calls": [{
            "extrinsicIndex": 3,
            "address": [],
            "name": "Domains.submit_bundle",
            "args": {
                "opaque_bundle": {
                    "sealed_header": {
                        "header": {
                            "proof_of_election": {"domain_id": 0, "operator_id": 4},
                            "receipt": {
                                "domain_block_number": "1,024",
                                "consensus_block_number": 99
                            }
                        },
                        "signature": "0x00"
                    }
                }
            }
        }],
        "events": [{
            "index": 7,
            "name": "Domains.BundleStored",
            "args": {"domainId": 0, "bundleHash": "0xb0", "bundleAuthor": 4},
            "phase": "ApplyExtrinsic",
            "extrinsicIndex": 3
        }],
        "state": {"current": {}}
    })).unwrap()
}


#[tokio::test]
async fn bundle_submissions() -> anyhow::Result<()> {
    let snapshot = bundle_snapshot();

    let cache = map(&BlockMapper::new(MappingConfig::default()), &snapshot).await?;
    let bundles: Vec<&BundleSubmission> = cache.records().collect();
    assert_eq!(bundles, vec![&BundleSubmission {
        id: "0xb0".to_string(),
        domain_id: 0,
        operator_id: 4,
        domain_block_number: 1024,
        consensus_block_number: 99,
        bundle_hash: "0xb0".to_string(),
        bundle_author: Some("4".to_string()),
        extrinsic_id: "100-3".to_string(),
        event_id: "100-7".to_string(),
        timestamp: 0,
        block_height: 100
    }]);

    let mapper = BlockMapper::new(MappingConfig {
        track_bundles: false,
        ..MappingConfig::default()
    });
    assert!(map(&mapper, &snapshot).await?.is_empty());
    Ok(())
}


#[tokio::test]
async fn reprocessing_upserts() -> anyhow::Result<()> {
    let snapshot = snapshot(
        vec![event(1, "Domains.OperatorNominated", json!([1, "st9alice", "10"]))],
        nominator_state(),
        JsonValue::Null
    );
    let mapper = BlockMapper::new(MappingConfig::default());
    let mut store = MemoryStore::new();

    map(&mapper, &snapshot).await?.flush_into(&mut store, &snapshot.block.to_ref()).await?;
    let first = store.len();
    map(&mapper, &snapshot).await?.flush_into(&mut store, &snapshot.block.to_ref()).await?;

    assert_eq!(store.len(), first);
    assert_eq!(store.records::<NominatorDeposit>().count(), 1);
    assert_eq!(store.get::<Operator>("1").map(|op| op.nomination_tax), Some(10));
    assert_eq!(store.head().map(|head| head.number), Some(100));
    Ok(())
}


struct FailingDeposits<'s> {
    inner: SnapshotReader<'s>
}


impl<'s> ChainReader for FailingDeposits<'s> {
    fn domains(&self) -> BoxFuture<'_, anyhow::Result<Vec<DomainId>>> {
        self.inner.domains()
    }

    fn operators(&self) -> BoxFuture<'_, anyhow::Result<Vec<RawOperator>>> {
        self.inner.operators()
    }

    fn domain_staking_summary(&self, domain_id: DomainId) -> BoxFuture<'_, anyhow::Result<Option<JsonValue>>> {
        self.inner.domain_staking_summary(domain_id)
    }

    fn operator_deposit<'a>(
        &'a self,
        _operator_id: OperatorId,
        _address: &'a str
    ) -> BoxFuture<'a, anyhow::Result<Option<JsonValue>>>
    {
        ready(Err(anyhow::anyhow!("connection reset"))).boxed()
    }

    fn operator_withdrawal<'a>(
        &'a self,
        operator_id: OperatorId,
        address: &'a str
    ) -> BoxFuture<'a, anyhow::Result<Option<JsonValue>>>
    {
        self.inner.operator_withdrawal(operator_id, address)
    }
}


#[tokio::test]
async fn chain_read_failure_aborts_block() {
    let snapshot = snapshot(
        vec![event(1, "Domains.OperatorNominated", json!([1, "st9alice", "10"]))],
        nominator_state(),
        JsonValue::Null
    );
    let current = FailingDeposits {
        inner: snapshot.current_reader()
    };

    let err = BlockMapper::new(MappingConfig::default())
        .process_block(&snapshot.block, &current, &snapshot.parent_reader())
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("connection reset"));
}
