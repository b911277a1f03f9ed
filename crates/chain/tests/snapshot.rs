use domstake_chain::{parse_staking_summary, BlockSnapshot, ChainReader};
use serde_json::json;


fn snapshot() -> BlockSnapshot {
    serde_json::from_value(json!({
        "header": {
            "hash": "0xbb",
            "parentHash": "0xaa",
            "height": 100,
            "timestamp": 1_700_000_000_000i64
        },
        "events": [
            {"index": 0, "name": "Timestamp.Set", "phase": "ApplyExtrinsic", "extrinsicIndex": 0}
        ],
        "state": {
            "current": {
                "stakingSummaries": {
                    "0": {"currentEpochIndex": "6", "currentEpochRewards": {}}
                },
                "operators": {
                    "1": {"owner": "st9owner", "record": {"signingKey": "0x01"}}
                },
                "deposits": {
                    "1": {"st9nominator": {"known": {"shares": "10", "storageFeeDeposit": "1"}}}
                }
            }
        }
    })).unwrap()
}


#[tokio::test]
async fn current_state_reads() -> anyhow::Result<()> {
    let snapshot = snapshot();
    assert_eq!(snapshot.block.header.height, 100);
    assert_eq!(snapshot.block.events.len(), 1);

    let reader = snapshot.current_reader();
    assert_eq!(reader.domains().await?, vec![0]);

    let summary = reader.domain_staking_summary(0).await?.expect("summary is present");
    assert_eq!(parse_staking_summary(&summary)?.current_epoch_index, 6);
    assert_eq!(reader.domain_staking_summary(1).await?, None);

    let operators = reader.operators().await?;
    assert_eq!(operators.len(), 1);
    assert_eq!(operators[0].operator_id, 1);
    assert_eq!(operators[0].owner.as_deref(), Some("st9owner"));

    assert!(reader.operator_deposit(1, "st9nominator").await?.is_some());
    assert!(reader.operator_deposit(1, "st9other").await?.is_none());
    assert!(reader.operator_withdrawal(1, "st9nominator").await?.is_none());
    Ok(())
}


#[tokio::test]
async fn missing_parent_is_genesis() -> anyhow::Result<()> {
    let snapshot = snapshot();
    let parent = snapshot.parent_reader();
    assert!(parent.domains().await?.is_empty());
    assert!(parent.operators().await?.is_empty());
    assert_eq!(parent.domain_staking_summary(0).await?, None);
    Ok(())
}
