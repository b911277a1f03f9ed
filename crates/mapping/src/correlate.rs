//! Recovering per-call structure from a block's flat event log and call arguments.

use domstake_chain::shape::{coalesce, deep_find_by_key, field, get_path, unwrap_versioned};
use domstake_chain::{id_string, parse_number, Event, JsonValue, ParseError};
use domstake_primitives::BlockNumber;


/// Splits block events into per-call groups of a `utility.batchAll` extrinsic.
///
/// A group ends at each `Utility.ItemCompleted` event, which itself belongs to no group.
/// An item that emitted nothing yields an empty group, so group `i` lines up with call `i`.
/// A trailing group is emitted only when it is not empty.
pub fn group_events_from_batch_all(events: &[Event]) -> Vec<&[Event]> {
    let mut groups = Vec::new();
    let mut start = 0;

    for (i, event) in events.iter().enumerate() {
        if event.is("Utility", "ItemCompleted") {
            groups.push(&events[start..i]);
            start = i + 1;
        }
    }

    if start < events.len() {
        groups.push(&events[start..]);
    }

    groups
}


const SEALED_HEADER_PATHS: &[&[&str]] = &[
    &["opaque_bundle", "sealed_header"],
    &["opaqueBundle", "sealedHeader"],
    &["bundle", "sealed_header"],
    &["bundle", "sealedHeader"],
    &["sealed_header"],
    &["sealedHeader"],
];


/// Locates the bundle header in `submit_bundle` call arguments.
///
/// Returns the inner `header` of the sealed header when there is one,
/// otherwise the sealed header itself.
pub fn extract_sealed_header_from_args(args: &JsonValue) -> Option<&JsonValue> {
    let sealed = coalesce(SEALED_HEADER_PATHS.iter().map(|path| get_path(args, path)))
        .or_else(|| deep_find_by_key(args, &["sealed_header", "sealedHeader"]))?;

    let sealed = unwrap_versioned(sealed);
    match sealed.get("header") {
        Some(header) if !header.is_null() => Some(unwrap_versioned(header)),
        _ => Some(sealed)
    }
}


/// Execution receipt carried by a bundle header.
pub fn extract_receipt(header: &JsonValue) -> Option<&JsonValue> {
    field(header, &["receipt"])
        .or_else(|| deep_find_by_key(header, &["receipt"]))
        .map(unwrap_versioned)
}


#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiptNumbers {
    pub domain_block_number: Option<BlockNumber>,
    pub consensus_block_number: Option<BlockNumber>,
}


/// Reads the domain and consensus block numbers of a receipt.
///
/// Absent numbers are `None`; present but malformed numbers are an error.
pub fn extract_receipt_numbers(receipt: &JsonValue) -> Result<ReceiptNumbers, ParseError> {
    let number = |field_name: &'static str, names: &[&str]| {
        coalesce([field(receipt, names), deep_find_by_key(receipt, names)])
            .map(|value| parse_number::<BlockNumber>(field_name, value))
            .transpose()
    };

    Ok(ReceiptNumbers {
        domain_block_number: number(
            "domainBlockNumber",
            &["domain_block_number", "domainBlockNumber"]
        )?,
        consensus_block_number: number(
            "consensusBlockNumber",
            &["consensus_block_number", "consensusBlockNumber"]
        )?,
    })
}


#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProofOfElection {
    pub domain_id: Option<String>,
    pub operator_id: Option<String>,
}


/// Reads the electing domain and operator of a bundle header as plain id strings.
pub fn extract_proof_of_election(header: &JsonValue) -> ProofOfElection {
    let proof = field(header, &["proof_of_election", "proofOfElection"])
        .or_else(|| deep_find_by_key(header, &["proof_of_election", "proofOfElection"]))
        .map(unwrap_versioned);

    let Some(proof) = proof else {
        return ProofOfElection::default()
    };

    ProofOfElection {
        domain_id: field(proof, &["domain_id", "domainId"]).and_then(id_string),
        operator_id: field(proof, &["operator_id", "operatorId"]).and_then(id_string),
    }
}
