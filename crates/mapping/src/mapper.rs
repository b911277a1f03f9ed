use crate::cache::EntityCache;
use crate::config::MappingConfig;
use crate::correlate::{extract_proof_of_election, extract_receipt, extract_receipt_numbers, extract_sealed_header_from_args};
use crate::entity::{BundleSubmission, NominatorsUnlockedEvent, Operator, UnlockedEvent};
use crate::epoch::{detect_epoch_transitions, read_staking_summaries};
use crate::nominator::{build_deposit, build_withdrawal, group_nominator_events, read_deposits, read_withdrawals, NominatorEvent};
use crate::share_price::derive_share_prices;
use anyhow::Context;
use domstake_chain::shape::field;
use domstake_chain::{id_string, parse_number, parse_operator, Block, ChainReader, Event, JsonValue, OperatorRecord, ParseError, RawOperator};
use domstake_primitives::{event_id, extrinsic_id, Balance, BlockNumber, DomainId, OperatorId};
use std::collections::BTreeMap;
use tracing::{debug, warn};


/// Block attributes stamped on every derived entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    pub height: BlockNumber,
    pub hash: String,
    /// Milliseconds, zero when the block has no timestamp
    pub timestamp: i64,
}


impl BlockContext {
    pub fn new(block: &Block) -> Self {
        Self {
            height: block.header.height,
            hash: block.header.hash.clone(),
            timestamp: block.header.timestamp.unwrap_or(0)
        }
    }

    pub fn event_id(&self, event: &Event) -> String {
        event_id(self.height, event.index)
    }

    pub fn extrinsic_id(&self, event: &Event) -> Result<String, ParseError> {
        event.extrinsic_index
            .map(|index| extrinsic_id(self.height, index))
            .ok_or(ParseError::missing("event", "extrinsicIndex"))
    }
}


enum MappedEvent {
    Deposit(NominatorEvent),
    Withdrawal(NominatorEvent),
    Unlocked(NominatorEvent, UnlockedEvent),
    NominatorsUnlocked(NominatorsUnlockedEvent),
    Bundle(BundleSubmission),
}


type Operators<'a> = BTreeMap<OperatorId, &'a OperatorRecord>;


/// Derives the staking entities of a single block.
///
/// Blocks must be fed strictly in order, each one only after the entities
/// of its predecessor were flushed.
pub struct BlockMapper {
    config: MappingConfig
}


impl BlockMapper {
    pub fn new(config: MappingConfig) -> Self {
        Self {
            config
        }
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Maps a block given readers of its own state and of its parent's state.
    ///
    /// Records that fail to parse are skipped and counted on the returned cache.
    /// Chain read failures abort the whole block.
    pub async fn process_block<C, P>(
        &self,
        block: &Block,
        current: &C,
        parent: &P
    ) -> anyhow::Result<EntityCache>
    where
        C: ChainReader + ?Sized,
        P: ChainReader + ?Sized
    {
        let ctx = BlockContext::new(block);
        let mut cache = EntityCache::new();

        let (domains, raw_operators, raw_parent_operators) = futures::try_join!(
            async { current.domains().await.context("failed to read domain list") },
            async { current.operators().await.context("failed to read operators") },
            async { parent.operators().await.context("failed to read parent block operators") }
        )?;

        let operators = parse_operators(&raw_operators, &ctx, &mut cache);
        let operator_index: Operators<'_> = operators.iter()
            .map(|op| (op.operator_id, op))
            .collect();

        if self.config.track_operators {
            let previous: BTreeMap<OperatorId, OperatorRecord> = raw_parent_operators.iter()
                .filter_map(|raw| parse_operator(raw.operator_id, raw.owner.as_deref(), &raw.record).ok())
                .map(|op| (op.operator_id, op))
                .collect();

            for op in operators.iter().filter(|op| previous.get(&op.operator_id) != Some(*op)) {
                cache.stage(operator_entity(op, &ctx));
            }
        }

        let domains: Vec<DomainId> = domains.into_iter()
            .filter(|domain_id| self.config.tracks_domain(*domain_id))
            .collect();

        let (current_summaries, parent_summaries) = futures::try_join!(
            read_staking_summaries(current, &domains),
            async {
                read_staking_summaries(parent, &domains).await.context("parent block")
            }
        )?;

        for (domain_id, err) in current_summaries.invalid.iter().chain(&parent_summaries.invalid) {
            warn!(
                block = ctx.height,
                domain_id,
                err = %err,
                "skipping invalid domain staking summary"
            );
            cache.skip();
        }

        let epochs = detect_epoch_transitions(
            &current_summaries.summaries,
            &parent_summaries.into_map()
        );

        for price in derive_share_prices(&epochs.transitions, &operators, &ctx) {
            cache.stage(price);
        }

        let mut deposit_events = Vec::new();
        let mut withdrawal_events = Vec::new();

        for event in &block.events {
            if event.is("Utility", "ItemCompleted") {
                continue
            }
            match self.map_event(block, event, &ctx, &operator_index) {
                Ok(None) => {},
                Ok(Some(MappedEvent::Deposit(e))) => deposit_events.push(e),
                Ok(Some(MappedEvent::Withdrawal(e))) => withdrawal_events.push(e),
                Ok(Some(MappedEvent::Unlocked(e, unlocked))) => {
                    withdrawal_events.push(e);
                    cache.stage(unlocked);
                },
                Ok(Some(MappedEvent::NominatorsUnlocked(unlocked))) => cache.stage(unlocked),
                Ok(Some(MappedEvent::Bundle(bundle))) => cache.stage(bundle),
                Err(err) => {
                    warn!(
                        event_id = %ctx.event_id(event),
                        event = %event.name,
                        err = %err,
                        "skipping event"
                    );
                    cache.skip();
                }
            }
        }

        let deposit_groups = group_nominator_events(&deposit_events);
        let withdrawal_groups = group_nominator_events(&withdrawal_events);

        let (deposits, withdrawals) = futures::try_join!(
            read_deposits(current, &deposit_groups),
            read_withdrawals(current, &withdrawal_groups)
        )?;

        for (group, raw) in deposit_groups.iter().zip(&deposits) {
            let domain = operator_index.get(&group.operator_id).map(|op| op.current_domain_id);
            match build_deposit(group, raw.as_ref(), domain, &ctx) {
                Ok(deposit) => cache.stage(deposit),
                Err(err) => {
                    warn!(
                        block = ctx.height,
                        operator_id = group.operator_id,
                        address = %group.address,
                        err = %err,
                        "skipping nominator deposit"
                    );
                    cache.skip();
                }
            }
        }

        for (group, raw) in withdrawal_groups.iter().zip(&withdrawals) {
            let domain = operator_index.get(&group.operator_id).map(|op| op.current_domain_id);
            match build_withdrawal(group, raw.as_ref(), domain, &ctx) {
                Ok(withdrawal) => cache.stage(withdrawal),
                Err(err) => {
                    warn!(
                        block = ctx.height,
                        operator_id = group.operator_id,
                        address = %group.address,
                        err = %err,
                        "skipping nominator withdrawal"
                    );
                    cache.skip();
                }
            }
        }

        debug!(
            block = ctx.height,
            domains = domains.len(),
            transitions = epochs.transitions.len(),
            epochs = ?epochs.current_epochs,
            deposits = deposit_groups.len(),
            withdrawals = withdrawal_groups.len(),
            entities = cache.len(),
            skipped = cache.skipped(),
            "mapped block"
        );

        Ok(cache)
    }

    fn map_event(
        &self,
        block: &Block,
        event: &Event,
        ctx: &BlockContext,
        operators: &Operators<'_>
    ) -> Result<Option<MappedEvent>, ParseError>
    {
        if event.is("Domains", "OperatorRegistered") {
            let operator_id = operator_arg(event)?;
            let address = event.extrinsic_index
                .and_then(|index| block.extrinsic(index))
                .and_then(|extrinsic| extrinsic.signer())
                .map(str::to_string)
                .or_else(|| operators.get(&operator_id).and_then(|op| op.owner.clone()))
                .ok_or(ParseError::missing("OperatorRegistered", "signer"))?;
            let e = nominator_event(event, ctx, operator_id, address)?;
            return Ok(Some(MappedEvent::Deposit(e)))
        }

        if event.is("Domains", "OperatorNominated") || event.is("Domains", "StorageFeeDeposited") {
            let e = nominator_event(event, ctx, operator_arg(event)?, address_arg(event)?)?;
            return Ok(Some(MappedEvent::Deposit(e)))
        }

        if event.is("Domains", "WithdrewStake") {
            let e = nominator_event(event, ctx, operator_arg(event)?, address_arg(event)?)?;
            return Ok(Some(MappedEvent::Withdrawal(e)))
        }

        if event.is("Domains", "NominatedStakedUnlocked") {
            let e = nominator_event(event, ctx, operator_arg(event)?, address_arg(event)?)?;
            let amount: Balance = parse_number(
                "unlockedAmount",
                event.arg(&["unlockedAmount", "unlocked_amount", "amount"], 2)
                    .ok_or(ParseError::missing("NominatedStakedUnlocked", "unlockedAmount"))?
            )?;
            let unlocked = UnlockedEvent {
                id: e.event_id.clone(),
                domain_id: operator_domain(operators, e.operator_id)?,
                operator_id: e.operator_id,
                address: e.address.clone(),
                amount,
                extrinsic_id: e.extrinsic_id.clone(),
                event_id: e.event_id.clone(),
                timestamp: ctx.timestamp,
                block_height: ctx.height
            };
            return Ok(Some(MappedEvent::Unlocked(e, unlocked)))
        }

        if event.is("Domains", "NominatorUnlocked") {
            let operator_id = operator_arg(event)?;
            let event_id = ctx.event_id(event);
            return Ok(Some(MappedEvent::NominatorsUnlocked(NominatorsUnlockedEvent {
                id: event_id.clone(),
                domain_id: operator_domain(operators, operator_id)?,
                operator_id,
                address: address_arg(event)?,
                extrinsic_id: ctx.extrinsic_id(event)?,
                event_id,
                timestamp: ctx.timestamp,
                block_height: ctx.height
            })))
        }

        if self.config.track_bundles && event.is("Domains", "BundleStored") {
            return bundle_submission(block, event, ctx).map(|b| Some(MappedEvent::Bundle(b)))
        }

        Ok(None)
    }
}


fn parse_operators(
    raw_operators: &[RawOperator],
    ctx: &BlockContext,
    cache: &mut EntityCache
) -> Vec<OperatorRecord>
{
    let mut operators = Vec::with_capacity(raw_operators.len());
    for raw in raw_operators {
        match parse_operator(raw.operator_id, raw.owner.as_deref(), &raw.record) {
            Ok(op) => operators.push(op),
            Err(err) => {
                warn!(
                    block = ctx.height,
                    operator_id = raw.operator_id,
                    err = %err,
                    "skipping invalid operator record"
                );
                cache.skip();
            }
        }
    }
    operators
}


fn operator_entity(op: &OperatorRecord, ctx: &BlockContext) -> Operator {
    Operator {
        id: op.operator_id.to_string(),
        operator_id: op.operator_id,
        domain_id: op.current_domain_id,
        owner: op.owner.clone(),
        signing_key: op.signing_key.clone(),
        nomination_tax: op.nomination_tax,
        minimum_nominator_stake: op.minimum_nominator_stake,
        current_total_stake: op.current_total_stake,
        current_total_shares: op.current_total_shares,
        status: op.status.clone(),
        timestamp: ctx.timestamp,
        block_height: ctx.height
    }
}


fn operator_domain(operators: &Operators<'_>, operator_id: OperatorId) -> Result<DomainId, ParseError> {
    operators.get(&operator_id)
        .map(|op| op.current_domain_id)
        .ok_or(ParseError::missing("operator", "currentDomainId"))
}


fn nominator_event(
    event: &Event,
    ctx: &BlockContext,
    operator_id: OperatorId,
    address: String
) -> Result<NominatorEvent, ParseError>
{
    Ok(NominatorEvent {
        operator_id,
        address,
        event_id: ctx.event_id(event),
        extrinsic_id: ctx.extrinsic_id(event)?,
        block_height: ctx.height
    })
}


fn operator_arg(event: &Event) -> Result<OperatorId, ParseError> {
    let value = event.arg(&["operatorId", "operator_id"], 0)
        .ok_or(ParseError::missing("event", "operatorId"))?;
    parse_number("operatorId", value)
}


fn address_arg(event: &Event) -> Result<String, ParseError> {
    let value = event.arg(&["nominatorId", "nominator_id", "nominator"], 1)
        .ok_or(ParseError::missing("event", "nominatorId"))?;
    address_string(value)
        .ok_or_else(|| ParseError::shape("event", format!("invalid nominator address {}", value)))
}


/// Accepts plain addresses and `{__kind: "Id", value}` multi-addresses.
fn address_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Object(_) => field(value, &["value", "Id", "id"])
            .and_then(JsonValue::as_str)
            .map(str::to_string),
        _ => None
    }
}


fn parse_id<T: std::str::FromStr>(field: &'static str, id: &str) -> Result<T, ParseError> {
    parse_number(field, &JsonValue::from(id))
}


fn bundle_submission(
    block: &Block,
    event: &Event,
    ctx: &BlockContext
) -> Result<BundleSubmission, ParseError>
{
    const RECORD: &str = "bundle";

    let bundle_hash = event.arg(&["bundleHash", "bundle_hash"], 1)
        .and_then(JsonValue::as_str)
        .ok_or(ParseError::missing(RECORD, "bundleHash"))?
        .to_string();

    let bundle_author = event.arg(&["bundleAuthor", "bundle_author"], 2).and_then(id_string);

    let call = block.call_of(event, "Domains", "submit_bundle")
        .ok_or(ParseError::missing(RECORD, "submit_bundle call"))?;

    let header = extract_sealed_header_from_args(&call.args)
        .ok_or(ParseError::missing(RECORD, "sealedHeader"))?;

    let receipt = extract_receipt(header).ok_or(ParseError::missing(RECORD, "receipt"))?;
    let numbers = extract_receipt_numbers(receipt)?;
    let proof = extract_proof_of_election(header);

    let domain_id = match event.arg(&["domainId", "domain_id"], 0) {
        Some(value) => parse_number("domainId", value)?,
        None => parse_id(
            "domainId",
            proof.domain_id.as_deref().ok_or(ParseError::missing(RECORD, "domainId"))?
        )?
    };

    let operator_id = parse_id(
        "operatorId",
        proof.operator_id.as_deref()
            .or(bundle_author.as_deref())
            .ok_or(ParseError::missing(RECORD, "operatorId"))?
    )?;

    Ok(BundleSubmission {
        id: bundle_hash.clone(),
        domain_id,
        operator_id,
        domain_block_number: numbers.domain_block_number
            .ok_or(ParseError::missing(RECORD, "domainBlockNumber"))?,
        consensus_block_number: numbers.consensus_block_number
            .ok_or(ParseError::missing(RECORD, "consensusBlockNumber"))?,
        bundle_hash,
        bundle_author,
        extrinsic_id: ctx.extrinsic_id(event)?,
        event_id: ctx.event_id(event),
        timestamp: ctx.timestamp,
        block_height: ctx.height
    })
}
