use anyhow::Context;
use domstake_chain::{parse_staking_summary, ChainReader, DomainStakingSummary, ParseError};
use domstake_primitives::{DomainId, EpochIndex};
use futures::future::try_join_all;
use std::collections::BTreeMap;


/// A domain whose epoch advanced between the parent block and the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochTransition {
    pub domain_id: DomainId,
    /// Epoch that ended
    pub parent_epoch: EpochIndex,
    pub current_epoch: EpochIndex,
    /// Summary as of the parent block, it holds the rewards of the ended epoch
    pub parent_summary: DomainStakingSummary,
}


#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpochTransitions {
    /// In the order of the current block's domain list
    pub transitions: Vec<EpochTransition>,
    pub current_epochs: BTreeMap<DomainId, EpochIndex>,
}


/// Compares current and parent epoch indexes of every domain.
///
/// A transition is reported only when the parent summary exists and its epoch
/// is strictly lower than the current one.
pub fn detect_epoch_transitions(
    current: &[(DomainId, DomainStakingSummary)],
    parent: &BTreeMap<DomainId, DomainStakingSummary>
) -> EpochTransitions
{
    let mut result = EpochTransitions::default();

    for (domain_id, summary) in current {
        result.current_epochs.insert(*domain_id, summary.current_epoch_index);

        let Some(parent_summary) = parent.get(domain_id) else {
            continue
        };

        if parent_summary.current_epoch_index < summary.current_epoch_index {
            result.transitions.push(EpochTransition {
                domain_id: *domain_id,
                parent_epoch: parent_summary.current_epoch_index,
                current_epoch: summary.current_epoch_index,
                parent_summary: parent_summary.clone()
            })
        }
    }

    result
}


#[derive(Debug, Default)]
pub struct StakingSummaries {
    /// Parsed summaries in the order domains were requested
    pub summaries: Vec<(DomainId, DomainStakingSummary)>,
    pub invalid: Vec<(DomainId, ParseError)>,
}


impl StakingSummaries {
    pub fn into_map(self) -> BTreeMap<DomainId, DomainStakingSummary> {
        self.summaries.into_iter().collect()
    }
}


/// Reads staking summaries of the given domains concurrently.
///
/// Domains without a summary are left out.
pub async fn read_staking_summaries<R: ChainReader + ?Sized>(
    reader: &R,
    domains: &[DomainId]
) -> anyhow::Result<StakingSummaries>
{
    let raw = try_join_all(domains.iter().map(|domain_id| async move {
        reader.domain_staking_summary(*domain_id)
            .await
            .with_context(|| format!("failed to read staking summary of domain {}", domain_id))
            .map(|summary| (*domain_id, summary))
    })).await?;

    let mut result = StakingSummaries::default();
    for (domain_id, summary) in raw {
        let Some(summary) = summary else {
            continue
        };
        match parse_staking_summary(&summary) {
            Ok(summary) => result.summaries.push((domain_id, summary)),
            Err(err) => result.invalid.push((domain_id, err))
        }
    }
    Ok(result)
}
