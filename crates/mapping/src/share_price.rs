use crate::entity::OperatorEpochSharePrice;
use crate::epoch::EpochTransition;
use crate::mapper::BlockContext;
use domstake_chain::OperatorRecord;
use domstake_primitives::{Balance, U256};
use tracing::debug;


/// Fixed-point scale of share prices, the same one the runtime uses.
pub const SHARES_CALCULATION_MULTIPLIER: u128 = 1_000_000_000_000_000_000;


/// Operator reward left after the nomination tax, `reward - floor(reward * tax / 100)`.
///
/// `nomination_tax` is a percent, values above 100 are treated as 100.
pub fn taxed_reward(reward: Balance, nomination_tax: u8) -> Balance {
    let tax = Balance::from(nomination_tax.min(100));
    // floor(r * t / 100) without overflowing r * t
    let taxed = reward / 100 * tax + reward % 100 * tax / 100;
    reward - taxed
}


/// `floor((total_stake + taxed_reward) * MULTIPLIER / total_shares)`, `None` for zero shares.
pub fn share_price(total_stake: Balance, taxed_reward: Balance, total_shares: Balance) -> Option<U256> {
    if total_shares == 0 {
        return None
    }
    let value = U256::from(total_stake) + U256::from(taxed_reward);
    Some(value * U256::from(SHARES_CALCULATION_MULTIPLIER) / U256::from(total_shares))
}


/// Prices of all operators of transitioned domains at the end of the closed epoch.
///
/// Operators without shares have no defined price and are left out.
pub fn derive_share_prices(
    transitions: &[EpochTransition],
    operators: &[OperatorRecord],
    ctx: &BlockContext
) -> Vec<OperatorEpochSharePrice>
{
    let mut prices = Vec::new();

    for transition in transitions {
        let rewards = &transition.parent_summary;

        for operator in operators.iter().filter(|op| op.current_domain_id == transition.domain_id) {
            let reward = taxed_reward(
                rewards.reward_of(operator.operator_id),
                operator.nomination_tax
            );

            let Some(price) = share_price(
                operator.current_total_stake,
                reward,
                operator.current_total_shares
            ) else {
                debug!(
                    operator_id = operator.operator_id,
                    domain_id = transition.domain_id,
                    epoch = transition.parent_epoch,
                    "operator has no shares, skipping share price"
                );
                continue
            };

            prices.push(OperatorEpochSharePrice {
                id: format!("{}-{}-{}", operator.operator_id, transition.domain_id, transition.parent_epoch),
                operator_id: operator.operator_id,
                domain_id: transition.domain_id,
                epoch_index: transition.parent_epoch,
                share_price: price,
                total_stake: operator.current_total_stake,
                total_shares: operator.current_total_shares,
                timestamp: ctx.timestamp,
                block_height: ctx.height
            })
        }
    }

    prices
}
