use domstake_primitives::{decimal, u256_decimal, Balance, BlockNumber, DomainId, EpochIndex, OperatorId, U256};
use serde::Serialize;
use std::fmt::{Display, Formatter};


#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub id: String,
    pub operator_id: OperatorId,
    pub domain_id: DomainId,
    pub owner: Option<String>,
    pub signing_key: String,
    pub nomination_tax: u8,
    #[serde(with = "decimal")]
    pub minimum_nominator_stake: Balance,
    #[serde(with = "decimal")]
    pub current_total_stake: Balance,
    #[serde(with = "decimal")]
    pub current_total_shares: Balance,
    pub status: Option<String>,
    pub timestamp: i64,
    pub block_height: BlockNumber,
}


#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperatorEpochSharePrice {
    pub id: String,
    pub operator_id: OperatorId,
    pub domain_id: DomainId,
    /// Epoch that ended at this block
    pub epoch_index: EpochIndex,
    #[serde(with = "u256_decimal")]
    pub share_price: U256,
    #[serde(with = "decimal")]
    pub total_stake: Balance,
    #[serde(with = "decimal")]
    pub total_shares: Balance,
    pub timestamp: i64,
    pub block_height: BlockNumber,
}


#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NominatorDeposit {
    pub id: String,
    pub address: String,
    pub operator_id: OperatorId,
    pub domain_id: DomainId,
    #[serde(with = "decimal")]
    pub known_shares: Balance,
    #[serde(with = "decimal")]
    pub known_storage_fee_deposit: Balance,
    #[serde(with = "decimal")]
    pub pending_amount: Balance,
    #[serde(with = "decimal")]
    pub pending_storage_fee_deposit: Balance,
    pub pending_effective_domain_epoch: Option<EpochIndex>,
    pub event_ids: Vec<String>,
    pub extrinsic_ids: Vec<String>,
    pub block_heights: Vec<BlockNumber>,
    pub timestamp: i64,
    pub block_height: BlockNumber,
    pub processed: bool,
}


#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NominatorWithdrawal {
    pub id: String,
    pub address: String,
    pub operator_id: OperatorId,
    pub domain_id: DomainId,
    #[serde(with = "decimal")]
    pub withdrawal_in_shares_amount: Balance,
    #[serde(with = "decimal")]
    pub withdrawal_in_shares_storage_fee_refund: Balance,
    pub withdrawal_in_shares_domain_epoch: Option<EpochIndex>,
    pub withdrawal_in_shares_unlock_block: Option<BlockNumber>,
    #[serde(with = "decimal")]
    pub total_withdrawal_amount: Balance,
    #[serde(with = "decimal")]
    pub total_storage_fee_withdrawal: Balance,
    pub withdrawals_json: String,
    pub total_pending_withdrawals: u32,
    pub event_ids: Vec<String>,
    pub extrinsic_ids: Vec<String>,
    pub block_heights: Vec<BlockNumber>,
    pub timestamp: i64,
    pub block_height: BlockNumber,
    pub processed: bool,
}


#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedEvent {
    pub id: String,
    pub domain_id: DomainId,
    pub operator_id: OperatorId,
    pub address: String,
    #[serde(with = "decimal")]
    pub amount: Balance,
    pub extrinsic_id: String,
    pub event_id: String,
    pub timestamp: i64,
    pub block_height: BlockNumber,
}


#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NominatorsUnlockedEvent {
    pub id: String,
    pub domain_id: DomainId,
    pub operator_id: OperatorId,
    pub address: String,
    pub extrinsic_id: String,
    pub event_id: String,
    pub timestamp: i64,
    pub block_height: BlockNumber,
}


#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BundleSubmission {
    pub id: String,
    pub domain_id: DomainId,
    pub operator_id: OperatorId,
    pub domain_block_number: BlockNumber,
    pub consensus_block_number: BlockNumber,
    pub bundle_hash: String,
    pub bundle_author: Option<String>,
    pub extrinsic_id: String,
    pub event_id: String,
    pub timestamp: i64,
    pub block_height: BlockNumber,
}


/// Typed access to one variant of [Entity].
pub trait EntityRecord: Into<Entity> {
    const KIND: EntityKind;

    fn from_entity(entity: &Entity) -> Option<&Self>;
}


macro_rules! entities {
    ($($name:ident => $tag:literal),* $(,)?) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum EntityKind {
            $($name),*
        }


        impl EntityKind {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(EntityKind::$name => $tag),*
                }
            }
        }


        #[derive(Serialize, Debug, Clone, PartialEq, Eq)]
        #[serde(untagged)]
        pub enum Entity {
            $($name($name)),*
        }


        impl Entity {
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Entity::$name(_) => EntityKind::$name),*
                }
            }

            pub fn id(&self) -> &str {
                match self {
                    $(Entity::$name(e) => &e.id),*
                }
            }
        }


        $(
            impl From<$name> for Entity {
                fn from(value: $name) -> Self {
                    Entity::$name(value)
                }
            }


            impl EntityRecord for $name {
                const KIND: EntityKind = EntityKind::$name;

                fn from_entity(entity: &Entity) -> Option<&Self> {
                    match entity {
                        Entity::$name(e) => Some(e),
                        #[allow(unreachable_patterns)]
                        _ => None
                    }
                }
            }
        )*
    };
}


entities! {
    Operator => "Operator",
    OperatorEpochSharePrice => "OperatorEpochSharePrice",
    NominatorDeposit => "NominatorDeposit",
    NominatorWithdrawal => "NominatorWithdrawal",
    UnlockedEvent => "UnlockedEvent",
    NominatorsUnlockedEvent => "NominatorsUnlockedEvent",
    BundleSubmission => "BundleSubmission",
}


impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
