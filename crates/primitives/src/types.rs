use std::fmt::{Display, Formatter};
use std::sync::Arc;


pub type BlockNumber = u64;
pub type ItemIndex = u32;
pub type DomainId = u32;
pub type OperatorId = u64;
pub type EpochIndex = u32;
pub type Balance = u128;


#[derive(Debug, Default, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BlockRef {
    pub number: BlockNumber,
    pub hash: String
}


impl Display for BlockRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.number, self.hash)
    }
}


/// Identifier of an event within the chain, `<height>-<index>`.
pub fn event_id(block: BlockNumber, index: ItemIndex) -> String {
    format!("{}-{}", block, index)
}


/// Identifier of an extrinsic within the chain, `<height>-<index>`.
pub fn extrinsic_id(block: BlockNumber, index: ItemIndex) -> String {
    format!("{}-{}", block, index)
}


pub trait Block {
    fn number(&self) -> BlockNumber;

    fn hash(&self) -> &str;

    fn parent_hash(&self) -> &str;

    /// Block timestamp in milliseconds
    fn timestamp(&self) -> Option<i64> {
        None
    }

    fn parent_number(&self) -> BlockNumber {
        self.number().saturating_sub(1)
    }

    fn to_ref(&self) -> BlockRef {
        BlockRef {
            number: self.number(),
            hash: self.hash().to_string()
        }
    }
}


impl<'a, T: Block> Block for &'a T {
    #[inline]
    fn number(&self) -> BlockNumber {
        (*self).number()
    }

    #[inline]
    fn hash(&self) -> &str {
        (*self).hash()
    }

    #[inline]
    fn parent_hash(&self) -> &str {
        (*self).parent_hash()
    }

    #[inline]
    fn timestamp(&self) -> Option<i64> {
        (*self).timestamp()
    }
}


impl<T: Block> Block for Arc<T> {
    #[inline]
    fn number(&self) -> BlockNumber {
        self.as_ref().number()
    }

    #[inline]
    fn hash(&self) -> &str {
        self.as_ref().hash()
    }

    #[inline]
    fn parent_hash(&self) -> &str {
        self.as_ref().parent_hash()
    }

    #[inline]
    fn timestamp(&self) -> Option<i64> {
        self.as_ref().timestamp()
    }
}
