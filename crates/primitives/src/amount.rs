//! Amounts are exchanged as base-unit integers and serialized as decimal strings,
//! so that consumers without 128-bit integers never lose precision.

pub use primitive_types::U256;


pub mod decimal {
    use crate::Balance;
    use serde::{Deserialize, Deserializer, Serializer};


    pub fn serialize<S: Serializer>(value: &Balance, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }


    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Balance, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(|_| {
            serde::de::Error::custom(format!("failed to deserialize `{}` as u128", s))
        })
    }
}


pub mod u256_decimal {
    use primitive_types::U256;
    use serde::{Deserialize, Deserializer, Serializer};


    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        // `Display` for U256 is decimal, unlike its `FromStr`
        serializer.collect_str(value)
    }


    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        U256::from_dec_str(&s).map_err(|_| {
            serde::de::Error::custom(format!("failed to deserialize `{}` as U256", s))
        })
    }
}
