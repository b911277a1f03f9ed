use crate::{JsonValue, ParseError};
use std::marker::PhantomData;
use std::str::FromStr;


/// Parses a number from its human readable chain rendering.
///
/// Accepts JSON numbers as well as strings with `,` or `_` digit grouping
/// (`"1,000,000"`). Anything else, fractional or negative values included,
/// is rejected.
pub fn parse_number<T: FromStr>(field: &'static str, value: &JsonValue) -> Result<T, ParseError> {
    let invalid = || ParseError::Number {
        field,
        value: value.to_string()
    };
    match value {
        JsonValue::Number(n) => {
            if n.is_u64() {
                n.to_string().parse().map_err(|_| invalid())
            } else {
                Err(invalid())
            }
        },
        JsonValue::String(s) => parse_grouped(s).ok_or_else(invalid),
        _ => Err(invalid())
    }
}


fn parse_grouped<T: FromStr>(s: &str) -> Option<T> {
    let digits: String = s.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None
    }
    digits.parse().ok()
}


/// Parses a percentage rendered as `"10%"`, `"10.00%"`, `"10"` or `10` and checks it is within 0..=100.
///
/// Fixed-point renderings are accepted only when the fraction is zero.
pub fn parse_percent(field: &'static str, value: &JsonValue) -> Result<u8, ParseError> {
    let invalid = || ParseError::Number {
        field,
        value: value.to_string()
    };
    let percent: u64 = match value {
        JsonValue::String(s) => {
            let s = s.trim().trim_end_matches('%');
            let whole = match s.split_once('.') {
                Some((whole, fraction)) => {
                    if fraction.is_empty() || !fraction.bytes().all(|b| b == b'0') {
                        return Err(invalid())
                    }
                    whole
                },
                None => s
            };
            parse_grouped(whole).ok_or_else(invalid)?
        },
        other => parse_number(field, other)?
    };
    if percent > 100 {
        return Err(invalid())
    }
    Ok(percent as u8)
}


/// Renders an id-like value (number or string) as a plain string.
pub fn id_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None
            }
            match parse_grouped::<u128>(s) {
                Some(n) => Some(n.to_string()),
                None => Some(s.to_string())
            }
        },
        _ => None
    }
}


struct HumanNumberVisitor<T> {
    phantom_data: PhantomData<T>
}


impl <'de, T: FromStr> serde::de::Visitor<'de> for HumanNumberVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "a number or a digit-grouped string representing {}", std::any::type_name::<T>())
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        self.visit_str(&v.to_string())
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        parse_grouped(v).ok_or_else(|| {
            serde::de::Error::custom(
                format!("failed to deserialize `{}` as {}", v, std::any::type_name::<T>())
            )
        })
    }
}


/// Deserializes a number from either a JSON number or a digit-grouped string.
pub fn decode_human<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where D: serde::Deserializer<'de>,
      T: FromStr
{
    deserializer.deserialize_any(HumanNumberVisitor::<T> {
        phantom_data: PhantomData
    })
}


/// Map key or list element holding a number in human readable form.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HumanNumber<T>(pub T);


impl <'de, T: FromStr> serde::Deserialize<'de> for HumanNumber<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>
    {
        decode_human(deserializer).map(HumanNumber)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;


    #[test]
    fn grouped_strings() {
        assert_eq!(parse_number::<u128>("amount", &json!("1,000,000")), Ok(1_000_000));
        assert_eq!(parse_number::<u128>("amount", &json!("0")), Ok(0));
        assert_eq!(parse_number::<u64>("amount", &json!(12)), Ok(12));
        assert_eq!(
            parse_number::<u128>("amount", &json!("340,282,366,920,938,463,463,374,607,431,768,211,455")),
            Ok(u128::MAX)
        );
    }

    #[test]
    fn rejects_non_integers() {
        for value in [json!("1.5"), json!("-1"), json!(""), json!(null), json!(1.5), json!(-3), json!("0x10")] {
            assert!(parse_number::<u128>("amount", &value).is_err(), "{}", value);
        }
        assert!(parse_number::<u8>("small", &json!("256")).is_err());
    }

    #[test]
    fn percentages() {
        assert_eq!(parse_percent("tax", &json!("10%")), Ok(10));
        assert_eq!(parse_percent("tax", &json!("100")), Ok(100));
        assert_eq!(parse_percent("tax", &json!(0)), Ok(0));
        assert_eq!(parse_percent("tax", &json!("10.00%")), Ok(10));
        assert_eq!(parse_percent("tax", &json!("0.00%")), Ok(0));
        assert_eq!(parse_percent("tax", &json!("100.0")), Ok(100));
        assert!(parse_percent("tax", &json!("101%")).is_err());
        assert!(parse_percent("tax", &json!("10.50%")).is_err());
        assert!(parse_percent("tax", &json!("10.%")).is_err());
        assert!(parse_percent("tax", &json!(".00%")).is_err());
        assert!(parse_percent("tax", &json!("100.01%")).is_err());
    }

    #[test]
    fn ids() {
        assert_eq!(id_string(&json!(3)), Some("3".to_string()));
        assert_eq!(id_string(&json!("1,024")), Some("1024".to_string()));
        assert_eq!(id_string(&json!("st9abc")), Some("st9abc".to_string()));
        assert_eq!(id_string(&json!(null)), None);
    }

    #[test]
    fn human_number_deserialization() {
        let values: Vec<HumanNumber<u32>> = serde_json::from_value(json!([1, "2", "3,000"])).unwrap();
        assert_eq!(values, vec![HumanNumber(1), HumanNumber(2), HumanNumber(3000)]);
    }
}
