//! Serde helpers for big integers in persisted objects.
//!
//! Values are written as JSON strings holding signed decimal. On read a
//! string or a bare JSON integer of any size is accepted; serde_json keeps
//! the exact digits of bare numbers (`arbitrary_precision`).

use serde::de;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;

fn from_value<T, E>(value: Value) -> Result<T, E>
where
    T: FromStr,
    E: de::Error,
{
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(E::custom(format!(
                "expected a decimal integer as string or number, found {other}"
            )))
        }
    };
    T::from_str(&text).map_err(|_| E::custom(format!("invalid decimal integer: {text}")))
}

pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FromStr,
    D: Deserializer<'de>,
{
    from_value(Value::deserialize(deserializer)?)
}

/// Same encoding for `Option<T>` fields; `null` or a missing field is `None`.
pub mod option {
    use super::from_value;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => from_value(value).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::{BigInt, BigUint};
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Holder {
        #[serde(with = "crate::models::decimal")]
        id: BigInt,
        #[serde(default, with = "crate::models::decimal::option")]
        capacity: Option<BigUint>,
    }

    fn big(s: &str) -> BigInt {
        s.parse().unwrap()
    }

    #[test]
    fn test_reads_string_and_number() {
        let json = r#"{"id": "-340282366920938463463374607431768211456", "capacity": 256}"#;
        let h: Holder = serde_json::from_str(json).unwrap();
        assert_eq!(h.id, big("-340282366920938463463374607431768211456"));
        assert_eq!(h.capacity, Some(BigUint::from(256u32)));

        let h: Holder = serde_json::from_str(r#"{"id": 42, "capacity": null}"#).unwrap();
        assert_eq!(h.id, BigInt::from(42));
        assert_eq!(h.capacity, None);
    }

    #[test]
    fn test_reads_bare_numbers_beyond_64_bits() {
        let json = r#"{"id": -9223372036854775809, "capacity": 18446744073709551616}"#;
        let h: Holder = serde_json::from_str(json).unwrap();
        assert_eq!(h.id, big("-9223372036854775809"));
        assert_eq!(h.capacity, Some(BigUint::from(1u32) << 64usize));

        let json = r#"{"id": 123456789012345678901234567890}"#;
        let h: Holder = serde_json::from_str(json).unwrap();
        assert_eq!(h.id, big("123456789012345678901234567890"));
    }

    #[test]
    fn test_writes_string() {
        let h = Holder {
            id: BigInt::from(-7),
            capacity: Some(BigUint::from(1u32) << 128usize),
        };
        assert_eq!(
            serde_json::to_string(&h).unwrap(),
            r#"{"id":"-7","capacity":"340282366920938463463374607431768211456"}"#
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<Holder>(r#"{"id": "12a"}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"id": 1.5}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"id": 1e30}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"id": true}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"id": 1, "capacity": "-1"}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"id": 1, "capacity": -1}"#).is_err());
    }
}
