//! Forgiving field deserializers for pack payloads.
//!
//! Pack producers write `null` for unset fields and are loose about numbers
//! versus numeric strings. These helpers map `null` to the field default and
//! accept either representation where the meaning is unambiguous.

use serde::de::{Deserialize, Deserializer, Error};
use serde_json::Value;

/// `null` becomes `T::default()`.
pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A string, or a number rendered as its decimal text. `null` is empty.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(D::Error::custom(format!(
            "invalid type: {other}, expected a string or number"
        ))),
    }
}

/// An integer, or a string holding one. `null` and blank strings are zero.
pub(crate) fn int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64> + Default,
{
    let value = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(T::default()),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("integer out of range: {n}")))?,
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(T::default()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("invalid integer string: {s:?}")))?,
        Some(other) => {
            return Err(D::Error::custom(format!(
                "invalid type: {other}, expected an integer"
            )))
        }
    };
    T::try_from(value).map_err(|_| D::Error::custom(format!("integer out of range: {value}")))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Sample {
        #[serde(deserialize_with = "super::text")]
        name: String,
        #[serde(deserialize_with = "super::int")]
        count: i64,
        #[serde(deserialize_with = "super::int")]
        level: i32,
        #[serde(deserialize_with = "super::or_default")]
        flag: bool,
    }

    fn parse(json: &str) -> serde_json::Result<Sample> {
        serde_json::from_str(json)
    }

    #[test]
    fn nulls_become_defaults() {
        let s = parse(r#"{"name":null,"count":null,"level":null,"flag":null}"#).unwrap();
        assert_eq!(s.name, "");
        assert_eq!(s.count, 0);
        assert_eq!(s.level, 0);
        assert!(!s.flag);
    }

    #[test]
    fn numbers_and_strings_interchange() {
        let s = parse(r#"{"name":7300,"count":"42","level":" 3 "}"#).unwrap();
        assert_eq!(s.name, "7300");
        assert_eq!(s.count, 42);
        assert_eq!(s.level, 3);

        let s = parse(r#"{"count":""}"#).unwrap();
        assert_eq!(s.count, 0);
    }

    #[test]
    fn rejects_what_cannot_convert() {
        assert!(parse(r#"{"count":"abc"}"#).is_err());
        assert!(parse(r#"{"count":1.5}"#).is_err());
        assert!(parse(r#"{"level":4294967296}"#).is_err());
        assert!(parse(r#"{"name":[1]}"#).is_err());
    }
}
