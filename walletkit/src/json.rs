//! Typed access to JSON dictionaries
//!
//! Account and network metadata from remote APIs arrives as loosely typed
//! JSON. [`Json`] offers optional, non-panicking accessors: a missing key,
//! a type mismatch, or a lossy numeric conversion all yield `None`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Date format used by remote payloads, e.g. `2019-04-01T12:30:45.123+0000`
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// A JSON object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Json(Map<String, Value>);

impl Json {
    pub fn new(dict: Map<String, Value>) -> Self {
        Self(dict)
    }

    /// Wrap a value if it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(dict) => Some(Self(dict)),
            _ => None,
        }
    }

    /// Parse bytes holding a JSON object
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        deserialize_as_json::<Map<String, Value>>(Some(data)).map(Self)
    }

    pub fn dict(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_string(&self, key: &str) -> Option<String> {
        self.0.get(key)?.as_str().map(str::to_string)
    }

    pub fn as_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key)?.as_bool()
    }

    pub fn as_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key)?.as_i64()
    }

    pub fn as_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key)?.as_u64()
    }

    pub fn as_u32(&self, key: &str) -> Option<u32> {
        self.as_u64(key)?.try_into().ok()
    }

    pub fn as_u8(&self, key: &str) -> Option<u8> {
        self.as_u64(key)?.try_into().ok()
    }

    /// A date string in [`DATE_FORMAT`]
    pub fn as_date(&self, key: &str) -> Option<DateTime<Utc>> {
        let text = self.0.get(key)?.as_str()?;
        DateTime::parse_from_str(text, DATE_FORMAT)
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }

    /// Base64 encoded bytes
    pub fn as_data(&self, key: &str) -> Option<Vec<u8>> {
        let text = self.0.get(key)?.as_str()?;
        BASE64.decode(text).ok()
    }

    pub fn as_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.0.get(key)?.as_array()
    }

    pub fn as_dict(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key)?.as_object()
    }

    /// An array whose elements are all strings
    pub fn as_string_array(&self, key: &str) -> Option<Vec<String>> {
        self.as_array(key)?
            .iter()
            .map(|value| value.as_str().map(str::to_string))
            .collect()
    }

    /// A nested object
    pub fn as_json(&self, key: &str) -> Option<Json> {
        self.as_dict(key).cloned().map(Json)
    }
}

/// Deserialize raw JSON, distinguishing absent input from malformed input
pub fn deserialize_as_json<T: DeserializeOwned>(data: Option<&[u8]>) -> Result<T> {
    let data = data.ok_or(Error::NoData)?;
    serde_json::from_slice(data).map_err(|e| Error::JsonParse(e.to_string()))
}

/// Format a date in [`DATE_FORMAT`]
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Json {
        Json::from_value(json!({
            "id": "uid-1",
            "mainnet": true,
            "balance": -42,
            "height": 700000,
            "big": 5000000000u64,
            "decimals": 8,
            "created": "2019-04-01T12:30:45.123+0000",
            "key": "3q2+7w==",
            "tags": ["btc", "bch"],
            "mixed": ["btc", 1],
            "meta": { "name": "Bitcoin" }
        }))
        .unwrap()
    }

    #[test]
    fn test_scalar_accessors() {
        let json = sample();

        assert_eq!(json.as_string("id"), Some("uid-1".to_string()));
        assert_eq!(json.as_bool("mainnet"), Some(true));
        assert_eq!(json.as_i64("balance"), Some(-42));
        assert_eq!(json.as_u64("balance"), None);
        assert_eq!(json.as_u32("height"), Some(700000));
        assert_eq!(json.as_u32("big"), None);
        assert_eq!(json.as_u8("decimals"), Some(8));
        assert_eq!(json.as_u8("height"), None);

        assert_eq!(json.as_string("missing"), None);
        assert_eq!(json.as_bool("id"), None);
    }

    #[test]
    fn test_date_and_data() {
        let json = sample();
        let expected = Utc.with_ymd_and_hms(2019, 4, 1, 12, 30, 45).unwrap() + chrono::Duration::milliseconds(123);

        assert_eq!(json.as_date("created"), Some(expected));
        assert_eq!(format_date(&expected), "2019-04-01T12:30:45.123+0000");
        assert_eq!(json.as_date("id"), None);

        assert_eq!(json.as_data("key"), Some(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(json.as_data("created"), None);
    }

    #[test]
    fn test_collections() {
        let json = sample();

        assert_eq!(json.as_string_array("tags"), Some(vec!["btc".to_string(), "bch".to_string()]));
        assert_eq!(json.as_string_array("mixed"), None);
        assert_eq!(json.as_array("mixed").map(Vec::len), Some(2));
        assert_eq!(json.as_json("meta").and_then(|meta| meta.as_string("name")), Some("Bitcoin".to_string()));
        assert!(json.as_dict("tags").is_none());
    }

    #[test]
    fn test_deserialize_as_json() {
        assert!(matches!(deserialize_as_json::<Named>(None), Err(Error::NoData)));
        assert!(matches!(deserialize_as_json::<Named>(Some(&b"{not json"[..])), Err(Error::JsonParse(_))));

        let value: Named = deserialize_as_json(Some(&br#"{"name":"x"}"#[..])).unwrap();
        assert_eq!(value.name, "x");

        assert!(Json::from_slice(b"[1,2]").is_err());
        assert_eq!(Json::from_slice(br#"{"a":1}"#).unwrap().as_u8("a"), Some(1));
    }

    #[derive(serde::Deserialize)]
    struct Named {
        name: String,
    }
}
