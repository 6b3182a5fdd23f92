use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::core::record::{Consumer, ConsumptionRecord};

/// `Customer` and `Postcode` are stored as integers, but nothing stops them from being strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Identifier {
    Text(String),
    Number(serde_json::Number),
}

impl From<Identifier> for String {
    fn from(identifier: Identifier) -> Self {
        match identifier {
            Identifier::Text(text) => text,
            Identifier::Number(number) => number.to_string(),
        }
    }
}

fn deserialize_identifier<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Identifier::deserialize(deserializer).map(String::from)
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<NaiveDateTime, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text)
        .ok_or_else(|| de::Error::invalid_value(de::Unexpected::Str(&text), &"a date or date-time"))
}

/// Parse RFC 3339, naive date-time, or a bare date (taken as midnight).
fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(text, format) {
            return Some(timestamp);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[derive(Deserialize)]
pub struct RecordPayload {
    #[serde(rename = "Customer", deserialize_with = "deserialize_identifier")]
    consumer_id: String,

    #[serde(rename = "Postcode", deserialize_with = "deserialize_identifier")]
    postcode: String,

    #[serde(rename = "date", deserialize_with = "deserialize_timestamp")]
    timestamp: NaiveDateTime,

    #[serde(default)]
    consumption: Option<f64>,
}

impl From<RecordPayload> for ConsumptionRecord {
    fn from(payload: RecordPayload) -> Self {
        Self {
            consumer_id: payload.consumer_id,
            postcode: payload.postcode,
            timestamp: payload.timestamp,
            consumption: payload.consumption,
        }
    }
}

#[derive(Deserialize)]
pub struct ConsumerPayload {
    #[serde(rename = "Customer", deserialize_with = "deserialize_identifier")]
    consumer_id: String,

    #[serde(rename = "Postcode", deserialize_with = "deserialize_identifier")]
    postcode: String,
}

impl From<ConsumerPayload> for Consumer {
    fn from(payload: ConsumerPayload) -> Self {
        Self { consumer_id: payload.consumer_id, postcode: payload.postcode }
    }
}

/// Query string of the collection endpoints; absent constraints are omitted.
#[derive(Serialize)]
pub struct CollectionQuery<'a> {
    #[serde(rename = "Customer", skip_serializing_if = "Option::is_none")]
    pub consumer_id: Option<&'a str>,

    #[serde(rename = "Postcode", skip_serializing_if = "Option::is_none")]
    pub postcode: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Deserialize)]
pub struct RefreshResponse {
    pub access: String,

    /// Only present when the backend rotates refresh tokens.
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Serialize)]
pub struct PredictRequest<'a> {
    #[serde(rename = "consumerId")]
    pub consumer_id: &'a str,

    pub month: String,
}

#[derive(Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    predicted_consumption: Option<serde_json::Value>,

    #[serde(default)]
    error: Option<String>,
}

impl PredictResponse {
    /// Check that the prediction is a numeric sequence.
    pub fn into_values(self) -> Result<Vec<f64>, String> {
        let Some(serde_json::Value::Array(values)) = self.predicted_consumption else {
            return Err(self.error.unwrap_or_else(|| "invalid prediction response".to_owned()));
        };
        values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                value.as_f64().ok_or_else(|| format!("prediction #{index} is not a number: {value}"))
            })
            .collect()
    }
}
