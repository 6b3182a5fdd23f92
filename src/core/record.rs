use chrono::NaiveDateTime;

/// Single consumption measurement of a consumer.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct ConsumptionRecord {
    pub consumer_id: String,
    pub postcode: String,
    pub timestamp: NaiveDateTime,

    /// Missing when the backend had no value, rejected on aggregation.
    pub consumption: Option<f64>,
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Consumer {
    pub consumer_id: String,
    pub postcode: String,
}
