use std::collections::{HashMap, hash_map::Entry};

use chrono::{Datelike, NaiveDateTime};

use crate::{
    core::record::ConsumptionRecord,
    error::{Error, Result},
};

/// Aggregation granularity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, clap::ValueEnum)]
pub enum Period {
    Day,
    Month,
    Year,
}

impl Period {
    /// Bucket label of the timestamp: `2013-01-31`, `1-2013` or `2013`.
    ///
    /// Months are 1-based and not zero-padded.
    #[must_use]
    pub fn label(self, timestamp: NaiveDateTime) -> String {
        match self {
            Self::Day => timestamp.format("%Y-%m-%d").to_string(),
            Self::Month => format!("{}-{}", timestamp.month(), timestamp.year()),
            Self::Year => timestamp.year().to_string(),
        }
    }

    #[must_use]
    pub const fn header(self) -> &'static str {
        match self {
            Self::Day => "Day",
            Self::Month => "Month",
            Self::Year => "Year",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Day => "Daily consumption",
            Self::Month => "Monthly consumption",
            Self::Year => "Yearly consumption",
        }
    }
}

#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Bucket {
    pub label: String,
    pub total: f64,
}

/// Sum up the consumption per period label.
///
/// Buckets come out in the order their labels first occur in `records`. Nothing gets
/// sorted: unsorted input produces unsorted buckets.
pub fn aggregate(records: &[ConsumptionRecord], period: Period) -> Result<Vec<Bucket>> {
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut indices: HashMap<String, usize> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        let consumption = record.consumption.filter(|value| value.is_finite()).ok_or_else(|| {
            Error::InvalidRecord { index, consumer_id: record.consumer_id.clone() }
        })?;
        match indices.entry(period.label(record.timestamp)) {
            Entry::Occupied(entry) => {
                buckets[*entry.get()].total += consumption;
            }
            Entry::Vacant(entry) => {
                buckets.push(Bucket { label: entry.key().clone(), total: consumption });
                entry.insert(buckets.len() - 1);
            }
        }
    }

    Ok(buckets)
}
