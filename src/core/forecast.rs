use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use crate::{
    core::series::Series,
    error::{Error, Result},
};

/// Predicted daily consumption, labelled `Day 1`, `Day 2`, and so on.
pub type ForecastSeries = Series;

/// Calendar month in the `YYYY-MM` form the prediction service expects.
#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::From, derive_more::Into)]
pub struct Month(NaiveDate);

impl Month {
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }
}

impl FromStr for Month {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").map(Self)
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.0.year(), self.0.month())
    }
}

#[async_trait]
pub trait Forecaster: Sync {
    /// Predicted consumption values for the consumer, one per day.
    async fn forecast(&self, consumer_id: &str, month: Month) -> Result<Vec<f64>>;
}

/// Request the forecast for the selected consumer and label it per day.
///
/// Bails out before touching the network when no consumer is selected.
pub async fn request_forecast(
    forecaster: &impl Forecaster,
    consumer_id: Option<&str>,
    month: Month,
) -> Result<ForecastSeries> {
    let consumer_id = consumer_id
        .map(str::trim)
        .filter(|consumer_id| !consumer_id.is_empty() && !consumer_id.eq_ignore_ascii_case("all"))
        .ok_or(Error::NoConsumerSelected)?;
    let values = forecaster.forecast(consumer_id, month).await?;
    Ok(values
        .into_iter()
        .enumerate()
        .map(|(index, value)| (format!("Day {}", index + 1), value))
        .collect())
}
