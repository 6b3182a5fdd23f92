use chrono::NaiveDate;
use clap::Parser;
use itertools::Itertools;

use crate::{
    cli::backend::BackendArgs,
    core::{
        aggregate::{Period, aggregate},
        filter::FilterCriteria,
        series::Series,
    },
    prelude::*,
    tables::{build_series_table, build_stats_table},
};

#[derive(Parser)]
pub struct RecordsArgs {
    /// Consumer ID, `All` for every consumer.
    #[clap(long)]
    consumer_id: Option<String>,

    /// Postcode, `All` for every postcode.
    #[clap(long)]
    postcode: Option<String>,

    /// First day to include.
    #[clap(long)]
    start_date: Option<NaiveDate>,

    /// Last day to include.
    #[clap(long)]
    end_date: Option<NaiveDate>,

    /// Aggregation periods to display.
    #[clap(
        long = "period",
        value_delimiter = ',',
        num_args = 1..,
        default_value = "day,month,year"
    )]
    periods: Vec<Period>,
}

impl RecordsArgs {
    #[instrument(skip_all)]
    pub async fn run(self, backend: &BackendArgs) -> Result {
        let criteria = FilterCriteria::builder()
            .maybe_consumer_id(self.consumer_id)
            .maybe_postcode(self.postcode)
            .maybe_start_date(self.start_date)
            .maybe_end_date(self.end_date)
            .build()
            .normalized();
        if let (Some(start_date), Some(end_date)) = (criteria.start_date, criteria.end_date) {
            ensure!(start_date <= end_date, "the start date is after the end date");
        }

        let connection = backend.connect().await?;
        let records = connection.gateway.list_records(&criteria).await;
        connection.close().await?;
        let records = records?;

        if records.is_empty() {
            warn!("the consumer ID or postcode does not exist");
            return Ok(());
        }

        let postcodes =
            records.iter().map(|record| record.postcode.as_str()).unique().collect_vec();
        println!("{}", build_stats_table(&criteria, &postcodes));

        for period in self.periods.into_iter().unique() {
            let series = Series::from(aggregate(&records, period)?);
            println!("{}", period.title());
            println!("{}", build_series_table(period.header(), "Consumption", &series));
        }

        Ok(())
    }
}
