use clap::Parser;

use crate::{
    cli::backend::BackendArgs,
    core::forecast::{Month, request_forecast},
    prelude::*,
    tables::build_series_table,
};

#[derive(Parser)]
pub struct ForecastArgs {
    /// Consumer to predict the consumption for.
    #[clap(long)]
    consumer_id: Option<String>,

    /// Month to predict, `YYYY-MM`.
    #[clap(long, env = "METERDASH_FORECAST_MONTH", default_value = "2013-06")]
    month: Month,
}

impl ForecastArgs {
    #[instrument(skip_all, fields(month = %self.month))]
    pub async fn run(self, backend: &BackendArgs) -> Result {
        let connection = backend.connect().await?;
        let series =
            request_forecast(&connection.gateway, self.consumer_id.as_deref(), self.month).await;
        connection.close().await?;
        let series = series?;
        println!("Predicted consumption");
        println!("{}", build_series_table("Day", "Consumption", &series));
        Ok(())
    }
}
