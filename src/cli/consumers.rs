use clap::Parser;

use crate::{
    cli::backend::BackendArgs,
    core::filter::FilterCriteria,
    prelude::*,
    tables::build_consumers_table,
};

#[derive(Parser)]
pub struct ConsumersArgs {
    /// Keep the consumers whose ID contains this.
    #[clap(long)]
    consumer_id: Option<String>,

    /// Keep the consumers whose postcode contains this.
    #[clap(long)]
    postcode: Option<String>,
}

impl ConsumersArgs {
    #[instrument(skip_all)]
    pub async fn run(self, backend: &BackendArgs) -> Result {
        let criteria = FilterCriteria::builder()
            .maybe_consumer_id(self.consumer_id)
            .maybe_postcode(self.postcode)
            .build()
            .normalized();
        let connection = backend.connect().await?;
        let consumers = connection.gateway.list_consumers(&criteria).await;
        connection.close().await?;
        println!("{}", build_consumers_table(&consumers?));
        Ok(())
    }
}
