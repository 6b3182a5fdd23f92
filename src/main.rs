#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod cli;
mod core;
mod error;
mod prelude;
mod store;
mod tables;

use clap::{Parser, crate_version};

use crate::{cli::Args, prelude::*};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();
    let session_file = args.session_file();

    if let Err(error) = args.run().await {
        let is_auth_expired = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<error::Error>())
            .is_some_and(error::Error::is_auth_expired);
        if is_auth_expired {
            warn!("the session has expired, please log in again");
            session_file.clear()?;
        }
        return Err(error);
    }

    info!("done!");
    Ok(())
}
