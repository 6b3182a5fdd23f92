mod account;
mod backend;
mod consumers;
mod forecast;
mod records;

use clap::{Parser, Subcommand};

use crate::{
    cli::{
        account::AccountArgs,
        backend::BackendArgs,
        consumers::ConsumersArgs,
        forecast::ForecastArgs,
        records::RecordsArgs,
    },
    prelude::*,
    store::SessionFile,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[clap(flatten)]
    pub backend: BackendArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in and store the session tokens.
    #[clap(name = "login")]
    Login(AccountArgs),

    /// Create a new account.
    #[clap(name = "register")]
    Register(AccountArgs),

    /// Exchange the stored refresh token for a new access token right away.
    #[clap(name = "refresh")]
    Refresh,

    /// Forget the stored session.
    #[clap(name = "logout")]
    Logout,

    /// List the consumers.
    #[clap(name = "consumers")]
    Consumers(ConsumersArgs),

    /// Display the consumption statistics per day, month, and year.
    #[clap(name = "records")]
    Records(Box<RecordsArgs>),

    /// Predict the daily consumption of a consumer.
    #[clap(name = "forecast")]
    Forecast(ForecastArgs),
}

impl Args {
    pub fn session_file(&self) -> SessionFile {
        self.backend.session_file()
    }

    pub async fn run(self) -> Result {
        match self.command {
            Command::Login(args) => args.login(&self.backend).await,
            Command::Register(args) => args.register(&self.backend).await,
            Command::Refresh => {
                let connection = self.backend.connect().await?;
                let credential = connection.gateway.session().refresh().await;
                connection.close().await?;
                info!(expires_at = ?credential?.expires_at(), "refreshed");
                Ok(())
            }
            Command::Logout => {
                let session_file = self.backend.session_file();
                session_file.clear()?;
                info!(path = %session_file.path().display(), "logged out");
                Ok(())
            }
            Command::Consumers(args) => args.run(&self.backend).await,
            Command::Records(args) => args.run(&self.backend).await,
            Command::Forecast(args) => args.run(&self.backend).await,
        }
    }
}
