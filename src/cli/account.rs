use clap::Parser;

use crate::{cli::backend::BackendArgs, prelude::*};

#[derive(Parser)]
pub struct AccountArgs {
    #[clap(long, env = "METERDASH_USERNAME")]
    username: String,

    #[clap(long, env = "METERDASH_PASSWORD", hide_env_values = true)]
    password: String,
}

impl AccountArgs {
    pub async fn login(self, backend: &BackendArgs) -> Result {
        let credential = backend
            .auth()?
            .login(&self.username, &self.password)
            .await
            .context("failed to log in")?;
        backend.session_file().save(&credential)?;
        info!(expires_at = ?credential.expires_at(), "logged in");
        Ok(())
    }

    pub async fn register(self, backend: &BackendArgs) -> Result {
        backend
            .auth()?
            .register(&self.username, &self.password)
            .await
            .context("failed to register")?;
        info!(username = %self.username, "registered, you can log in now");
        Ok(())
    }
}
