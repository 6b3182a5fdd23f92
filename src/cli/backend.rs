use std::path::PathBuf;

use chrono::TimeDelta;
use clap::Parser;
use reqwest::Url;

use crate::{
    api::{Auth, Backend, Gateway, Session, session::Credential},
    prelude::*,
    store::SessionFile,
};

#[derive(Parser)]
pub struct BackendArgs {
    /// Backend API base URL.
    #[clap(
        long = "api-base-url",
        env = "METERDASH_API_BASE_URL",
        default_value = "http://localhost:8000/api/"
    )]
    base_url: Url,

    #[clap(long = "api-timeout", env = "METERDASH_API_TIMEOUT", default_value = "10s")]
    timeout: humantime::Duration,

    /// Where the access and refresh tokens are kept.
    #[clap(long, env = "METERDASH_SESSION_FILE", default_value = "session.toml")]
    session_file: PathBuf,

    /// Refresh the access token when it expires within this time.
    #[clap(long, env = "METERDASH_EXPIRY_LEEWAY", default_value = "5s")]
    expiry_leeway: humantime::Duration,
}

impl BackendArgs {
    pub fn session_file(&self) -> SessionFile {
        SessionFile::new(&self.session_file)
    }

    pub fn backend(&self) -> Result<Backend> {
        Ok(Backend::new(self.base_url.clone(), self.timeout.into())?)
    }

    pub fn auth(&self) -> Result<Auth> {
        Ok(Auth::new(self.backend()?))
    }

    /// Resume the stored session.
    pub async fn connect(&self) -> Result<Connection> {
        let file = self.session_file();
        let credential = file.load()?.context("not logged in, run `meterdash login` first")?;
        let backend = self.backend()?;
        let session = Session::new(
            Auth::new(backend.clone()),
            None,
            TimeDelta::from_std(self.expiry_leeway.into())?,
        );
        session.set(credential.clone()).await;
        Ok(Connection { gateway: Gateway::new(backend, session), file, initial: credential })
    }
}

/// Gateway bound to the session file it was resumed from.
pub struct Connection {
    pub gateway: Gateway,
    file: SessionFile,
    initial: Credential,
}

impl Connection {
    /// Persist the credential if it got refreshed in the meantime.
    pub async fn close(self) -> Result {
        match self.gateway.session().credential().await {
            Some(credential) if credential != self.initial => self.file.save(&credential),
            Some(_) => Ok(()),
            None => self.file.clear(),
        }
    }
}
