use async_trait::async_trait;
use reqwest::Method;

use crate::{
    api::{
        client::{Backend, check_status, read_json},
        models::{Credentials, RefreshRequest, RefreshResponse, TokenPair},
        session::{Credential, RefreshedToken, TokenRefresher},
    },
    error::Result,
    prelude::*,
};

/// Unauthenticated account endpoints.
#[derive(Clone)]
pub struct Auth(Backend);

impl Auth {
    pub const fn new(backend: Backend) -> Self {
        Self(backend)
    }

    #[instrument(skip_all, fields(username = username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Credential> {
        const PATH: &str = "login/";

        info!("logging in…");
        let response = self
            .0
            .request(Method::POST, PATH)
            .json(&Credentials { username, password })
            .send()
            .await?;
        let tokens: TokenPair = read_json(PATH, response).await?;
        Ok(Credential { access_token: tokens.access, refresh_token: tokens.refresh })
    }

    #[instrument(skip_all, fields(username = username))]
    pub async fn register(&self, username: &str, password: &str) -> Result {
        info!("registering…");
        let response = self
            .0
            .request(Method::POST, "register/")
            .json(&Credentials { username, password })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenRefresher for Auth {
    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken> {
        const PATH: &str = "token/refresh/";

        let response = self
            .0
            .request(Method::POST, PATH)
            .json(&RefreshRequest { refresh: refresh_token })
            .send()
            .await?;
        let response: RefreshResponse = read_json(PATH, response).await?;
        Ok(RefreshedToken { access_token: response.access, refresh_token: response.refresh })
    }
}
