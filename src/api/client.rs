use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Backend base URL together with the pre-configured HTTP client.
#[derive(Clone)]
pub struct Backend {
    client: Client,
    base_url: Url,
}

impl Backend {
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(concat!("meterdash/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base_url })
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{path}", self.base_url))
    }
}

/// Fail on an unsuccessful status, passing the successful response through.
///
/// Client errors carry the backend's message, server errors count as transport failures.
pub async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_client_error() {
        let body = response.text().await?;
        Err(Error::Validation { status, message: extract_message(status, &body) })
    } else {
        Ok(response.error_for_status()?)
    }
}

pub async fn read_json<R: DeserializeOwned>(path: &str, response: Response) -> Result<R> {
    let body = check_status(response).await?.bytes().await?;
    serde_json::from_slice(&body).map_err(|error| Error::malformed(path, error))
}

/// Human-readable message from an error payload.
///
/// Understands `{"detail": …}`, `{"error": …}`, `{"message": …}` and field error maps.
pub fn extract_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    let Ok(payload) = serde_json::from_str::<serde_json::Value>(body) else {
        return if body.is_empty() {
            status.canonical_reason().unwrap_or("no details").to_owned()
        } else {
            body.to_owned()
        };
    };
    for key in ["detail", "error", "message"] {
        if let Some(message) = payload.get(key).and_then(serde_json::Value::as_str) {
            return message.to_owned();
        }
    }
    payload.to_string()
}
