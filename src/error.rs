use reqwest::StatusCode;

pub type Result<T = (), E = Error> = std::result::Result<T, E>;

/// Failures of the consumption client.
///
/// Aggregation and filtering fail locally. Session and gateway failures propagate
/// to the command that issued the request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("record #{index} of consumer `{consumer_id}` has no valid consumption")]
    InvalidRecord { index: usize, consumer_id: String },

    /// Refresh was rejected or failed, or the backend refused the access token.
    ///
    /// Whoever catches this must discard the stored credential.
    #[error("the session has expired, please log in again: {reason}")]
    AuthExpired { reason: String },

    #[error("not logged in")]
    Unauthenticated,

    #[error("the backend rejected the request ({status}): {message}")]
    Validation { status: StatusCode, message: String },

    #[error("failed to reach the backend")]
    Transport(#[from] reqwest::Error),

    #[error("malformed `{path}` response: {reason}")]
    MalformedResponse { path: String, reason: String },

    #[error("you must select a consumer before predicting")]
    NoConsumerSelected,
}

impl Error {
    pub fn auth_expired(reason: impl ToString) -> Self {
        Self::AuthExpired { reason: reason.to_string() }
    }

    pub fn malformed(path: &str, reason: impl ToString) -> Self {
        Self::MalformedResponse { path: path.to_owned(), reason: reason.to_string() }
    }

    #[must_use]
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }
}
