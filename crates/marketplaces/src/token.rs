//! OAuth2 token endpoint shared by the marketplace clients.

use reqwest::Client;
use serde::Deserialize;

use crosslist_auth::{AuthError, ClientCredentials, TokenGrant};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: u64,
    #[serde(default)]
    refresh_token_expires_in: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Why a token request failed, before it is mapped onto [`AuthError`] by the
/// grant that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenFailure {
    /// `invalid_grant`: the code or refresh token is no longer accepted.
    InvalidGrant(String),
    /// Any other 4xx answer.
    Rejected(String),
    /// 5xx, transport failure or an unreadable success body.
    Unavailable(String),
}

impl TokenFailure {
    pub fn for_exchange(self) -> AuthError {
        match self {
            TokenFailure::InvalidGrant(msg) | TokenFailure::Rejected(msg) => AuthError::ExchangeRejected(msg),
            TokenFailure::Unavailable(msg) => AuthError::Transport(msg),
        }
    }

    pub fn for_refresh(self) -> AuthError {
        match self {
            TokenFailure::InvalidGrant(_) => AuthError::RefreshExpired,
            TokenFailure::Rejected(msg) => AuthError::Misconfigured(msg),
            TokenFailure::Unavailable(msg) => AuthError::Transport(msg),
        }
    }
}

/// POST a form-encoded grant with HTTP Basic client authentication.
pub(crate) async fn request_grant(
    http: &Client,
    token_url: &str,
    client: &ClientCredentials,
    form: &[(&str, &str)],
) -> Result<TokenGrant, TokenFailure> {
    let response = http
        .post(token_url)
        .basic_auth(&client.client_id, Some(client.client_secret.expose()))
        .form(form)
        .send()
        .await
        .map_err(|e| TokenFailure::Unavailable(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| TokenFailure::Unavailable(e.to_string()))?;

    if status.is_success() {
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| TokenFailure::Unavailable(format!("unreadable token response: {e}")))?;
        return Ok(TokenGrant {
            access_token: token.access_token.into(),
            refresh_token: token.refresh_token.map(Into::into),
            expires_in: TokenGrant::seconds(token.expires_in),
            refresh_token_expires_in: token.refresh_token_expires_in.map(TokenGrant::seconds),
        });
    }

    let error: TokenErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let message = match (&error.error, &error.error_description) {
        (Some(code), Some(description)) => format!("{code}: {description}"),
        (Some(code), None) => code.clone(),
        _ => format!("token endpoint answered HTTP {}", status.as_u16()),
    };
    tracing::warn!(status = status.as_u16(), error = %message, "token request failed");

    if status.is_server_error() {
        Err(TokenFailure::Unavailable(message))
    } else if error.error.as_deref() == Some("invalid_grant") {
        Err(TokenFailure::InvalidGrant(message))
    } else {
        Err(TokenFailure::Rejected(message))
    }
}
