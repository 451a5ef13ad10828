// Token authentication
//
// OAuth2-style token endpoint: the resource owner password grant for
// logging in and the refresh token grant for renewing an expired access
// token. Obtained pairs are installed on the client and attached to every
// subsequent request as a bearer token.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::error::Error;

/// Route at which token negotiation takes place.
pub const TOKEN_PATH: &str = "/oauth/token";

/// Username/password pair for the password grant.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Access token plus the refresh token that can renew it.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: SecretString,
    pub refresh: Option<SecretString>,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: SecretString::from(access.into()),
            refresh: refresh.map(SecretString::from),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorBody {
    error: String,
    error_description: Option<String>,
}

impl ApiClient {
    /// Exchange username and password for a token pair and install it.
    pub async fn login(&self, credentials: &Credentials) -> Result<Arc<TokenPair>, Error> {
        debug!(username = %credentials.username, "requesting token with password grant");

        let body = json!({
            "grant_type": "password",
            "username": credentials.username,
            "password": credentials.password.expose_secret(),
        });
        let pair = Arc::new(self.token_request(&body).await?);
        self.install_tokens(Arc::clone(&pair));
        Ok(pair)
    }

    /// Exchange a refresh token for a new token pair and install it.
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<Arc<TokenPair>, Error> {
        debug!("requesting token with refresh grant");

        let body = json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token.expose_secret(),
        });
        let pair = Arc::new(self.token_request(&body).await?);
        self.install_tokens(Arc::clone(&pair));
        Ok(pair)
    }

    /// Renew the token pair after `stale` was answered with 401.
    ///
    /// Negotiations are serialized. A caller that waited on another
    /// negotiation gets the pair it produced instead of starting a new one.
    pub(crate) async fn renegotiate(
        &self,
        stale: Option<Arc<TokenPair>>,
    ) -> Result<Arc<TokenPair>, Error> {
        let _negotiating = self.negotiation.lock().await;

        let current = self.current_tokens();
        if let Some(current) = &current {
            let unchanged = stale.as_ref().is_some_and(|s| Arc::ptr_eq(s, current));
            if !unchanged {
                debug!("token renewed by a concurrent request");
                return Ok(Arc::clone(current));
            }
        }

        let Some(refresh_token) = current.and_then(|pair| pair.refresh.clone()) else {
            self.clear_tokens();
            return Err(Error::LoginRequired);
        };

        match self.refresh(&refresh_token).await {
            Ok(pair) => Ok(pair),
            Err(err) => {
                warn!(error = %err, "refresh token was not accepted");
                self.clear_tokens();
                Err(Error::LoginRequired)
            }
        }
    }

    async fn token_request(&self, body: &serde_json::Value) -> Result<TokenPair, Error> {
        let url = self.url(TOKEN_PATH)?;
        let resp = self
            .http()
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            let parsed: Option<TokenErrorBody> = serde_json::from_str(&text).ok();
            return Err(match parsed {
                Some(body) => Error::TokenRejected {
                    status: status.as_u16(),
                    error: body.error,
                    description: body.error_description,
                },
                None => Error::TokenRejected {
                    status: status.as_u16(),
                    error: "unknown_error".into(),
                    description: (!text.is_empty()).then_some(text),
                },
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&text).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: text.clone(),
            })?;
        Ok(TokenPair::new(token.access_token, token.refresh_token))
    }
}
