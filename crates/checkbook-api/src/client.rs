// Checkbook API HTTP client
//
// Wraps `reqwest::Client` with base-URL resolution, bearer injection,
// JSON body handling, and a single transparent re-run after a 401 that
// could be fixed by renewing the access token.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use strum::Display;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::auth::TokenPair;
use crate::error::Error;
use crate::transport::TransportConfig;

/// HTTP methods used by resource actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Raw JSON client for the Checkbook server.
///
/// Paths are resolved against the base URL. All methods return the
/// decoded JSON body, or `Value::Null` for an empty body.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: ArcSwapOption<TokenPair>,
    pub(crate) negotiation: Mutex<()>,
}

impl ApiClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            tokens: ArcSwapOption::empty(),
            negotiation: Mutex::new(()),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Tokens ───────────────────────────────────────────────────────

    /// The token pair currently attached to requests.
    pub fn current_tokens(&self) -> Option<Arc<TokenPair>> {
        self.tokens.load_full()
    }

    /// Install a token pair (e.g. a refresh token restored from the keyring).
    pub fn set_tokens(&self, tokens: TokenPair) {
        self.install_tokens(Arc::new(tokens));
    }

    pub fn clear_tokens(&self) {
        self.tokens.store(None);
    }

    pub(crate) fn install_tokens(&self, tokens: Arc<TokenPair>) {
        self.tokens.store(Some(tokens));
    }

    // ── Requests ─────────────────────────────────────────────────────

    pub async fn get(&self, path: &str) -> Result<Value, Error> {
        self.request(Method::Get, path, None).await
    }

    pub async fn post(&self, path: &str, body: &impl Serialize) -> Result<Value, Error> {
        let body = to_body(body)?;
        self.request(Method::Post, path, Some(&body)).await
    }

    pub async fn put(&self, path: &str, body: &impl Serialize) -> Result<Value, Error> {
        let body = to_body(body)?;
        self.request(Method::Put, path, Some(&body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, Error> {
        self.request(Method::Delete, path, None).await
    }

    /// Send a request, renewing the token and re-running it once on 401.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        let url = self.url(path)?;
        let tokens = self.current_tokens();

        let resp = self.send(method, url.clone(), body, tokens.as_deref()).await?;
        if resp.status() != reqwest::StatusCode::UNAUTHORIZED {
            return parse_body(resp).await;
        }

        debug!("{method} {url} was unauthorized, renewing token");
        let renewed = self.renegotiate(tokens).await?;

        let resp = self.send(method, url, body, Some(renewed.as_ref())).await?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.clear_tokens();
            return Err(Error::LoginRequired);
        }
        parse_body(resp).await
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        tokens: Option<&TokenPair>,
    ) -> Result<reqwest::Response, Error> {
        debug!("{method} {url}");

        let mut req = self.http.request(method.into(), url);
        if let Some(tokens) = tokens {
            req = req.bearer_auth(tokens.access.expose_secret());
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send().await.map_err(Error::Transport)
    }
}

fn to_body(body: &impl Serialize) -> Result<Value, Error> {
    serde_json::to_value(body).map_err(|e| Error::Deserialization {
        message: format!("request body: {e}"),
        body: String::new(),
    })
}

async fn parse_body(resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();
    let text = resp.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        return Err(Error::Http {
            status: status.as_u16(),
            body: text,
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: text,
    })
}
