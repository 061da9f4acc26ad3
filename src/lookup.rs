use crate::model::WordRecord;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";

/// Identifies one issued fetch so that only the newest response is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub enum LookupError {
    Transport(reqwest::Error),
    Status(u16),
    Decode(serde_json::Error),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Transport(err) => write!(f, "transport error: {err}"),
            LookupError::Status(code) => write!(f, "lookup service answered with status {code}"),
            LookupError::Decode(err) => write!(f, "malformed response: {err}"),
        }
    }
}

impl std::error::Error for LookupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LookupError::Transport(err) => Some(err),
            LookupError::Status(_) => None,
            LookupError::Decode(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(value: reqwest::Error) -> Self {
        LookupError::Transport(value)
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(value: serde_json::Error) -> Self {
        LookupError::Decode(value)
    }
}

/// The remote word service: suggestions for a prefix and full word records.
pub trait LookupService: Send + Sync + 'static {
    fn suggest(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<String>, LookupError>> + Send;

    fn word(&self, word: &str) -> impl Future<Output = Result<WordRecord, LookupError>> + Send;
}

#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            user_agent: concat!("uttale-rs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// `LookupService` backed by the HTTP API.
#[derive(Clone)]
pub struct HttpLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLookup {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, LookupError> {
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl LookupService for HttpLookup {
    async fn suggest(&self, query: &str) -> Result<Vec<String>, LookupError> {
        let url = format!("{}/api/suggest?q={}", self.base_url, encode_component(query));
        self.get_json(url).await
    }

    async fn word(&self, word: &str) -> Result<WordRecord, LookupError> {
        let url = format!("{}/api/word/{}", self.base_url, encode_component(word));
        self.get_json(url).await
    }
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}
