use reqwest::{Client, Url};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/analyze";
pub const ANALYZE_PATH: &str = "/analyze";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("endpoint {0:?} is not an http(s) URL")]
    InvalidEndpoint(String),

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Where analysis requests are POSTed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(Url);

impl Endpoint {
    /// Uses `url` exactly as given.
    pub fn fixed(url: &str) -> Result<Self, ConfigError> {
        parse_http_url(url).map(Endpoint)
    }

    /// Resolves the analysis path against the origin of `base`, the way a page
    /// served by the backend itself would.
    pub fn same_origin(base: &str) -> Result<Self, ConfigError> {
        let base = parse_http_url(base)?;
        base.join(ANALYZE_PATH)
            .map(Endpoint)
            .map_err(|_| ConfigError::InvalidEndpoint(base.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint(Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_http_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidEndpoint(value.to_string());
    let url = Url::parse(value.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url)
}

/// Client-side settings for talking to the analysis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapConfig {
    pub endpoint: Endpoint,
    /// `None` leaves failure signalling to the transport.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            timeout: None,
            user_agent: format!("wordheat-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HeatmapConfig {
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        self.timeout = Some(timeout);
        Ok(self)
    }

    pub fn build_client(&self) -> Result<Client, ConfigError> {
        let mut builder = Client::builder().user_agent(self.user_agent.clone());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|err| ConfigError::Client(err.to_string()))
    }
}
