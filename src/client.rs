//! Transport to the analysis service.

use crate::config::{ConfigError, Endpoint, HeatmapConfig};
use crate::error::AnalysisError;
use crate::token::AnalysisRequest;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Something that can turn `{text}` into a raw token-array response body.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Endpoint label used in logs.
    fn endpoint(&self) -> &str;

    /// Performs exactly one request. A non-2xx status is an error; the body of
    /// a successful response is returned untouched.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<Vec<u8>, AnalysisError>;
}

#[async_trait]
impl<B: AnalysisBackend + ?Sized> AnalysisBackend for std::sync::Arc<B> {
    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<Vec<u8>, AnalysisError> {
        (**self).analyze(request).await
    }
}

/// `POST <endpoint>` with a JSON body over reqwest.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: Endpoint,
}

impl HttpBackend {
    pub fn new(config: &HeatmapConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: config.build_client()?,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn with_client(client: Client, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<Vec<u8>, AnalysisError> {
        let endpoint = self.endpoint.as_str();
        debug!(endpoint, chars = request.text.chars().count(), "dispatching analysis request");

        let response = self
            .client
            .post(self.endpoint.url().clone())
            .json(request)
            .send()
            .await
            .map_err(|err| AnalysisError::transport(endpoint, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    debug!(endpoint, status = status.as_u16(), error = %err, "failed to read error body");
                    String::new()
                }
            };
            return Err(AnalysisError::http_status(endpoint, status.as_u16(), &body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| AnalysisError::transport(endpoint, err))?;
        debug!(endpoint, status = status.as_u16(), bytes = body.len(), "analysis response received");
        Ok(body.to_vec())
    }
}
