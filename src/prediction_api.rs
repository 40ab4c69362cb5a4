// Client for the external price-prediction service (POST /predict).

use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode, header::ACCEPT};
use thiserror::Error;

use crate::models::{FormChoice, NormalizedPredictionRequest, PredictionResponse};

/// Every way a single prediction call can fail. All of them end up as a
/// Failure outcome; the variants only matter for logging.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("prediction service unreachable: {0}")]
    Network(#[source] reqwest::Error),
    #[error("prediction service did not answer within {0:?}")]
    Timeout(Duration),
    #[error("prediction service responded with status {status}")]
    Service { status: StatusCode },
    #[error("prediction service returned an unusable body: {0}")]
    MalformedResponse(String),
}

/// Anything able to price a normalized request.
pub trait PredictionService: Send + Sync {
    fn predict(
        &self,
        request: &NormalizedPredictionRequest,
    ) -> impl Future<Output = Result<f64, PredictionError>> + Send;
}

// Builds the shared HTTP client, routing through a proxy when one is configured.
pub fn build_http_client(proxy_url: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(proxy_url) = proxy_url.filter(|url| !url.is_empty()) {
        let proxy = reqwest::Proxy::all(proxy_url)
            .with_context(|| format!("Invalid proxy URL '{}'", proxy_url))?;
        builder = builder.proxy(proxy);
        tracing::info!("Outbound prediction requests will use the configured proxy.");
    }
    builder.build().context("Failed to build reqwest client")
}

/// HTTP implementation of [`PredictionService`]. Cheap to clone: the
/// underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http_client: Arc<Client>,
    endpoint: String,
    timeout: Option<Duration>,
}

impl PredictionClient {
    pub fn new(http_client: Arc<Client>, endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, error: reqwest::Error) -> PredictionError {
        match self.timeout {
            Some(limit) if error.is_timeout() => PredictionError::Timeout(limit),
            _ => PredictionError::Network(error),
        }
    }
}

impl PredictionService for PredictionClient {
    fn predict(
        &self,
        request: &NormalizedPredictionRequest,
    ) -> impl Future<Output = Result<f64, PredictionError>> + Send {
        async move {
            tracing::debug!("Sending prediction request to {}: {:?}", self.endpoint, request);

            let mut builder = self
                .http_client
                .post(&self.endpoint)
                .header(ACCEPT, "application/json")
                .json(request);
            if let Some(limit) = self.timeout {
                builder = builder.timeout(limit);
            }

            let response = builder.send().await.map_err(|e| self.transport_error(e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(PredictionError::Service { status });
            }

            let body = response.text().await.map_err(|e| self.transport_error(e))?;
            let parsed: PredictionResponse = serde_json::from_str(&body)
                .map_err(|e| PredictionError::MalformedResponse(e.to_string()))?;

            tracing::debug!(
                "Prediction service priced {} {} at {}",
                request.brand.value(),
                request.model,
                parsed.predicted_price
            );
            Ok(parsed.predicted_price)
        }
    }
}
