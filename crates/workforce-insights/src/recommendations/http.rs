use super::domain::GatewayFailure;
use super::gateway::{GatewayRequest, RecommendationProvider};
use async_trait::async_trait;
use tracing::debug;

/// Posts each [`GatewayRequest`] as JSON to a fixed endpoint and returns the body text.
pub struct HttpRecommendationProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpRecommendationProvider {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RecommendationProvider for HttpRecommendationProvider {
    async fn send(&self, request: &GatewayRequest) -> Result<String, GatewayFailure> {
        debug!(endpoint = %self.endpoint, kind = ?request.kind, "recommendation request");

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.text().await.map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> GatewayFailure {
    GatewayFailure::Transport(err.to_string())
}
