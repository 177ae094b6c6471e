use crate::core::config::ProviderConfig;
use crate::core::provider::{PaymentProvider, ProviderStatus};
use crate::providers::USER_AGENT;
use crate::providers::util::with_retry;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Client for the payment gateway's status endpoint.
pub struct GatewayProvider {
    base_url: Url,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    reference: Option<String>,
    status: ProviderStatus,
}

impl GatewayProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid provider base URL: {}", config.base_url))?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            base_url,
            client,
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    fn status_url(&self, reference: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Provider base URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .push("payments")
            .push(reference);
        Ok(url)
    }
}

#[async_trait]
impl PaymentProvider for GatewayProvider {
    #[instrument(name = "GatewayStatusFetch", skip(self), fields(reference = %reference))]
    async fn fetch_status(&self, reference: &str) -> Result<ProviderStatus> {
        let url = self.status_url(reference)?;
        debug!("Requesting payment status from {}", url);

        let response = with_retry(
            || async {
                self.client
                    .get(url.clone())
                    .send()
                    .await?
                    .error_for_status()
            },
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .with_context(|| format!("Failed to fetch status for payment: {reference}"))?;

        let body: StatusResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse status response for payment: {reference}"))?;
        if let Some(echoed) = body.reference.as_deref()
            && echoed != reference
        {
            return Err(anyhow!(
                "Provider answered for payment {echoed} instead of {reference}"
            ));
        }

        debug!(status = %body.status, "Received payment status");
        Ok(body.status)
    }
}
