use crate::core::provider::SettlementHook;
use crate::core::transaction::{Transaction, TransactionStatus};
use crate::providers::USER_AGENT;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Tells the payment's webhook about its final status.
pub struct WebhookNotifier {
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct WebhookBody {
    status: &'static str,
}

fn webhook_status(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Pending => "Waiting",
        TransactionStatus::Confirmed => "Confirmed",
        TransactionStatus::Cancelled => "Cancelled",
    }
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SettlementHook for WebhookNotifier {
    #[instrument(name = "WebhookNotify", skip_all, fields(transaction = %transaction.id))]
    async fn on_settled(&self, transaction: &Transaction) -> Result<()> {
        let Some(webhook) = transaction
            .callback
            .as_ref()
            .and_then(|c| c.webhook.as_ref())
        else {
            return Ok(());
        };

        let mut request = self.client.patch(&webhook.url).json(&WebhookBody {
            status: webhook_status(transaction.status),
        });
        for (name, value) in &webhook.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Webhook call to {} failed", webhook.url))?;
        debug!(url = %webhook.url, "Delivered webhook");
        Ok(())
    }
}
