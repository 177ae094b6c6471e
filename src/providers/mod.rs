pub mod gateway;
pub mod util;
pub mod webhook;

pub use gateway::GatewayProvider;
pub use webhook::WebhookNotifier;

pub(crate) const USER_AGENT: &str = "paysync/1.0";
