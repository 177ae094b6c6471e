//! HTTP surface: payment intake, the provider's status callback and lookups.

use crate::core::error::LedgerError;
use crate::core::money::Amount;
use crate::core::provider::ProviderStatus;
use crate::core::transaction::{Callback, Transaction, TransactionKind, TransactionStatus, Webhook};
use crate::ledger::{Ledger, PaymentRequest};
use anyhow::Context;
use axum::{
    Json, Router, async_trait,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

/// Envelope of every JSON response.
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// JSON body extractor whose rejections use the [`ApiResponse`] envelope.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                Err((rejection.status(), Json(ApiResponse::err(rejection.body_text()))).into_response())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewPayment {
    #[serde(default)]
    pub sender: Option<Uuid>,
    pub recipient: Uuid,
    pub amount: Decimal,
    #[serde(default = "default_kind")]
    pub kind: TransactionKind,
    /// Defaults to the bank's payment deadline.
    #[serde(default)]
    pub pay_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub provider_ref: Option<String>,
    #[serde(default)]
    pub webhook: Option<Webhook>,
}

fn default_kind() -> TransactionKind {
    TransactionKind::Purchase
}

#[derive(Debug, Deserialize)]
pub struct PayPayment {
    pub client: Uuid,
    pub sender: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ProviderCallback {
    pub reference: String,
    pub status: ProviderStatus,
}

#[derive(Debug, Serialize)]
struct CallbackResult {
    transaction: Uuid,
    status: TransactionStatus,
    changed: bool,
}

pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LedgerError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::InvalidTransition { .. } => StatusCode::CONFLICT,
            e if e.is_rejection() => StatusCode::UNPROCESSABLE_ENTITY,
            e => {
                error!("Request failed: {e:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ApiResponse::err(self.0.to_string()))).into_response()
    }
}

pub fn router(ledger: Arc<Ledger>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/payments", post(create_payment))
        .route("/payments/:id/pay", post(pay_payment))
        .route("/callbacks/provider", post(provider_callback))
        .route("/transactions/:id", get(get_transaction))
        .with_state(AppState { ledger })
}

/// Serves the router on `bind` until `shutdown` resolves.
pub async fn serve(
    ledger: Arc<Ledger>,
    bind: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(addr = %listener.local_addr()?, "Listening for provider callbacks");
    axum::serve(listener, router(ledger))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

async fn health() -> &'static str {
    "ok"
}

async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Transaction>>, ApiError> {
    let tx = state.ledger.transaction(id).await?;
    Ok(Json(ApiResponse::ok(tx)))
}

/// POST /payments
async fn create_payment(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewPayment>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let request = PaymentRequest {
        sender: body.sender,
        recipient: body.recipient,
        amount: Amount::new(body.amount)?,
        kind: body.kind,
        pay_date: body
            .pay_date
            .unwrap_or_else(|| state.ledger.bank_pay_date(now)),
        provider_ref: body.provider_ref,
        callback: body.webhook.map(|webhook| Callback {
            webhook: Some(webhook),
            link: None,
        }),
    };
    let tx = state.ledger.create_payment(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(tx))).into_response())
}

/// POST /payments/:id/pay
async fn pay_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<PayPayment>,
) -> Result<Json<ApiResponse<Transaction>>, ApiError> {
    let settlement = state.ledger.pay(body.client, id, body.sender).await?;
    Ok(Json(ApiResponse::ok(settlement.transaction)))
}

/// POST /callbacks/provider
async fn provider_callback(
    State(state): State<AppState>,
    ApiJson(callback): ApiJson<ProviderCallback>,
) -> Result<Response, ApiError> {
    let Some(tx) = state.ledger.find_by_provider_ref(&callback.reference).await? else {
        warn!(reference = %callback.reference, "Callback for unknown payment");
        return Ok((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(format!(
                "No payment with reference {}",
                callback.reference
            ))),
        )
            .into_response());
    };

    let Some(target) = callback.status.settlement() else {
        info!(transaction = %tx.id, status = %callback.status, "Ignoring non-final callback status");
        let result = CallbackResult {
            transaction: tx.id,
            status: tx.status,
            changed: false,
        };
        return Ok((StatusCode::ACCEPTED, Json(ApiResponse::ok(result))).into_response());
    };

    let settlement = state.ledger.apply_status(tx.id, target).await?;
    info!(
        transaction = %tx.id,
        status = %settlement.transaction.status,
        changed = settlement.changed,
        "Applied provider callback"
    );
    let result = CallbackResult {
        transaction: tx.id,
        status: settlement.transaction.status,
        changed: settlement.changed,
    };
    Ok((StatusCode::OK, Json(ApiResponse::ok(result))).into_response())
}
