//! Paystack checkout, verification, and webhook handlers.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use mongodb::bson::{doc, to_bson, DateTime};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use crate::handlers::users::UserResponse;
use crate::middleware::AuthUser;
use crate::models::{Transaction, TransactionStatus};
use crate::services::billing::{finalize_payment, ReconcileOutcome};
use crate::utils;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub plan_id: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Start a plan purchase: record a PENDING transaction and hand the caller
/// Paystack's checkout URL.
pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let user = state
        .store
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let plan = state
        .store
        .find_plan(&payload.plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Plan not found")))?;

    if !plan.is_active || plan.amount <= 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Plan is not purchasable"
        )));
    }

    let reference = utils::new_payment_reference();
    let transaction =
        Transaction::pending(&reference, &user.id, &plan.id, plan.amount, &plan.currency);
    state
        .store
        .transactions()
        .insert_one(&transaction, None)
        .await?;

    tracing::info!(
        user_id = %user.id,
        plan_id = %plan.id,
        reference = %reference,
        amount = plan.amount,
        "Initializing Paystack checkout"
    );

    let callback_url = format!("{}/billing", state.config.app.frontend_url);
    let authorization = state
        .paystack
        .initialize_transaction(
            &user.email,
            plan.amount,
            &plan.currency,
            &reference,
            Some(&callback_url),
        )
        .await
        .map_err(|e| {
            tracing::error!(reference = %reference, error = %e, "Paystack initialize failed");
            AppError::BadGateway("Payment provider unavailable".to_string())
        });

    let authorization = match authorization {
        Ok(a) => a,
        Err(e) => {
            // The checkout never reached the provider; close the record.
            let update = doc! { "$set": {
                "status": to_bson(&TransactionStatus::Failed)
                    .map_err(|e| AppError::InternalError(e.into()))?,
                "updated_at": DateTime::now(),
            }};
            state
                .store
                .transactions()
                .update_one(doc! { "_id": &transaction.id }, update, None)
                .await
                .ok();
            return Err(e);
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            authorization_url: authorization.authorization_url,
            access_code: authorization.access_code,
            reference,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub reference: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub reference: String,
    pub status: TransactionStatus,
    pub message: String,
    pub user: UserResponse,
}

/// Confirm a checkout with Paystack's verify endpoint and reconcile it.
pub async fn verify(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, AppError> {
    let transaction = state
        .store
        .find_transaction_by_reference(&payload.reference)
        .await?
        .filter(|t| t.user_id == claims.sub)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Transaction not found")))?;

    let charge = state
        .paystack
        .verify_transaction(&payload.reference)
        .await
        .map_err(|e| {
            tracing::error!(reference = %payload.reference, error = %e, "Paystack verify failed");
            AppError::BadGateway("Payment provider unavailable".to_string())
        })?;

    let outcome = finalize_payment(&state.store, &transaction.reference, &charge).await?;

    let message = match &outcome {
        ReconcileOutcome::Applied => "Payment verified and plan applied".to_string(),
        ReconcileOutcome::AlreadyProcessed => "Payment was already processed".to_string(),
        ReconcileOutcome::MarkedFailed { reason } => {
            format!("Payment could not be honored: {}", reason)
        }
        ReconcileOutcome::UnknownReference => "Transaction not found".to_string(),
    };

    let refreshed = state
        .store
        .find_transaction_by_reference(&payload.reference)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Transaction not found")))?;
    let user = state
        .store
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok(Json(VerifyResponse {
        reference: refreshed.reference.clone(),
        status: refreshed.status,
        message,
        user: UserResponse::from(user),
    }))
}

/// Paystack webhook: HMAC-SHA512 signature over the raw body, then
/// `charge.success` reconciliation. Handled events are always acknowledged
/// with 200 so Paystack stops redelivering.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, AppError> {
    let signature = headers
        .get("x-paystack-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing x-paystack-signature header");
            AppError::Unauthorized(anyhow::anyhow!("Missing webhook signature"))
        })?;

    let is_valid = state
        .paystack
        .verify_webhook_signature(&body, signature)
        .map_err(|e| {
            tracing::error!(error = %e, "Webhook signature verification error");
            AppError::InternalError(anyhow::anyhow!("Webhook verification failed"))
        })?;

    if !is_valid {
        tracing::warn!("Invalid webhook signature");
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Invalid webhook signature"
        )));
    }

    let event = state.paystack.parse_webhook_event(&body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse webhook event");
        AppError::BadRequest(anyhow::anyhow!("Invalid webhook payload"))
    })?;

    tracing::info!(event_type = %event.event, reference = %event.data.reference, "Processing Paystack webhook");

    match event.event.as_str() {
        "charge.success" => {
            match finalize_payment(&state.store, &event.data.reference, &event.data).await {
                Ok(outcome) => {
                    tracing::info!(
                        reference = %event.data.reference,
                        outcome = ?outcome,
                        "Webhook reconciliation finished"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        reference = %event.data.reference,
                        error = %e,
                        "Webhook reconciliation failed"
                    );
                    return Err(e);
                }
            }
        }
        _ => {
            tracing::debug!(event_type = %event.event, "Unhandled webhook event type");
        }
    }

    Ok(StatusCode::OK)
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub reference: String,
    pub plan_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub channel: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            reference: t.reference,
            plan_id: t.plan_id,
            amount: t.amount,
            currency: t.currency,
            status: t.status,
            channel: t.channel,
            created_at: t.created_at.to_string(),
            updated_at: t.updated_at.to_string(),
        }
    }
}

pub async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let transactions = state.store.list_transactions_for(&claims.sub).await?;
    Ok(Json(
        transactions
            .into_iter()
            .map(TransactionResponse::from)
            .collect(),
    ))
}
