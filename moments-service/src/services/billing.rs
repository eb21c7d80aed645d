//! Payment reconciliation.
//!
//! Both the verify endpoint and the Paystack webhook funnel into
//! `finalize_payment`: it compares the provider-reported charge against the
//! local transaction, and on success flips the transaction and activates the
//! purchased plan inside one MongoDB transaction. Reconciliation is
//! idempotent per reference.

use mongodb::bson::{doc, to_bson, DateTime};
use service_core::error::AppError;

use super::database::Store;
use super::entitlements;
use super::paystack::Charge;
use crate::models::{Transaction, TransactionStatus};

#[derive(Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The plan was applied to the user and the transaction marked SUCCESS.
    Applied,
    /// The transaction was already SUCCESS; nothing was touched.
    AlreadyProcessed,
    /// No transaction carries this reference.
    UnknownReference,
    /// The charge could not be honored; the transaction is now FAILED.
    MarkedFailed { reason: String },
}

#[derive(Debug, PartialEq, Eq)]
enum Decision {
    Apply,
    Skip,
    Fail(String),
}

/// Pure reconciliation decision for a known transaction.
fn decide(tx: &Transaction, charge: &Charge) -> Decision {
    if tx.status == TransactionStatus::Success {
        return Decision::Skip;
    }
    if charge.status != "success" {
        return Decision::Fail(format!("provider reported status '{}'", charge.status));
    }
    if charge.amount != tx.amount || !charge.currency.eq_ignore_ascii_case(&tx.currency) {
        return Decision::Fail(format!(
            "amount mismatch: expected {} {}, provider reported {} {}",
            tx.amount, tx.currency, charge.amount, charge.currency
        ));
    }
    Decision::Apply
}

pub async fn finalize_payment(
    store: &Store,
    reference: &str,
    charge: &Charge,
) -> Result<ReconcileOutcome, AppError> {
    let Some(tx) = store.find_transaction_by_reference(reference).await? else {
        tracing::warn!(reference = %reference, "Reconciliation for unknown reference");
        return Ok(ReconcileOutcome::UnknownReference);
    };

    match decide(&tx, charge) {
        Decision::Skip => {
            tracing::info!(reference = %reference, "Transaction already reconciled");
            Ok(ReconcileOutcome::AlreadyProcessed)
        }
        Decision::Fail(reason) => {
            store
                .transactions()
                .update_one(
                    doc! { "_id": &tx.id },
                    doc! { "$set": {
                        "status": to_bson(&TransactionStatus::Failed)
                            .map_err(|e| AppError::InternalError(e.into()))?,
                        "provider_transaction_id": charge.id,
                        "updated_at": DateTime::now(),
                    }},
                    None,
                )
                .await?;

            metrics::counter!("payments_reconciled_total", &[("outcome", "failed")])
                .increment(1);
            tracing::warn!(reference = %reference, reason = %reason, "Transaction marked FAILED");
            Ok(ReconcileOutcome::MarkedFailed { reason })
        }
        Decision::Apply => {
            let user = store
                .find_user(&tx.user_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Transaction user not found")))?;
            let plan = store
                .find_plan(&tx.plan_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Transaction plan not found")))?;
            let features = store.features_for_plan(&plan.id).await?;

            let now = DateTime::now();
            let success_update = doc! { "$set": {
                "status": to_bson(&TransactionStatus::Success)
                    .map_err(|e| AppError::InternalError(e.into()))?,
                "provider_transaction_id": charge.id,
                "channel": to_bson(&charge.channel)
                    .map_err(|e| AppError::InternalError(e.into()))?,
                "updated_at": now,
            }};

            let mut session = store.start_transaction().await?;

            let result = async {
                store
                    .transactions()
                    .update_one_with_session(
                        doc! { "_id": &tx.id },
                        success_update,
                        None,
                        &mut session,
                    )
                    .await?;
                entitlements::activate_plan(store, &mut session, &user, &plan, &features, now)
                    .await?;
                Ok::<(), AppError>(())
            }
            .await;

            match result {
                Ok(()) => session.commit_transaction().await?,
                Err(e) => {
                    session.abort_transaction().await.ok();
                    return Err(e);
                }
            }

            metrics::counter!("payments_reconciled_total", &[("outcome", "applied")])
                .increment(1);
            tracing::info!(
                reference = %reference,
                user_id = %tx.user_id,
                plan_id = %tx.plan_id,
                amount = tx.amount,
                "Payment reconciled and plan applied"
            );
            Ok(ReconcileOutcome::Applied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_tx() -> Transaction {
        Transaction::pending("ms_ref", "user_1", "plan_1", 250_000, "NGN")
    }

    fn charge(status: &str, amount: i64, currency: &str) -> Charge {
        Charge {
            id: 42,
            reference: "ms_ref".to_string(),
            status: status.to_string(),
            amount,
            currency: currency.to_string(),
            channel: Some("card".to_string()),
            paid_at: None,
        }
    }

    #[test]
    fn successful_charge_applies() {
        let tx = pending_tx();
        assert_eq!(decide(&tx, &charge("success", 250_000, "NGN")), Decision::Apply);
    }

    #[test]
    fn already_successful_transaction_is_skipped() {
        let mut tx = pending_tx();
        tx.status = TransactionStatus::Success;
        // Even a mismatching charge must not disturb a settled transaction.
        assert_eq!(decide(&tx, &charge("success", 1, "NGN")), Decision::Skip);
    }

    #[test]
    fn non_success_status_fails() {
        let tx = pending_tx();
        match decide(&tx, &charge("abandoned", 250_000, "NGN")) {
            Decision::Fail(reason) => assert!(reason.contains("abandoned")),
            other => panic!("expected Fail, got {:?}", other),
        }
    }

    #[test]
    fn amount_mismatch_fails() {
        let tx = pending_tx();
        match decide(&tx, &charge("success", 100, "NGN")) {
            Decision::Fail(reason) => assert!(reason.contains("amount mismatch")),
            other => panic!("expected Fail, got {:?}", other),
        }
    }

    #[test]
    fn currency_mismatch_fails() {
        let tx = pending_tx();
        match decide(&tx, &charge("success", 250_000, "USD")) {
            Decision::Fail(reason) => assert!(reason.contains("amount mismatch")),
            other => panic!("expected Fail, got {:?}", other),
        }
    }

    #[test]
    fn failed_transaction_can_retry() {
        // A FAILED transaction is not terminal for decide(): a later genuine
        // success webhook for the same reference may still apply.
        let mut tx = pending_tx();
        tx.status = TransactionStatus::Failed;
        assert_eq!(decide(&tx, &charge("success", 250_000, "NGN")), Decision::Apply);
    }
}
