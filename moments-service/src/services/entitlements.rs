//! Plan entitlement application.
//!
//! A plan's effective entitlements are its tier's defaults overridden by the
//! plan's `PlanFeature` rows. `activate_plan` writes the result onto the user
//! document, closing the previous plan-history entry, and must run inside a
//! caller-held transaction so the plan switch and whatever triggered it
//! (payment reconciliation, sign-up) commit together.

use mongodb::bson::{doc, to_bson, DateTime};
use mongodb::ClientSession;
use service_core::error::AppError;

use super::database::Store;
use crate::models::{
    FeatureKey, Plan, PlanActivation, PlanFeature, PlanTier, PlanType, SubscriptionStatus, User,
};

const MB: i64 = 1024 * 1024;

/// The fixed set of user entitlement fields a plan controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entitlements {
    pub max_events: i32,
    pub storage_limit_bytes: i64,
    pub upload_cap_per_event: i32,
    pub retention_days: i32,
    pub watermark_enabled: bool,
    pub analytics_enabled: bool,
}

impl Entitlements {
    /// Baseline entitlements per tier, used when a plan carries no feature
    /// row for a key.
    pub fn defaults_for(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Free => Self {
                max_events: 1,
                storage_limit_bytes: 200 * MB,
                upload_cap_per_event: 50,
                retention_days: 7,
                watermark_enabled: true,
                analytics_enabled: false,
            },
            PlanTier::Standard => Self {
                max_events: 3,
                storage_limit_bytes: 1024 * MB,
                upload_cap_per_event: 200,
                retention_days: 30,
                watermark_enabled: false,
                analytics_enabled: false,
            },
            PlanTier::Premium => Self {
                max_events: 10,
                storage_limit_bytes: 5 * 1024 * MB,
                upload_cap_per_event: 500,
                retention_days: 90,
                watermark_enabled: false,
                analytics_enabled: true,
            },
            PlanTier::Pro => Self {
                max_events: 50,
                storage_limit_bytes: 20 * 1024 * MB,
                upload_cap_per_event: 2000,
                retention_days: 365,
                watermark_enabled: false,
                analytics_enabled: true,
            },
        }
    }
}

/// Fold a plan's feature rows over its tier defaults.
///
/// Numeric keys take `limit` only when the row is enabled and carries one;
/// flag keys take `enabled` directly. Rows with keys this build does not
/// know are skipped.
pub fn apply_plan_features(plan: &Plan, features: &[PlanFeature]) -> Entitlements {
    let mut ent = Entitlements::defaults_for(plan.tier);

    for feature in features {
        match feature.key {
            FeatureKey::MaxEvents => {
                if feature.enabled {
                    if let Some(limit) = feature.limit {
                        ent.max_events = limit as i32;
                    }
                }
            }
            FeatureKey::StorageLimitMb => {
                if feature.enabled {
                    if let Some(limit) = feature.limit {
                        ent.storage_limit_bytes = limit * MB;
                    }
                }
            }
            FeatureKey::UploadCap => {
                if feature.enabled {
                    if let Some(limit) = feature.limit {
                        ent.upload_cap_per_event = limit as i32;
                    }
                }
            }
            FeatureKey::RetentionDays => {
                if feature.enabled {
                    if let Some(limit) = feature.limit {
                        ent.retention_days = limit as i32;
                    }
                }
            }
            FeatureKey::Watermark => ent.watermark_enabled = feature.enabled,
            FeatureKey::Analytics => ent.analytics_enabled = feature.enabled,
            FeatureKey::Unknown => {
                tracing::warn!(
                    plan_id = %feature.plan_id,
                    feature_id = %feature.id,
                    "Skipping plan feature with unrecognized key"
                );
            }
        }
    }

    ent
}

/// Switch `user` onto `plan` inside the caller's open transaction.
///
/// Closes the open plan-history entry, pushes the new one, grants credits or
/// subscription time per the plan type, and rewrites the flattened
/// entitlement fields.
pub async fn activate_plan(
    store: &Store,
    session: &mut ClientSession,
    user: &User,
    plan: &Plan,
    features: &[PlanFeature],
    now: DateTime,
) -> Result<(), AppError> {
    let ent = apply_plan_features(plan, features);

    let mut history = user.plan_history.clone();
    if let Some(open) = history.iter_mut().find(|h| h.deactivated_at.is_none()) {
        open.deactivated_at = Some(now);
    }
    history.push(PlanActivation {
        plan_id: plan.id.clone(),
        activated_at: now,
        deactivated_at: None,
    });

    let (credits, subscription_status, subscription_expires_at) = match plan.plan_type {
        PlanType::Credit => (user.credits + plan.credits, user.subscription_status, user.subscription_expires_at),
        PlanType::Subscription => {
            let expires_at =
                DateTime::from_millis(now.timestamp_millis() + plan.duration_days * 86_400_000);
            (user.credits, SubscriptionStatus::Active, Some(expires_at))
        }
    };

    let update = doc! {
        "$set": {
            "active_plan_id": &plan.id,
            "credits": credits,
            "subscription_status": to_bson(&subscription_status)
                .map_err(|e| AppError::InternalError(e.into()))?,
            "subscription_expires_at": to_bson(&subscription_expires_at)
                .map_err(|e| AppError::InternalError(e.into()))?,
            "plan_history": to_bson(&history).map_err(|e| AppError::InternalError(e.into()))?,
            "max_events": ent.max_events,
            "storage_limit_bytes": ent.storage_limit_bytes,
            "upload_cap_per_event": ent.upload_cap_per_event,
            "retention_days": ent.retention_days,
            "watermark_enabled": ent.watermark_enabled,
            "analytics_enabled": ent.analytics_enabled,
            "updated_at": now,
        }
    };

    store
        .users()
        .update_one_with_session(doc! { "_id": &user.id }, update, None, session)
        .await?;

    tracing::info!(
        user_id = %user.id,
        plan_id = %plan.id,
        tier = plan.tier.as_str(),
        "Plan activated"
    );

    Ok(())
}
