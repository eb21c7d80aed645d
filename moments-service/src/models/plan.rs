//! Plan and plan-feature models.
//!
//! A plan is a purchasable tier; its entitlements are defined by the
//! `PlanFeature` rows attached to it, which override the tier's baked-in
//! defaults (see `services::entitlements`).

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanTier {
    Free,
    Standard,
    Premium,
    Pro,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "FREE",
            PlanTier::Standard => "STANDARD",
            PlanTier::Premium => "PREMIUM",
            PlanTier::Pro => "PRO",
        }
    }
}

/// How a plan entitles event creation: a consumable credit balance, or a
/// time-boxed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    Credit,
    Subscription,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Plan {
    #[serde(rename = "_id")]
    pub id: String,
    pub tier: PlanTier,
    pub name: String,
    pub description: Option<String>,
    /// Price in the smallest currency unit (kobo for NGN).
    pub amount: i64,
    pub currency: String,
    pub plan_type: PlanType,
    /// Credits granted per purchase; meaningful for `PlanType::Credit`.
    pub credits: i64,
    /// Subscription length; meaningful for `PlanType::Subscription`.
    pub duration_days: i64,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Plan {
    pub fn new(
        tier: PlanTier,
        name: &str,
        amount: i64,
        plan_type: PlanType,
        credits: i64,
        duration_days: i64,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tier,
            name: name.to_string(),
            description: None,
            amount,
            currency: "NGN".to_string(),
            plan_type,
            credits,
            duration_days,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Entitlement keys a `PlanFeature` row can set.
///
/// `Unknown` absorbs rows written by a newer catalog revision; the
/// entitlement application routine skips them with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureKey {
    MaxEvents,
    StorageLimitMb,
    UploadCap,
    RetentionDays,
    Watermark,
    Analytics,
    #[serde(other)]
    Unknown,
}

/// One (plan, feature) entitlement row.
///
/// Numeric keys take their value from `limit` when `enabled`; flag keys use
/// `enabled` itself.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlanFeature {
    #[serde(rename = "_id")]
    pub id: String,
    pub plan_id: String,
    pub key: FeatureKey,
    pub enabled: bool,
    pub limit: Option<i64>,
}

impl PlanFeature {
    pub fn flag(plan_id: &str, key: FeatureKey, enabled: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            plan_id: plan_id.to_string(),
            key,
            enabled,
            limit: None,
        }
    }

    pub fn limit(plan_id: &str, key: FeatureKey, limit: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            plan_id: plan_id.to_string(),
            key,
            enabled: true,
            limit: Some(limit),
        }
    }
}
