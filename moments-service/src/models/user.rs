//! Organizer accounts.
//!
//! The entitlement fields are flattened onto the user document and mirror the
//! currently active plan's features; they are rewritten whenever a plan
//! activates (see `services::entitlements`).

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::entitlements::Entitlements;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    None,
    Active,
    Expired,
}

/// One entry of the user's plan history. The open entry (no
/// `deactivated_at`) is always the active plan.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlanActivation {
    pub plan_id: String,
    pub activated_at: DateTime,
    pub deactivated_at: Option<DateTime>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub google_id: Option<String>,
    pub picture: Option<String>,
    pub credits: i64,
    pub active_plan_id: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub subscription_expires_at: Option<DateTime>,
    pub plan_history: Vec<PlanActivation>,
    // Flattened entitlements of the active plan.
    pub max_events: i32,
    pub storage_limit_bytes: i64,
    pub upload_cap_per_event: i32,
    pub retention_days: i32,
    pub watermark_enabled: bool,
    pub analytics_enabled: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    /// Create a user already placed on a plan (the seeded FREE tier for
    /// sign-ups), with that plan's entitlements applied and its starting
    /// credit balance granted.
    pub fn new(
        email: String,
        name: Option<String>,
        plan_id: &str,
        starting_credits: i64,
        entitlements: &Entitlements,
    ) -> Self {
        let now = DateTime::now();
        let mut user = Self {
            id: Uuid::new_v4().to_string(),
            email,
            name,
            google_id: None,
            picture: None,
            credits: starting_credits,
            active_plan_id: Some(plan_id.to_string()),
            subscription_status: SubscriptionStatus::None,
            subscription_expires_at: None,
            plan_history: vec![PlanActivation {
                plan_id: plan_id.to_string(),
                activated_at: now,
                deactivated_at: None,
            }],
            max_events: 0,
            storage_limit_bytes: 0,
            upload_cap_per_event: 0,
            retention_days: 0,
            watermark_enabled: true,
            analytics_enabled: false,
            created_at: now,
            updated_at: now,
        };
        user.apply_entitlements(entitlements);
        user
    }

    pub fn apply_entitlements(&mut self, ent: &Entitlements) {
        self.max_events = ent.max_events;
        self.storage_limit_bytes = ent.storage_limit_bytes;
        self.upload_cap_per_event = ent.upload_cap_per_event;
        self.retention_days = ent.retention_days;
        self.watermark_enabled = ent.watermark_enabled;
        self.analytics_enabled = ent.analytics_enabled;
    }

    pub fn has_active_subscription(&self, now: DateTime) -> bool {
        self.subscription_status == SubscriptionStatus::Active
            && self
                .subscription_expires_at
                .map(|exp| exp > now)
                .unwrap_or(false)
    }
}
