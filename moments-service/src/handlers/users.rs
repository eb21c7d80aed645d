//! User provisioning and profile handlers.

use axum::{extract::State, http::StatusCode, Json};
use mongodb::bson::{doc, to_bson};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::{PlanTier, SubscriptionStatus, User};
use crate::services::entitlements::apply_plan_features;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 120))]
    pub name: Option<String>,
}

/// Sanitized user view: profile, plan state, and effective entitlements.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub credits: i64,
    pub active_plan_id: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub subscription_expires_at: Option<String>,
    pub max_events: i32,
    pub storage_limit_bytes: i64,
    pub upload_cap_per_event: i32,
    pub retention_days: i32,
    pub watermark_enabled: bool,
    pub analytics_enabled: bool,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            picture: u.picture,
            credits: u.credits,
            active_plan_id: u.active_plan_id,
            subscription_status: u.subscription_status,
            subscription_expires_at: u.subscription_expires_at.map(|d| d.to_string()),
            max_events: u.max_events,
            storage_limit_bytes: u.storage_limit_bytes,
            upload_cap_per_event: u.upload_cap_per_event,
            retention_days: u.retention_days,
            watermark_enabled: u.watermark_enabled,
            analytics_enabled: u.analytics_enabled,
            created_at: u.created_at.to_string(),
        }
    }
}

/// Find a user by email or create one on the seeded FREE plan.
///
/// Shared by first-party sign-up and the Google OAuth callback; never
/// duplicates a user (the email index is unique).
pub(crate) async fn provision_user(
    state: &AppState,
    email: &str,
    name: Option<String>,
    picture: Option<String>,
    google_id: Option<String>,
) -> Result<(User, bool), AppError> {
    if let Some(existing) = state.store.find_user_by_email(email).await? {
        // Attach the Google identity on first social sign-in.
        if google_id.is_some() && existing.google_id.is_none() {
            state
                .store
                .users()
                .update_one(
                    doc! { "_id": &existing.id },
                    doc! { "$set": {
                        "google_id": to_bson(&google_id)
                            .map_err(|e| AppError::InternalError(e.into()))?,
                        "picture": to_bson(&picture.clone().or(existing.picture.clone()))
                            .map_err(|e| AppError::InternalError(e.into()))?,
                    }},
                    None,
                )
                .await?;
        }
        return Ok((existing, false));
    }

    let free_plan = state
        .store
        .plans()
        .find_one(
            doc! {
                "tier": to_bson(&PlanTier::Free).map_err(|e| AppError::InternalError(e.into()))?,
                "is_active": true,
            },
            None,
        )
        .await?
        .ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("FREE plan missing from catalog"))
        })?;
    let features = state.store.features_for_plan(&free_plan.id).await?;
    let entitlements = apply_plan_features(&free_plan, &features);

    let mut user = User::new(
        email.to_string(),
        name,
        &free_plan.id,
        free_plan.credits,
        &entitlements,
    );
    user.google_id = google_id;
    user.picture = picture;

    state.store.users().insert_one(&user, None).await?;

    metrics::counter!("users_created_total").increment(1);
    tracing::info!(user_id = %user.id, email = %user.email, "User provisioned on FREE plan");

    Ok((user, true))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    payload.validate()?;

    let (user, created) = provision_user(&state, &payload.email, payload.name, None, None).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(UserResponse::from(user))))
}

pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .store
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok(Json(UserResponse::from(user)))
}

/// Aggregated usage across the organizer's events.
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub events: usize,
    pub media: i64,
    pub storage_used_bytes: i64,
    pub storage_limit_bytes: i64,
    pub max_events: i32,
}

pub async fn get_usage(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UsageResponse>, AppError> {
    let user = state
        .store
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    if !user.analytics_enabled {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Usage analytics are not included in your plan"
        )));
    }

    let events = state.store.list_events_for(&user.id).await?;
    let media = events.iter().map(|e| e.media_count).sum();
    let storage_used_bytes = events.iter().map(|e| e.storage_used_bytes).sum();

    Ok(Json(UsageResponse {
        events: events.len(),
        media,
        storage_used_bytes,
        storage_limit_bytes: user.storage_limit_bytes,
        max_events: user.max_events,
    }))
}
