//! Event lifecycle handlers: creation (entitlement-gated), dashboard CRUD,
//! the printable QR flyer, and the public guest view.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use mongodb::bson::{doc, DateTime};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::{Event, PlanType};
use crate::utils;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 140))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 300))]
    pub location: Option<String>,
    /// Overrides the plan's retention window; must be in the future.
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 140))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 300))]
    pub location: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub code: String,
    /// URL guests land on when scanning the QR code.
    pub guest_url: String,
    pub qr_image_base64: String,
    pub expires_at: String,
    pub upload_cap: i32,
    pub storage_limit_bytes: i64,
    pub watermark: bool,
    pub media_count: i64,
    pub storage_used_bytes: i64,
    pub created_at: String,
}

impl EventResponse {
    fn assemble(event: Event, public_base_url: &str) -> Self {
        let guest_url = utils::guest_upload_url(public_base_url, &event.code);
        Self {
            id: event.id,
            title: event.title,
            description: event.description,
            location: event.location,
            code: event.code,
            guest_url,
            qr_image_base64: event.qr_image_base64,
            expires_at: event.expires_at.to_string(),
            upload_cap: event.upload_cap,
            storage_limit_bytes: event.storage_limit_bytes,
            watermark: event.watermark,
            media_count: event.media_count,
            storage_used_bytes: event.storage_used_bytes,
            created_at: event.created_at.to_string(),
        }
    }
}

/// Create an event inside one transaction: the active-event limit check,
/// credit consumption, and the insert commit or abort together.
pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), AppError> {
    payload.validate()?;

    let user = state
        .store
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let now = DateTime::now();
    let expires_at = match payload.expires_at {
        Some(dt) => {
            let expires = DateTime::from_chrono(dt);
            if expires <= now {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Event expiry must be in the future"
                )));
            }
            expires
        }
        None => DateTime::from_millis(
            now.timestamp_millis() + user.retention_days as i64 * 86_400_000,
        ),
    };

    let plan_id = user.active_plan_id.clone().ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!("User has no active plan"))
    })?;
    let plan = state
        .store
        .find_plan(&plan_id)
        .await?
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Active plan missing")))?;

    if plan.plan_type == PlanType::Subscription && !user.has_active_subscription(now) {
        return Err(AppError::PaymentRequired(anyhow::anyhow!(
            "Subscription expired; renew to create events"
        )));
    }

    let code = utils::new_event_code();
    let guest_url = utils::guest_upload_url(&state.config.app.public_base_url, &code);
    let qr_image_base64 = utils::generate_qr_base64(&guest_url).map_err(AppError::InternalError)?;

    let event = Event::new(
        &user.id,
        payload.title,
        payload.description,
        payload.location,
        code,
        qr_image_base64,
        expires_at,
        user.upload_cap_per_event,
        user.storage_limit_bytes,
        user.watermark_enabled,
    );

    let mut session = state.store.start_transaction().await?;

    let result = async {
        let active = state
            .store
            .events()
            .count_documents_with_session(
                doc! { "organizer_id": &user.id, "expires_at": { "$gt": now } },
                None,
                &mut session,
            )
            .await?;
        if active >= user.max_events as u64 {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Active event limit reached for your plan"
            )));
        }

        if plan.plan_type == PlanType::Credit {
            let fresh = state
                .store
                .users()
                .find_one_with_session(doc! { "_id": &user.id }, None, &mut session)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
            if fresh.credits <= 0 {
                return Err(AppError::PaymentRequired(anyhow::anyhow!(
                    "No event credits left; purchase a plan to continue"
                )));
            }
            state
                .store
                .users()
                .update_one_with_session(
                    doc! { "_id": &user.id },
                    doc! { "$inc": { "credits": -1 }, "$set": { "updated_at": now } },
                    None,
                    &mut session,
                )
                .await?;
        }

        state
            .store
            .events()
            .insert_one_with_session(&event, None, &mut session)
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

    metrics::counter!("events_created_total").increment(1);
    tracing::info!(
        event_id = %event.id,
        organizer_id = %user.id,
        code = %event.code,
        "Event created"
    );

    Ok((
        StatusCode::CREATED,
        Json(EventResponse::assemble(
            event,
            &state.config.app.public_base_url,
        )),
    ))
}

pub async fn list_events(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let events = state.store.list_events_for(&claims.sub).await?;
    let base = &state.config.app.public_base_url;
    Ok(Json(
        events
            .into_iter()
            .map(|e| EventResponse::assemble(e, base))
            .collect(),
    ))
}

/// Load an event and enforce ownership; non-owners get the same 404 as a
/// missing event.
async fn owned_event(state: &AppState, id: &str, organizer_id: &str) -> Result<Event, AppError> {
    state
        .store
        .find_event(id)
        .await?
        .filter(|e| e.organizer_id == organizer_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Event not found")))
}

pub async fn get_event(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<EventResponse>, AppError> {
    let event = owned_event(&state, &id, &claims.sub).await?;
    Ok(Json(EventResponse::assemble(
        event,
        &state.config.app.public_base_url,
    )))
}

pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<EventResponse>, AppError> {
    payload.validate()?;

    let event = owned_event(&state, &id, &claims.sub).await?;

    let mut set = doc! { "updated_at": DateTime::now() };
    if let Some(title) = payload.title {
        set.insert("title", title);
    }
    if let Some(description) = payload.description {
        set.insert("description", description);
    }
    if let Some(location) = payload.location {
        set.insert("location", location);
    }
    if let Some(expires_at) = payload.expires_at {
        let expires = DateTime::from_chrono(expires_at);
        if expires <= DateTime::now() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Event expiry must be in the future"
            )));
        }
        set.insert("expires_at", expires);
    }

    state
        .store
        .events()
        .update_one(doc! { "_id": &event.id }, doc! { "$set": set }, None)
        .await?;

    let updated = owned_event(&state, &id, &claims.sub).await?;
    Ok(Json(EventResponse::assemble(
        updated,
        &state.config.app.public_base_url,
    )))
}

/// Delete an event and its media records transactionally, then best-effort
/// sweep the Cloudinary folder.
pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let event = owned_event(&state, &id, &claims.sub).await?;

    let mut session = state.store.start_transaction().await?;

    let result = async {
        state
            .store
            .media()
            .delete_many_with_session(doc! { "event_id": &event.id }, None, &mut session)
            .await?;
        state
            .store
            .events()
            .delete_one_with_session(doc! { "_id": &event.id }, None, &mut session)
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

    let folder = format!("{}/{}", state.config.cloudinary.upload_folder, event.id);
    if let Err(e) = state.cloudinary.delete_folder(&folder).await {
        tracing::warn!(event_id = %event.id, error = %e, "Cloudinary folder cleanup failed");
    }

    tracing::info!(event_id = %event.id, organizer_id = %claims.sub, "Event deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// The event QR code as raw PNG bytes, suitable for printing.
pub async fn qr_png(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = owned_event(&state, &id, &claims.sub).await?;

    let png = general_purpose::STANDARD
        .decode(&event.qr_image_base64)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Stored QR image invalid: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

#[derive(Debug, Serialize)]
pub struct GuestEventResponse {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub expires_at: String,
    pub uploads_open: bool,
    pub media_count: i64,
    pub watermark: bool,
}

/// Public event view for the guest upload page.
pub async fn guest_view(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<GuestEventResponse>, AppError> {
    let event = state
        .store
        .find_event_by_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Event not found")))?;

    let now = DateTime::now();
    Ok(Json(GuestEventResponse {
        uploads_open: event.uploads_open(now),
        title: event.title,
        description: event.description,
        location: event.location,
        expires_at: event.expires_at.to_string(),
        media_count: event.media_count,
        watermark: event.watermark,
    }))
}
