//! Media handlers: signed Cloudinary uploads, registration with quota
//! accounting, galleries, and deletion.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::{doc, DateTime};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::{Event, Media, MediaType};
use crate::services::cloudinary::UploadSignature;
use crate::AppState;

/// Gate a prospective upload of `declared_bytes` against the event's state.
fn check_upload_slot(event: &Event, now: DateTime, declared_bytes: i64) -> Result<(), AppError> {
    if event.is_expired(now) {
        return Err(AppError::Gone(anyhow::anyhow!(
            "This event is no longer accepting uploads"
        )));
    }
    if event.media_count >= event.upload_cap as i64 {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Upload cap reached for this event"
        )));
    }
    if event.storage_used_bytes + declared_bytes > event.storage_limit_bytes {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Storage limit reached for this event"
        )));
    }
    Ok(())
}

fn resource_type(file_type: MediaType) -> &'static str {
    match file_type {
        MediaType::Image => "image",
        MediaType::Video => "video",
    }
}

/// Best-effort removal of an already-uploaded asset whose registration was
/// refused. Errors are logged and swallowed.
async fn cleanup_asset(state: &AppState, public_id: &str, file_type: MediaType) {
    if let Err(e) = state
        .cloudinary
        .destroy_asset(public_id, resource_type(file_type))
        .await
    {
        tracing::warn!(public_id = %public_id, error = %e, "Cloudinary asset cleanup failed");
    }
}

async fn event_by_code(state: &AppState, code: &str) -> Result<Event, AppError> {
    state
        .store
        .find_event_by_code(code)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Event not found")))
}

/// Issue signed parameters for a direct guest upload to Cloudinary.
pub async fn sign_upload(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<UploadSignature>, AppError> {
    let event = event_by_code(&state, &code).await?;

    let now = DateTime::now();
    check_upload_slot(&event, now, 0)?;

    let folder = format!("{}/{}", state.config.cloudinary.upload_folder, event.id);
    let timestamp = now.timestamp_millis() / 1000;

    Ok(Json(state.cloudinary.sign_upload(&folder, timestamp)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterMediaRequest {
    #[validate(length(min = 1, max = 300))]
    pub public_id: String,
    #[validate(url)]
    pub url: String,
    #[validate(range(min = 1))]
    pub bytes: i64,
    pub file_type: MediaType,
    #[validate(length(max = 100))]
    pub uploader_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub id: String,
    pub uploader_name: Option<String>,
    pub file_type: MediaType,
    pub public_id: String,
    pub url: String,
    pub bytes: i64,
    pub created_at: String,
}

impl From<Media> for MediaResponse {
    fn from(m: Media) -> Self {
        Self {
            id: m.id,
            uploader_name: m.uploader_name,
            file_type: m.file_type,
            public_id: m.public_id,
            url: m.url,
            bytes: m.bytes,
            created_at: m.created_at.to_string(),
        }
    }
}

/// Register a completed direct upload: quota checks, then the media insert
/// and the event counters move in one transaction. A refused registration
/// triggers best-effort deletion of the just-uploaded asset.
pub async fn register_media(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(payload): Json<RegisterMediaRequest>,
) -> Result<(StatusCode, Json<MediaResponse>), AppError> {
    payload.validate()?;

    let event = event_by_code(&state, &code).await?;
    let now = DateTime::now();

    if let Err(refusal) = check_upload_slot(&event, now, payload.bytes) {
        cleanup_asset(&state, &payload.public_id, payload.file_type).await;
        return Err(refusal);
    }

    let media = Media::new(
        &event.id,
        payload.uploader_name,
        payload.file_type,
        payload.public_id.clone(),
        payload.url,
        payload.bytes,
    );

    let mut session = state.store.start_transaction().await?;

    let result = async {
        state
            .store
            .media()
            .insert_one_with_session(&media, None, &mut session)
            .await?;
        state
            .store
            .events()
            .update_one_with_session(
                doc! { "_id": &event.id },
                doc! {
                    "$inc": { "media_count": 1, "storage_used_bytes": payload.bytes },
                    "$set": { "updated_at": now },
                },
                None,
                &mut session,
            )
            .await?;
        Ok::<(), AppError>(())
    }
    .await;

    match result {
        Ok(()) => session.commit_transaction().await?,
        Err(e) => {
            session.abort_transaction().await.ok();
            cleanup_asset(&state, &payload.public_id, payload.file_type).await;
            return Err(e);
        }
    }

    metrics::counter!("media_registered_total").increment(1);
    tracing::info!(
        media_id = %media.id,
        event_id = %event.id,
        bytes = media.bytes,
        "Media registered"
    );

    Ok((StatusCode::CREATED, Json(MediaResponse::from(media))))
}

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    pub page: Option<u64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub media: Vec<MediaResponse>,
    pub media_count: i64,
    pub page: u64,
    pub limit: i64,
}

async fn gallery(
    state: &AppState,
    event: &Event,
    query: GalleryQuery,
) -> Result<GalleryResponse, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let skip = (page - 1) * limit as u64;

    let media = state
        .store
        .list_media_for_event(&event.id, skip, limit)
        .await?;

    Ok(GalleryResponse {
        media: media.into_iter().map(MediaResponse::from).collect(),
        media_count: event.media_count,
        page,
        limit,
    })
}

/// Public gallery for the guest page.
pub async fn guest_gallery(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<GalleryResponse>, AppError> {
    let event = event_by_code(&state, &code).await?;
    Ok(Json(gallery(&state, &event, query).await?))
}

/// Organizer dashboard gallery.
pub async fn owner_gallery(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<GalleryResponse>, AppError> {
    let event = state
        .store
        .find_event(&id)
        .await?
        .filter(|e| e.organizer_id == claims.sub)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Event not found")))?;
    Ok(Json(gallery(&state, &event, query).await?))
}

/// Remove one media item: the document and the event counters move together,
/// then the hosted asset is removed best-effort.
pub async fn delete_media(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path((id, media_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let event = state
        .store
        .find_event(&id)
        .await?
        .filter(|e| e.organizer_id == claims.sub)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Event not found")))?;

    let media = state
        .store
        .media()
        .find_one(doc! { "_id": &media_id, "event_id": &event.id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Media not found")))?;

    let mut session = state.store.start_transaction().await?;

    let result = async {
        state
            .store
            .media()
            .delete_one_with_session(doc! { "_id": &media.id }, None, &mut session)
            .await?;
        state
            .store
            .events()
            .update_one_with_session(
                doc! { "_id": &event.id },
                doc! {
                    "$inc": { "media_count": -1, "storage_used_bytes": -media.bytes },
                    "$set": { "updated_at": DateTime::now() },
                },
                None,
                &mut session,
            )
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

    cleanup_asset(&state, &media.public_id, media.file_type).await;

    tracing::info!(media_id = %media.id, event_id = %event.id, "Media deleted");
    Ok(StatusCode::NO_CONTENT)
}
