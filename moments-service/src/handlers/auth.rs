//! Google OAuth sign-in and session token handlers.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use mongodb::bson::{doc, DateTime};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use sha2::{Digest, Sha256};

use crate::handlers::users::provision_user;
use crate::models::RefreshToken;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: String,
    verified_email: bool,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

pub async fn google_login(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Response) {
    let state_val = uuid::Uuid::new_v4().to_string();
    let code_verifier = {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 32];
        use rand::Rng;
        rng.fill(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    };

    let code_challenge = {
        let mut hasher = Sha256::new();
        hasher.update(code_verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    };

    let google_url = format!(
        "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&state={}&code_challenge={}&code_challenge_method=S256",
        state.config.google.client_id,
        state.config.google.redirect_uri,
        state_val,
        code_challenge
    );

    let updated_jar = jar
        .add(
            Cookie::build(("oauth_state", state_val))
                .path("/")
                .http_only(true)
                .secure(true)
                .max_age(time::Duration::minutes(5))
                .build(),
        )
        .add(
            Cookie::build(("code_verifier", code_verifier))
                .path("/")
                .http_only(true)
                .secure(true)
                .max_age(time::Duration::minutes(5))
                .build(),
        );

    (updated_jar, Redirect::to(&google_url).into_response())
}

pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<GoogleCallbackQuery>,
) -> Result<(CookieJar, Response), AppError> {
    let stored_state = jar.get("oauth_state").map(|c| c.value());
    if stored_state != Some(&query.state) {
        return Err(AppError::BadRequest(anyhow::anyhow!("Invalid OAuth state")));
    }

    let code_verifier = jar
        .get("code_verifier")
        .map(|c| c.value())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing code verifier")))?;

    let client = reqwest::Client::new();
    let token_res = client
        .post("https://oauth2.googleapis.com/token")
        .form(&[
            ("client_id", &state.config.google.client_id),
            (
                "client_secret",
                &state.config.google.client_secret.expose_secret().clone(),
            ),
            ("code", &query.code),
            ("code_verifier", &code_verifier.to_string()),
            ("grant_type", &"authorization_code".to_string()),
            ("redirect_uri", &state.config.google.redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to exchange Google code");
            AppError::AuthError(anyhow::anyhow!("Authentication failed"))
        })?;

    if !token_res.status().is_success() {
        let status = token_res.status();
        let err_body = token_res.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %err_body, "Google token exchange error");
        return Err(AppError::AuthError(anyhow::anyhow!(
            "Authentication failed"
        )));
    }

    let token_data: GoogleTokenResponse = token_res.json().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to parse Google token response");
        AppError::InternalError(anyhow::anyhow!("Internal server error"))
    })?;

    let user_info_res = client
        .get("https://www.googleapis.com/oauth2/v2/userinfo")
        .bearer_auth(token_data.access_token)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch Google user info");
            AppError::AuthError(anyhow::anyhow!("Authentication failed"))
        })?;

    let user_info: GoogleUserInfo = user_info_res.json().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to parse Google user info");
        AppError::InternalError(anyhow::anyhow!("Internal server error"))
    })?;

    if !user_info.verified_email {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Google account email not verified"
        )));
    }

    // Upsert by email: returning users keep their plan and events, new users
    // land on the FREE tier.
    let (user, _created) = provision_user(
        &state,
        &user_info.email,
        user_info.name,
        user_info.picture,
        Some(user_info.id),
    )
    .await?;

    let (access_token, refresh_token_str, refresh_token_id) = state
        .jwt
        .generate_token_pair(&user.id, &user.email)
        .map_err(AppError::InternalError)?;

    let refresh_token = RefreshToken::new(
        refresh_token_id,
        &user.id,
        &refresh_token_str,
        state.config.jwt.refresh_token_expiry_days,
    );
    state
        .store
        .refresh_tokens()
        .insert_one(&refresh_token, None)
        .await?;

    tracing::info!(user_id = %user.id, "User signed in via Google");

    let redirect_url = format!(
        "{}?access_token={}&refresh_token={}",
        state.config.app.frontend_url, access_token, refresh_token_str
    );

    let updated_jar = jar
        .remove(Cookie::from("oauth_state"))
        .remove(Cookie::from("code_verifier"));

    Ok((updated_jar, Redirect::to(&redirect_url).into_response()))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Rotate a refresh token: the presented token is invalidated and a fresh
/// pair issued.
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let claims = state
        .jwt
        .validate_refresh_token(&payload.refresh_token)
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid refresh token")))?;

    let stored = state
        .store
        .refresh_tokens()
        .find_one(doc! { "_id": &claims.jti }, None)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Refresh token revoked")))?;

    if stored.token_hash != RefreshToken::hash(&payload.refresh_token)
        || stored.is_expired(DateTime::now())
    {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Refresh token expired or revoked"
        )));
    }

    let user = state
        .store
        .find_user(&stored.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("User no longer exists")))?;

    state
        .store
        .refresh_tokens()
        .delete_one(doc! { "_id": &claims.jti }, None)
        .await?;

    let (access_token, refresh_token_str, refresh_token_id) = state
        .jwt
        .generate_token_pair(&user.id, &user.email)
        .map_err(AppError::InternalError)?;

    let replacement = RefreshToken::new(
        refresh_token_id,
        &user.id,
        &refresh_token_str,
        state.config.jwt.refresh_token_expiry_days,
    );
    state
        .store
        .refresh_tokens()
        .insert_one(&replacement, None)
        .await?;

    Ok(Json(TokenResponse {
        access_token,
        refresh_token: refresh_token_str,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.access_token_expiry_seconds(),
    }))
}
