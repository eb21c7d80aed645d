//! JWT access/refresh token issuance and validation (HS256).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

/// Claims for access tokens (short-lived).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user id).
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Claims for refresh tokens (long-lived, persisted by id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    /// Token id; matches the stored `RefreshToken` record.
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    pub fn generate_access_token(&self, user_id: &str, email: &str) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    pub fn generate_refresh_token(
        &self,
        user_id: &str,
        token_id: &str,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::days(self.refresh_token_expiry_days);

        let claims = RefreshTokenClaims {
            sub: user_id.to_string(),
            jti: token_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode refresh token: {}", e))
    }

    /// Generate both tokens; returns (access, refresh, refresh token id).
    pub fn generate_token_pair(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<(String, String, String), anyhow::Error> {
        let access_token = self.generate_access_token(user_id, email)?;
        let refresh_token_id = Uuid::new_v4().to_string();
        let refresh_token = self.generate_refresh_token(user_id, &refresh_token_id)?;
        Ok((access_token, refresh_token, refresh_token_id))
    }

    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid access token: {}", e))?;
        Ok(token_data.claims)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<RefreshTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid refresh token: {}", e))?;
        Ok(token_data.claims)
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_service() -> JwtService {
        JwtService::new(&JwtConfig {
            secret: Secret::new("test-signing-secret".to_string()),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 30,
        })
    }

    #[test]
    fn test_access_token_round_trip() {
        let service = test_service();

        let token = service
            .generate_access_token("user_123", "amara@example.com")
            .unwrap();
        let claims = service.validate_access_token(&token).unwrap();

        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.email, "amara@example.com");
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let service = test_service();

        let token = service.generate_refresh_token("user_123", "tok_abc").unwrap();
        let claims = service.validate_refresh_token(&token).unwrap();

        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.jti, "tok_abc");
    }

    #[test]
    fn test_token_pair_ids_agree() {
        let service = test_service();

        let (access, refresh, refresh_id) = service
            .generate_token_pair("user_123", "amara@example.com")
            .unwrap();

        assert!(service.validate_access_token(&access).is_ok());
        let refresh_claims = service.validate_refresh_token(&refresh).unwrap();
        assert_eq!(refresh_claims.jti, refresh_id);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = test_service();
        let other = JwtService::new(&JwtConfig {
            secret: Secret::new("a-different-secret".to_string()),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 30,
        });

        let token = service
            .generate_access_token("user_123", "amara@example.com")
            .unwrap();
        assert!(other.validate_access_token(&token).is_err());
    }
}
