use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub app: AppConfig,
    pub jwt: JwtConfig,
    pub google: GoogleConfig,
    pub paystack: PaystackConfig,
    pub cloudinary: CloudinaryConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AppConfig {
    /// Base URL guests reach, embedded in event QR codes.
    pub public_base_url: String,
    /// Organizer dashboard URL, target of the OAuth redirect.
    pub frontend_url: String,
    pub log_json: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PaystackConfig {
    pub secret_key: Secret<String>,
    pub api_base_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: Secret<String>,
    pub api_base_url: String,
    /// Root folder all event media lands under.
    pub upload_folder: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("MOMENTS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("MOMENTS_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let db_url = env::var("MOMENTS_DATABASE_URL").expect("MOMENTS_DATABASE_URL must be set");
        let db_name =
            env::var("MOMENTS_DATABASE_NAME").unwrap_or_else(|_| "momentshare".to_string());

        let public_base_url =
            env::var("MOMENTS_PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let frontend_url =
            env::var("MOMENTS_FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".into());
        let log_json = env::var("MOMENTS_LOG_JSON")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let jwt_secret = env::var("MOMENTS_JWT_SECRET").expect("MOMENTS_JWT_SECRET must be set");
        let access_token_expiry_minutes = env::var("MOMENTS_ACCESS_TOKEN_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()?;
        let refresh_token_expiry_days = env::var("MOMENTS_REFRESH_TOKEN_EXPIRY_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()?;

        let google_client_id = env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
        let google_client_secret = env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default();
        let google_redirect_uri = env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| format!("{}/auth/google/callback", public_base_url));

        let paystack_secret_key = env::var("PAYSTACK_SECRET_KEY").unwrap_or_default();
        let paystack_api_base_url = env::var("PAYSTACK_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.paystack.co".to_string());

        let cloudinary_cloud_name = env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default();
        let cloudinary_api_key = env::var("CLOUDINARY_API_KEY").unwrap_or_default();
        let cloudinary_api_secret = env::var("CLOUDINARY_API_SECRET").unwrap_or_default();
        let cloudinary_api_base_url = env::var("CLOUDINARY_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.cloudinary.com/v1_1".to_string());
        let cloudinary_upload_folder =
            env::var("CLOUDINARY_UPLOAD_FOLDER").unwrap_or_else(|_| "momentshare".to_string());

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            app: AppConfig {
                public_base_url,
                frontend_url,
                log_json,
            },
            jwt: JwtConfig {
                secret: Secret::new(jwt_secret),
                access_token_expiry_minutes,
                refresh_token_expiry_days,
            },
            google: GoogleConfig {
                client_id: google_client_id,
                client_secret: Secret::new(google_client_secret),
                redirect_uri: google_redirect_uri,
            },
            paystack: PaystackConfig {
                secret_key: Secret::new(paystack_secret_key),
                api_base_url: paystack_api_base_url,
            },
            cloudinary: CloudinaryConfig {
                cloud_name: cloudinary_cloud_name,
                api_key: cloudinary_api_key,
                api_secret: Secret::new(cloudinary_api_secret),
                api_base_url: cloudinary_api_base_url,
                upload_folder: cloudinary_upload_folder,
            },
            service_name: "moments-service".to_string(),
        })
    }
}
