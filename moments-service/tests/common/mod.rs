#![allow(dead_code)]

use hmac::{Hmac, Mac};
use mongodb::bson::doc;
use moments_service::config::{
    AppConfig, CloudinaryConfig, Config, DatabaseConfig, GoogleConfig, JwtConfig, PaystackConfig,
    ServerConfig,
};
use moments_service::models::Plan;
use moments_service::services::JwtService;
use moments_service::Application;
use secrecy::Secret;
use sha2::Sha512;
use wiremock::MockServer;

pub const TEST_JWT_SECRET: &str = "test-signing-secret";
pub const TEST_PAYSTACK_SECRET: &str = "sk_test_secret";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: mongodb::Database,
    pub db_name: String,
    pub paystack_server: MockServer,
    pub cloudinary_server: MockServer,
    jwt: JwtService,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let paystack_server = MockServer::start().await;
        let cloudinary_server = MockServer::start().await;

        let db_name = format!("moments_test_{}", uuid::Uuid::new_v4().simple());

        let jwt_config = JwtConfig {
            secret: Secret::new(TEST_JWT_SECRET.to_string()),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 30,
        };

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            database: DatabaseConfig {
                url: Secret::new(
                    std::env::var("TEST_MONGODB_URI")
                        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
                ),
                db_name: db_name.clone(),
            },
            app: AppConfig {
                public_base_url: "http://moments.test".to_string(),
                frontend_url: "http://dashboard.moments.test".to_string(),
                log_json: false,
            },
            jwt: jwt_config.clone(),
            google: GoogleConfig {
                client_id: "test-google-client".to_string(),
                client_secret: Secret::new("test-google-secret".to_string()),
                redirect_uri: "http://moments.test/auth/google/callback".to_string(),
            },
            paystack: PaystackConfig {
                secret_key: Secret::new(TEST_PAYSTACK_SECRET.to_string()),
                api_base_url: paystack_server.uri(),
            },
            cloudinary: CloudinaryConfig {
                cloud_name: "testcloud".to_string(),
                api_key: "1234567890".to_string(),
                api_secret: Secret::new("cloud_secret".to_string()),
                api_base_url: cloudinary_server.uri(),
                upload_folder: "momentshare-test".to_string(),
            },
            service_name: "moments-service-test".to_string(),
        };

        moments_service::services::init_metrics();

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);
        let db = app.db().clone();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to come up by polling the health endpoint.
        let client = reqwest::Client::new();
        let health_url = format!("http://127.0.0.1:{}/health", port);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            db,
            db_name,
            paystack_server,
            cloudinary_server,
            jwt: JwtService::new(&jwt_config),
        }
    }

    /// Create a user through the API and mint an access token for it.
    pub async fn create_user(&self, email: &str) -> (String, String) {
        let client = reqwest::Client::new();
        let response = client
            .post(format!("{}/users", self.address))
            .json(&serde_json::json!({ "email": email, "name": "Test Organizer" }))
            .send()
            .await
            .expect("Failed to create user");
        assert!(
            response.status().is_success(),
            "user creation returned {}",
            response.status()
        );

        let body: serde_json::Value = response.json().await.expect("Invalid user response");
        let user_id = body["id"].as_str().expect("Missing user id").to_string();
        let token = self.auth_token(&user_id, email);
        (user_id, token)
    }

    pub fn auth_token(&self, user_id: &str, email: &str) -> String {
        self.jwt
            .generate_access_token(user_id, email)
            .expect("Failed to mint test token")
    }

    /// Fetch a seeded plan directly from the database.
    pub async fn plan_by_tier(&self, tier: &str) -> Plan {
        self.db
            .collection::<Plan>("plans")
            .find_one(doc! { "tier": tier }, None)
            .await
            .expect("Plan lookup failed")
            .expect("Plan not seeded")
    }

    /// Sign a webhook body the way Paystack does.
    pub fn paystack_signature(&self, body: &str) -> String {
        type HmacSha512 = Hmac<Sha512>;
        let mut mac = HmacSha512::new_from_slice(TEST_PAYSTACK_SECRET.as_bytes())
            .expect("Invalid key length");
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Drop the per-test database.
    pub async fn cleanup(&self) {
        self.db
            .drop(None)
            .await
            .expect("Failed to drop test database");
    }
}
