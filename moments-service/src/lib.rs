pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::{
    routing::{delete, get, post},
    Router,
};
use mongodb::{options::ClientOptions, Client, Database};
use secrecy::ExposeSecret;
use service_core::middleware::{
    metrics::metrics_middleware, request_id::request_id_middleware,
    security_headers::security_headers_middleware,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{catalog, CloudinaryClient, JwtService, PaystackClient, Store};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub store: Store,
    pub paystack: PaystackClient,
    pub cloudinary: CloudinaryClient,
    pub jwt: JwtService,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    db: Database,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let store = Store::new(client, &db);
        store.init_indexes().await?;
        catalog::seed_default_plans(&store).await?;

        let paystack = PaystackClient::new(config.paystack.clone());
        if !paystack.is_configured() {
            tracing::warn!("Paystack credentials not configured - plan purchases will fail");
        }

        let cloudinary = CloudinaryClient::new(config.cloudinary.clone());
        if !cloudinary.is_configured() {
            tracing::warn!("Cloudinary credentials not configured - media uploads will fail");
        }

        let jwt = JwtService::new(&config.jwt);

        let state = AppState {
            db: db.clone(),
            config: config.clone(),
            store,
            paystack,
            cloudinary,
            jwt,
        };

        let protected = Router::new()
            .route("/me", get(handlers::users::get_me))
            .route("/me/usage", get(handlers::users::get_usage))
            .route(
                "/events",
                post(handlers::events::create_event).get(handlers::events::list_events),
            )
            .route(
                "/events/:id",
                get(handlers::events::get_event)
                    .patch(handlers::events::update_event)
                    .delete(handlers::events::delete_event),
            )
            .route("/events/:id/qr.png", get(handlers::events::qr_png))
            .route("/events/:id/media", get(handlers::media::owner_gallery))
            .route(
                "/events/:id/media/:media_id",
                delete(handlers::media::delete_media),
            )
            .route("/payments/checkout", post(handlers::payments::checkout))
            .route("/payments/verify", post(handlers::payments::verify))
            .route(
                "/payments/transactions",
                get(handlers::payments::list_transactions),
            )
            .route_layer(from_fn_with_state(
                state.clone(),
                middleware::auth::auth_middleware,
            ));

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics))
            .route("/auth/google", get(handlers::auth::google_login))
            .route(
                "/auth/google/callback",
                get(handlers::auth::google_callback),
            )
            .route("/auth/refresh", post(handlers::auth::refresh))
            .route("/users", post(handlers::users::create_user))
            .route("/plans", get(handlers::plans::list_plans))
            .route("/plans/:id", get(handlers::plans::get_plan))
            .route("/guest/events/:code", get(handlers::events::guest_view))
            .route(
                "/guest/events/:code/uploads/sign",
                post(handlers::media::sign_upload),
            )
            .route(
                "/guest/events/:code/media",
                post(handlers::media::register_media).get(handlers::media::guest_gallery),
            )
            .route("/webhooks/paystack", post(handlers::payments::webhook))
            .merge(protected)
            .route_layer(from_fn(metrics_middleware))
            .layer(from_fn(security_headers_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .layer(CorsLayer::permissive())
            .with_state(state);

        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        tracing::info!("moments-service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
            db,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}
