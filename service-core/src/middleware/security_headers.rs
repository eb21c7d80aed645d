use axum::{extract::Request, http::header, middleware::Next, response::IntoResponse};

/// Baseline security headers for every response.
///
/// The CSP admits Cloudinary-hosted assets and `data:` URIs: event galleries
/// serve thumbnails straight from `res.cloudinary.com`, and the event QR code
/// is embedded as a base64 data URI.
pub async fn security_headers_middleware(req: Request, next: Next) -> impl IntoResponse {
    let path = req.uri().path().to_string();
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        header::HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    if path.starts_with("/guest/") {
        // Guest gallery responses are rendered into third-party pages.
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            header::HeaderValue::from_static(
                "default-src 'self'; \
                 img-src 'self' https://res.cloudinary.com data:; \
                 media-src 'self' https://res.cloudinary.com; \
                 frame-ancestors 'none'",
            ),
        );
        headers.insert(
            header::X_FRAME_OPTIONS,
            header::HeaderValue::from_static("SAMEORIGIN"),
        );
    } else {
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            header::HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        );
        headers.insert(
            header::X_FRAME_OPTIONS,
            header::HeaderValue::from_static("DENY"),
        );
    }

    response
}
