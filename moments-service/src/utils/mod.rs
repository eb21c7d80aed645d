use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, Luma};
use qrcode::QrCode;
use std::io::Cursor;
use uuid::Uuid;

/// Render `data` as a QR code PNG.
pub fn generate_qr_png(data: &str) -> Result<Vec<u8>> {
    let code = QrCode::new(data)?;
    let image = code.render::<Luma<u8>>().build();

    let dynamic_image = DynamicImage::ImageLuma8(image);
    let mut buffer = Cursor::new(Vec::new());
    dynamic_image.write_to(&mut buffer, image::ImageOutputFormat::Png)?;

    Ok(buffer.into_inner())
}

/// QR code PNG as base64, for embedding on the event document.
pub fn generate_qr_base64(data: &str) -> Result<String> {
    Ok(general_purpose::STANDARD.encode(generate_qr_png(data)?))
}

/// The URL a guest lands on when scanning an event's QR code.
pub fn guest_upload_url(public_base_url: &str, code: &str) -> String {
    format!("{}/e/{}", public_base_url.trim_end_matches('/'), code)
}

/// Payment reference handed to Paystack; unique per checkout attempt.
pub fn new_payment_reference() -> String {
    format!("ms_{}", Uuid::new_v4().simple())
}

/// Short code identifying an event on guest URLs.
pub fn new_event_code() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_png_has_png_magic() {
        let png = generate_qr_png("https://moments.example/e/abc123").unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n']);
    }

    #[test]
    fn test_qr_base64_decodes() {
        let encoded = generate_qr_base64("https://moments.example/e/abc123").unwrap();
        let decoded = general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn test_guest_upload_url_joins_cleanly() {
        assert_eq!(
            guest_upload_url("https://moments.example/", "abc123"),
            "https://moments.example/e/abc123"
        );
        assert_eq!(
            guest_upload_url("https://moments.example", "abc123"),
            "https://moments.example/e/abc123"
        );
    }

    #[test]
    fn test_reference_and_code_shapes() {
        let reference = new_payment_reference();
        assert!(reference.starts_with("ms_"));
        assert_eq!(new_event_code().len(), 10);
        assert_ne!(new_event_code(), new_event_code());
    }
}
