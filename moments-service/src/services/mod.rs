pub mod billing;
pub mod catalog;
pub mod cloudinary;
pub mod database;
pub mod entitlements;
pub mod jwt;
pub mod metrics;
pub mod paystack;

pub use cloudinary::CloudinaryClient;
pub use database::Store;
pub use jwt::JwtService;
pub use metrics::{get_metrics, init_metrics};
pub use paystack::PaystackClient;
