pub mod event;
pub mod media;
pub mod plan;
pub mod refresh_token;
pub mod transaction;
pub mod user;

pub use event::Event;
pub use media::{Media, MediaType};
pub use plan::{FeatureKey, Plan, PlanFeature, PlanTier, PlanType};
pub use refresh_token::RefreshToken;
pub use transaction::{Transaction, TransactionStatus};
pub use user::{PlanActivation, SubscriptionStatus, User};
