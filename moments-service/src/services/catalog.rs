//! Default plan catalog seeding.
//!
//! The four tiers and their feature rows are inserted once, on first boot
//! against an empty database. Pricing is in kobo (NGN).

use anyhow::Result;
use mongodb::bson::doc;

use super::database::Store;
use crate::models::{FeatureKey, Plan, PlanFeature, PlanTier, PlanType};

pub async fn seed_default_plans(store: &Store) -> Result<()> {
    let existing = store.plans().count_documents(doc! {}, None).await?;
    if existing > 0 {
        tracing::debug!(plans = existing, "Plan catalog already seeded");
        return Ok(());
    }

    let free = Plan::new(PlanTier::Free, "Free", 0, PlanType::Credit, 1, 0);
    let standard = Plan::new(PlanTier::Standard, "Standard", 250_000, PlanType::Credit, 3, 0);
    let premium = Plan::new(
        PlanTier::Premium,
        "Premium",
        750_000,
        PlanType::Subscription,
        0,
        30,
    );
    let pro = Plan::new(PlanTier::Pro, "Pro", 4_500_000, PlanType::Subscription, 0, 365);

    let features = vec![
        PlanFeature::limit(&free.id, FeatureKey::MaxEvents, 1),
        PlanFeature::limit(&free.id, FeatureKey::StorageLimitMb, 200),
        PlanFeature::limit(&free.id, FeatureKey::UploadCap, 50),
        PlanFeature::limit(&free.id, FeatureKey::RetentionDays, 7),
        PlanFeature::flag(&free.id, FeatureKey::Watermark, true),
        //
        PlanFeature::limit(&standard.id, FeatureKey::MaxEvents, 3),
        PlanFeature::limit(&standard.id, FeatureKey::StorageLimitMb, 1024),
        PlanFeature::limit(&standard.id, FeatureKey::UploadCap, 200),
        PlanFeature::limit(&standard.id, FeatureKey::RetentionDays, 30),
        PlanFeature::flag(&standard.id, FeatureKey::Watermark, false),
        //
        PlanFeature::limit(&premium.id, FeatureKey::MaxEvents, 10),
        PlanFeature::limit(&premium.id, FeatureKey::StorageLimitMb, 5 * 1024),
        PlanFeature::limit(&premium.id, FeatureKey::UploadCap, 500),
        PlanFeature::limit(&premium.id, FeatureKey::RetentionDays, 90),
        PlanFeature::flag(&premium.id, FeatureKey::Watermark, false),
        PlanFeature::flag(&premium.id, FeatureKey::Analytics, true),
        //
        PlanFeature::limit(&pro.id, FeatureKey::MaxEvents, 50),
        PlanFeature::limit(&pro.id, FeatureKey::StorageLimitMb, 20 * 1024),
        PlanFeature::limit(&pro.id, FeatureKey::UploadCap, 2000),
        PlanFeature::limit(&pro.id, FeatureKey::RetentionDays, 365),
        PlanFeature::flag(&pro.id, FeatureKey::Watermark, false),
        PlanFeature::flag(&pro.id, FeatureKey::Analytics, true),
    ];

    store
        .plans()
        .insert_many([free, standard, premium, pro], None)
        .await?;
    store.plan_features().insert_many(features, None).await?;

    tracing::info!("Seeded default plan catalog");
    Ok(())
}
