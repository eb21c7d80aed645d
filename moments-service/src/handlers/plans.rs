//! Plan catalog handlers (pricing table data).

use axum::{
    extract::{Path, State},
    Json,
};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use serde::Serialize;
use service_core::error::AppError;

use crate::models::{FeatureKey, Plan, PlanFeature, PlanTier, PlanType};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct FeatureResponse {
    pub key: FeatureKey,
    pub enabled: bool,
    pub limit: Option<i64>,
}

impl From<PlanFeature> for FeatureResponse {
    fn from(f: PlanFeature) -> Self {
        Self {
            key: f.key,
            enabled: f.enabled,
            limit: f.limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub id: String,
    pub tier: PlanTier,
    pub name: String,
    pub description: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub plan_type: PlanType,
    pub credits: i64,
    pub duration_days: i64,
    pub features: Vec<FeatureResponse>,
}

impl PlanResponse {
    fn assemble(plan: Plan, features: Vec<PlanFeature>) -> Self {
        Self {
            id: plan.id,
            tier: plan.tier,
            name: plan.name,
            description: plan.description,
            amount: plan.amount,
            currency: plan.currency,
            plan_type: plan.plan_type,
            credits: plan.credits,
            duration_days: plan.duration_days,
            features: features.into_iter().map(FeatureResponse::from).collect(),
        }
    }
}

pub async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<PlanResponse>>, AppError> {
    let options = FindOptions::builder().sort(doc! { "amount": 1 }).build();
    let cursor = state
        .store
        .plans()
        .find(doc! { "is_active": true }, options)
        .await?;
    let plans: Vec<Plan> = cursor.try_collect().await?;

    let mut out = Vec::with_capacity(plans.len());
    for plan in plans {
        let features = state.store.features_for_plan(&plan.id).await?;
        out.push(PlanResponse::assemble(plan, features));
    }

    Ok(Json(out))
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PlanResponse>, AppError> {
    let plan = state
        .store
        .find_plan(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Plan not found")))?;
    let features = state.store.features_for_plan(&plan.id).await?;

    Ok(Json(PlanResponse::assemble(plan, features)))
}
