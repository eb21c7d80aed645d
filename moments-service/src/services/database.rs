//! MongoDB access layer: typed collections, indexes, and session helpers.

use anyhow::Result;
use futures::TryStreamExt;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{
    bson::{doc, DateTime},
    Client, ClientSession, Collection, Database, IndexModel,
};

use crate::models::{Event, Media, Plan, PlanFeature, RefreshToken, Transaction, User};

#[derive(Clone)]
pub struct Store {
    client: Client,
    users: Collection<User>,
    plans: Collection<Plan>,
    plan_features: Collection<PlanFeature>,
    events: Collection<Event>,
    media: Collection<Media>,
    transactions: Collection<Transaction>,
    refresh_tokens: Collection<RefreshToken>,
}

impl Store {
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            users: db.collection("users"),
            plans: db.collection("plans"),
            plan_features: db.collection("plan_features"),
            events: db.collection("events"),
            media: db.collection("media"),
            transactions: db.collection("transactions"),
            refresh_tokens: db.collection("refresh_tokens"),
        }
    }

    /// Start a causally-consistent session with a transaction open. Callers
    /// must commit or abort before dropping it.
    pub async fn start_transaction(&self) -> Result<ClientSession, mongodb::error::Error> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        Ok(session)
    }

    pub async fn init_indexes(&self) -> Result<()> {
        let unique = |name: &str| {
            IndexOptions::builder()
                .name(name.to_string())
                .unique(true)
                .build()
        };
        let plain = |name: &str| IndexOptions::builder().name(name.to_string()).build();

        self.users
            .create_indexes(
                [IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique("user_email_idx"))
                    .build()],
                None,
            )
            .await?;

        self.transactions
            .create_indexes(
                [
                    IndexModel::builder()
                        .keys(doc! { "reference": 1 })
                        .options(unique("transaction_reference_idx"))
                        .build(),
                    IndexModel::builder()
                        .keys(doc! { "user_id": 1, "created_at": -1 })
                        .options(plain("transaction_user_idx"))
                        .build(),
                ],
                None,
            )
            .await?;

        self.events
            .create_indexes(
                [
                    IndexModel::builder()
                        .keys(doc! { "code": 1 })
                        .options(unique("event_code_idx"))
                        .build(),
                    IndexModel::builder()
                        .keys(doc! { "organizer_id": 1, "created_at": -1 })
                        .options(plain("event_organizer_idx"))
                        .build(),
                ],
                None,
            )
            .await?;

        self.media
            .create_indexes(
                [IndexModel::builder()
                    .keys(doc! { "event_id": 1, "created_at": -1 })
                    .options(plain("media_event_idx"))
                    .build()],
                None,
            )
            .await?;

        self.plan_features
            .create_indexes(
                [IndexModel::builder()
                    .keys(doc! { "plan_id": 1 })
                    .options(plain("plan_feature_plan_idx"))
                    .build()],
                None,
            )
            .await?;

        self.refresh_tokens
            .create_indexes(
                [IndexModel::builder()
                    .keys(doc! { "user_id": 1 })
                    .options(plain("refresh_token_user_idx"))
                    .build()],
                None,
            )
            .await?;

        tracing::info!("MongoDB indexes initialized");
        Ok(())
    }

    pub fn users(&self) -> &Collection<User> {
        &self.users
    }

    pub fn plans(&self) -> &Collection<Plan> {
        &self.plans
    }

    pub fn plan_features(&self) -> &Collection<PlanFeature> {
        &self.plan_features
    }

    pub fn events(&self) -> &Collection<Event> {
        &self.events
    }

    pub fn media(&self) -> &Collection<Media> {
        &self.media
    }

    pub fn transactions(&self) -> &Collection<Transaction> {
        &self.transactions
    }

    pub fn refresh_tokens(&self) -> &Collection<RefreshToken> {
        &self.refresh_tokens
    }

    // Lookups shared by several handlers.

    pub async fn find_user(&self, id: &str) -> Result<Option<User>, mongodb::error::Error> {
        self.users.find_one(doc! { "_id": id }, None).await
    }

    pub async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, mongodb::error::Error> {
        self.users.find_one(doc! { "email": email }, None).await
    }

    pub async fn find_plan(&self, id: &str) -> Result<Option<Plan>, mongodb::error::Error> {
        self.plans.find_one(doc! { "_id": id }, None).await
    }

    pub async fn features_for_plan(
        &self,
        plan_id: &str,
    ) -> Result<Vec<PlanFeature>, mongodb::error::Error> {
        let cursor = self
            .plan_features
            .find(doc! { "plan_id": plan_id }, None)
            .await?;
        cursor.try_collect().await
    }

    pub async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, mongodb::error::Error> {
        self.transactions
            .find_one(doc! { "reference": reference }, None)
            .await
    }

    pub async fn find_event(&self, id: &str) -> Result<Option<Event>, mongodb::error::Error> {
        self.events.find_one(doc! { "_id": id }, None).await
    }

    pub async fn find_event_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Event>, mongodb::error::Error> {
        self.events.find_one(doc! { "code": code }, None).await
    }

    /// Events that still count against the organizer's `max_events` limit.
    pub async fn count_active_events(
        &self,
        organizer_id: &str,
        now: DateTime,
    ) -> Result<u64, mongodb::error::Error> {
        self.events
            .count_documents(
                doc! { "organizer_id": organizer_id, "expires_at": { "$gt": now } },
                None,
            )
            .await
    }

    pub async fn list_events_for(
        &self,
        organizer_id: &str,
    ) -> Result<Vec<Event>, mongodb::error::Error> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let cursor = self
            .events
            .find(doc! { "organizer_id": organizer_id }, options)
            .await?;
        cursor.try_collect().await
    }

    pub async fn list_media_for_event(
        &self,
        event_id: &str,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Media>, mongodb::error::Error> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .limit(limit)
            .build();
        let cursor = self
            .media
            .find(doc! { "event_id": event_id }, options)
            .await?;
        cursor.try_collect().await
    }

    pub async fn list_transactions_for(
        &self,
        user_id: &str,
    ) -> Result<Vec<Transaction>, mongodb::error::Error> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let cursor = self
            .transactions
            .find(doc! { "user_id": user_id }, options)
            .await?;
        cursor.try_collect().await
    }
}
