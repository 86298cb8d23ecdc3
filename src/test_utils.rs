//! Shared test utilities for the referral engine.
//!
//! This module provides common helper functions for setting up test databases,
//! creating test codes with sensible defaults, and wiring an engine against
//! in-memory collaborator adapters.

use crate::{
    collab::{CreditInstrument, CreditIssuer, InMemoryOrders, RecordingCreditIssuer,
             RecordingNotifier},
    config::settings::RewardPolicy,
    core::{Engine, code},
    entities::{self, CodeStatus, DiscountType, RewardType},
    errors::{Error, Result},
};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test referral code with sensible defaults.
///
/// # Defaults
/// * `discount`: 10% (`Percentage`)
/// * `reward`: flat 5.0 (`Fixed`)
/// * `usage_limit`: None (unlimited)
/// * `status`: active
pub async fn create_test_code(
    db: &DatabaseConnection,
    raw_code: &str,
    owner_user_id: i64,
) -> Result<entities::referral_code::Model> {
    code::create_code(
        db,
        raw_code,
        owner_user_id,
        DiscountType::Percentage,
        10.0,
        RewardType::Fixed,
        5.0,
        None,
        CodeStatus::Active,
    )
    .await
}

/// Creates a test code with a custom usage limit, otherwise the usual defaults.
pub async fn create_custom_code(
    db: &DatabaseConnection,
    raw_code: &str,
    owner_user_id: i64,
    usage_limit: Option<i64>,
) -> Result<entities::referral_code::Model> {
    code::create_code(
        db,
        raw_code,
        owner_user_id,
        DiscountType::Percentage,
        10.0,
        RewardType::Fixed,
        5.0,
        usage_limit,
        CodeStatus::Active,
    )
    .await
}

/// An engine wired against in-memory adapters, with handles kept for
/// seeding orders and asserting on minted credits / sent notifications.
pub struct EngineHarness {
    /// The engine under test
    pub engine: Arc<Engine>,
    /// Seedable order store
    pub orders: Arc<InMemoryOrders>,
    /// Records every minted credit instrument
    pub credits: Arc<RecordingCreditIssuer>,
    /// Records every delivered notification
    pub notifier: Arc<RecordingNotifier>,
}

impl EngineHarness {
    /// The engine's database connection.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.engine.db()
    }
}

/// Sets up an engine over a fresh in-memory database and default adapters.
pub async fn setup_engine() -> Result<EngineHarness> {
    let db = setup_test_db().await?;
    let orders = Arc::new(InMemoryOrders::new());
    let credits = Arc::new(RecordingCreditIssuer::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let engine = Arc::new(Engine::new(
        db,
        Arc::clone(&orders) as Arc<dyn crate::collab::Orders>,
        Arc::new(crate::collab::AllUsers),
        Arc::clone(&credits) as Arc<dyn CreditIssuer>,
        Arc::clone(&notifier) as Arc<dyn crate::collab::Notifier>,
        RewardPolicy::default(),
    ));

    Ok(EngineHarness {
        engine,
        orders,
        credits,
        notifier,
    })
}

/// Credit issuer whose every mint fails, for settlement failure paths.
pub struct FailingCreditIssuer;

#[async_trait]
impl CreditIssuer for FailingCreditIssuer {
    async fn mint(&self, _instrument: CreditInstrument) -> Result<()> {
        Err(Error::Collaborator {
            message: "coupon platform unavailable".to_string(),
        })
    }
}

/// Sets up an engine whose credit issuer always fails.
pub async fn setup_engine_with_failing_credits() -> Result<EngineHarness> {
    let db = setup_test_db().await?;
    let orders = Arc::new(InMemoryOrders::new());
    let credits = Arc::new(RecordingCreditIssuer::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let engine = Arc::new(Engine::new(
        db,
        Arc::clone(&orders) as Arc<dyn crate::collab::Orders>,
        Arc::new(crate::collab::AllUsers),
        Arc::new(FailingCreditIssuer),
        Arc::clone(&notifier) as Arc<dyn crate::collab::Notifier>,
        RewardPolicy::default(),
    ));

    Ok(EngineHarness {
        engine,
        orders,
        credits,
        notifier,
    })
}
