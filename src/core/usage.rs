//! Usage ledger business logic - Append-only record of code redemptions.
//!
//! One row per successful redemption. Rows are written inside the redemption
//! transaction and never updated or deleted afterwards; the unique key on
//! `order_id` backs up the engine's duplicate-redemption check.

use crate::{
    entities::{
        UsageRecord,
        usage_record::{self, Column},
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};

/// Appends a usage record for a redemption.
///
/// The caller (the referral engine) is responsible for running this inside the
/// redemption transaction. The unique key on `order_id` is the last line of
/// defense against two redemptions racing past the engine's pre-check; a
/// violation comes back as `DuplicateRedemption` so the losing caller sees the
/// same error the pre-check produces.
pub async fn record<C>(
    db: &C,
    referral_code_id: i64,
    referrer_id: i64,
    referee_id: i64,
    order_id: i64,
    discount_amount: f64,
    reward_amount: f64,
) -> Result<usage_record::Model>
where
    C: ConnectionTrait,
{
    let model = usage_record::ActiveModel {
        referral_code_id: Set(referral_code_id),
        referrer_id: Set(referrer_id),
        referee_id: Set(referee_id),
        order_id: Set(order_id),
        discount_amount: Set(discount_amount),
        reward_amount: Set(reward_amount),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    match model.insert(db).await {
        Ok(row) => Ok(row),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(Error::DuplicateRedemption { order_id })
        }
        Err(e) => Err(e.into()),
    }
}

/// Finds the usage record for an order, if the order redeemed a code.
pub async fn get_for_order<C>(db: &C, order_id: i64) -> Result<Option<usage_record::Model>>
where
    C: ConnectionTrait,
{
    UsageRecord::find()
        .filter(Column::OrderId.eq(order_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists a referrer's usage events, most recent first.
pub async fn list_for_referrer(
    db: &DatabaseConnection,
    referrer_id: i64,
    limit: u64,
) -> Result<Vec<usage_record::Model>> {
    UsageRecord::find()
        .filter(Column::ReferrerId.eq(referrer_id))
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Counts how many redemptions a referrer has accumulated.
pub async fn count_for_referrer(db: &DatabaseConnection, referrer_id: i64) -> Result<u64> {
    UsageRecord::find()
        .filter(Column::ReferrerId.eq(referrer_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Lists the whole usage ledger for administrative reporting, newest first.
///
/// Returns the requested page plus the total row count.
pub async fn paginated_list(
    db: &DatabaseConnection,
    page: u64,
    per_page: u64,
) -> Result<(Vec<usage_record::Model>, u64)> {
    let paginator = UsageRecord::find()
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .paginate(db, per_page.max(1));

    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

    Ok((rows, total))
}
