//! Reward ledger business logic - Pending and processed referrer rewards.
//!
//! Rewards are created in pending state alongside their usage record and
//! transition to processed exactly once. The processed transition is a
//! conditional update so a settlement retry cannot process a reward twice.

use crate::{
    entities::{
        RewardStatus, RewardType, UsageRecord,
        reward_record::{self, Column},
        usage_record,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
    QuerySelect, Set, sea_query::Expr,
};

/// Totals of a user's rewards, split by settlement state.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct RewardTotals {
    /// Sum of all reward values
    pub total: f64,
    /// Sum of rewards awaiting settlement
    pub pending_total: f64,
    /// Sum of settled rewards
    pub processed_total: f64,
}

/// Creates a pending reward for a usage event.
///
/// Called inside the redemption transaction, right after the usage record is
/// inserted.
pub async fn create_pending<C>(
    db: &C,
    user_id: i64,
    usage_record_id: i64,
    reward_type: RewardType,
    reward_value: f64,
) -> Result<reward_record::Model>
where
    C: ConnectionTrait,
{
    let model = reward_record::ActiveModel {
        user_id: Set(user_id),
        usage_record_id: Set(usage_record_id),
        reward_type: Set(reward_type),
        reward_value: Set(reward_value),
        status: Set(RewardStatus::Pending),
        processed_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    model.insert(db).await.map_err(Into::into)
}

/// Lists the pending rewards earned from a given order.
///
/// Joins through the usage ledger: a reward belongs to a usage event, and the
/// usage event names the order.
pub async fn list_pending_for_order(
    db: &DatabaseConnection,
    order_id: i64,
) -> Result<Vec<reward_record::Model>> {
    reward_record::Entity::find()
        .inner_join(UsageRecord)
        .filter(usage_record::Column::OrderId.eq(order_id))
        .filter(Column::Status.eq(RewardStatus::Pending))
        .order_by_asc(Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Marks a pending reward as processed.
///
/// The transition is a single conditional UPDATE filtered on pending status,
/// so it can succeed at most once per reward; a second attempt (or an attempt
/// on a missing row) fails with `AlreadyProcessed`.
pub async fn mark_processed(db: &DatabaseConnection, reward_id: i64) -> Result<()> {
    let result = reward_record::Entity::update_many()
        .col_expr(Column::Status, Expr::value(RewardStatus::Processed))
        .col_expr(Column::ProcessedAt, Expr::value(Some(Utc::now())))
        .filter(Column::Id.eq(reward_id))
        .filter(Column::Status.eq(RewardStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::AlreadyProcessed { reward_id });
    }

    Ok(())
}

/// Lists all rewards owed to a user, newest first.
pub async fn list_for_user(
    db: &DatabaseConnection,
    user_id: i64,
    limit: u64,
) -> Result<Vec<reward_record::Model>> {
    reward_record::Entity::find()
        .filter(Column::UserId.eq(user_id))
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sums a user's rewards into total / pending / processed buckets.
pub async fn aggregate_for_user(db: &DatabaseConnection, user_id: i64) -> Result<RewardTotals> {
    let rewards = reward_record::Entity::find()
        .filter(Column::UserId.eq(user_id))
        .all(db)
        .await?;

    let mut totals = RewardTotals::default();
    for reward in rewards {
        totals.total += reward.reward_value;
        match reward.status {
            RewardStatus::Pending => totals.pending_total += reward.reward_value,
            RewardStatus::Processed => totals.processed_total += reward.reward_value,
        }
    }

    Ok(totals)
}
