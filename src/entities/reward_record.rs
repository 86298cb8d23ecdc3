//! Reward record entity - Pending and processed referrer rewards.
//!
//! Each row is created in `pending` state alongside its usage record and
//! transitions to `processed` exactly once, when the associated order
//! completes and the reward is materialized into a credit instrument.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use super::referral_code::RewardType;

/// Reward record database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_records")]
pub struct Model {
    /// Unique identifier for the reward
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Referrer the reward is owed to
    pub user_id: i64,
    /// Usage event this reward was earned from
    pub usage_record_id: i64,
    /// Settlement mode, copied from the code at redemption time
    pub reward_type: RewardType,
    /// Reward value, interpreted per `reward_type`
    pub reward_value: f64,
    /// `Pending` until the order completes, then `Processed`
    pub status: RewardStatus,
    /// When the reward was settled, None while pending
    pub processed_at: Option<DateTimeUtc>,
    /// When the reward was created
    pub created_at: DateTimeUtc,
}

/// Lifecycle state of a reward
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum RewardStatus {
    /// Awaiting order completion
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Settled into a credit instrument
    #[sea_orm(string_value = "processed")]
    Processed,
}

/// Defines relationships between `RewardRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each reward belongs to one usage record
    #[sea_orm(
        belongs_to = "super::usage_record::Entity",
        from = "Column::UsageRecordId",
        to = "super::usage_record::Column::Id"
    )]
    UsageRecord,
}

impl Related<super::usage_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsageRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
