//! Usage record entity - Append-only ledger of code redemptions.
//!
//! One row per successful redemption of a code against an order, capturing the
//! discount granted to the buyer and the reward value owed to the referrer at
//! the time of use. Rows are never updated or deleted; `order_id` carries a
//! unique key so an order can redeem at most one code.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Usage record database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usage_records")]
pub struct Model {
    /// Unique identifier for the usage event
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The redeemed referral code
    pub referral_code_id: i64,
    /// Code owner at the time of use
    pub referrer_id: i64,
    /// User who redeemed the code, 0 for guest checkout
    pub referee_id: i64,
    /// Order the code was applied to, at most one redemption per order
    #[sea_orm(unique)]
    pub order_id: i64,
    /// Discount granted to the buyer, computed from the order total
    pub discount_amount: f64,
    /// Reward value copied from the code at the time of use
    pub reward_amount: f64,
    /// When the redemption happened
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `UsageRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each usage record belongs to one referral code
    #[sea_orm(
        belongs_to = "super::referral_code::Entity",
        from = "Column::ReferralCodeId",
        to = "super::referral_code::Column::Id"
    )]
    ReferralCode,
    /// One usage record has reward records created against it
    #[sea_orm(has_many = "super::reward_record::Entity")]
    RewardRecords,
}

impl Related<super::referral_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReferralCode.def()
    }
}

impl Related<super::reward_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RewardRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
