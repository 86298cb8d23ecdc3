//! Referral code entity - Represents a shareable discount/reward code.
//!
//! Each code has an owner, discount terms applied to the buyer, reward terms
//! accrued to the owner, an optional usage cap, and an active/inactive status.
//! The `code` column is stored normalized to uppercase and carries a unique key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Referral code database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referral_codes")]
pub struct Model {
    /// Unique identifier for the referral code
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The code string, uppercase alphanumeric, unique across the table
    #[sea_orm(unique)]
    pub code: String,
    /// User who owns the code and earns its rewards
    pub owner_user_id: i64,
    /// How the buyer's discount is computed
    pub discount_type: DiscountType,
    /// Discount value: percent for `Percentage`, flat amount for `Fixed`
    pub discount_value: f64,
    /// How the owner's reward is settled
    pub reward_type: RewardType,
    /// Reward value, interpreted per `reward_type`
    pub reward_value: f64,
    /// Maximum number of redemptions, None for unlimited
    pub usage_limit: Option<i64>,
    /// Number of successful redemptions so far
    pub usage_count: i64,
    /// Whether the code can currently be redeemed
    pub status: CodeStatus,
    /// When the code was created
    pub created_at: DateTimeUtc,
    /// When the code was last modified
    pub updated_at: DateTimeUtc,
}

/// Discount computation mode for a referral code
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Discount is `subtotal * discount_value / 100`
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// Discount is `discount_value`, capped at the subtotal
    #[sea_orm(string_value = "fixed")]
    Fixed,
}

/// Reward settlement mode for the code owner
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
    /// Flat monetary credit
    #[sea_orm(string_value = "fixed")]
    Fixed,
    /// Percentage-off credit
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// Flat monetary credit earned as commission
    #[sea_orm(string_value = "commission")]
    Commission,
}

/// Whether a code is currently redeemable
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum CodeStatus {
    /// Code can be validated and applied
    #[sea_orm(string_value = "active")]
    Active,
    /// Code is hidden from lookup and cannot be applied
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

/// Defines relationships between `ReferralCode` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One code has many usage records
    #[sea_orm(has_many = "super::usage_record::Entity")]
    UsageRecords,
}

impl Related<super::usage_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsageRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
