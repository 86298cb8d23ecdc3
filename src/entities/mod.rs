//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod referral_code;
pub mod reward_record;
pub mod usage_record;

// Re-export specific types to avoid conflicts
pub use referral_code::{
    CodeStatus, Column as ReferralCodeColumn, DiscountType, Entity as ReferralCode,
    Model as ReferralCodeModel, RewardType,
};
pub use reward_record::{
    Column as RewardRecordColumn, Entity as RewardRecord, Model as RewardRecordModel, RewardStatus,
};
pub use usage_record::{
    Column as UsageRecordColumn, Entity as UsageRecord, Model as UsageRecordModel,
};
