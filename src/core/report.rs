//! Referral statistics - per-user reporting over the two ledgers.
//!
//! Produces the stats object served by the user-facing stats endpoint: how
//! many referrals a user has driven, their reward totals split by settlement
//! state, and their most recent usage events.

use crate::{
    core::{reward, usage},
    entities::usage_record,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// Number of recent usage events included in a stats report.
const RECENT_REFERRALS_LIMIT: u64 = 10;

/// A user's referral activity summary.
#[derive(Debug, Clone, Serialize)]
pub struct ReferralStats {
    /// Number of redemptions of the user's codes
    pub total_referrals: u64,
    /// Sum of all reward values owed to the user
    pub total_rewards: f64,
    /// Sum of rewards awaiting settlement
    pub pending_rewards: f64,
    /// Sum of settled rewards
    pub processed_rewards: f64,
    /// Most recent usage events, newest first
    pub recent_referrals: Vec<usage_record::Model>,
}

/// Builds the referral stats for a user.
pub async fn user_stats(db: &DatabaseConnection, user_id: i64) -> Result<ReferralStats> {
    let total_referrals = usage::count_for_referrer(db, user_id).await?;
    let totals = reward::aggregate_for_user(db, user_id).await?;
    let recent_referrals = usage::list_for_referrer(db, user_id, RECENT_REFERRALS_LIMIT).await?;

    Ok(ReferralStats {
        total_referrals,
        total_rewards: totals.total,
        pending_rewards: totals.pending_total,
        processed_rewards: totals.processed_total,
        recent_referrals,
    })
}
