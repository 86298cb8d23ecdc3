//! Referral engine - validation, discount computation, redemption, settlement.
//!
//! The engine orchestrates the code registry and the two ledgers, and reaches
//! the commerce platform only through the collaborator ports in
//! [`crate::collab`]. Redemption (`apply`) is the critical transactional step:
//! the conditional usage-count increment and both ledger inserts run in one
//! database transaction, so a failed redemption leaves no partial rows and two
//! concurrent checkouts cannot overshoot a usage limit.

use crate::{
    collab::{CreditIssuer, Notifier, Orders, Users},
    config::settings::RewardPolicy,
    core::{code, reward, usage},
    entities::{DiscountType, referral_code, reward_record, usage_record},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::sync::Arc;
use tracing::{info, warn};

/// The referral engine and its injected collaborators.
pub struct Engine {
    db: DatabaseConnection,
    orders: Arc<dyn Orders>,
    users: Arc<dyn Users>,
    credits: Arc<dyn CreditIssuer>,
    notifier: Arc<dyn Notifier>,
    policy: RewardPolicy,
}

/// Outcome of a successful redemption.
#[derive(Debug, Clone)]
pub struct AppliedReferral {
    /// The appended usage ledger row
    pub usage: usage_record::Model,
    /// The pending reward created for the code owner
    pub reward: reward_record::Model,
}

impl Engine {
    /// Creates an engine over a database connection and collaborator set.
    pub fn new(
        db: DatabaseConnection,
        orders: Arc<dyn Orders>,
        users: Arc<dyn Users>,
        credits: Arc<dyn CreditIssuer>,
        notifier: Arc<dyn Notifier>,
        policy: RewardPolicy,
    ) -> Self {
        Self {
            db,
            orders,
            users,
            credits,
            notifier,
            policy,
        }
    }

    /// The engine's database connection, for registry and reporting queries.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Validates a code and returns its discount terms.
    ///
    /// Normalizes the input, requires an active code, and rejects codes whose
    /// usage cap is already reached. Absent and inactive codes are
    /// indistinguishable to the caller.
    pub async fn validate(&self, raw_code: &str) -> Result<referral_code::Model> {
        let found = code::lookup_active(&self.db, raw_code).await?;

        let Some(model) = found else {
            return Err(Error::CodeNotFound {
                code: raw_code.trim().to_uppercase(),
            });
        };

        if let Some(limit) = model.usage_limit
            && model.usage_count >= limit
        {
            return Err(Error::LimitExceeded { code: model.code });
        }

        Ok(model)
    }

    /// Applies a code to an order on behalf of `acting_user_id`.
    ///
    /// Re-validates the code (the cap may have moved since an earlier
    /// `validate` call), rejects self-referral and duplicate redemption, then
    /// in one transaction increments the usage count, appends the usage
    /// record, and creates the pending reward. Any failure rolls the whole
    /// redemption back.
    pub async fn apply(
        &self,
        raw_code: &str,
        order_id: i64,
        acting_user_id: i64,
    ) -> Result<AppliedReferral> {
        let model = self.validate(raw_code).await?;

        if model.owner_user_id == acting_user_id {
            return Err(Error::SelfReferral);
        }

        if usage::get_for_order(&self.db, order_id).await?.is_some() {
            return Err(Error::DuplicateRedemption { order_id });
        }

        let order_total = self
            .orders
            .total(order_id)
            .await?
            .ok_or(Error::OrderNotFound { order_id })?;

        let discount_amount = compute_discount(&model, order_total);

        let txn = self.db.begin().await?;

        // The conditional increment is the race guard: if another checkout
        // took the last slot since validation, this returns LimitExceeded and
        // the transaction unwinds with no ledger rows written.
        code::increment_usage(&txn, model.id).await?;

        let usage_row = usage::record(
            &txn,
            model.id,
            model.owner_user_id,
            acting_user_id,
            order_id,
            discount_amount,
            model.reward_value,
        )
        .await?;

        let reward_row = reward::create_pending(
            &txn,
            model.owner_user_id,
            usage_row.id,
            model.reward_type,
            model.reward_value,
        )
        .await?;

        txn.commit().await?;

        info!(
            code = %model.code,
            order_id,
            referee_id = acting_user_id,
            discount = discount_amount,
            "referral code applied"
        );

        Ok(AppliedReferral {
            usage: usage_row,
            reward: reward_row,
        })
    }

    /// Settles all pending rewards tied to a completed order.
    ///
    /// For each pending reward: mint a credit instrument sized per the reward
    /// type, mark the reward processed, and notify the recipient. A failure on
    /// one reward is logged and leaves that reward pending for a later retry;
    /// the rest of the batch still settles. Re-invoking for an order with no
    /// remaining pending rewards is a no-op.
    ///
    /// Returns the number of rewards settled by this invocation.
    pub async fn settle_order_rewards(&self, order_id: i64) -> Result<u64> {
        let pending = reward::list_pending_for_order(&self.db, order_id).await?;
        let mut settled = 0;

        for entry in pending {
            match self.settle_one(&entry).await {
                Ok(()) => settled += 1,
                Err(e) => {
                    warn!(
                        reward_id = entry.id,
                        order_id,
                        error = %e,
                        "reward settlement failed, leaving pending"
                    );
                }
            }
        }

        info!(order_id, settled, "order rewards settled");
        Ok(settled)
    }

    /// Settles a single pending reward: mint, mark processed, notify.
    async fn settle_one(&self, entry: &reward_record::Model) -> Result<()> {
        if !self.users.exists(entry.user_id).await? {
            return Err(Error::Collaborator {
                message: format!("reward recipient {} does not exist", entry.user_id),
            });
        }

        let instrument = entry.reward_type.instrument(
            entry.reward_value,
            entry.user_id,
            Utc::now(),
            self.policy.credit_expiry_days,
        );
        let coupon_code = instrument.coupon_code.clone();

        self.credits.mint(instrument).await?;

        // The conditional transition is the idempotency guard; a reward that
        // lost the race to another settlement run stops here.
        reward::mark_processed(&self.db, entry.id).await?;

        // Notification failure is not worth un-settling the reward over
        let body = format!(
            "Congratulations! You have received a referral reward of ${:.2} for referring \
             a customer. The reward has been added to your account as coupon {coupon_code}.",
            entry.reward_value
        );
        if let Err(e) = self
            .notifier
            .send(entry.user_id, "You received a referral reward!", &body)
            .await
        {
            warn!(reward_id = entry.id, error = %e, "reward notification failed");
        }

        Ok(())
    }
}

/// Computes the buyer's discount for a code against an order subtotal.
///
/// Percentage codes take `subtotal * value / 100`; fixed codes take the flat
/// value capped at the subtotal so an order total can never go negative.
#[must_use]
pub fn compute_discount(model: &referral_code::Model, subtotal: f64) -> f64 {
    let amount = match model.discount_type {
        DiscountType::Percentage => subtotal * model.discount_value / 100.0,
        DiscountType::Fixed => model.discount_value.min(subtotal),
    };
    amount.max(0.0)
}
