//! Collaborator ports - the seams between the referral engine and the hosting platform.
//!
//! The engine never talks to the commerce platform directly. Orders, users,
//! coupon minting, and notifications are reached through the traits below, and
//! the hosting application supplies adapters for its platform. This module also
//! ships in-memory adapters used by the development binary and the test suite.

use crate::entities::RewardType;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Shape of a minted credit instrument
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreditKind {
    /// Flat amount off the cart total
    FixedCart,
    /// Percentage off the cart total
    Percent,
}

/// A single-use discount voucher scoped to one user.
///
/// Produced by settling a pending reward; the `CreditIssuer` adapter turns it
/// into whatever the platform's coupon object looks like.
#[derive(Clone, Debug, PartialEq)]
pub struct CreditInstrument {
    /// Generated coupon code
    pub coupon_code: String,
    /// Flat or percentage discount
    pub kind: CreditKind,
    /// Monetary amount or percentage, per `kind`
    pub amount: f64,
    /// User the voucher is scoped to
    pub recipient_user_id: i64,
    /// When the voucher stops being redeemable
    pub expires_at: DateTime<Utc>,
}

impl RewardType {
    /// Builds the credit instrument for settling a reward of this type.
    ///
    /// Fixed and commission rewards become flat cart credits; percentage
    /// rewards become percentage-off vouchers. The coupon code embeds the
    /// recipient and issuance second, matching the voucher naming the store
    /// already uses.
    #[must_use]
    pub fn instrument(
        self,
        value: f64,
        recipient_user_id: i64,
        issued_at: DateTime<Utc>,
        expiry_days: i64,
    ) -> CreditInstrument {
        let ts = issued_at.timestamp();
        let (kind, coupon_code) = match self {
            Self::Fixed | Self::Commission => {
                (CreditKind::FixedCart, format!("REFERRAL_{recipient_user_id}_{ts}"))
            }
            Self::Percentage => {
                (CreditKind::Percent, format!("REFERRAL_PCT_{recipient_user_id}_{ts}"))
            }
        };

        CreditInstrument {
            coupon_code,
            kind,
            amount: value,
            recipient_user_id,
            expires_at: issued_at + Duration::days(expiry_days),
        }
    }
}

/// Order lookup port.
#[async_trait]
pub trait Orders: Send + Sync {
    /// Returns the order total, or None if the order does not exist.
    async fn total(&self, order_id: i64) -> Result<Option<f64>>;
}

/// User lookup port.
#[async_trait]
pub trait Users: Send + Sync {
    /// Whether a user with this id exists on the platform.
    async fn exists(&self, user_id: i64) -> Result<bool>;
}

/// Coupon/voucher minting port.
#[async_trait]
pub trait CreditIssuer: Send + Sync {
    /// Materializes the instrument on the platform.
    async fn mint(&self, instrument: CreditInstrument) -> Result<()>;
}

/// Notification delivery port.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers a message to a user. Transport is the adapter's business.
    async fn send(&self, user_id: i64, subject: &str, body: &str) -> Result<()>;
}

/// In-memory order store for local development and tests.
#[derive(Default)]
pub struct InMemoryOrders {
    totals: Mutex<HashMap<i64, f64>>,
}

impl InMemoryOrders {
    /// Creates an empty order store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an order with its total.
    ///
    /// # Panics
    /// Panics if the internal lock is poisoned.
    pub fn insert(&self, order_id: i64, total: f64) {
        #[allow(clippy::unwrap_used)]
        self.totals.lock().unwrap().insert(order_id, total);
    }
}

#[async_trait]
impl Orders for InMemoryOrders {
    async fn total(&self, order_id: i64) -> Result<Option<f64>> {
        #[allow(clippy::unwrap_used)]
        Ok(self.totals.lock().unwrap().get(&order_id).copied())
    }
}

/// Users adapter that accepts every positive user id.
///
/// Suitable for development; a real deployment backs this with the platform's
/// user store.
pub struct AllUsers;

#[async_trait]
impl Users for AllUsers {
    async fn exists(&self, user_id: i64) -> Result<bool> {
        Ok(user_id > 0)
    }
}

/// Credit issuer that records minted instruments and logs them.
#[derive(Default)]
pub struct RecordingCreditIssuer {
    minted: Mutex<Vec<CreditInstrument>>,
}

impl RecordingCreditIssuer {
    /// Creates an issuer with no minted instruments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything minted so far.
    ///
    /// # Panics
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn minted(&self) -> Vec<CreditInstrument> {
        #[allow(clippy::unwrap_used)]
        self.minted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CreditIssuer for RecordingCreditIssuer {
    async fn mint(&self, instrument: CreditInstrument) -> Result<()> {
        tracing::info!(
            coupon = %instrument.coupon_code,
            user_id = instrument.recipient_user_id,
            amount = instrument.amount,
            "minted credit instrument"
        );
        #[allow(clippy::unwrap_used)]
        self.minted.lock().unwrap().push(instrument);
        Ok(())
    }
}

/// Notifier that records sent messages and logs them.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i64, String)>>,
}

impl RecordingNotifier {
    /// Creates a notifier with no sent messages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(user_id, subject)` pairs for every delivered message.
    ///
    /// # Panics
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<(i64, String)> {
        #[allow(clippy::unwrap_used)]
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, user_id: i64, subject: &str, body: &str) -> Result<()> {
        tracing::info!(user_id, subject, body, "reward notification");
        #[allow(clippy::unwrap_used)]
        self.sent.lock().unwrap().push((user_id, subject.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_fixed_reward_builds_flat_credit() {
        let issued = Utc::now();
        let credit = RewardType::Fixed.instrument(25.0, 7, issued, 365);

        assert_eq!(credit.kind, CreditKind::FixedCart);
        assert_eq!(credit.amount, 25.0);
        assert_eq!(credit.recipient_user_id, 7);
        assert!(credit.coupon_code.starts_with("REFERRAL_7_"));
        assert_eq!(credit.expires_at, issued + Duration::days(365));
    }

    #[test]
    fn test_commission_reward_builds_flat_credit() {
        let credit = RewardType::Commission.instrument(10.0, 3, Utc::now(), 30);
        assert_eq!(credit.kind, CreditKind::FixedCart);
        assert!(credit.coupon_code.starts_with("REFERRAL_3_"));
    }

    #[test]
    fn test_percentage_reward_builds_percent_credit() {
        let credit = RewardType::Percentage.instrument(15.0, 9, Utc::now(), 365);
        assert_eq!(credit.kind, CreditKind::Percent);
        assert_eq!(credit.amount, 15.0);
        assert!(credit.coupon_code.starts_with("REFERRAL_PCT_9_"));
    }

    #[tokio::test]
    async fn test_in_memory_orders() -> Result<()> {
        let orders = InMemoryOrders::new();
        orders.insert(42, 199.99);

        assert_eq!(orders.total(42).await?, Some(199.99));
        assert_eq!(orders.total(43).await?, None);
        Ok(())
    }
}
