//! Code registry business logic - Handles all referral-code operations.
//!
//! Provides functions for creating, retrieving, updating, and deleting referral
//! codes, plus the atomic usage-count increment that enforces the usage cap.
//! Codes are stored normalized to uppercase; lookups normalize their input so
//! matching is case-insensitive. All functions are async and return Result
//! types for error handling.

use crate::{
    entities::{
        CodeStatus, DiscountType, ReferralCode, RewardType,
        referral_code::{self, Column},
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, sea_query::Expr,
};

/// Maximum length of a code string, matching the column width.
pub const MAX_CODE_LEN: usize = 20;

/// Normalizes a raw code to its stored form and validates the format.
///
/// Input is trimmed and uppercased; the result must be non-empty, at most
/// [`MAX_CODE_LEN`] characters, and contain only A-Z and 0-9.
pub fn normalize_code(raw: &str) -> Result<String> {
    let code = raw.trim().to_uppercase();

    if code.is_empty()
        || code.len() > MAX_CODE_LEN
        || !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(Error::InvalidFormat { code });
    }

    Ok(code)
}

/// Fields accepted by a partial code update.
///
/// The code string itself is immutable once created so shared referral links
/// keep working. `usage_limit` is doubly optional: the outer level says whether
/// to touch the column, the inner level is the new value (None = unlimited).
#[derive(Debug, Default, Clone)]
pub struct CodeUpdate {
    /// New discount mode
    pub discount_type: Option<DiscountType>,
    /// New discount value
    pub discount_value: Option<f64>,
    /// New reward mode
    pub reward_type: Option<RewardType>,
    /// New reward value
    pub reward_value: Option<f64>,
    /// New usage cap (inner None clears the cap)
    pub usage_limit: Option<Option<i64>>,
    /// New status
    pub status: Option<CodeStatus>,
}

impl CodeUpdate {
    /// Whether the update names any field at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.discount_type.is_none()
            && self.discount_value.is_none()
            && self.reward_type.is_none()
            && self.reward_value.is_none()
            && self.usage_limit.is_none()
            && self.status.is_none()
    }
}

/// Creates a new referral code, normalizing and validating the code string.
///
/// Fails with `InvalidFormat` when the code is not alphanumeric after
/// uppercasing, and with `DuplicateCode` when the normalized code already
/// exists. Discount and reward values must be non-negative, and the usage
/// limit, when given, must be positive.
pub async fn create_code(
    db: &DatabaseConnection,
    raw_code: &str,
    owner_user_id: i64,
    discount_type: DiscountType,
    discount_value: f64,
    reward_type: RewardType,
    reward_value: f64,
    usage_limit: Option<i64>,
    status: CodeStatus,
) -> Result<referral_code::Model> {
    let code = normalize_code(raw_code)?;

    if discount_value < 0.0 || !discount_value.is_finite() {
        return Err(Error::Config {
            message: format!("Discount value must be non-negative, got {discount_value}"),
        });
    }
    if reward_value < 0.0 || !reward_value.is_finite() {
        return Err(Error::Config {
            message: format!("Reward value must be non-negative, got {reward_value}"),
        });
    }
    if let Some(limit) = usage_limit
        && limit <= 0
    {
        return Err(Error::Config {
            message: format!("Usage limit must be positive, got {limit}"),
        });
    }

    // Stored codes are already uppercase, so equality here is the
    // case-insensitive check.
    let existing = ReferralCode::find()
        .filter(Column::Code.eq(code.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::DuplicateCode { code });
    }

    let now = Utc::now();
    let model = referral_code::ActiveModel {
        code: Set(code),
        owner_user_id: Set(owner_user_id),
        discount_type: Set(discount_type),
        discount_value: Set(discount_value),
        reward_type: Set(reward_type),
        reward_value: Set(reward_value),
        usage_limit: Set(usage_limit),
        usage_count: Set(0),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let result = model.insert(db).await?;
    Ok(result)
}

/// Finds an active code by its string, case-insensitively.
///
/// Inactive codes are not returned; callers treat None the same as a code
/// that never existed.
pub async fn lookup_active<C>(db: &C, raw_code: &str) -> Result<Option<referral_code::Model>>
where
    C: ConnectionTrait,
{
    let code = match normalize_code(raw_code) {
        Ok(code) => code,
        // A malformed string can never match a stored code
        Err(Error::InvalidFormat { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };

    ReferralCode::find()
        .filter(Column::Code.eq(code))
        .filter(Column::Status.eq(CodeStatus::Active))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a code by its unique ID regardless of status.
pub async fn get_code_by_id(
    db: &DatabaseConnection,
    id: i64,
) -> Result<Option<referral_code::Model>> {
    ReferralCode::find_by_id(id).one(db).await.map_err(Into::into)
}

/// Applies a partial update to a code.
///
/// Only the fields named in `update` are touched; the code string and usage
/// count are never modified here. Returns the updated model.
pub async fn update_code(
    db: &DatabaseConnection,
    id: i64,
    update: CodeUpdate,
) -> Result<referral_code::Model> {
    let existing = ReferralCode::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::CodeIdNotFound { id })?;

    let mut model: referral_code::ActiveModel = existing.into();

    if let Some(discount_type) = update.discount_type {
        model.discount_type = Set(discount_type);
    }
    if let Some(discount_value) = update.discount_value {
        model.discount_value = Set(discount_value);
    }
    if let Some(reward_type) = update.reward_type {
        model.reward_type = Set(reward_type);
    }
    if let Some(reward_value) = update.reward_value {
        model.reward_value = Set(reward_value);
    }
    if let Some(usage_limit) = update.usage_limit {
        model.usage_limit = Set(usage_limit);
    }
    if let Some(status) = update.status {
        model.status = Set(status);
    }
    model.updated_at = Set(Utc::now());

    model.update(db).await.map_err(Into::into)
}

/// Hard-deletes a code.
///
/// Usage and reward ledger rows referencing the code are intentionally left in
/// place as an audit trail.
pub async fn delete_code(db: &DatabaseConnection, id: i64) -> Result<()> {
    let existing = ReferralCode::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::CodeIdNotFound { id })?;

    existing.delete(db).await?;
    Ok(())
}

/// Atomically increments a code's usage count, enforcing the usage cap.
///
/// This is the check-then-act race guard from the redemption path: instead of
/// reading the count and writing it back, a single conditional UPDATE
/// increments only while the cap is not reached:
/// `usage_count = usage_count + 1 WHERE id = ? AND (usage_limit IS NULL OR
/// usage_count < usage_limit)`. Zero affected rows means the cap was hit by a
/// concurrent redemption and the caller must abort.
pub async fn increment_usage<C>(db: &C, id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let code = ReferralCode::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::CodeIdNotFound { id })?;

    let result = ReferralCode::update_many()
        .col_expr(Column::UsageCount, Expr::col(Column::UsageCount).add(1))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id))
        .filter(
            Condition::any()
                .add(Column::UsageLimit.is_null())
                .add(Expr::col(Column::UsageCount).lt(Expr::col(Column::UsageLimit))),
        )
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::LimitExceeded { code: code.code });
    }

    Ok(())
}

/// Lists codes for administrative reporting, newest first, with pagination.
///
/// An optional search term filters on the code string. Returns the page of
/// rows plus the total row count for the filter.
pub async fn list_codes(
    db: &DatabaseConnection,
    search: Option<&str>,
    page: u64,
    per_page: u64,
) -> Result<(Vec<referral_code::Model>, u64)> {
    let mut query = ReferralCode::find();

    if let Some(term) = search {
        let term = term.trim().to_uppercase();
        if !term.is_empty() {
            query = query.filter(Column::Code.contains(&term));
        }
    }

    let paginator = query
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .paginate(db, per_page.max(1));

    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

    Ok((rows, total))
}
