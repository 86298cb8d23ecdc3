//! Shopper-facing endpoints: code validation, application, and user stats.

use super::{ApiError, AppState, Envelope, Identity};
use crate::core::report;
use crate::entities::DiscountType;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

/// Body of `POST /referral/validate` and `POST /referral/apply`.
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    /// The code as the shopper typed it
    pub code: String,
}

/// Body of `POST /referral/apply`.
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    /// The code as the shopper typed it
    pub code: String,
    /// Order the code is applied to
    pub order_id: i64,
}

/// Discount terms returned by a successful validation.
#[derive(Debug, Serialize)]
pub struct ValidatedTerms {
    /// The normalized code string
    pub code: String,
    /// Discount mode
    pub discount_type: DiscountType,
    /// Discount value
    pub discount_value: f64,
    /// Redemptions so far
    pub usage_count: i64,
    /// Usage cap, None for unlimited
    pub usage_limit: Option<i64>,
}

/// `POST /referral/validate` - public check of a code's validity and terms.
pub async fn validate(
    State(state): State<AppState>,
    Json(body): Json<ValidateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let model = state.engine.validate(&body.code).await?;

    Ok(Json(Envelope::success(ValidatedTerms {
        code: model.code,
        discount_type: model.discount_type,
        discount_value: model.discount_value,
        usage_count: model.usage_count,
        usage_limit: model.usage_limit,
    })))
}

/// `POST /referral/apply` - applies a code to an order for the logged-in user.
pub async fn apply(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<ApplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity.require_user()?;

    state.engine.apply(&body.code, body.order_id, user_id).await?;

    Ok(Json(Envelope::<()>::message(
        "Referral code applied successfully".to_string(),
    )))
}

/// `GET /referral/stats/{user_id}` - referral statistics, self or admin only.
pub async fn stats(
    State(state): State<AppState>,
    identity: Identity,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_self_or_admin(user_id)?;

    let stats = report::user_stats(&state.db, user_id).await?;
    Ok(Json(Envelope::success(stats)))
}
