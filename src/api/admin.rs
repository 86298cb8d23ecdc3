//! Administrative endpoints: code registry management, ledger reporting, and
//! the order-completed settlement hook.

use super::{ApiError, AppState, Envelope, Identity, PageEnvelope, Pagination};
use crate::core::{code, usage};
use crate::entities::{CodeStatus, DiscountType, RewardType, referral_code, usage_record};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Body of `POST /referral/create`.
#[derive(Debug, Deserialize)]
pub struct CreateCodeRequest {
    /// The code string, normalized server-side
    pub code: String,
    /// Owner who earns the rewards
    pub user_id: i64,
    /// Discount mode, defaults to percentage
    #[serde(default = "default_discount_type")]
    pub discount_type: DiscountType,
    /// Discount value
    #[serde(default)]
    pub discount_value: f64,
    /// Reward mode, defaults to fixed
    #[serde(default = "default_reward_type")]
    pub reward_type: RewardType,
    /// Reward value
    #[serde(default)]
    pub reward_value: f64,
    /// Optional usage cap
    #[serde(default)]
    pub usage_limit: Option<i64>,
    /// Initial status, defaults to active
    #[serde(default = "default_status")]
    pub status: CodeStatus,
}

const fn default_discount_type() -> DiscountType {
    DiscountType::Percentage
}

const fn default_reward_type() -> RewardType {
    RewardType::Fixed
}

const fn default_status() -> CodeStatus {
    CodeStatus::Active
}

/// Body of `PUT /referral/codes/{id}`. Absent fields are left untouched;
/// `"usage_limit": null` clears the cap.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCodeRequest {
    /// New discount mode
    pub discount_type: Option<DiscountType>,
    /// New discount value
    pub discount_value: Option<f64>,
    /// New reward mode
    pub reward_type: Option<RewardType>,
    /// New reward value
    pub reward_value: Option<f64>,
    /// New usage cap; outer level = field present, inner = value
    #[serde(default, deserialize_with = "double_option")]
    pub usage_limit: Option<Option<i64>>,
    /// New status
    pub status: Option<CodeStatus>,
}

// Distinguishes an absent field from an explicit null.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Query parameters for the listing endpoints.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Requested page, 1-based
    #[serde(default = "default_page")]
    pub page: u64,
    /// Page size
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Optional code search term
    pub search: Option<String>,
}

const fn default_page() -> u64 {
    1
}

const fn default_per_page() -> u64 {
    20
}

/// Payload returned by `POST /referral/create`.
#[derive(Debug, Serialize)]
pub struct CreatedCode {
    /// Primary key of the new code
    pub id: i64,
}

/// `POST /referral/create` - admin-creates a referral code.
pub async fn create_code(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CreateCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin()?;

    let model = code::create_code(
        &state.db,
        &body.code,
        body.user_id,
        body.discount_type,
        body.discount_value,
        body.reward_type,
        body.reward_value,
        body.usage_limit,
        body.status,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(CreatedCode { id: model.id })),
    ))
}

/// `GET /referral/codes` - paginated code listing with optional search.
pub async fn list_codes(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin()?;

    // Clamped here so the envelope reports the page size actually queried
    let per_page = query.per_page.max(1);
    let (rows, total) =
        code::list_codes(&state.db, query.search.as_deref(), query.page, per_page).await?;

    Ok(Json(PageEnvelope::<referral_code::Model>::new(
        rows,
        Pagination::new(total, query.page, per_page),
    )))
}

/// `PUT /referral/codes/{id}` - partial update of a code's terms.
pub async fn update_code(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin()?;

    let update = code::CodeUpdate {
        discount_type: body.discount_type,
        discount_value: body.discount_value,
        reward_type: body.reward_type,
        reward_value: body.reward_value,
        usage_limit: body.usage_limit,
        status: body.status,
    };

    if update.is_empty() {
        return Err(ApiError::Domain(crate::errors::Error::Config {
            message: "No valid fields to update".to_string(),
        }));
    }

    code::update_code(&state.db, id, update).await?;

    Ok(Json(Envelope::<()>::message(
        "Referral code updated successfully".to_string(),
    )))
}

/// `DELETE /referral/codes/{id}` - hard-deletes a code, ledgers untouched.
pub async fn delete_code(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin()?;

    code::delete_code(&state.db, id).await?;

    Ok(Json(Envelope::<()>::message(
        "Referral code deleted successfully".to_string(),
    )))
}

/// `GET /referral/usage` - paginated usage ledger for reporting.
pub async fn list_usage(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin()?;

    let per_page = query.per_page.max(1);
    let (rows, total) = usage::paginated_list(&state.db, query.page, per_page).await?;

    Ok(Json(PageEnvelope::<usage_record::Model>::new(
        rows,
        Pagination::new(total, query.page, per_page),
    )))
}

/// Payload returned by the settlement hook.
#[derive(Debug, Serialize)]
pub struct SettlementOutcome {
    /// Rewards settled by this invocation
    pub settled: u64,
}

/// `POST /referral/orders/{order_id}/complete` - order-completed hook.
///
/// Called by the platform when an order transitions to completed; settles all
/// pending rewards tied to the order. Safe to re-invoke.
pub async fn complete_order(
    State(state): State<AppState>,
    identity: Identity,
    Path(order_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_admin()?;

    let settled = state.engine.settle_order_rewards(order_id).await?;

    Ok(Json(Envelope::success(SettlementOutcome { settled })))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::api::test_helpers::setup_app;
    use crate::errors::Result;
    use crate::test_utils::create_test_code;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn admin_request(method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-user-id", "1")
            .header("x-user-role", "admin");
        match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_code_requires_admin() -> Result<()> {
        let (app, _harness) = setup_app().await?;

        let request = Request::builder()
            .method("POST")
            .uri("/referral/create")
            .header(CONTENT_TYPE, "application/json")
            .header("x-user-id", "8")
            .body(Body::from(r#"{"code":"SAVE10","user_id":5}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_code_returns_201_with_id() -> Result<()> {
        let (app, _harness) = setup_app().await?;

        let response = app
            .oneshot(admin_request(
                "POST",
                "/referral/create",
                Some(
                    r#"{"code":"save10","user_id":5,"discount_type":"percentage",
                        "discount_value":10.0,"reward_type":"fixed","reward_value":5.0}"#,
                ),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert!(json["data"]["id"].as_i64().unwrap() > 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_duplicate_is_409() -> Result<()> {
        let (app, harness) = setup_app().await?;
        create_test_code(harness.db(), "SAVE10", 5).await?;

        let response = app
            .oneshot(admin_request(
                "POST",
                "/referral/create",
                Some(r#"{"code":"save10","user_id":6}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_invalid_format_is_400() -> Result<()> {
        let (app, _harness) = setup_app().await?;

        let response = app
            .oneshot(admin_request(
                "POST",
                "/referral/create",
                Some(r#"{"code":"BAD CODE!","user_id":5}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_codes_with_pagination_envelope() -> Result<()> {
        let (app, harness) = setup_app().await?;
        create_test_code(harness.db(), "SPRING1", 1).await?;
        create_test_code(harness.db(), "SPRING2", 2).await?;
        create_test_code(harness.db(), "WINTER1", 3).await?;

        let response = app
            .clone()
            .oneshot(admin_request(
                "GET",
                "/referral/codes?page=1&per_page=2",
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
        assert_eq!(json["pagination"]["total"], 3);
        assert_eq!(json["pagination"]["total_pages"], 2);

        // Search narrows the listing
        let response = app
            .oneshot(admin_request("GET", "/referral/codes?search=spring", None))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["pagination"]["total"], 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_codes_zero_per_page_clamps_to_one() -> Result<()> {
        let (app, harness) = setup_app().await?;
        create_test_code(harness.db(), "SPRING1", 1).await?;
        create_test_code(harness.db(), "SPRING2", 2).await?;

        let response = app
            .oneshot(admin_request("GET", "/referral/codes?per_page=0", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        // The envelope reports the page size the query actually used
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["pagination"]["per_page"], 1);
        assert_eq!(json["pagination"]["total_pages"], 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_code_partial_and_empty() -> Result<()> {
        let (app, harness) = setup_app().await?;
        let created = create_test_code(harness.db(), "SAVE10", 5).await?;

        let uri = format!("/referral/codes/{}", created.id);
        let response = app
            .clone()
            .oneshot(admin_request("PUT", &uri, Some(r#"{"status":"inactive"}"#)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let stored = crate::core::code::get_code_by_id(harness.db(), created.id)
            .await?
            .unwrap();
        assert_eq!(stored.status, crate::entities::CodeStatus::Inactive);

        // An update naming no fields is rejected
        let response = app
            .oneshot(admin_request("PUT", &uri, Some("{}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_code_is_404() -> Result<()> {
        let (app, _harness) = setup_app().await?;

        let response = app
            .oneshot(admin_request(
                "PUT",
                "/referral/codes/999",
                Some(r#"{"status":"inactive"}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_code_preserves_ledger() -> Result<()> {
        let (app, harness) = setup_app().await?;
        let created = create_test_code(harness.db(), "SAVE10", 5).await?;
        harness.orders.insert(1001, 200.0);
        harness.engine.apply("SAVE10", 1001, 8).await?;

        let uri = format!("/referral/codes/{}", created.id);
        let response = app
            .oneshot(admin_request("DELETE", &uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Code is gone, the audit trail stays
        assert!(
            crate::core::code::get_code_by_id(harness.db(), created.id)
                .await?
                .is_none()
        );
        let (rows, total) = crate::core::usage::paginated_list(harness.db(), 1, 10).await?;
        assert_eq!(total, 1);
        assert_eq!(rows[0].referral_code_id, created.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_usage() -> Result<()> {
        let (app, harness) = setup_app().await?;
        create_test_code(harness.db(), "SAVE10", 5).await?;
        harness.orders.insert(1001, 200.0);
        harness.engine.apply("SAVE10", 1001, 8).await?;

        let response = app
            .oneshot(admin_request("GET", "/referral/usage", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"][0]["order_id"], 1001);
        assert_eq!(json["pagination"]["total"], 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_order_settles_and_is_idempotent() -> Result<()> {
        let (app, harness) = setup_app().await?;
        create_test_code(harness.db(), "SAVE10", 5).await?;
        harness.orders.insert(1001, 200.0);
        harness.engine.apply("SAVE10", 1001, 8).await?;

        let response = app
            .clone()
            .oneshot(admin_request("POST", "/referral/orders/1001/complete", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["settled"], 1);

        // Second invocation settles nothing further
        let response = app
            .oneshot(admin_request("POST", "/referral/orders/1001/complete", None))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["settled"], 0);
        assert_eq!(harness.credits.minted().len(), 1);

        Ok(())
    }
}
