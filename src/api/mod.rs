//! HTTP API layer - JSON endpoints under the `/referral` namespace.
//!
//! Thin axum handlers over the core modules: request parsing, identity
//! checks, and response shaping live here; all business rules stay in `core`.
//! Responses use the `{success, data?, message?, pagination?}` envelope the
//! storefront clients already consume.
//!
//! Authentication is owned by the fronting platform, which injects
//! `x-user-id` and `x-user-role` headers; this layer only enforces
//! authorization (logged-in for apply, self-or-admin for stats, admin for
//! registry management).

/// Code registry and ledger administration endpoints
pub mod admin;
/// Public and shopper-facing endpoints (validate, apply, stats)
pub mod referral;

use crate::core::Engine;
use crate::errors::Error;
use axum::{
    Router,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection for registry and reporting queries
    pub db: DatabaseConnection,
    /// The referral engine with its collaborator ports
    pub engine: Arc<Engine>,
}

/// Builds the `/referral` router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/referral/validate", post(referral::validate))
        .route("/referral/apply", post(referral::apply))
        .route("/referral/stats/:user_id", get(referral::stats))
        .route("/referral/create", post(admin::create_code))
        .route("/referral/codes", get(admin::list_codes))
        .route(
            "/referral/codes/:id",
            put(admin::update_code).delete(admin::delete_code),
        )
        .route("/referral/usage", get(admin::list_usage))
        .route(
            "/referral/orders/:order_id/complete",
            post(admin::complete_order),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Caller identity as asserted by the fronting platform.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    /// Authenticated user id, None for anonymous requests
    pub user_id: Option<i64>,
    /// Whether the platform granted the admin role
    pub is_admin: bool,
}

impl Identity {
    /// Requires a logged-in caller.
    pub fn require_user(self) -> Result<i64, ApiError> {
        self.user_id.ok_or(ApiError::Unauthorized)
    }

    /// Requires the admin role.
    pub fn require_admin(self) -> Result<(), ApiError> {
        if self.is_admin { Ok(()) } else { Err(ApiError::Forbidden) }
    }

    /// Requires the caller to be `user_id` themselves, or an admin.
    pub fn require_self_or_admin(self, user_id: i64) -> Result<(), ApiError> {
        if self.is_admin || self.user_id == Some(user_id) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        let is_admin = parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.eq_ignore_ascii_case("admin"));

        Ok(Self { user_id, is_admin })
    }
}

/// Handler-level error, carrying either a domain error or an auth rejection.
#[derive(Debug)]
pub enum ApiError {
    /// A domain error from the core modules
    Domain(Error),
    /// Caller is not logged in
    Unauthorized,
    /// Caller lacks the required role
    Forbidden,
}

impl From<Error> for ApiError {
    fn from(value: Error) -> Self {
        Self::Domain(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required".to_string()),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions".to_string()),
            Self::Domain(e) => {
                let status = match &e {
                    Error::CodeNotFound { .. } | Error::CodeIdNotFound { .. } => {
                        StatusCode::NOT_FOUND
                    }
                    Error::DuplicateCode { .. } => StatusCode::CONFLICT,
                    Error::LimitExceeded { .. }
                    | Error::SelfReferral
                    | Error::InvalidFormat { .. }
                    | Error::AlreadyProcessed { .. }
                    | Error::DuplicateRedemption { .. }
                    | Error::OrderNotFound { .. }
                    | Error::Config { .. } => StatusCode::BAD_REQUEST,
                    Error::Collaborator { .. }
                    | Error::Database(_)
                    | Error::Io(_)
                    | Error::EnvVar(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };

                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    // Internal detail goes to the log, not the client
                    error!(error = %e, "request failed");
                    (status, "Internal server error".to_string())
                } else {
                    (status, e.to_string())
                }
            }
        };

        (status, axum::Json(Envelope::<()>::failure(message))).into_response()
    }
}

/// The `{success, data?, message?}` response envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    /// Whether the request succeeded
    pub success: bool,
    /// Payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    /// A success envelope with a payload.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// A success envelope with only a message.
    pub fn message(message: String) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message),
        }
    }

    /// A failure envelope.
    pub fn failure(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

/// Pagination block for listing endpoints.
#[derive(Debug, Serialize)]
pub struct Pagination {
    /// Total rows matching the filter
    pub total: u64,
    /// Requested page, 1-based
    pub page: u64,
    /// Page size
    pub per_page: u64,
    /// Number of pages for this filter
    pub total_pages: u64,
}

impl Pagination {
    /// Builds the block from the query result and request parameters.
    ///
    /// A zero `per_page` is treated as 1, matching the clamp the listing
    /// queries apply, so the reported page size always agrees with the rows
    /// returned.
    #[must_use]
    pub const fn new(total: u64, page: u64, per_page: u64) -> Self {
        let per_page = if per_page == 0 { 1 } else { per_page };
        Self {
            total,
            page,
            per_page,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// Envelope for paginated listings.
#[derive(Debug, Serialize)]
pub struct PageEnvelope<T: Serialize> {
    /// Whether the request succeeded
    pub success: bool,
    /// The page of rows
    pub data: Vec<T>,
    /// Pagination block
    pub pagination: Pagination,
}

impl<T: Serialize> PageEnvelope<T> {
    /// A success envelope with rows and pagination.
    pub fn new(data: Vec<T>, pagination: Pagination) -> Self {
        Self {
            success: true,
            data,
            pagination,
        }
    }
}
