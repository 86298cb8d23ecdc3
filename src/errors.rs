//! Unified error types and result handling for the referral engine.
//!
//! Validation failures carry enough context to build a descriptive caller-facing
//! message; persistence and collaborator failures wrap the underlying error.

use thiserror::Error;

/// All errors the referral engine can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Code does not exist or is inactive
    #[error("Invalid or inactive referral code: {code}")]
    CodeNotFound {
        /// The normalized code that was looked up
        code: String,
    },

    /// No code row with this id (update/delete/increment target)
    #[error("Referral code id {id} not found")]
    CodeIdNotFound {
        /// The missing primary key
        id: i64,
    },

    /// Code has reached its usage cap
    #[error("Referral code usage limit exceeded: {code}")]
    LimitExceeded {
        /// The normalized code
        code: String,
    },

    /// Acting user owns the code being applied
    #[error("Cannot use your own referral code")]
    SelfReferral,

    /// Code string already exists (case-insensitive)
    #[error("Referral code already exists: {code}")]
    DuplicateCode {
        /// The normalized code
        code: String,
    },

    /// Code string is not uppercase alphanumeric after normalization
    #[error("Code must contain only letters and numbers: {code}")]
    InvalidFormat {
        /// The offending input, after uppercasing
        code: String,
    },

    /// Reward is not in pending state
    #[error("Reward {reward_id} has already been processed")]
    AlreadyProcessed {
        /// The reward primary key
        reward_id: i64,
    },

    /// Order already has a redemption recorded against it
    #[error("Order {order_id} already has a referral code applied")]
    DuplicateRedemption {
        /// The order in question
        order_id: i64,
    },

    /// Orders provider does not know this order
    #[error("Invalid order: {order_id}")]
    OrderNotFound {
        /// The unknown order id
        order_id: i64,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong while loading configuration
        message: String,
    },

    /// Collaborator port failure (credit issuer, notifier, users provider)
    #[error("Collaborator error: {message}")]
    Collaborator {
        /// Description from the failing port
        message: String,
    },

    /// Underlying persistence failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
