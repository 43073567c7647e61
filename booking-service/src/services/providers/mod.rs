//! Payment processor abstraction.
//!
//! The booking engine and the adoption checkout only talk to a
//! [`PaymentGateway`]; the Stripe client is the production backend and the
//! mock is used in tests.

pub mod mock;
pub mod stripe;

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

pub use mock::MockPaymentGateway;
pub use stripe::StripeClient;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment processor not configured")]
    NotConfigured,

    #[error("Payment rejected: {0}")]
    Rejected(String),

    #[error("Payment processor timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Payment processor returned no client secret")]
    MissingClientSecret,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unexpected processor response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PaymentError::Timeout
        } else {
            PaymentError::Network(err.to_string())
        }
    }
}

/// Request for a new payment authorization.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationRequest {
    /// Amount in minor units (cents).
    pub amount_minor: i64,
    /// Lowercase ISO currency code.
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
    /// Retries with the same key never create a second authorization.
    pub idempotency_key: String,
}

/// A created authorization: the reference we store and the secret the client
/// uses to complete payment.
#[derive(Debug, Clone)]
pub struct PaymentAuthorization {
    pub id: String,
    pub client_secret: String,
}

/// Processor-side view of an authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDetails {
    pub id: String,
    pub status: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_authorization(
        &self,
        request: AuthorizationRequest,
    ) -> Result<PaymentAuthorization, PaymentError>;

    async fn retrieve_authorization(
        &self,
        authorization_id: &str,
    ) -> Result<AuthorizationDetails, PaymentError>;

    /// Whether credentials are present.
    fn is_configured(&self) -> bool;
}
