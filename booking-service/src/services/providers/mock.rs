//! In-process payment gateway for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{
    AuthorizationDetails, AuthorizationRequest, PaymentAuthorization, PaymentError,
    PaymentGateway,
};

/// Mock gateway. Authorizations are keyed by idempotency key, so a retried
/// request returns the authorization it created the first time.
#[derive(Default)]
pub struct MockPaymentGateway {
    fail: AtomicBool,
    authorizations: Mutex<HashMap<String, (AuthorizationRequest, PaymentAuthorization)>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that rejects every authorization.
    pub fn failing() -> Self {
        let gateway = Self::default();
        gateway.set_failing(true);
        gateway
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Requests seen so far, in no particular order.
    pub fn requests(&self) -> Vec<AuthorizationRequest> {
        self.authorizations
            .lock()
            .map(|map| map.values().map(|(req, _)| req.clone()).collect())
            .unwrap_or_default()
    }

    /// Authorization created for an idempotency key.
    pub fn authorization_for(&self, idempotency_key: &str) -> Option<PaymentAuthorization> {
        self.authorizations
            .lock()
            .ok()?
            .get(idempotency_key)
            .map(|(_, auth)| auth.clone())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_authorization(
        &self,
        request: AuthorizationRequest,
    ) -> Result<PaymentAuthorization, PaymentError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PaymentError::Rejected("mock_declined".to_string()));
        }

        let mut map = self
            .authorizations
            .lock()
            .map_err(|_| PaymentError::Network("mock gateway poisoned".to_string()))?;

        let key = request.idempotency_key.clone();
        let (_, auth) = map.entry(key).or_insert_with(|| {
            let id = format!("pi_mock_{}", uuid::Uuid::new_v4().simple());
            let auth = PaymentAuthorization {
                client_secret: format!("{}_secret_mock", id),
                id,
            };
            (request, auth)
        });
        Ok(auth.clone())
    }

    async fn retrieve_authorization(
        &self,
        authorization_id: &str,
    ) -> Result<AuthorizationDetails, PaymentError> {
        let map = self
            .authorizations
            .lock()
            .map_err(|_| PaymentError::Network("mock gateway poisoned".to_string()))?;

        map.values()
            .find(|(_, auth)| auth.id == authorization_id)
            .map(|(req, auth)| AuthorizationDetails {
                id: auth.id.clone(),
                status: "requires_payment_method".to_string(),
                amount_minor: req.amount_minor,
                currency: req.currency.clone(),
            })
            .ok_or_else(|| {
                PaymentError::Rejected(format!("resource_missing - {}", authorization_id))
            })
    }

    fn is_configured(&self) -> bool {
        true
    }
}
