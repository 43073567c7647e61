//! Stripe payment provider client.
//!
//! Implements the Payment Intents API. Webhook verification lives in the
//! reconciliation handler since it only needs the shared secret.

use crate::config::StripeConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;

use super::{
    AuthorizationDetails, AuthorizationRequest, PaymentAuthorization, PaymentError,
    PaymentGateway,
};

/// Stripe client for interacting with the Stripe API.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

/// Payment intent as returned by Stripe (fields we read).
#[derive(Debug, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
    pub amount: i64,
    pub currency: String,
}

/// Stripe API error response.
#[derive(Debug, Deserialize)]
pub struct StripeError {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorDetail {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PaymentError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Form body for `POST /payment_intents`.
    fn intent_form(request: &AuthorizationRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), request.amount_minor.to_string()),
            ("currency".to_string(), request.currency.to_lowercase()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
            (
                "automatic_payment_methods[allow_redirects]".to_string(),
                "never".to_string(),
            ),
        ];
        for (key, value) in &request.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }
        form
    }

    async fn read_intent(response: reqwest::Response) -> Result<StripePaymentIntent, PaymentError> {
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Stripe response received");

        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|e| PaymentError::InvalidResponse(e.to_string()));
        }

        let error: StripeError = serde_json::from_str(&body).unwrap_or_else(|_| StripeError {
            error: StripeErrorDetail {
                kind: None,
                code: None,
                message: Some(body.clone()),
            },
        });
        let code = error
            .error
            .code
            .or(error.error.kind)
            .unwrap_or_else(|| status.as_u16().to_string());
        let message = error.error.message.unwrap_or_default();
        tracing::error!(code = %code, message = %message, "Stripe request failed");
        Err(PaymentError::Rejected(format!("{} - {}", code, message)))
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_authorization(
        &self,
        request: AuthorizationRequest,
    ) -> Result<PaymentAuthorization, PaymentError> {
        if !self.is_configured() {
            return Err(PaymentError::NotConfigured);
        }
        if request.amount_minor <= 0 {
            return Err(PaymentError::InvalidAmount(request.amount_minor.to_string()));
        }

        let url = format!("{}/payment_intents", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&Self::intent_form(&request))
            .send()
            .await?;

        let intent = Self::read_intent(response).await?;
        let client_secret = intent
            .client_secret
            .filter(|secret| !secret.is_empty())
            .ok_or(PaymentError::MissingClientSecret)?;

        tracing::info!(
            payment_intent_id = %intent.id,
            amount = intent.amount,
            currency = %intent.currency,
            "Stripe payment intent created"
        );

        Ok(PaymentAuthorization {
            id: intent.id,
            client_secret,
        })
    }

    async fn retrieve_authorization(
        &self,
        authorization_id: &str,
    ) -> Result<AuthorizationDetails, PaymentError> {
        if !self.is_configured() {
            return Err(PaymentError::NotConfigured);
        }

        let url = format!(
            "{}/payment_intents/{}",
            self.config.api_base_url, authorization_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await?;

        let intent = Self::read_intent(response).await?;
        Ok(AuthorizationDetails {
            id: intent.id,
            status: intent.status,
            amount_minor: intent.amount,
            currency: intent.currency,
        })
    }

    fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;
    use std::collections::BTreeMap;

    fn test_config(secret: &str) -> StripeConfig {
        StripeConfig {
            secret_key: Secret::new(secret.to_string()),
            webhook_secret: None,
            api_base_url: "https://api.stripe.com/v1".to_string(),
            currency: "usd".to_string(),
            timeout_seconds: 10,
            webhook_tolerance_seconds: 300,
        }
    }

    #[test]
    fn test_is_configured() {
        let client = StripeClient::new(test_config("sk_test_123")).unwrap();
        assert!(client.is_configured());

        let client = StripeClient::new(test_config("")).unwrap();
        assert!(!client.is_configured());
    }

    #[test]
    fn test_intent_form_carries_metadata() {
        let mut metadata = BTreeMap::new();
        metadata.insert("bookingId".to_string(), "b-1".to_string());
        metadata.insert("userId".to_string(), "u-1".to_string());
        let request = AuthorizationRequest {
            amount_minor: 3616,
            currency: "USD".to_string(),
            metadata,
            idempotency_key: "b-1".to_string(),
        };

        let form = StripeClient::intent_form(&request);
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("amount"), Some("3616"));
        assert_eq!(get("currency"), Some("usd"));
        assert_eq!(get("automatic_payment_methods[enabled]"), Some("true"));
        assert_eq!(get("automatic_payment_methods[allow_redirects]"), Some("never"));
        assert_eq!(get("metadata[bookingId]"), Some("b-1"));
        assert_eq!(get("metadata[userId]"), Some("u-1"));
    }

    #[tokio::test]
    async fn test_unconfigured_client_refuses() {
        let client = StripeClient::new(test_config("")).unwrap();
        let result = client
            .create_authorization(AuthorizationRequest {
                amount_minor: 100,
                currency: "usd".to_string(),
                metadata: BTreeMap::new(),
                idempotency_key: "k".to_string(),
            })
            .await;
        assert!(matches!(result, Err(PaymentError::NotConfigured)));
    }
}
