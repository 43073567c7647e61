//! Caller identity extracted from gateway-set headers.
//!
//! The API gateway authenticates the caller and forwards the identity as
//! `X-User-ID` and `X-User-Role`. These headers are trusted as-is.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";
pub const ADMIN_ROLE: &str = "admin";

/// The authenticated customer making the request.
#[derive(Debug, Clone)]
pub struct CustomerContext {
    pub customer_id: String,
    pub role: Option<String>,
}

impl CustomerContext {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for CustomerContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer_id = header(parts, USER_ID_HEADER).ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing X-User-ID header"))
        })?;

        tracing::Span::current().record("customer_id", customer_id);

        Ok(CustomerContext {
            customer_id: customer_id.to_string(),
            role: header(parts, USER_ROLE_HEADER).map(|r| r.to_lowercase()),
        })
    }
}

/// A caller with the admin role.
#[derive(Debug, Clone)]
pub struct AdminContext(pub CustomerContext);

#[async_trait]
impl<S> FromRequestParts<S> for AdminContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let customer = CustomerContext::from_request_parts(parts, state).await?;
        if !customer.is_admin() {
            tracing::warn!(customer_id = %customer.customer_id, "Non-admin caller on admin route");
            return Err(AppError::Forbidden(anyhow::anyhow!("Admin access required")));
        }
        Ok(AdminContext(customer))
    }
}
