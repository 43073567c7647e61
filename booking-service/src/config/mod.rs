use chrono::{FixedOffset, Offset, Utc};
use rust_decimal::Decimal;
use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub stripe: StripeConfig,
    pub business: BusinessConfig,
    pub adoption: AdoptionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    /// Empty means payments are not configured.
    pub secret_key: Secret<String>,
    /// Webhooks are refused while this is unset.
    pub webhook_secret: Option<Secret<String>>,
    pub api_base_url: String,
    pub currency: String,
    pub timeout_seconds: u64,
    /// Maximum signature age; 0 disables the check.
    pub webhook_tolerance_seconds: i64,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: Secret::new(String::new()),
            webhook_secret: None,
            api_base_url: "https://api.stripe.com/v1".to_string(),
            currency: "usd".to_string(),
            timeout_seconds: 10,
            webhook_tolerance_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusinessConfig {
    pub org_name: String,
    /// Operating hours are read at this fixed offset from UTC.
    pub utc_offset_minutes: i32,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            org_name: "Pet Care Center".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

impl BusinessConfig {
    pub fn offset(&self) -> FixedOffset {
        fixed_offset(self.utc_offset_minutes).unwrap_or(Utc.fix())
    }
}

/// `None` when `minutes` is outside what a UTC offset can hold.
fn fixed_offset(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdoptionConfig {
    pub processing_fee: Decimal,
    pub shipping_fee: Decimal,
}

impl BookingConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let webhook_secret = env::var("STRIPE_WEBHOOK_SECRET")
            .ok()
            .filter(|secret| !secret.is_empty())
            .map(Secret::new);
        if webhook_secret.is_none() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set - payment webhooks will be rejected");
        }

        let utc_offset_minutes: i32 =
            parse_env("BUSINESS_UTC_OFFSET_MINUTES", Some("0"), is_prod)?;
        if fixed_offset(utc_offset_minutes).is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "BUSINESS_UTC_OFFSET_MINUTES out of range: {}",
                utc_offset_minutes
            )));
        }

        Ok(BookingConfig {
            common: common_config,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("booking_db"), is_prod)?,
            },
            stripe: StripeConfig {
                secret_key: Secret::new(get_env("STRIPE_SECRET_KEY", Some(""), is_prod)?),
                webhook_secret,
                api_base_url: get_env(
                    "STRIPE_API_BASE_URL",
                    Some("https://api.stripe.com/v1"),
                    false,
                )?,
                currency: get_env("STRIPE_CURRENCY", Some("usd"), false)?.to_lowercase(),
                timeout_seconds: parse_env("STRIPE_TIMEOUT_SECONDS", Some("10"), false)?,
                webhook_tolerance_seconds: parse_env(
                    "STRIPE_WEBHOOK_TOLERANCE_SECONDS",
                    Some("300"),
                    false,
                )?,
            },
            business: BusinessConfig {
                org_name: get_env("ORG_NAME", Some("Pet Care Center"), false)?,
                utc_offset_minutes,
            },
            adoption: AdoptionConfig {
                processing_fee: parse_env("ADOPTION_PROCESSING_FEE", Some("0"), false)?,
                shipping_fee: parse_env("ADOPTION_SHIPPING_FEE", Some("0"), false)?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(key, default, is_prod)?;
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value {:?}: {}", key, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_offset_from_minutes() {
        let business = BusinessConfig {
            utc_offset_minutes: -300,
            ..Default::default()
        };
        assert_eq!(business.offset().local_minus_utc(), -300 * 60);
        assert_eq!(BusinessConfig::default().offset().local_minus_utc(), 0);
    }

    #[test]
    fn oversized_offset_is_out_of_range() {
        assert!(fixed_offset(i32::MAX).is_none());
        assert!(fixed_offset(i32::MIN).is_none());
        assert!(fixed_offset(24 * 60).is_none());
        assert_eq!(fixed_offset(330).map(|o| o.local_minus_utc()), Some(330 * 60));

        let business = BusinessConfig {
            utc_offset_minutes: i32::MAX,
            ..Default::default()
        };
        assert_eq!(business.offset().local_minus_utc(), 0);
    }

    #[test]
    fn stripe_defaults() {
        let stripe = StripeConfig::default();
        assert_eq!(stripe.currency, "usd");
        assert_eq!(stripe.timeout_seconds, 10);
        assert_eq!(stripe.webhook_tolerance_seconds, 300);
        assert!(stripe.webhook_secret.is_none());
    }

    #[test]
    fn parse_env_uses_default_and_rejects_garbage() {
        let value: u64 = parse_env("BOOKING_TEST_UNSET_NUMBER", Some("42"), false).unwrap();
        assert_eq!(value, 42);

        let bad: Result<u64, _> = parse_env("BOOKING_TEST_UNSET_NUMBER", Some("forty"), false);
        assert!(bad.is_err());
    }
}
