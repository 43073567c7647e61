//! Operating-hours and tax settings.

use chrono::NaiveTime;
use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_START_TIME: &str = "09:00";
pub const DEFAULT_END_TIME: &str = "17:00";
pub const DEFAULT_SLOT_MINUTES: u32 = 30;
pub const MIN_SLOT_MINUTES: u32 = 5;
pub const MAX_SLOT_MINUTES: u32 = 240;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySetting {
    #[serde(rename = "_id")]
    pub id: String,
    /// Opening time, "HH:MM" in the business timezone.
    pub start_time: String,
    /// Closing time, "HH:MM" in the business timezone.
    pub end_time: String,
    pub slot_minutes: u32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Validated operating window used by the slot calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub slot_minutes: u32,
}

impl Default for OperatingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            slot_minutes: DEFAULT_SLOT_MINUTES,
        }
    }
}

impl OperatingHours {
    pub fn parse(start: &str, end: &str, slot_minutes: u32) -> Option<Self> {
        Some(Self {
            start: parse_time_of_day(start)?,
            end: parse_time_of_day(end)?,
            slot_minutes,
        })
    }
}

impl TryFrom<&AvailabilitySetting> for OperatingHours {
    type Error = anyhow::Error;

    fn try_from(setting: &AvailabilitySetting) -> Result<Self, Self::Error> {
        OperatingHours::parse(&setting.start_time, &setting.end_time, setting.slot_minutes)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "availability setting {} has malformed hours {}-{}",
                    setting.id,
                    setting.start_time,
                    setting.end_time
                )
            })
    }
}

/// Parse "HH:MM" (24h).
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSetting {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub percent: Decimal,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
