//! Operating hours, tax and catalog reads for the booking flow and admins.

use mongodb::bson::DateTime as BsonDateTime;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::repository::{CatalogStore, SettingsStore};
use crate::error::BookingError;
use crate::models::settings::{
    parse_time_of_day, DEFAULT_END_TIME, DEFAULT_SLOT_MINUTES, DEFAULT_START_TIME,
    MAX_SLOT_MINUTES, MIN_SLOT_MINUTES,
};
use crate::models::{AvailabilitySetting, OperatingHours, ServiceCatalogEntry, TaxSetting};

#[derive(Clone)]
pub struct SettingsService {
    settings: Arc<dyn SettingsStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl SettingsService {
    pub fn new(settings: Arc<dyn SettingsStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { settings, catalog }
    }

    /// Stored setting, or the default (not persisted) when none exists.
    pub async fn get_availability_setting(&self) -> Result<AvailabilitySetting, BookingError> {
        if let Some(setting) = self.settings.latest_availability_setting().await? {
            return Ok(setting);
        }
        let now = BsonDateTime::now();
        Ok(AvailabilitySetting {
            id: "default".to_string(),
            start_time: DEFAULT_START_TIME.to_string(),
            end_time: DEFAULT_END_TIME.to_string(),
            slot_minutes: DEFAULT_SLOT_MINUTES,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn operating_hours(&self) -> Result<OperatingHours, BookingError> {
        match self.settings.latest_availability_setting().await? {
            Some(setting) => OperatingHours::try_from(&setting).map_err(|e| {
                tracing::error!(error = %e, "Stored availability setting is unusable");
                BookingError::Configuration(e.to_string())
            }),
            None => Ok(OperatingHours::default()),
        }
    }

    pub async fn update_availability_setting(
        &self,
        start_time: &str,
        end_time: &str,
        slot_minutes: u32,
    ) -> Result<AvailabilitySetting, BookingError> {
        if parse_time_of_day(start_time).is_none() || parse_time_of_day(end_time).is_none() {
            return Err(BookingError::validation("Times must use HH:MM format"));
        }
        if !(MIN_SLOT_MINUTES..=MAX_SLOT_MINUTES).contains(&slot_minutes) {
            return Err(BookingError::validation(format!(
                "Slot minutes must be between {} and {}",
                MIN_SLOT_MINUTES, MAX_SLOT_MINUTES
            )));
        }

        let now = BsonDateTime::now();
        let setting = match self.settings.latest_availability_setting().await? {
            Some(existing) => AvailabilitySetting {
                start_time: start_time.trim().to_string(),
                end_time: end_time.trim().to_string(),
                slot_minutes,
                updated_at: now,
                ..existing
            },
            None => AvailabilitySetting {
                id: uuid::Uuid::new_v4().to_string(),
                start_time: start_time.trim().to_string(),
                end_time: end_time.trim().to_string(),
                slot_minutes,
                created_at: now,
                updated_at: now,
            },
        };

        self.settings
            .save_availability_setting(setting.clone())
            .await?;
        Ok(setting)
    }

    pub async fn get_active_tax(&self) -> Result<Option<TaxSetting>, BookingError> {
        Ok(self.settings.latest_active_tax().await?)
    }

    /// Percent applied to new bookings and orders. No active record means 0.
    pub async fn current_tax_percent(&self) -> Result<Decimal, BookingError> {
        Ok(self
            .get_active_tax()
            .await?
            .map(|tax| tax.percent)
            .unwrap_or(Decimal::ZERO))
    }

    /// Deactivate every active record, then create a new active one.
    pub async fn set_active_tax(&self, percent: Decimal) -> Result<TaxSetting, BookingError> {
        validate_percent(percent)?;

        self.settings.deactivate_all_taxes().await?;

        let now = BsonDateTime::now();
        let tax = TaxSetting {
            id: uuid::Uuid::new_v4().to_string(),
            percent,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.settings.insert_tax(tax.clone()).await?;

        Ok(tax)
    }

    /// Change the latest active record in place, or create one if none exists.
    pub async fn update_active_tax(&self, percent: Decimal) -> Result<TaxSetting, BookingError> {
        validate_percent(percent)?;

        let Some(active) = self.settings.latest_active_tax().await? else {
            return self.set_active_tax(percent).await;
        };

        if !self.settings.update_tax_percent(&active.id, percent).await? {
            return self.set_active_tax(percent).await;
        }

        Ok(TaxSetting {
            percent,
            updated_at: BsonDateTime::now(),
            ..active
        })
    }

    /// Active catalog, newest first, with the tax percent shown alongside.
    pub async fn list_active_services(
        &self,
    ) -> Result<(Vec<ServiceCatalogEntry>, Decimal), BookingError> {
        let services = self.catalog.list_active_services().await?;
        let tax_percent = self.current_tax_percent().await?;
        Ok((services, tax_percent))
    }
}

fn validate_percent(percent: Decimal) -> Result<(), BookingError> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(BookingError::validation(
            "Tax percent must be between 0 and 100",
        ));
    }
    Ok(())
}
