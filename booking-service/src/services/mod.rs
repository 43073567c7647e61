pub mod adoption;
pub mod availability;
pub mod bookings;
pub mod metrics;
pub mod pricing;
pub mod providers;
pub mod reconciliation;
pub mod repository;
pub mod settings;

pub use adoption::{AdoptionService, OrderFees};
pub use bookings::{BookingService, Selection};
pub use metrics::{get_metrics, init_metrics};
pub use providers::{MockPaymentGateway, PaymentGateway, StripeClient};
pub use reconciliation::ReconciliationService;
pub use repository::{InMemoryStore, MongoStore};
pub use settings::SettingsService;
