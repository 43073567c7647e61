//! Application wiring and server lifecycle.

use axum::{
    body::Body,
    middleware::from_fn,
    routing::{get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::config::BookingConfig;
use crate::handlers;
use crate::services::providers::PaymentError;
use crate::services::repository::{
    AdoptionStore, BookingStore, CatalogStore, EventLog, SettingsStore,
};
use crate::services::{
    AdoptionService, BookingService, MongoStore, OrderFees, PaymentGateway,
    ReconciliationService, SettingsService, StripeClient,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{make_request_span, request_id_middleware},
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: BookingConfig,
    pub bookings: BookingService,
    pub settings: SettingsService,
    pub adoption: AdoptionService,
    pub reconciliation: ReconciliationService,
}

impl AppState {
    /// Wire every service over one store and one payment gateway.
    pub fn new<S>(config: BookingConfig, store: Arc<S>, gateway: Arc<dyn PaymentGateway>) -> Self
    where
        S: CatalogStore + SettingsStore + BookingStore + AdoptionStore + EventLog + 'static,
    {
        let currency = config.stripe.currency.clone();
        let settings = SettingsService::new(store.clone(), store.clone());

        let bookings = BookingService::new(
            store.clone(),
            store.clone(),
            settings.clone(),
            gateway.clone(),
            currency.clone(),
            config.business.offset(),
        );

        let adoption = AdoptionService::new(
            store.clone(),
            settings.clone(),
            gateway,
            currency,
            OrderFees {
                processing: config.adoption.processing_fee,
                shipping: config.adoption.shipping_fee,
            },
        );

        let reconciliation = ReconciliationService::new(
            store.clone(),
            store.clone(),
            store,
            config.stripe.webhook_secret.clone(),
            config.stripe.webhook_tolerance_seconds,
        );

        Self {
            config,
            bookings,
            settings,
            adoption,
            reconciliation,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        // Bookings
        .route(
            "/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
        )
        .route(
            "/bookings/availability",
            get(handlers::bookings::get_availability),
        )
        .route(
            "/bookings/:id/confirm",
            post(handlers::bookings::confirm_booking),
        )
        .route(
            "/bookings/:id/payment",
            get(handlers::bookings::get_booking_payment),
        )
        .route("/payments", get(handlers::payments::list_payments))
        .route("/services", get(handlers::payments::list_services))
        .route("/adoption/orders", post(handlers::adoption::create_order))
        // Processor callbacks carry no caller identity
        .route(
            "/webhooks/payments",
            post(handlers::webhooks::payment_webhook),
        )
        // Admin
        .route(
            "/admin/bookings/:id/status",
            patch(handlers::bookings::update_booking_status),
        )
        .route(
            "/admin/settings/availability",
            get(handlers::settings::get_availability_setting)
                .put(handlers::settings::update_availability_setting),
        )
        .route(
            "/admin/settings/tax",
            get(handlers::settings::get_tax)
                .post(handlers::settings::create_tax)
                .put(handlers::settings::update_tax),
        )
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to MongoDB, build the Stripe client and bind the listener.
    pub async fn build(config: BookingConfig) -> Result<Self, AppError> {
        let store = MongoStore::connect(&config.mongodb.uri, &config.mongodb.database).await?;
        store.init_indexes().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize database indexes");
            AppError::DatabaseError(e)
        })?;
        tracing::info!(database = %config.mongodb.database, "Database initialized");

        let stripe = StripeClient::new(config.stripe.clone()).map_err(|e: PaymentError| {
            tracing::error!(error = %e, "Failed to build Stripe client");
            AppError::ConfigError(e.into())
        })?;
        if stripe.is_configured() {
            tracing::info!("Stripe client initialized");
        } else {
            tracing::warn!("STRIPE_SECRET_KEY not set - bookings and orders will be refused");
        }

        let state = AppState::new(config.clone(), Arc::new(store), Arc::new(stripe));
        Self::with_state(state, config.common.port).await
    }

    /// Bind a listener for an already-wired state. Port 0 picks a free port.
    pub async fn with_state(state: AppState, port: u16) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router: router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(port = self.port, "Listening");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
