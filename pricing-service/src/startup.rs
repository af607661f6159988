//! Application startup and lifecycle management.

use crate::config::{PricingConfig, StoreBackend};
use crate::handlers::{self, rules};
use crate::services::{init_metrics, Database, InMemoryRuleStore, PricingService};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PricingService>,
}

/// Build the HTTP router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/v1/pricing/resolve", post(handlers::resolve_fee))
        .route("/v1/pricing/explain", post(handlers::explain_fee))
        .route(
            "/v1/rules/global-default",
            get(rules::get_global_default).put(rules::update_global_default),
        )
        .route(
            "/v1/rules/client-overrides",
            get(rules::list_client_overrides).post(rules::create_client_override),
        )
        .route(
            "/v1/rules/client-overrides/:id",
            get(rules::get_client_override)
                .put(rules::update_client_override)
                .delete(rules::delete_client_override),
        )
        .route(
            "/v1/rules/client-defaults/:client_id",
            get(rules::get_client_default)
                .put(rules::set_client_default)
                .delete(rules::delete_client_default),
        )
        .route(
            "/v1/rules/zone-rules",
            get(rules::list_zone_rules).post(rules::create_zone_rule),
        )
        .route(
            "/v1/rules/zone-rules/:id",
            get(rules::get_zone_rule)
                .put(rules::update_zone_rule)
                .delete(rules::delete_zone_rule),
        )
        .route(
            "/v1/rules/package-fees",
            get(rules::list_package_fees).post(rules::create_package_fee),
        )
        .route(
            "/v1/rules/package-fees/:id",
            get(rules::get_package_fee)
                .put(rules::update_package_fee)
                .delete(rules::delete_package_fee),
        )
        .route("/v1/rules/change-log", get(handlers::list_change_log))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: PricingConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: PricingConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(config: PricingConfig, run_migrations: bool) -> Result<Self, AppError> {
        init_metrics();

        let settings = config.engine.pricing_settings();
        let service = match config.store {
            StoreBackend::Postgres => {
                let db_config = config.database.as_ref().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "DATABASE_URL is required when RULE_STORE=postgres"
                    ))
                })?;

                let db = Database::new(
                    &db_config.url,
                    db_config.max_connections,
                    db_config.min_connections,
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    e
                })?;

                if run_migrations {
                    db.run_migrations().await.map_err(|e| {
                        tracing::error!(error = %e, "Failed to run migrations");
                        e
                    })?;
                }

                PricingService::new(Arc::new(db), settings)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory rule store; rules are lost on restart");
                PricingService::new(
                    Arc::new(InMemoryRuleStore::new(config.engine.bootstrap_fee())),
                    settings,
                )
            }
        };

        // A failed prime is not fatal: degraded results fall back to the bootstrap fee.
        match service.prime().await {
            Ok(fee) => tracing::info!(global_default = %fee, "Global default loaded"),
            Err(e) => tracing::warn!(
                error = %e,
                bootstrap_fee = %config.engine.bootstrap_fee(),
                "Could not read global default at startup"
            ),
        }

        let state = AppState {
            service: Arc::new(service),
        };

        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Pricing service listener bound");

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Get a reference to the pricing service.
    pub fn service(&self) -> &PricingService {
        &self.state.service
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        tracing::info!(
            service = "pricing-service",
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        axum::serve(self.http_listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
