//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::gateway::{GatewayError, HttpGateway, PaymentGateway};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to shared
/// resources like the database pool and the payment gateway client. The
/// gateway is constructed here, in the composition root, and injected
/// everywhere else - there is no module-level client instance.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    /// Create a new application state with the default HTTP gateway client.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway HTTP client fails to build.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, GatewayError> {
        let gateway = Arc::new(HttpGateway::new(&config.gateway)?);
        Ok(Self::with_gateway(config, pool, gateway))
    }

    /// Create a new application state with an explicit gateway
    /// implementation (used by tests).
    #[must_use]
    pub fn with_gateway(
        config: ServerConfig,
        pool: PgPool,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                gateway,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the payment gateway client.
    #[must_use]
    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.inner.gateway.as_ref()
    }
}
