use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::auth::JwtVerifier;
use crate::config::Config;
use crate::store::CellarStore;

/// Source of "now" for handlers. Swapped for a fixed clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable store. Default: `PgStore`; tests use `MemoryStore`.
    pub store: Arc<dyn CellarStore>,
    pub verifier: Arc<JwtVerifier>,
    pub clock: Arc<dyn Clock>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn CellarStore>, config: Config) -> Self {
        let verifier = Arc::new(JwtVerifier::new(&config.auth));
        Self {
            store,
            verifier,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
