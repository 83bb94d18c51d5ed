use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    config::Config,
    utils::clock::{SharedClock, SystemClock},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub clock: SharedClock,
}

impl AppState {
    /// State backed by the wall clock.
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        Self::with_clock(pool, config, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: SqlitePool, config: Config, clock: SharedClock) -> Self {
        Self {
            pool,
            config,
            clock,
        }
    }
}
