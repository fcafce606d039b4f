use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::auth::SupabaseAuth;
use crate::config::Config;
use crate::db::DatabaseProxy;
use crate::response::AppError;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    config: Arc<Config>,
    db_proxy: Option<Arc<DatabaseProxy>>,
    supabase: Arc<SupabaseAuth>,
}

impl AppState {
    pub fn new(config: Config, db_proxy: Option<Arc<DatabaseProxy>>) -> Self {
        let supabase = Arc::new(SupabaseAuth::from_config(&config));
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            config: Arc::new(config),
            db_proxy,
            supabase,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db_proxy(&self) -> Option<Arc<DatabaseProxy>> {
        self.db_proxy.clone()
    }

    /// The pool, or 503 when the service runs without a database.
    pub fn require_db(&self) -> Result<Arc<DatabaseProxy>, AppError> {
        self.db_proxy.clone().ok_or_else(AppError::database_unavailable)
    }

    pub fn supabase(&self) -> &SupabaseAuth {
        &self.supabase
    }
}
