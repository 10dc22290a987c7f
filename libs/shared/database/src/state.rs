use std::sync::Arc;

use tokio::sync::Mutex;

use shared_config::AppConfig;

use crate::{Database, DbResult};

pub type SharedDatabase = Arc<Mutex<Database>>;

/// Router state handed to every cell.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: SharedDatabase,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database) -> Self {
        Self {
            config: Arc::new(config),
            db: Arc::new(Mutex::new(db)),
        }
    }

    pub fn open(config: AppConfig) -> DbResult<Self> {
        let db = Database::open(&config.database_path)?;
        Ok(Self::new(config, db))
    }
}
