use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::video::VideoHost;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub video: Arc<dyn VideoHost>,
    pub config: Arc<Config>,
}
