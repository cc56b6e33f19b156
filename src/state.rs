use std::sync::Arc;

use sqlx::SqlitePool;

use crate::canvas::CanvasClient;
use crate::config::AppConfig;
use crate::notify::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub canvas: Arc<dyn CanvasClient>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<AppConfig>,
}
