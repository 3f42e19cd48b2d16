use std::sync::{Arc, Mutex};
use std::time::Instant;

use rusqlite::Connection;

use crate::config::AppConfig;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub started_at: Instant,
}
