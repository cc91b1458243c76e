use std::sync::Arc;

use tracing::info;

use crate::db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub session_ttl_hours: i64,
}

impl AppState {
    pub fn new(db: Arc<Database>, session_ttl_hours: i64) -> Self {
        Self { db, session_ttl_hours }
    }
}

pub async fn hello() -> &'static str {
    info!("got hello request");
    "Hello, world!"
}
