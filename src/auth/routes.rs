use axum::{Router, routing::get};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(handler::show_register).post(handler::register))
        .route("/login", get(handler::show_login).post(handler::login))
        .route("/logout", get(handler::logout))
}
