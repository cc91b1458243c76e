use axum::{
    Router,
    routing::{get, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::index))
        .route("/create", get(handler::show_create).post(handler::create))
        .route("/update/:id", get(handler::show_update).post(handler::update))
        .route("/delete/:id", post(handler::delete))
        .route("/reply/:id", post(handler::reply))
        .route("/like/:id", get(handler::toggle_like))
}
