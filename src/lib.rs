use axum::{Router, routing::get};
use std::error::Error;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handler::AppState;

pub mod api;
pub mod auth;
pub mod blog;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod like;
pub mod messages;
pub mod model;
pub mod render;

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

/// The full HTTP surface of the blog.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/hello", get(handler::hello))
        .merge(blog::routes())
        .nest("/auth", auth::routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
