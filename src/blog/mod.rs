//! Blog Module
//!
//! Posts, replies and likes. A like is a `(post, user)` pair; toggling it goes
//! through [`crate::db::Database::toggle_like`] so the row and the post's
//! `like_count` change in one transaction.
//!
//! # Routes
//!
//! - `GET /` index page with a like button per post
//! - `GET|POST /create`, `GET|POST /update/:id`, `POST /delete/:id`
//! - `POST /reply/:id`
//! - `GET /like/:id` returns `{"liked": bool, "like_count": int}`

mod handler;
mod routes;
mod store;

pub use routes::routes;
pub use store::{Blog, NewPost};
