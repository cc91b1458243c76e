//! Accounts and sessions.
//!
//! Users register with a username and password (argon2-hashed) and log in to
//! receive an HttpOnly `session` cookie. The cookie carries a random token;
//! only its SHA-256 digest is stored, next to an expiry timestamp.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .nest("/auth", auth::routes())
//!     .with_state(app_state);
//! ```

mod handler;
mod routes;
pub mod session;
mod store;

pub use routes::routes;
pub use session::{current_user, require_user};
pub use store::Accounts;
