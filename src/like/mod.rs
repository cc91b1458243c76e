//! Like Buttons
//!
//! Client-side controller for the like buttons rendered on the index page.
//! Clicking a button sends `GET /like/{postId}` and mirrors the server's
//! `{liked, like_count}` answer into the page: the count goes to the companion
//! `#like-count-{postId}` element (or to the button label), and the button
//! gains or loses the `curtido` class.
//!
//! The page is modelled by [`Document`]; the network by [`LikeClient`].
//!
//! ```rust,ignore
//! let document = Document::new().into_shared();
//! // ... mount content ...
//! let buttons = LikeController::new(HttpLikeClient::new("http://localhost:5000"))
//!     .initialize(document.clone())
//!     .await;
//!
//! for button in buttons.buttons().collect::<Vec<_>>() {
//!     buttons.click(button, &mut ClickEvent::new()).await;
//! }
//! ```

mod client;
mod controller;
mod dom;

pub use client::{HttpLikeClient, HttpReply, LikeClient};
pub use controller::{ControllerConfig, CounterTarget, LikeButtons, LikeController, LikeEvent, LikeOutcome};
pub use dom::{ClickEvent, Document, Element, NodeId, SharedDocument};

pub const LIKE_BUTTON_CLASS: &str = "like-button";
pub const POST_ID_ATTRIBUTE: &str = "data-post-id";
pub const LIKED_CLASS: &str = "curtido";
pub const LIKE_LABEL: &str = "Curtir";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("Transport: {0}")]
    Transport(String),
    #[error("Decode: {0}")]
    Decode(String),
    #[error("MissingCounter: {0}")]
    MissingCounter(String),
}

pub fn like_path(post_id: &str) -> String {
    format!("/like/{post_id}")
}

pub fn counter_id(post_id: &str) -> String {
    format!("like-count-{post_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_post_id_verbatim() {
        assert_eq!(like_path("42"), "/like/42");
        assert_eq!(like_path("a b"), "/like/a b");
        assert_eq!(counter_id("42"), "like-count-42");
    }
}
