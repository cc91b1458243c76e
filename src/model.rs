use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub author: String,
    pub title: String,
    pub body: String,
    pub created: String,
    pub like_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub author: String,
    pub body: String,
    pub created: String,
}

/// A post as shown on the index page to one viewer.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub post: Post,
    pub liked: bool,
    pub replies: Vec<Reply>,
}

/// Body of a successful `GET /like/{postId}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}
