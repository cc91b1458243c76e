use std::collections::HashMap;

use anyhow::Result;
use libsql::Row;

use crate::db::Database;
use crate::model::{Post, PostView, Reply};

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub body: String,
}

const POST_COLUMNS: &str = r#"
    posts.id, posts.author_id, users.username, posts.title, posts.body,
    posts.created, posts.like_count
"#;

pub struct Blog<'a> {
    db: &'a Database,
}

impl<'a> Blog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create_post(&self, author_id: i64, input: NewPost) -> Result<i64> {
        let query = r#"
            INSERT INTO posts (author_id, title, body)
            VALUES (?, ?, ?)
            RETURNING id
        "#;

        let _guard = self.db.write_lock().await;
        let mut rows = self
            .db
            .connection()
            .query(query, libsql::params![author_id, input.title, input.body])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(row.get(0)?)
        } else {
            anyhow::bail!("Failed to create post")
        }
    }

    pub async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM posts JOIN users ON users.id = posts.author_id WHERE posts.id = ?"
        );

        let mut rows = self.db.connection().query(&query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(self.row_to_post(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn update_post(&self, id: i64, title: &str, body: &str) -> Result<bool> {
        let _guard = self.db.write_lock().await;
        let updated = self
            .db
            .connection()
            .execute(
                "UPDATE posts SET title = ?, body = ? WHERE id = ?",
                libsql::params![title, body, id],
            )
            .await?;
        Ok(updated > 0)
    }

    /// Every post, newest first, as seen by `viewer` (anonymous when `None`).
    pub async fn list_posts(&self, viewer: Option<i64>) -> Result<Vec<PostView>> {
        let query = format!(
            r#"
            SELECT {POST_COLUMNS},
                EXISTS(SELECT 1 FROM likes WHERE likes.post_id = posts.id AND likes.user_id = ?)
            FROM posts
            JOIN users ON users.id = posts.author_id
            ORDER BY posts.created DESC, posts.id DESC
            "#
        );

        let mut rows = self.db.connection().query(&query, libsql::params![viewer]).await?;
        let mut posts = Vec::new();

        while let Some(row) = rows.next().await? {
            let post = self.row_to_post(&row)?;
            let liked: i64 = row.get(7)?;
            posts.push(PostView {
                post,
                liked: liked != 0,
                replies: vec![],
            });
        }

        let mut replies = self.all_replies().await?;
        for view in &mut posts {
            view.replies = replies.remove(&view.post.id).unwrap_or_default();
        }

        Ok(posts)
    }

    pub async fn add_reply(&self, post_id: i64, user_id: i64, body: &str) -> Result<i64> {
        let query = r#"
            INSERT INTO replies (post_id, user_id, body)
            VALUES (?, ?, ?)
            RETURNING id
        "#;

        let _guard = self.db.write_lock().await;
        let mut rows = self
            .db
            .connection()
            .query(query, libsql::params![post_id, user_id, body])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(row.get(0)?)
        } else {
            anyhow::bail!("Failed to add reply to post {}", post_id)
        }
    }

    async fn all_replies(&self) -> Result<HashMap<i64, Vec<Reply>>> {
        let query = r#"
            SELECT replies.id, replies.post_id, replies.user_id, users.username,
                replies.body, replies.created
            FROM replies
            JOIN users ON users.id = replies.user_id
            ORDER BY replies.created, replies.id
        "#;

        let mut rows = self.db.connection().query(query, ()).await?;
        let mut by_post: HashMap<i64, Vec<Reply>> = HashMap::new();
        while let Some(row) = rows.next().await? {
            let reply = self.row_to_reply(&row)?;
            by_post.entry(reply.post_id).or_default().push(reply);
        }
        Ok(by_post)
    }

    fn row_to_post(&self, row: &Row) -> Result<Post> {
        Ok(Post {
            id: row.get(0)?,
            author_id: row.get(1)?,
            author: row.get(2)?,
            title: row.get(3)?,
            body: row.get(4)?,
            created: row.get(5)?,
            like_count: row.get(6)?,
        })
    }

    fn row_to_reply(&self, row: &Row) -> Result<Reply> {
        Ok(Reply {
            id: row.get(0)?,
            post_id: row.get(1)?,
            user_id: row.get(2)?,
            author: row.get(3)?,
            body: row.get(4)?,
            created: row.get(5)?,
        })
    }
}
