use anyhow::Result;
use chrono::{SecondsFormat, TimeDelta, Utc};
use libsql::Row;

use super::session::{hash_token, new_token};
use crate::db::Database;
use crate::model::User;

fn timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct Accounts<'a> {
    db: &'a Database,
}

impl<'a> Accounts<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Inserts a new user. Returns `None` when the username is already registered.
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<Option<User>> {
        let query = r#"
            INSERT INTO users (username, password)
            VALUES (?, ?)
            RETURNING id, username, password
        "#;

        let _guard = self.db.write_lock().await;
        let mut rows = match self
            .db
            .connection()
            .query(query, libsql::params![username, password_hash])
            .await
        {
            Ok(rows) => rows,
            Err(e) if e.to_string().contains("UNIQUE constraint failed") => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if let Some(row) = rows.next().await? {
            Ok(Some(self.row_to_user(&row)?))
        } else {
            anyhow::bail!("Failed to create user {}", username)
        }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let query = "SELECT id, username, password FROM users WHERE username = ?";
        let mut rows = self.db.connection().query(query, libsql::params![username]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(self.row_to_user(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Opens a session for `user_id` and returns the raw cookie token.
    /// Only the token's hash is stored.
    pub async fn create_session(&self, user_id: i64, ttl_hours: i64) -> Result<String> {
        let expires_at = TimeDelta::try_hours(ttl_hours)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| anyhow::anyhow!("session ttl of {ttl_hours} hours is out of range"))?;
        let token = new_token();

        let _guard = self.db.write_lock().await;
        self.db
            .connection()
            .execute(
                "INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?, ?, ?)",
                libsql::params![hash_token(&token), user_id, timestamp(expires_at)],
            )
            .await?;

        Ok(token)
    }

    pub async fn session_user(&self, token: &str) -> Result<Option<User>> {
        let query = r#"
            SELECT users.id, users.username, users.password
            FROM sessions
            JOIN users ON users.id = sessions.user_id
            WHERE sessions.token_hash = ? AND sessions.expires_at > ?
        "#;

        let mut rows = self
            .db
            .connection()
            .query(query, libsql::params![hash_token(token), timestamp(Utc::now())])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(self.row_to_user(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn delete_session(&self, token: &str) -> Result<()> {
        let _guard = self.db.write_lock().await;
        self.db
            .connection()
            .execute(
                "DELETE FROM sessions WHERE token_hash = ?",
                libsql::params![hash_token(token)],
            )
            .await?;
        Ok(())
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64> {
        let _guard = self.db.write_lock().await;
        let purged = self
            .db
            .connection()
            .execute(
                "DELETE FROM sessions WHERE expires_at <= ?",
                libsql::params![timestamp(Utc::now())],
            )
            .await?;
        Ok(purged)
    }

    fn row_to_user(&self, row: &Row) -> Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_and_finds_users() {
        let db = Database::in_memory().await.unwrap();
        let accounts = Accounts::new(&db);

        let bob = accounts.create_user("bob", "hash").await.unwrap().unwrap();
        assert_eq!(bob.username, "bob");
        assert!(accounts.find_by_username("alice").await.unwrap().is_none());

        let found = accounts.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "hash");
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let accounts = Accounts::new(&db);

        accounts.create_user("bob", "hash").await.unwrap().unwrap();
        assert!(accounts.create_user("bob", "other").await.unwrap().is_none());

        let kept = accounts.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(kept.password_hash, "hash");
    }

    #[tokio::test]
    async fn out_of_range_session_ttl_is_an_error() {
        let db = Database::in_memory().await.unwrap();
        let accounts = Accounts::new(&db);
        let bob = accounts.create_user("bob", "hash").await.unwrap().unwrap();

        assert!(accounts.create_session(bob.id, i64::MAX).await.is_err());
        assert!(accounts.create_session(bob.id, i64::MAX / 3_600_000).await.is_err());
    }

    #[tokio::test]
    async fn sessions_resolve_until_deleted() {
        let db = Database::in_memory().await.unwrap();
        let accounts = Accounts::new(&db);
        let bob = accounts.create_user("bob", "hash").await.unwrap().unwrap();

        let token = accounts.create_session(bob.id, 1).await.unwrap();
        let user = accounts.session_user(&token).await.unwrap().unwrap();
        assert_eq!(user.id, bob.id);
        assert!(accounts.session_user("not-a-token").await.unwrap().is_none());

        accounts.delete_session(&token).await.unwrap();
        assert!(accounts.session_user(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_ignored_and_purged() {
        let db = Database::in_memory().await.unwrap();
        let accounts = Accounts::new(&db);
        let bob = accounts.create_user("bob", "hash").await.unwrap().unwrap();

        let stale = accounts.create_session(bob.id, -1).await.unwrap();
        let fresh = accounts.create_session(bob.id, 1).await.unwrap();

        assert!(accounts.session_user(&stale).await.unwrap().is_none());
        assert_eq!(accounts.purge_expired_sessions().await.unwrap(), 1);
        assert!(accounts.session_user(&fresh).await.unwrap().is_some());
    }
}
