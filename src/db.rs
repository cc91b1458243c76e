use crate::blog::Blog;
use crate::config::App;
use crate::model::LikeState;
use anyhow::Result;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::Path;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[
    ("001_schema.sql", include_str!("migrations/001_schema.sql")),
    ("002_sessions.sql", include_str!("migrations/002_sessions.sql")),
];

// Dropped by `init-db`, children first.
const TABLES: &[&str] = &["sessions", "replies", "likes", "posts", "users", "_migrations"];

pub struct Database {
    db: LibsqlDatabase,
    conn: Connection,
    tx_lock: Mutex<()>,
    turso_url: Option<String>,
    turso_auth_token: Option<String>,
}

impl Database {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Held by every write on the shared connection. Statements issued while
    /// a transaction is open would otherwise join it.
    pub async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.tx_lock.lock().await
    }

    pub fn is_replica(turso_url: &Option<String>, turso_auth_token: &Option<String>) -> bool {
        turso_url.is_some() && turso_auth_token.is_some()
    }

    pub async fn sync(&self) -> Result<()> {
        if Self::is_replica(&self.turso_url, &self.turso_auth_token) {
            self.db
                .sync()
                .await
                .map_err(|e| anyhow::anyhow!("sync failed: {}", e))?;
        }
        Ok(())
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        conn.execute(query, libsql::params![name]).await?;
        Ok(())
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await?;
        Ok(())
    }

    async fn migrate(conn: &Connection) -> Result<()> {
        for (filename, sql) in SYSTEM_MIGRATIONS.iter().chain(MIGRATIONS) {
            Self::run_migration(conn, filename, sql).await?;
        }
        Ok(())
    }

    pub async fn new(cfg: &App, data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(cfg.get_db());
        let turso_url = cfg.turso_url.clone();
        let turso_auth_token = cfg.turso_auth_token.clone();

        let db = match (&turso_url, &turso_auth_token) {
            (Some(url), Some(token)) => {
                tracing::info!("[db] running in synced database mode (offline writes)");
                let sync_interval = Duration::from_secs(cfg.sync_interval_seconds);
                Builder::new_synced_database(&path, url.clone(), token.clone())
                    .sync_interval(sync_interval)
                    .build()
                    .await?
            }
            _ => Builder::new_local(&path).build().await?,
        };

        Self::open(db, turso_url, turso_auth_token).await
    }

    /// Fresh, fully migrated database that lives only as long as the value.
    pub async fn in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::open(db, None, None).await
    }

    async fn open(
        db: LibsqlDatabase,
        turso_url: Option<String>,
        turso_auth_token: Option<String>,
    ) -> Result<Self> {
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;
        Self::migrate(&conn).await?;

        Ok(Database {
            db,
            conn,
            tx_lock: Mutex::new(()),
            turso_url,
            turso_auth_token,
        })
    }

    /// Drops every application table and reapplies the migrations.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.tx_lock.lock().await;

        for table in TABLES {
            self.conn
                .execute(&format!("DROP TABLE IF EXISTS {table}"), ())
                .await?;
        }
        Self::migrate(&self.conn).await
    }

    async fn finish<T>(&self, result: Result<T>) -> Result<T> {
        let result = match result {
            Ok(value) => self.conn.execute("COMMIT", ()).await.map(|_| value).map_err(Into::into),
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = self.conn.execute("ROLLBACK", ()).await {
                tracing::warn!("rollback failed: {}", e);
            }
        }
        result
    }

    /// Flips `user_id`'s like on `post_id`, keeping `posts.like_count` in step.
    /// Returns `None` when the post does not exist.
    pub async fn toggle_like(&self, post_id: i64, user_id: i64) -> Result<Option<LikeState>> {
        let _guard = self.tx_lock.lock().await;

        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = self.toggle_like_internal(post_id, user_id).await;
        self.finish(result).await
    }

    async fn toggle_like_internal(&self, post_id: i64, user_id: i64) -> Result<Option<LikeState>> {
        let blog = Blog::new(self);

        if blog.get_post(post_id).await?.is_none() {
            return Ok(None);
        }

        let removed = self
            .conn
            .execute(
                "DELETE FROM likes WHERE post_id = ? AND user_id = ?",
                libsql::params![post_id, user_id],
            )
            .await?;

        let (liked, delta) = if removed > 0 {
            (false, -1)
        } else {
            self.conn
                .execute(
                    "INSERT INTO likes (post_id, user_id) VALUES (?, ?)",
                    libsql::params![post_id, user_id],
                )
                .await?;
            (true, 1)
        };

        let mut rows = self
            .conn
            .query(
                "UPDATE posts SET like_count = like_count + ? WHERE id = ? RETURNING like_count",
                libsql::params![delta, post_id],
            )
            .await?;

        let like_count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => anyhow::bail!("post {} vanished while toggling like", post_id),
        };

        Ok(Some(LikeState { liked, like_count }))
    }

    /// Deletes a post together with its likes and replies.
    pub async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let _guard = self.tx_lock.lock().await;

        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = self.delete_post_internal(post_id).await;
        self.finish(result).await
    }

    async fn delete_post_internal(&self, post_id: i64) -> Result<bool> {
        self.conn
            .execute("DELETE FROM likes WHERE post_id = ?", libsql::params![post_id])
            .await?;
        self.conn
            .execute("DELETE FROM replies WHERE post_id = ?", libsql::params![post_id])
            .await?;
        let deleted = self
            .conn
            .execute("DELETE FROM posts WHERE id = ?", libsql::params![post_id])
            .await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Accounts;
    use crate::blog::NewPost;

    async fn seeded() -> (Database, i64, i64) {
        let db = Database::in_memory().await.unwrap();
        let user = Accounts::new(&db)
            .create_user("ana", "$argon2id$stub")
            .await
            .unwrap()
            .unwrap();
        let post = Blog::new(&db)
            .create_post(
                user.id,
                NewPost {
                    title: "primeiro".into(),
                    body: "olá".into(),
                },
            )
            .await
            .unwrap();
        (db, user.id, post)
    }

    #[tokio::test]
    async fn migrations_are_applied_once() {
        let db = Database::in_memory().await.unwrap();
        Database::migrate(db.connection()).await.unwrap();

        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM _migrations", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count as usize, SYSTEM_MIGRATIONS.len() + MIGRATIONS.len());
    }

    #[tokio::test]
    async fn toggle_like_flips_state_and_count() {
        let (db, user_id, post_id) = seeded().await;

        let first = db.toggle_like(post_id, user_id).await.unwrap().unwrap();
        assert_eq!(first, LikeState { liked: true, like_count: 1 });

        let second = db.toggle_like(post_id, user_id).await.unwrap().unwrap();
        assert_eq!(second, LikeState { liked: false, like_count: 0 });
    }

    #[tokio::test]
    async fn toggle_like_on_missing_post_is_none() {
        let (db, user_id, _) = seeded().await;
        assert!(db.toggle_like(9999, user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_post_removes_likes_and_replies() {
        let (db, user_id, post_id) = seeded().await;
        db.toggle_like(post_id, user_id).await.unwrap();
        Blog::new(&db)
            .add_reply(post_id, user_id, "boa")
            .await
            .unwrap();

        assert!(db.delete_post(post_id).await.unwrap());

        let mut rows = db
            .connection()
            .query(
                "SELECT (SELECT COUNT(*) FROM likes) + (SELECT COUNT(*) FROM replies)",
                (),
            )
            .await
            .unwrap();
        let leftovers: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(leftovers, 0);
        assert!(!db.delete_post(post_id).await.unwrap());
    }

    #[tokio::test]
    async fn reset_empties_tables() {
        let (db, _, _) = seeded().await;
        db.reset().await.unwrap();

        let posts = Blog::new(&db).list_posts(None).await.unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn failed_commit_rolls_back() {
        let db = Database::in_memory().await.unwrap();
        db.connection()
            .execute_batch(
                r#"
                PRAGMA foreign_keys = ON;
                CREATE TABLE parent (id INTEGER PRIMARY KEY);
                CREATE TABLE child (
                    parent_id INTEGER REFERENCES parent(id) DEFERRABLE INITIALLY DEFERRED
                );
                "#,
            )
            .await
            .unwrap();

        db.connection().execute("BEGIN TRANSACTION", ()).await.unwrap();
        db.connection()
            .execute("INSERT INTO child (parent_id) VALUES (1)", ())
            .await
            .unwrap();
        assert!(db.finish(Ok(())).await.is_err());

        // No transaction left open: a new one can start and the orphan row is gone.
        db.connection().execute("BEGIN TRANSACTION", ()).await.unwrap();
        db.connection().execute("ROLLBACK", ()).await.unwrap();
        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM child", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn standalone_writes_wait_for_the_write_lock() {
        let (db, user_id, post_id) = seeded().await;
        let blog = Blog::new(&db);

        let guard = db.write_lock().await;
        let pending = blog.add_reply(post_id, user_id, "depois");
        tokio::pin!(pending);
        assert!(
            tokio::time::timeout(Duration::from_millis(50), &mut pending)
                .await
                .is_err()
        );

        drop(guard);
        pending.await.unwrap();
    }
}
