use crate::config::Config;
use anyhow::{Context, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

/// Read-only view of the Create Spot data store. The export pipeline issues
/// no writes; the seed helpers below exist for tests.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CollectionRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubmissionRow {
    pub id: String,
    pub owner_id: String,
    pub title: Option<String>,
    pub body_html: Option<String>,
    pub image_url: Option<String>,
    pub focal_point: Option<String>,
    pub prompt_words: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressionRow {
    pub id: String,
    pub image_url: String,
}

impl Database {
    pub async fn new(config: &Config) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create db directory {:?}", parent))?;
            }
        }
        let db_url = format!("sqlite://{}?mode=rwc", config.db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .context("connect to sqlite")?;
        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> Result<()> {
        let schema = r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS users (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          slug TEXT,
          api_token TEXT UNIQUE
        );
        CREATE TABLE IF NOT EXISTS collections (
          id TEXT PRIMARY KEY,
          owner_id TEXT NOT NULL,
          name TEXT NOT NULL,
          description TEXT,
          FOREIGN KEY(owner_id) REFERENCES users(id)
        );
        CREATE TABLE IF NOT EXISTS submissions (
          id TEXT PRIMARY KEY,
          owner_id TEXT NOT NULL,
          collection_id TEXT,
          title TEXT,
          body_html TEXT,
          image_url TEXT,
          focal_point TEXT,
          prompt_words TEXT,
          sort_order INTEGER NOT NULL DEFAULT 0,
          FOREIGN KEY(owner_id) REFERENCES users(id),
          FOREIGN KEY(collection_id) REFERENCES collections(id)
        );
        CREATE INDEX IF NOT EXISTS submissions_collection_idx
          ON submissions(collection_id, sort_order);
        CREATE TABLE IF NOT EXISTS progressions (
          id TEXT PRIMARY KEY,
          submission_id TEXT NOT NULL,
          image_url TEXT NOT NULL,
          position INTEGER NOT NULL DEFAULT 0,
          FOREIGN KEY(submission_id) REFERENCES submissions(id)
        );
        CREATE INDEX IF NOT EXISTS progressions_submission_idx
          ON progressions(submission_id, position);
        "#;
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn user_by_token(&self, token: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query("SELECT id, name, slug FROM users WHERE api_token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(map_user))
    }

    pub async fn collection_by_id(&self, id: &str) -> Result<Option<CollectionRow>> {
        let row =
            sqlx::query("SELECT id, owner_id, name, description FROM collections WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(map_collection))
    }

    /// Child items of a collection in their curated order.
    pub async fn collection_items(&self, collection_id: &str) -> Result<Vec<SubmissionRow>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, title, body_html, image_url, focal_point, prompt_words \
             FROM submissions WHERE collection_id = ? ORDER BY sort_order ASC, id ASC",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(map_submission).collect())
    }

    pub async fn submission_by_id(&self, id: &str) -> Result<Option<SubmissionRow>> {
        let row = sqlx::query(
            "SELECT id, owner_id, title, body_html, image_url, focal_point, prompt_words \
             FROM submissions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(map_submission))
    }

    /// Work-in-progress snapshots in chronological order.
    pub async fn submission_progressions(&self, submission_id: &str) -> Result<Vec<ProgressionRow>> {
        let rows = sqlx::query(
            "SELECT id, image_url FROM progressions \
             WHERE submission_id = ? ORDER BY position ASC, id ASC",
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| ProgressionRow {
                id: row.get("id"),
                image_url: row.get("image_url"),
            })
            .collect())
    }

    pub async fn content_counts(&self) -> Result<(i64, i64)> {
        let row = sqlx::query(
            "SELECT (SELECT COUNT(*) FROM collections) AS collections, \
                    (SELECT COUNT(*) FROM submissions) AS submissions",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok((row.get("collections"), row.get("submissions")))
    }
}

fn map_user(row: SqliteRow) -> UserRow {
    UserRow {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
    }
}

fn map_collection(row: SqliteRow) -> CollectionRow {
    CollectionRow {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        description: row.get("description"),
    }
}

fn map_submission(row: SqliteRow) -> SubmissionRow {
    SubmissionRow {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        body_html: row.get("body_html"),
        image_url: row.get("image_url"),
        focal_point: row.get("focal_point"),
        prompt_words: row.get("prompt_words"),
    }
}

#[cfg(test)]
impl Database {
    pub async fn seed_user(&self, id: &str, name: &str, slug: Option<&str>, token: &str) {
        sqlx::query("INSERT INTO users (id, name, slug, api_token) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(slug)
            .bind(token)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn seed_collection(
        &self,
        id: &str,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
    ) {
        sqlx::query("INSERT INTO collections (id, owner_id, name, description) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(owner_id)
            .bind(name)
            .bind(description)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn seed_submission(
        &self,
        id: &str,
        owner_id: &str,
        collection_id: Option<&str>,
        title: Option<&str>,
        body_html: Option<&str>,
        image_url: Option<&str>,
        sort_order: i64,
    ) {
        sqlx::query(
            "INSERT INTO submissions (id, owner_id, collection_id, title, body_html, image_url, sort_order) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(owner_id)
        .bind(collection_id)
        .bind(title)
        .bind(body_html)
        .bind(image_url)
        .bind(sort_order)
        .execute(&self.pool)
        .await
        .unwrap();
    }

    pub async fn seed_progression(&self, id: &str, submission_id: &str, image_url: &str, position: i64) {
        sqlx::query(
            "INSERT INTO progressions (id, submission_id, image_url, position) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(submission_id)
        .bind(image_url)
        .bind(position)
        .execute(&self.pool)
        .await
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let mut config = Config::for_tests();
        config.db_path = dir.path().join("spot.db");
        let db = Database::new(&config).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn token_lookup_roundtrip() {
        let (_dir, db) = test_db().await;
        db.seed_user("u1", "Ana", Some("ana"), "token-1").await;
        let user = db.user_by_token("token-1").await.unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.slug.as_deref(), Some("ana"));
        assert!(db.user_by_token("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn collection_items_keep_curated_order() {
        let (_dir, db) = test_db().await;
        db.seed_user("u1", "Ana", None, "t").await;
        db.seed_collection("c1", "u1", "Week 1", None).await;
        db.seed_submission("s2", "u1", Some("c1"), Some("Second"), None, None, 2)
            .await;
        db.seed_submission("s1", "u1", Some("c1"), Some("First"), None, None, 1)
            .await;
        let items = db.collection_items("c1").await.unwrap();
        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn progressions_are_chronological() {
        let (_dir, db) = test_db().await;
        db.seed_user("u1", "Ana", None, "t").await;
        db.seed_submission("s1", "u1", None, None, None, None, 0)
            .await;
        db.seed_progression("p2", "s1", "https://cdn/p2.png", 2).await;
        db.seed_progression("p1", "s1", "https://cdn/p1.png", 1).await;
        let rows = db.submission_progressions("s1").await.unwrap();
        let urls: Vec<&str> = rows.iter().map(|row| row.image_url.as_str()).collect();
        assert_eq!(urls, vec!["https://cdn/p1.png", "https://cdn/p2.png"]);
    }
}
