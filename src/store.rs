//! SQLite-backed conversation store.
//!
//! [`ConversationStore`] is the only component that reads or writes the
//! `conversations` table, and it owns the encryption boundary: summaries are
//! encrypted before every insert and decrypted per record on every read.
//!
//! Reads never fail because of one bad envelope. Each [`Conversation`]
//! carries its own `Result` for the decrypted text, so a corrupt or
//! foreign-key record is still listed and the caller decides how to render
//! it (see [`Conversation::into_item`]).
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`create`](ConversationStore::create) | Encrypt and insert a new record |
//! | [`list`](ConversationStore::list) | Newest-first, bounded, decrypted per record |
//! | [`get`](ConversationStore::get) | One record, decrypted |
//! | [`rename`](ConversationStore::rename) | Replace the title, nothing else |
//! | [`delete`](ConversationStore::delete) | Remove a record; absent ids are not an error |

use std::sync::Arc;

use anyhow::Context;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::cipher::Cipher;
use crate::config::Config;
use crate::error::{DigestError, Result};
use crate::models::{Conversation, ConversationRecord};
use crate::{db, migrate};

const SELECT_COLUMNS: &str =
    "SELECT id, ciphertext, original_filename, page_count, title, created_at FROM conversations";

/// Opens the configured database behind the configured key.
///
/// The key is checked before the database is touched: without one the
/// encrypted path refuses to start.
pub async fn open_store(config: &Config) -> anyhow::Result<ConversationStore> {
    let cipher = Cipher::from_config(&config.cipher)
        .context("refusing to open the conversation store without a secret key")?;
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    Ok(ConversationStore::new(pool, Arc::new(cipher)))
}

#[derive(Clone)]
pub struct ConversationStore {
    pool: SqlitePool,
    cipher: Arc<Cipher>,
}

impl ConversationStore {
    pub fn new(pool: SqlitePool, cipher: Arc<Cipher>) -> Self {
        Self { pool, cipher }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Encrypts `plain_summary` and persists a new record.
    pub async fn create(
        &self,
        plain_summary: &str,
        original_filename: Option<&str>,
        page_count: Option<u32>,
        title: &str,
    ) -> Result<ConversationRecord> {
        let envelope = self.cipher.encrypt(plain_summary)?;

        let record = ConversationRecord {
            id: Uuid::new_v4().to_string(),
            ciphertext: envelope.to_string(),
            original_filename: original_filename.map(str::to_string),
            page_count,
            title: title.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        };

        self.insert_record(&record).await?;
        tracing::debug!(id = %record.id, "conversation created");
        Ok(record)
    }

    /// Writes a record exactly as given. `create` is the only caller outside tests.
    pub(crate) async fn insert_record(&self, record: &ConversationRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, ciphertext, original_filename, page_count, title, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.ciphertext)
        .bind(&record.original_filename)
        .bind(record.page_count.map(i64::from))
        .bind(&record.title)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns at most `limit` conversations, newest first.
    pub async fn list(&self, limit: i64) -> Result<Vec<Conversation>> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY created_at DESC, rowid DESC LIMIT ?",
            SELECT_COLUMNS
        ))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| self.open(record_from_row(row)))
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<Conversation> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DigestError::NotFound(id.to_string()))?;

        Ok(self.open(record_from_row(&row)))
    }

    /// Replaces the title of an existing record and returns the updated row.
    pub async fn rename(&self, id: &str, new_title: &str) -> Result<ConversationRecord> {
        let title = new_title.trim();
        if title.is_empty() {
            return Err(DigestError::InvalidTitle);
        }

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE conversations SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DigestError::NotFound(id.to_string()));
        }

        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(record_from_row(&row))
    }

    /// Deletes a record. Deleting an id that does not exist succeeds.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            tracing::debug!(id, "delete: no such conversation");
        }
        Ok(())
    }

    fn open(&self, record: ConversationRecord) -> Conversation {
        let text = self.cipher.decrypt_str(&record.ciphertext);
        if let Err(ref e) = text {
            tracing::warn!(id = %record.id, error = %e, "conversation could not be decrypted");
        }

        Conversation {
            id: record.id,
            title: record.title,
            original_filename: record.original_filename,
            page_count: record.page_count,
            created_at: record.created_at,
            text,
        }
    }
}

fn record_from_row(row: &SqliteRow) -> ConversationRecord {
    let page_count: Option<i64> = row.get("page_count");
    ConversationRecord {
        id: row.get("id"),
        ciphertext: row.get("ciphertext"),
        original_filename: row.get("original_filename"),
        page_count: page_count.and_then(|n| u32::try_from(n).ok()),
        title: row.get("title"),
        created_at: row.get("created_at"),
    }
}
