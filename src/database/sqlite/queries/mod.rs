use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

use super::FingerprintEntry;

pub struct FingerprintQueries;

impl FingerprintQueries {
    #[inline]
    pub async fn get(pool: &SqlitePool, doc_id: &str) -> Result<Option<FingerprintEntry>> {
        let row = sqlx::query(
            r#"
            SELECT doc_id, path, content_sha, chunk_count, ingested_at
            FROM fingerprints WHERE doc_id = ?
            "#,
        )
        .bind(doc_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get fingerprint")?;

        Ok(row.map(|row| FingerprintEntry {
            doc_id: row.get("doc_id"),
            path: row.get("path"),
            content_sha: row.get("content_sha"),
            chunk_count: row.get("chunk_count"),
            ingested_at: row.get("ingested_at"),
        }))
    }

    #[inline]
    pub async fn upsert(pool: &SqlitePool, entry: &FingerprintEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fingerprints (doc_id, path, content_sha, chunk_count, ingested_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(doc_id) DO UPDATE SET
                path = excluded.path,
                content_sha = excluded.content_sha,
                chunk_count = excluded.chunk_count,
                ingested_at = excluded.ingested_at
            "#,
        )
        .bind(&entry.doc_id)
        .bind(&entry.path)
        .bind(&entry.content_sha)
        .bind(entry.chunk_count)
        .bind(&entry.ingested_at)
        .execute(pool)
        .await
        .context("Failed to upsert fingerprint")?;

        Ok(())
    }

    #[inline]
    pub async fn list_doc_ids(pool: &SqlitePool) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT doc_id FROM fingerprints ORDER BY doc_id")
            .fetch_all(pool)
            .await
            .context("Failed to list fingerprint ids")?;

        Ok(rows.into_iter().map(|row| row.get("doc_id")).collect())
    }

    #[inline]
    pub async fn remove(pool: &SqlitePool, doc_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM fingerprints WHERE doc_id = ?")
            .bind(doc_id)
            .execute(pool)
            .await
            .context("Failed to remove fingerprint")?;

        Ok(result.rows_affected() > 0)
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fingerprints")
            .fetch_one(pool)
            .await
            .context("Failed to count fingerprints")?;

        Ok(count)
    }
}
