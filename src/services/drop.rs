use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::DropsConfig;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{CreatedDrop, Drop, DropFile, DropFileInfo, DropInfo, NewDropItem};
use crate::services::code::{generate_code, MAX_CODE_ATTEMPTS};
use crate::storage::StorageProvider;

/// Drop lifecycle service
pub struct DropService;

impl DropService {
    /// Create a drop from a batch of uploaded items.
    ///
    /// Either every item's blob and row land together with the drop row, or
    /// the caller sees an error and nothing remains: any failure mid-batch
    /// deletes the blobs written so far and the drop row.
    pub async fn create_drop(
        db: &Database,
        storage: &dyn StorageProvider,
        policy: &DropsConfig,
        global_context: Option<String>,
        items: Vec<NewDropItem>,
        explicit_expires_at: Option<DateTime<Utc>>,
    ) -> Result<CreatedDrop> {
        if items.is_empty() {
            return Err(AppError::InvalidRequest("No files uploaded".to_string()));
        }
        if items.len() > policy.max_files {
            return Err(AppError::InvalidRequest(format!(
                "Maximum {} files allowed",
                policy.max_files
            )));
        }

        // Validate every path before mutating any state
        let mut sanitized_paths = Vec::with_capacity(items.len());
        for item in &items {
            sanitized_paths.push(sanitize_relative_path(&item.relative_path)?);
        }

        let now = Utc::now();
        let expires_at =
            explicit_expires_at.unwrap_or_else(|| now + Duration::hours(policy.default_ttl_hours));

        let drop_id = Uuid::new_v4().to_string();
        let code = Self::insert_drop_row(db, &drop_id, &global_context, now, expires_at).await?;

        let mut written_blobs: Vec<String> = Vec::new();
        for (position, (item, relative_path)) in
            items.into_iter().zip(sanitized_paths).enumerate()
        {
            let file_id = Uuid::new_v4().to_string();
            // Blobs are keyed by generated ids, never by the original
            // filename, so a flat namespace cannot collide across drops.
            let storage_path = format!("{}/{}", drop_id, file_id);
            let size = item.bytes.len() as i64;

            if let Err(e) = storage.put(&storage_path, item.bytes).await {
                Self::rollback_create(db, storage, &drop_id, &written_blobs).await;
                return Err(e);
            }
            written_blobs.push(storage_path.clone());

            let result = sqlx::query(
                r#"
                INSERT INTO drop_files (id, drop_id, relative_path, item_context, storage_path, size, position, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&file_id)
            .bind(&drop_id)
            .bind(&relative_path)
            .bind(&item.item_context)
            .bind(&storage_path)
            .bind(size)
            .bind(position as i64)
            .bind(now.to_rfc3339())
            .execute(db.pool())
            .await;

            if let Err(e) = result {
                Self::rollback_create(db, storage, &drop_id, &written_blobs).await;
                return Err(e.into());
            }
        }

        tracing::info!("Created drop {} with code {}", drop_id, code);

        Ok(CreatedDrop {
            code,
            expires_at: expires_at.to_rfc3339(),
        })
    }

    /// Insert the drop row, retrying with a fresh random code when two
    /// creators drew the same candidate between generation and commit.
    async fn insert_drop_row(
        db: &Database,
        drop_id: &str,
        global_context: &Option<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_code();
            match Self::try_insert_drop(db, drop_id, &code, global_context, created_at, expires_at)
                .await
            {
                Ok(()) => return Ok(code),
                Err(AppError::DuplicateCode) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Internal(format!(
            "Failed to allocate a unique drop code after {} attempts",
            MAX_CODE_ATTEMPTS
        )))
    }

    /// Single optimistic insert. Uniqueness of the code is enforced by the
    /// database constraint, not by a prior lookup; a conflict surfaces as
    /// DuplicateCode for the caller to retry.
    pub async fn try_insert_drop(
        db: &Database,
        drop_id: &str,
        code: &str,
        global_context: &Option<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO drops (id, code, global_context, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(drop_id)
        .bind(code)
        .bind(global_context)
        .bind(created_at.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(db.pool())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let is_code_conflict = match &e {
                    sqlx::Error::Database(db_err) => db_err
                        .message()
                        .contains("UNIQUE constraint failed: drops.code"),
                    _ => false,
                };
                if is_code_conflict {
                    Err(AppError::DuplicateCode)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    /// Undo a partially created drop: remove written blobs, then the drop
    /// row (which cascades to any file rows already inserted).
    async fn rollback_create(
        db: &Database,
        storage: &dyn StorageProvider,
        drop_id: &str,
        written_blobs: &[String],
    ) {
        for path in written_blobs {
            if let Err(e) = storage.delete(path).await {
                tracing::warn!("Failed to remove blob {} during rollback: {}", path, e);
            }
        }
        if let Err(e) = sqlx::query("DELETE FROM drops WHERE id = ?")
            .bind(drop_id)
            .execute(db.pool())
            .await
        {
            tracing::error!("Failed to remove drop {} during rollback: {}", drop_id, e);
        }
    }

    /// Retrieve a drop's metadata by code.
    ///
    /// Lazy expiry: a drop queried past its deadline is deleted here as a
    /// side effect and reported as Expired.
    pub async fn retrieve_drop(
        db: &Database,
        storage: &dyn StorageProvider,
        code: &str,
    ) -> Result<DropInfo> {
        let drop = Self::find_by_code(db, code)
            .await?
            .ok_or_else(|| AppError::NotFound("Drop not found".to_string()))?;

        if Self::is_expired(&drop, Utc::now())? {
            Self::delete_drop(db, storage, &drop).await?;
            return Err(AppError::Expired);
        }

        let files = Self::list_files(db, &drop.id).await?;

        Ok(DropInfo {
            code: drop.code,
            global_context: drop.global_context,
            files: files.into_iter().map(DropFileInfo::from).collect(),
            expires_at: drop.expires_at,
        })
    }

    /// Look up a live drop without the lazy-expiry side effect. Expired
    /// drops fail closed here; only the retrieval path deletes them.
    pub async fn get_active_drop(db: &Database, code: &str) -> Result<Drop> {
        let drop = Self::find_by_code(db, code)
            .await?
            .ok_or_else(|| AppError::NotFound("Drop not found".to_string()))?;

        if Self::is_expired(&drop, Utc::now())? {
            return Err(AppError::Expired);
        }

        Ok(drop)
    }

    /// Open one file's bytes for a direct download link.
    ///
    /// Expired entries fail closed without deleting the drop: a stale link
    /// must not destroy a drop another client may be actively retrieving.
    pub async fn open_file(
        db: &Database,
        storage: &dyn StorageProvider,
        file_id: &str,
    ) -> Result<(DropFile, Bytes)> {
        let file: DropFile = sqlx::query_as("SELECT * FROM drop_files WHERE id = ?")
            .bind(file_id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        let drop: Drop = sqlx::query_as("SELECT * FROM drops WHERE id = ?")
            .bind(&file.drop_id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        if Self::is_expired(&drop, Utc::now())? {
            return Err(AppError::Expired);
        }

        let data = storage.get(&file.storage_path).await?;
        Ok((file, data))
    }

    /// File entries of a drop in upload order.
    pub async fn list_files(db: &Database, drop_id: &str) -> Result<Vec<DropFile>> {
        let files = sqlx::query_as("SELECT * FROM drop_files WHERE drop_id = ? ORDER BY position ASC")
            .bind(drop_id)
            .fetch_all(db.pool())
            .await?;
        Ok(files)
    }

    /// Delete a drop, its file entries, and their blobs.
    ///
    /// Blob deletion is best-effort: metadata removal is what makes the drop
    /// unretrievable, an orphaned blob only leaks storage. Idempotent, since
    /// lazy expiry can race the purge sweep for the same drop.
    pub async fn delete_drop(
        db: &Database,
        storage: &dyn StorageProvider,
        drop: &Drop,
    ) -> Result<()> {
        let files = Self::list_files(db, &drop.id).await?;

        for file in &files {
            if let Err(e) = storage.delete(&file.storage_path).await {
                tracing::warn!(
                    "Failed to delete blob {} for drop {}: {}",
                    file.storage_path,
                    drop.code,
                    e
                );
            }
        }

        // rows_affected of zero means the other deleter won; that is fine
        sqlx::query("DELETE FROM drops WHERE id = ?")
            .bind(&drop.id)
            .execute(db.pool())
            .await?;

        tracing::debug!("Deleted drop {}", drop.code);
        Ok(())
    }

    /// Delete every drop whose deadline is behind `now`. Returns the number
    /// of drops purged; per-drop failures are logged and skipped.
    pub async fn purge_expired(
        db: &Database,
        storage: &dyn StorageProvider,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let expired: Vec<Drop> = sqlx::query_as("SELECT * FROM drops WHERE expires_at < ?")
            .bind(now.to_rfc3339())
            .fetch_all(db.pool())
            .await?;

        let mut purged = 0u64;
        for drop in &expired {
            match Self::delete_drop(db, storage, drop).await {
                Ok(()) => purged += 1,
                Err(e) => tracing::error!("Failed to purge drop {}: {}", drop.code, e),
            }
        }

        Ok(purged)
    }

    async fn find_by_code(db: &Database, code: &str) -> Result<Option<Drop>> {
        let drop = sqlx::query_as("SELECT * FROM drops WHERE code = ?")
            .bind(code)
            .fetch_optional(db.pool())
            .await?;
        Ok(drop)
    }

    fn is_expired(drop: &Drop, now: DateTime<Utc>) -> Result<bool> {
        let expiry = DateTime::parse_from_rfc3339(&drop.expires_at).map_err(|e| {
            AppError::Internal(format!("Bad expires_at on drop {}: {}", drop.code, e))
        })?;
        Ok(expiry < now)
    }
}

/// Normalize a caller-supplied relative path for use as a storage-neutral
/// archive entry name and download filename.
///
/// Backslashes become separators, empty and `.` segments are dropped, and
/// `..` or NUL-bearing segments are rejected outright: the path is untrusted
/// metadata and must never be able to point outside an extraction root.
pub fn sanitize_relative_path(raw: &str) -> Result<String> {
    let normalized = raw.replace('\\', "/");

    let mut segments = Vec::new();
    for segment in normalized.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." || segment.contains('\0') {
            return Err(AppError::InvalidRequest(format!(
                "Invalid file path: {}",
                raw
            )));
        }
        segments.push(segment);
    }

    if segments.is_empty() {
        return Err(AppError::InvalidRequest("Empty file path".to_string()));
    }

    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::sanitize_relative_path;

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(sanitize_relative_path("file.txt").unwrap(), "file.txt");
        assert_eq!(
            sanitize_relative_path("folder/sub/file.txt").unwrap(),
            "folder/sub/file.txt"
        );
    }

    #[test]
    fn backslashes_and_leading_slashes_normalize() {
        assert_eq!(
            sanitize_relative_path("folder\\sub\\file.txt").unwrap(),
            "folder/sub/file.txt"
        );
        assert_eq!(sanitize_relative_path("/etc/name").unwrap(), "etc/name");
        assert_eq!(sanitize_relative_path("a//b/./c").unwrap(), "a/b/c");
    }

    #[test]
    fn traversal_is_rejected() {
        assert!(sanitize_relative_path("../evil.txt").is_err());
        assert!(sanitize_relative_path("folder/../../evil.txt").is_err());
        assert!(sanitize_relative_path("..\\evil.txt").is_err());
    }

    #[test]
    fn empty_paths_are_rejected() {
        assert!(sanitize_relative_path("").is_err());
        assert!(sanitize_relative_path("///").is_err());
        assert!(sanitize_relative_path(".").is_err());
    }
}
