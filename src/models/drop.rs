use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Drop model - one shareable batch of uploaded files
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Drop {
    pub id: String,
    pub code: String,
    pub global_context: Option<String>,
    pub created_at: String,
    pub expires_at: String,
}

/// File entry model - one uploaded file within a drop
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DropFile {
    pub id: String,
    pub drop_id: String,
    pub relative_path: String,
    pub item_context: Option<String>,
    pub storage_path: String,
    pub size: i64,
    pub position: i64,
    pub created_at: String,
}

impl DropFile {
    /// Final segment of the relative path, used as the suggested filename
    /// for single-file downloads.
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// One item of an upload request, as handed to the lifecycle service
#[derive(Debug, Clone)]
pub struct NewDropItem {
    pub relative_path: String,
    pub item_context: Option<String>,
    pub bytes: Bytes,
}

/// Response to a successful upload
#[derive(Debug, Serialize)]
pub struct CreatedDrop {
    pub code: String,
    pub expires_at: String,
}

/// One file entry as listed in a retrieval response
#[derive(Debug, Serialize)]
pub struct DropFileInfo {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: i64,
    pub context: Option<String>,
}

impl From<DropFile> for DropFileInfo {
    fn from(file: DropFile) -> Self {
        Self {
            name: file.file_name().to_string(),
            id: file.id,
            path: file.relative_path,
            size: file.size,
            context: file.item_context,
        }
    }
}

/// Retrieval response for a live drop
#[derive(Debug, Serialize)]
pub struct DropInfo {
    pub code: String,
    pub global_context: Option<String>,
    pub files: Vec<DropFileInfo>,
    pub expires_at: String,
}

/// Retrieve query parameters
#[derive(Debug, Deserialize)]
pub struct RetrieveQuery {
    pub code: String,
}
