use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::Result;
use crate::models::DropFile;
use crate::storage::StorageProvider;

/// Archive builder service
pub struct ArchiveService;

impl ArchiveService {
    /// Assemble a drop's files into one zip, entry names taken verbatim from
    /// each file's relative path so folder nesting survives the round trip.
    /// Duplicate entry names are allowed by the format and accepted here.
    ///
    /// Any unreadable blob aborts the build; a partial archive is never
    /// returned as success.
    pub async fn build_archive(
        storage: &dyn StorageProvider,
        files: &[DropFile],
    ) -> Result<Bytes> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        for file in files {
            let data = storage.get(&file.storage_path).await?;
            writer.start_file(file.relative_path.as_str(), options)?;
            writer.write_all(&data)?;
        }

        let cursor = writer.finish()?;
        Ok(Bytes::from(cursor.into_inner()))
    }
}
