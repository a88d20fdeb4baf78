//! Archive builder tests: entry naming, ordering, duplicates, and failure
//! behavior when a blob has gone missing.

mod common;

use std::io::{Cursor, Read};

use common::{item, setup};
use quickdrop::models::Drop;
use quickdrop::services::{ArchiveService, DropService};
use quickdrop::storage::StorageProvider;

async fn create_drop_files(
    env: &common::TestEnv,
    items: Vec<quickdrop::models::NewDropItem>,
) -> Vec<quickdrop::models::DropFile> {
    let created = DropService::create_drop(&env.db, env.storage.as_ref(), &env.policy, None, items, None)
        .await
        .unwrap();
    let drop: Drop = sqlx::query_as("SELECT * FROM drops WHERE code = ?")
        .bind(&created.code)
        .fetch_one(env.db.pool())
        .await
        .unwrap();
    DropService::list_files(&env.db, &drop.id).await.unwrap()
}

#[tokio::test]
async fn archive_preserves_folder_structure() {
    let env = setup().await;
    let files = create_drop_files(
        &env,
        vec![item("a/b.txt", None, b"nested"), item("c.txt", None, b"flat")],
    )
    .await;

    let data = ArchiveService::build_archive(env.storage.as_ref(), &files)
        .await
        .unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(data.to_vec())).unwrap();
    assert_eq!(archive.len(), 2);

    let names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
    assert!(names.contains(&"a/b.txt".to_string()));
    assert!(names.contains(&"c.txt".to_string()));

    let mut content = String::new();
    archive
        .by_name("a/b.txt")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "nested");

    content.clear();
    archive
        .by_name("c.txt")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "flat");
}

#[tokio::test]
async fn archive_entries_follow_upload_order() {
    let env = setup().await;
    let files = create_drop_files(
        &env,
        vec![
            item("z.txt", None, b"last name, first position"),
            item("a.txt", None, b"first name, last position"),
        ],
    )
    .await;

    let data = ArchiveService::build_archive(env.storage.as_ref(), &files)
        .await
        .unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(data.to_vec())).unwrap();
    assert_eq!(archive.by_index(0).unwrap().name(), "z.txt");
    assert_eq!(archive.by_index(1).unwrap().name(), "a.txt");
}

#[tokio::test]
async fn duplicate_entry_names_are_accepted() {
    let env = setup().await;
    let files = create_drop_files(
        &env,
        vec![
            item("same.txt", None, b"one"),
            item("same.txt", None, b"two"),
        ],
    )
    .await;

    let data = ArchiveService::build_archive(env.storage.as_ref(), &files)
        .await
        .unwrap();

    let archive = zip::ZipArchive::new(Cursor::new(data.to_vec())).unwrap();
    assert_eq!(archive.len(), 2);
}

#[tokio::test]
async fn missing_blob_aborts_the_build() {
    let env = setup().await;
    let files = create_drop_files(
        &env,
        vec![item("a.txt", None, b"a"), item("b.txt", None, b"b")],
    )
    .await;

    // Simulate a blob lost out from under the metadata
    env.storage.delete(&files[1].storage_path).await.unwrap();

    let result = ArchiveService::build_archive(env.storage.as_ref(), &files).await;
    assert!(result.is_err());
}
