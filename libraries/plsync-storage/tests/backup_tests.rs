//! Integration tests for startup backups and rotation

use plsync_storage::backup::{create_startup_backup, BackupKind, BackupManager};
use plsync_storage::StorageError;
use std::path::Path;

fn write_database(dir: &Path) -> std::path::PathBuf {
    let db = dir.join("strawberry.db");
    std::fs::write(&db, b"SQLite format 3\0 pretend catalog").unwrap();
    db
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_first_backup_is_exempt() {
    let dir = tempfile::tempdir().unwrap();
    let db = write_database(dir.path());
    let backups = dir.path().join("backups");

    let first = create_startup_backup(&db, &backups, 3).await.unwrap();
    assert_eq!(first.kind, BackupKind::BeforeFirstUse);
    assert_eq!(first.path, backups.join("strawberry_before_first_use.db"));
    assert_eq!(first.size, std::fs::metadata(&db).unwrap().len());
    assert_eq!(std::fs::read(&first.path).unwrap(), std::fs::read(&db).unwrap());

    let second = create_startup_backup(&db, &backups, 3).await.unwrap();
    assert_eq!(second.kind, BackupKind::Startup);
    assert!(second
        .path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("strawberry_backup_startup_"));
}

#[tokio::test]
async fn test_retention_keeps_newest_plus_exempt() {
    let dir = tempfile::tempdir().unwrap();
    let db = write_database(dir.path());
    let backups = dir.path().join("backups");
    std::fs::create_dir_all(&backups).unwrap();

    std::fs::write(backups.join("strawberry_before_first_use.db"), b"first").unwrap();
    for day in 1..=5 {
        let name = format!("strawberry_backup_startup_2020010{day}_080000.db");
        std::fs::write(backups.join(name), b"old").unwrap();
    }

    let record = create_startup_backup(&db, &backups, 3).await.unwrap();

    let names = file_names(&backups);
    assert_eq!(names.len(), 4, "{names:?}");
    assert!(names.contains(&"strawberry_before_first_use.db".to_string()));
    assert!(names.contains(&"strawberry_backup_startup_20200104_080000.db".to_string()));
    assert!(names.contains(&"strawberry_backup_startup_20200105_080000.db".to_string()));
    assert!(record.path.exists());
}

#[tokio::test]
async fn test_zero_retention_is_unlimited() {
    let dir = tempfile::tempdir().unwrap();
    let db = write_database(dir.path());
    let backups = dir.path().join("backups");

    let manager = BackupManager::new(&db, &backups, 0);
    for _ in 0..4 {
        manager.create_startup_backup().await.unwrap();
    }

    // Exempt + 3 startup backups, same-second ones get a numeric suffix
    assert_eq!(file_names(&backups).len(), 4);
    assert_eq!(manager.list_startup_backups().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_collisions_sort_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let db = write_database(dir.path());
    let backups = dir.path().join("backups");

    let manager = BackupManager::new(&db, &backups, 0);
    manager.create_startup_backup().await.unwrap();
    let older = manager.create_startup_backup().await.unwrap();
    let newer = manager.create_startup_backup().await.unwrap();

    let listed = manager.list_startup_backups().await.unwrap();
    let older_pos = listed.iter().position(|p| *p == older.path).unwrap();
    let newer_pos = listed.iter().position(|p| *p == newer.path).unwrap();
    assert!(newer_pos < older_pos);
}

#[tokio::test]
async fn test_missing_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = create_startup_backup(&dir.path().join("gone.db"), &dir.path().join("backups"), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Backup(_)));
}

#[tokio::test]
async fn test_empty_copy_fails_and_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("strawberry.db");
    std::fs::write(&db, b"").unwrap();
    let backups = dir.path().join("backups");

    let err = create_startup_backup(&db, &backups, 3).await.unwrap_err();
    assert!(matches!(err, StorageError::Backup(_)));
    assert!(file_names(&backups).is_empty());
}

#[tokio::test]
async fn test_listing_without_backup_directory() {
    let dir = tempfile::tempdir().unwrap();
    let db = write_database(dir.path());

    let manager = BackupManager::new(&db, dir.path().join("never_created"), 3);
    assert!(manager.list_startup_backups().await.unwrap().is_empty());
    assert!(manager.prune().await.unwrap().is_empty());
}
