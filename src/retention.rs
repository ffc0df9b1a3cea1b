use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use tracing::{info, warn};

use crate::records::repo::RecordStore;
use crate::storage::StorageClient;

#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub cutoff: PrimitiveDateTime,
    pub files_removed: usize,
    pub files_failed: usize,
    pub rows_deleted: u64,
}

pub async fn sweep(
    store: &RecordStore,
    storage: &dyn StorageClient,
    retention_days: i64,
) -> anyhow::Result<SweepReport> {
    let now = OffsetDateTime::now_utc();
    let cutoff = PrimitiveDateTime::new(now.date(), now.time()) - Duration::days(retention_days);
    sweep_before(store, storage, cutoff).await
}

/// Deletes files first, then rows, for everything dated before `cutoff`.
/// File deletion is best-effort.
pub async fn sweep_before(
    store: &RecordStore,
    storage: &dyn StorageClient,
    cutoff: PrimitiveDateTime,
) -> anyhow::Result<SweepReport> {
    let filenames = store.stale_filenames(cutoff).await?;

    let mut files_removed = 0;
    let mut files_failed = 0;
    for filename in &filenames {
        match storage.delete_object(filename).await {
            Ok(()) => files_removed += 1,
            Err(e) => {
                files_failed += 1;
                warn!(error = %e, %filename, "failed to delete expired upload");
            }
        }
    }

    let rows_deleted = store.purge_older_than(cutoff).await?;

    let report = SweepReport {
        cutoff,
        files_removed,
        files_failed,
        rows_deleted,
    };
    info!(
        cutoff = %cutoff,
        files_removed,
        files_failed,
        rows_deleted,
        "retention sweep finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::db::connect_in_memory;
    use crate::records::repo::test_support::insert_at;
    use crate::storage::LocalStorage;

    async fn fixtures() -> (tempfile::TempDir, RecordStore, LocalStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let store = RecordStore::new(connect_in_memory().await);
        store.init().await.unwrap();
        (dir, store, storage)
    }

    fn days_ago(days: i64) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_utc();
        PrimitiveDateTime::new(now.date(), now.time()) - Duration::days(days)
    }

    #[tokio::test]
    async fn removes_expired_files_and_rows() {
        let (dir, store, storage) = fixtures().await;
        for name in ["old.jpg", "fresh.jpg"] {
            storage
                .put_object(name, Bytes::from_static(b"img"))
                .await
                .unwrap();
        }
        insert_at(&store, "old.jpg", 52.0, days_ago(9)).await;
        insert_at(&store, "fresh.jpg", 52.0, days_ago(2)).await;

        let report = sweep(&store, &storage, 7).await.unwrap();

        assert_eq!(report.files_removed, 1);
        assert_eq!(report.files_failed, 0);
        assert_eq!(report.rows_deleted, 1);
        assert!(!dir.path().join("old.jpg").exists());
        assert!(dir.path().join("fresh.jpg").exists());

        let left = store.list_all().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].filename, "fresh.jpg");
    }

    #[tokio::test]
    async fn missing_files_do_not_stop_the_sweep() {
        let (_dir, store, storage) = fixtures().await;
        insert_at(&store, "gone.jpg", 10.0, days_ago(30)).await;
        insert_at(&store, "also-gone.png", 10.0, days_ago(8)).await;

        let report = sweep(&store, &storage, 7).await.unwrap();

        assert_eq!(report.files_removed, 0);
        assert_eq!(report.files_failed, 2);
        assert_eq!(report.rows_deleted, 2);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn explicit_cutoff_keeps_newer_rows() {
        let (_dir, store, storage) = fixtures().await;
        let cutoff = days_ago(3);
        insert_at(&store, "a.jpg", 1.0, cutoff - Duration::hours(1)).await;
        insert_at(&store, "b.jpg", 1.0, cutoff).await;
        insert_at(&store, "c.jpg", 1.0, cutoff + Duration::hours(1)).await;

        let report = sweep_before(&store, &storage, cutoff).await.unwrap();

        assert_eq!(report.rows_deleted, 1);
        let mut left: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.filename)
            .collect();
        left.sort();
        assert_eq!(left, vec!["b.jpg", "c.jpg"]);
    }
}
