//! Time-bounded access to the code store.

use crate::{ClaimOutcome, CodeKind, CodeRecord, EngineError, EngineResult, IssuanceStatus};
use redeem_database::{queries, AsyncDatabase, DatabaseResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::error;

/// Code store handle. Cheap to clone; clones share one executor.
///
/// A call that times out may still complete on the executor thread. The
/// store is then either fully updated or untouched, never half-written.
#[derive(Clone)]
pub struct CodeStore {
    db: AsyncDatabase,
    timeout: Duration,
}

impl CodeStore {
    pub fn new(db: AsyncDatabase, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    pub fn database(&self) -> &AsyncDatabase {
        &self.db
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = DatabaseResult<T>>,
    ) -> EngineResult<T> {
        match timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(op, error = %e, "Store operation failed");
                Err(EngineError::StoreUnavailable(e))
            }
            Err(_) => {
                error!(op, timeout_ms = self.timeout.as_millis() as u64, "Store operation timed out");
                Err(EngineError::StoreTimeout(self.timeout))
            }
        }
    }

    /// Create the record for (code, kind) unless it already exists.
    pub async fn ensure_issued(&self, code: &str, kind: CodeKind) -> EngineResult<IssuanceStatus> {
        let code = code.to_string();
        self.bounded(
            "ensure_issued",
            self.db
                .call(move |conn| queries::insert_code_if_absent(conn, kind, &code)),
        )
        .await
    }

    /// Atomically flip (code, kind) from unused to used.
    pub async fn claim(&self, code: &str, kind: CodeKind) -> EngineResult<ClaimOutcome> {
        let code = code.to_string();
        self.bounded(
            "claim",
            self.db.call(move |conn| queries::claim_code(conn, kind, &code)),
        )
        .await
    }

    pub async fn get(&self, code: &str, kind: CodeKind) -> EngineResult<Option<CodeRecord>> {
        let code = code.to_string();
        self.bounded(
            "get",
            self.db.call(move |conn| queries::get_code(conn, kind, &code)),
        )
        .await
    }

    /// (issued, used) counts for a namespace.
    pub async fn counts(&self, kind: CodeKind) -> EngineResult<(i64, i64)> {
        self.bounded(
            "counts",
            self.db.call(move |conn| {
                let issued = queries::count_codes(conn, kind, None)?;
                let used = queries::count_codes(conn, kind, Some(true))?;
                Ok((issued, used))
            }),
        )
        .await
    }

    pub async fn health_check(&self) -> EngineResult<()> {
        self.bounded("health_check", self.db.health_check()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    async fn store(timeout: Duration) -> (TempDir, CodeStore) {
        let dir = tempdir().unwrap();
        let db = AsyncDatabase::open(&dir.path().join("codes.db")).await.unwrap();
        (dir, CodeStore::new(db, timeout))
    }

    #[tokio::test]
    async fn concurrent_ensure_issued_creates_one_record() {
        let (_dir, store) = store(Duration::from_secs(5)).await;

        let mut handles = vec![];
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.ensure_issued("316ca0efda62", CodeKind::Beta).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == IssuanceStatus::Created {
                created += 1;
            }
        }
        assert_eq!(created, 1);

        let (issued, used) = store.counts(CodeKind::Beta).await.unwrap();
        assert_eq!((issued, used), (1, 0));
        let record = store.get("316ca0efda62", CodeKind::Beta).await.unwrap().unwrap();
        assert!(!record.used);
    }

    #[tokio::test]
    async fn stalled_executor_reports_store_timeout() {
        let (_dir, store) = store(Duration::from_millis(50)).await;

        // Queries run FIFO on one thread; park it so the claim cannot start.
        let db = store.database().clone();
        let stall = tokio::spawn(async move {
            db.call_sqlite(|_| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(())
            })
            .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = store.claim("316ca0efda62", CodeKind::Beta).await.unwrap_err();
        assert!(matches!(err, EngineError::StoreTimeout(_)));
        assert!(err.is_store_failure());
        stall.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn closed_database_reports_store_unavailable() {
        let (_dir, store) = store(Duration::from_secs(5)).await;
        store.database().clone().close().await.unwrap();

        let err = store.ensure_issued("316ca0efda62", CodeKind::Beta).await.unwrap_err();
        assert!(matches!(err, EngineError::StoreUnavailable(_)));
        assert!(store.health_check().await.is_err());
    }
}
