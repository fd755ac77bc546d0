//! Query functions over a `&Connection`.
//!
//! The two write paths each run as one statement inside a `BEGIN IMMEDIATE`
//! transaction. The write lock is taken before anything is read, so the
//! statements stay single-winner even when several connections or processes
//! share the database file.

use crate::{ClaimOutcome, CodeKind, CodeRecord, DatabaseError, DatabaseResult, IssuanceStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::debug;

fn immediate(conn: &Connection) -> DatabaseResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

/// Insert a code unless a record for (kind, code) already exists.
pub fn insert_code_if_absent(
    conn: &Connection,
    kind: CodeKind,
    code: &str,
) -> DatabaseResult<IssuanceStatus> {
    let now = Utc::now().to_rfc3339();
    let tx = immediate(conn)?;
    let inserted = tx.execute(
        "INSERT INTO codes (kind, code, used, created_at)
         VALUES (?1, ?2, 0, ?3)
         ON CONFLICT(kind, code) DO NOTHING",
        params![kind.as_str(), code, now],
    )?;
    tx.commit()?;

    let status = if inserted == 1 {
        IssuanceStatus::Created
    } else {
        IssuanceStatus::AlreadyIssued
    };
    debug!(kind = %kind, status = ?status, "Insert-if-absent");
    Ok(status)
}

/// Flip an unused code to used.
///
/// The conditional update alone decides the outcome. When it changes no row
/// the record is looked up in the same transaction only to report which kind
/// of miss it was.
pub fn claim_code(conn: &Connection, kind: CodeKind, code: &str) -> DatabaseResult<ClaimOutcome> {
    let now = Utc::now().to_rfc3339();
    let tx = immediate(conn)?;
    let changed = tx.execute(
        "UPDATE codes SET used = 1, used_at = ?3
         WHERE kind = ?1 AND code = ?2 AND used = 0",
        params![kind.as_str(), code, now],
    )?;

    let outcome = if changed == 1 {
        ClaimOutcome::Claimed
    } else {
        let exists = tx
            .query_row(
                "SELECT 1 FROM codes WHERE kind = ?1 AND code = ?2",
                params![kind.as_str(), code],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if exists {
            ClaimOutcome::AlreadyUsed
        } else {
            ClaimOutcome::NotIssued
        }
    };
    tx.commit()?;

    Ok(outcome)
}

/// Get a code record.
pub fn get_code(conn: &Connection, kind: CodeKind, code: &str) -> DatabaseResult<Option<CodeRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT kind, code, used, created_at, used_at
         FROM codes WHERE kind = ?1 AND code = ?2",
    )?;

    let row = stmt
        .query_row(params![kind.as_str(), code], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })
        .optional()?;

    let Some((kind, code, used, created_at, used_at)) = row else {
        return Ok(None);
    };

    Ok(Some(CodeRecord {
        kind: CodeKind::parse(&kind)
            .ok_or_else(|| DatabaseError::InvalidData(format!("unknown code kind {kind}")))?,
        code,
        used,
        created_at: parse_datetime(&created_at)?,
        used_at: used_at.as_deref().map(parse_datetime).transpose()?,
    }))
}

/// Count codes in a namespace, optionally filtered by `used`.
pub fn count_codes(conn: &Connection, kind: CodeKind, used: Option<bool>) -> DatabaseResult<i64> {
    let count = match used {
        Some(used) => conn.query_row(
            "SELECT COUNT(*) FROM codes WHERE kind = ?1 AND used = ?2",
            params![kind.as_str(), used],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COUNT(*) FROM codes WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?,
    };
    Ok(count)
}

fn parse_datetime(s: &str) -> DatabaseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::InvalidData(format!("bad timestamp {s}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_is_idempotent() {
        let conn = conn();

        let first = insert_code_if_absent(&conn, CodeKind::Beta, "a1b2c3d4e5f6").unwrap();
        let second = insert_code_if_absent(&conn, CodeKind::Beta, "a1b2c3d4e5f6").unwrap();

        assert_eq!(first, IssuanceStatus::Created);
        assert_eq!(second, IssuanceStatus::AlreadyIssued);
        assert_eq!(count_codes(&conn, CodeKind::Beta, None).unwrap(), 1);
    }

    #[test]
    fn new_record_is_unused_with_creation_time() {
        let conn = conn();
        let before = Utc::now();
        insert_code_if_absent(&conn, CodeKind::Verify, "0123456789ab").unwrap();

        let record = get_code(&conn, CodeKind::Verify, "0123456789ab")
            .unwrap()
            .unwrap();
        assert_eq!(record.kind, CodeKind::Verify);
        assert!(!record.used);
        assert!(record.used_at.is_none());
        assert!(record.created_at >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn claim_flips_once() {
        let conn = conn();
        insert_code_if_absent(&conn, CodeKind::Beta, "abcdefabcdef").unwrap();

        assert_eq!(
            claim_code(&conn, CodeKind::Beta, "abcdefabcdef").unwrap(),
            ClaimOutcome::Claimed
        );
        assert_eq!(
            claim_code(&conn, CodeKind::Beta, "abcdefabcdef").unwrap(),
            ClaimOutcome::AlreadyUsed
        );

        let record = get_code(&conn, CodeKind::Beta, "abcdefabcdef")
            .unwrap()
            .unwrap();
        assert!(record.used);
        assert!(record.used_at.is_some());
        assert_eq!(count_codes(&conn, CodeKind::Beta, Some(true)).unwrap(), 1);
        assert_eq!(count_codes(&conn, CodeKind::Beta, Some(false)).unwrap(), 0);
    }

    #[test]
    fn claim_of_unknown_code_is_not_issued() {
        let conn = conn();
        assert_eq!(
            claim_code(&conn, CodeKind::Beta, "ffffffffffff").unwrap(),
            ClaimOutcome::NotIssued
        );
    }

    #[test]
    fn kinds_are_separate_namespaces() {
        let conn = conn();
        insert_code_if_absent(&conn, CodeKind::Beta, "111111111111").unwrap();

        assert_eq!(
            claim_code(&conn, CodeKind::Verify, "111111111111").unwrap(),
            ClaimOutcome::NotIssued
        );
        assert_eq!(
            insert_code_if_absent(&conn, CodeKind::Verify, "111111111111").unwrap(),
            IssuanceStatus::Created
        );
        assert_eq!(
            claim_code(&conn, CodeKind::Verify, "111111111111").unwrap(),
            ClaimOutcome::Claimed
        );
        assert!(!get_code(&conn, CodeKind::Beta, "111111111111")
            .unwrap()
            .unwrap()
            .used);
    }

    #[test]
    fn reissue_after_claim_does_not_reset_used() {
        let conn = conn();
        insert_code_if_absent(&conn, CodeKind::Beta, "222222222222").unwrap();
        claim_code(&conn, CodeKind::Beta, "222222222222").unwrap();

        assert_eq!(
            insert_code_if_absent(&conn, CodeKind::Beta, "222222222222").unwrap(),
            IssuanceStatus::AlreadyIssued
        );
        assert_eq!(
            claim_code(&conn, CodeKind::Beta, "222222222222").unwrap(),
            ClaimOutcome::AlreadyUsed
        );
    }

    #[test]
    fn get_code_missing_returns_none() {
        let conn = conn();
        assert!(get_code(&conn, CodeKind::Beta, "nope").unwrap().is_none());
    }
}
