//! SQLite storage for issued redemption codes.
//!
//! This crate provides:
//! - Async SQLite executor with a dedicated thread
//! - Schema migrations
//! - Model types for the `codes` table
//! - Query helpers, including the atomic insert-if-absent and
//!   conditional claim used by the redemption engine
//!
//! ```ignore
//! let db = AsyncDatabase::open(path).await?;
//! let status = db
//!     .call(move |conn| queries::insert_code_if_absent(conn, CodeKind::Beta, &code))
//!     .await?;
//! ```
//!
//! Only SQL runs inside `db.call()`. Code derivation and delivery happen
//! outside so the single executor thread is never held up.

mod error;
mod executor;
mod migrations;
mod models;
pub mod queries;

pub use error::{DatabaseError, DatabaseResult};
pub use executor::AsyncDatabase;
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use models::*;
