//! Catalog schema version check
//!
//! The player records its schema in a one-row `schema_version` table. Writes
//! are only safe against layouts this crate was written for.

use crate::{Result, StorageError};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Schema versions whose playlist tables match our INSERT statements
pub const SUPPORTED_SCHEMA_VERSIONS: &[i64] = &[20, 21];

/// What to do with an unsupported schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaPolicy {
    /// Refuse to start
    #[default]
    Enforce,
    /// Log a warning and carry on
    Ignore,
}

/// Read the catalog's schema version and fail unless it is in `supported`
///
/// # Errors
///
/// - `SchemaMissing` if the table or its row does not exist
/// - `SchemaIncompatible` if the version is not in `supported`
pub async fn check_schema_version(pool: &SqlitePool, supported: &[i64]) -> Result<i64> {
    let version: Option<i64> = sqlx::query_scalar("SELECT version FROM schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .map_err(|e| match e {
            // "no such table" and friends all mean this is not a catalog we know
            sqlx::Error::Database(_) => StorageError::SchemaMissing,
            other => StorageError::Database(other),
        })?;

    let version = version.ok_or(StorageError::SchemaMissing)?;

    if !supported.contains(&version) {
        return Err(StorageError::SchemaIncompatible {
            found: version,
            supported: supported.to_vec(),
        });
    }

    info!("Catalog schema version {} is supported", version);
    Ok(version)
}

/// Apply `policy` to the schema check
///
/// Under `SchemaPolicy::Ignore` an incompatible or missing version is only
/// logged. Connection failures are always returned.
///
/// # Errors
///
/// Returns the check's error when the policy is `Enforce`
pub async fn verify(pool: &SqlitePool, policy: SchemaPolicy) -> Result<Option<i64>> {
    match check_schema_version(pool, SUPPORTED_SCHEMA_VERSIONS).await {
        Ok(version) => Ok(Some(version)),
        Err(e @ (StorageError::SchemaMissing | StorageError::SchemaIncompatible { .. }))
            if policy == SchemaPolicy::Ignore =>
        {
            warn!("{} - continuing because the schema check is disabled", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
