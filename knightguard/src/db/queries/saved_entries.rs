use std::collections::BTreeMap;

use serde_json::Value;
use sqlx::{Connection, SqlitePool};
use tracing::warn;

use crate::db::models::SavedEntryRow;

/// Load the whole persisted mapping. Rows whose value is not valid JSON are skipped.
pub async fn load_all(pool: &SqlitePool) -> Result<BTreeMap<String, Value>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SavedEntryRow>(
        "SELECT key, value, updated_at FROM saved_entries ORDER BY key",
    )
    .fetch_all(pool)
    .await?;

    let mut out = BTreeMap::new();
    for row in rows {
        match serde_json::from_str::<Value>(&row.value) {
            Ok(value) => {
                out.insert(row.key, value);
            }
            Err(e) => warn!(key = %row.key, error = %e, "skipping unreadable saved entry"),
        }
    }
    Ok(out)
}

/// Replace the persisted mapping with `entries` in one transaction.
pub async fn replace_all(
    pool: &SqlitePool,
    entries: &BTreeMap<String, Value>,
) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let mut tx = conn.begin().await?;

    sqlx::query("DELETE FROM saved_entries")
        .execute(&mut *tx)
        .await?;

    for (key, value) in entries {
        sqlx::query(
            "INSERT INTO saved_entries (key, value, updated_at) VALUES (?, ?, datetime('now'))",
        )
        .bind(key)
        .bind(value.to_string())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
