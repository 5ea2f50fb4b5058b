use serde::{Deserialize, Serialize};

/// One row of the flat saved-entries namespace. `value` is JSON text.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SavedEntryRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}
