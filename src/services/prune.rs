use tracing::debug;

use crate::db::{Database, HistoryEntry};
use crate::error::AppResult;

pub fn enforce_retention(db: &Database, max_elements: i64) -> AppResult<Vec<HistoryEntry>> {
    let evicted = db.prune_excess(max_elements)?;
    if !evicted.is_empty() {
        debug!(
            "evicted {} history entries over the limit of {max_elements}",
            evicted.len()
        );
    }
    Ok(evicted)
}
