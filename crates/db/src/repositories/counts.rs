//! Grouped count queries backing the read-side aggregates.
//!
//! Counts are never stored; every read recomputes them with one
//! `GROUP BY` per aggregate. Keys with no rows are simply absent from the
//! returned map and read as zero.

use std::collections::HashMap;

use eventhub_common::AppResult;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter,
    QuerySelect,
};

use crate::map_db_err;

#[derive(Debug, FromQueryResult)]
struct KeyCount {
    key: String,
    count: i64,
}

/// Count rows of `E` matching `filter`, grouped by `key`.
pub async fn grouped_counts<E, C>(
    conn: &C,
    key: E::Column,
    filter: Condition,
) -> AppResult<HashMap<String, u64>>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let rows = E::find()
        .select_only()
        .column_as(key, "key")
        .column_as(key.count(), "count")
        .filter(filter)
        .group_by(key)
        .into_model::<KeyCount>()
        .all(conn)
        .await
        .map_err(map_db_err)?;

    Ok(rows
        .into_iter()
        .map(|row| (row.key, u64::try_from(row.count).unwrap_or_default()))
        .collect())
}

/// Look up a count, treating a missing key as zero.
#[must_use]
pub fn count_of(counts: &HashMap<String, u64>, key: &str) -> u64 {
    counts.get(key).copied().unwrap_or(0)
}
