use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::Result;
use crate::table::Table;

const ROW: &str = "__row";
const MATCHED: &str = "__matched";

/// Left-joins `right` onto `left` by exact key match.
///
/// Every left row is kept, in order; right columns (except the key) are
/// appended and are null where no right row matched. Unmatched right rows
/// are dropped. If a key appears more than once on the right the first
/// occurrence wins. Right columns whose names clash with a left column are
/// suffixed with `_right`.
pub fn left_join(left: &Table, left_key: &str, right: &Table, right_key: &str) -> Result<Table> {
    left.require(left_key, "left join")?;
    right.require(right_key, "left join")?;

    let keys = right.df().column(right_key)?;
    let present = keys.len() - keys.null_count();
    let first = right
        .lazy()
        .filter(col(right_key).is_not_null().and(col(right_key).is_first_distinct()))
        .with_column(lit(true).alias(MATCHED))
        .collect()?;
    let duplicates = present - first.height();
    if duplicates > 0 {
        warn!(duplicates, key = right_key, "Duplicate keys on right side of join");
    }

    let joined = left
        .lazy()
        .with_row_index(ROW, None)
        .join(
            first.lazy(),
            [col(left_key)],
            [col(right_key)],
            JoinArgs {
                how: JoinType::Left,
                suffix: Some("_right".into()),
                ..Default::default()
            },
        )
        .sort([ROW], Default::default())
        .collect()?;

    let hits = joined.column(MATCHED)?;
    let matched = hits.len() - hits.null_count();
    let out = joined.drop(ROW)?.drop(MATCHED)?;

    debug!(rows = left.len(), matched, "Left join complete");
    Ok(out.into())
}
