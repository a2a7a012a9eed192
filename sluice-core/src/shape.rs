use crate::{
    RawResultSet, RawUpdateResult, Result, RowLabeled, RowNames, ShapeError, TabularResult,
    UpdateOutcome,
};
use std::collections::HashSet;

/// Pair every raw row positionally with the declared column labels.
///
/// Row order and column order are kept as the driver delivered them. An empty
/// column list and an empty row list are both valid.
pub fn shape(raw: RawResultSet) -> Result<TabularResult> {
    let RawResultSet { columns, rows } = raw;
    let mut seen = HashSet::with_capacity(columns.len());
    if let Some(duplicate) = columns.iter().find(|v| !seen.insert(v.as_str())) {
        return Err(ShapeError::DuplicateColumn(duplicate.clone()).into());
    }
    let labels: RowNames = columns.into();
    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(i, values)| -> Result<RowLabeled> {
            if values.len() != labels.len() {
                return Err(ShapeError::RowWidth {
                    row: i,
                    expected: labels.len(),
                    found: values.len(),
                }
                .into());
            }
            Ok(RowLabeled::new(labels.clone(), values.into()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(TabularResult {
        columns: labels,
        rows,
    })
}

/// Copy the affected count and string encode the generated keys, keeping their order.
pub fn shape_update(raw: RawUpdateResult) -> UpdateOutcome {
    UpdateOutcome {
        rows_affected: raw.updated,
        keys: raw.keys.iter().map(ToString::to_string).collect(),
    }
}
