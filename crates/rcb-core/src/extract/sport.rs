use crate::{
    errors::Error,
    extract::{Artifact, ExtractSpec, USER_ID},
    source::{Cell, KeyedRow, KeyedSheet},
    Result,
};

/// Column J, by header position.
pub const GROUP_COLUMN_INDEX: usize = 9;

/// Name used for rows whose group cell is empty.
const MISSING_GROUP: &str = "undefined";

/// Step `1`: one artifact of all `user_id`s sorted ordinally.
/// Any other step: one artifact per distinct value of column J.
pub fn build(spec: &ExtractSpec, sheet: &KeyedSheet) -> Result<Vec<Artifact>> {
    if sheet.rows.is_empty() {
        return Err(Error::EmptySource);
    }

    if spec.step == "1" {
        let mut rows: Vec<&KeyedRow> = sheet.rows.iter().collect();
        sort_by_column(&mut rows, USER_ID);
        return Ok(vec![Artifact::user_ids(
            format!("{}_Linear_Retention_1_Sport_crm.csv", spec.date_stamp),
            rows.iter().map(|r| r.get(USER_ID)),
        )]);
    }

    let column = sheet
        .headers
        .get(GROUP_COLUMN_INDEX)
        .ok_or(Error::MissingColumn {
            index: GROUP_COLUMN_INDEX,
        })?;

    let mut rows: Vec<&KeyedRow> = sheet.rows.iter().collect();
    sort_by_column(&mut rows, column);

    // Groups compare by string form, unlike casino groups.
    let mut groups: Vec<String> = Vec::new();
    for row in &rows {
        let key = group_key(row.get(column));
        if !groups.contains(&key) {
            groups.push(key);
        }
    }

    Ok(groups
        .into_iter()
        .map(|group| {
            let ids = rows
                .iter()
                .filter(|r| group_key(r.get(column)) == group)
                .map(|r| r.get(USER_ID));
            Artifact::user_ids(
                format!(
                    "{}_Linear_Retention_{}_Sport_group_{}_crm.csv",
                    spec.date_stamp, spec.step, group
                ),
                ids,
            )
        })
        .collect())
}

/// Stable, ordinal (byte-wise) sort; falsy cells sort as `""`.
fn sort_by_column(rows: &mut [&KeyedRow], column: &str) {
    rows.sort_by_cached_key(|r| r.get(column).sort_key());
}

fn group_key(cell: &Cell) -> String {
    if cell.is_empty() {
        MISSING_GROUP.to_string()
    } else {
        cell.to_string()
    }
}
