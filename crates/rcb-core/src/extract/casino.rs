use crate::{
    extract::{Artifact, ExtractSpec},
    source::{cell_at, Cell, PositionalSheet},
};

/// Column I.
pub const GROUP_COLUMN: usize = 8;
const USER_ID_COLUMN: usize = 0;

/// One `user_id` artifact per distinct, non-empty value of column I.
///
/// Groups compare cells strictly (a number never equals its text form) and are emitted in
/// first-seen order so reruns produce the same files.
pub fn build(spec: &ExtractSpec, sheet: &PositionalSheet) -> Vec<Artifact> {
    let rows = sheet.data_rows();

    let mut groups: Vec<&Cell> = Vec::new();
    for value in rows.iter().filter_map(|r| group_value(r)) {
        if !groups.contains(&value) {
            groups.push(value);
        }
    }

    groups
        .into_iter()
        .filter_map(|group| {
            let ids: Vec<&Cell> = rows
                .iter()
                .filter(|r| group_value(r) == Some(group))
                .map(|r| cell_at(r, USER_ID_COLUMN))
                .collect();
            if ids.is_empty() {
                return None;
            }
            Some(Artifact::user_ids(
                format!(
                    "{}_Linear_Retention_{}_Casino_{}_crm.csv",
                    spec.date_stamp, spec.step, group
                ),
                ids,
            ))
        })
        .collect()
}

fn group_value(row: &[Cell]) -> Option<&Cell> {
    Some(cell_at(row, GROUP_COLUMN)).filter(|c| !c.is_empty())
}
