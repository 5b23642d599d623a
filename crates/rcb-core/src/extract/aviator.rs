use crate::{
    extract::{Artifact, ExtractSpec, USER_ID},
    source::{Cell, KeyedRow, KeyedSheet},
};

/// Bet amount columns, highest precedence first.
pub const BET_AMOUNT_COLUMNS: [&str; 4] = [
    "aviator_retention_1",
    "aviator_retention_2",
    "aviator_return_1",
    "aviator_return_2",
];

const CURRENCY_COLUMN: &str = "code";
const BONUS_HEADER: [&str; 3] = ["username", "currency", "bet_amount"];

/// First truthy value among `candidates`, or `None` when every candidate is falsy.
pub fn first_truthy<'a>(row: &'a KeyedRow, candidates: &[&str]) -> Option<&'a Cell> {
    candidates
        .iter()
        .map(|key| row.get(key))
        .find(|cell| cell.is_truthy())
}

/// Bet amount for one row; `0` when no candidate column holds a truthy value.
pub fn bet_amount(row: &KeyedRow) -> String {
    first_truthy(row, &BET_AMOUNT_COLUMNS)
        .map(ToString::to_string)
        .unwrap_or_else(|| "0".to_string())
}

/// Always two artifacts: the dated `user_id` list and the undated, semicolon-delimited
/// free-spin upload (`username;currency;bet_amount`).
pub fn build(spec: &ExtractSpec, sheet: &KeyedSheet) -> Vec<Artifact> {
    let user_ids = Artifact::user_ids(
        format!(
            "{}_Linear_Retention_{}_Aviator_crm.csv",
            spec.date_stamp, spec.step
        ),
        sheet.rows.iter().map(|r| r.get(USER_ID)),
    );

    let bonus = Artifact {
        // Downstream import expects this exact, undated name.
        file_name: format!(
            "Crm_casino_Regular_LinearRetention{}_FS_Multi_Aviator_1.csv",
            spec.step
        ),
        header: BONUS_HEADER.iter().map(|h| h.to_string()).collect(),
        delimiter: b';',
        rows: sheet
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.get(USER_ID).to_string(),
                    r.get(CURRENCY_COLUMN).to_string(),
                    bet_amount(r),
                ]
            })
            .collect(),
    };

    vec![user_ids, bonus]
}
