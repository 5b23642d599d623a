//! Extract builders: decoded source rows in, named delimited row-sets out.
//!
//! Builders are pure. Reading the workbook and writing artifacts happen around them.

pub mod aviator;
pub mod casino;
pub mod sport;

use std::path::Path;

use chrono::NaiveDate;

use crate::{
    classify::Classification,
    domain::Category,
    source::{self, Cell},
    Result,
};

pub const USER_ID: &str = "user_id";

/// Everything a builder needs besides the rows themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractSpec {
    pub category: Category,
    pub step: String,
    /// `DDMMYY`
    pub date_stamp: String,
}

impl ExtractSpec {
    pub fn new(classification: Classification, date: NaiveDate) -> Self {
        Self {
            category: classification.category,
            step: classification.step,
            date_stamp: date_stamp(date),
        }
    }

    /// Spec stamped with today's local date.
    pub fn today(classification: Classification) -> Self {
        Self::new(classification, chrono::Local::now().date_naive())
    }
}

pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%d%m%y").to_string()
}

/// One delimited output file, not yet written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub header: Vec<String>,
    pub delimiter: u8,
    pub rows: Vec<Vec<String>>,
}

impl Artifact {
    /// Comma-delimited, single `user_id` column.
    pub fn user_ids<'a>(file_name: String, ids: impl IntoIterator<Item = &'a Cell>) -> Self {
        Self {
            file_name,
            header: vec![USER_ID.to_string()],
            delimiter: b',',
            rows: ids.into_iter().map(|c| vec![c.to_string()]).collect(),
        }
    }
}

/// Decode `path` in the shape `spec.category` needs and run its builder.
///
/// Blocking: call from `spawn_blocking` inside async code.
pub fn build_from_file(spec: &ExtractSpec, path: &Path) -> Result<Vec<Artifact>> {
    match spec.category {
        Category::Casino => Ok(casino::build(spec, &source::read_positional(path)?)),
        Category::Aviator => Ok(aviator::build(spec, &source::read_keyed(path)?)),
        Category::Sport => sport::build(spec, &source::read_keyed(path)?),
    }
}
