//! Decodes the first sheet of an uploaded workbook into row records.
//!
//! Two shapes are produced: positional rows (header included as the first row) for casino
//! extracts and header-keyed rows for aviator and sport extracts.

use std::{collections::HashMap, fmt, path::Path};

use calamine::{open_workbook_auto, Data, Range, Reader};

use crate::{errors::Error, Result};

/// Label given to header cells that are blank.
const BLANK_HEADER: &str = "__EMPTY";

/// One decoded cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Spreadsheet truthiness: empty, `""`, `0` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Cell::Empty => false,
            Cell::Text(s) => !s.is_empty(),
            Cell::Number(n) => *n != 0.0 && !n.is_nan(),
            Cell::Bool(b) => *b,
        }
    }

    /// String form used as a sort key: falsy cells collapse to `""`.
    pub fn sort_key(&self) -> String {
        if self.is_truthy() {
            self.to_string()
        } else {
            String::new()
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{}", format_number(*n)),
            Cell::Bool(b) => write!(f, "{b}"),
        }
    }
}

fn format_number(n: f64) -> String {
    // Whole numbers (ids, group codes) render without a trailing ".0".
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    n.to_string()
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Text(e.to_string()),
        }
    }
}

/// Cell at `index`; positions past the end of a short row read as [`Cell::Empty`].
pub fn cell_at(row: &[Cell], index: usize) -> &Cell {
    row.get(index).unwrap_or(&EMPTY_CELL)
}

/// Array-of-arrays view of a sheet; the first row is the header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PositionalSheet {
    pub rows: Vec<Vec<Cell>>,
}

impl PositionalSheet {
    pub fn header(&self) -> Option<&[Cell]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> &[Vec<Cell>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

/// A data row addressed by header label.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyedRow {
    values: HashMap<String, Cell>,
}

impl KeyedRow {
    pub fn new(values: HashMap<String, Cell>) -> Self {
        Self { values }
    }

    /// Missing keys read as [`Cell::Empty`].
    pub fn get(&self, key: &str) -> &Cell {
        self.values.get(key).unwrap_or(&EMPTY_CELL)
    }
}

impl<K: Into<String>> FromIterator<(K, Cell)> for KeyedRow {
    fn from_iter<I: IntoIterator<Item = (K, Cell)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Header-keyed view of a sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyedSheet {
    /// Header labels in column order, made unique.
    pub headers: Vec<String>,
    pub rows: Vec<KeyedRow>,
}

pub fn read_positional(path: &Path) -> Result<PositionalSheet> {
    Ok(positional_from_range(&first_sheet(path)?))
}

pub fn read_keyed(path: &Path) -> Result<KeyedSheet> {
    Ok(keyed_from_range(&first_sheet(path)?))
}

fn first_sheet(path: &Path) -> Result<Range<Data>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::Decode(format!("{}: {e}", path.display())))?;

    let Some(name) = workbook.sheet_names().first().cloned() else {
        return Err(Error::Decode(format!(
            "{}: workbook has no sheets",
            path.display()
        )));
    };

    workbook
        .worksheet_range(&name)
        .map_err(|e| Error::Decode(format!("{}: sheet {name}: {e}", path.display())))
}

pub fn positional_from_range(range: &Range<Data>) -> PositionalSheet {
    PositionalSheet {
        rows: range
            .rows()
            .map(|row| row.iter().map(Cell::from).collect())
            .collect(),
    }
}

pub fn keyed_from_range(range: &Range<Data>) -> KeyedSheet {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return KeyedSheet::default();
    };

    let headers = unique_headers(header_row.iter().map(|d| Cell::from(d).to_string()));

    let rows = rows
        .filter_map(|row| {
            let values: HashMap<String, Cell> = headers
                .iter()
                .zip(row.iter())
                .map(|(h, d)| (h.clone(), Cell::from(d)))
                .filter(|(_, c)| !c.is_empty())
                .collect();
            if values.is_empty() {
                None
            } else {
                Some(KeyedRow::new(values))
            }
        })
        .collect();

    KeyedSheet { headers, rows }
}

/// Blank labels become `__EMPTY`; repeats get `_1`, `_2`, ... suffixes.
fn unique_headers(labels: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();

    for label in labels {
        let label = if label.is_empty() {
            BLANK_HEADER.to_string()
        } else {
            label
        };

        let Some(&next_suffix) = seen.get(&label) else {
            seen.insert(label.clone(), 1);
            out.push(label);
            continue;
        };

        let mut n = next_suffix;
        let mut candidate = format!("{label}_{n}");
        while seen.contains_key(&candidate) {
            n += 1;
            candidate = format!("{label}_{n}");
        }
        seen.insert(label, n + 1);
        seen.insert(candidate.clone(), 1);
        out.push(candidate);
    }

    out
}
