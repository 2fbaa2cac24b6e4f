//! Column-oriented ASCII catalogs.
//!
//! The reader understands the three header layouts met in the EGG/SkyMaker
//! and Galapagos workflow:
//!
//! - SExtractor-style numbered comments (`#   3 X_IMAGE  Object position`),
//!   where a gap in the numbering marks a vector column;
//! - a single commented header line (`# ra dec bt`);
//! - a plain first line of names (astropy "basic").
//!
//! Catalogs are always written in the plain layout.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("catalog has no column header")]
    MissingHeader,
    #[error("line {line}: expected {expected} values, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: unterminated quoted value")]
    UnterminatedQuote { line: usize },
    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("column `{name}` is not a {expected} column")]
    ColumnType {
        name: String,
        expected: &'static str,
    },
    #[error("column `{name}` has {got} rows, catalog has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
}

/// One catalog column. A column is numeric when every cell parses as `f64`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            Column::Float(v) => Some(v),
            Column::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            Column::Text(v) => Some(v),
            Column::Float(_) => None,
        }
    }

    fn from_cells(cells: Vec<String>) -> Self {
        let parsed: Option<Vec<f64>> = cells.iter().map(|c| c.parse::<f64>().ok()).collect();
        match parsed {
            Some(values) if !cells.is_empty() => Column::Float(values),
            _ => Column::Text(cells),
        }
    }

    fn format_cell(&self, row: usize) -> String {
        match self {
            Column::Float(v) => format_float(v[row]),
            Column::Text(v) => {
                let s = &v[row];
                if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '"') {
                    format!("\"{}\"", s.replace('"', "'"))
                } else {
                    s.clone()
                }
            }
        }
    }
}

fn format_float(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        let sign = if v > 0.0 { "" } else { "-" };
        format!("{sign}inf")
    } else if v == 0.0 || (1e-4..1e16).contains(&v.abs()) {
        format!("{v}")
    } else {
        format!("{v:e}")
    }
}

/// An in-memory catalog: ordered, named, equally long columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn float_column(&self, name: &str) -> Result<&[f64], CatalogError> {
        let column = self
            .column(name)
            .ok_or_else(|| CatalogError::UnknownColumn(name.to_string()))?;
        column.as_float().ok_or_else(|| CatalogError::ColumnType {
            name: name.to_string(),
            expected: "numeric",
        })
    }

    pub fn text_column(&self, name: &str) -> Result<&[String], CatalogError> {
        let column = self
            .column(name)
            .ok_or_else(|| CatalogError::UnknownColumn(name.to_string()))?;
        column.as_text().ok_or_else(|| CatalogError::ColumnType {
            name: name.to_string(),
            expected: "text",
        })
    }

    /// Append a new column. The first column fixes the row count.
    pub fn push_column(&mut self, name: &str, column: Column) -> Result<(), CatalogError> {
        if self.has_column(name) {
            return Err(CatalogError::DuplicateColumn(name.to_string()));
        }
        self.check_length(name, &column)?;
        self.names.push(name.to_string());
        self.columns.push(column);
        Ok(())
    }

    /// Replace the values of `name`, appending the column if it does not exist.
    pub fn set_column(&mut self, name: &str, column: Column) -> Result<(), CatalogError> {
        self.check_length(name, &column)?;
        match self.position(name) {
            Some(i) => self.columns[i] = column,
            None => {
                self.names.push(name.to_string());
                self.columns.push(column);
            }
        }
        Ok(())
    }

    pub fn set_float_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), CatalogError> {
        self.set_column(name, Column::Float(values))
    }

    /// Apply `f` to every value of an existing numeric column.
    pub fn map_float_column(
        &mut self,
        name: &str,
        f: impl Fn(f64) -> f64,
    ) -> Result<(), CatalogError> {
        let mapped: Vec<f64> = self.float_column(name)?.iter().map(|&v| f(v)).collect();
        self.set_float_column(name, mapped)
    }

    fn check_length(&self, name: &str, column: &Column) -> Result<(), CatalogError> {
        if self.columns.is_empty() || column.len() == self.len() {
            return Ok(());
        }
        // Replacing the only column may change the row count.
        if self.columns.len() == 1 && self.names[0] == name {
            return Ok(());
        }
        Err(CatalogError::LengthMismatch {
            name: name.to_string(),
            expected: self.len(),
            got: column.len(),
        })
    }

    /// Read a catalog from disk.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Write the catalog to disk, replacing any existing file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        fs::write(path, self.to_text())?;
        Ok(())
    }

    /// Parse catalog text.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let mut comments: Vec<&str> = Vec::new();
        let mut names: Option<Vec<String>> = None;
        let mut rows: Vec<Vec<String>> = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix('#') {
                if names.is_none() {
                    comments.push(rest);
                }
                continue;
            }

            let tokens = tokenize(line, line_no)?;
            if names.is_none() {
                let all_text = tokens.iter().all(|t| t.parse::<f64>().is_err());
                let found = numbered_header(&comments, Some(tokens.len())).or_else(|| {
                    if all_text {
                        None
                    } else {
                        commented_header(&comments, Some(tokens.len()))
                    }
                });
                match found {
                    Some(found) => names = Some(found),
                    None if tokens.iter().any(|t| t.parse::<f64>().is_err()) => {
                        names = Some(tokens);
                        continue;
                    }
                    None => return Err(CatalogError::MissingHeader),
                }
            }

            let expected = names.as_ref().map_or(0, Vec::len);
            if tokens.len() != expected {
                return Err(CatalogError::RaggedRow {
                    line: line_no,
                    expected,
                    found: tokens.len(),
                });
            }
            rows.push(tokens);
        }

        let names = match names {
            Some(names) => names,
            None => numbered_header(&comments, None)
                .or_else(|| commented_header(&comments, None))
                .ok_or(CatalogError::MissingHeader)?,
        };

        let mut cells: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); names.len()];
        for row in rows {
            for (col, value) in cells.iter_mut().zip(row) {
                col.push(value);
            }
        }

        let mut catalog = Catalog::new();
        for (name, col) in names.iter().zip(cells) {
            catalog.push_column(name, Column::from_cells(col))?;
        }
        log::debug!(
            "parsed catalog: {} columns, {} rows",
            catalog.names.len(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// Render the catalog in the plain-header layout.
    pub fn to_text(&self) -> String {
        let mut out = self.names.join(" ");
        out.push('\n');
        for row in 0..self.len() {
            let cells: Vec<String> = self.columns.iter().map(|c| c.format_cell(row)).collect();
            out.push_str(&cells.join(" "));
            out.push('\n');
        }
        out
    }
}

fn tokenize(line: &str, line_no: usize) -> Result<Vec<String>, CatalogError> {
    let mut out = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut token = String::new();
        if first == '"' {
            chars.next();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                token.push(c);
            }
            if !closed {
                return Err(CatalogError::UnterminatedQuote { line: line_no });
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        out.push(token);
    }
    Ok(out)
}

/// Column names from SExtractor-style numbered comments.
///
/// `width` is the number of values on the first data row, when known; the
/// last declared column absorbs any trailing values as a vector column.
fn numbered_header(comments: &[&str], width: Option<usize>) -> Option<Vec<String>> {
    let numbered: Vec<(usize, &str)> = comments
        .iter()
        .filter_map(|c| {
            let mut it = c.split_whitespace();
            let index = it.next()?.parse::<usize>().ok()?;
            let name = it.next()?;
            (index >= 1).then_some((index, name))
        })
        .collect();
    if numbered.is_empty() {
        return None;
    }

    let mut names = Vec::new();
    for (k, &(index, name)) in numbered.iter().enumerate() {
        let next = match numbered.get(k + 1) {
            Some(&(next, _)) => next,
            None => width.map_or(index + 1, |w| (w + 1).max(index + 1)),
        };
        let span = next.saturating_sub(index).max(1);
        if span == 1 {
            names.push(name.to_string());
        } else {
            names.extend((1..=span).map(|i| format!("{name}_{i}")));
        }
    }
    match width {
        Some(w) if w != names.len() => None,
        _ => Some(names),
    }
}

/// Column names from the last comment line (`# a b c`).
fn commented_header(comments: &[&str], width: Option<usize>) -> Option<Vec<String>> {
    let tokens: Vec<String> = comments
        .last()?
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if tokens.is_empty() {
        return None;
    }
    match width {
        Some(w) if w != tokens.len() => None,
        _ => Some(tokens),
    }
}
