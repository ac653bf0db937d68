//! Column-named tabular data with typed cells.

use std::collections::BTreeMap;

use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv output is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("{0}")]
    Shape(String),
}

/// Rows of scalar cells (`Null`, `Bool`, `Int`, `Float`, `Str`) under named
/// columns. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Clone, Copy, PartialEq)]
enum CellKind {
    Int,
    Float,
    Bool,
    Text,
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Narrowest kind that every non-empty cell of a column parses as.
fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> CellKind {
    let mut kind = CellKind::Int;
    for cell in cells.filter(|c| !c.is_empty()) {
        kind = match kind {
            CellKind::Int if cell.parse::<i64>().is_ok() => CellKind::Int,
            CellKind::Int | CellKind::Float if cell.parse::<f64>().is_ok() => CellKind::Float,
            CellKind::Int | CellKind::Bool if parse_bool(cell).is_some() => CellKind::Bool,
            _ => return CellKind::Text,
        };
    }
    kind
}

fn typed_cell(raw: &str, kind: CellKind) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    match kind {
        CellKind::Int => raw.parse().map(Value::Int).unwrap_or(Value::Null),
        CellKind::Float => raw.parse().map(Value::Float).unwrap_or(Value::Null),
        CellKind::Bool => parse_bool(raw).map(Value::Bool).unwrap_or(Value::Null),
        CellKind::Text => Value::Str(raw.to_owned()),
    }
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Str(s) => s.clone(),
        Value::Bool(b) => if *b { "True" } else { "False" }.to_owned(),
        other => other.to_string(),
    }
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Table, TableError> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(TableError::Shape(format!(
                "row {} has {} cells, expected {}",
                i,
                row.len(),
                columns.len()
            )));
        }
        Ok(Table { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Parse CSV with a header row; column kinds are inferred.
    pub fn from_csv(data: &[u8]) -> Result<Table, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data);
        let columns: Vec<String> = reader.headers()?.iter().map(|s| s.to_owned()).collect();

        let mut raw: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            raw.push(record.iter().map(|s| s.to_owned()).collect());
        }

        let kinds: Vec<CellKind> = (0..columns.len())
            .map(|c| infer_kind(raw.iter().map(|r| r[c].as_str())))
            .collect();
        let rows = raw
            .iter()
            .map(|r| r.iter().zip(&kinds).map(|(cell, k)| typed_cell(cell, *k)).collect())
            .collect();
        Table::new(columns, rows)
    }

    pub fn to_csv(&self) -> Result<String, TableError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(cell_text))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| TableError::Shape(format!("flushing csv: {}", e)))?;
        Ok(String::from_utf8(bytes)?)
    }

    /// `{column: {row_index: cell}}` with row indexes as decimal strings.
    pub fn to_dict(&self) -> Value {
        let mut out = BTreeMap::new();
        for (c, name) in self.columns.iter().enumerate() {
            let col: BTreeMap<String, Value> = self
                .rows
                .iter()
                .enumerate()
                .map(|(i, row)| (i.to_string(), row[c].clone()))
                .collect();
            out.insert(name.clone(), Value::Map(col));
        }
        Value::Map(out)
    }

    /// One-row table from a flat map; each key becomes a column.
    pub fn from_dict_row(row: &BTreeMap<String, Value>) -> Result<Table, TableError> {
        if let Some((key, v)) = row
            .iter()
            .find(|(_, v)| matches!(v, Value::List(_) | Value::Map(_) | Value::Table(_) | Value::Bytes(_)))
        {
            return Err(TableError::Shape(format!(
                "column `{}` holds a {}, expected a scalar",
                key,
                v.type_name()
            )));
        }
        Table::new(row.keys().cloned().collect(), vec![row.values().cloned().collect()])
    }
}
