use crate::{GalleryError, Result, DIR_COLUMN, FILE_COLUMN, INDEX_COLUMN, MARK_COLUMN};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Load-order index of a row. Never reassigned once the table is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number { value: f64, text: String },
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Text as it appeared in the source file; empty for missing cells.
    pub fn display(&self) -> &str {
        match self {
            Value::Missing => "",
            Value::Number { text, .. } => text,
            Value::Text(text) => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Numeric,
    Categorical,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeColumn {
    pub name: String,
    pub kind: AttributeKind,
}

/// Position of a column in the file, mapped onto where a row stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSlot {
    Dir,
    File,
    Mark,
    Attribute(usize),
}

/// Column partition computed once at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    attributes: Vec<AttributeColumn>,
    layout: Vec<ColumnSlot>,
}

impl Schema {
    pub fn attributes(&self) -> &[AttributeColumn] {
        &self.attributes
    }

    pub fn layout(&self) -> &[ColumnSlot] {
        &self.layout
    }

    pub fn slot_name(&self, slot: ColumnSlot) -> &str {
        match slot {
            ColumnSlot::Dir => DIR_COLUMN,
            ColumnSlot::File => FILE_COLUMN,
            ColumnSlot::Mark => MARK_COLUMN,
            ColumnSlot::Attribute(index) => &self.attributes[index].name,
        }
    }

    pub fn headers(&self) -> Vec<&str> {
        self.layout.iter().map(|slot| self.slot_name(*slot)).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|column| column.name == name)
    }

    fn columns_of(&self, kind: AttributeKind) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.attributes
            .iter()
            .enumerate()
            .filter(move |(_, column)| column.kind == kind)
            .map(|(index, column)| (index, column.name.as_str()))
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.columns_of(AttributeKind::Numeric)
    }

    pub fn categorical_columns(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.columns_of(AttributeKind::Categorical)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: RowId,
    pub dir: String,
    pub file: String,
    pub marked: bool,
    pub attributes: Vec<Value>,
}

impl Row {
    pub fn path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.file)
    }
}

/// In-memory copy of the metadata table. Marks are mutated in place; rows
/// are never added, removed or reordered after load.
#[derive(Debug, Clone)]
pub struct Table {
    source: PathBuf,
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let table = Self::from_reader(file, path.to_path_buf())?;
        log::info!(
            "Loaded {} rows from {:?} ({} numeric, {} categorical columns)",
            table.len(),
            path,
            table.schema.numeric_columns().count(),
            table.schema.categorical_columns().count()
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R, source: PathBuf) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(index, name)| {
                if name.trim().is_empty() {
                    format!("Unnamed: {}", index)
                } else {
                    name.to_owned()
                }
            })
            .collect();

        let position = |wanted: &str| headers.iter().position(|name| name == wanted);
        let (dir_index, file_index) = match (position(DIR_COLUMN), position(FILE_COLUMN)) {
            (Some(dir), Some(file)) => (dir, file),
            (dir, file) => {
                let mut missing = Vec::new();
                if dir.is_none() {
                    missing.push(DIR_COLUMN.to_owned());
                }
                if file.is_none() {
                    missing.push(FILE_COLUMN.to_owned());
                }
                return Err(GalleryError::MissingColumns { missing });
            }
        };
        let mark_index = position(MARK_COLUMN);

        let mut raw_rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let cells: Vec<String> = (0..headers.len())
                .map(|i| record.get(i).unwrap_or("").to_owned())
                .collect();
            raw_rows.push(cells);
        }

        let mut layout = Vec::with_capacity(headers.len() + 1);
        let mut attributes = Vec::new();
        let mut attribute_sources = Vec::new();

        for (index, name) in headers.iter().enumerate() {
            if index == dir_index {
                layout.push(ColumnSlot::Dir);
            } else if index == file_index {
                layout.push(ColumnSlot::File);
            } else if Some(index) == mark_index {
                layout.push(ColumnSlot::Mark);
            } else {
                let kind = if name == INDEX_COLUMN {
                    AttributeKind::Ignored
                } else {
                    classify(raw_rows.iter().map(|cells| cells[index].as_str()))
                };
                layout.push(ColumnSlot::Attribute(attributes.len()));
                attributes.push(AttributeColumn { name: name.clone(), kind });
                attribute_sources.push(index);
            }
        }
        if mark_index.is_none() {
            layout.push(ColumnSlot::Mark);
        }

        let rows = raw_rows
            .into_iter()
            .enumerate()
            .map(|(index, mut cells)| {
                let values = attributes
                    .iter()
                    .zip(&attribute_sources)
                    .map(|(column, &source)| parse_value(&cells[source], column.kind))
                    .collect();
                Row {
                    id: RowId(index),
                    dir: std::mem::take(&mut cells[dir_index]),
                    file: std::mem::take(&mut cells[file_index]),
                    marked: mark_index.map(|i| parse_mark(&cells[i])).unwrap_or(false),
                    attributes: values,
                }
            })
            .collect();

        Ok(Self {
            source,
            schema: Schema { attributes, layout },
            rows,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// File name of the loaded table, shown as the dataset title.
    pub fn name(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.to_string_lossy().into_owned())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn path(&self, id: RowId) -> Option<PathBuf> {
        self.row(id).map(Row::path)
    }

    pub fn value(&self, id: RowId, column: &str) -> Option<&Value> {
        let index = self.schema.column_index(column)?;
        self.row(id)?.attributes.get(index)
    }

    pub fn set_marked(&mut self, id: RowId, marked: bool) {
        if let Some(row) = self.rows.get_mut(id.0) {
            row.marked = marked;
        }
    }

    /// Flips the mark of `id` and returns the new state.
    pub fn toggle_marked(&mut self, id: RowId) -> Option<bool> {
        let row = self.rows.get_mut(id.0)?;
        row.marked = !row.marked;
        Some(row.marked)
    }

    pub fn mark_all(&mut self, ids: &[RowId]) {
        for id in ids {
            self.set_marked(*id, true);
        }
    }

    pub fn clear_marks(&mut self) {
        for row in &mut self.rows {
            row.marked = false;
        }
    }

    pub fn marked_ids(&self) -> Vec<RowId> {
        self.rows.iter().filter(|row| row.marked).map(|row| row.id).collect()
    }

    pub fn marked_count(&self) -> usize {
        self.rows.iter().filter(|row| row.marked).count()
    }

    /// Sorted distinct non-missing values of an attribute column.
    pub fn categories(&self, column: usize) -> Vec<String> {
        let distinct: BTreeSet<&str> = self
            .rows
            .iter()
            .filter_map(|row| row.attributes.get(column))
            .filter(|value| !matches!(value, Value::Missing))
            .map(Value::display)
            .collect();
        distinct.into_iter().map(str::to_owned).collect()
    }

    pub fn numeric_range(&self, column: usize) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|row| row.attributes.get(column).and_then(Value::as_number))
            .filter(|value| !value.is_nan())
            .fold(None, |range, value| match range {
                None => Some((value, value)),
                Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
            })
    }
}

// Tokens read as missing values, matching the pandas `read_csv` defaults.
const MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub(crate) fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || MISSING_TOKENS.contains(&cell)
}

fn classify<'a>(mut cells: impl Iterator<Item = &'a str>) -> AttributeKind {
    let all_numeric = cells.all(|cell| is_missing(cell) || cell.trim().parse::<f64>().is_ok());
    if all_numeric {
        AttributeKind::Numeric
    } else {
        AttributeKind::Categorical
    }
}

fn parse_value(cell: &str, kind: AttributeKind) -> Value {
    if is_missing(cell) {
        return Value::Missing;
    }
    match kind {
        AttributeKind::Numeric => match cell.trim().parse::<f64>() {
            Ok(value) => Value::Number {
                value,
                text: cell.to_owned(),
            },
            Err(_) => Value::Missing,
        },
        AttributeKind::Categorical | AttributeKind::Ignored => Value::Text(cell.to_owned()),
    }
}

fn parse_mark(cell: &str) -> bool {
    matches!(
        cell.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "1.0" | "yes"
    )
}
