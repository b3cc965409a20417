use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single cell of an uploaded table.
///
/// Serialized untagged, so a preview row becomes a plain JSON array such as
/// `[1, 2.5, "north", true, null]`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    /// No data; distinct from zero and from the empty string
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Numeric value of Int/Float cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric value of the cell, also reading numbers out of text.
    ///
    /// Anything that is not a finite number comes back as `None`.
    pub fn coerce_f64(&self) -> Option<f64> {
        let n = match self {
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            other => other.as_f64(),
        }?;
        n.is_finite().then_some(n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Text(s) => f.write_str(s),
            Value::Missing => Ok(()),
        }
    }
}

/// Type of a column, derived from the values it holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Boolean,
    Text,
}

/// A named column of cells.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    /// An all-missing column counts as numeric.
    pub fn kind(&self) -> ColumnKind {
        let mut present = self.values.iter().filter(|v| !v.is_missing()).peekable();
        if present.peek().is_none() {
            return ColumnKind::Numeric;
        }
        let present: Vec<&Value> = present.collect();
        if present.iter().all(|v| v.is_number()) {
            ColumnKind::Numeric
        } else if present.iter().all(|v| matches!(v, Value::Bool(_))) {
            ColumnKind::Boolean
        } else {
            ColumnKind::Text
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind() == ColumnKind::Numeric
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }
}

/// Raised when a table would end up with columns of different lengths.
#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("column '{column}' has {found} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("row {row} has {found} fields, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// In-memory table: ordered, named, equally long columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn empty() -> Self {
        Table::default()
    }

    /// Build a table from columns, checking they all have the same length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, ShapeError> {
        if let Some(first) = columns.first() {
            let expected = first.values.len();
            if let Some(bad) = columns.iter().find(|c| c.values.len() != expected) {
                return Err(ShapeError::ColumnLength {
                    column: bad.name.clone(),
                    expected,
                    found: bad.values.len(),
                });
            }
        }
        Ok(Table { columns })
    }

    /// Build a table from columns already known to share one length.
    ///
    /// For transformations that rewrite cells but never add or drop any.
    pub(crate) fn from_columns_unchecked(columns: Vec<Column>) -> Self {
        debug_assert!(
            columns.windows(2).all(|w| w[0].values.len() == w[1].values.len()),
            "columns of unequal length"
        );
        Table { columns }
    }

    /// Build a table from a header and row-major data.
    ///
    /// Every row must have exactly one value per header entry.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, ShapeError> {
        let width = headers.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();

        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(ShapeError::RowLength {
                    row: r + 1,
                    expected: width,
                    found: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }

        Ok(Table { columns })
    }

    /// All columns, in table order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Take the columns out, giving up the table.
    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    /// Look up a column by exact name.
    ///
    /// # Arguments
    /// * `name` - Column header, compared case-sensitively
    ///
    /// # Returns
    /// * `Option<&Column>` - The first column with that name, if any
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Header names in table order.
    ///
    /// # Examples
    /// ```
    /// use sheetconv::loader::from_csv;
    ///
    /// let table = from_csv("t.csv", b"id,name\n1,ann\n").unwrap();
    /// assert_eq!(table.column_names(), vec!["id", "name"]);
    /// ```
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows; zero for a table without columns.
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    /// Cells of row `index`, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        (index < self.height()).then(|| self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Iterate the table row by row.
    ///
    /// Each item borrows one cell per column, in column order. A table
    /// without columns yields nothing.
    ///
    /// # Examples
    /// ```
    /// use sheetconv::loader::from_csv;
    /// use sheetconv::table::Value;
    ///
    /// let table = from_csv("t.csv", b"a,b\n1,x\n2,\n").unwrap();
    /// let second: Vec<&Value> = table.rows().nth(1).unwrap();
    /// assert_eq!(second, vec![&Value::Int(2), &Value::Missing]);
    /// ```
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.height()).map(move |r| self.columns.iter().map(|c| &c.values[r]).collect())
    }

    /// First `n` rows, all columns.
    pub fn head(&self, n: usize) -> Table {
        self.take_rows(|r| r < n)
    }

    /// Numeric columns in table order.
    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.is_numeric()).collect()
    }

    /// Copy of the table keeping only the rows whose index passes `keep`.
    pub(crate) fn take_rows(&self, keep: impl Fn(usize) -> bool) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = c
                    .values
                    .iter()
                    .enumerate()
                    .filter(|(r, _)| keep(*r))
                    .map(|(_, v)| v.clone())
                    .collect();
                Column::new(c.name.clone(), values)
            })
            .collect();
        Table { columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec!["id".into(), "name".into(), "score".into()],
            vec![
                vec![Value::Int(1), Value::Text("ann".into()), Value::Float(9.5)],
                vec![Value::Int(2), Value::Text("bob".into()), Value::Missing],
                vec![Value::Int(3), Value::Missing, Value::Float(7.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn from_rows_builds_columns() {
        let t = sample();
        assert_eq!(t.width(), 3);
        assert_eq!(t.height(), 3);
        assert_eq!(t.column_names(), vec!["id", "name", "score"]);
        assert_eq!(t.row(1).unwrap()[1], &Value::Text("bob".into()));
        assert!(t.row(3).is_none());
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = Table::from_rows(vec!["a".into()], vec![vec![Value::Int(1), Value::Int(2)]])
            .unwrap_err();
        assert_eq!(
            err,
            ShapeError::RowLength {
                row: 1,
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn from_columns_rejects_unequal_lengths() {
        let err = Table::from_columns(vec![
            Column::new("a", vec![Value::Int(1)]),
            Column::new("b", vec![]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn unchecked_columns_match_checked_build() {
        let columns = sample().into_columns();
        assert_eq!(
            Table::from_columns_unchecked(columns.clone()),
            Table::from_columns(columns).unwrap()
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "columns of unequal length")]
    fn unchecked_columns_still_assert_shape_in_debug() {
        Table::from_columns_unchecked(vec![
            Column::new("a", vec![Value::Int(1)]),
            Column::new("b", vec![]),
        ]);
    }

    #[test]
    fn column_kinds() {
        let t = sample();
        assert_eq!(t.column("id").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(t.column("name").unwrap().kind(), ColumnKind::Text);
        assert_eq!(t.column("score").unwrap().kind(), ColumnKind::Numeric);

        let flags = Column::new("f", vec![Value::Bool(true), Value::Missing]);
        assert_eq!(flags.kind(), ColumnKind::Boolean);

        let blank = Column::new("blank", vec![Value::Missing, Value::Missing]);
        assert_eq!(blank.kind(), ColumnKind::Numeric);
    }

    #[test]
    fn head_truncates_rows() {
        let t = sample();
        assert_eq!(t.head(2).height(), 2);
        assert_eq!(t.head(10), t);
        assert_eq!(Table::empty().head(5).height(), 0);
    }

    #[test]
    fn value_display_follows_csv_conventions() {
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Missing.to_string(), "");
    }

    #[test]
    fn coerce_reads_numbers_from_text() {
        assert_eq!(Value::Text(" 3.5 ".into()).coerce_f64(), Some(3.5));
        assert_eq!(Value::Text("abc".into()).coerce_f64(), None);
        assert_eq!(Value::Bool(true).coerce_f64(), None);
        assert_eq!(Value::Float(f64::NAN).coerce_f64(), None);
    }

    #[test]
    fn preview_serializes_as_plain_json() {
        let json = serde_json::to_string(&sample().row(1).unwrap()).unwrap();
        assert_eq!(json, r#"[2,"bob",null]"#);
    }
}
