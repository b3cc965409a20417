//! Cleaning steps. Each one takes a table and returns a new one; the input is
//! never modified.

use std::collections::HashSet;

use crate::table::{Column, Table, Value};

/// Hashable stand-in for a [`Value`] when comparing whole rows.
///
/// Numbers compare by numeric value, so `Int(1)` and `Float(1.0)` collide.
#[derive(Hash, PartialEq, Eq)]
enum CellKey<'a> {
    Missing,
    Number(u64),
    Bool(bool),
    Text(&'a str),
}

impl<'a> From<&'a Value> for CellKey<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Missing => CellKey::Missing,
            Value::Int(i) => CellKey::Number(number_bits(*i as f64)),
            Value::Float(f) => CellKey::Number(number_bits(*f)),
            Value::Bool(b) => CellKey::Bool(*b),
            Value::Text(s) => CellKey::Text(s),
        }
    }
}

fn number_bits(n: f64) -> u64 {
    // -0.0 and 0.0 are the same cell value
    if n == 0.0 { 0 } else { n.to_bits() }
}

/// Drop rows that repeat an earlier row across all columns.
///
/// The first occurrence survives and row order is preserved, so applying this
/// twice gives the same table as applying it once.
///
/// # Examples
/// ```
/// use sheetconv::cleaning::remove_duplicates;
/// use sheetconv::table::{Table, Value};
///
/// let table = Table::from_rows(
///     vec!["a".into()],
///     vec![vec![Value::Int(1)], vec![Value::Int(1)], vec![Value::Int(2)]],
/// ).unwrap();
/// assert_eq!(remove_duplicates(&table).height(), 2);
/// ```
pub fn remove_duplicates(table: &Table) -> Table {
    let mut seen: HashSet<Vec<CellKey<'_>>> = HashSet::with_capacity(table.height());
    let keep: Vec<bool> = table
        .rows()
        .map(|row| seen.insert(row.into_iter().map(CellKey::from).collect()))
        .collect();

    table.take_rows(|r| keep[r])
}

/// Replace missing cells of numeric columns with the column mean.
///
/// Text and boolean columns are returned untouched, missing cells included.
/// A numeric column with nothing to average stays as it is.
pub fn fill_missing_with_mean(table: &Table) -> Table {
    let columns: Vec<Column> = table
        .columns()
        .iter()
        .map(|column| {
            if !column.is_numeric() || column.missing_count() == 0 {
                return column.clone();
            }
            match column_mean(column) {
                Some(fill) => Column::new(
                    column.name.clone(),
                    column
                        .values
                        .iter()
                        .map(|v| if v.is_missing() { fill.clone() } else { v.clone() })
                        .collect(),
                ),
                None => column.clone(),
            }
        })
        .collect();

    Table::from_columns_unchecked(columns)
}

/// Mean of the present values, as the value to fill gaps with.
///
/// Stays an integer when the column only holds integers and the mean is whole.
fn column_mean(column: &Column) -> Option<Value> {
    let present: Vec<&Value> = column.values.iter().filter(|v| !v.is_missing()).collect();
    if present.is_empty() {
        return None;
    }

    let sum: f64 = present.iter().filter_map(|v| v.as_f64()).sum();
    let mean = sum / present.len() as f64;
    let all_int = present.iter().all(|v| matches!(v, Value::Int(_)));

    if all_int && mean.fract() == 0.0 {
        Some(Value::Int(mean as i64))
    } else {
        Some(Value::Float(mean))
    }
}

/// Keep only the named columns, in the table's own column order.
///
/// Unknown names are skipped with a warning. Selecting every column returns
/// an identical table.
pub fn select_columns<S: AsRef<str>>(table: &Table, names: &[S]) -> Table {
    let wanted: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();

    for name in &wanted {
        if table.column(name).is_none() {
            log::warn!("Ignoring unknown column '{}' in selection", name);
        }
    }

    let columns: Vec<Column> = table
        .columns()
        .iter()
        .filter(|c| wanted.contains(c.name.as_str()))
        .cloned()
        .collect();

    Table::from_columns_unchecked(columns)
}
