use calamine::{Data, DataType, Reader, Xlsx, open_workbook_from_rs};
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use crate::config::NA_TOKENS;
use crate::error::ConvertError;
use crate::format::FileFormat;
use crate::table::{Column, Table, Value};

const BOOL_TRUE: [&str; 3] = ["True", "true", "TRUE"];
const BOOL_FALSE: [&str; 3] = ["False", "false", "FALSE"];

/// Parse an uploaded file into a [`Table`] according to its detected format.
///
/// # Arguments
/// * `name` - Original file name, only used in error messages
/// * `bytes` - Raw file content
/// * `format` - Format returned by [`FileFormat::detect`]
///
/// # Examples
/// ```
/// use sheetconv::format::FileFormat;
/// use sheetconv::loader::parse;
///
/// let table = parse("data.csv", b"a,b\n1,x\n", FileFormat::Csv).unwrap();
/// assert_eq!(table.column_names(), vec!["a", "b"]);
/// ```
pub fn parse(name: &str, bytes: &[u8], format: FileFormat) -> Result<Table, ConvertError> {
    match format {
        FileFormat::Csv => from_csv(name, bytes),
        FileFormat::Workbook => from_xlsx(name, bytes),
    }
}

/// Load a table from CSV bytes
///
/// The first record is the header. Each column is typed once, after all rows
/// are read: integer, then float, then boolean, falling back to text.
pub fn from_csv(name: &str, bytes: &[u8]) -> Result<Table, ConvertError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record.map_err(|e| ConvertError::parse(name, e))?,
        None => return Err(ConvertError::parse(name, "No columns to parse from file")),
    };
    let headers = normalize_headers(header.iter().map(str::to_string).collect());
    let width = headers.len();

    // Column-major raw cells; `None` marks an NA token.
    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); width];

    for record in records {
        let record = record.map_err(|e| ConvertError::parse(name, e))?;
        if record.len() > width {
            let line = record.position().map_or(0, |p| p.line());
            return Err(ConvertError::parse(
                name,
                format!(
                    "Expected {} fields in line {}, saw {}",
                    width,
                    line,
                    record.len()
                ),
            ));
        }

        for (c, column) in raw.iter_mut().enumerate() {
            let cell = record.get(c).filter(|field| !is_na(field));
            column.push(cell.map(str::to_string));
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(header, cells)| Column::new(header, type_csv_column(cells)))
        .collect();

    Table::from_columns(columns).map_err(|e| ConvertError::parse(name, e))
}

/// Decide the type of a CSV column and convert its cells.
fn type_csv_column(cells: Vec<Option<String>>) -> Vec<Value> {
    let present = || cells.iter().flatten().map(|s| s.trim());

    if present().all(|s| s.parse::<i64>().is_ok()) {
        return cells
            .iter()
            .map(|c| match c {
                Some(s) => s.trim().parse().map_or(Value::Missing, Value::Int),
                None => Value::Missing,
            })
            .collect();
    }

    if present().all(|s| s.parse::<f64>().is_ok()) {
        return cells
            .iter()
            .map(|c| match c {
                Some(s) => s.trim().parse().map_or(Value::Missing, Value::Float),
                None => Value::Missing,
            })
            .collect();
    }

    if present().all(|s| BOOL_TRUE.contains(&s) || BOOL_FALSE.contains(&s)) {
        return cells
            .iter()
            .map(|c| match c {
                Some(s) => Value::Bool(BOOL_TRUE.contains(&s.trim())),
                None => Value::Missing,
            })
            .collect();
    }

    cells
        .into_iter()
        .map(|c| c.map_or(Value::Missing, Value::Text))
        .collect()
}

/// Load a table from the first sheet of an `.xlsx` workbook
///
/// An empty sheet gives an empty table; a byte stream that is not a readable
/// workbook is a parse error.
pub fn from_xlsx(name: &str, bytes: &[u8]) -> Result<Table, ConvertError> {
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(Cursor::new(bytes)).map_err(|e| ConvertError::parse(name, e))?;

    // Get the first worksheet
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ConvertError::parse(name, "No sheets found in workbook"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ConvertError::parse(name, e))?;

    if range.used_cells().next().is_none() {
        return Ok(Table::empty());
    }

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Table::empty());
    };

    let headers = normalize_headers(header_row.iter().map(header_text).collect());
    let data: Vec<Vec<Value>> = rows
        .map(|row| row.iter().map(workbook_value).collect())
        .collect();

    let table = Table::from_rows(headers, data).map_err(|e| ConvertError::parse(name, e))?;
    let columns = table
        .into_columns()
        .into_iter()
        .map(|c| Column::new(c.name, type_workbook_column(c.values)))
        .collect();

    Ok(Table::from_columns_unchecked(columns))
}

/// Convert one workbook cell; numbers keep the type calamine reports.
fn workbook_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Missing,
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) if is_na(s) => Value::Missing,
        Data::String(s) => Value::Text(s.clone()),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) => Value::Text(format_timestamp(&dt)),
            None => Value::Text(cell.to_string()),
        },
        other => Value::Text(other.to_string()),
    }
}

/// Header cells are always text; a whole number reads as `3`, not `3.0`.
fn header_text(cell: &Data) -> String {
    match workbook_value(cell) {
        Value::Float(f) => whole_int(f).map_or_else(|| f.to_string(), |i| i.to_string()),
        other => other.to_string(),
    }
}

fn whole_int(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

/// Decide the numeric type of a workbook column once.
///
/// Xlsx stores every number as a float. A column whose numbers are all whole
/// becomes `Int`; any fractional number makes the whole column `Float`.
/// Columns that mix numbers with text or booleans are left as read.
fn type_workbook_column(values: Vec<Value>) -> Vec<Value> {
    let present: Vec<&Value> = values.iter().filter(|v| !v.is_missing()).collect();
    if present.is_empty() || !present.iter().all(|v| v.is_number()) {
        return values;
    }

    let all_whole = present.iter().all(|v| match v {
        Value::Float(f) => whole_int(*f).is_some(),
        _ => true,
    });

    values
        .into_iter()
        .map(|v| match v {
            Value::Float(f) if all_whole => whole_int(f).map_or(Value::Float(f), Value::Int),
            Value::Int(i) if !all_whole => Value::Float(i as f64),
            other => other,
        })
        .collect()
}

fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn is_na(field: &str) -> bool {
    NA_TOKENS.contains(&field)
}

/// Give empty header cells a placeholder name and make repeated names unique.
///
/// Empty names become `Unnamed: <index>`; the second `a` becomes `a.1`, the
/// third `a.2`, and so on.
fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::with_capacity(raw.len());

    for (i, name) in raw.into_iter().enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {i}")
        } else {
            name
        };

        let mut candidate = base.clone();
        while used.contains(&candidate) {
            let n = counts.entry(base.clone()).or_insert(0);
            *n += 1;
            candidate = format!("{}.{}", base, n);
        }

        used.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnKind;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};

    #[test]
    fn csv_types_columns() {
        let t = from_csv(
            "t.csv",
            b"id,price,name,flag\n1,2.5,apple,True\n2,3,pear,false\n",
        )
        .unwrap();
        assert_eq!(t.column("id").unwrap().values, vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            t.column("price").unwrap().values,
            vec![Value::Float(2.5), Value::Float(3.0)]
        );
        assert_eq!(t.column("name").unwrap().kind(), ColumnKind::Text);
        assert_eq!(
            t.column("flag").unwrap().values,
            vec![Value::Bool(true), Value::Bool(false)]
        );
    }

    #[test]
    fn csv_na_tokens_become_missing() {
        let t = from_csv("t.csv", b"a,b\n1,x\n,NA\nnull,y\n").unwrap();
        assert_eq!(
            t.column("a").unwrap().values,
            vec![Value::Int(1), Value::Missing, Value::Missing]
        );
        assert_eq!(
            t.column("b").unwrap().values,
            vec![Value::Text("x".into()), Value::Missing, Value::Text("y".into())]
        );
    }

    #[test]
    fn csv_short_rows_are_padded() {
        let t = from_csv("t.csv", b"a,b,c\n1,2\n").unwrap();
        assert_eq!(t.height(), 1);
        assert_eq!(t.column("c").unwrap().values, vec![Value::Missing]);
    }

    #[test]
    fn csv_long_rows_are_rejected() {
        let err = from_csv("t.csv", b"a,b\n1,2\n3,4,5\n").unwrap_err();
        match err {
            ConvertError::Parse { name, detail } => {
                assert_eq!(name, "t.csv");
                assert!(detail.contains("Expected 2 fields in line 3, saw 3"), "{detail}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn csv_empty_input_is_a_parse_error() {
        assert!(matches!(
            from_csv("empty.csv", b""),
            Err(ConvertError::Parse { .. })
        ));
    }

    #[test]
    fn csv_invalid_utf8_is_a_parse_error() {
        assert!(matches!(
            from_csv("bad.csv", b"a,b\n\xff\xfe,1\n"),
            Err(ConvertError::Parse { .. })
        ));
    }

    #[test]
    fn csv_header_only_gives_empty_columns() {
        let t = from_csv("t.csv", b"a,b\n").unwrap();
        assert_eq!(t.width(), 2);
        assert_eq!(t.height(), 0);
    }

    #[test]
    fn csv_strips_bom_and_quotes() {
        let t = from_csv("t.csv", "\u{feff}name,note\n\"Smith, J\",\"said \"\"hi\"\"\"\n".as_bytes())
            .unwrap();
        assert_eq!(t.column_names(), vec!["name", "note"]);
        assert_eq!(t.column("name").unwrap().values[0], Value::Text("Smith, J".into()));
        assert_eq!(t.column("note").unwrap().values[0], Value::Text("said \"hi\"".into()));
    }

    #[test]
    fn headers_are_normalized() {
        let names = normalize_headers(vec!["a".into(), "".into(), "a".into(), "a".into()]);
        assert_eq!(names, vec!["a", "Unnamed: 1", "a.1", "a.2"]);
    }

    #[test]
    fn malformed_xlsx_is_a_parse_error() {
        let err = from_xlsx("broken.xlsx", b"definitely not a zip archive").unwrap_err();
        assert_eq!(err.kind(), "parse_error");
        assert!(err.to_string().contains("broken.xlsx"));
    }

    fn workbook(build: impl FnOnce(&mut Worksheet) -> Result<(), XlsxError>) -> Vec<u8> {
        let mut workbook = Workbook::new();
        build(workbook.add_worksheet()).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn csv_blank_lines_are_skipped() {
        let t = from_csv("t.csv", b"a,b\n1,2\n\n3,4\n").unwrap();
        assert_eq!(t.height(), 2);
        assert_eq!(t.column("a").unwrap().values, vec![Value::Int(1), Value::Int(3)]);
    }

    #[test]
    fn workbook_columns_are_typed_as_a_whole() {
        let bytes = workbook(|sheet| {
            sheet.write_string(0, 0, "price")?;
            sheet.write_string(0, 1, "qty")?;
            sheet.write_number(1, 0, 2.5)?;
            sheet.write_number(1, 1, 4.0)?;
            sheet.write_number(2, 0, 3.0)?;
            sheet.write_number(2, 1, 7.0)?;
            Ok(())
        });
        let t = from_xlsx("t.xlsx", &bytes).unwrap();
        assert_eq!(
            t.column("price").unwrap().values,
            vec![Value::Float(2.5), Value::Float(3.0)]
        );
        assert_eq!(t.column("qty").unwrap().values, vec![Value::Int(4), Value::Int(7)]);
    }

    #[test]
    fn workbook_type_rules() {
        assert_eq!(
            type_workbook_column(vec![Value::Int(1), Value::Missing, Value::Float(1.5)]),
            vec![Value::Float(1.0), Value::Missing, Value::Float(1.5)]
        );
        assert_eq!(
            type_workbook_column(vec![Value::Float(2.0), Value::Missing]),
            vec![Value::Int(2), Value::Missing]
        );
        let mixed = vec![Value::Float(2.0), Value::Text("x".into())];
        assert_eq!(type_workbook_column(mixed.clone()), mixed);
        assert_eq!(workbook_value(&Data::String("N/A".into())), Value::Missing);
    }

    #[test]
    fn workbook_dates_become_text() {
        let bytes = workbook(|sheet| {
            let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
            let noon = ExcelDateTime::from_ymd(2024, 3, 5)?.and_hms(12, 0, 0)?;
            sheet.write_string(0, 0, "when")?;
            sheet.write_datetime_with_format(1, 0, &noon, &date_format)?;
            Ok(())
        });
        let t = from_xlsx("t.xlsx", &bytes).unwrap();
        assert_eq!(
            t.column("when").unwrap().values,
            vec![Value::Text("2024-03-05 12:00:00".into())]
        );
    }

    #[test]
    fn workbook_headers_are_normalized() {
        let bytes = workbook(|sheet| {
            sheet.write_string(0, 0, "name")?;
            sheet.write_string(0, 2, "name")?;
            sheet.write_string(1, 0, "bolt")?;
            sheet.write_number(1, 1, 1.0)?;
            sheet.write_string(1, 2, "nut")?;
            Ok(())
        });
        let t = from_xlsx("t.xlsx", &bytes).unwrap();
        assert_eq!(t.column_names(), vec!["name", "Unnamed: 1", "name.1"]);
        assert_eq!(t.column("Unnamed: 1").unwrap().values, vec![Value::Int(1)]);
    }

    #[test]
    fn empty_worksheet_gives_empty_table() {
        let bytes = workbook(|_| Ok(()));
        let t = from_xlsx("empty.xlsx", &bytes).unwrap();
        assert_eq!(t, Table::empty());
        assert_eq!(t.height(), 0);
    }
}
