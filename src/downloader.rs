use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;

use crate::error::ConvertError;
use crate::format::{FileFormat, output_file_name};
use crate::table::{Table, Value};

/// Name given to the single sheet of exported workbooks.
pub const SHEET_NAME: &str = "Sheet1";

/// A table paired with the format it should be written in.
#[derive(Clone, Debug)]
pub struct ConversionRequest {
    pub format: FileFormat,
    pub table: Table,
}

/// A converted file, ready to be offered for download.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl ConversionRequest {
    pub fn new(format: FileFormat, table: Table) -> Self {
        ConversionRequest { format, table }
    }

    /// Serialize the table and name the result after `original_name`.
    ///
    /// # Examples
    /// ```
    /// use sheetconv::downloader::ConversionRequest;
    /// use sheetconv::format::FileFormat;
    /// use sheetconv::loader::from_csv;
    ///
    /// let table = from_csv("sales.xlsx", b"a,b\n1,2\n").unwrap();
    /// let artifact = ConversionRequest::new(FileFormat::Csv, table).convert("sales.xlsx").unwrap();
    /// assert_eq!(artifact.file_name, "sales.csv");
    /// assert_eq!(artifact.mime_type, "text/csv");
    /// ```
    pub fn convert(self, original_name: &str) -> Result<OutputArtifact, ConvertError> {
        let bytes = match self.format {
            FileFormat::Csv => to_csv(&self.table)?.into_bytes(),
            FileFormat::Workbook => to_xlsx(&self.table)?,
        };

        Ok(OutputArtifact {
            file_name: output_file_name(original_name, self.format),
            mime_type: self.format.mime_type(),
            bytes,
        })
    }
}

/// Convert a table to CSV text
///
/// Writes the header row and then one line per row, with no index column.
/// Fields containing commas, quotes or line breaks are quoted.
///
/// # Arguments
/// * `table` - Table to export; a table without columns gives an empty string
///
/// # Returns
/// * `Result<String, ConvertError>` - CSV content, `\n` line endings, or an export error
///
/// # Examples
/// ```
/// use sheetconv::downloader::to_csv;
/// use sheetconv::loader::from_csv;
///
/// let table = from_csv("t.csv", b"name,score\n\"Smith, J\",2.0\n").unwrap();
/// assert_eq!(to_csv(&table).unwrap(), "name,score\n\"Smith, J\",2.0\n");
/// ```
pub fn to_csv(table: &Table) -> Result<String, ConvertError> {
    let export_err = |e: &dyn std::fmt::Display| ConvertError::Export {
        format: FileFormat::Csv.label().to_string(),
        detail: e.to_string(),
    };

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    if table.width() > 0 {
        writer
            .write_record(table.column_names())
            .map_err(|e| export_err(&e))?;
        for row in table.rows() {
            writer
                .write_record(row.iter().map(|v| v.to_string()))
                .map_err(|e| export_err(&e))?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| export_err(&e))?;
    String::from_utf8(bytes).map_err(|e| export_err(&e))
}

/// Convert a table to XLSX bytes
///
/// One sheet named `Sheet1`, bold header row, data underneath, no index
/// column. Numbers and booleans are written as typed cells and missing cells
/// are left blank.
///
/// # Arguments
/// * `table` - Table to export
///
/// # Returns
/// * `Result<Vec<u8>, ConvertError>` - The workbook file, or an export error
///   when the table exceeds the sheet limits
///
/// # Examples
/// ```
/// use sheetconv::downloader::to_xlsx;
/// use sheetconv::loader::{from_csv, from_xlsx};
///
/// let table = from_csv("t.csv", b"a,b\n1,x\n").unwrap();
/// let bytes = to_xlsx(&table).unwrap();
/// assert_eq!(from_xlsx("t.xlsx", &bytes).unwrap(), table);
/// ```
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, ConvertError> {
    write_workbook(table).map_err(|e| ConvertError::Export {
        format: FileFormat::Workbook.label().to_string(),
        detail: e.to_string(),
    })
}

fn write_workbook(table: &Table) -> Result<Vec<u8>, rust_xlsxwriter::XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (c, column) in table.columns().iter().enumerate() {
        let col = u16::try_from(c).map_err(|_| {
            rust_xlsxwriter::XlsxError::ParameterError(format!("too many columns: {}", table.width()))
        })?;
        worksheet.write_string_with_format(0, col, column.name.as_str(), &header_format)?;

        for (r, value) in column.values.iter().enumerate() {
            let row = u32::try_from(r + 1).map_err(|_| {
                rust_xlsxwriter::XlsxError::ParameterError(format!("too many rows: {}", table.height()))
            })?;
            match value {
                Value::Int(i) => {
                    worksheet.write_number(row, col, *i as f64)?;
                }
                Value::Float(f) => {
                    worksheet.write_number(row, col, *f)?;
                }
                Value::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                Value::Text(s) => {
                    worksheet.write_string(row, col, s.as_str())?;
                }
                Value::Missing => {}
            }
        }
    }

    workbook.save_to_buffer()
}
