use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConvertError;

/// MIME type offered for CSV downloads.
pub const CSV_MIME: &str = "text/csv";

/// MIME type offered for workbook downloads.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// The two tabular formats the converter reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileFormat {
    /// Comma-separated values, first row is the header
    #[serde(rename = "csv", alias = "CSV")]
    Csv,

    /// Office Open XML workbook (`.xlsx`), first sheet only
    #[serde(rename = "xlsx", alias = "excel", alias = "Excel", alias = "XLSX")]
    Workbook,
}

impl FileFormat {
    /// Detect the format of an upload from its file name.
    ///
    /// Only the lowercase extension matters: `.csv` and `.xlsx` are accepted,
    /// everything else (including names with no extension) is rejected.
    ///
    /// # Examples
    /// ```
    /// use sheetconv::format::FileFormat;
    ///
    /// assert_eq!(FileFormat::detect("Sales.CSV").unwrap(), FileFormat::Csv);
    /// assert!(FileFormat::detect("report.txt").is_err());
    /// ```
    pub fn detect(file_name: &str) -> Result<FileFormat, ConvertError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.trim().to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(FileFormat::Csv),
            Some("xlsx") => Ok(FileFormat::Workbook),
            _ => Err(ConvertError::UnsupportedFormat {
                name: file_name.to_string(),
            }),
        }
    }

    /// Extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => ".csv",
            FileFormat::Workbook => ".xlsx",
        }
    }

    /// MIME type sent with a download of this format.
    ///
    /// # Examples
    /// ```
    /// use sheetconv::format::FileFormat;
    ///
    /// assert_eq!(FileFormat::Csv.mime_type(), "text/csv");
    /// assert!(FileFormat::Workbook.mime_type().contains("spreadsheetml"));
    /// ```
    pub fn mime_type(self) -> &'static str {
        match self {
            FileFormat::Csv => CSV_MIME,
            FileFormat::Workbook => XLSX_MIME,
        }
    }

    /// Label shown in the UI's format selector.
    pub fn label(self) -> &'static str {
        match self {
            FileFormat::Csv => "CSV",
            FileFormat::Workbook => "Excel",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" | "excel" | "workbook" => Ok(FileFormat::Workbook),
            other => Err(format!("unknown output format '{other}' (expected csv or xlsx)")),
        }
    }
}

/// Build the download name for a converted file.
///
/// The original extension is replaced; a name without one just gets the new
/// extension appended.
///
/// # Examples
/// ```
/// use sheetconv::format::{output_file_name, FileFormat};
///
/// assert_eq!(output_file_name("q3.sales.xlsx", FileFormat::Csv), "q3.sales.csv");
/// assert_eq!(output_file_name("Data.CSV", FileFormat::Workbook), "Data.xlsx");
/// ```
pub fn output_file_name(original: &str, target: FileFormat) -> String {
    let path = Path::new(original);
    let stem = match path.extension() {
        Some(_) => path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(original),
        None => original,
    };
    format!("{}{}", stem, target.extension())
}
