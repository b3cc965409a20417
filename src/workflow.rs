//! The per-file conversion pipeline.
//!
//! ```text
//! Uploaded → Detected → Parsed → [Cleaned]* → [ColumnReduced] → [Visualized] → Serialized → Offered
//! ```
//!
//! Each uploaded file runs through [`process_file`] on its own table. Only
//! format detection and parsing can fail; a failure ends that file's run and
//! nothing else. [`process_batch`] applies this to several uploads, keeping
//! one result per file.

use serde::{Deserialize, Serialize};

use crate::cleaning::{fill_missing_with_mean, remove_duplicates, select_columns};
use crate::config::DEFAULT_PREVIEW_ROWS;
use crate::downloader::{ConversionRequest, OutputArtifact};
use crate::error::ConvertError;
use crate::format::FileFormat;
use crate::graph::{Visualization, visualize};
use crate::loader;
use crate::table::Table;

/// A file handed over by the upload surface.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        UploadedFile {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// What the user asked for, for one file.
///
/// `remove_duplicates` and `fill_missing` only apply when `clean_data` is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessOptions {
    pub clean_data: bool,
    pub remove_duplicates: bool,
    pub fill_missing: bool,
    /// Columns to keep; `None` keeps them all
    pub columns: Option<Vec<String>>,
    pub visualize: bool,
    /// Output format; `None` skips serialization
    pub convert_to: Option<FileFormat>,
    pub preview_rows: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        ProcessOptions {
            clean_data: false,
            remove_duplicates: false,
            fill_missing: false,
            columns: None,
            visualize: false,
            convert_to: None,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

/// Steps a file can pass through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Uploaded,
    Detected,
    Parsed,
    Cleaned,
    ColumnReduced,
    Visualized,
    Serialized,
    Offered,
}

/// Everything produced for one successfully processed file.
#[derive(Clone, Debug)]
pub struct FileReport {
    pub file_name: String,
    pub format: FileFormat,
    pub stages: Vec<Stage>,
    /// First rows of the table as parsed, before any cleaning
    pub preview: Table,
    /// The table after cleaning and column selection
    pub table: Table,
    /// Messages for the user, e.g. "Duplicates removed."
    pub notices: Vec<String>,
    pub visualization: Option<Visualization>,
    pub artifact: Option<OutputArtifact>,
}

/// Outcome of one file within a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub file_name: String,
    pub result: Result<FileReport, ConvertError>,
}

/// Detect and parse an upload, without any further processing.
pub fn load(upload: &UploadedFile) -> Result<(FileFormat, Table), ConvertError> {
    let format = FileFormat::detect(&upload.name)?;
    let table = loader::parse(&upload.name, &upload.bytes, format)?;
    Ok((format, table))
}

/// Run one uploaded file through the whole pipeline.
///
/// # Examples
/// ```
/// use sheetconv::workflow::{process_file, ProcessOptions, UploadedFile};
/// use sheetconv::format::FileFormat;
///
/// let upload = UploadedFile::new("scores.csv", "n\n1\n3\n1\n".as_bytes());
/// let options = ProcessOptions {
///     clean_data: true,
///     remove_duplicates: true,
///     convert_to: Some(FileFormat::Csv),
///     ..ProcessOptions::default()
/// };
/// let report = process_file(&upload, &options).unwrap();
/// assert_eq!(report.artifact.unwrap().bytes, b"n\n1\n3\n");
/// ```
pub fn process_file(
    upload: &UploadedFile,
    options: &ProcessOptions,
) -> Result<FileReport, ConvertError> {
    let name = upload.name.as_str();
    let mut stages = vec![Stage::Uploaded];
    let mut notices = Vec::new();

    let format = FileFormat::detect(name)?;
    stages.push(Stage::Detected);
    log::info!("{}: detected {} input", name, format);

    let mut table = loader::parse(name, &upload.bytes, format)?;
    stages.push(Stage::Parsed);
    log::info!(
        "{}: parsed {} rows x {} columns",
        name,
        table.height(),
        table.width()
    );
    let preview = table.head(options.preview_rows);

    if options.clean_data {
        if options.remove_duplicates {
            let before = table.height();
            table = remove_duplicates(&table);
            stages.push(Stage::Cleaned);
            log::info!("{}: removed {} duplicate rows", name, before - table.height());
            notices.push("Duplicates removed.".to_string());
        }
        if options.fill_missing {
            table = fill_missing_with_mean(&table);
            stages.push(Stage::Cleaned);
            log::info!("{}: filled missing numeric values", name);
            notices.push("Missing values filled.".to_string());
        }
    }

    if let Some(columns) = &options.columns {
        table = select_columns(&table, columns);
        stages.push(Stage::ColumnReduced);
        log::info!("{}: kept columns {:?}", name, table.column_names());
    }

    let visualization = if options.visualize {
        let v = visualize(&table)?;
        if let Visualization::Empty { message } = &v {
            notices.push(message.clone());
        }
        stages.push(Stage::Visualized);
        Some(v)
    } else {
        None
    };

    let artifact = match options.convert_to {
        Some(target) => {
            let artifact = ConversionRequest::new(target, table.clone()).convert(name)?;
            stages.push(Stage::Serialized);
            log::info!(
                "{}: converted to {} ({} bytes)",
                name,
                artifact.file_name,
                artifact.bytes.len()
            );
            notices.push(format!("{} converted successfully.", name));
            stages.push(Stage::Offered);
            Some(artifact)
        }
        None => None,
    };

    Ok(FileReport {
        file_name: name.to_string(),
        format,
        stages,
        preview,
        table,
        notices,
        visualization,
        artifact,
    })
}

/// Process several uploads independently.
///
/// `options_for` is looked up by file name, so every file can carry its own
/// choices. A failing file is logged and reported in its own outcome; the
/// remaining files are still processed.
pub fn process_batch<F>(uploads: &[UploadedFile], options_for: F) -> Vec<FileOutcome>
where
    F: Fn(&str) -> ProcessOptions,
{
    uploads
        .iter()
        .map(|upload| {
            let options = options_for(&upload.name);
            let result = process_file(upload, &options);
            if let Err(e) = &result {
                log::warn!("Skipping {}: {}", upload.name, e);
            }
            FileOutcome {
                file_name: upload.name.clone(),
                result,
            }
        })
        .collect()
}
