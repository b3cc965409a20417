/*!
# sheetconv

Upload CSV or Excel files, preview them, clean them, chart them and convert
them back to CSV or Excel, from the browser or the command line.

## Overview

Every uploaded file goes through the same single-pass pipeline, on its own
in-memory table:

```text
Uploaded → Detected → Parsed → [Cleaned]* → [ColumnReduced] → [Visualized] → Serialized → Offered
```

Nothing is persisted and no state is shared between files or requests. Only
two things can go wrong: the extension is not `.csv`/`.xlsx`, or the bytes do
not parse. Either one stops that file and nothing else.

## Modules

- **format**: format detection by extension, output names, MIME types
- **table**: cell values, columns, the table type
- **loader**: CSV and XLSX parsing
- **cleaning**: duplicate removal, mean fill, column selection
- **graph**: bar chart of the first two numeric columns (SVG)
- **downloader**: CSV and XLSX serialization
- **workflow**: the per-file pipeline and batch processing
- **config**: defaults and server settings
- **app**: HTTP routes (feature `web`)

## REST API Endpoints

- `GET /` - the upload page
- `POST /api/preview` - parse one or more files, return column info and the first rows
- `POST /api/convert` - run the pipeline on one file and download the result
- `POST /api/visualize` - run the pipeline on one file and return the chart
*/

pub mod cleaning;
pub mod config;
pub mod downloader;
pub mod error;
pub mod format;
pub mod graph;
pub mod loader;
pub mod table;
pub mod workflow;

#[cfg(feature = "web")]
pub mod app;

pub use downloader::{ConversionRequest, OutputArtifact};
pub use error::ConvertError;
pub use format::FileFormat;
pub use graph::Visualization;
pub use table::{Column, ColumnKind, Table, Value};
pub use workflow::{FileOutcome, FileReport, ProcessOptions, Stage, UploadedFile, process_batch, process_file};
