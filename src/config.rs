//! Defaults shared by every surface, plus the web server's settings.

/// Rows shown in a file preview.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Cell contents read as a missing value.
pub const NA_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Notice emitted when a chart is requested but no column is numeric.
pub const NO_NUMERIC_DATA: &str = "No numerical data available";

/// Chart size in pixels.
pub const CHART_SIZE: (u32, u32) = (800, 480);

/// Settings for the HTTP server.
///
/// Every flag also reads an environment variable, so the server can be
/// configured without arguments in a container.
#[cfg(feature = "web")]
#[derive(Clone, Debug, clap::Parser)]
#[command(name = "sheetconv-web", about = "Browser front end for converting CSV / XLSX files")]
pub struct ServerConfig {
    /// Interface to bind
    #[arg(long, env = "SHEETCONV_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "SHEETCONV_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Rows included in each preview
    #[arg(long, env = "SHEETCONV_PREVIEW_ROWS", default_value_t = DEFAULT_PREVIEW_ROWS)]
    pub preview_rows: usize,

    /// Reject request bodies larger than this many bytes (default: no limit)
    #[arg(long, env = "SHEETCONV_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,
}

#[cfg(feature = "web")]
impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(feature = "web")]
impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            max_upload_bytes: None,
        }
    }
}
