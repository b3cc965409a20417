#![cfg(not(tarpaulin_include))]

//! Command-line front end: runs the conversion pipeline over files on disk.

use anyhow::{Context, Result, bail};
use clap::Parser;
use sheetconv::config::DEFAULT_PREVIEW_ROWS;
use sheetconv::format::FileFormat;
use sheetconv::graph::Visualization;
use sheetconv::table::Table;
use sheetconv::workflow::{FileReport, ProcessOptions, UploadedFile, process_file};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "sheetconv",
    version,
    about = "Preview, clean, chart and convert CSV / XLSX files"
)]
struct Cli {
    /// Input files (.csv or .xlsx)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format; without it the files are only previewed
    #[arg(long, value_name = "csv|xlsx")]
    to: Option<FileFormat>,

    /// Enable the cleaning steps below
    #[arg(long)]
    clean: bool,

    /// Drop repeated rows (with --clean)
    #[arg(long)]
    remove_duplicates: bool,

    /// Fill gaps in numeric columns with the column mean (with --clean)
    #[arg(long)]
    fill_missing: bool,

    /// Columns to keep, comma separated (default: all)
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Write a bar chart of the first two numeric columns as <name>.svg
    #[arg(long)]
    chart: bool,

    /// Directory for converted files and charts
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Rows to print in each preview
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    preview_rows: usize,
}

impl Cli {
    fn options(&self) -> ProcessOptions {
        ProcessOptions {
            clean_data: self.clean,
            remove_duplicates: self.remove_duplicates,
            fill_missing: self.fill_missing,
            columns: self.columns.clone(),
            visualize: self.chart,
            convert_to: self.to,
            preview_rows: self.preview_rows,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let options = cli.options();

    let mut failed = 0;
    for path in &cli.files {
        if let Err(e) = run_one(path, &options, &cli.out_dir) {
            eprintln!("Error: {e:#}");
            failed += 1;
        }
    }

    if failed > 0 {
        eprintln!("{} of {} files failed", failed, cli.files.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_one(path: &Path, options: &ProcessOptions, out_dir: &Path) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("invalid file name: {}", path.display()))?
        .to_string();
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    let report = process_file(&UploadedFile::new(name, bytes), options)?;
    print_report(&report);
    write_outputs(&report, path, out_dir)
}

fn print_report(report: &FileReport) {
    println!("== {} ({})", report.file_name, report.format);
    println!("Preview of the file:");
    print_table(&report.preview);
    for notice in &report.notices {
        println!("{notice}");
    }
    println!();
}

/// Display width of each column, in characters, header included.
fn column_widths(table: &Table) -> Vec<usize> {
    let mut widths: Vec<usize> = table
        .columns()
        .iter()
        .map(|c| c.name.chars().count())
        .collect();
    for row in table.rows() {
        for (w, v) in widths.iter_mut().zip(&row) {
            *w = (*w).max(display(v).chars().count());
        }
    }
    widths
}

fn print_table(table: &Table) {
    let widths = column_widths(table);

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(table.columns().iter().map(|c| c.name.clone()).collect()));
    for row in table.rows() {
        println!("{}", line(row.iter().map(|v| display(v)).collect()));
    }
}

fn display(value: &sheetconv::Value) -> String {
    if value.is_missing() {
        "None".to_string()
    } else {
        value.to_string()
    }
}

/// Write the converted file and chart into `out_dir`.
///
/// Nothing is written if either target would land on `input` itself.
fn write_outputs(report: &FileReport, input: &Path, out_dir: &Path) -> Result<()> {
    let artifact = report
        .artifact
        .as_ref()
        .map(|a| (out_dir.join(&a.file_name), a));
    let chart = match &report.visualization {
        Some(Visualization::Chart { svg, .. }) => {
            let stem = Path::new(&report.file_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("chart");
            Some((out_dir.join(format!("{stem}.svg")), svg))
        }
        _ => None,
    };
    if artifact.is_none() && chart.is_none() {
        return Ok(());
    }

    for target in artifact.iter().map(|(t, _)| t).chain(chart.iter().map(|(t, _)| t)) {
        refuse_overwrite(input, target)?;
    }
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    if let Some((target, artifact)) = &artifact {
        fs::write(target, &artifact.bytes)
            .with_context(|| format!("writing {}", target.display()))?;
        println!("Wrote {} ({})", target.display(), artifact.mime_type);
    }

    if let Some((target, svg)) = &chart {
        fs::write(target, svg).with_context(|| format!("writing {}", target.display()))?;
        println!("Wrote {}", target.display());
    }

    Ok(())
}

fn refuse_overwrite(input: &Path, target: &Path) -> Result<()> {
    // A target that does not exist yet cannot be the input.
    if let (Ok(source), Ok(dest)) = (fs::canonicalize(input), fs::canonicalize(target)) {
        if source == dest {
            bail!(
                "refusing to overwrite input {} with output {}; pass a different --out-dir",
                input.display(),
                target.display()
            );
        }
    }
    Ok(())
}
