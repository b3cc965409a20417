use plotters::prelude::*;
use serde::Serialize;

use crate::config::{CHART_SIZE, NO_NUMERIC_DATA};
use crate::error::ConvertError;
use crate::table::Table;

const SERIES_COLORS: [RGBColor; 2] = [RGBColor(31, 119, 180), RGBColor(255, 127, 14)];

/// One bar series: a column name and its values, aligned with [`ChartData::rows`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// Values taken from a table for charting.
///
/// `rows` holds the original row position of each point, after rows with a
/// missing value in any series were dropped.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartData {
    pub rows: Vec<usize>,
    pub series: Vec<Series>,
}

/// Result of asking for a chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Visualization {
    /// A rendered bar chart, as a standalone SVG document
    #[serde(rename = "ok")]
    Chart {
        columns: Vec<String>,
        points: usize,
        svg: String,
    },
    /// The table had no numeric column; nothing was drawn
    Empty { message: String },
}

/// Pick the first two numeric columns and line their values up by row.
///
/// Cells that are not numbers are treated as missing, and any row missing a
/// value in one of the picked columns is dropped. Returns `None` when the
/// table has no numeric column at all.
pub fn chart_data(table: &Table) -> Option<ChartData> {
    let picked: Vec<_> = table.numeric_columns().into_iter().take(2).collect();
    if picked.is_empty() {
        return None;
    }

    let mut rows = Vec::new();
    let mut series: Vec<Series> = picked
        .iter()
        .map(|c| Series {
            name: c.name.clone(),
            values: Vec::new(),
        })
        .collect();

    for r in 0..table.height() {
        let point: Option<Vec<f64>> = picked.iter().map(|c| c.values[r].coerce_f64()).collect();
        if let Some(point) = point {
            rows.push(r);
            for (s, v) in series.iter_mut().zip(point) {
                s.values.push(v);
            }
        }
    }

    Some(ChartData { rows, series })
}

/// Build the chart for a table, or the "no numerical data" notice.
///
/// The table is only read.
///
/// # Examples
/// ```
/// use sheetconv::graph::{visualize, Visualization};
/// use sheetconv::table::{Table, Value};
///
/// let table = Table::from_rows(
///     vec!["label".into()],
///     vec![vec![Value::Text("a".into())]],
/// ).unwrap();
/// assert!(matches!(visualize(&table).unwrap(), Visualization::Empty { .. }));
/// ```
pub fn visualize(table: &Table) -> Result<Visualization, ConvertError> {
    match chart_data(table) {
        None => Ok(Visualization::Empty {
            message: NO_NUMERIC_DATA.to_string(),
        }),
        Some(data) => {
            let svg = render_bar_chart(&data, CHART_SIZE)?;
            Ok(Visualization::Chart {
                columns: data.series.iter().map(|s| s.name.clone()).collect(),
                points: data.rows.len(),
                svg,
            })
        }
    }
}

/// Draw grouped bars, one group per row and one bar per series.
pub fn render_bar_chart(data: &ChartData, size: (u32, u32)) -> Result<String, ConvertError> {
    let mut svg = String::new();
    draw_bars(data, size, &mut svg).map_err(|e| ConvertError::Chart {
        detail: e.to_string(),
    })?;
    Ok(svg)
}

fn draw_bars(
    data: &ChartData,
    size: (u32, u32),
    out: &mut String,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::with_string(out, size).into_drawing_area();
    root.fill(&WHITE)?;

    let points = data.rows.len();
    let all_values = data.series.iter().flat_map(|s| s.values.iter().copied());
    let (min_y, max_y) = all_values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((max_y - min_y) * 0.05).max(0.5);
    let y_start = if min_y < 0.0 { min_y - pad } else { 0.0 };
    let y_range = y_start..max_y + pad;
    let x_range = -0.5f64..(points.max(1) as f64 - 0.5);

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)?;

    let rows = &data.rows;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(points.min(20))
        .x_label_formatter(&|x| {
            let i = x.round();
            if i >= 0.0 && (i as usize) < rows.len() && (x - i).abs() < 1e-9 {
                rows[i as usize].to_string()
            } else {
                String::new()
            }
        })
        .draw()?;

    let groups = data.series.len().max(1) as f64;
    let bar_width = 0.8 / groups;

    for (s, series) in data.series.iter().enumerate() {
        let color = SERIES_COLORS[s % SERIES_COLORS.len()];
        let offset = -0.4 + bar_width * s as f64;
        chart
            .draw_series(series.values.iter().enumerate().map(move |(i, v)| {
                let x0 = i as f64 + offset;
                Rectangle::new([(x0, 0.0), (x0 + bar_width, *v)], color.filled())
            }))?
            .label(series.name.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
