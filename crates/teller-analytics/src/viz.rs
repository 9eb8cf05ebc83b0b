// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use teller_app::model::{CellValue, ChartKind, TabularResult, VisualizationConfig};

/// Slice colors cycle through this palette by index modulo its length.
pub const SLICE_PALETTE: [&str; 6] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#8884D8", "#82CA9D",
];

pub const HISTOGRAM_BUCKETS: usize = 10;
pub const PIE_SLICE_CAP: usize = 8;

/// A row re-projected from positional cells into name-keyed fields.
/// When column names repeat, the later column shadows the earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRecord {
    fields: Vec<(String, CellValue)>,
}

impl KeyedRecord {
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

/// Projects every row into keyed form using `columns` as field names.
/// Cells beyond the column list are dropped; short rows simply lack
/// the trailing fields.
pub fn project_records(columns: &[String], rows: &[Vec<CellValue>]) -> Vec<KeyedRecord> {
    rows.iter()
        .map(|row| KeyedRecord {
            fields: columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect(),
        })
        .collect()
}

/// Resolves the y column: the configured one if present, else the first
/// column differing from the x column, else the positional second
/// column, else the constant field name `value`.
pub fn resolve_y_column(config: &VisualizationConfig, columns: &[String]) -> String {
    if let Some(y) = &config.y_column {
        return y.clone();
    }
    columns
        .iter()
        .find(|name| **name != config.x_column)
        .or_else(|| columns.get(1))
        .cloned()
        .unwrap_or_else(|| "value".to_owned())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub x: CellValue,
    pub y: CellValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub name: String,
    pub value: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBucket {
    pub label: String,
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Chart-ready data for one visualization. `NoNumericData` and
/// `Unsupported` are terminal outcomes for that chart alone, never
/// failures of the surrounding message.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Series {
        x_column: String,
        y_column: String,
        points: Vec<SeriesPoint>,
    },
    Pie {
        slices: Vec<PieSlice>,
    },
    Histogram {
        buckets: Vec<HistogramBucket>,
    },
    NoNumericData,
    Unsupported,
}

/// Dispatches one chart configuration over a result. Pure: identical
/// inputs always yield identical output, colors included.
pub fn build_chart(config: &VisualizationConfig, result: &TabularResult) -> ChartData {
    let records = project_records(&result.columns, &result.rows);
    match config.kind {
        ChartKind::Bar | ChartKind::Line | ChartKind::Scatter => {
            let y_column = resolve_y_column(config, &result.columns);
            let points = records
                .iter()
                .map(|record| SeriesPoint {
                    x: field(record, &config.x_column),
                    y: field(record, &y_column),
                })
                .collect();
            ChartData::Series {
                x_column: config.x_column.clone(),
                y_column,
                points,
            }
        }
        ChartKind::Pie => {
            let y_column = resolve_y_column(config, &result.columns);
            let slices = records
                .iter()
                .take(PIE_SLICE_CAP)
                .enumerate()
                .map(|(index, record)| PieSlice {
                    name: field(record, &config.x_column).display(),
                    value: numeric(record.get(&y_column)).unwrap_or(0.0),
                    color: SLICE_PALETTE[index % SLICE_PALETTE.len()],
                })
                .collect();
            ChartData::Pie { slices }
        }
        ChartKind::Histogram => build_histogram(&records, &config.x_column),
        ChartKind::Unsupported => ChartData::Unsupported,
    }
}

fn field(record: &KeyedRecord, key: &str) -> CellValue {
    record.get(key).cloned().unwrap_or(CellValue::Null)
}

/// Numeric reading of a cell for chart math: finite numbers pass
/// through, numeric text coerces, everything else is non-numeric.
fn numeric(cell: Option<&CellValue>) -> Option<f64> {
    match cell {
        Some(CellValue::Text(text)) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        Some(cell) => cell.as_number(),
        None => None,
    }
}

fn build_histogram(records: &[KeyedRecord], x_column: &str) -> ChartData {
    let mut values: Vec<f64> = records
        .iter()
        .filter_map(|record| numeric(record.get(x_column)))
        .collect();
    if values.is_empty() {
        return ChartData::NoNumericData;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let min = values[0];
    let max = values[values.len() - 1];
    let bin_size = (max - min) / HISTOGRAM_BUCKETS as f64;

    // One shared edge array keeps buckets contiguous and monotone even
    // under floating-point rounding.
    let edges: Vec<f64> = (0..=HISTOGRAM_BUCKETS)
        .map(|i| min + i as f64 * bin_size)
        .collect();

    let mut counts = [0usize; HISTOGRAM_BUCKETS];
    for value in &values {
        // The final boundary is inclusive so the maximum is never dropped.
        let bucket = (0..HISTOGRAM_BUCKETS - 1)
            .find(|i| *value < edges[i + 1])
            .unwrap_or(HISTOGRAM_BUCKETS - 1);
        counts[bucket] += 1;
    }

    let buckets = (0..HISTOGRAM_BUCKETS)
        .map(|i| HistogramBucket {
            label: format!("{:.1}-{:.1}", edges[i], edges[i + 1]),
            start: edges[i],
            end: edges[i + 1],
            count: counts[i],
        })
        .collect();
    ChartData::Histogram { buckets }
}
