// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// A single cell of a query result. The open JSON value is narrowed to
/// this closed variant once, at ingestion, so downstream consumers match
/// exhaustively instead of re-inspecting dynamic values.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(flag) => Self::Bool(flag),
            serde_json::Value::Number(number) => match number.as_f64() {
                Some(parsed) => Self::Number(parsed),
                None => Self::Text(number.to_string()),
            },
            serde_json::Value::String(text) => Self::Text(text),
            other => Self::Text(other.to_string()),
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }

    /// Display form: muted `null` literal, bare booleans, numbers with
    /// thousands grouping and no forced decimal places, text verbatim.
    pub fn display(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::Bool(true) => "true".to_owned(),
            Self::Bool(false) => "false".to_owned(),
            Self::Number(value) => format_grouped_number(*value),
            Self::Text(value) => value.clone(),
        }
    }
}

/// Thousands-grouped rendering with up to three fractional digits,
/// trailing zeros trimmed, never forced.
pub fn format_grouped_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{:.3}", value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, fraction.trim_end_matches('0')),
        None => (formatted.as_str(), ""),
    };

    let mut grouped = String::new();
    let digits = integer.len();
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (digits - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let mut out = String::new();
    if value < 0.0 && (grouped.chars().any(|ch| ch != '0' && ch != ',') || !fraction.is_empty()) {
        out.push('-');
    }
    out.push_str(&grouped);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Canonical in-memory shape of a query result.
///
/// When `success` is false only `error` is authoritative. `truncated`
/// means the server capped returned rows below the true match count;
/// that is distinct from a genuinely empty result.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularResult {
    pub success: bool,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub row_count: usize,
    pub truncated: bool,
    pub error: Option<String>,
}

impl TabularResult {
    pub fn from_error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            truncated: false,
            error: Some(error.into()),
        }
    }

    pub const fn failed(&self) -> bool {
        !self.success
    }

    pub fn is_empty(&self) -> bool {
        self.success && self.row_count == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    pub issued_query: Option<String>,
    pub result: Option<TabularResult>,
    pub analysis: Option<AnalysisPayload>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub key: SessionKey,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightKind {
    Trend,
    Anomaly,
    Correlation,
    Pattern,
    Threshold,
    Forecast,
    Other,
}

impl InsightKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trend => "trend",
            Self::Anomaly => "anomaly",
            Self::Correlation => "correlation",
            Self::Pattern => "pattern",
            Self::Threshold => "threshold",
            Self::Forecast => "forecast",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "trend" => Some(Self::Trend),
            "anomaly" => Some(Self::Anomaly),
            "correlation" => Some(Self::Correlation),
            "pattern" => Some(Self::Pattern),
            "threshold" => Some(Self::Threshold),
            "forecast" => Some(Self::Forecast),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Wire decoding keeps unrecognized kinds instead of failing; they
    /// fall back to the generic presentation.
    pub fn parse_lossy(value: &str) -> Self {
        Self::parse(value).unwrap_or(Self::Other)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub metric: String,
    pub value: f64,
    pub significance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
    Pie,
    Histogram,
    Unsupported,
}

impl ChartKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Pie => "pie",
            Self::Histogram => "histogram",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "bar" => Self::Bar,
            "line" => Self::Line,
            "scatter" => Self::Scatter,
            "pie" => Self::Pie,
            "histogram" => Self::Histogram,
            _ => Self::Unsupported,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationConfig {
    pub kind: ChartKind,
    pub title: String,
    pub description: String,
    pub x_column: String,
    pub y_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analysis_type: String,
    pub row_count: i64,
    pub column_count: i64,
}

/// Analytics aggregate attached to an assistant message when the server
/// ran analysis for the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub insights: Vec<Insight>,
    pub recommendations: Vec<String>,
    pub visualizations: Vec<VisualizationConfig>,
    pub statistical_summary: Option<serde_json::Value>,
    pub metadata: Option<AnalysisMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOverview {
    pub table_name: String,
    pub row_count: i64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRelationship {
    pub from: String,
    pub to: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub total_tables: i64,
    pub total_rows: i64,
    pub tables: Vec<TableOverview>,
    pub relationships: Vec<TableRelationship>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricGroup {
    pub name: String,
    pub entries: Vec<MetricEntry>,
}

/// Nested numeric metric groups reported by the warehouse, newest
/// calculation timestamp attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessMetrics {
    pub groups: Vec<MetricGroup>,
    pub calculated_at: OffsetDateTime,
}
