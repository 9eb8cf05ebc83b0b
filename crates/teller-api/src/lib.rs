// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use teller_app::ids::{MessageId, SessionKey};
use teller_app::model::{
    AnalysisMetadata, AnalysisPayload, BusinessMetrics, CellValue, ChartKind, ChatMessage,
    DatabaseStats, Insight, InsightKind, MetricEntry, MetricGroup, Role, Session, TableOverview,
    TableRelationship, TabularResult, VisualizationConfig,
};
use teller_app::state::ChatExchange;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

/// Result of the analyze-data operation: the executed query's result
/// plus the analytics aggregate computed over it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub query_result: TabularResult,
    pub analysis: AnalysisPayload,
    pub analysis_type: String,
}

/// Blocking client for the warehouse copilot server. All operations
/// speak JSON over HTTP and surface transport and server failures as
/// plain error strings suitable for the banner.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        Url::parse(&base_url).with_context(|| format!("api.base_url {base_url:?} is not a URL"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends one chat message. A transport failure, a non-2xx status,
    /// and a `success: false` body all come back as errors; the caller
    /// treats them uniformly.
    pub fn send_chat(&self, text: &str, session_key: &SessionKey) -> Result<ChatExchange> {
        let response = self
            .http
            .post(format!("{}/api/chat/", self.base_url))
            .json(&serde_json::json!({
                "message": text,
                "session_id": session_key.as_str(),
            }))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: WireChatResponse = response.json().context("decode chat response")?;
        if !parsed.success {
            bail!(
                "{}",
                parsed
                    .error
                    .filter(|error| !error.is_empty())
                    .unwrap_or_else(|| "chat request failed".to_owned())
            );
        }
        let message = parsed
            .message
            .ok_or_else(|| anyhow!("chat response is missing the assistant message"))?;

        Ok(ChatExchange {
            session_key: SessionKey::new(parsed.session_id),
            message: decode_message(message)?,
        })
    }

    pub fn fetch_session(&self, key: &SessionKey) -> Result<Session> {
        let response = self
            .http
            .get(format!(
                "{}/api/chat/sessions/{}/",
                self.base_url,
                key.as_str()
            ))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: WireSession = response.json().context("decode session")?;
        decode_session(parsed)
    }

    pub fn execute_query(&self, query: &str) -> Result<TabularResult> {
        let response = self
            .http
            .post(format!("{}/api/database/execute/", self.base_url))
            .json(&serde_json::json!({ "query": query }))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: WireQueryResult = response.json().context("decode query result")?;
        Ok(decode_result(parsed))
    }

    pub fn database_stats(&self) -> Result<DatabaseStats> {
        let response = self
            .http
            .get(format!("{}/api/database/stats/", self.base_url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: WireDatabaseStats = response.json().context("decode database stats")?;
        Ok(decode_stats(parsed))
    }

    pub fn business_metrics(&self) -> Result<BusinessMetrics> {
        let response = self
            .http
            .get(format!("{}/api/analytics/metrics/", self.base_url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: WireMetricsResponse = response.json().context("decode business metrics")?;
        if !parsed.success {
            bail!("metrics request failed");
        }
        Ok(BusinessMetrics {
            groups: decode_metric_groups(&parsed.metrics),
            calculated_at: parse_timestamp(&parsed.calculated_at)?,
        })
    }

    pub fn analyze_data(
        &self,
        query: &str,
        analysis_type: Option<&str>,
        session_key: Option<&SessionKey>,
    ) -> Result<AnalysisOutcome> {
        let mut body = serde_json::json!({ "query": query });
        if let Some(kind) = analysis_type {
            body["analysis_type"] = serde_json::json!(kind);
        }
        if let Some(key) = session_key {
            body["session_id"] = serde_json::json!(key.as_str());
        }

        let response = self
            .http
            .post(format!("{}/api/analytics/analyze/", self.base_url))
            .json(&body)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: WireAnalysisResponse = response.json().context("decode analysis")?;
        if !parsed.success {
            bail!("analysis request failed");
        }
        Ok(AnalysisOutcome {
            query_result: decode_result(parsed.query_result),
            analysis: decode_analysis(parsed.analysis),
            analysis_type: parsed.analysis_type,
        })
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- is the warehouse copilot server running? ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<WireErrorEnvelope>(body) {
        if let Some(error) = parsed.error.filter(|error| !error.is_empty()) {
            return anyhow!("server error ({}): {}", status.as_u16(), error);
        }
        if let Some(detail) = parsed.detail.filter(|detail| !detail.is_empty()) {
            return anyhow!("server error ({}): {}", status.as_u16(), detail);
        }
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

fn parse_timestamp(raw: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).with_context(|| format!("parse timestamp {raw:?}"))
}

fn decode_message(wire: WireChatMessage) -> Result<ChatMessage> {
    let role = Role::parse(&wire.message_type)
        .ok_or_else(|| anyhow!("unrecognized message_type {:?}", wire.message_type))?;
    Ok(ChatMessage {
        id: MessageId::new(wire.id),
        role,
        text: wire.content,
        issued_query: wire.sql_query.filter(|query| !query.is_empty()),
        result: wire.sql_result.map(decode_result),
        analysis: wire.analysis.map(decode_analysis),
        created_at: parse_timestamp(&wire.created_at)?,
    })
}

fn decode_session(wire: WireSession) -> Result<Session> {
    let messages = wire
        .messages
        .into_iter()
        .map(decode_message)
        .collect::<Result<Vec<_>>>()?;
    Ok(Session {
        key: SessionKey::new(wire.session_id),
        created_at: parse_timestamp(&wire.created_at)?,
        updated_at: parse_timestamp(&wire.updated_at)?,
        messages,
    })
}

fn decode_result(wire: WireQueryResult) -> TabularResult {
    let rows: Vec<Vec<CellValue>> = wire
        .data
        .into_iter()
        .map(|row| row.into_iter().map(CellValue::from_json).collect())
        .collect();
    let row_count = wire.row_count.unwrap_or(rows.len());
    TabularResult {
        success: wire.success,
        columns: wire.columns,
        rows,
        row_count,
        truncated: wire.truncated,
        error: wire.error.filter(|error| !error.is_empty()),
    }
}

fn decode_analysis(wire: WireAnalysis) -> AnalysisPayload {
    AnalysisPayload {
        insights: wire.insights.into_iter().map(decode_insight).collect(),
        recommendations: wire.recommendations,
        visualizations: wire
            .visualizations
            .into_iter()
            .map(decode_visualization)
            .collect(),
        statistical_summary: wire.statistical,
        metadata: wire.metadata.map(|metadata| AnalysisMetadata {
            analysis_type: metadata.analysis_type,
            row_count: metadata.row_count,
            column_count: metadata.column_count,
        }),
    }
}

fn decode_insight(wire: WireInsight) -> Insight {
    Insight {
        kind: InsightKind::parse_lossy(&wire.kind),
        title: wire.title,
        description: wire.description,
        metric: wire.metric,
        value: wire.value,
        significance: wire.significance,
    }
}

fn decode_visualization(wire: WireVisualization) -> VisualizationConfig {
    VisualizationConfig {
        kind: ChartKind::parse(&wire.kind),
        title: wire.title,
        description: wire.description,
        x_column: wire.x_column,
        y_column: wire.y_column.filter(|column| !column.is_empty()),
    }
}

fn decode_stats(wire: WireDatabaseStats) -> DatabaseStats {
    DatabaseStats {
        total_tables: wire.total_tables,
        total_rows: wire.total_rows,
        tables: wire
            .tables
            .into_iter()
            .map(|table| TableOverview {
                table_name: table.table_name,
                row_count: table.row_count,
                description: table.description,
            })
            .collect(),
        relationships: wire
            .relationships
            .into_iter()
            .map(|relationship| TableRelationship {
                from: relationship.from,
                to: relationship.to,
                kind: relationship.kind,
            })
            .collect(),
    }
}

/// Flattens `{ group: { metric: number, ... }, ... }` into ordered
/// groups; nested objects contribute dot-joined entry names and
/// non-numeric leaves are skipped.
fn decode_metric_groups(metrics: &serde_json::Value) -> Vec<MetricGroup> {
    let Some(object) = metrics.as_object() else {
        return Vec::new();
    };
    object
        .iter()
        .map(|(name, value)| {
            let mut entries = Vec::new();
            collect_metric_entries("", value, &mut entries);
            MetricGroup {
                name: name.clone(),
                entries,
            }
        })
        .collect()
}

fn collect_metric_entries(prefix: &str, value: &serde_json::Value, out: &mut Vec<MetricEntry>) {
    match value {
        serde_json::Value::Number(number) => {
            if let Some(number) = number.as_f64() {
                out.push(MetricEntry {
                    name: prefix.to_owned(),
                    value: number,
                });
            }
        }
        serde_json::Value::Object(object) => {
            for (key, nested) in object {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_metric_entries(&name, nested, out);
            }
        }
        _ => {}
    }
}

#[derive(Debug, Deserialize)]
struct WireErrorEnvelope {
    error: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChatResponse {
    session_id: String,
    message: Option<WireChatMessage>,
    success: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChatMessage {
    #[serde(default)]
    id: i64,
    message_type: String,
    content: String,
    sql_query: Option<String>,
    sql_result: Option<WireQueryResult>,
    analysis: Option<WireAnalysis>,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct WireSession {
    session_id: String,
    created_at: String,
    updated_at: String,
    #[serde(default)]
    messages: Vec<WireChatMessage>,
}

#[derive(Debug, Deserialize)]
struct WireQueryResult {
    success: bool,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<serde_json::Value>>,
    row_count: Option<usize>,
    #[serde(default)]
    truncated: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireAnalysis {
    #[serde(default)]
    insights: Vec<WireInsight>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    visualizations: Vec<WireVisualization>,
    #[serde(alias = "statistical_summary")]
    statistical: Option<serde_json::Value>,
    metadata: Option<WireAnalysisMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireInsight {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    metric: String,
    #[serde(default)]
    value: f64,
    #[serde(default)]
    significance: f64,
}

#[derive(Debug, Deserialize)]
struct WireVisualization {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    #[serde(default)]
    description: String,
    x_column: String,
    y_column: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireAnalysisMetadata {
    analysis_type: String,
    #[serde(default)]
    row_count: i64,
    #[serde(default)]
    column_count: i64,
}

#[derive(Debug, Deserialize)]
struct WireDatabaseStats {
    total_tables: i64,
    total_rows: i64,
    #[serde(default)]
    tables: Vec<WireTableOverview>,
    #[serde(default)]
    relationships: Vec<WireRelationship>,
}

#[derive(Debug, Deserialize)]
struct WireTableOverview {
    table_name: String,
    row_count: i64,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct WireRelationship {
    from: String,
    to: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct WireMetricsResponse {
    success: bool,
    #[serde(default)]
    metrics: serde_json::Value,
    calculated_at: String,
}

#[derive(Debug, Deserialize)]
struct WireAnalysisResponse {
    success: bool,
    query_result: WireQueryResult,
    analysis: WireAnalysis,
    #[serde(default)]
    analysis_type: String,
}
