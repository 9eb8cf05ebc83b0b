// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Deterministic fixtures for exercising the result pipeline without a
//! live warehouse copilot server.

use teller_app::ids::{MessageId, SessionKey};
use teller_app::model::{
    AnalysisMetadata, AnalysisPayload, BusinessMetrics, CellValue, ChartKind, ChatMessage,
    DatabaseStats, Insight, InsightKind, MetricEntry, MetricGroup, Role, TableOverview,
    TableRelationship, TabularResult, VisualizationConfig,
};
use teller_app::state::ChatExchange;
use time::OffsetDateTime;
use time::macros::datetime;

pub const FIXTURE_SESSION_KEY: &str = "fixture-session-7";

pub fn fixture_timestamp() -> OffsetDateTime {
    datetime!(2026-03-01 12:00 UTC)
}

/// A small numeric result: account balances grouped by branch.
pub fn balances_result() -> TabularResult {
    TabularResult {
        success: true,
        columns: vec!["branch".to_owned(), "balance".to_owned()],
        rows: vec![
            vec![
                CellValue::Text("Downtown".to_owned()),
                CellValue::Number(125_400.5),
            ],
            vec![
                CellValue::Text("Airport".to_owned()),
                CellValue::Number(88_210.0),
            ],
            vec![
                CellValue::Text("Harbor".to_owned()),
                CellValue::Number(64_075.25),
            ],
        ],
        row_count: 3,
        truncated: false,
        error: None,
    }
}

/// A result the server capped: 2 transmitted rows against 5000 logical.
pub fn truncated_result() -> TabularResult {
    TabularResult {
        success: true,
        columns: vec!["name".to_owned(), "amount".to_owned()],
        rows: vec![
            vec![
                CellValue::Text("alice".to_owned()),
                CellValue::Number(10.5),
            ],
            vec![CellValue::Text("bob".to_owned()), CellValue::Null],
        ],
        row_count: 5000,
        truncated: true,
        error: None,
    }
}

pub fn empty_result() -> TabularResult {
    TabularResult {
        success: true,
        columns: vec!["name".to_owned()],
        rows: Vec::new(),
        row_count: 0,
        truncated: false,
        error: None,
    }
}

pub fn failed_result() -> TabularResult {
    TabularResult {
        success: false,
        columns: Vec::new(),
        rows: Vec::new(),
        row_count: 0,
        truncated: false,
        error: Some("syntax error at line 1".to_owned()),
    }
}

/// A result with every cell classification in one row.
pub fn mixed_cells_result() -> TabularResult {
    TabularResult {
        success: true,
        columns: vec![
            "name".to_owned(),
            "balance".to_owned(),
            "premium".to_owned(),
            "closed_at".to_owned(),
        ],
        rows: vec![vec![
            CellValue::Text("alice".to_owned()),
            CellValue::Number(1_204_500.75),
            CellValue::Bool(true),
            CellValue::Null,
        ]],
        row_count: 1,
        truncated: false,
        error: None,
    }
}

/// Insights spanning all three significance tiers plus a clamped score.
pub fn tiered_insights() -> Vec<Insight> {
    vec![
        Insight {
            kind: InsightKind::Trend,
            title: "Balances rising".to_owned(),
            description: "Average balance grew three months in a row".to_owned(),
            metric: "avg_balance".to_owned(),
            value: 4512.0,
            significance: 0.92,
        },
        Insight {
            kind: InsightKind::Anomaly,
            title: "Airport branch outlier".to_owned(),
            description: "One branch deviates from the cluster".to_owned(),
            metric: "balance".to_owned(),
            value: 88_210.0,
            significance: 0.64,
        },
        Insight {
            kind: InsightKind::Correlation,
            title: "Weak income link".to_owned(),
            description: "Income and balance barely correlate".to_owned(),
            metric: "corr".to_owned(),
            value: 0.18,
            significance: 0.3,
        },
        Insight {
            kind: InsightKind::Threshold,
            title: "Out-of-range score".to_owned(),
            description: "Server reported a score above one".to_owned(),
            metric: "default_rate".to_owned(),
            value: 0.031,
            significance: 1.4,
        },
    ]
}

/// An analysis payload covering every chart kind the dispatcher knows,
/// plus one unrecognized kind.
pub fn full_analysis() -> AnalysisPayload {
    let chart = |kind: ChartKind, title: &str| VisualizationConfig {
        kind,
        title: title.to_owned(),
        description: String::new(),
        x_column: "branch".to_owned(),
        y_column: Some("balance".to_owned()),
    };
    AnalysisPayload {
        insights: tiered_insights(),
        recommendations: vec![
            "Review account tiers at the Airport branch".to_owned(),
            "Schedule a quarterly balance audit".to_owned(),
        ],
        visualizations: vec![
            chart(ChartKind::Bar, "Balance by branch"),
            chart(ChartKind::Pie, "Balance share"),
            VisualizationConfig {
                kind: ChartKind::Histogram,
                title: "Balance distribution".to_owned(),
                description: String::new(),
                x_column: "balance".to_owned(),
                y_column: None,
            },
            chart(ChartKind::Unsupported, "Mystery chart"),
        ],
        statistical_summary: None,
        metadata: Some(AnalysisMetadata {
            analysis_type: "descriptive".to_owned(),
            row_count: 3,
            column_count: 2,
        }),
    }
}

pub fn assistant_message(id: i64, text: &str) -> ChatMessage {
    ChatMessage {
        id: MessageId::new(id),
        role: Role::Assistant,
        text: text.to_owned(),
        issued_query: Some("SELECT branch, balance FROM accounts".to_owned()),
        result: Some(balances_result()),
        analysis: None,
        created_at: fixture_timestamp(),
    }
}

pub fn analyzed_message(id: i64, text: &str) -> ChatMessage {
    ChatMessage {
        analysis: Some(full_analysis()),
        ..assistant_message(id, text)
    }
}

pub fn chat_exchange(id: i64, text: &str) -> ChatExchange {
    ChatExchange {
        session_key: SessionKey::new(FIXTURE_SESSION_KEY),
        message: assistant_message(id, text),
    }
}

pub fn database_stats() -> DatabaseStats {
    DatabaseStats {
        total_tables: 3,
        total_rows: 6704,
        tables: vec![
            TableOverview {
                table_name: "customers".to_owned(),
                row_count: 1204,
                description: "Bank customers".to_owned(),
            },
            TableOverview {
                table_name: "accounts".to_owned(),
                row_count: 5000,
                description: "Deposit accounts".to_owned(),
            },
            TableOverview {
                table_name: "loans".to_owned(),
                row_count: 500,
                description: "Active and closed loans".to_owned(),
            },
        ],
        relationships: vec![
            TableRelationship {
                from: "accounts".to_owned(),
                to: "customers".to_owned(),
                kind: "many-to-one".to_owned(),
            },
            TableRelationship {
                from: "loans".to_owned(),
                to: "customers".to_owned(),
                kind: "many-to-one".to_owned(),
            },
        ],
    }
}

pub fn business_metrics() -> BusinessMetrics {
    BusinessMetrics {
        groups: vec![
            MetricGroup {
                name: "customer_metrics".to_owned(),
                entries: vec![
                    MetricEntry {
                        name: "total_customers".to_owned(),
                        value: 1204.0,
                    },
                    MetricEntry {
                        name: "avg_credit_score".to_owned(),
                        value: 687.5,
                    },
                ],
            },
            MetricGroup {
                name: "loan_metrics".to_owned(),
                entries: vec![MetricEntry {
                    name: "default_rate".to_owned(),
                    value: 0.031,
                }],
            },
        ],
        calculated_at: fixture_timestamp(),
    }
}
