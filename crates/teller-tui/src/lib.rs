// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use teller_analytics::{ChartData, SignificanceBar, SignificanceTier, build_chart, insight_icon};
use teller_app::ids::SessionKey;
use teller_app::model::{
    AnalysisPayload, BusinessMetrics, ChatMessage, DatabaseStats, Insight, Role, TabularResult,
    VisualizationConfig, format_grouped_number,
};
use teller_app::state::{ChatExchange, Conversation, ExchangeTag, OutboundExchange};
use time::OffsetDateTime;

const TRANSCRIPT_WINDOW: usize = 12;
const SIGNIFICANCE_BAR_WIDTH: usize = 10;
const HISTOGRAM_BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewTab {
    #[default]
    Chat,
    Query,
    Metrics,
}

impl ViewTab {
    pub const ALL: [Self; 3] = [Self::Chat, Self::Query, Self::Metrics];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Query => "query",
            Self::Metrics => "metrics",
        }
    }

    const fn next(self) -> Self {
        match self {
            Self::Chat => Self::Query,
            Self::Query => Self::Metrics,
            Self::Metrics => Self::Chat,
        }
    }
}

/// What the runtime returns for an analyze request: the executed
/// query's result plus the analytics computed over it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRun {
    pub query_result: TabularResult,
    pub analysis: AnalysisPayload,
    pub analysis_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    Chat {
        tag: ExchangeTag,
        outcome: std::result::Result<ChatExchange, String>,
    },
}

/// Transport seam between the UI and the warehouse copilot server.
/// Only chat runs off the event loop; the remaining operations are
/// quick enough to call inline.
pub trait Runtime {
    fn send_chat(&mut self, text: &str, session_key: &SessionKey) -> Result<ChatExchange>;
    fn fetch_session(&mut self, key: &SessionKey) -> Result<teller_app::model::Session>;
    fn execute_query(&mut self, query: &str) -> Result<TabularResult>;
    fn analyze_query(&mut self, query: &str, session_key: Option<&SessionKey>)
    -> Result<AnalysisRun>;
    fn database_stats(&mut self) -> Result<DatabaseStats>;
    fn business_metrics(&mut self) -> Result<BusinessMetrics>;
    fn spawn_chat(&mut self, exchange: &OutboundExchange, tx: Sender<InternalEvent>) -> Result<()> {
        let outcome = self
            .send_chat(&exchange.text, &exchange.session_key)
            .map_err(|error| error.to_string());
        tx.send(InternalEvent::Chat {
            tag: exchange.tag,
            outcome,
        })
        .map_err(|_| anyhow::anyhow!("chat event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ViewData {
    pub conversation: Conversation,
    active_tab: ViewTab,
    chat_input: String,
    show_sql: bool,
    query_input: String,
    query_result: Option<TabularResult>,
    analysis_run: Option<AnalysisRun>,
    stats: Option<DatabaseStats>,
    metrics: Option<BusinessMetrics>,
    status_line: Option<String>,
    status_token: u64,
}

impl ViewData {
    pub fn with_show_sql(show_sql: bool) -> Self {
        Self {
            show_sql,
            ..Self::default()
        }
    }

    const fn tab(&self) -> ViewTab {
        self.active_tab
    }
}

pub fn run_app<R: Runtime>(view: &mut ViewData, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (internal_tx, internal_rx) = mpsc::channel();

    let mut result = Ok(());
    loop {
        process_internal_events(view, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, view)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(view, runtime, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(view: &mut ViewData, tx: &Sender<InternalEvent>, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view.status_token => {
                view.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Chat { tag, outcome } => {
                handle_chat_event(view, tx, tag, outcome, OffsetDateTime::now_utc());
            }
        }
    }
}

fn handle_chat_event(
    view: &mut ViewData,
    tx: &Sender<InternalEvent>,
    tag: ExchangeTag,
    outcome: std::result::Result<ChatExchange, String>,
    now: OffsetDateTime,
) {
    use teller_app::state::ChatEvent;

    match outcome {
        Ok(exchange) => {
            view.conversation.apply_success(tag, exchange, now);
        }
        Err(error) => {
            let events = view.conversation.apply_failure(tag, &error, now);
            let discarded = events
                .iter()
                .all(|event| matches!(event, ChatEvent::StaleResponseDiscarded(_)));
            if !discarded {
                emit_status(view, tx, format!("chat failed: {error}"));
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(view: &mut ViewData, internal_tx: &Sender<InternalEvent>, message: impl Into<String>) {
    view.status_line = Some(message.into());
    view.status_token = view.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view.status_token);
}

fn handle_key_event<R: Runtime>(
    view: &mut ViewData,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if key.code == KeyCode::Tab {
        view.active_tab = view.active_tab.next();
        if view.tab() == ViewTab::Metrics && view.stats.is_none() && view.metrics.is_none() {
            refresh_metrics(view, runtime, internal_tx);
        }
        return false;
    }

    if key.code == KeyCode::Esc {
        if !view.conversation.dismiss_error().is_empty() {
            return false;
        }
        view.status_line = None;
        return false;
    }

    if key.code == KeyCode::Char('n') && key.modifiers.contains(KeyModifiers::CONTROL) {
        view.conversation.reset();
        emit_status(view, internal_tx, "new chat started");
        return false;
    }

    if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
        view.show_sql = !view.show_sql;
        let status = if view.show_sql { "sql shown" } else { "sql hidden" };
        emit_status(view, internal_tx, status);
        return false;
    }

    match view.tab() {
        ViewTab::Chat => handle_chat_key(view, runtime, internal_tx, key),
        ViewTab::Query => handle_query_key(view, runtime, internal_tx, key),
        ViewTab::Metrics => handle_metrics_key(view, runtime, internal_tx, key),
    }
    false
}

fn handle_chat_key<R: Runtime>(
    view: &mut ViewData,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
        reload_session(view, runtime, internal_tx);
        return;
    }

    match key.code {
        KeyCode::Enter => submit_chat_input(view, runtime, internal_tx),
        KeyCode::Backspace => {
            view.chat_input.pop();
        }
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            view.chat_input.push(c);
        }
        _ => {}
    }
}

fn submit_chat_input<R: Runtime>(
    view: &mut ViewData,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(outbound) = view
        .conversation
        .submit(&view.chat_input, OffsetDateTime::now_utc())
    else {
        return;
    };
    view.chat_input.clear();

    if let Err(error) = runtime.spawn_chat(&outbound, internal_tx.clone()) {
        // Settle the machine so the next submission is not blocked.
        view.conversation
            .apply_failure(outbound.tag, &error.to_string(), OffsetDateTime::now_utc());
        emit_status(view, internal_tx, format!("chat failed: {error}"));
    }
}

fn reload_session<R: Runtime>(
    view: &mut ViewData,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(key) = view.conversation.session().map(|session| session.key.clone()) else {
        emit_status(view, internal_tx, "no session to reload");
        return;
    };
    match runtime.fetch_session(&key) {
        Ok(session) => {
            if view.conversation.adopt(session).is_empty() {
                emit_status(view, internal_tx, "reload skipped: exchange in flight");
            } else {
                emit_status(view, internal_tx, "session reloaded");
            }
        }
        Err(error) => emit_status(view, internal_tx, format!("reload failed: {error}")),
    }
}

fn handle_query_key<R: Runtime>(
    view: &mut ViewData,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.code == KeyCode::Char('a') && key.modifiers.contains(KeyModifiers::CONTROL) {
        run_analysis(view, runtime, internal_tx);
        return;
    }

    match key.code {
        KeyCode::Enter => {
            let query = view.query_input.trim().to_owned();
            if query.is_empty() {
                return;
            }
            match runtime.execute_query(&query) {
                Ok(result) => {
                    view.query_result = Some(result);
                    view.analysis_run = None;
                }
                Err(error) => emit_status(view, internal_tx, format!("query failed: {error}")),
            }
        }
        KeyCode::Backspace => {
            view.query_input.pop();
        }
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            view.query_input.push(c);
        }
        _ => {}
    }
}

fn run_analysis<R: Runtime>(
    view: &mut ViewData,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
) {
    let query = view.query_input.trim().to_owned();
    if query.is_empty() {
        emit_status(view, internal_tx, "type a query to analyze");
        return;
    }
    let session_key = view
        .conversation
        .session()
        .map(|session| session.key.clone());
    match runtime.analyze_query(&query, session_key.as_ref()) {
        Ok(run) => {
            view.query_result = Some(run.query_result.clone());
            view.analysis_run = Some(run);
        }
        Err(error) => emit_status(view, internal_tx, format!("analysis failed: {error}")),
    }
}

fn handle_metrics_key<R: Runtime>(
    view: &mut ViewData,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.code == KeyCode::Char('r') || key.code == KeyCode::Enter {
        refresh_metrics(view, runtime, internal_tx);
    }
}

fn refresh_metrics<R: Runtime>(
    view: &mut ViewData,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
) {
    match runtime.database_stats() {
        Ok(stats) => view.stats = Some(stats),
        Err(error) => {
            emit_status(view, internal_tx, format!("stats failed: {error}"));
            return;
        }
    }
    match runtime.business_metrics() {
        Ok(metrics) => view.metrics = Some(metrics),
        Err(error) => emit_status(view, internal_tx, format!("metrics failed: {error}")),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, view: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let selected = ViewTab::ALL
        .iter()
        .position(|tab| *tab == view.tab())
        .unwrap_or(0);
    let tabs = Tabs::new(ViewTab::ALL.iter().map(|tab| tab.label().to_owned()))
        .block(Block::default().title("teller").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    let body_text = match view.tab() {
        ViewTab::Chat => render_chat_text(view),
        ViewTab::Query => render_query_text(view),
        ViewTab::Metrics => render_metrics_text(view),
    };
    let body = Paragraph::new(body_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(view.tab().label()),
    );
    frame.render_widget(body, layout[1]);

    let status = Paragraph::new(status_text(view))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);
}

/// Display classification for one tabular result: failed results show
/// only the error, zero-row results show a placeholder, truncated
/// results carry an advisory naming the transmitted row count.
#[derive(Debug, Clone, PartialEq)]
pub enum TableDisplay {
    Error(String),
    Empty,
    Table {
        header: String,
        rows: Vec<String>,
        advisory: Option<String>,
    },
}

pub fn table_display(result: &TabularResult) -> TableDisplay {
    if result.failed() {
        return TableDisplay::Error(
            result
                .error
                .clone()
                .unwrap_or_else(|| "query failed".to_owned()),
        );
    }
    if result.is_empty() {
        return TableDisplay::Empty;
    }

    let header = result.columns.join(" | ");
    let rows = result
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.display())
                .collect::<Vec<String>>()
                .join(" | ")
        })
        .collect::<Vec<String>>();
    let advisory = result
        .truncated
        .then(|| format!("showing {} rows (truncated)", result.rows.len()));

    TableDisplay::Table {
        header,
        rows,
        advisory,
    }
}

fn result_lines(result: &TabularResult) -> Vec<String> {
    match table_display(result) {
        TableDisplay::Error(error) => vec![format!("  error: {error}")],
        TableDisplay::Empty => vec!["  (no results)".to_owned()],
        TableDisplay::Table {
            header,
            rows,
            advisory,
        } => {
            let mut lines = Vec::with_capacity(rows.len() + 2);
            lines.push(format!("  {header}"));
            for row in rows {
                lines.push(format!("  {row}"));
            }
            if let Some(advisory) = advisory {
                lines.push(format!("  {advisory}"));
            }
            lines
        }
    }
}

pub fn insight_line(insight: &Insight) -> String {
    let tier = SignificanceTier::of(insight.significance);
    let bar = SignificanceBar::of(insight.significance);
    let filled = bar.filled(SIGNIFICANCE_BAR_WIDTH);
    let mut rendered = format!(
        "{} {} [{}] {}{}",
        insight_icon(insight.kind),
        insight.title,
        tier.as_str(),
        "█".repeat(filled),
        "░".repeat(SIGNIFICANCE_BAR_WIDTH - filled),
    );
    if bar.clamped {
        rendered.push_str(" (score out of range)");
    }
    rendered
}

fn chart_lines(config: &VisualizationConfig, result: &TabularResult) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", config.title, config.kind.as_str())];
    match build_chart(config, result) {
        ChartData::Series {
            x_column,
            y_column,
            points,
        } => {
            lines.push(format!("  {x_column} / {y_column}"));
            for point in points {
                lines.push(format!("  {}: {}", point.x.display(), point.y.display()));
            }
        }
        ChartData::Pie { slices } => {
            for slice in slices {
                lines.push(format!(
                    "  {} {} ({})",
                    slice.name,
                    format_grouped_number(slice.value),
                    slice.color
                ));
            }
        }
        ChartData::Histogram { buckets } => {
            let peak = buckets.iter().map(|bucket| bucket.count).max().unwrap_or(0);
            for bucket in buckets {
                let width = if peak == 0 {
                    0
                } else {
                    bucket.count * HISTOGRAM_BAR_WIDTH / peak
                };
                lines.push(format!(
                    "  {} |{} {}",
                    bucket.label,
                    "█".repeat(width),
                    bucket.count
                ));
            }
        }
        ChartData::NoNumericData => lines.push("  (no numeric data)".to_owned()),
        ChartData::Unsupported => lines.push("  (unsupported chart type)".to_owned()),
    }
    lines
}

fn analysis_lines(analysis: &AnalysisPayload, result: &TabularResult) -> Vec<String> {
    let mut lines = Vec::new();
    if !analysis.insights.is_empty() {
        lines.push("insights:".to_owned());
        for insight in &analysis.insights {
            lines.push(format!("  {}", insight_line(insight)));
            if !insight.description.is_empty() {
                lines.push(format!("    {}", insight.description));
            }
        }
    }
    for config in &analysis.visualizations {
        for line in chart_lines(config, result) {
            lines.push(line);
        }
    }
    if !analysis.recommendations.is_empty() {
        lines.push("recommendations:".to_owned());
        for recommendation in &analysis.recommendations {
            lines.push(format!("  - {recommendation}"));
        }
    }
    lines
}

fn message_lines(message: &ChatMessage, show_sql: bool) -> Vec<String> {
    let label = match message.role {
        Role::User => "you",
        Role::Assistant => "copilot",
        Role::System => "system",
    };
    let mut lines = vec![format!("{label}: {}", message.text)];
    if show_sql && let Some(query) = &message.issued_query {
        for segment in query.lines() {
            lines.push(format!("  sql: {segment}"));
        }
    }
    if let Some(result) = &message.result {
        lines.extend(result_lines(result));
        if let Some(analysis) = &message.analysis {
            for line in analysis_lines(analysis, result) {
                lines.push(format!("  {line}"));
            }
        }
    }
    lines
}

fn render_chat_text(view: &ViewData) -> String {
    let mut lines = Vec::new();

    if let Some(error) = view.conversation.banner_error() {
        lines.push(format!("! {error} (esc to dismiss)"));
        lines.push(String::new());
    }

    let session_label = view
        .conversation
        .session()
        .map(|session| session.key.as_str().to_owned())
        .unwrap_or_else(|| "none".to_owned());
    lines.push(format!(
        "session: {session_label} | sql: {}{}",
        if view.show_sql { "on" } else { "off" },
        if view.conversation.is_sending() {
            " | sending..."
        } else {
            ""
        }
    ));
    lines.push(String::new());

    let messages = view.conversation.messages();
    let keep = messages.len().saturating_sub(TRANSCRIPT_WINDOW);
    for message in messages.iter().skip(keep) {
        lines.extend(message_lines(message, view.show_sql));
    }
    if messages.is_empty() {
        lines.push("Ask the warehouse a question.".to_owned());
    }

    lines.push(String::new());
    lines.push(format!("> {}", view.chat_input));
    lines.join("\n")
}

fn render_query_text(view: &ViewData) -> String {
    let mut lines = vec![format!("sql> {}", view.query_input), String::new()];
    match &view.query_result {
        Some(result) => lines.extend(result_lines(result)),
        None => lines.push("Run a SELECT against the warehouse.".to_owned()),
    }
    if let (Some(run), Some(result)) = (&view.analysis_run, &view.query_result) {
        lines.push(String::new());
        lines.push(format!("analysis ({})", run.analysis_type));
        lines.extend(analysis_lines(&run.analysis, result));
    }
    lines.join("\n")
}

fn render_metrics_text(view: &ViewData) -> String {
    let mut lines = Vec::new();
    match &view.stats {
        Some(stats) => {
            lines.push(format!(
                "{} tables | {} rows",
                format_grouped_number(stats.total_tables as f64),
                format_grouped_number(stats.total_rows as f64)
            ));
            for table in &stats.tables {
                lines.push(format!(
                    "  {} ({} rows) -- {}",
                    table.table_name,
                    format_grouped_number(table.row_count as f64),
                    table.description
                ));
            }
            if !stats.relationships.is_empty() {
                lines.push("relationships:".to_owned());
                for relationship in &stats.relationships {
                    lines.push(format!(
                        "  {} -> {} ({})",
                        relationship.from, relationship.to, relationship.kind
                    ));
                }
            }
        }
        None => lines.push("press r to load database stats".to_owned()),
    }

    lines.push(String::new());
    match &view.metrics {
        Some(metrics) => {
            lines.push(format!("business metrics @ {}", metrics.calculated_at));
            for group in &metrics.groups {
                lines.push(format!("{}:", group.name));
                for entry in &group.entries {
                    lines.push(format!(
                        "  {}: {}",
                        entry.name,
                        format_grouped_number(entry.value)
                    ));
                }
            }
        }
        None => lines.push("press r to load business metrics".to_owned()),
    }
    lines.join("\n")
}

fn status_text(view: &ViewData) -> String {
    let hint = match view.tab() {
        ViewTab::Chat => "enter send | ctrl+n new | ctrl+s sql | ctrl+r sync | tab view | ctrl+q",
        ViewTab::Query => "enter run | ctrl+a analyze | tab view | ctrl+q",
        ViewTab::Metrics => "r refresh | tab view | ctrl+q",
    };
    match &view.status_line {
        Some(status) => format!("{status} | {hint}"),
        None => hint.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AnalysisRun, InternalEvent, Runtime, TableDisplay, ViewData, ViewTab, analysis_lines,
        chart_lines, handle_chat_event, handle_key_event, insight_line, message_lines,
        process_internal_events, refresh_metrics, render_chat_text, render_metrics_text,
        render_query_text, result_lines, status_text, submit_chat_input, table_display,
    };
    use anyhow::{Result, bail};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::sync::mpsc;
    use teller_app::ids::SessionKey;
    use teller_app::model::{ChartKind, Insight, InsightKind, Session, TabularResult, VisualizationConfig};
    use teller_app::state::ChatExchange;
    use time::OffsetDateTime;

    struct FakeRuntime {
        fail_chat: bool,
    }

    impl FakeRuntime {
        fn new() -> Self {
            Self { fail_chat: false }
        }
    }

    impl Runtime for FakeRuntime {
        fn send_chat(&mut self, text: &str, _session_key: &SessionKey) -> Result<ChatExchange> {
            if self.fail_chat {
                bail!("warehouse unreachable");
            }
            Ok(teller_testkit::chat_exchange(
                900,
                &format!("answer to {text:?}"),
            ))
        }

        fn fetch_session(&mut self, key: &SessionKey) -> Result<Session> {
            Ok(Session {
                key: key.clone(),
                created_at: teller_testkit::fixture_timestamp(),
                updated_at: teller_testkit::fixture_timestamp(),
                messages: vec![
                    teller_testkit::assistant_message(1, "restored a"),
                    teller_testkit::assistant_message(2, "restored b"),
                ],
            })
        }

        fn execute_query(&mut self, _query: &str) -> Result<TabularResult> {
            Ok(teller_testkit::truncated_result())
        }

        fn analyze_query(
            &mut self,
            _query: &str,
            _session_key: Option<&SessionKey>,
        ) -> Result<AnalysisRun> {
            Ok(AnalysisRun {
                query_result: teller_testkit::balances_result(),
                analysis: teller_testkit::full_analysis(),
                analysis_type: "descriptive".to_owned(),
            })
        }

        fn database_stats(&mut self) -> Result<teller_app::model::DatabaseStats> {
            Ok(teller_testkit::database_stats())
        }

        fn business_metrics(&mut self) -> Result<teller_app::model::BusinessMetrics> {
            Ok(teller_testkit::business_metrics())
        }
    }

    fn type_text(view: &mut ViewData, runtime: &mut FakeRuntime, tx: &mpsc::Sender<InternalEvent>, text: &str) {
        for c in text.chars() {
            handle_key_event(
                view,
                runtime,
                tx,
                KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE),
            );
        }
    }

    #[test]
    fn failed_result_renders_only_the_error() {
        let display = table_display(&teller_testkit::failed_result());
        assert_eq!(
            display,
            TableDisplay::Error("syntax error at line 1".to_owned())
        );
    }

    #[test]
    fn empty_result_renders_the_placeholder_not_a_table() {
        assert_eq!(table_display(&teller_testkit::empty_result()), TableDisplay::Empty);
        assert_eq!(
            result_lines(&teller_testkit::empty_result()),
            vec!["  (no results)".to_owned()]
        );
    }

    #[test]
    fn truncated_advisory_counts_transmitted_rows_not_logical() {
        match table_display(&teller_testkit::truncated_result()) {
            TableDisplay::Table { advisory, rows, .. } => {
                assert_eq!(rows.len(), 2);
                assert_eq!(advisory.as_deref(), Some("showing 2 rows (truncated)"));
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn cells_render_per_display_rules() {
        match table_display(&teller_testkit::mixed_cells_result()) {
            TableDisplay::Table { rows, .. } => {
                assert_eq!(rows[0], "alice | 1,204,500.75 | true | null");
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn insight_line_shows_icon_tier_and_bar() {
        let line = insight_line(&Insight {
            kind: InsightKind::Trend,
            title: "Balances rising".to_owned(),
            description: String::new(),
            metric: "avg".to_owned(),
            value: 1.0,
            significance: 0.92,
        });
        assert!(line.starts_with("📈 Balances rising [high]"));
        assert!(line.contains("█████████░"));
        assert!(!line.contains("out of range"));
    }

    #[test]
    fn clamped_insight_is_marked() {
        let line = insight_line(&Insight {
            kind: InsightKind::Threshold,
            title: "Odd score".to_owned(),
            description: String::new(),
            metric: "m".to_owned(),
            value: 1.0,
            significance: 1.4,
        });
        assert!(line.contains("(score out of range)"));
    }

    #[test]
    fn chart_placeholders_are_local_to_the_chart() {
        let config = VisualizationConfig {
            kind: ChartKind::Histogram,
            title: "Names".to_owned(),
            description: String::new(),
            x_column: "name".to_owned(),
            y_column: None,
        };
        let lines = chart_lines(&config, &teller_testkit::empty_result());
        assert!(lines.contains(&"  (no numeric data)".to_owned()));

        let unknown = VisualizationConfig {
            kind: ChartKind::Unsupported,
            ..config
        };
        let lines = chart_lines(&unknown, &teller_testkit::empty_result());
        assert!(lines.contains(&"  (unsupported chart type)".to_owned()));
    }

    #[test]
    fn analysis_renders_every_configured_chart() {
        let lines = analysis_lines(
            &teller_testkit::full_analysis(),
            &teller_testkit::balances_result(),
        );
        let text = lines.join("\n");
        assert!(text.contains("Balance by branch (bar)"));
        assert!(text.contains("Balance share (pie)"));
        assert!(text.contains("Balance distribution (histogram)"));
        assert!(text.contains("(unsupported chart type)"));
        assert!(text.contains("recommendations:"));
    }

    #[test]
    fn submit_round_trips_through_the_channel() {
        let mut view = ViewData::default();
        let mut runtime = FakeRuntime::new();
        let (tx, rx) = mpsc::channel();

        type_text(&mut view, &mut runtime, &tx, "How many customers?");
        handle_key_event(
            &mut view,
            &mut runtime,
            &tx,
            KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
        );

        assert_eq!(view.conversation.messages().len(), 1);
        assert!(view.conversation.is_sending());
        assert!(view.chat_input.is_empty());

        process_internal_events(&mut view, &tx, &rx);
        assert_eq!(view.conversation.messages().len(), 2);
        assert!(!view.conversation.is_sending());
        assert_eq!(
            view.conversation.session().map(|s| s.key.as_str()),
            Some(teller_testkit::FIXTURE_SESSION_KEY)
        );
    }

    #[test]
    fn failed_chat_raises_banner_and_status() {
        let mut view = ViewData::default();
        let mut runtime = FakeRuntime::new();
        runtime.fail_chat = true;
        let (tx, rx) = mpsc::channel();

        type_text(&mut view, &mut runtime, &tx, "hi");
        handle_key_event(
            &mut view,
            &mut runtime,
            &tx,
            KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
        );
        process_internal_events(&mut view, &tx, &rx);

        assert_eq!(view.conversation.banner_error(), Some("warehouse unreachable"));
        assert_eq!(view.conversation.messages().len(), 2);
        assert!(
            view.status_line
                .as_deref()
                .is_some_and(|status| status.contains("chat failed"))
        );

        let text = render_chat_text(&view);
        assert!(text.contains("! warehouse unreachable (esc to dismiss)"));
    }

    #[test]
    fn response_after_reset_leaves_the_view_empty() {
        let mut view = ViewData::default();
        let mut runtime = FakeRuntime::new();
        let (tx, rx) = mpsc::channel();

        submit_chat_input(&mut view, &mut runtime, &tx);
        type_text(&mut view, &mut runtime, &tx, "q");
        handle_key_event(
            &mut view,
            &mut runtime,
            &tx,
            KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
        );
        handle_key_event(
            &mut view,
            &mut runtime,
            &tx,
            KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL),
        );

        process_internal_events(&mut view, &tx, &rx);
        assert!(view.conversation.messages().is_empty());
        assert!(view.conversation.session().is_none());
    }

    #[test]
    fn stale_failure_does_not_touch_the_status_line() {
        let mut view = ViewData::default();
        let (tx, _rx) = mpsc::channel();

        let outbound = view
            .conversation
            .submit("q", OffsetDateTime::UNIX_EPOCH)
            .expect("submission accepted");
        view.conversation.reset();
        view.status_line = None;

        handle_chat_event(
            &mut view,
            &tx,
            outbound.tag,
            Err("late error".to_owned()),
            OffsetDateTime::UNIX_EPOCH,
        );
        assert!(view.status_line.is_none());
        assert!(view.conversation.banner_error().is_none());
    }

    #[test]
    fn tab_key_cycles_views_and_loads_metrics() {
        let mut view = ViewData::default();
        let mut runtime = FakeRuntime::new();
        let (tx, _rx) = mpsc::channel();

        assert_eq!(view.tab(), ViewTab::Chat);
        handle_key_event(
            &mut view,
            &mut runtime,
            &tx,
            KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE),
        );
        assert_eq!(view.tab(), ViewTab::Query);
        handle_key_event(
            &mut view,
            &mut runtime,
            &tx,
            KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE),
        );
        assert_eq!(view.tab(), ViewTab::Metrics);
        assert!(view.stats.is_some());
        assert!(view.metrics.is_some());
    }

    #[test]
    fn query_tab_runs_and_analyzes() {
        let mut view = ViewData::default();
        let mut runtime = FakeRuntime::new();
        let (tx, _rx) = mpsc::channel();
        view.active_tab = ViewTab::Query;

        type_text(&mut view, &mut runtime, &tx, "SELECT 1");
        handle_key_event(
            &mut view,
            &mut runtime,
            &tx,
            KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
        );
        assert!(view.query_result.as_ref().is_some_and(|r| r.truncated));

        handle_key_event(
            &mut view,
            &mut runtime,
            &tx,
            KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL),
        );
        let text = render_query_text(&view);
        assert!(text.contains("analysis (descriptive)"));
        assert!(text.contains("insights:"));
    }

    #[test]
    fn session_reload_replaces_the_transcript() {
        let mut view = ViewData::default();
        let mut runtime = FakeRuntime::new();
        let (tx, rx) = mpsc::channel();

        type_text(&mut view, &mut runtime, &tx, "hello");
        handle_key_event(
            &mut view,
            &mut runtime,
            &tx,
            KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
        );
        process_internal_events(&mut view, &tx, &rx);
        assert_eq!(view.conversation.messages().len(), 2);

        handle_key_event(
            &mut view,
            &mut runtime,
            &tx,
            KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL),
        );
        assert_eq!(view.conversation.messages().len(), 2);
        assert_eq!(view.conversation.messages()[0].text, "restored a");
        assert_eq!(view.status_line.as_deref(), Some("session reloaded"));
    }

    #[test]
    fn metrics_tab_renders_grouped_numbers() {
        let mut view = ViewData::default();
        let mut runtime = FakeRuntime::new();
        let (tx, _rx) = mpsc::channel();
        refresh_metrics(&mut view, &mut runtime, &tx);

        let text = render_metrics_text(&view);
        assert!(text.contains("3 tables | 6,704 rows"));
        assert!(text.contains("customers (1,204 rows)"));
        assert!(text.contains("accounts -> customers (many-to-one)"));
        assert!(text.contains("total_customers: 1,204"));
    }

    #[test]
    fn status_line_prepends_the_hint() {
        let mut view = ViewData::default();
        assert_eq!(
            status_text(&view),
            "enter send | ctrl+n new | ctrl+s sql | ctrl+r sync | tab view | ctrl+q"
        );
        view.status_line = Some("chat failed: boom".to_owned());
        assert!(status_text(&view).starts_with("chat failed: boom | "));
    }

    #[test]
    fn transcript_shows_sql_only_when_toggled() {
        let mut view = ViewData::default();
        let message = teller_testkit::assistant_message(5, "answer");
        let lines = message_lines(&message, false);
        assert!(!lines.iter().any(|line| line.contains("sql:")));
        let lines = message_lines(&message, true);
        assert!(
            lines
                .iter()
                .any(|line| line.contains("sql: SELECT branch, balance FROM accounts"))
        );

        view.show_sql = true;
        let text = render_chat_text(&view);
        assert!(text.contains("sql: on"));
    }

    #[test]
    fn analyzed_message_renders_insights_after_the_table() {
        let lines = message_lines(&teller_testkit::analyzed_message(5, "answer"), false);
        let table_at = lines
            .iter()
            .position(|line| line.contains("branch | balance"))
            .expect("result table rendered");
        let insights_at = lines
            .iter()
            .position(|line| line.contains("insights:"))
            .expect("analysis rendered");
        assert!(insights_at > table_at);
        assert!(lines[insights_at].starts_with("  "));
    }
}
