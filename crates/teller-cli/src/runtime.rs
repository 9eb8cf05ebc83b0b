// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::sync::mpsc::Sender;
use std::thread;
use teller_api::Client;
use teller_app::ids::SessionKey;
use teller_app::model::{BusinessMetrics, DatabaseStats, Session, TabularResult};
use teller_app::state::{ChatExchange, OutboundExchange};
use teller_tui::{AnalysisRun, InternalEvent, Runtime};

/// Runtime backed by the HTTP client. Chat runs on its own thread so
/// the event loop keeps drawing while a reply is in flight; the
/// remaining operations are short blocking calls.
pub struct ApiRuntime {
    client: Client,
}

impl ApiRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Runtime for ApiRuntime {
    fn send_chat(&mut self, text: &str, session_key: &SessionKey) -> Result<ChatExchange> {
        self.client.send_chat(text, session_key)
    }

    fn fetch_session(&mut self, key: &SessionKey) -> Result<Session> {
        self.client.fetch_session(key)
    }

    fn execute_query(&mut self, query: &str) -> Result<TabularResult> {
        self.client.execute_query(query)
    }

    fn analyze_query(
        &mut self,
        query: &str,
        session_key: Option<&SessionKey>,
    ) -> Result<AnalysisRun> {
        let outcome = self.client.analyze_data(query, None, session_key)?;
        Ok(AnalysisRun {
            query_result: outcome.query_result,
            analysis: outcome.analysis,
            analysis_type: outcome.analysis_type,
        })
    }

    fn database_stats(&mut self) -> Result<DatabaseStats> {
        self.client.database_stats()
    }

    fn business_metrics(&mut self) -> Result<BusinessMetrics> {
        self.client.business_metrics()
    }

    fn spawn_chat(&mut self, exchange: &OutboundExchange, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        let exchange = exchange.clone();
        thread::spawn(move || {
            let outcome = client
                .send_chat(&exchange.text, &exchange.session_key)
                .map_err(|error| error.to_string());
            let _ = tx.send(InternalEvent::Chat {
                tag: exchange.tag,
                outcome,
            });
        });
        Ok(())
    }
}
