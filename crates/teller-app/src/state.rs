// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::OffsetDateTime;

use crate::ids::{MessageId, SessionKey};
use crate::model::{ChatMessage, Role, Session};

/// Generation counter for outbound exchanges. A response is applied only
/// if its tag still matches the live in-flight exchange, so responses
/// arriving after `reset` (or after a newer submit) are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeTag(u64);

impl ExchangeTag {
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationPhase {
    Idle,
    Sending,
}

/// The request handed to the transport when a submission is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundExchange {
    pub tag: ExchangeTag,
    pub text: String,
    pub session_key: SessionKey,
}

/// Successful server reply to one exchange: the (possibly new)
/// session identifier and the assistant message to append verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatExchange {
    pub session_key: SessionKey,
    pub message: ChatMessage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    MessageAppended(MessageId),
    SessionStarted(SessionKey),
    BannerRaised(String),
    BannerCleared,
    Cleared,
    SessionRestored(SessionKey),
    StaleResponseDiscarded(ExchangeTag),
}

/// One conversation with the warehouse: the append-only message list,
/// the lazily bound session, and the single-exchange lifecycle.
///
/// All mutation goes through `submit`, `apply_success`, `apply_failure`,
/// `reset`, and `dismiss_error`.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    session: Option<Session>,
    messages: Vec<ChatMessage>,
    banner_error: Option<String>,
    phase: ConversationPhase,
    in_flight: Option<ExchangeTag>,
    next_tag: u64,
    next_local_id: i64,
}

impl Default for Conversation {
    fn default() -> Self {
        Self {
            session: None,
            messages: Vec::new(),
            banner_error: None,
            phase: ConversationPhase::Idle,
            in_flight: None,
            next_tag: 0,
            next_local_id: 1,
        }
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn banner_error(&self) -> Option<&str> {
        self.banner_error.as_deref()
    }

    pub const fn phase(&self) -> ConversationPhase {
        self.phase
    }

    pub const fn is_sending(&self) -> bool {
        matches!(self.phase, ConversationPhase::Sending)
    }

    /// Accepts a submission unless the trimmed text is empty or an
    /// exchange is already in flight. On acceptance the user message is
    /// echoed locally before any network effect and the outbound request
    /// is returned for the transport to carry.
    pub fn submit(&mut self, text: &str, now: OffsetDateTime) -> Option<OutboundExchange> {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.is_sending() {
            return None;
        }

        let id = self.local_id();
        self.append(ChatMessage {
            id,
            role: Role::User,
            text: trimmed.to_owned(),
            issued_query: None,
            result: None,
            analysis: None,
            created_at: now,
        });

        let session_key = match &self.session {
            Some(session) => session.key.clone(),
            None => SessionKey::fresh(),
        };

        self.next_tag += 1;
        let tag = ExchangeTag(self.next_tag);
        self.in_flight = Some(tag);
        self.phase = ConversationPhase::Sending;

        Some(OutboundExchange {
            tag,
            text: trimmed.to_owned(),
            session_key,
        })
    }

    /// Applies a successful reply: binds the session on first success and
    /// appends the assistant message verbatim. Stale tags are discarded.
    pub fn apply_success(
        &mut self,
        tag: ExchangeTag,
        exchange: ChatExchange,
        now: OffsetDateTime,
    ) -> Vec<ChatEvent> {
        if self.in_flight != Some(tag) {
            return vec![ChatEvent::StaleResponseDiscarded(tag)];
        }
        self.in_flight = None;
        self.phase = ConversationPhase::Idle;

        let mut events = Vec::new();
        match &mut self.session {
            Some(session) => session.updated_at = now,
            None => {
                self.session = Some(Session {
                    key: exchange.session_key.clone(),
                    created_at: now,
                    updated_at: now,
                    messages: Vec::new(),
                });
                events.push(ChatEvent::SessionStarted(exchange.session_key));
            }
        }

        events.push(ChatEvent::MessageAppended(exchange.message.id));
        self.messages.push(exchange.message);
        events
    }

    /// Applies a failed reply: synthesizes a system message embedding the
    /// error and raises the dismissible banner. Stale tags are discarded.
    pub fn apply_failure(
        &mut self,
        tag: ExchangeTag,
        error: &str,
        now: OffsetDateTime,
    ) -> Vec<ChatEvent> {
        if self.in_flight != Some(tag) {
            return vec![ChatEvent::StaleResponseDiscarded(tag)];
        }
        self.in_flight = None;
        self.phase = ConversationPhase::Idle;

        let id = self.local_id();
        self.append(ChatMessage {
            id,
            role: Role::System,
            text: format!("Error: {error}"),
            issued_query: None,
            result: None,
            analysis: None,
            created_at: now,
        });
        self.banner_error = Some(error.to_owned());

        vec![
            ChatEvent::MessageAppended(id),
            ChatEvent::BannerRaised(error.to_owned()),
        ]
    }

    /// Starts a new chat: discards the session, the message list, and any
    /// banner. An in-flight response arriving afterwards no longer
    /// matches a live tag and is discarded on arrival.
    pub fn reset(&mut self) -> Vec<ChatEvent> {
        self.session = None;
        self.messages.clear();
        self.banner_error = None;
        self.in_flight = None;
        self.phase = ConversationPhase::Idle;
        vec![ChatEvent::Cleared]
    }

    /// Replaces the local record with a session fetched from the server.
    /// Ignored while an exchange is in flight so the reload cannot race
    /// a pending reply.
    pub fn adopt(&mut self, mut session: Session) -> Vec<ChatEvent> {
        if self.is_sending() {
            return Vec::new();
        }
        self.messages = std::mem::take(&mut session.messages);
        self.banner_error = None;
        let key = session.key.clone();
        self.session = Some(session);
        vec![ChatEvent::SessionRestored(key)]
    }

    /// Clears only the banner; the conversational record stays intact.
    pub fn dismiss_error(&mut self) -> Vec<ChatEvent> {
        if self.banner_error.take().is_some() {
            vec![ChatEvent::BannerCleared]
        } else {
            Vec::new()
        }
    }

    fn local_id(&mut self) -> MessageId {
        let id = MessageId::new(self.next_local_id);
        self.next_local_id += 1;
        id
    }

    fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }
}
