//! Chat panel session state

use crate::error::{ChatError, Result};
use crate::news::NewsSource;
use crate::transport::ChatTransport;
use crate::types::{ChatReply, ChatRequest, ChatTurn, NewsDoc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Whether the next turn bootstraps or continues a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionMode {
    /// No server session yet; the next turn ships the documents
    NoSession,
    /// Server session established; turns only carry the session id
    ActiveSession,
}

/// Conversation as last reported by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatSessionState {
    pub session_id: Option<String>,
    pub turns: Vec<ChatTurn>,
}

impl ChatSessionState {
    pub fn mode(&self) -> SessionMode {
        if self.session_id.is_some() {
            SessionMode::ActiveSession
        } else {
            SessionMode::NoSession
        }
    }
}

/// What a turn is about and what it can be grounded on
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    pub token: String,
    pub available_docs: Vec<NewsDoc>,
}

impl ChatContext {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            available_docs: Vec::new(),
        }
    }

    pub fn with_docs(mut self, docs: Vec<NewsDoc>) -> Self {
        self.available_docs = docs;
        self
    }

    /// Context seeded with the latest documents for `token`
    pub async fn from_news(source: &dyn NewsSource, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let docs = source.fetch_docs(&token).await?;
        Ok(Self::new(token).with_docs(docs))
    }
}

#[derive(Debug, Default)]
struct PanelState {
    session: ChatSessionState,
    draft: String,
    error: Option<String>,
}

/// Releases the in-flight flag on drop, including when the send future is cancelled
struct SendGuard<'a>(&'a AtomicBool);

impl<'a> SendGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State behind one chat panel
///
/// Starts in [`SessionMode::NoSession`] and moves to
/// [`SessionMode::ActiveSession`] after the first successful reply, for good.
/// At most one send is in flight; overlapping sends are rejected with
/// [`ChatError::Busy`] and change nothing.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    state: Mutex<PanelState>,
    sending: AtomicBool,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            state: Mutex::new(PanelState::default()),
            sending: AtomicBool::new(false),
        }
    }

    fn panel(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ChatSessionState {
        self.panel().session.clone()
    }

    pub fn mode(&self) -> SessionMode {
        self.panel().session.mode()
    }

    pub fn history(&self) -> Vec<ChatTurn> {
        self.panel().session.turns.clone()
    }

    /// Last failure of a send, cleared when the next send starts
    pub fn error(&self) -> Option<String> {
        self.panel().error.clone()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    /// Session id prefix for display ("5f0c" for "5f0c-11-...")
    pub fn short_session_id(&self) -> Option<String> {
        self.panel()
            .session
            .session_id
            .as_deref()
            .and_then(|id| id.split('-').next())
            .map(str::to_string)
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.panel().draft = text.into();
    }

    pub fn draft(&self) -> String {
        self.panel().draft.clone()
    }

    /// Whether the draft could be sent with `docs` as grounding
    pub fn can_submit(&self, docs: &[NewsDoc]) -> bool {
        let panel = self.panel();
        !panel.draft.trim().is_empty()
            && (panel.session.session_id.is_some() || !docs.is_empty())
            && !self.is_sending()
    }

    /// Send the current draft, clearing it only on success
    pub async fn submit(&self, ctx: &ChatContext) -> Result<ChatReply> {
        let draft = self.draft();
        self.send(&draft, ctx).await
    }

    /// Send one user turn
    ///
    /// Bootstraps with `ctx.available_docs` when no session exists, otherwise
    /// continues by session id only. A draft holding the sent text is cleared
    /// on success. On failure the session and draft are unchanged and the
    /// error is recorded for display.
    pub async fn send(&self, message: &str, ctx: &ChatContext) -> Result<ChatReply> {
        let Some(_guard) = SendGuard::acquire(&self.sending) else {
            debug!("chat send ignored, another send is in flight");
            return Err(ChatError::Busy);
        };

        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::Precondition("Message must not be empty".to_string()));
        }

        let session_id = self.panel().session.session_id.clone();
        if session_id.is_none() && ctx.available_docs.is_empty() {
            return Err(ChatError::Precondition(
                "No news context available to start a conversation".to_string(),
            ));
        }

        self.panel().error = None;

        let docs = match session_id {
            Some(_) => None,
            None => Some(ctx.available_docs.clone()),
        };
        let request = ChatRequest {
            token: ctx.token.clone(),
            message: message.to_string(),
            session_id,
            docs,
        };

        match self.transport.send(request).await {
            Ok(reply) => {
                let mut panel = self.panel();
                if panel.session.session_id.is_none() {
                    info!(session = %reply.session_id, token = %ctx.token, "chat session established");
                }
                panel.session.session_id = Some(reply.session_id.clone());
                panel.session.turns = reply.history.clone();
                if panel.draft.trim() == message {
                    panel.draft.clear();
                }
                Ok(reply)
            },
            Err(e) => {
                warn!(error = %e, token = %ctx.token, "chat send failed");
                self.panel().error = Some(e.to_string());
                Err(e)
            },
        }
    }
}
