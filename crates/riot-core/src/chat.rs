//! Conversation controller for the herd assistant.
//!
//! One question may be outstanding at a time. `send` appends the user
//! message, builds the fleet context from the current snapshot and spawns
//! the AI call; the reply (or a visible failure message) is merged back by
//! `poll_reply` / `wait_reply`. A second `send` while a call is in flight
//! is discarded, not queued.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::ai::{Assistant, AssistantReply};
use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::history::HistoryStore;
use crate::models::{Snapshot, UserLocation};
use crate::state::ChatMessage;
use crate::summarizer::build_context;

pub const FAILURE_TEXT: &str = "Ocorreu um erro ao buscar a resposta. Tente novamente.";
pub const TIMEOUT_TEXT: &str =
    "O assistente demorou demais para responder. Tente novamente em instantes.";
pub const MISSING_KEY_TEXT: &str =
    "Nenhuma chave da API do Gemini configurada. Carregue sua chave na aba Configurações para usar o assistente.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Sending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The AI call was started
    Dispatched,
    /// Blank question, nothing appended
    Empty,
    /// A previous question is still outstanding; this one was dropped
    Busy,
    /// No API key; answered locally without a network call
    MissingApiKey,
}

pub struct ChatSession {
    messages: Vec<ChatMessage>,
    pending: Option<JoinHandle<Result<AssistantReply>>>,
    assistant: Arc<dyn Assistant>,
    store: Option<HistoryStore>,
    timeout: Duration,
}

impl ChatSession {
    pub fn new(assistant: Arc<dyn Assistant>, timeout: Duration) -> Self {
        Self {
            messages: vec![ChatMessage::greeting()],
            pending: None,
            assistant,
            store: None,
            timeout,
        }
    }

    /// Attach a history store, restoring any log it holds
    pub fn with_store(mut self, store: HistoryStore) -> Self {
        if let Some(saved) = store.load() {
            tracing::info!(messages = saved.len(), "restored chat history");
            self.messages = saved;
        }
        self.store = Some(store);
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> SendState {
        if self.pending.is_some() {
            SendState::Sending
        } else {
            SendState::Idle
        }
    }

    pub fn is_sending(&self) -> bool {
        self.state() == SendState::Sending
    }

    pub fn send(
        &mut self,
        question: &str,
        snapshot: &Snapshot,
        selected_animal: Option<u32>,
        location: Option<UserLocation>,
        config: &GeminiConfig,
    ) -> SendOutcome {
        if question.trim().is_empty() {
            return SendOutcome::Empty;
        }
        if self.is_sending() {
            tracing::debug!("send ignored, a question is already in flight");
            return SendOutcome::Busy;
        }

        self.messages.push(ChatMessage::user(question));

        if !config.has_api_key() {
            self.messages.push(ChatMessage::assistant(MISSING_KEY_TEXT, Vec::new()));
            self.persist();
            return SendOutcome::MissingApiKey;
        }

        let selected = selected_animal.and_then(|id| snapshot.animal(id));
        let context = build_context(&snapshot.animals, &snapshot.herds, selected);

        let assistant = self.assistant.clone();
        let question = question.to_string();
        let config = config.clone();
        let timeout = self.timeout;

        tracing::info!(
            model = config.model.as_str(),
            selected = ?selected_animal,
            context_len = context.len(),
            "dispatching question"
        );

        self.pending = Some(tokio::spawn(async move {
            match tokio::time::timeout(timeout, assistant.ask(&question, &context, location, &config)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(timeout.as_secs())),
            }
        }));

        self.persist();
        SendOutcome::Dispatched
    }

    /// Merge the reply if the call has finished. Never blocks on the network.
    pub async fn poll_reply(&mut self) -> bool {
        let finished = self.pending.as_ref().map(|h| h.is_finished()).unwrap_or(false);
        if !finished {
            return false;
        }
        self.wait_reply().await
    }

    /// Wait for the outstanding call, if any, and merge its result
    pub async fn wait_reply(&mut self) -> bool {
        let Some(handle) = self.pending.take() else {
            return false;
        };

        let message = match handle.await {
            Ok(Ok(reply)) => {
                tracing::info!(sources = reply.sources.len(), "assistant replied");
                ChatMessage::assistant(reply.text, reply.sources)
            }
            Ok(Err(Error::Timeout(secs))) => {
                tracing::warn!(secs, "assistant call timed out");
                ChatMessage::assistant(TIMEOUT_TEXT, Vec::new())
            }
            Ok(Err(err)) => {
                tracing::error!("failed to get a response from Gemini: {}", err);
                ChatMessage::assistant(FAILURE_TEXT, Vec::new())
            }
            Err(err) => {
                tracing::error!("assistant task failed: {}", err);
                ChatMessage::assistant(FAILURE_TEXT, Vec::new())
            }
        };

        self.messages.push(message);
        self.persist();
        true
    }

    /// Drop any in-flight call, forget the conversation and its stored copy
    pub fn reset(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.messages = vec![ChatMessage::greeting()];
        if let Some(store) = &self.store {
            if let Err(err) = store.clear() {
                tracing::warn!("failed to clear chat history: {}", err);
            }
        }
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        // A lone greeting is the default state, nothing worth keeping
        if self.messages.len() == 1 && self.messages[0].is_greeting() {
            return;
        }
        if let Err(err) = store.save(&self.messages) {
            tracing::warn!("failed to save chat history: {}", err);
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
