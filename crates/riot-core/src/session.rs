//! Per-user dashboard session: login state, current selection, AI settings
//! and the chat conversation, with logout resetting all of it.

use crate::auth::{AuthGate, LoginError};
use crate::chat::{ChatSession, SendOutcome};
use crate::config::{GeminiConfig, GeminiConfigUpdate};
use crate::models::{Animal, Snapshot, UserLocation};

pub struct Session {
    gate: AuthGate,
    pub chat: ChatSession,
    gemini: GeminiConfig,
    selected_animal: Option<u32>,
    location: Option<UserLocation>,
}

impl Session {
    pub fn new(
        gate: AuthGate,
        chat: ChatSession,
        gemini: GeminiConfig,
        location: Option<UserLocation>,
    ) -> Self {
        Self {
            gate,
            chat,
            gemini,
            selected_animal: None,
            location,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.gate.is_authenticated()
    }

    pub fn login(&mut self, password: &str) -> Result<(), LoginError> {
        self.gate.login(password)
    }

    /// Clear the conversation, drop the selection and lock the dashboard
    pub fn logout(&mut self) {
        self.gate.logout();
        self.selected_animal = None;
        self.chat.reset();
        tracing::info!("logged out");
    }

    pub fn gemini(&self) -> &GeminiConfig {
        &self.gemini
    }

    pub fn update_gemini(&mut self, update: GeminiConfigUpdate) {
        self.gemini = self.gemini.update(update);
    }

    pub fn location(&self) -> Option<UserLocation> {
        self.location
    }

    pub fn selected_animal_id(&self) -> Option<u32> {
        self.selected_animal
    }

    /// The selection looked up in `snapshot`; `None` if the animal vanished
    pub fn selected_animal<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a Animal> {
        self.selected_animal.and_then(|id| snapshot.animal(id))
    }

    pub fn select_animal(&mut self, id: u32) {
        self.selected_animal = Some(id);
    }

    pub fn deselect_animal(&mut self) {
        self.selected_animal = None;
    }

    pub fn ask(&mut self, question: &str, snapshot: &Snapshot) -> SendOutcome {
        self.chat.send(
            question,
            snapshot,
            self.selected_animal,
            self.location,
            &self.gemini,
        )
    }
}
