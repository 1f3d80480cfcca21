pub mod ai;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod poller;
pub mod session;
pub mod state;
pub mod summarizer;
pub mod telemetry;

// Re-export main types for convenience
pub use ai::{Assistant, AssistantReply, GeminiClient, GeminiModel};
pub use auth::{AuthGate, LoginError};
pub use chat::{ChatSession, SendOutcome, SendState};
pub use config::{Config, GeminiConfig, GeminiConfigUpdate};
pub use error::{Error, Result};
pub use history::HistoryStore;
pub use models::{Animal, AnimalStatus, Herd, Snapshot, UserLocation};
pub use poller::{FeedState, Poller};
pub use session::Session;
pub use state::{ChatMessage, ChatRole, GroundingSource};
pub use telemetry::{SnapshotSource, TelemetryClient};
