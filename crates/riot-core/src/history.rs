use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::state::ChatMessage;

/// Chat log kept on disk for the length of a login session.
///
/// Written whenever the log changes, read back on start-up, removed on
/// logout. The log itself is never sent to the AI.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| Error::Config("Could not determine cache directory".to_string()))?;

        Ok(Self::new(cache_dir.join("riot").join("chat_history.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file means no saved history
    pub fn load(&self) -> Option<Vec<ChatMessage>> {
        if !self.path.exists() {
            return None;
        }

        let loaded = fs::read_to_string(&self.path)
            .map_err(Error::from)
            .and_then(|content| serde_json::from_str::<Vec<ChatMessage>>(&content).map_err(Error::from));

        match loaded {
            Ok(messages) if !messages.is_empty() => Some(messages),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), "failed to load chat history: {}", err);
                None
            }
        }
    }

    pub fn save(&self, messages: &[ChatMessage]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string(messages)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GroundingSource;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("nested").join("chat.json"));
        assert!(store.load().is_none());

        let messages = vec![
            ChatMessage::greeting(),
            ChatMessage::user("Quantos animais em perigo?"),
            ChatMessage::assistant(
                "Um animal.",
                vec![GroundingSource { title: None, uri: "https://maps.example/1".to_string() }],
            ),
        ];
        store.save(&messages).unwrap();
        assert_eq!(store.load().unwrap(), messages);

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.json");
        fs::write(&path, "{not json").unwrap();
        assert!(HistoryStore::new(path).load().is_none());
    }
}
