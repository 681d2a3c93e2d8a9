use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::{ChatError, ChatResult};

/// Who produced a turn
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// File attached to a user turn, kept as a data URI so it can be re-displayed
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub data_url: String,
    pub mime_type: String,
    pub is_image: bool,
}

/// One entry of the conversation log
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Turn {
    pub fn user(text: String, attachment: Option<Attachment>) -> Self {
        Self {
            role: Role::User,
            text,
            attachment,
            timestamp: Some(Utc::now()),
        }
    }

    /// Model turns never carry attachments.
    pub fn model(text: String) -> Self {
        Self {
            role: Role::Model,
            text,
            attachment: None,
            timestamp: Some(Utc::now()),
        }
    }
}

/// Persisted conversation log: a single JSON file holding the ordered turns.
///
/// Every write replaces the whole file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the persisted log. A missing or unreadable file yields an
    /// empty log; parse errors are logged and swallowed.
    pub fn load(&self) -> Vec<Turn> {
        let json_str = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(_) => {
                debug!(path = %self.path.display(), "No history file, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Turn>>(&json_str) {
            Ok(turns) => {
                debug!(path = %self.path.display(), turns = turns.len(), "Loaded history");
                turns
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt history file");
                Vec::new()
            }
        }
    }

    /// Overwrites the persisted log with `turns`.
    pub fn save(&self, turns: &[Turn]) -> ChatResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ChatError::Storage(format!("Failed to create history directory: {}", e))
                })?;
            }
        }

        let json_str = serde_json::to_string(turns)?;
        fs::write(&self.path, json_str)
            .map_err(|e| ChatError::Storage(format!("Failed to write history file: {}", e)))?;
        debug!(path = %self.path.display(), turns = turns.len(), "Saved history");
        Ok(())
    }

    pub fn clear(&self) -> ChatResult<()> {
        self.save(&[])
    }

    /// Load, push one turn, save. Returns the new log length.
    pub fn append(&self, turn: Turn) -> ChatResult<usize> {
        let mut turns = self.load();
        turns.push(turn);
        self.save(&turns)?;
        Ok(turns.len())
    }
}

/// Default history location: `<data dir>/chatbot/history.json`
pub fn default_history_path() -> ChatResult<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ChatError::Config("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("chatbot").join("history.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_log() -> Vec<Turn> {
        vec![
            Turn::user(
                "what is this?".to_string(),
                Some(Attachment {
                    file_name: "notes.txt".to_string(),
                    data_url: "data:text/plain;base64,aGk=".to_string(),
                    mime_type: "text/plain".to_string(),
                    is_image: false,
                }),
            ),
            Turn::model("A **text** file.".to_string()),
        ]
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{not json").unwrap();
        assert!(HistoryStore::new(path).load().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nested").join("history.json"));

        store.save(&[]).unwrap();
        assert_eq!(store.load(), Vec::<Turn>::new());

        let log = sample_log();
        store.save(&log).unwrap();
        assert_eq!(store.load(), log);
    }

    #[test]
    fn clear_empties_log() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        store.save(&sample_log()).unwrap();

        store.clear().unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn append_preserves_order() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        assert_eq!(store.append(Turn::user("one".into(), None)).unwrap(), 1);
        assert_eq!(store.append(Turn::model("two".into())).unwrap(), 2);

        let texts: Vec<_> = store.load().into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn turns_without_timestamp_still_parse() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, r#"[{"role":"user","text":"hi"},{"role":"model","text":"yo"}]"#).unwrap();

        let log = HistoryStore::new(path).load();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].role, Role::User);
        assert_eq!(log[1].role, Role::Model);
        assert!(log[0].timestamp.is_none());
    }
}
