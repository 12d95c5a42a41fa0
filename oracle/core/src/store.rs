//! Local Store
//!
//! Best-effort cache of personas, the active persona id and one conversation
//! history per persona. Absence is never an error: a first run simply reads
//! back empty lists and `None`.
//!
//! [`JsonFileStore`] keeps one JSON document per key under a data directory;
//! [`MemoryStore`] keeps everything in process (tests, `--data-dir` unset in
//! ephemeral runs).

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationHistory;
use crate::error::StoreError;
use crate::spirit::Persona;

/// Directory name under the platform data dir
const APP_DIR: &str = "mystifying-oracle";
const PERSONAS_FILE: &str = "personas.json";
const STATE_FILE: &str = "state.json";
const CONVERSATIONS_DIR: &str = "conversations";

/// Persistence for personas and conversations
#[async_trait]
pub trait OracleStore: Send + Sync {
    /// All known personas (empty on first run)
    async fn personas(&self) -> Result<Vec<Persona>, StoreError>;

    /// Replace the persona list
    async fn save_personas(&self, personas: &[Persona]) -> Result<(), StoreError>;

    /// Id of the persona in use, if any
    async fn active_persona_id(&self) -> Result<Option<String>, StoreError>;

    /// Record the persona in use
    async fn set_active_persona_id(&self, id: &str) -> Result<(), StoreError>;

    /// Conversation with a persona (empty if none)
    async fn conversation(&self, persona_id: &str) -> Result<ConversationHistory, StoreError>;

    /// Replace the conversation with a persona
    async fn save_conversation(
        &self,
        persona_id: &str,
        history: &ConversationHistory,
    ) -> Result<(), StoreError>;

    /// Forget the conversation with a persona
    async fn clear_conversation(&self, persona_id: &str) -> Result<(), StoreError>;
}

/// Small key-value document for app state
#[derive(Debug, Default, Serialize, Deserialize)]
struct AppState {
    #[serde(default)]
    active_persona_id: Option<String>,
}

/// File name for a persona id
///
/// ASCII letters, digits and `-` pass through; every other byte becomes
/// `_XX` in hex. `_` is the escape itself, so distinct ids never share a file.
fn file_stem(persona_id: &str) -> String {
    let mut stem = String::with_capacity(persona_id.len());
    for byte in persona_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{byte:02X}"));
        }
    }
    stem
}

/// Store backed by JSON files in a directory
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Store rooted at `root` (created lazily on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform default location (`$XDG_DATA_HOME/mystifying-oracle` on Linux)
    #[must_use]
    pub fn default_root() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join(APP_DIR))
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn conversation_path(&self, persona_id: &str) -> PathBuf {
        self.root
            .join(CONVERSATIONS_DIR)
            .join(format!("{}.json", file_stem(persona_id)))
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StoreError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Serde {
                key: path.display().to_string(),
                source,
            })
    }

    /// Write via a temp file and rename, so a crash never leaves half a file
    async fn write_json<T: Serialize + Sync>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serde {
            key: path.display().to_string(),
            source,
        })?;

        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl OracleStore for JsonFileStore {
    async fn personas(&self) -> Result<Vec<Persona>, StoreError> {
        Ok(self
            .read_json(&self.root.join(PERSONAS_FILE))
            .await?
            .unwrap_or_default())
    }

    async fn save_personas(&self, personas: &[Persona]) -> Result<(), StoreError> {
        self.write_json(&self.root.join(PERSONAS_FILE), &personas)
            .await
    }

    async fn active_persona_id(&self) -> Result<Option<String>, StoreError> {
        let state: Option<AppState> = self.read_json(&self.root.join(STATE_FILE)).await?;
        Ok(state.and_then(|s| s.active_persona_id))
    }

    async fn set_active_persona_id(&self, id: &str) -> Result<(), StoreError> {
        let state = AppState {
            active_persona_id: Some(id.to_string()),
        };
        self.write_json(&self.root.join(STATE_FILE), &state).await
    }

    async fn conversation(&self, persona_id: &str) -> Result<ConversationHistory, StoreError> {
        Ok(self
            .read_json(&self.conversation_path(persona_id))
            .await?
            .unwrap_or_default())
    }

    async fn save_conversation(
        &self,
        persona_id: &str,
        history: &ConversationHistory,
    ) -> Result<(), StoreError> {
        self.write_json(&self.conversation_path(persona_id), history)
            .await
    }

    async fn clear_conversation(&self, persona_id: &str) -> Result<(), StoreError> {
        let path = self.conversation_path(persona_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    personas: Vec<Persona>,
    active: Option<String>,
    conversations: HashMap<String, ConversationHistory>,
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// An empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OracleStore for MemoryStore {
    async fn personas(&self) -> Result<Vec<Persona>, StoreError> {
        Ok(self.state.read().personas.clone())
    }

    async fn save_personas(&self, personas: &[Persona]) -> Result<(), StoreError> {
        self.state.write().personas = personas.to_vec();
        Ok(())
    }

    async fn active_persona_id(&self) -> Result<Option<String>, StoreError> {
        Ok(self.state.read().active.clone())
    }

    async fn set_active_persona_id(&self, id: &str) -> Result<(), StoreError> {
        self.state.write().active = Some(id.to_string());
        Ok(())
    }

    async fn conversation(&self, persona_id: &str) -> Result<ConversationHistory, StoreError> {
        Ok(self
            .state
            .read()
            .conversations
            .get(persona_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_conversation(
        &self,
        persona_id: &str,
        history: &ConversationHistory,
    ) -> Result<(), StoreError> {
        self.state
            .write()
            .conversations
            .insert(persona_id.to_string(), history.clone());
        Ok(())
    }

    async fn clear_conversation(&self, persona_id: &str) -> Result<(), StoreError> {
        self.state.write().conversations.remove(persona_id);
        Ok(())
    }
}
