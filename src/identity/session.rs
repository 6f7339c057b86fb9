use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::storage::{KeyValueStore, MemoryKvStore};

pub const TOKEN_KEY: &str = "token";
pub const TOKEN_TYPE_KEY: &str = "token_type";
const DEFAULT_TOKEN_TYPE: &str = "bearer";

/// Bearer credential issued by the backend on login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub token_type: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self { token: token.into(), token_type: token_type.into() }
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Single owner of the persisted credential.
///
/// Cloning yields another handle to the same backing store; every component that needs
/// the credential receives one of these explicitly.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self { Self { kv } }

    pub fn in_memory() -> Self { Self::new(Arc::new(MemoryKvStore::new())) }

    /// Persist both values, replacing any previous credential.
    pub fn set_credential(&self, token: &str, token_type: &str) -> AppResult<()> {
        self.kv.set(TOKEN_KEY, token).map_err(|e| AppError::Session(e.to_string()))?;
        self.kv.set(TOKEN_TYPE_KEY, token_type).map_err(|e| AppError::Session(e.to_string()))?;
        info!(target: "riskbase::session", "credential stored (type={})", token_type);
        Ok(())
    }

    /// Current credential, if any. Never fails.
    pub fn credential(&self) -> Option<Credential> {
        let token = self.kv.get(TOKEN_KEY).filter(|t| !t.is_empty())?;
        let token_type = self.kv.get(TOKEN_TYPE_KEY).filter(|t| !t.is_empty()).unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
        Some(Credential { token, token_type })
    }

    pub fn is_authenticated(&self) -> bool { self.credential().is_some() }

    /// Remove both persisted values (logout).
    pub fn clear(&self) -> AppResult<()> {
        self.kv.remove(TOKEN_KEY).map_err(|e| AppError::Session(e.to_string()))?;
        self.kv.remove(TOKEN_TYPE_KEY).map_err(|e| AppError::Session(e.to_string()))?;
        debug!(target: "riskbase::session", "credential cleared");
        Ok(())
    }
}
