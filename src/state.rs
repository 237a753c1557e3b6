use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tokio::sync::Mutex;

use crate::auth::AuthState;
use crate::config::AppConfig;
use crate::error::StorageError;
use crate::rag::corpus::Corpus;
use crate::session::ConversationSession;

/// Per-process chat session state, passed by reference into every handler.
///
/// The corpus loads lazily on the first retrieval and stays cached for the
/// process lifetime; the conversation history and auth flag are serialized
/// behind their own locks.
pub struct SessionState {
    auth: Mutex<AuthState>,
    session: Mutex<ConversationSession>,
    corpus: OnceCell<Corpus>,
    corpus_dir: PathBuf,
}

impl SessionState {
    /// Reads the system primer and seeds the two-message history.
    pub fn init(config: &AppConfig) -> Result<Self, StorageError> {
        let primer = std::fs::read_to_string(&config.system_message_path).map_err(|source| {
            StorageError::PrimerUnreadable {
                path: config.system_message_path.clone(),
                source,
            }
        })?;

        Ok(Self {
            auth: Mutex::new(AuthState::Unauthenticated),
            session: Mutex::new(ConversationSession::initialize(&primer)),
            corpus: OnceCell::new(),
            corpus_dir: config.corpus_dir.clone(),
        })
    }

    pub async fn is_authenticated(&self) -> bool {
        *self.auth.lock().await == AuthState::Authenticated
    }

    pub async fn mark_authenticated(&self) {
        *self.auth.lock().await = AuthState::Authenticated;
    }

    pub fn session(&self) -> &Mutex<ConversationSession> {
        &self.session
    }

    /// The shared read-only corpus, loading it on first use. At most one load
    /// happens per process; later calls return the cached collection.
    pub fn corpus(&self) -> Result<&Corpus, StorageError> {
        self.corpus.get_or_try_init(|| Corpus::load(&self.corpus_dir))
    }
}
