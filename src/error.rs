use std::path::PathBuf;

use thiserror::Error;

/// Corpus or primer storage failures. Fatal: session startup (or the first
/// retrieval) aborts, there is nothing the end user can answer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("corpus directory {path} is unreadable: {source}")]
    DirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("batch file {path} is unreadable: {source}")]
    BatchUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("batch file {path} failed to deserialize: {source}")]
    BatchCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("record {index} has a {found}-dimensional embedding, expected {expected}")]
    InconsistentDimensions {
        index: usize,
        found: usize,
        expected: usize,
    },
    #[error("system primer {path} is unreadable: {source}")]
    PrimerUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Embedding endpoint failures. Transient: the turn fails but history keeps
/// the question, so the user can retry it.
#[derive(Debug, Error)]
pub enum EmbeddingServiceError {
    #[error("embeddings request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("embeddings endpoint returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("embeddings response contained no vector")]
    EmptyResponse,
}

/// Chat-completion endpoint failures, same retry semantics as
/// [`EmbeddingServiceError`].
#[derive(Debug, Error)]
pub enum ChatServiceError {
    #[error("chat completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chat endpoint returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed stream event: {0}")]
    MalformedChunk(#[from] serde_json::Error),
}

/// Query and corpus embeddings disagree on dimensionality. The embedding
/// model no longer matches the precomputed corpus; fatal configuration error.
#[derive(Debug, Error)]
#[error("query embedding has {query} dimensions but corpus records have {corpus}")]
pub struct DimensionMismatchError {
    pub query: usize,
    pub corpus: usize,
}

/// Wrong shared secret. Reported inline; retries are unlimited.
#[derive(Debug, Error)]
#[error("password verification failed")]
pub struct AuthenticationFailure;

/// Failure of the retrieval half of a turn.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingServiceError),
    #[error(transparent)]
    Dimension(#[from] DimensionMismatchError),
}
