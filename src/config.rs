use std::path::PathBuf;

use clap::Parser;

use crate::rag::prompt::DEFAULT_TOP_K;

/// Runtime configuration, from CLI flags or environment variables.
#[derive(Parser, Debug, Clone)]
#[command(name = "komath-chat")]
#[command(about = "Retrieval-augmented curriculum chat backend")]
pub struct AppConfig {
    /// Directory holding precomputed passage embedding batches
    #[arg(long, env = "EMBEDDING_DIR", default_value = "documents_embed")]
    pub corpus_dir: PathBuf,

    /// Plain-text file supplying the system message
    #[arg(long, env = "SYSTEM_MESSAGE_PATH", default_value = "system_message.txt")]
    pub system_message_path: PathBuf,

    /// Base URL of the OpenAI-compatible API
    #[arg(
        long,
        env = "OPENAI_API_BASE",
        default_value = "https://api.openai.com/v1"
    )]
    pub api_base: String,

    /// API key for the embeddings and chat endpoints
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Chat completion model
    #[arg(long, env = "CHAT_MODEL", default_value = "gpt-4")]
    pub chat_model: String,

    /// Embedding model; must match the model the corpus was embedded with
    #[arg(long, env = "EMBEDDING_MODEL", default_value = "text-embedding-ada-002")]
    pub embedding_model: String,

    /// Hex-encoded SHA-256 digest of the shared password
    #[arg(long, env = "PASSWORD_SHA256", hide_env_values = true)]
    pub password_sha256: String,

    /// Passages included in the grounded prompt
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Address to bind the HTTP server
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,
}
