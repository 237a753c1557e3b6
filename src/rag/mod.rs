pub mod corpus;
pub mod embeddings;
pub mod prompt;
pub mod ranker;

use crate::error::RetrievalError;
use crate::models::Message;

use self::corpus::Corpus;
use self::embeddings::EmbeddingClient;

/// Ties the retrieval pipeline together: embed the question, rank the corpus,
/// assemble the grounded message.
pub struct RagEngine {
    embeddings: EmbeddingClient,
    top_k: usize,
}

impl RagEngine {
    pub fn new(embeddings: EmbeddingClient, top_k: usize) -> Self {
        Self { embeddings, top_k }
    }

    /// Produces the grounded user message for one question. The corpus is
    /// borrowed read-only; per-query scores never outlive this call.
    pub async fn retrieve(
        &self,
        question: &str,
        corpus: &Corpus,
    ) -> Result<Message, RetrievalError> {
        let query = self.embeddings.embed(question).await?;
        let ranked = ranker::rank(&query, corpus)?;
        tracing::debug!(
            "ranked {} passages, grounding with top {}",
            ranked.len(),
            self.top_k.min(ranked.len())
        );
        Ok(prompt::assemble(question, &ranked, self.top_k))
    }
}
