use crate::error::DimensionMismatchError;
use crate::models::ScoredPassage;

use super::corpus::Corpus;

/// Scores `1 - cosine_distance` between two equal-length vectors.
///
/// A zero-magnitude vector makes cosine distance undefined; that case scores
/// 0.0 so NaN never reaches the sort or the assembled prompt.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Scores every corpus record against `query` and returns them in descending
/// similarity order.
///
/// The sort is stable, so equal scores keep their corpus order. The corpus
/// itself is never mutated; scores live only in the returned passages.
pub fn rank<'a>(
    query: &[f32],
    corpus: &'a Corpus,
) -> Result<Vec<ScoredPassage<'a>>, DimensionMismatchError> {
    if let Some(dimension) = corpus.dimension() {
        if query.len() != dimension {
            return Err(DimensionMismatchError {
                query: query.len(),
                corpus: dimension,
            });
        }
    }

    let mut scored: Vec<ScoredPassage<'a>> = corpus
        .records()
        .iter()
        .map(|record| ScoredPassage {
            record,
            similarity: cosine_similarity(query, &record.embedding),
        })
        .collect();
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    Ok(scored)
}
