use domain::models::{Embedding, ScoredChunk};

pub struct SearchEngine;

impl SearchEngine {
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        let similarity = dot_product / (norm_a * norm_b);
        // Overflowing norms give inf/inf; such vectors never outrank a real score.
        if similarity.is_finite() {
            similarity
        } else {
            0.0
        }
    }

    /// Top `top_k` entries by descending cosine similarity. Equal scores keep
    /// storage order, so results are stable for a fixed index and query.
    pub fn find_relevant_chunks(
        query_embedding: &[f32],
        embeddings: &[Embedding],
        top_k: usize,
    ) -> Vec<ScoredChunk> {
        let mut similarities: Vec<(f32, &Embedding)> = embeddings
            .iter()
            .map(|emb| (Self::cosine_similarity(query_embedding, &emb.vector), emb))
            .collect();

        // Stable sort; scores are always finite.
        similarities.sort_by(|a, b| b.0.total_cmp(&a.0));
        similarities
            .into_iter()
            .take(top_k)
            .map(|(score, emb)| ScoredChunk {
                chunk: emb.chunk.clone(),
                score,
            })
            .collect()
    }
}
