use super::{EmbeddingRecord, SearchHit};

/// Cosine similarity of two vectors. Zero-length or zero-norm inputs score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a[..len].iter().zip(&b[..len]) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator <= f32::EPSILON {
        0.0
    } else {
        dot / denominator
    }
}

/// Exhaustive scan returning the `k` nearest records.
///
/// The sort is stable, so equal similarities keep catalog insertion order.
pub(crate) fn nearest(query: &[f32], records: &[EmbeddingRecord], k: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = records
        .iter()
        .map(|record| SearchHit {
            item_id: record.item_id.clone(),
            similarity: cosine_similarity(query, &record.vector),
        })
        .collect();

    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    hits.truncate(k);
    hits
}
