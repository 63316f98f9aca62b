//! Brute-force cosine similarity ranking.

use serde::{Deserialize, Serialize};

use crate::eid::Eid;

/// A book eligible for scoring.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub id: &'a Eid,
    pub title: &'a str,
    pub embedding: Option<&'a [f32]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredResult {
    pub book_id: Eid,
    /// Cosine similarity in [-1.0, 1.0]
    pub score: f64,
    pub title: String,
}

/// Cosine similarity of two vectors.
///
/// Absent vectors, mismatched lengths and zero norms all score 0.0.
pub fn cosine_similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_finite() {
        score.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Scores every candidate against `query` and keeps the best `limit`.
///
/// Sorting is stable: equal scores stay in candidate order.
pub fn rank<'a, I>(query: &[f32], candidates: I, limit: usize) -> Vec<ScoredResult>
where
    I: IntoIterator<Item = Candidate<'a>>,
{
    let mut results: Vec<ScoredResult> = candidates
        .into_iter()
        .map(|candidate| ScoredResult {
            score: cosine_similarity(Some(query), candidate.embedding),
            book_id: candidate.id.clone(),
            title: candidate.title.to_string(),
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    results.truncate(limit);
    results
}
