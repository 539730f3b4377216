//! Score normalization and ranking
//!
//! Every adapter funnels raw engine hits through [`rank`] so that scoring,
//! thresholding and ordering are identical across backends:
//!
//! 1. Convert the engine's native number into a similarity score
//!    (higher = more similar).
//! 2. Keep only hits with `score > score_threshold` (strict).
//! 3. Inject `metadata["score"]`.
//! 4. Stable sort by score descending; ties keep engine order.
//! 5. Truncate to `top_k`.

use crate::document::{Document, SCORE_KEY};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Distance metric reported by an engine
///
/// Determines how a raw distance becomes a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine distance `1 - cos(a, b)`, range [0, 2]
    /// Score: `1 - d`, range [-1, 1]
    #[default]
    Cosine,

    /// L2 distance, range [0, inf)
    /// Score: `1 / (1 + d)`, range (0, 1]
    Euclidean,

    /// Negated inner product, unbounded
    /// Score: `-d`, unbounded. Only meaningful for normalized vectors.
    DotProduct,
}

impl DistanceMetric {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::DotProduct => "dot_product",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(DistanceMetric::Cosine),
            "euclidean" | "l2" => Some(DistanceMetric::Euclidean),
            "dot_product" | "dot" | "ip" | "inner_product" => Some(DistanceMetric::DotProduct),
            _ => None,
        }
    }

    /// Whether scores produced by this metric fall in a fixed range
    pub fn is_bounded(&self) -> bool {
        !matches!(self, DistanceMetric::DotProduct)
    }

    /// Convert a raw distance into a similarity score
    pub fn score_from_distance(&self, distance: f64) -> f64 {
        match self {
            DistanceMetric::Cosine => 1.0 - distance,
            DistanceMetric::Euclidean => 1.0 / (1.0 + distance.max(0.0)),
            DistanceMetric::DotProduct => -distance,
        }
    }
}

/// A raw hit before thresholding
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Document as returned by the engine (no score yet)
    pub document: Document,
    /// Similarity score (higher = more similar)
    pub score: f64,
}

impl Candidate {
    /// Build a candidate from an engine distance
    pub fn from_distance(document: Document, distance: f64, metric: DistanceMetric) -> Self {
        Candidate {
            document,
            score: metric.score_from_distance(distance),
        }
    }

    /// Build a candidate from an engine-native similarity
    pub fn from_similarity(document: Document, score: f64) -> Self {
        Candidate { document, score }
    }
}

/// Threshold, annotate, order and truncate candidates
///
/// Candidates with `score <= score_threshold` or a NaN score are dropped.
pub fn rank(
    candidates: impl IntoIterator<Item = Candidate>,
    score_threshold: f64,
    top_k: usize,
) -> Vec<Document> {
    let mut kept: Vec<(f64, Document)> = candidates
        .into_iter()
        .filter(|c| c.score > score_threshold)
        .map(|Candidate { mut document, score }| {
            document.metadata.insert(SCORE_KEY.to_string(), score.into());
            (score, document)
        })
        .collect();

    // sort_by is stable: equal scores keep engine order
    kept.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    kept.truncate(top_k);
    kept.into_iter().map(|(_, d)| d).collect()
}
