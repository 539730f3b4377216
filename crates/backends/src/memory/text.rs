//! Lexical search for the in-memory engine
//!
//! Tokenizer pipeline: UAX#29 word boundaries, strip possessives, drop
//! non-alphanumerics, lowercase, drop tokens shorter than 2 chars, drop
//! stopwords. Scoring is BM25 over the documents being searched.

use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// Lucene's default English stopwords
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

#[inline]
fn strip_possessive(word: &str) -> &str {
    word.strip_suffix("'s")
        .or_else(|| word.strip_suffix("\u{2019}s"))
        .unwrap_or(word)
}

/// Split text into searchable terms
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(strip_possessive)
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .map(|w| w.to_lowercase())
        .filter(|s| s.chars().count() >= 2)
        .filter(|s| !STOPWORDS.contains(&s.as_str()))
        .collect()
}

/// Tokenize and deduplicate, keeping first-seen order
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// BM25 scorer
///
/// For each query term t:
/// `score += IDF(t) * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * dl/avgdl))`
/// with `IDF(t) = ln((N - df + 0.5) / (df + 0.5) + 1)`.
#[derive(Debug, Clone, Copy)]
pub struct Bm25 {
    k1: f32,
    b: f32,
}

impl Default for Bm25 {
    fn default() -> Self {
        Bm25 { k1: 1.2, b: 0.75 }
    }
}

impl Bm25 {
    /// Scorer with custom parameters
    pub fn new(k1: f32, b: f32) -> Self {
        Bm25 { k1, b }
    }

    /// Score every document against `query`
    ///
    /// Returns one score per input document, in input order. Documents
    /// sharing no term with the query score 0.
    pub fn score_all(&self, query: &str, documents: &[&str]) -> Vec<f32> {
        let query_terms = tokenize_unique(query);
        if query_terms.is_empty() || documents.is_empty() {
            return vec![0.0; documents.len()];
        }

        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d)).collect();
        let total_docs = tokenized.len() as f32;
        let avg_len = (tokenized.iter().map(Vec::len).sum::<usize>() as f32 / total_docs).max(1.0);

        let mut doc_freqs: HashMap<&str, usize> = HashMap::new();
        for terms in &tokenized {
            let unique: HashSet<&str> = terms.iter().map(String::as_str).collect();
            for term in unique {
                *doc_freqs.entry(term).or_insert(0) += 1;
            }
        }

        tokenized
            .iter()
            .map(|terms| {
                let doc_len = terms.len() as f32;
                let mut counts: HashMap<&str, usize> = HashMap::new();
                for term in terms {
                    *counts.entry(term.as_str()).or_insert(0) += 1;
                }

                query_terms
                    .iter()
                    .filter_map(|q| {
                        let tf = *counts.get(q.as_str())? as f32;
                        let df = doc_freqs.get(q.as_str()).copied().unwrap_or(0) as f32;
                        let idf = ((total_docs - df + 0.5) / (df + 0.5) + 1.0).ln();
                        let tf_component = (tf * (self.k1 + 1.0))
                            / (tf + self.k1 * (1.0 - self.b + self.b * doc_len / avg_len));
                        Some(idf * tf_component)
                    })
                    .sum()
            })
            .collect()
    }
}
