use rag_vector_store::Document;
use serde::Serialize;
use std::collections::HashSet;

/// Distinct lowercase whitespace-separated words of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerms {
    terms: Vec<String>,
}

impl QueryTerms {
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let mut seen = HashSet::new();
        let terms = query
            .to_lowercase()
            .split_whitespace()
            .filter(|word| seen.insert(word.to_string()))
            .map(str::to_string)
            .collect();
        Self { terms }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Fraction of terms occurring in `text` (case-insensitive substring
    /// match); 0 for an empty query.
    #[must_use]
    pub fn score(&self, text: &str) -> f64 {
        if self.terms.is_empty() {
            return 0.0;
        }
        let haystack = text.to_lowercase();
        let matches = self
            .terms
            .iter()
            .filter(|term| haystack.contains(term.as_str()))
            .count();
        matches as f64 / self.terms.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordHit {
    pub row: usize,
    pub document: Document,
    pub score: f64,
}

/// Score every document and keep the best `k`, ties in store order.
///
/// Linear in the corpus size.
pub fn keyword_search<'a>(
    query: &str,
    documents: impl Iterator<Item = &'a Document>,
    k: usize,
) -> Vec<KeywordHit> {
    let terms = QueryTerms::parse(query);
    let mut hits: Vec<KeywordHit> = documents
        .enumerate()
        .map(|(row, document)| KeywordHit {
            row,
            score: terms.score(&document.text),
            document: document.clone(),
        })
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.row.cmp(&b.row)));
    hits.truncate(k);
    hits
}
