use rag_vector_store::{Document, Metadata, RetrievalResult};
use serde::Serialize;

/// A document adjacent to a retrieved result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextNeighbor {
    pub row: usize,
    pub document: Document,
}

/// Retrieved result enriched with its same-source neighbours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextualResult {
    pub row: usize,
    pub document: Document,
    pub score: f64,
    pub context: Vec<ContextNeighbor>,
}

/// Neighbours of the document at row `target`, whose metadata is `anchor`:
/// same `source`, position (page, else chunk id) within `window`, the target
/// row itself excluded.
///
/// Neighbours come back in store order, at most `2 * window` of them. This
/// is a full scan of the corpus, so expanding `r` results costs
/// O(r × corpus size).
pub fn neighbors<'a>(
    target: usize,
    anchor: &Metadata,
    documents: impl Iterator<Item = &'a Document>,
    window: usize,
) -> Vec<ContextNeighbor> {
    let Some(source) = anchor.source() else {
        return Vec::new();
    };
    let position = anchor.position();
    let radius = u64::try_from(window).unwrap_or(u64::MAX);

    documents
        .enumerate()
        .filter(|(row, doc)| {
            *row != target
                && doc.metadata.source() == Some(source)
                && doc.metadata.position().abs_diff(position) <= radius
        })
        .take(window.saturating_mul(2))
        .map(|(row, doc)| ContextNeighbor {
            row,
            document: doc.clone(),
        })
        .collect()
}

/// Attach neighbours to every result, scanning `documents` once per result.
pub fn expand<'a, I>(
    results: Vec<RetrievalResult>,
    documents: I,
    window: usize,
) -> Vec<ContextualResult>
where
    I: Iterator<Item = &'a Document> + Clone,
{
    results
        .into_iter()
        .map(|result| {
            let context =
                neighbors(result.row, &result.document.metadata, documents.clone(), window);
            log::debug!("Row {} expanded with {} neighbours", result.row, context.len());
            ContextualResult {
                row: result.row,
                document: result.document,
                score: result.score,
                context,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(text: &str, source: &str, page: i64) -> Document {
        Document::new(text, Metadata::new().with("source", source).with("page", page))
    }

    fn corpus() -> Vec<Document> {
        vec![
            doc("a1", "A", 1),
            doc("a2", "A", 2),
            doc("a5", "A", 5),
            doc("b1", "B", 1),
        ]
    }

    #[test]
    fn window_keeps_same_source_and_nearby_pages() {
        let docs = corpus();
        let found = neighbors(0, &docs[0].metadata, docs.iter(), 1);
        let texts: Vec<&str> = found.iter().map(|n| n.document.text.as_str()).collect();
        assert_eq!(texts, vec!["a2"]);
        assert_eq!(found[0].row, 1);
    }

    #[test]
    fn identical_duplicate_is_not_mistaken_for_target() {
        let mut docs = corpus();
        docs.push(doc("a1", "A", 1));
        let found = neighbors(0, &docs[0].metadata, docs.iter(), 1);
        let rows: Vec<usize> = found.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![1, 4]);
    }

    #[test]
    fn neighbours_capped_at_twice_window() {
        let docs: Vec<Document> = (0..6).map(|_| doc("x", "A", 3)).collect();
        let found = neighbors(0, &docs[0].metadata, docs.iter(), 1);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].row, 1);
    }

    #[test]
    fn zero_window_yields_nothing() {
        let docs = corpus();
        assert!(neighbors(0, &docs[0].metadata, docs.iter(), 0).is_empty());
    }

    #[test]
    fn missing_source_yields_nothing() {
        let docs = vec![Document::text("loose"), Document::text("other")];
        assert!(neighbors(0, &docs[0].metadata, docs.iter(), 3).is_empty());
    }

    #[test]
    fn chunk_id_used_when_page_missing() {
        let docs = vec![
            Document::new("c0", Metadata::new().with("source", "S").with("chunk_id", 0)),
            Document::new("c1", Metadata::new().with("source", "S").with("chunk_id", 1)),
            Document::new("c4", Metadata::new().with("source", "S").with("chunk_id", 4)),
        ];
        let found = neighbors(1, &docs[1].metadata, docs.iter(), 1);
        let texts: Vec<&str> = found.iter().map(|n| n.document.text.as_str()).collect();
        assert_eq!(texts, vec!["c0"]);
    }

    #[test]
    fn expand_uses_each_result_as_anchor() {
        let docs = corpus();
        let results = vec![
            RetrievalResult {
                row: 1,
                document: docs[1].clone(),
                score: 0.0,
            },
            RetrievalResult {
                row: 3,
                document: docs[3].clone(),
                score: 0.5,
            },
        ];
        let expanded = expand(results, docs.iter(), 1);
        let rows: Vec<Vec<usize>> = expanded
            .iter()
            .map(|result| result.context.iter().map(|n| n.row).collect())
            .collect();
        assert_eq!(rows, vec![vec![0], vec![]]);
    }
}
