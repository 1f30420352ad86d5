use crate::corpus::{Document, Query};
use crate::error::{Error, Result};
use crate::index::Index;
use crate::tokenizer::indexable_text;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub document: Document,
    /// Cosine similarity in `[0, 1]`.
    pub score: f64,
    /// Row of the matched document in the index's training order.
    pub row: usize,
}

/// Find the training document most similar to `query`.
///
/// Ties go to the earliest row. A query with no in-vocabulary terms scores
/// 0.0 against every row and therefore resolves to row 0.
pub fn search(query: &Query, index: &Index) -> Result<MatchResult> {
    if index.is_empty() {
        return Err(Error::EmptyIndex(index.language().name.to_string()));
    }

    let q = index.vectorize(&indexable_text(&query.subject, &query.body));
    let (mut best_row, mut best_score) = (0usize, 0.0f64);
    if !q.is_empty() {
        for (i, row) in index.matrix().rows().iter().enumerate() {
            let score = q.dot(row);
            if score > best_score {
                best_row = i;
                best_score = score;
            }
        }
    }
    tracing::debug!(language = index.language().name, terms = q.nnz(), best_row, best_score, "search");

    Ok(MatchResult {
        document: index.documents()[best_row].clone(),
        score: best_score.clamp(0.0, 1.0),
        row: best_row,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageCatalog;

    fn doc(id: &str, body: &str) -> Document {
        Document { id: id.into(), subject: String::new(), body: body.into(), answer: String::new(), language: "en".into() }
    }

    #[test]
    fn ties_go_to_earliest_row() {
        let catalog = LanguageCatalog::default();
        let en = catalog.resolve("en").unwrap();
        let index = Index::build(vec![doc("a", "reset password"), doc("b", "reset password")], en, &catalog).unwrap();
        let hit = search(&Query::new("", "password reset", "en"), &index).unwrap();
        assert_eq!(hit.document.id, "a");
        assert_eq!(hit.row, 0);
    }

    #[test]
    fn empty_index_is_an_error() {
        let catalog = LanguageCatalog::default();
        let en = catalog.resolve("en").unwrap();
        let index = Index::build(Vec::new(), en, &catalog).unwrap();
        assert!(matches!(search(&Query::new("x", "y", "en"), &index), Err(Error::EmptyIndex(_))));
    }
}
