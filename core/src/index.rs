use crate::corpus::Document;
use crate::error::Result;
use crate::language::{Language, LanguageCatalog, StopwordSet};
use crate::tokenizer::{indexable_text, Analyzer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub type TermId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub min_n: usize,
    pub max_n: usize,
    /// Apply the language's Snowball stemmer to tokens before forming n-grams.
    pub stem: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { min_n: 1, max_n: 3, stem: false }
    }
}

/// Sparse vector with columns in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<TermId>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TermId, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    fn normalize(&mut self) {
        let norm = self.values.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in self.values.iter_mut() {
                *v /= norm;
            }
        }
    }
}

/// Frozen vocabulary and idf weights learned from one training corpus.
#[derive(Debug, Clone)]
pub struct TermWeightModel {
    terms: Vec<String>,
    vocabulary: HashMap<String, TermId>,
    idf: Vec<f64>,
    config: AnalyzerConfig,
    stopwords: Arc<StopwordSet>,
}

impl TermWeightModel {
    /// Fit on pre-analyzed documents. Columns follow lexicographic term order.
    fn fit(analyzed: &[Vec<String>], config: AnalyzerConfig, stopwords: Arc<StopwordSet>) -> Self {
        let mut df: BTreeMap<&str, u32> = BTreeMap::new();
        for terms in analyzed {
            let mut seen: Vec<&str> = terms.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let n = analyzed.len() as f64;
        let terms: Vec<String> = df.keys().map(|t| t.to_string()).collect();
        let idf = df.values().map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0).collect();
        Self::from_parts(terms, idf, config, stopwords)
    }

    /// Reassemble a model from persisted parts; callers validate ordering first.
    pub(crate) fn from_parts(terms: Vec<String>, idf: Vec<f64>, config: AnalyzerConfig, stopwords: Arc<StopwordSet>) -> Self {
        let vocabulary = terms.iter().enumerate().map(|(i, t)| (t.clone(), i as TermId)).collect();
        Self { terms, vocabulary, idf, config, stopwords }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn stopwords(&self) -> &StopwordSet {
        &self.stopwords
    }

    pub fn column(&self, term: &str) -> Option<TermId> {
        self.vocabulary.get(term).copied()
    }

    /// Sublinear tf times idf, L2-normalized. Out-of-vocabulary terms are ignored.
    pub fn weigh(&self, terms: &[String]) -> SparseVector {
        let mut counts: BTreeMap<TermId, u32> = BTreeMap::new();
        for term in terms {
            if let Some(col) = self.column(term) {
                *counts.entry(col).or_insert(0) += 1;
            }
        }
        let mut vector = SparseVector { indices: Vec::with_capacity(counts.len()), values: Vec::with_capacity(counts.len()) };
        for (col, tf_raw) in counts {
            let tf = if tf_raw > 0 { 1.0 + (tf_raw as f64).ln() } else { 0.0 };
            vector.indices.push(col);
            vector.values.push(tf * self.idf[col as usize]);
        }
        vector.normalize();
        vector
    }
}

/// One L2-normalized sparse row per training document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentVectorMatrix {
    rows: Vec<SparseVector>,
    n_cols: usize,
}

impl DocumentVectorMatrix {
    pub(crate) fn from_rows(rows: Vec<SparseVector>, n_cols: usize) -> Self {
        Self { rows, n_cols }
    }

    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn nnz(&self) -> usize {
        self.rows.iter().map(SparseVector::nnz).sum()
    }
}

/// Searchable structure for one language: model, matrix and the documents they describe.
#[derive(Debug, Clone)]
pub struct Index {
    language: Language,
    model: TermWeightModel,
    matrix: DocumentVectorMatrix,
    documents: Vec<Document>,
}

impl Index {
    pub fn build(documents: Vec<Document>, language: Language, catalog: &LanguageCatalog) -> Result<Self> {
        Self::build_with_config(documents, language, catalog, AnalyzerConfig::default())
    }

    pub fn build_with_config(
        documents: Vec<Document>,
        language: Language,
        catalog: &LanguageCatalog,
        config: AnalyzerConfig,
    ) -> Result<Self> {
        let stopwords = catalog.stopwords(&language)?;
        let analyzer = Analyzer::new(&config, &stopwords, language.stemmer());
        let analyzed: Vec<Vec<String>> = documents
            .iter()
            .map(|d| analyzer.analyze(&indexable_text(&d.subject, &d.body)))
            .collect();

        let model = TermWeightModel::fit(&analyzed, config, stopwords.clone());
        let rows = analyzed.iter().map(|terms| model.weigh(terms)).collect();
        let matrix = DocumentVectorMatrix::from_rows(rows, model.len());

        tracing::info!(
            language = language.name,
            num_docs = documents.len(),
            num_terms = model.len(),
            nnz = matrix.nnz(),
            "built index"
        );
        Ok(Self { language, model, matrix, documents })
    }

    pub(crate) fn from_parts(language: Language, model: TermWeightModel, matrix: DocumentVectorMatrix, documents: Vec<Document>) -> Self {
        Self { language, model, matrix, documents }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn model(&self) -> &TermWeightModel {
        &self.model
    }

    pub fn matrix(&self) -> &DocumentVectorMatrix {
        &self.matrix
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Project arbitrary text into this index's vector space.
    pub fn vectorize(&self, text: &str) -> SparseVector {
        let analyzer = Analyzer::new(&self.model.config, &self.model.stopwords, self.language.stemmer());
        self.model.weigh(&analyzer.analyze(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, subject: &str, body: &str) -> Document {
        Document {
            id: id.into(),
            subject: subject.into(),
            body: body.into(),
            answer: String::new(),
            language: "en".into(),
        }
    }

    #[test]
    fn smoothed_idf_and_sorted_vocabulary() {
        let catalog = LanguageCatalog::default();
        let en = catalog.resolve("en").unwrap();
        let docs = vec![doc("1", "printer", "jammed"), doc("2", "printer", "offline")];
        let index = Index::build(docs, en, &catalog).unwrap();
        let model = index.model();

        let mut sorted = model.terms().to_vec();
        sorted.sort();
        assert_eq!(model.terms(), sorted.as_slice());

        let printer = model.column("printer").unwrap() as usize;
        let jammed = model.column("jammed").unwrap() as usize;
        assert!((model.idf()[printer] - 1.0).abs() < 1e-12);
        assert!((model.idf()[jammed] - ((3.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
        assert_eq!(index.matrix().n_rows(), 2);
        assert_eq!(index.matrix().n_cols(), model.len());
    }

    #[test]
    fn rows_are_unit_length() {
        let catalog = LanguageCatalog::default();
        let en = catalog.resolve("en").unwrap();
        let docs = vec![doc("1", "vpn drops", "vpn drops every hour"), doc("2", "the", "and of")];
        let index = Index::build(docs, en, &catalog).unwrap();
        let first = &index.matrix().rows()[0];
        assert!((first.dot(first) - 1.0).abs() < 1e-12);
        assert!(index.matrix().rows()[1].is_empty());
    }

    #[test]
    fn sparse_dot_merges_on_columns() {
        let a = SparseVector { indices: vec![0, 2, 5], values: vec![1.0, 2.0, 3.0] };
        let b = SparseVector { indices: vec![2, 3, 5], values: vec![4.0, 1.0, 0.5] };
        assert!((a.dot(&b) - 9.5).abs() < 1e-12);
    }
}
