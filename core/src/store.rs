//! Per-language index registry with load-or-build orchestration.

use crate::corpus::{Document, Query};
use crate::error::{Error, Result};
use crate::index::{AnalyzerConfig, Index};
use crate::language::{Language, LanguageCatalog};
use crate::persist::{self, IndexPaths};
use crate::search::{self, MatchResult};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Outcome of [`IndexStore::materialize`].
#[derive(Debug, Default)]
pub struct Materialized {
    /// Registered indices keyed by language code.
    pub indices: BTreeMap<&'static str, Arc<Index>>,
    /// Requested languages that had no documents in the corpus.
    pub skipped: Vec<Language>,
}

pub struct IndexStore {
    catalog: Arc<LanguageCatalog>,
    paths: IndexPaths,
    config: AnalyzerConfig,
    indices: RwLock<Vec<Arc<Index>>>,
    build_guard: Mutex<()>,
}

impl IndexStore {
    pub fn new<P: AsRef<Path>>(catalog: Arc<LanguageCatalog>, storage: P) -> Self {
        Self::with_config(catalog, storage, AnalyzerConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(catalog: Arc<LanguageCatalog>, storage: P, config: AnalyzerConfig) -> Self {
        Self {
            catalog,
            paths: IndexPaths::new(storage),
            config,
            indices: RwLock::new(Vec::new()),
            build_guard: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &LanguageCatalog {
        &self.catalog
    }

    pub fn paths(&self) -> &IndexPaths {
        &self.paths
    }

    /// Load or build an index for every requested language that has documents.
    ///
    /// An empty request or `["all"]` means every catalog language. All
    /// identifiers are resolved before any work starts.
    pub fn materialize<S: AsRef<str>>(
        &self,
        requested: &[S],
        documents: &BTreeMap<String, Vec<Document>>,
        rebuild: bool,
    ) -> Result<Materialized> {
        let languages = self.resolve_request(requested)?;
        let _guard = self.build_guard.lock();

        let mut out = Materialized::default();
        for language in languages {
            let docs = match documents.get(language.code) {
                Some(docs) if !docs.is_empty() => docs,
                _ => {
                    tracing::warn!(language = language.name, "no documents found for language, skipping");
                    out.skipped.push(language);
                    continue;
                }
            };
            let index = Arc::new(self.load_or_build(language, docs, rebuild)?);
            self.register(index.clone());
            out.indices.insert(language.code, index);
        }
        Ok(out)
    }

    fn resolve_request<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<Language>> {
        let all = requested.is_empty() || (requested.len() == 1 && requested[0].as_ref() == "all");
        if all {
            return Ok(self.catalog.languages().to_vec());
        }
        let mut languages: Vec<Language> = Vec::with_capacity(requested.len());
        for id in requested {
            let language = self.catalog.resolve(id.as_ref())?;
            if !languages.contains(&language) {
                languages.push(language);
            }
        }
        Ok(languages)
    }

    fn load_or_build(&self, language: Language, docs: &[Document], rebuild: bool) -> Result<Index> {
        if !rebuild {
            match persist::load(&self.paths, language, docs.to_vec()) {
                Ok(index) if index.model().config() == &self.config => return Ok(index),
                Ok(index) => {
                    tracing::warn!(
                        language = language.name,
                        persisted = ?index.model().config(),
                        configured = ?self.config,
                        "persisted index uses different analyzer settings, rebuilding"
                    );
                }
                Err(Error::NotFound(what)) => {
                    tracing::info!(language = language.name, %what, "no persisted index, building");
                }
                Err(Error::StaleArtifact { path, reason }) => {
                    tracing::warn!(language = language.name, path = %path.display(), %reason, "persisted index is stale, rebuilding");
                }
                Err(e) => return Err(e),
            }
        }
        let index = Index::build_with_config(docs.to_vec(), language, &self.catalog, self.config.clone())?;
        persist::save(&index, &self.paths)?;
        Ok(index)
    }

    /// Swap in `index` for its language, or append it if the language is new.
    fn register(&self, index: Arc<Index>) {
        let mut indices = self.indices.write();
        match indices.iter_mut().find(|i| i.language() == index.language()) {
            Some(slot) => *slot = index,
            None => indices.push(index),
        }
    }

    /// Force a fresh build for one language and swap it in once it is complete.
    pub fn rebuild(&self, identifier: &str, documents: Vec<Document>) -> Result<Arc<Index>> {
        let language = self.catalog.resolve(identifier)?;
        let _guard = self.build_guard.lock();
        let index = Arc::new(Index::build_with_config(documents, language, &self.catalog, self.config.clone())?);
        persist::save(&index, &self.paths)?;
        self.register(index.clone());
        Ok(index)
    }

    pub fn lookup(&self, identifier: &str) -> Result<Arc<Index>> {
        let language = self.catalog.resolve(identifier)?;
        self.indices
            .read()
            .iter()
            .find(|i| i.language() == language)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no index for language '{}'", language.name)))
    }

    /// Names of indexed languages in registration order.
    pub fn active_languages(&self) -> Vec<String> {
        self.indices.read().iter().map(|i| i.language().name.to_string()).collect()
    }

    pub fn search(&self, query: &Query) -> Result<MatchResult> {
        let index = self.lookup(&query.language)?;
        search::search(query, &index)
    }
}
