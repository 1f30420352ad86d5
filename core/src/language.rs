//! Supported languages and their stopword lists.
//!
//! The language table is fixed; stopwords come from a [`StopwordSource`] and
//! are cached per catalog instance the first time a language asks for them.

use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use rust_stemmers::Algorithm;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

impl Language {
    /// Snowball stemmer for this language, if one exists.
    pub fn stemmer(&self) -> Option<Algorithm> {
        match self.code {
            "en" => Some(Algorithm::English),
            "es" => Some(Algorithm::Spanish),
            "fr" => Some(Algorithm::French),
            "de" => Some(Algorithm::German),
            "ru" => Some(Algorithm::Russian),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

const LANGUAGES: &[Language] = &[
    Language { code: "en", name: "english" },
    Language { code: "es", name: "spanish" },
    Language { code: "fr", name: "french" },
    Language { code: "de", name: "german" },
    Language { code: "ru", name: "russian" },
    Language { code: "zh", name: "chinese" },
];

const BUNDLED: &[(&str, &str)] = &[
    ("english", include_str!("../resources/stopwords/english")),
    ("spanish", include_str!("../resources/stopwords/spanish")),
    ("french", include_str!("../resources/stopwords/french")),
    ("german", include_str!("../resources/stopwords/german")),
    ("russian", include_str!("../resources/stopwords/russian")),
    ("chinese", include_str!("../resources/stopwords/chinese")),
];

/// Ordered set of normalized stopwords for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopwordSet {
    words: BTreeSet<String>,
}

impl StopwordSet {
    /// Words are normalized the same way the analyzer normalizes tokens.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().nfkc().collect::<String>().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.words.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// A linguistic resource that can supply stopword lists.
///
/// `load` returns `Ok(None)` when the list is simply not installed yet;
/// `initialize` is the one-time recovery step the catalog runs before
/// retrying a failed load.
pub trait StopwordSource: Send + Sync {
    fn load(&self, language: &Language) -> io::Result<Option<Vec<String>>>;
    fn initialize(&self) -> io::Result<()>;
}

/// Lists compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledStopwords;

impl StopwordSource for BundledStopwords {
    fn load(&self, language: &Language) -> io::Result<Option<Vec<String>>> {
        Ok(bundled_list(language.name).map(|text| text.lines().map(str::to_string).collect()))
    }

    fn initialize(&self) -> io::Result<()> {
        Ok(())
    }
}

fn bundled_list(name: &str) -> Option<&'static str> {
    BUNDLED.iter().find(|(n, _)| *n == name).map(|(_, text)| *text)
}

/// NLTK-style corpus directory: `<root>/stopwords/<language name>`, one word per line.
#[derive(Debug, Clone)]
pub struct StopwordDir {
    root: PathBuf,
}

impl StopwordDir {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn list_path(&self, name: &str) -> PathBuf {
        self.root.join("stopwords").join(name)
    }
}

impl StopwordSource for StopwordDir {
    fn load(&self, language: &Language) -> io::Result<Option<Vec<String>>> {
        match fs::read_to_string(self.list_path(language.name)) {
            Ok(text) => Ok(Some(text.lines().map(str::to_string).collect())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Installs the bundled lists for any language missing from the directory.
    fn initialize(&self) -> io::Result<()> {
        let dir = self.root.join("stopwords");
        fs::create_dir_all(&dir)?;
        for (name, text) in BUNDLED {
            let path = self.list_path(name);
            if path.exists() {
                continue;
            }
            let tmp = dir.join(format!("{name}.tmp"));
            fs::write(&tmp, text)?;
            fs::rename(&tmp, &path)?;
        }
        tracing::info!(root = %self.root.display(), "installed stopword lists");
        Ok(())
    }
}

/// Fixed language table plus a lazily populated stopword cache.
pub struct LanguageCatalog {
    source: Box<dyn StopwordSource>,
    stopwords: Vec<OnceCell<Arc<StopwordSet>>>,
}

impl Default for LanguageCatalog {
    fn default() -> Self {
        Self::new(BundledStopwords)
    }
}

impl LanguageCatalog {
    pub fn new<S: StopwordSource + 'static>(source: S) -> Self {
        Self {
            source: Box::new(source),
            stopwords: LANGUAGES.iter().map(|_| OnceCell::new()).collect(),
        }
    }

    pub fn languages(&self) -> &'static [Language] {
        LANGUAGES
    }

    /// Resolve a short code (`"en"`) or a full name (`"english"`). Exact match only.
    pub fn resolve(&self, identifier: &str) -> Result<Language> {
        LANGUAGES
            .iter()
            .find(|l| l.code == identifier || l.name == identifier)
            .copied()
            .ok_or_else(|| Error::UnknownLanguage(identifier.to_string()))
    }

    pub fn stopwords(&self, language: &Language) -> Result<Arc<StopwordSet>> {
        let slot = LANGUAGES
            .iter()
            .position(|l| l == language)
            .ok_or_else(|| Error::UnknownLanguage(language.code.to_string()))?;
        self.stopwords[slot]
            .get_or_try_init(|| self.fetch(language).map(Arc::new))
            .cloned()
    }

    fn fetch(&self, language: &Language) -> Result<StopwordSet> {
        match self.try_load(language) {
            Ok(set) => return Ok(set),
            Err(reason) => {
                tracing::warn!(language = language.name, %reason, "stopwords missing, initializing resource");
            }
        }
        let unavailable = |reason: String| Error::ResourceUnavailable { language: language.name.to_string(), reason };
        self.source.initialize().map_err(|e| unavailable(e.to_string()))?;
        self.try_load(language).map_err(unavailable)
    }

    fn try_load(&self, language: &Language) -> std::result::Result<StopwordSet, String> {
        match self.source.load(language) {
            Ok(Some(words)) => {
                let set = StopwordSet::new(words);
                if set.is_empty() {
                    Err("stopword list is empty".to_string())
                } else {
                    tracing::debug!(language = language.name, count = set.len(), "loaded stopwords");
                    Ok(set)
                }
            }
            Ok(None) => Err("stopword list not installed".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}
