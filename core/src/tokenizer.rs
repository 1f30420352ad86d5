use crate::index::AnalyzerConfig;
use crate::language::StopwordSet;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\b\w\w+\b").expect("valid regex");
}

/// Text a ticket contributes to the index: subject then body, space separated.
pub fn indexable_text(subject: &str, body: &str) -> String {
    format!("{subject} {body}")
}

/// Split text into lowercase word tokens of at least two characters after NFKC normalization.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
}

/// Turns text into the n-gram terms that index and query vectors are built from.
pub struct Analyzer<'a> {
    stopwords: &'a StopwordSet,
    stemmer: Option<Stemmer>,
    min_n: usize,
    max_n: usize,
}

impl<'a> Analyzer<'a> {
    pub fn new(config: &AnalyzerConfig, stopwords: &'a StopwordSet, algorithm: Option<Algorithm>) -> Self {
        let stemmer = if config.stem { algorithm.map(Stemmer::create) } else { None };
        Self { stopwords, stemmer, min_n: config.min_n.max(1), max_n: config.max_n.max(config.min_n.max(1)) }
    }

    /// Stopwords are dropped before n-grams are formed, so an n-gram may join
    /// words that were separated by a stopword in the input text.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let tokens: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|t| !self.stopwords.contains(t))
            .map(|t| match &self.stemmer {
                Some(s) => s.stem(&t).into_owned(),
                None => t,
            })
            .collect();

        let mut terms = Vec::with_capacity(tokens.len() * (self.max_n - self.min_n + 1));
        for n in self.min_n..=self.max_n {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Printer won't turn-on, a I");
        assert_eq!(t, vec!["printer", "won", "turn", "on"]);
    }

    #[test]
    fn ngrams_skip_stopwords() {
        let stop = StopwordSet::new(["the", "to"]);
        let analyzer = Analyzer::new(&AnalyzerConfig::default(), &stop, None);
        let terms = analyzer.analyze("connect to the network now");
        assert_eq!(
            terms,
            vec![
                "connect",
                "network",
                "now",
                "connect network",
                "network now",
                "connect network now",
            ]
        );
    }
}
