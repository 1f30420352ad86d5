use ticket_core::index::AnalyzerConfig;
use ticket_core::tokenizer::{tokenize, Analyzer};
use ticket_core::{LanguageCatalog, StopwordSet};

#[test]
fn it_normalizes_and_lowercases() {
    let words = tokenize("ＶＰＮ Client CRASHES on the café Wi-Fi");
    assert!(words.contains(&"vpn".to_string()));
    assert!(words.contains(&"crashes".to_string()));
    assert!(words.contains(&"café".to_string()));
    assert!(words.contains(&"wi".to_string()));
    assert!(words.contains(&"fi".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let catalog = LanguageCatalog::default();
    let en = catalog.resolve("english").unwrap();
    let stop = catalog.stopwords(&en).unwrap();
    let analyzer = Analyzer::new(&AnalyzerConfig::default(), &stop, en.stemmer());
    let terms = analyzer.analyze("The quick brown fox and the lazy dog");
    assert!(!terms.contains(&"the".to_string()));
    assert!(!terms.contains(&"and".to_string()));
    assert!(terms.contains(&"brown fox lazy".to_string()));
}

#[test]
fn it_stems_when_enabled() {
    let stop = StopwordSet::new(["the"]);
    let config = AnalyzerConfig { stem: true, ..AnalyzerConfig::default() };
    let analyzer = Analyzer::new(&config, &stop, Some(rust_stemmers::Algorithm::English));
    let terms = analyzer.analyze("Running runners");
    assert!(terms.contains(&"run".to_string()));
}

#[test]
fn unigram_only_range() {
    let stop = StopwordSet::new(["x"]);
    let config = AnalyzerConfig { min_n: 1, max_n: 1, stem: false };
    let analyzer = Analyzer::new(&config, &stop, None);
    assert_eq!(analyzer.analyze("disk full again"), vec!["disk", "full", "again"]);
}
