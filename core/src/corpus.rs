//! Ticket records and the JSON/JSONL loader that groups them by language.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub subject: String,
    pub body: String,
    pub answer: String,
    pub language: String,
}

/// A ticket being looked up; never part of a corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub answer: Option<String>,
    pub language: String,
}

impl Query {
    pub fn new(subject: impl Into<String>, body: impl Into<String>, language: impl Into<String>) -> Self {
        Self { subject: subject.into(), body: body.into(), answer: None, language: language.into() }
    }
}

impl From<&Document> for Query {
    fn from(doc: &Document) -> Self {
        Self {
            subject: doc.subject.clone(),
            body: doc.body.clone(),
            answer: Some(doc.answer.clone()),
            language: doc.language.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TicketRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    body: String,
    #[serde(default)]
    answer: Option<String>,
    language: String,
}

/// Load tickets from a `.json` file, a `.jsonl` file, or a directory of either.
///
/// Tickets without an id are named `Ticket_<n>` after their 1-based load position.
pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let input_path = path.as_ref();
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        return Err(Error::NotFound(format!("corpus {}", input_path.display())));
    }

    let mut records = Vec::new();
    for file in &files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(file, &mut records)?;
        } else {
            read_json(file, &mut records)?;
        }
    }

    let docs: Vec<Document> = records
        .into_iter()
        .enumerate()
        .map(|(i, r)| Document {
            id: r.id.unwrap_or_else(|| format!("Ticket_{}", i + 1)),
            subject: r.subject.unwrap_or_default(),
            body: r.body,
            answer: r.answer.unwrap_or_default(),
            language: r.language,
        })
        .collect();
    tracing::info!(path = %input_path.display(), files = files.len(), num_docs = docs.len(), "loaded corpus");
    Ok(docs)
}

fn read_jsonl(file: &Path, out: &mut Vec<TicketRecord>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| Error::Corpus {
            path: file.to_path_buf(),
            reason: format!("line {}: {e}", lineno + 1),
        })?;
        out.push(record);
    }
    Ok(())
}

fn read_json(file: &Path, out: &mut Vec<TicketRecord>) -> Result<()> {
    let corpus_err = |e: serde_json::Error| Error::Corpus { path: file.to_path_buf(), reason: e.to_string() };
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader).map_err(corpus_err)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                out.push(serde_json::from_value(v).map_err(corpus_err)?);
            }
        }
        serde_json::Value::Object(_) => out.push(serde_json::from_value(json).map_err(corpus_err)?),
        _ => {}
    }
    Ok(())
}

/// Group documents by their language tag, keeping corpus order inside each group.
pub fn group_by_language(docs: Vec<Document>) -> BTreeMap<String, Vec<Document>> {
    let mut groups: BTreeMap<String, Vec<Document>> = BTreeMap::new();
    for doc in docs {
        groups.entry(doc.language.clone()).or_default().push(doc);
    }
    groups
}

/// Content hash of an ordered document slice, used to detect stale artifacts.
pub fn fingerprint(docs: &[Document]) -> String {
    let mut hasher = Sha1::new();
    for doc in docs {
        for field in [&doc.id, &doc.subject, &doc.body] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_jsonl_and_assigns_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.jsonl");
        fs::write(
            &path,
            concat!(
                r#"{"subject":"VPN","body":"vpn drops","answer":"reinstall","language":"en","queue":"IT"}"#,
                "\n\n",
                r#"{"id":"T-9","body":"Drucker kaputt","language":"de"}"#,
                "\n",
            ),
        )
        .unwrap();

        let docs = load_path(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "Ticket_1");
        assert_eq!(docs[1].id, "T-9");
        assert_eq!(docs[1].subject, "");

        let groups = group_by_language(docs);
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["de", "en"]);
    }

    #[test]
    fn bad_record_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "{\"body\":\"x\"}\n").unwrap();
        match load_path(&path) {
            Err(Error::Corpus { reason, .. }) => assert!(reason.starts_with("line 1")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fingerprint_tracks_order() {
        let a = Document { id: "1".into(), subject: "a".into(), body: "b".into(), answer: String::new(), language: "en".into() };
        let b = Document { id: "2".into(), ..a.clone() };
        assert_eq!(fingerprint(&[a.clone(), b.clone()]), fingerprint(&[a.clone(), b.clone()]));
        assert_ne!(fingerprint(&[a.clone(), b.clone()]), fingerprint(&[b, a]));
    }
}
