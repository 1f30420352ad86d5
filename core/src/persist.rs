//! On-disk form of an [`Index`]: `vectorizer.<code>` and `vector_matrix.<code>`.
//!
//! Each file is a bincode payload followed by an 8-byte footer
//! `[magic][CRC32 BE]`. Files are written to a `.tmp` sibling and renamed
//! into place; the matrix records the SHA-1 of the vectorizer payload it was
//! built with so a mixed pair from two different builds is rejected.

use crate::corpus::{fingerprint, Document};
use crate::error::{Error, Result};
use crate::index::{AnalyzerConfig, DocumentVectorMatrix, Index, SparseVector, TermWeightModel};
use crate::language::{Language, StopwordSet};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fs::{self, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const FORMAT_VERSION: u32 = 1;
const FOOTER_MAGIC: &[u8; 4] = b"TKV1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Vectorizer,
    VectorMatrix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub version: u32,
    pub kind: ArtifactKind,
    pub language: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
struct VectorizerFile {
    header: ArtifactHeader,
    config: AnalyzerConfig,
    stopwords: Vec<String>,
    terms: Vec<String>,
    idf: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct MatrixFile {
    header: ArtifactHeader,
    vectorizer_digest: String,
    corpus_fingerprint: String,
    n_cols: u64,
    rows: Vec<SparseVector>,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn vectorizer(&self, code: &str) -> PathBuf { self.root.join(format!("vectorizer.{code}")) }
    pub fn vector_matrix(&self, code: &str) -> PathBuf { self.root.join(format!("vector_matrix.{code}")) }

    pub fn exists(&self, code: &str) -> bool {
        self.vectorizer(code).is_file() && self.vector_matrix(code).is_file()
    }
}

fn header(kind: ArtifactKind, language: &Language) -> ArtifactHeader {
    ArtifactHeader {
        version: FORMAT_VERSION,
        kind,
        language: language.code.to_string(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| Error::Io(io::Error::other(e.to_string())))
}

fn frame(payload: &[u8]) -> Vec<u8> {
    let crc = crc32fast::hash(payload);
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(payload);
    out.extend_from_slice(FOOTER_MAGIC);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_tmp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let tmp = tmp_path(path);
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    Ok(tmp)
}

/// Write both artifacts for `index`, replacing any previous pair.
pub fn save(index: &Index, paths: &IndexPaths) -> Result<()> {
    create_dir_all(&paths.root)?;
    let language = index.language();
    let model = index.model();

    let vectorizer = VectorizerFile {
        header: header(ArtifactKind::Vectorizer, &language),
        config: model.config().clone(),
        stopwords: model.stopwords().iter().map(str::to_string).collect(),
        terms: model.terms().to_vec(),
        idf: model.idf().to_vec(),
    };
    let vectorizer_bytes = encode(&vectorizer)?;

    let matrix = MatrixFile {
        header: header(ArtifactKind::VectorMatrix, &language),
        vectorizer_digest: digest(&vectorizer_bytes),
        corpus_fingerprint: fingerprint(index.documents()),
        n_cols: index.matrix().n_cols() as u64,
        rows: index.matrix().rows().to_vec(),
    };
    let matrix_bytes = encode(&matrix)?;

    let vectorizer_path = paths.vectorizer(language.code);
    let matrix_path = paths.vector_matrix(language.code);
    let vectorizer_tmp = write_tmp(&vectorizer_path, &frame(&vectorizer_bytes))?;
    let matrix_tmp = write_tmp(&matrix_path, &frame(&matrix_bytes))?;
    fs::rename(&vectorizer_tmp, &vectorizer_path)?;
    fs::rename(&matrix_tmp, &matrix_path)?;

    tracing::info!(
        language = language.name,
        vectorizer_bytes = vectorizer_bytes.len(),
        matrix_bytes = matrix_bytes.len(),
        root = %paths.root.display(),
        "saved index artifacts"
    );
    Ok(())
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Read a framed artifact and return its verified payload.
fn read_payload(path: &Path) -> Result<Vec<u8>> {
    let mut raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!("artifact {}", path.display())))
        }
        Err(e) => return Err(e.into()),
    };
    if raw.len() < 8 || &raw[raw.len() - 8..raw.len() - 4] != FOOTER_MAGIC {
        return Err(Error::corrupt(path, "missing checksum footer"));
    }
    let split = raw.len() - 8;
    let stored = u32::from_be_bytes([raw[split + 4], raw[split + 5], raw[split + 6], raw[split + 7]]);
    raw.truncate(split);
    let computed = crc32fast::hash(&raw);
    if computed != stored {
        return Err(Error::corrupt(path, format!("CRC32 mismatch: expected {stored:#010x}, got {computed:#010x}")));
    }
    Ok(raw)
}

fn decode<T: DeserializeOwned>(path: &Path, payload: &[u8]) -> Result<T> {
    bincode::deserialize(payload).map_err(|e| Error::corrupt(path, e.to_string()))
}

fn check_header(path: &Path, header: &ArtifactHeader, kind: ArtifactKind, language: &Language) -> Result<()> {
    if header.version != FORMAT_VERSION {
        return Err(Error::corrupt(path, format!("format version {} (expected {FORMAT_VERSION})", header.version)));
    }
    if header.kind != kind {
        return Err(Error::corrupt(path, format!("expected {kind:?}, found {:?}", header.kind)));
    }
    if header.language != language.code {
        return Err(Error::corrupt(path, format!("built for '{}', not '{}'", header.language, language.code)));
    }
    Ok(())
}

/// Restore the index for `language` over `documents`, which must be the corpus it was built from.
pub fn load(paths: &IndexPaths, language: Language, documents: Vec<Document>) -> Result<Index> {
    let vectorizer_path = paths.vectorizer(language.code);
    let matrix_path = paths.vector_matrix(language.code);

    let vectorizer_bytes = read_payload(&vectorizer_path)?;
    let vectorizer: VectorizerFile = decode(&vectorizer_path, &vectorizer_bytes)?;
    check_header(&vectorizer_path, &vectorizer.header, ArtifactKind::Vectorizer, &language)?;
    if vectorizer.terms.len() != vectorizer.idf.len() {
        return Err(Error::corrupt(&vectorizer_path, "term and idf counts differ"));
    }
    if vectorizer.terms.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::corrupt(&vectorizer_path, "vocabulary is not strictly sorted"));
    }

    let matrix_bytes = read_payload(&matrix_path)?;
    let matrix: MatrixFile = decode(&matrix_path, &matrix_bytes)?;
    check_header(&matrix_path, &matrix.header, ArtifactKind::VectorMatrix, &language)?;
    if matrix.vectorizer_digest != digest(&vectorizer_bytes) {
        return Err(Error::corrupt(&matrix_path, "matrix was built with a different vectorizer"));
    }
    let n_cols = matrix.n_cols as usize;
    if n_cols != vectorizer.terms.len() {
        return Err(Error::corrupt(&matrix_path, format!("{n_cols} columns for {} terms", vectorizer.terms.len())));
    }
    for (i, row) in matrix.rows.iter().enumerate() {
        let sorted = row.indices.windows(2).all(|w| w[0] < w[1]);
        let in_range = row.indices.last().map_or(true, |&c| (c as usize) < n_cols);
        if row.indices.len() != row.values.len() || !sorted || !in_range {
            return Err(Error::corrupt(&matrix_path, format!("row {i} is malformed")));
        }
    }

    if matrix.rows.len() != documents.len() {
        return Err(Error::StaleArtifact {
            path: matrix_path,
            reason: format!("{} rows for {} documents", matrix.rows.len(), documents.len()),
        });
    }
    if matrix.corpus_fingerprint != fingerprint(&documents) {
        return Err(Error::StaleArtifact { path: matrix_path, reason: "corpus changed since build".into() });
    }

    let stopwords = Arc::new(StopwordSet::new(vectorizer.stopwords));
    let model = TermWeightModel::from_parts(vectorizer.terms, vectorizer.idf, vectorizer.config, stopwords);
    let index = Index::from_parts(language, model, DocumentVectorMatrix::from_rows(matrix.rows, n_cols), documents);
    tracing::info!(
        language = language.name,
        num_docs = index.len(),
        num_terms = index.model().len(),
        created_at = %matrix.header.created_at,
        "loaded index artifacts"
    );
    Ok(index)
}
