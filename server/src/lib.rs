use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use ticket_core::corpus::{group_by_language, load_path};
use ticket_core::{IndexStore, LanguageCatalog, Query, StopwordDir};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const NO_MATCH_MESSAGE: &str =
    "No related tickets could be located, please try describing the problem in another way.";

/// Everything needed to bring the index up at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub datafile: PathBuf,
    pub vectorpath: PathBuf,
    pub bundles: Vec<String>,
    pub rebuild: bool,
    pub threshold: f64,
    pub stopwords: Option<PathBuf>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<IndexStore>,
    pub datafile: PathBuf,
    pub min_confidence: f64,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct RelatedRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default, alias = "description")]
    pub body: String,
    #[serde(default, alias = "resolution")]
    pub answer: Option<String>,
    pub language: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RelatedResponse {
    pub ticket_id: Option<String>,
    pub subject: String,
    pub body: String,
    pub answer: String,
    pub language: String,
    pub confidence: f64,
    pub matched: bool,
}

#[derive(Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<String>,
}

#[derive(Debug)]
pub enum ApiError {
    UnsupportedLanguage(String),
    Conflict(String),
    Unauthorized(String),
    Internal(String),
}

impl From<ticket_core::Error> for ApiError {
    fn from(e: ticket_core::Error) -> Self {
        match e {
            e if e.is_unsupported_language() => ApiError::UnsupportedLanguage(format!("language not supported: {e}")),
            e @ ticket_core::Error::EmptyIndex(_) => ApiError::Conflict(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::UnsupportedLanguage(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Load the corpus, materialize the requested language indices and build the router.
pub fn build_app(config: ServerConfig) -> Result<Router> {
    let catalog = Arc::new(match &config.stopwords {
        Some(dir) => LanguageCatalog::new(StopwordDir::new(dir)),
        None => LanguageCatalog::default(),
    });
    let docs = load_path(&config.datafile).with_context(|| format!("loading corpus {}", config.datafile.display()))?;
    let store = IndexStore::new(catalog, &config.vectorpath);
    let out = store.materialize(&config.bundles, &group_by_language(docs), config.rebuild)?;
    for language in &out.skipped {
        tracing::warn!(%language, "no documents found in data file for language");
    }
    tracing::info!(languages = ?store.active_languages(), "indices ready");

    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(router(AppState {
        store: Arc::new(store),
        datafile: config.datafile,
        min_confidence: config.threshold,
        admin_token,
    }))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/languages", get(languages_handler))
        .route("/related", post(related_handler))
        .route("/admin/rebuild", post(rebuild_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn languages_handler(State(state): State<AppState>) -> Json<LanguagesResponse> {
    Json(LanguagesResponse { languages: state.store.active_languages() })
}

pub async fn related_handler(
    State(state): State<AppState>,
    Json(req): Json<RelatedRequest>,
) -> Result<Json<RelatedResponse>, ApiError> {
    let query = Query { subject: req.subject, body: req.body, answer: req.answer, language: req.language };
    let store = state.store.clone();
    let (query, hit) = tokio::task::spawn_blocking(move || {
        let hit = store.search(&query);
        (query, hit)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;
    let hit = hit?;
    let language = state.store.catalog().resolve(&query.language)?;

    // Thresholding is a presentation decision; the index only reports the raw score.
    if hit.score < state.min_confidence {
        return Ok(Json(RelatedResponse {
            ticket_id: None,
            subject: String::new(),
            body: String::new(),
            answer: NO_MATCH_MESSAGE.to_string(),
            language: language.name.to_string(),
            confidence: hit.score,
            matched: false,
        }));
    }

    let doc = hit.document;
    let subject = if doc.subject.trim().is_empty() { "No subject".to_string() } else { decode_escapes(&doc.subject) };
    Ok(Json(RelatedResponse {
        ticket_id: Some(doc.id),
        subject,
        body: decode_escapes(&doc.body),
        answer: decode_escapes(&doc.answer),
        language: language.name.to_string(),
        confidence: hit.score,
        matched: true,
    }))
}

async fn rebuild_handler(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Json<LanguagesResponse>, ApiError> {
    authorize(&state, &headers)?;
    let store = state.store.clone();
    let datafile = state.datafile.clone();
    let languages = tokio::task::spawn_blocking(move || -> Result<Vec<String>, ApiError> {
        let active = store.active_languages();
        // An empty request would select every language; only rebuild what is served.
        if active.is_empty() {
            return Ok(active);
        }
        let docs = load_path(&datafile)?;
        store.materialize(&active, &group_by_language(docs), true)?;
        Ok(store.active_languages())
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;
    tracing::info!(?languages, "rebuilt indices");
    Ok(Json(LanguagesResponse { languages }))
}

fn authorize(state: &AppState, headers: &axum::http::HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}

/// Turn the backslash escapes found in the ticket export (`\n`, `\t`, `\r`,
/// `\\`, `\'`, `\"`, `\xNN`, `\uXXXX`) into real characters and collapse
/// doubled line breaks. Unrecognized or malformed escapes are kept as written.
pub fn decode_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (decoded, consumed) = match after.chars().next() {
            Some('n') => (Some('\n'), 1),
            Some('t') => (Some('\t'), 1),
            Some('r') => (Some('\r'), 1),
            Some(c @ ('\\' | '\'' | '"')) => (Some(c), 1),
            Some('x') => (hex_char(after, 2), 3),
            Some('u') => (hex_char(after, 4), 5),
            _ => (None, 0),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &after[consumed..];
            }
            None => {
                out.push('\\');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out.replace("\n\n", "\n")
}

/// Code point spelled by the `digits` hex characters following the escape letter.
fn hex_char(escape: &str, digits: usize) -> Option<char> {
    let hex = escape.get(1..1 + digits)?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_export_escapes() {
        assert_eq!(decode_escapes(r"line one\n\nline two\tend"), "line one\nline two\tend");
        assert_eq!(decode_escapes(r"C:\\temp \q"), r"C:\temp \q");
        assert_eq!(decode_escapes("trailing\\"), "trailing\\");
    }

    #[test]
    fn decodes_quotes_and_hex_escapes() {
        assert_eq!(decode_escapes(r#"it\'s \"on\""#), r#"it's "on""#);
        assert_eq!(decode_escapes(r"caf\xe9 \u00fcber \u2603"), "café über ☃");
        assert_eq!(decode_escapes(r"bad \xZZ short \u12"), r"bad \xZZ short \u12");
    }
}
