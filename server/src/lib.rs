use anyhow::Result;
use axum::{extract::{Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use mapindex_core::persist::{load_meta, load_snapshot, IndexPaths, MetaFile};
use mapindex_core::search::{display_context, DEFAULT_DISPLAY_LEN, DEFAULT_TOP_K};
use mapindex_core::tokenizer::words;
use mapindex_core::{QuerySession, SearchOutcome, StopWords, StopwordFilter};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { DEFAULT_TOP_K }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Found,
    NotFound,
    Stopword,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub status: SearchStatus,
    pub document_frequency: usize,
    pub idf: Option<f64>,
    pub took_s: f64,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub document_id: String,
    pub title: String,
    pub frequency: u32,
    pub score: f64,
    pub snippet: String,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub num_docs: usize,
    pub num_terms: usize,
    pub context_size: usize,
    pub created_at: String,
}

/// The loaded index. Replaced wholesale on reload, never patched.
pub struct Loaded {
    pub session: QuerySession,
    pub meta: MetaFile,
}

#[derive(Clone)]
pub struct AppState {
    pub index_paths_root: PathBuf,
    pub current: Arc<RwLock<Arc<Loaded>>>,
    pub stopwords: Arc<StopWords>,
    pub admin_token: Option<String>,
}

impl AppState {
    fn loaded(&self) -> Arc<Loaded> {
        self.current.read().clone()
    }
}

fn load(index_dir: &Path) -> Result<Loaded> {
    let paths = IndexPaths::new(index_dir);
    let snapshot = load_snapshot(&paths)?;
    let meta = load_meta(&paths)?;
    let session = QuerySession::new(Arc::new(snapshot))?;
    tracing::info!(num_docs = session.num_docs(), num_terms = meta.num_terms, "index loaded");
    Ok(Loaded { session, meta })
}

/// Build the router, taking the admin token from `ADMIN_TOKEN`.
pub fn build_app(index_dir: String) -> Result<Router> {
    build_app_with_token(index_dir, std::env::var("ADMIN_TOKEN").ok())
}

pub fn build_app_with_token(index_dir: String, admin_token: Option<String>) -> Result<Router> {
    let index_paths_root = PathBuf::from(&index_dir);
    let loaded = load(&index_paths_root)?;
    let app_state = AppState {
        index_paths_root,
        current: Arc::new(RwLock::new(Arc::new(loaded))),
        stopwords: Arc::new(StopWords::english()),
        admin_token,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    // Queries are a single exact term
    let term = match words(&params.q).as_slice() {
        [one] => one.clone(),
        [] => return Err((StatusCode::BAD_REQUEST, "empty query".into())),
        _ => return Err((StatusCode::BAD_REQUEST, "expected a single search term".into())),
    };

    let respond = |status, document_frequency, idf, results| {
        Json(SearchResponse {
            query: params.q.clone(),
            status,
            document_frequency,
            idf,
            took_s: start.elapsed().as_secs_f64(),
            results,
        })
    };

    let k = params.k.max(1).min(100);
    let loaded = state.loaded();
    match loaded.session.search(&term, k) {
        // The index decides; the stopword list only explains an absence.
        SearchOutcome::NotFound if state.stopwords.is_stopword(&term) => {
            Ok(respond(SearchStatus::Stopword, 0, None, vec![]))
        }
        SearchOutcome::NotFound => Ok(respond(SearchStatus::NotFound, 0, None, vec![])),
        SearchOutcome::Found { document_frequency, idf, results } => {
            let hits = results
                .into_iter()
                .map(|r| SearchHit {
                    snippet: highlight_term(&display_context(&r.contexts, DEFAULT_DISPLAY_LEN), &term),
                    document_id: r.document_id,
                    title: r.title,
                    frequency: r.frequency,
                    score: r.score,
                })
                .collect();
            Ok(respond(SearchStatus::Found, document_frequency, Some(idf), hits))
        }
    }
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let loaded = state.loaded();
    Json(StatsResponse {
        num_docs: loaded.session.num_docs(),
        num_terms: loaded.session.snapshot().index.num_terms(),
        context_size: loaded.meta.context_size,
        created_at: loaded.meta.created_at.clone(),
    })
}

async fn reload_handler(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let root = state.index_paths_root.clone();
    let loaded = tokio::task::spawn_blocking(move || load(&root))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::error!(error = %e, "reload failed, keeping current index");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("reload failed: {e}"))
        })?;
    *state.current.write() = Arc::new(loaded);
    Ok(stats_handler(State(state)).await)
}

fn highlight_term(snippet: &str, term: &str) -> String {
    let pat = match regex::RegexBuilder::new(&regex::escape(term)).case_insensitive(true).build() {
        Ok(p) => p,
        Err(_) => return snippet.to_string(),
    };
    pat.replace_all(snippet, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string()
}

fn authorize(state: &AppState, headers: &axum::http::HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_case_insensitively() {
        assert_eq!(highlight_term("Cat sat by the cat", "cat"), "<em>Cat</em> sat by the <em>cat</em>");
    }
}
