//! Opening book lookups: an offline bincode book, an HTTP opening explorer,
//! and a cache in front of the explorer.

use std::collections::HashMap;
use std::fs::File;
use std::future::Future;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AnnotatorConfig;
use crate::error::AnnotatorError;

/// A position the book knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookHit {
    pub opening_name: Option<String>,
}

pub trait BookLookup {
    /// Is `played_san` from `fen` known theory? `Ok(None)` means no.
    fn lookup(
        &self,
        fen: &str,
        played_san: &str,
    ) -> impl Future<Output = Result<Option<BookHit>, AnnotatorError>> + Send;
}

/// Strips move counters from FEN, keeping only position + side + castling + ep.
pub fn normalize_fen(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Stats for a single book move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMoveStats {
    pub games: i32,
    pub white_wins: i32,
    pub draws: i32,
    pub black_wins: i32,
}

/// The entire offline book: FEN -> (move_san -> stats)
pub type BookTable = HashMap<String, HashMap<String, BookMoveStats>>;

/// Offline book loaded from a bincode file.
#[derive(Debug, Default)]
pub struct LocalBook {
    table: BookTable,
}

impl LocalBook {
    pub fn new(table: BookTable) -> Self {
        Self { table }
    }

    /// Load the book from a binary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AnnotatorError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| AnnotatorError::Lookup(format!("{}: {e}", path.display())))?;
        let table: BookTable = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| AnnotatorError::Lookup(format!("{}: {e}", path.display())))?;

        let total_moves: usize = table.values().map(|m| m.len()).sum();
        info!(positions = table.len(), moves = total_moves, "Loaded opening book");
        Ok(Self { table })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AnnotatorError> {
        let file = File::create(path.as_ref()).map_err(|e| AnnotatorError::Lookup(e.to_string()))?;
        bincode::serialize_into(BufWriter::new(file), &self.table)
            .map_err(|e| AnnotatorError::Lookup(e.to_string()))
    }

    pub fn contains(&self, fen: &str, played_san: &str) -> bool {
        self.table
            .get(&normalize_fen(fen))
            .is_some_and(|moves| moves.contains_key(played_san))
    }
}

impl BookLookup for LocalBook {
    async fn lookup(&self, fen: &str, played_san: &str) -> Result<Option<BookHit>, AnnotatorError> {
        Ok(self
            .contains(fen, played_san)
            .then_some(BookHit { opening_name: None }))
    }
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    #[serde(default)]
    moves: Vec<ExplorerMove>,
    #[serde(default)]
    opening: Option<ExplorerOpening>,
}

#[derive(Debug, Deserialize)]
struct ExplorerMove {
    #[serde(default)]
    opening: Option<ExplorerOpening>,
}

#[derive(Debug, Deserialize)]
struct ExplorerOpening {
    name: String,
}

/// Any continuation at all makes the position book; the name comes from the
/// response itself or its first named entry.
fn hit_from_response(response: ExplorerResponse) -> Option<BookHit> {
    if response.moves.is_empty() {
        return None;
    }
    let opening_name = response
        .opening
        .map(|o| o.name)
        .or_else(|| response.moves.into_iter().find_map(|m| m.opening).map(|o| o.name));
    Some(BookHit { opening_name })
}

/// HTTP opening explorer: `GET <url>?fen=<normalized fen>`.
pub struct ExplorerClient {
    client: Client,
    url: String,
}

impl ExplorerClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, AnnotatorError> {
        let client = Client::builder()
            .user_agent("GameAnnotator/1.0")
            .timeout(timeout)
            .build()
            .map_err(|e| AnnotatorError::Lookup(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl BookLookup for ExplorerClient {
    async fn lookup(&self, fen: &str, _played_san: &str) -> Result<Option<BookHit>, AnnotatorError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("fen", normalize_fen(fen))])
            .send()
            .await
            .map_err(|e| AnnotatorError::Lookup(format!("Request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(AnnotatorError::Lookup(format!("HTTP {}", resp.status())));
        }

        let body: ExplorerResponse = resp
            .json()
            .await
            .map_err(|e| AnnotatorError::Lookup(format!("Body read error: {e}")))?;
        Ok(hit_from_response(body))
    }
}

/// Remembers answers per normalized FEN. Errors are not cached.
pub struct CachedBook<B> {
    inner: B,
    cache: Mutex<HashMap<String, Option<BookHit>>>,
}

impl<B> CachedBook<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &str) -> Option<Option<BookHit>> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(key).cloned()
    }
}

impl<B: BookLookup + Sync> BookLookup for CachedBook<B> {
    async fn lookup(&self, fen: &str, played_san: &str) -> Result<Option<BookHit>, AnnotatorError> {
        let key = normalize_fen(fen);
        if let Some(hit) = self.cached(&key) {
            debug!(fen = key.as_str(), "Book cache hit");
            return Ok(hit);
        }

        let hit = self.inner.lookup(fen, played_san).await?;
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, hit.clone());
        Ok(hit)
    }
}

/// Offline book first, then the explorer. Either may be absent.
#[derive(Default)]
pub struct OpeningBook {
    local: Option<LocalBook>,
    remote: Option<CachedBook<ExplorerClient>>,
}

impl OpeningBook {
    pub fn new(local: Option<LocalBook>, remote: Option<ExplorerClient>) -> Self {
        Self {
            local,
            remote: remote.map(CachedBook::new),
        }
    }

    /// Build from config. A book file that fails to load disables only the
    /// offline book.
    pub fn from_config(config: &AnnotatorConfig) -> Result<Self, AnnotatorError> {
        let local = match config.book_file.as_deref() {
            Some(path) => match LocalBook::load(path) {
                Ok(book) => Some(book),
                Err(e) => {
                    warn!(error = %e, "Failed to load opening book, offline lookups disabled");
                    None
                }
            },
            None => None,
        };
        let remote = match config.book_url.as_deref() {
            Some(url) => Some(ExplorerClient::new(url, config.book_timeout())?),
            None => None,
        };
        Ok(Self::new(local, remote))
    }

    pub fn is_configured(&self) -> bool {
        self.local.is_some() || self.remote.is_some()
    }
}

impl BookLookup for OpeningBook {
    async fn lookup(&self, fen: &str, played_san: &str) -> Result<Option<BookHit>, AnnotatorError> {
        if let Some(local) = &self.local {
            if let Some(hit) = local.lookup(fen, played_san).await? {
                return Ok(Some(hit));
            }
        }
        match &self.remote {
            Some(remote) => remote.lookup(fen, played_san).await,
            None => Ok(None),
        }
    }
}
