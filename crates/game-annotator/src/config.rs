//! Annotator configuration from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::AnnotatorError;

#[derive(Clone, Debug)]
pub struct AnnotatorConfig {
    /// Path to the UCI engine binary
    pub stockfish_path: String,

    /// Search depth for live evaluation while navigating
    pub live_depth: u32,

    /// Search depth for per-move classification (kept separate from live depth)
    pub classify_depth: u32,

    /// Window in which successive evaluate requests are coalesced
    pub debounce_ms: u64,

    /// Deadline for one move's engine searches during classification
    pub engine_timeout_secs: u64,

    /// Opening explorer endpoint; no HTTP lookups when unset
    pub book_url: Option<String>,

    /// Offline opening book (bincode), consulted before HTTP
    pub book_file: Option<String>,

    /// Deadline for a single book lookup
    pub book_timeout_secs: u64,

    /// Book lookups only for the first N full moves
    pub book_max_moves: usize,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            stockfish_path: "/usr/local/bin/stockfish".to_string(),
            live_depth: 15,
            classify_depth: 10,
            debounce_ms: 250,
            engine_timeout_secs: 5,
            book_url: None,
            book_file: None,
            book_timeout_secs: 5,
            book_max_moves: 10,
        }
    }
}

impl AnnotatorConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn load() -> Result<Self, AnnotatorError> {
        let defaults = Self::default();

        let config = Self {
            stockfish_path: env::var("STOCKFISH_PATH").unwrap_or(defaults.stockfish_path),
            live_depth: parse_var("LIVE_DEPTH", defaults.live_depth)?,
            classify_depth: parse_var("CLASSIFY_DEPTH", defaults.classify_depth)?,
            debounce_ms: parse_var("DEBOUNCE_MS", defaults.debounce_ms)?,
            engine_timeout_secs: parse_var("ENGINE_TIMEOUT_SECS", defaults.engine_timeout_secs)?,
            book_url: env::var("BOOK_URL").ok().filter(|v| !v.is_empty()),
            book_file: env::var("BOOK_FILE").ok().filter(|v| !v.is_empty()),
            book_timeout_secs: parse_var("BOOK_TIMEOUT_SECS", defaults.book_timeout_secs)?,
            book_max_moves: parse_var("BOOK_MAX_MOVES", defaults.book_max_moves)?,
        };

        if config.live_depth == 0 || config.classify_depth == 0 {
            return Err(AnnotatorError::Config("search depth must be positive".into()));
        }

        info!(
            live_depth = config.live_depth,
            classify_depth = config.classify_depth,
            debounce_ms = config.debounce_ms,
            "Annotator config loaded"
        );

        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn book_timeout(&self) -> Duration {
        Duration::from_secs(self.book_timeout_secs)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AnnotatorError> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| AnnotatorError::Config(format!("{name} is not a valid number: {v}"))),
        Err(_) => Ok(default),
    }
}
