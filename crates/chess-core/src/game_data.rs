use serde::{Deserialize, Serialize};

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameHeaders {
    pub white: String,
    pub black: String,
    pub result: String, // "1-0", "0-1", "1/2-1/2", "*"
    pub date: Option<String>,
    pub event: Option<String>,
    pub eco: Option<String>,
    pub opening: Option<String>,
    /// Starting position when the game was set up from a FEN
    pub fen: Option<String>,
}

/// One move as handed over by a PGN reader. `san` is authoritative when it
/// resolves; `from`/`to`/`promotion` are the fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveDescriptor {
    #[serde(default)]
    pub san: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub promotion: Option<char>,
    #[serde(default)]
    pub comments: Vec<String>,
}

impl MoveDescriptor {
    pub fn san(san: &str) -> Self {
        Self {
            san: san.to_string(),
            ..Default::default()
        }
    }

    /// First non-empty comment, trimmed
    pub fn comment(&self) -> Option<&str> {
        self.comments
            .iter()
            .map(|c| c.trim())
            .find(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedGame {
    pub headers: GameHeaders,
    pub moves: Vec<MoveDescriptor>,
}

impl ImportedGame {
    pub fn initial_fen(&self) -> &str {
        self.headers.fen.as_deref().unwrap_or(STANDARD_START_FEN)
    }
}
