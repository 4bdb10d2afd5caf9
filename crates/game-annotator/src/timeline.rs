//! Navigable history of an imported game.

use chess::{Color, Piece};
use chess_core::{GameHeaders, STANDARD_START_FEN};
use serde::Serialize;
use tracing::warn;

use crate::classify::ClassificationResult;
use crate::evaluation::Evaluation;
use crate::rules::AppliedMove;

/// What the classification pipeline found out about one move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveAnalysis {
    pub classification: ClassificationResult,
    pub best_move: Option<String>,
    pub best_score: Option<Evaluation>,
    pub move_score: Option<Evaluation>,
    pub opening_name: Option<String>,
}

impl MoveAnalysis {
    pub fn book(opening_name: Option<String>) -> Self {
        Self {
            classification: ClassificationResult::book(),
            best_move: None,
            best_score: None,
            move_score: None,
            opening_name,
        }
    }
}

/// One played move. Everything but the analysis fields is fixed at import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveRecord {
    pub from: String,
    pub to: String,
    pub uci: String,
    pub san: String,
    #[serde(skip)]
    pub mover: Color,
    #[serde(skip)]
    pub piece: Piece,
    pub resulting_fen: String,
    pub explanation: Option<String>,
    classification: Option<ClassificationResult>,
    engine_best_move: Option<String>,
    engine_best_score: Option<Evaluation>,
    engine_move_score: Option<Evaluation>,
    opening_name: Option<String>,
}

impl MoveRecord {
    pub fn new(applied: AppliedMove, explanation: Option<String>) -> Self {
        Self {
            from: applied.from,
            to: applied.to,
            uci: applied.uci,
            san: applied.san,
            mover: applied.mover,
            piece: applied.piece,
            resulting_fen: applied.fen_after,
            explanation,
            classification: None,
            engine_best_move: None,
            engine_best_score: None,
            engine_move_score: None,
            opening_name: None,
        }
    }

    pub fn classification(&self) -> Option<&ClassificationResult> {
        self.classification.as_ref()
    }

    pub fn engine_best_move(&self) -> Option<&str> {
        self.engine_best_move.as_deref()
    }

    pub fn engine_best_score(&self) -> Option<&Evaluation> {
        self.engine_best_score.as_ref()
    }

    pub fn engine_move_score(&self) -> Option<&Evaluation> {
        self.engine_move_score.as_ref()
    }

    pub fn opening_name(&self) -> Option<&str> {
        self.opening_name.as_deref()
    }

    /// Store pipeline output. Only the first result sticks; returns whether
    /// this one was stored.
    pub fn record_analysis(&mut self, analysis: MoveAnalysis) -> bool {
        if self.classification.is_some() {
            return false;
        }
        self.classification = Some(analysis.classification);
        self.engine_best_move = analysis.best_move;
        self.engine_best_score = analysis.best_score;
        self.engine_move_score = analysis.move_score;
        self.opening_name = analysis.opening_name;
        true
    }

    /// Manual annotation always wins over what is stored.
    pub fn annotate(&mut self, classification: ClassificationResult) {
        self.classification = Some(classification);
    }

    pub fn clear_classification(&mut self) {
        self.classification = None;
    }
}

/// Positions `P[0..=N]` and the moves between them, with a cursor.
/// `positions.len() == moves.len() + 1` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameTimeline {
    headers: GameHeaders,
    positions: Vec<String>,
    moves: Vec<MoveRecord>,
    current: usize,
}

impl Default for GameTimeline {
    fn default() -> Self {
        Self::new(STANDARD_START_FEN)
    }
}

impl GameTimeline {
    pub fn new(initial_fen: &str) -> Self {
        Self {
            headers: GameHeaders::default(),
            positions: vec![initial_fen.to_string()],
            moves: Vec::new(),
            current: 0,
        }
    }

    /// Assemble from a built history. Callers guarantee that every move's
    /// `resulting_fen` is the position after it.
    pub(crate) fn from_history(headers: GameHeaders, initial_fen: &str, moves: Vec<MoveRecord>) -> Self {
        let mut positions = Vec::with_capacity(moves.len() + 1);
        positions.push(initial_fen.to_string());
        positions.extend(moves.iter().map(|m| m.resulting_fen.clone()));
        Self {
            headers,
            positions,
            moves,
            current: 0,
        }
    }

    pub fn headers(&self) -> &GameHeaders {
        &self.headers
    }

    pub fn positions(&self) -> &[String] {
        &self.positions
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    /// Number of moves
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_position(&self) -> &str {
        &self.positions[self.current]
    }

    /// The move that produced the current position, if any.
    pub fn current_move(&self) -> Option<&MoveRecord> {
        self.current.checked_sub(1).and_then(|i| self.moves.get(i))
    }

    pub fn next(&mut self) -> usize {
        self.goto(self.current + 1)
    }

    pub fn prev(&mut self) -> usize {
        self.goto(self.current.saturating_sub(1))
    }

    /// Jump to a position, clamped to the history.
    pub fn goto(&mut self, index: usize) -> usize {
        self.current = index.min(self.moves.len());
        self.current
    }

    /// Back to a single initial position; moves are discarded.
    pub fn reset(&mut self) {
        let initial = self.positions[0].clone();
        *self = Self::new(&initial);
    }

    pub fn record_analysis(&mut self, index: usize, analysis: MoveAnalysis) -> bool {
        match self.moves.get_mut(index) {
            Some(record) => {
                let stored = record.record_analysis(analysis);
                if !stored {
                    warn!(index, "Move already classified, keeping existing result");
                }
                stored
            }
            None => false,
        }
    }

    pub fn annotate(&mut self, index: usize, classification: ClassificationResult) -> bool {
        self.moves
            .get_mut(index)
            .map(|record| record.annotate(classification))
            .is_some()
    }

    pub fn clear_annotation(&mut self, index: usize) -> bool {
        self.moves
            .get_mut(index)
            .map(MoveRecord::clear_classification)
            .is_some()
    }
}
