//! Move classification: pure functions only
//! (no board, engine or timeline dependencies)

use std::fmt;

use chess::Color;
use serde::{Deserialize, Serialize};

use crate::game_state::PositionState;

// Loss thresholds in pawns, checked in order
const THRESHOLD_BEST: f32 = 0.1;
const THRESHOLD_GREAT: f32 = 0.25;
const THRESHOLD_EXCELLENT: f32 = 0.5;
const THRESHOLD_GOOD: f32 = 1.0;
const THRESHOLD_INACCURACY: f32 = 2.0;
const THRESHOLD_MISTAKE: f32 = 4.0;

/// A winning side that drops more than this has missed the win
const THRESHOLD_MISS: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveClassification {
    Book,
    Brilliant,
    Best,
    Great,
    Excellent,
    Good,
    Forced,
    Inaccuracy,
    Mistake,
    Miss,
    Blunder,
}

impl MoveClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveClassification::Book => "book",
            MoveClassification::Brilliant => "brilliant",
            MoveClassification::Best => "best",
            MoveClassification::Great => "great",
            MoveClassification::Excellent => "excellent",
            MoveClassification::Good => "good",
            MoveClassification::Forced => "forced",
            MoveClassification::Inaccuracy => "inaccuracy",
            MoveClassification::Mistake => "mistake",
            MoveClassification::Miss => "miss",
            MoveClassification::Blunder => "blunder",
        }
    }
}

impl fmt::Display for MoveClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(rename = "type")]
    pub kind: MoveClassification,
    pub confidence: f32,
}

impl ClassificationResult {
    fn new(kind: MoveClassification, confidence: f32) -> Self {
        Self { kind, confidence }
    }

    /// Known opening theory; assigned before any engine work.
    pub fn book() -> Self {
        Self::new(MoveClassification::Book, 1.0)
    }
}

/// Classify one move. First matching rule wins.
pub fn classify(
    loss: f32,
    material_change: f32,
    state_before: PositionState,
    _state_after: PositionState,
    is_best_move: bool,
    is_forced: bool,
    is_sacrifice: bool,
) -> ClassificationResult {
    use MoveClassification::*;

    let loss = loss.max(0.0);

    if is_sacrifice && loss < THRESHOLD_EXCELLENT && material_change < -1.0 {
        return ClassificationResult::new(Brilliant, 0.9);
    }
    if is_best_move || loss < THRESHOLD_BEST {
        return ClassificationResult::new(Best, 0.95);
    }
    if is_forced {
        return ClassificationResult::new(Forced, 0.9);
    }

    let (kind, confidence) = if loss < THRESHOLD_GREAT {
        (Great, 0.8)
    } else if loss < THRESHOLD_EXCELLENT {
        (Excellent, 0.7)
    } else if loss < THRESHOLD_GOOD {
        (Good, 0.6)
    } else if state_before == PositionState::Winning && loss > THRESHOLD_MISS {
        (Miss, 0.8)
    } else if loss < THRESHOLD_INACCURACY {
        (Inaccuracy, 0.7)
    } else if loss < THRESHOLD_MISTAKE {
        (Mistake, 0.8)
    } else {
        (Blunder, 0.9)
    };
    ClassificationResult::new(kind, confidence)
}

/// Loss in pawns for the side that moved: how much worse the played move
/// scores than the engine's best, never negative. Both scores are canonical.
pub fn centipawn_loss(best_score: f32, played_score: f32, mover: Color) -> f32 {
    let loss = match mover {
        Color::White => best_score - played_score,
        Color::Black => played_score - best_score,
    };
    loss.max(0.0)
}

/// Accuracy from average centipawn loss (centipawns per move).
pub fn calculate_accuracy(total_cp_loss: f64, move_count: u32) -> f64 {
    if move_count == 0 {
        return 100.0;
    }
    let acpl = total_cp_loss / move_count as f64;
    let accuracy = 100.0 * (1.0 / (1.0 + acpl / 100.0)).sqrt();
    accuracy.clamp(0.0, 100.0)
}
