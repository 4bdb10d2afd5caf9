//! Material counting and qualitative position buckets.

use chess::{Color, Piece};
use serde::{Deserialize, Serialize};

use crate::evaluation::Evaluation;
use crate::rules::BoardGrid;

// Piece values in pawns
pub const PAWN_VALUE: f32 = 1.0;
pub const KNIGHT_VALUE: f32 = 3.0;
pub const BISHOP_VALUE: f32 = 3.25;
pub const ROOK_VALUE: f32 = 5.0;
pub const QUEEN_VALUE: f32 = 9.0;

/// Piece value (king counts as zero)
pub fn piece_value(piece: Piece) -> f32 {
    match piece {
        Piece::Pawn => PAWN_VALUE,
        Piece::Knight => KNIGHT_VALUE,
        Piece::Bishop => BISHOP_VALUE,
        Piece::Rook => ROOK_VALUE,
        Piece::Queen => QUEEN_VALUE,
        Piece::King => 0.0,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceCounts {
    pub pawn: u8,
    pub knight: u8,
    pub bishop: u8,
    pub rook: u8,
    pub queen: u8,
    pub king: u8,
}

impl PieceCounts {
    fn add(&mut self, piece: Piece) {
        match piece {
            Piece::Pawn => self.pawn += 1,
            Piece::Knight => self.knight += 1,
            Piece::Bishop => self.bishop += 1,
            Piece::Rook => self.rook += 1,
            Piece::Queen => self.queen += 1,
            Piece::King => self.king += 1,
        }
    }

    pub fn value(&self) -> f32 {
        self.pawn as f32 * PAWN_VALUE
            + self.knight as f32 * KNIGHT_VALUE
            + self.bishop as f32 * BISHOP_VALUE
            + self.rook as f32 * ROOK_VALUE
            + self.queen as f32 * QUEEN_VALUE
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialCount {
    pub white: PieceCounts,
    pub black: PieceCounts,
}

impl MaterialCount {
    pub fn from_grid(grid: &BoardGrid) -> Self {
        let mut count = Self::default();
        for (piece, color) in grid.iter().flatten().flatten() {
            match color {
                Color::White => count.white.add(*piece),
                Color::Black => count.black.add(*piece),
            }
        }
        count
    }

    pub fn side(&self, color: Color) -> &PieceCounts {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    /// Own material minus the opponent's, in pawns
    pub fn balance(&self, color: Color) -> f32 {
        self.side(color).value() - self.side(!color).value()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    Winning,
    Better,
    Equal,
    Worse,
    Losing,
}

impl PositionState {
    /// Bucket a canonical (White-perspective) evaluation in pawns.
    pub fn from_score(score: f32) -> Self {
        if score >= 3.0 {
            PositionState::Winning
        } else if score >= 1.0 {
            PositionState::Better
        } else if score >= -1.0 {
            PositionState::Equal
        } else if score >= -3.0 {
            PositionState::Worse
        } else {
            PositionState::Losing
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateContext {
    pub evaluation: Evaluation,
    pub state: PositionState,
    /// White material minus Black material
    pub material_balance: f32,
}

impl GameStateContext {
    // The bucket always comes from White's side of the board, even when the
    // mover is Black.
    pub fn new(evaluation: Evaluation, material: &MaterialCount) -> Self {
        Self {
            state: PositionState::from_score(evaluation.pawns()),
            material_balance: material.balance(Color::White),
            evaluation,
        }
    }
}

/// Forced: mover in check, the move mates, or fewer than three legal replies.
pub fn is_forced(in_check_before: bool, delivers_mate: bool, legal_move_count: usize) -> bool {
    in_check_before || delivers_mate || legal_move_count < 3
}

/// Sacrifice: the mover gives up more than a point of material while the
/// engine loss stays under a pawn.
pub fn is_sacrifice(material_change: f32, centipawn_loss: f32) -> bool {
    material_change < -1.0 && centipawn_loss < 1.0
}
