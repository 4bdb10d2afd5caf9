//! Per-side summary of a classified game.

use chess::Color;
use chess_core::GameHeaders;
use serde::Serialize;

use crate::classify::{calculate_accuracy, centipawn_loss, MoveClassification};
use crate::timeline::{GameTimeline, MoveRecord};

/// Maximum centipawn loss counted for one move
const MAX_CP_LOSS: f64 = 500.0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classifications {
    pub book: u32,
    pub brilliant: u32,
    pub best: u32,
    pub great: u32,
    pub excellent: u32,
    pub good: u32,
    pub forced: u32,
    pub inaccuracy: u32,
    pub mistake: u32,
    pub miss: u32,
    pub blunder: u32,
}

impl Classifications {
    fn add(&mut self, kind: MoveClassification) {
        let slot = match kind {
            MoveClassification::Book => &mut self.book,
            MoveClassification::Brilliant => &mut self.brilliant,
            MoveClassification::Best => &mut self.best,
            MoveClassification::Great => &mut self.great,
            MoveClassification::Excellent => &mut self.excellent,
            MoveClassification::Good => &mut self.good,
            MoveClassification::Forced => &mut self.forced,
            MoveClassification::Inaccuracy => &mut self.inaccuracy,
            MoveClassification::Mistake => &mut self.mistake,
            MoveClassification::Miss => &mut self.miss,
            MoveClassification::Blunder => &mut self.blunder,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideReport {
    pub player: String,
    pub moves: u32,
    pub classifications: Classifications,
    /// Average centipawn loss over engine-scored moves
    pub acpl: f64,
    pub accuracy: f64,
}

impl SideReport {
    fn build(player: &str, color: Color, moves: &[MoveRecord]) -> Self {
        let mut classifications = Classifications::default();
        let mut total_cp_loss = 0.0;
        let mut scored = 0u32;
        let mut count = 0u32;

        for record in moves.iter().filter(|m| m.mover == color) {
            count += 1;
            if let Some(result) = record.classification() {
                classifications.add(result.kind);
            }
            if let (Some(best), Some(played)) = (record.engine_best_score(), record.engine_move_score()) {
                let loss = centipawn_loss(best.pawns(), played.pawns(), color) as f64 * 100.0;
                total_cp_loss += loss.min(MAX_CP_LOSS);
                scored += 1;
            }
        }

        let acpl = if scored == 0 {
            0.0
        } else {
            total_cp_loss / scored as f64
        };

        Self {
            player: player.to_string(),
            moves: count,
            classifications,
            acpl,
            accuracy: calculate_accuracy(total_cp_loss, scored),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GameReport {
    pub headers: GameHeaders,
    pub white: SideReport,
    pub black: SideReport,
    pub moves: Vec<MoveRecord>,
}

impl GameReport {
    pub fn from_timeline(timeline: &GameTimeline) -> Self {
        let headers = timeline.headers().clone();
        Self {
            white: SideReport::build(&headers.white, Color::White, timeline.moves()),
            black: SideReport::build(&headers.black, Color::Black, timeline.moves()),
            moves: timeline.moves().to_vec(),
            headers,
        }
    }
}
