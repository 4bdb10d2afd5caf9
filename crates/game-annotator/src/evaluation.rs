//! Engine evaluations in one fixed orientation.

use chess::Color;
use serde::{Deserialize, Serialize};

/// Pawn value given to a forced mate; shorter mates score higher.
pub const MATE_PAWNS: f32 = 100.0;

/// Raw score as the engine reports it, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawScore {
    Centipawns(i32),
    Mate(i32),
}

/// A position evaluation, always from White's point of view (positive =
/// White is better), never relative to the side to move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Pawns; mates map to roughly ±100
    pub score: f32,
    /// Mate distance, positive when White mates
    pub mate: Option<i32>,
    /// More updates for the same search are coming
    pub loading: bool,
    pub error: Option<String>,
}

impl Evaluation {
    /// A settled centipawn-style evaluation, already canonical.
    pub fn score(pawns: f32) -> Self {
        Self {
            score: pawns,
            mate: None,
            loading: false,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            mate: None,
            loading: false,
            error: Some(message.into()),
        }
    }

    /// Convert an engine score to canonical orientation. The engine speaks
    /// for the side to move, so Black-to-move scores are negated.
    pub fn from_engine(raw: RawScore, side_to_move: Color) -> Self {
        let sign = match side_to_move {
            Color::White => 1,
            Color::Black => -1,
        };
        match raw {
            RawScore::Centipawns(cp) => Self {
                score: cp.saturating_mul(sign) as f32 / 100.0,
                mate: None,
                loading: true,
                error: None,
            },
            RawScore::Mate(m) => {
                // "mate 0" means the side to move is already mated
                let relative = if m > 0 {
                    MATE_PAWNS - m as f32 / 10.0
                } else {
                    -MATE_PAWNS - m as f32 / 10.0
                };
                Self {
                    score: sign as f32 * relative,
                    mate: Some(m.saturating_mul(sign)),
                    loading: true,
                    error: None,
                }
            }
        }
    }

    pub fn settled(mut self) -> Self {
        self.loading = false;
        self
    }

    pub fn is_mate(&self) -> bool {
        self.mate.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Score in pawns, mates included
    pub fn pawns(&self) -> f32 {
        self.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_to_move_is_negated() {
        for cp in [-350, -20, 0, 15, 480] {
            let white = Evaluation::from_engine(RawScore::Centipawns(cp), Color::White);
            let black = Evaluation::from_engine(RawScore::Centipawns(cp), Color::Black);
            assert_eq!(white.score, cp as f32 / 100.0);
            assert_eq!(black.score, -(cp as f32) / 100.0);
        }
    }

    #[test]
    fn test_mate_orientation() {
        let white_mates = Evaluation::from_engine(RawScore::Mate(3), Color::White);
        assert_eq!(white_mates.mate, Some(3));
        assert!(white_mates.score > 99.0);

        // Black to move and mating: bad for White
        let black_mates = Evaluation::from_engine(RawScore::Mate(2), Color::Black);
        assert_eq!(black_mates.mate, Some(-2));
        assert!(black_mates.score < -99.0);

        // Black to move and already mated: good for White
        let mated = Evaluation::from_engine(RawScore::Mate(0), Color::Black);
        assert_eq!(mated.score, MATE_PAWNS);
    }

    #[test]
    fn test_shorter_mate_scores_higher() {
        let m1 = Evaluation::from_engine(RawScore::Mate(1), Color::White);
        let m5 = Evaluation::from_engine(RawScore::Mate(5), Color::White);
        assert!(m1.pawns() > m5.pawns());
    }

    #[test]
    fn test_settled_and_error() {
        let eval = Evaluation::score(1.5);
        assert!(!eval.loading);
        assert!(Evaluation::from_engine(RawScore::Centipawns(10), Color::White).loading);
        assert!(!Evaluation::from_engine(RawScore::Centipawns(10), Color::White).settled().loading);
        assert!(Evaluation::error("bad").is_error());
    }

    #[test]
    fn test_extreme_scores_do_not_overflow() {
        let eval = Evaluation::from_engine(RawScore::Centipawns(i32::MIN), Color::Black);
        assert_eq!(eval.score, i32::MAX as f32 / 100.0);

        let eval = Evaluation::from_engine(RawScore::Mate(i32::MIN), Color::Black);
        assert_eq!(eval.mate, Some(i32::MAX));
    }
}
