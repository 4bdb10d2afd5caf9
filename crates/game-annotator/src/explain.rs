//! Heuristic one-line explanations for moves.
//!
//! Best effort only: the first matching pattern wins and false negatives are
//! expected. No search is involved.

use chess::{Color, Piece};

use crate::game_state::piece_value;
use crate::rules::{AppliedMove, BoardGrid, Rules};

const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// Net gain (in pawns) needed before a capture reads as winning material
const MATERIAL_SWING_MIN: f32 = 1.0;

pub struct ExplanationGenerator<'a, R> {
    rules: &'a R,
}

impl<'a, R: Rules> ExplanationGenerator<'a, R> {
    pub fn new(rules: &'a R) -> Self {
        Self { rules }
    }

    /// Describe `mv`, already applied to produce `mv.fen_after`.
    pub fn explain(&self, mv: &AppliedMove) -> String {
        let after = mv.fen_after.as_str();

        if self.rules.is_checkmate(after).unwrap_or(false) {
            return format!("{} delivers checkmate.", mv.san);
        }
        if let Some(promoted) = mv.promotion {
            return format!("{} promotes the pawn to a {}.", mv.san, piece_name(promoted));
        }
        if mv.is_castle {
            let wing = if mv.to.starts_with('g') { "kingside" } else { "queenside" };
            return format!("{} castles {wing}.", side_name(mv.mover));
        }
        if let Some(text) = self.material_swing(mv) {
            return text;
        }
        if let Some(text) = self.knight_fork(mv) {
            return text;
        }
        if let Some(text) = pin(mv).or_else(|| skewer(mv)).or_else(|| discovered_attack(mv)) {
            return text;
        }
        if let Some(captured) = mv.captured {
            if mv.is_en_passant {
                return format!("{} captures the pawn en passant.", mv.san);
            }
            return format!("{} captures the {} on {}.", mv.san, piece_name(captured), mv.to);
        }
        if self.rules.in_check(after).unwrap_or(false) {
            return format!("{} gives check.", mv.san);
        }
        fallback(mv)
    }

    /// A capture that wins material even if the capturing piece is taken back.
    fn material_swing(&self, mv: &AppliedMove) -> Option<String> {
        let captured = mv.captured?;
        let gained = piece_value(captured);
        let at_risk = if self.can_recapture(mv) {
            piece_value(mv.piece)
        } else {
            0.0
        };
        let net = gained - at_risk;
        if net < MATERIAL_SWING_MIN {
            return None;
        }
        Some(format!(
            "{} wins material: the {} on {} is worth about {} points.",
            side_name(mv.mover),
            piece_name(captured),
            mv.to,
            net.round() as i32
        ))
    }

    fn can_recapture(&self, mv: &AppliedMove) -> bool {
        self.rules
            .legal_moves(&mv.fen_after)
            .map(|moves| moves.iter().any(|m| m.get(2..4) == Some(mv.to.as_str())))
            .unwrap_or(false)
    }

    /// A knight landing where it attacks two of king, queen and rook.
    fn knight_fork(&self, mv: &AppliedMove) -> Option<String> {
        if mv.piece != Piece::Knight {
            return None;
        }
        let grid = self.rules.board(&mv.fen_after).ok()?;
        let targets = knight_targets(&grid, &mv.to, !mv.mover);
        if targets.len() < 2 {
            return None;
        }
        let names: Vec<&str> = targets.iter().map(|p| piece_name(*p)).collect();
        Some(format!(
            "The knight on {} forks the {}.",
            mv.to,
            join_names(&names)
        ))
    }
}

/// King, queen and rooks of `victim` attacked by a knight on `square`.
fn knight_targets(grid: &BoardGrid, square: &str, victim: Color) -> Vec<Piece> {
    let Some((file, rank)) = square_coords(square) else {
        return Vec::new();
    };
    let mut hits: Vec<Piece> = KNIGHT_JUMPS
        .iter()
        .filter_map(|(df, dr)| {
            let f = file + df;
            let r = rank + dr;
            if !(0..8).contains(&f) || !(0..8).contains(&r) {
                return None;
            }
            match grid[r as usize][f as usize] {
                Some((piece, color))
                    if color == victim
                        && matches!(piece, Piece::King | Piece::Queen | Piece::Rook) =>
                {
                    Some(piece)
                }
                _ => None,
            }
        })
        .collect();
    hits.sort_by_key(|p| match p {
        Piece::King => 0,
        Piece::Queen => 1,
        _ => 2,
    });
    hits
}

// Line tactics are not detected yet.
fn pin(_mv: &AppliedMove) -> Option<String> {
    None
}

fn skewer(_mv: &AppliedMove) -> Option<String> {
    None
}

fn discovered_attack(_mv: &AppliedMove) -> Option<String> {
    None
}

fn fallback(mv: &AppliedMove) -> String {
    match mv.piece {
        Piece::Pawn => format!("{} advances the pawn to {}.", mv.san, mv.to),
        Piece::Knight => format!("{} brings the knight to {}.", mv.san, mv.to),
        Piece::Bishop => format!("{} places the bishop on {}.", mv.san, mv.to),
        Piece::Rook => format!("{} moves the rook to {}.", mv.san, mv.to),
        Piece::Queen => format!("{} activates the queen on {}.", mv.san, mv.to),
        Piece::King => format!("{} steps the king to {}.", mv.san, mv.to),
    }
}

fn square_coords(square: &str) -> Option<(i8, i8)> {
    let bytes = square.as_bytes();
    let file = *bytes.first()?;
    let rank = *bytes.get(1)?;
    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return None;
    }
    Some(((file - b'a') as i8, (rank - b'1') as i8))
}

fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

pub fn piece_name(piece: Piece) -> &'static str {
    match piece {
        Piece::Pawn => "pawn",
        Piece::Knight => "knight",
        Piece::Bishop => "bishop",
        Piece::Rook => "rook",
        Piece::Queen => "queen",
        Piece::King => "king",
    }
}

pub fn side_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ChessRules;
    use chess_core::{MoveDescriptor, STANDARD_START_FEN};

    fn explain(fen: &str, san: &str) -> String {
        let applied = ChessRules.apply(fen, &MoveDescriptor::san(san)).unwrap();
        ExplanationGenerator::new(&ChessRules).explain(&applied)
    }

    #[test]
    fn test_checkmate_wins_over_everything() {
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";
        assert_eq!(explain(fen, "Qh4#"), "Qh4# delivers checkmate.");
    }

    #[test]
    fn test_promotion() {
        let fen = "8/4P1k1/8/8/8/8/8/4K3 w - - 0 1";
        assert_eq!(explain(fen, "e8=N"), "e8=N promotes the pawn to a knight.");
    }

    #[test]
    fn test_castling() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1";
        assert_eq!(explain(fen, "O-O-O"), "Black castles queenside.");
    }

    #[test]
    fn test_material_swing_on_undefended_piece() {
        // Rook takes a queen nobody can recapture
        let fen = "4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1";
        let text = explain(fen, "Rxd5");
        assert!(text.starts_with("White wins material"), "{text}");
        assert!(text.contains("queen on d5"));
    }

    #[test]
    fn test_even_trade_is_plain_capture() {
        // Knight takes a knight that the pawn recaptures
        let fen = "4k3/8/2p5/3n4/8/4N3/8/4K3 w - - 0 1";
        assert_eq!(explain(fen, "Nxd5"), "Nxd5 captures the knight on d5.");
    }

    #[test]
    fn test_knight_fork() {
        let fen = "r3k3/8/8/1N6/8/8/8/4K3 w - - 0 1";
        assert_eq!(explain(fen, "Nc7+"), "The knight on c7 forks the king and rook.");
    }

    #[test]
    fn test_check_and_fallbacks() {
        let fen = "4k3/8/8/8/8/8/8/R3K3 w - - 0 1";
        assert_eq!(explain(fen, "Ra8+"), "Ra8+ gives check.");
        assert_eq!(explain(STANDARD_START_FEN, "e4"), "e4 advances the pawn to e4.");
        assert_eq!(explain(STANDARD_START_FEN, "Nf3"), "Nf3 brings the knight to f3.");
    }

    #[test]
    fn test_en_passant_capture() {
        // The king can take back, so this is no material swing
        let fen = "8/4k3/8/3pP3/8/8/8/4K3 w - d6 0 2";
        let text = explain(fen, "exd6");
        assert_eq!(text, "exd6 captures the pawn en passant.");
    }

    #[test]
    fn test_join_names() {
        assert_eq!(join_names(&["king", "queen", "rook"]), "king, queen and rook");
        assert_eq!(join_names(&["queen"]), "queen");
    }
}
