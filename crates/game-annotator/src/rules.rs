//! Rules collaborator: legality, check/mate and board layout for a FEN.
//!
//! The annotator only talks to the rules through [`Rules`]; [`ChessRules`] is
//! the default adapter on top of the `chess` crate. That crate does not track
//! move counters, so the adapter carries them through by hand.

use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Color, File, MoveGen, Piece, Rank, Square};
use chess_core::MoveDescriptor;

use crate::error::AnnotatorError;

/// Board layout indexed `[rank][file]`, rank 0 = first rank, file 0 = a-file.
pub type BoardGrid = [[Option<(Piece, Color)>; 8]; 8];

/// Everything replay and explanation need to know about one applied move.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMove {
    pub from: String,
    pub to: String,
    /// Long algebraic form as the engine speaks it, e.g. "e7e8q"
    pub uci: String,
    pub san: String,
    pub piece: Piece,
    pub mover: Color,
    pub captured: Option<Piece>,
    pub promotion: Option<Piece>,
    pub is_castle: bool,
    pub is_en_passant: bool,
    pub fen_after: String,
}

pub trait Rules {
    /// Apply a descriptor to a position. Errors with `IllegalMove` when the
    /// descriptor does not resolve to a legal move.
    fn apply(&self, fen: &str, mv: &MoveDescriptor) -> Result<AppliedMove, AnnotatorError>;

    fn board(&self, fen: &str) -> Result<BoardGrid, AnnotatorError>;

    fn turn(&self, fen: &str) -> Result<Color, AnnotatorError>;

    fn in_check(&self, fen: &str) -> Result<bool, AnnotatorError>;

    fn is_checkmate(&self, fen: &str) -> Result<bool, AnnotatorError>;

    /// Legal moves in UCI notation
    fn legal_moves(&self, fen: &str) -> Result<Vec<String>, AnnotatorError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChessRules;

impl ChessRules {
    fn parse(fen: &str) -> Result<Board, AnnotatorError> {
        Board::from_str(fen.trim()).map_err(|_| AnnotatorError::InvalidFen(fen.to_string()))
    }

    fn resolve(board: &Board, mv: &MoveDescriptor) -> Option<ChessMove> {
        if !mv.san.is_empty() {
            if let Some(m) = find_san_move(board, &mv.san) {
                return Some(m);
            }
        }

        let from = Square::from_str(mv.from.as_deref()?).ok()?;
        let to = Square::from_str(mv.to.as_deref()?).ok()?;
        let promotion = match mv.promotion {
            Some(c) => Some(promotion_piece(c)?),
            None => None,
        };
        let m = ChessMove::new(from, to, promotion);
        board.legal(m).then_some(m)
    }
}

impl Rules for ChessRules {
    fn apply(&self, fen: &str, mv: &MoveDescriptor) -> Result<AppliedMove, AnnotatorError> {
        let board = Self::parse(fen)?;
        let chess_move = Self::resolve(&board, mv).ok_or_else(|| AnnotatorError::IllegalMove {
            san: describe(mv),
            fen: fen.to_string(),
        })?;

        let src = chess_move.get_source();
        let dst = chess_move.get_dest();
        let piece = board.piece_on(src).ok_or_else(|| AnnotatorError::IllegalMove {
            san: describe(mv),
            fen: fen.to_string(),
        })?;
        let mover = board.side_to_move();

        let is_en_passant =
            piece == Piece::Pawn && src.get_file() != dst.get_file() && board.piece_on(dst).is_none();
        let captured = if is_en_passant {
            Some(Piece::Pawn)
        } else {
            board.piece_on(dst)
        };
        let is_castle = piece == Piece::King && file_distance(src, dst) == 2;

        let after = board.make_move_new(chess_move);
        let (halfmove, fullmove) = counters(fen);
        let halfmove = if piece == Piece::Pawn || captured.is_some() {
            0
        } else {
            halfmove + 1
        };
        let fullmove = if mover == Color::Black { fullmove + 1 } else { fullmove };

        Ok(AppliedMove {
            from: src.to_string(),
            to: dst.to_string(),
            uci: uci_string(chess_move),
            san: if mv.san.is_empty() {
                san_for(&board, chess_move)
            } else {
                mv.san.clone()
            },
            piece,
            mover,
            captured,
            promotion: chess_move.get_promotion(),
            is_castle,
            is_en_passant,
            fen_after: with_counters(&after, halfmove, fullmove),
        })
    }

    fn board(&self, fen: &str) -> Result<BoardGrid, AnnotatorError> {
        let board = Self::parse(fen)?;
        let mut grid: BoardGrid = [[None; 8]; 8];
        for (rank, row) in grid.iter_mut().enumerate() {
            for (file, cell) in row.iter_mut().enumerate() {
                let sq = Square::make_square(Rank::from_index(rank), File::from_index(file));
                *cell = board.piece_on(sq).zip(board.color_on(sq));
            }
        }
        Ok(grid)
    }

    fn turn(&self, fen: &str) -> Result<Color, AnnotatorError> {
        Ok(Self::parse(fen)?.side_to_move())
    }

    fn in_check(&self, fen: &str) -> Result<bool, AnnotatorError> {
        Ok(Self::parse(fen)?.checkers().popcnt() > 0)
    }

    fn is_checkmate(&self, fen: &str) -> Result<bool, AnnotatorError> {
        Ok(Self::parse(fen)?.status() == BoardStatus::Checkmate)
    }

    fn legal_moves(&self, fen: &str) -> Result<Vec<String>, AnnotatorError> {
        let board = Self::parse(fen)?;
        Ok(MoveGen::new_legal(&board).map(uci_string).collect())
    }
}

/// Side to move straight from the FEN text, without validating the board.
pub fn fen_side_to_move(fen: &str) -> Option<Color> {
    match fen.split_whitespace().nth(1)? {
        "w" => Some(Color::White),
        "b" => Some(Color::Black),
        _ => None,
    }
}

fn describe(mv: &MoveDescriptor) -> String {
    if !mv.san.is_empty() {
        return mv.san.clone();
    }
    format!(
        "{}{}",
        mv.from.as_deref().unwrap_or("?"),
        mv.to.as_deref().unwrap_or("?")
    )
}

fn counters(fen: &str) -> (u32, u32) {
    let mut parts = fen.split_whitespace().skip(4);
    let halfmove = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    let fullmove = parts.next().and_then(|v| v.parse().ok()).unwrap_or(1);
    (halfmove, fullmove.max(1))
}

fn with_counters(board: &Board, halfmove: u32, fullmove: u32) -> String {
    let rendered = board.to_string();
    let head: Vec<&str> = rendered.split_whitespace().take(4).collect();
    format!("{} {} {}", head.join(" "), halfmove, fullmove)
}

fn file_distance(a: Square, b: Square) -> usize {
    a.get_file().to_index().abs_diff(b.get_file().to_index())
}

fn promotion_piece(c: char) -> Option<Piece> {
    match c.to_ascii_lowercase() {
        'q' => Some(Piece::Queen),
        'r' => Some(Piece::Rook),
        'b' => Some(Piece::Bishop),
        'n' => Some(Piece::Knight),
        _ => None,
    }
}

fn piece_letter(piece: Piece) -> &'static str {
    match piece {
        Piece::King => "K",
        Piece::Queen => "Q",
        Piece::Rook => "R",
        Piece::Bishop => "B",
        Piece::Knight => "N",
        Piece::Pawn => "",
    }
}

pub fn uci_string(m: ChessMove) -> String {
    format!(
        "{}{}{}",
        m.get_source(),
        m.get_dest(),
        m.get_promotion()
            .map(|p| match p {
                Piece::Queen => "q",
                Piece::Rook => "r",
                Piece::Bishop => "b",
                Piece::Knight => "n",
                _ => "",
            })
            .unwrap_or("")
    )
}

/// Render a legal move in SAN, including check and mate suffixes.
pub fn san_for(board: &Board, m: ChessMove) -> String {
    let src = m.get_source();
    let dst = m.get_dest();
    let piece = match board.piece_on(src) {
        Some(p) => p,
        None => return uci_string(m),
    };

    let mut san = if piece == Piece::King && file_distance(src, dst) == 2 {
        if dst.get_file().to_index() > src.get_file().to_index() {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        }
    } else {
        let is_capture = board.piece_on(dst).is_some()
            || (piece == Piece::Pawn && src.get_file() != dst.get_file());
        let mut s = String::from(piece_letter(piece));

        if piece == Piece::Pawn {
            if is_capture {
                s.push((b'a' + src.get_file().to_index() as u8) as char);
            }
        } else {
            let rivals: Vec<Square> = MoveGen::new_legal(board)
                .filter(|o| {
                    o.get_dest() == dst
                        && o.get_source() != src
                        && board.piece_on(o.get_source()) == Some(piece)
                })
                .map(|o| o.get_source())
                .collect();
            if !rivals.is_empty() {
                let file_clash = rivals.iter().any(|r| r.get_file() == src.get_file());
                let rank_clash = rivals.iter().any(|r| r.get_rank() == src.get_rank());
                let file_char = (b'a' + src.get_file().to_index() as u8) as char;
                let rank_char = (b'1' + src.get_rank().to_index() as u8) as char;
                if !file_clash {
                    s.push(file_char);
                } else if !rank_clash {
                    s.push(rank_char);
                } else {
                    s.push(file_char);
                    s.push(rank_char);
                }
            }
        }

        if is_capture {
            s.push('x');
        }
        s.push_str(&dst.to_string());
        if let Some(p) = m.get_promotion() {
            s.push('=');
            s.push_str(piece_letter(p));
        }
        s
    };

    let after = board.make_move_new(m);
    if after.status() == BoardStatus::Checkmate {
        san.push('#');
    } else if after.checkers().popcnt() > 0 {
        san.push('+');
    }
    san
}

/// Find the legal move matching a SAN string
pub fn find_san_move(board: &Board, san: &str) -> Option<ChessMove> {
    let clean = san.trim_end_matches(|c: char| c == '+' || c == '#' || c == '!' || c == '?');

    let legal_moves: Vec<ChessMove> = MoveGen::new_legal(board).collect();

    let castle_side = match clean {
        "O-O" | "0-0" => Some(true),
        "O-O-O" | "0-0-0" => Some(false),
        _ => None,
    };
    if let Some(kingside) = castle_side {
        return legal_moves.into_iter().find(|m| {
            let src = m.get_source().get_file().to_index();
            let dst = m.get_dest().get_file().to_index();
            board.piece_on(m.get_source()) == Some(Piece::King)
                && src.abs_diff(dst) == 2
                && (dst > src) == kingside
        });
    }

    let bytes = clean.as_bytes();
    let first = *bytes.first()?;

    let (piece, rest) = if first.is_ascii_uppercase() {
        let p = match first {
            b'K' => Piece::King,
            b'Q' => Piece::Queen,
            b'R' => Piece::Rook,
            b'B' => Piece::Bishop,
            b'N' => Piece::Knight,
            _ => return None,
        };
        (p, &clean[1..])
    } else {
        (Piece::Pawn, clean)
    };

    // Promotion, with or without '='
    let (rest, promotion) = match rest.find('=') {
        Some(eq_pos) => (&rest[..eq_pos], promotion_piece(*rest.as_bytes().get(eq_pos + 1)? as char)),
        None => match rest.chars().last() {
            Some(c) if piece == Piece::Pawn && "QRBN".contains(c) => {
                (&rest[..rest.len() - 1], promotion_piece(c))
            }
            _ => (rest, None),
        },
    };

    let rest = rest.replace('x', "");
    let rest_bytes = rest.as_bytes();
    if rest_bytes.len() < 2 {
        return None;
    }

    let dest_file = rest_bytes[rest_bytes.len() - 2];
    let dest_rank = rest_bytes[rest_bytes.len() - 1];
    if !(b'a'..=b'h').contains(&dest_file) || !(b'1'..=b'8').contains(&dest_rank) {
        return None;
    }
    let dest = Square::make_square(
        Rank::from_index((dest_rank - b'1') as usize),
        File::from_index((dest_file - b'a') as usize),
    );

    let disambig = &rest_bytes[..rest_bytes.len() - 2];

    let candidates: Vec<ChessMove> = legal_moves
        .into_iter()
        .filter(|m| {
            m.get_dest() == dest
                && board.piece_on(m.get_source()) == Some(piece)
                && m.get_promotion() == promotion
        })
        .filter(|m| {
            let src = m.get_source();
            disambig.iter().all(|&b| match b {
                b'a'..=b'h' => src.get_file().to_index() == (b - b'a') as usize,
                b'1'..=b'8' => src.get_rank().to_index() == (b - b'1') as usize,
                _ => false,
            })
        })
        .collect();

    match candidates.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}
