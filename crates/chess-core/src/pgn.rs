//! PGN parsing utilities: a lightweight regex-based parser.
//!
//! Produces headers plus a flat list of mainline move descriptors. Variations
//! are skipped, comments attach to the move they follow.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ImportFormatError;
use crate::game_data::{GameHeaders, ImportedGame, MoveDescriptor, STANDARD_START_FEN};

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).unwrap());

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\{(?P<comment>[^}]*)\}",
        r"|;(?P<line_comment>[^\n]*)",
        r"|(?P<open>\()",
        r"|(?P<close>\))",
        r"|(?P<number>\d+\.(?:\.\.)?)",
        r"|(?P<result>1-0|0-1|1/2-1/2|\*)",
        r"|(?P<nag>\$\d+)",
        r"|(?P<san>(?:O-O-O|O-O|0-0-0|0-0|[KQRBN][a-h]?[1-8]?x?[a-h][1-8]|[a-h](?:x[a-h])?[1-8](?:=?[QRBN])?)[+#]?)[!?]*",
        r"|(?P<other>\S+)",
    ))
    .unwrap()
});

/// Parse a single-game PGN into headers and mainline move descriptors.
///
/// A game without moves is valid. Text that is empty, has unbalanced
/// comments/variations, or contains tokens that are not movetext is rejected
/// as a whole.
pub fn parse_pgn(pgn: &str) -> Result<ImportedGame, ImportFormatError> {
    if pgn.trim().is_empty() {
        return Err(ImportFormatError::Empty);
    }

    let headers = parse_headers(pgn);

    let movetext: String = pgn
        .lines()
        .filter(|line| !line.trim_start().starts_with('['))
        .collect::<Vec<_>>()
        .join("\n");

    let moves = parse_movetext(&movetext)?;

    Ok(ImportedGame { headers, moves })
}

fn parse_headers(pgn: &str) -> GameHeaders {
    let mut headers = GameHeaders {
        white: "Unknown".to_string(),
        black: "Unknown".to_string(),
        result: "*".to_string(),
        ..Default::default()
    };
    let mut setup = false;
    let mut fen = None;

    for cap in HEADER_RE.captures_iter(pgn) {
        let key = &cap[1];
        let value = cap[2].to_string();
        match key {
            "White" => headers.white = value,
            "Black" => headers.black = value,
            "Result" => headers.result = value,
            "Date" => headers.date = Some(value),
            "Event" => headers.event = Some(value),
            "ECO" => headers.eco = Some(value),
            "Opening" => headers.opening = Some(value),
            "SetUp" => setup = value == "1",
            "FEN" => fen = Some(value),
            _ => {}
        }
    }

    // Some exporters write FEN without SetUp; accept both
    if let Some(f) = fen {
        if setup || f != STANDARD_START_FEN {
            headers.fen = Some(f);
        }
    }

    headers
}

fn parse_movetext(text: &str) -> Result<Vec<MoveDescriptor>, ImportFormatError> {
    check_balance(text)?;

    let mut moves: Vec<MoveDescriptor> = Vec::new();
    let mut depth = 0usize;

    for cap in TOKEN_RE.captures_iter(text) {
        if cap.name("open").is_some() {
            depth += 1;
            continue;
        }
        if cap.name("close").is_some() {
            depth = depth.saturating_sub(1);
            continue;
        }
        if depth > 0 {
            continue;
        }

        if let Some(comment) = cap.name("comment").or_else(|| cap.name("line_comment")) {
            // Comments before the first move describe the game, not a move
            if let Some(last) = moves.last_mut() {
                last.comments.push(comment.as_str().trim().to_string());
            }
        } else if let Some(san) = cap.name("san") {
            moves.push(MoveDescriptor::san(san.as_str()));
        } else if let Some(other) = cap.name("other") {
            return Err(ImportFormatError::UnexpectedToken(other.as_str().to_string()));
        }
    }

    Ok(moves)
}

/// Comments cannot nest; variations can, but never inside a comment.
fn check_balance(text: &str) -> Result<(), ImportFormatError> {
    let mut in_comment = false;
    let mut parens = 0i32;

    for c in text.chars() {
        match c {
            '{' if in_comment => return Err(ImportFormatError::Unbalanced("comment")),
            '{' => in_comment = true,
            '}' if !in_comment => return Err(ImportFormatError::Unbalanced("comment")),
            '}' => in_comment = false,
            '(' if !in_comment => parens += 1,
            ')' if !in_comment => {
                parens -= 1;
                if parens < 0 {
                    return Err(ImportFormatError::Unbalanced("variation"));
                }
            }
            _ => {}
        }
    }

    if in_comment {
        return Err(ImportFormatError::Unbalanced("comment"));
    }
    if parens != 0 {
        return Err(ImportFormatError::Unbalanced("variation"));
    }
    Ok(())
}

/// Read a descriptor list produced by an external PGN reader.
pub fn parse_descriptors_json(json: &str) -> Result<Vec<MoveDescriptor>, ImportFormatError> {
    Ok(serde_json::from_str(json)?)
}
