//! UCI line protocol: outbound commands and inbound line parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::evaluation::RawScore;

static SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^info\s.*?\bdepth (\d+)\b.*?\bscore (cp|mate) (-?\d+)\b").unwrap()
});

/// One inbound engine line, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLine {
    UciOk,
    ReadyOk,
    /// A scored search update
    Info { depth: u32, score: RawScore },
    /// An `info ... score` line that does not parse
    Malformed(String),
    BestMove(String),
    /// Everything else (`id`, `option`, unscored `info`, `info string` ...)
    Other,
}

pub fn parse_line(line: &str) -> EngineLine {
    let line = line.trim();
    match line {
        "uciok" => return EngineLine::UciOk,
        "readyok" => return EngineLine::ReadyOk,
        _ => {}
    }

    if let Some(rest) = line.strip_prefix("bestmove") {
        return match rest.split_whitespace().next() {
            Some(mv) => EngineLine::BestMove(mv.to_string()),
            None => EngineLine::Malformed(line.to_string()),
        };
    }

    if !line.starts_with("info") || line.starts_with("info string") || !line.contains(" score ") {
        return EngineLine::Other;
    }

    let Some(cap) = SCORE_RE.captures(line) else {
        return EngineLine::Malformed(line.to_string());
    };
    let (Ok(depth), Ok(value)) = (cap[1].parse::<u32>(), cap[3].parse::<i32>()) else {
        return EngineLine::Malformed(line.to_string());
    };
    let score = match &cap[2] {
        "mate" => RawScore::Mate(value),
        _ => RawScore::Centipawns(value),
    };

    EngineLine::Info { depth, score }
}

pub fn position_command(fen: &str) -> String {
    format!("position fen {fen}")
}

pub fn go_command(depth: u32, searchmoves: Option<&str>) -> String {
    match searchmoves {
        Some(mv) => format!("go depth {depth} searchmoves {mv}"),
        None => format!("go depth {depth}"),
    }
}
