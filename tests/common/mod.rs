//! Shared helpers for integration tests: an in-memory UCI engine and quick
//! game builders.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chess_core::{GameHeaders, MoveDescriptor, STANDARD_START_FEN};
use game_annotator::{ChessRules, EngineSession, GameTimeline, ReplayBuilder};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub const DEBOUNCE: Duration = Duration::from_millis(250);

/// Answer for one `go`: (bestmove, score in centipawns for the side to move).
pub type Oracle = Arc<dyn Fn(&str, Option<&str>) -> (String, i32) + Send + Sync>;

/// Every command the fake engine received.
#[derive(Clone, Default)]
pub struct Commands(Arc<Mutex<Vec<String>>>);

impl Commands {
    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn starting_with(&self, prefix: &str) -> Vec<String> {
        self.all().into_iter().filter(|c| c.starts_with(prefix)).collect()
    }
}

/// Start a session against a fake engine that answers each `go` with one
/// scored `info` line and a `bestmove`, as `oracle` decides.
pub async fn fake_session(oracle: Oracle) -> (EngineSession, Commands) {
    let (client, engine) = tokio::io::duplex(64 * 1024);
    let (client_r, client_w) = tokio::io::split(client);
    let (engine_r, mut engine_w) = tokio::io::split(engine);
    let commands = Commands::default();
    let log = commands.clone();

    tokio::spawn(async move {
        let mut lines = BufReader::new(engine_r).lines();
        let mut fen = String::new();
        while let Ok(Some(cmd)) = lines.next_line().await {
            log.0.lock().unwrap().push(cmd.clone());
            let reply = if cmd == "uci" {
                "id name Oracle\nuciok\n".to_string()
            } else if cmd == "isready" {
                "readyok\n".to_string()
            } else if let Some(f) = cmd.strip_prefix("position fen ") {
                fen = f.to_string();
                continue;
            } else if cmd.starts_with("go") {
                let searchmoves = cmd.split(" searchmoves ").nth(1);
                let (best, cp) = oracle(&fen, searchmoves);
                format!("info depth 10 seldepth 12 score cp {cp} nodes 5000 pv {best}\nbestmove {best}\n")
            } else if cmd == "quit" {
                break;
            } else {
                continue;
            };
            if engine_w.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let session = EngineSession::start_with_io(client_r, client_w, DEBOUNCE)
        .await
        .expect("handshake with fake engine");
    (session, commands)
}

pub fn descriptors(sans: &[&str]) -> Vec<MoveDescriptor> {
    sans.iter().map(|s| MoveDescriptor::san(s)).collect()
}

/// Replay SAN moves from the standard start.
pub fn replay(sans: &[&str]) -> GameTimeline {
    ReplayBuilder::new(&ChessRules)
        .build(GameHeaders::default(), STANDARD_START_FEN, &descriptors(sans))
        .expect("valid start position")
}
