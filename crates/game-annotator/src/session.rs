//! Long-lived engine session.
//!
//! The engine runs one search at a time and tags nothing, so a single actor
//! task owns the channel. Callers talk to it through [`EngineSession`]:
//!
//! - `evaluate` is debounced: only the last request inside the window reaches
//!   the engine, earlier streams end empty.
//! - switching targets sends `stop` first when a search is in flight.
//! - every `go` answers with exactly one `bestmove`; inbound lines belong to
//!   the oldest `go` still waiting for it, and lines for a superseded
//!   generation are dropped.
//! - once a target reports a mate, plain centipawn updates for it are ignored.
//! - scores are flipped to White's point of view when Black is to move.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use chess::Color;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::AnnotatorConfig;
use crate::error::EngineError;
use crate::evaluation::Evaluation;
use crate::rules::fen_side_to_move;
use crate::stockfish::{send_line, spawn_engine, UciChannel};
use crate::uci::{go_command, parse_line, position_command, EngineLine};

/// Scores for one played move against the engine's choice, both canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveSearchResult {
    pub best_move: String,
    pub best_score: Evaluation,
    pub played_score: Evaluation,
}

/// Two-phase best/played search, as the classification pipeline needs it.
pub trait MoveSearch {
    fn search_and_score_move(
        &self,
        fen: &str,
        uci_move: &str,
        depth: u32,
    ) -> impl Future<Output = Result<MoveSearchResult, EngineError>> + Send;
}

enum Command {
    Evaluate {
        fen: String,
        depth: u32,
        sink: mpsc::UnboundedSender<Evaluation>,
    },
    Search {
        fen: String,
        uci_move: String,
        depth: u32,
        reply: oneshot::Sender<Result<MoveSearchResult, EngineError>>,
    },
    Stop,
    Quit,
}

/// Updates for one `evaluate` request. Intermediate items have
/// `loading == true`; the stream closes after the final one, or without any
/// items when the request was superseded.
pub struct EvaluationStream {
    rx: mpsc::UnboundedReceiver<Evaluation>,
}

impl EvaluationStream {
    pub async fn next(&mut self) -> Option<Evaluation> {
        self.rx.recv().await
    }

    /// Drain the stream and return its last settled evaluation.
    pub async fn final_evaluation(mut self) -> Option<Evaluation> {
        let mut last = None;
        while let Some(eval) = self.rx.recv().await {
            if !eval.loading {
                last = Some(eval);
            }
        }
        last
    }

    /// Everything the stream yields until it closes.
    pub async fn collect(mut self) -> Vec<Evaluation> {
        let mut all = Vec::new();
        while let Some(eval) = self.rx.recv().await {
            all.push(eval);
        }
        all
    }
}

/// Handle to the session actor. Cheap to clone; the actor exits on
/// `dispose` or when every handle is gone.
#[derive(Clone)]
pub struct EngineSession {
    commands: mpsc::UnboundedSender<Command>,
}

impl EngineSession {
    /// Spawn the engine binary from config and start a session on it.
    pub async fn start(config: &AnnotatorConfig) -> Result<Self, EngineError> {
        let (child, stdout, stdin) = spawn_engine(&config.stockfish_path)?;
        info!(path = config.stockfish_path.as_str(), "Engine started");
        Self::launch(stdout, stdin, config.debounce(), Some(child)).await
    }

    /// Start a session over arbitrary I/O halves speaking UCI.
    pub async fn start_with_io<R, W>(reader: R, writer: W, debounce: Duration) -> Result<Self, EngineError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::launch(reader, writer, debounce, None).await
    }

    async fn launch<R, W>(
        reader: R,
        writer: W,
        debounce: Duration,
        child: Option<Child>,
    ) -> Result<Self, EngineError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut channel = UciChannel::new(reader, writer);
        channel.handshake().await?;
        let (reader, writer) = channel.into_parts();

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_lines(reader, line_tx));

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let actor = SessionActor {
            writer,
            commands: cmd_rx,
            lines: line_rx,
            debounce,
            pending: None,
            in_flight: None,
            outstanding: VecDeque::new(),
            generation: 0,
            engine_alive: true,
            child,
        };
        tokio::spawn(actor.run());

        Ok(Self { commands: cmd_tx })
    }

    /// Request a debounced evaluation of `fen` at `depth`.
    pub fn evaluate(&self, fen: &str, depth: u32) -> EvaluationStream {
        let (sink, rx) = mpsc::unbounded_channel();
        let cmd = Command::Evaluate {
            fen: fen.to_string(),
            depth,
            sink,
        };
        // A dead actor drops the sink, which closes the stream
        let _ = self.commands.send(cmd);
        EvaluationStream { rx }
    }

    /// Best move and its score, then the score of `uci_move`, at `depth`.
    /// Supersedes any live evaluation.
    pub async fn search_and_score_move(
        &self,
        fen: &str,
        uci_move: &str,
        depth: u32,
    ) -> Result<MoveSearchResult, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Search {
                fen: fen.to_string(),
                uci_move: uci_move.to_string(),
                depth,
                reply,
            })
            .map_err(|_| EngineError::Closed)?;
        rx.await.map_err(|_| EngineError::Closed)?
    }

    /// Abandon whatever is pending or in flight.
    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }

    /// Send `quit` and end the session.
    pub fn dispose(&self) {
        let _ = self.commands.send(Command::Quit);
    }
}

impl MoveSearch for EngineSession {
    fn search_and_score_move(
        &self,
        fen: &str,
        uci_move: &str,
        depth: u32,
    ) -> impl Future<Output = Result<MoveSearchResult, EngineError>> + Send {
        EngineSession::search_and_score_move(self, fen, uci_move, depth)
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: BufReader<R>, tx: mpsc::UnboundedSender<String>) {
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim().to_string();
                debug!(line = line.as_str(), "SF >");
                if tx.send(line).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Engine read failed");
                break;
            }
        }
    }
}

struct PendingEvaluation {
    fen: String,
    depth: u32,
    sink: mpsc::UnboundedSender<Evaluation>,
    deadline: Instant,
}

struct InFlight {
    generation: u64,
    fen: String,
    side: Color,
    depth: u32,
    mate_seen: bool,
    last: Option<Evaluation>,
    job: Job,
}

enum Job {
    Live {
        sink: mpsc::UnboundedSender<Evaluation>,
    },
    Search {
        uci_move: String,
        best: Option<(String, Evaluation)>,
        reply: oneshot::Sender<Result<MoveSearchResult, EngineError>>,
    },
}

struct SessionActor<W> {
    writer: W,
    commands: mpsc::UnboundedReceiver<Command>,
    lines: mpsc::UnboundedReceiver<String>,
    debounce: Duration,
    pending: Option<PendingEvaluation>,
    in_flight: Option<InFlight>,
    /// Generations of searches whose `bestmove` has not arrived, oldest first
    outstanding: VecDeque<u64>,
    generation: u64,
    engine_alive: bool,
    child: Option<Child>,
}

impl<W: AsyncWrite + Unpin> SessionActor<W> {
    async fn run(mut self) {
        loop {
            let deadline = self.pending.as_ref().map(|p| p.deadline);

            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Quit) | None => break,
                    Some(cmd) => self.handle_command(cmd).await,
                },
                line = self.lines.recv(), if self.engine_alive => match line {
                    Some(line) => self.handle_line(&line).await,
                    None => self.engine_gone(EngineError::Closed),
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.dispatch_pending().await;
                }
            }
        }

        self.shutdown().await;
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Evaluate { fen, depth, sink } => {
                if !self.engine_alive {
                    let _ = sink.send(Evaluation::error(EngineError::Closed.to_string()));
                    return;
                }
                if let Some(old) = self.pending.take() {
                    debug!(fen = old.fen.as_str(), "Evaluation superseded before dispatch");
                }
                self.pending = Some(PendingEvaluation {
                    fen,
                    depth,
                    sink,
                    deadline: Instant::now() + self.debounce,
                });
            }
            Command::Search {
                fen,
                uci_move,
                depth,
                reply,
            } => {
                if !self.engine_alive {
                    let _ = reply.send(Err(EngineError::Closed));
                    return;
                }
                self.pending = None;
                let job = Job::Search {
                    uci_move,
                    best: None,
                    reply,
                };
                self.begin(fen, depth, job).await;
            }
            Command::Stop => {
                self.pending = None;
                self.abandon_in_flight().await;
            }
            Command::Quit => {}
        }
    }

    async fn dispatch_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.sink.is_closed() {
            return;
        }
        self.begin(pending.fen, pending.depth, Job::Live { sink: pending.sink })
            .await;
    }

    /// Stop whatever runs and start searching `fen`.
    async fn begin(&mut self, fen: String, depth: u32, job: Job) {
        self.abandon_in_flight().await;

        let Some(side) = fen_side_to_move(&fen) else {
            let message = format!("cannot read side to move from FEN: {fen}");
            warn!(fen = fen.as_str(), "Rejecting evaluation target");
            match job {
                Job::Live { sink } => {
                    let _ = sink.send(Evaluation::error(message));
                }
                Job::Search { reply, .. } => {
                    let _ = reply.send(Err(EngineError::Protocol(message)));
                }
            }
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        let target = fen.clone();
        self.in_flight = Some(InFlight {
            generation,
            fen,
            side,
            depth,
            mate_seen: false,
            last: None,
            job,
        });
        self.send_search(generation, &target, &go_command(depth, None)).await;
    }

    async fn send_search(&mut self, generation: u64, fen: &str, go: &str) {
        debug!(generation, fen, go, "Starting search");
        let result = async {
            send_line(&mut self.writer, &position_command(fen)).await?;
            send_line(&mut self.writer, go).await
        }
        .await;

        match result {
            Ok(()) => self.outstanding.push_back(generation),
            Err(e) => self.engine_gone(e),
        }
    }

    /// Send `stop` for a running search and end its request without a result.
    async fn abandon_in_flight(&mut self) {
        let Some(flight) = self.in_flight.take() else {
            return;
        };
        debug!(generation = flight.generation, "Stopping superseded search");
        if let Job::Search { reply, .. } = flight.job {
            let _ = reply.send(Err(EngineError::Superseded));
        }
        if let Err(e) = send_line(&mut self.writer, "stop").await {
            self.engine_gone(e);
        }
    }

    async fn handle_line(&mut self, line: &str) {
        let parsed = parse_line(line);
        let owner = self.outstanding.front().copied();
        let current = self.in_flight.as_ref().map(|f| f.generation);
        let is_current = owner.is_some() && owner == current;

        match parsed {
            EngineLine::BestMove(mv) => {
                self.outstanding.pop_front();
                if is_current {
                    self.finish_phase(mv).await;
                } else {
                    debug!(?owner, bestmove = mv.as_str(), "Discarding stale bestmove");
                }
            }
            EngineLine::Info { score, depth, .. } if is_current => {
                let Some(flight) = self.in_flight.as_mut() else {
                    return;
                };
                let eval = Evaluation::from_engine(score, flight.side);
                if flight.mate_seen && !eval.is_mate() {
                    return;
                }
                flight.mate_seen |= eval.is_mate();
                debug!(depth, score = eval.score, mate = ?eval.mate, "Engine update");
                flight.last = Some(eval.clone());

                let closed = match &flight.job {
                    Job::Live { sink } => sink.send(eval).is_err(),
                    Job::Search { .. } => false,
                };
                if closed {
                    debug!("Evaluation stream dropped by caller");
                    self.abandon_in_flight().await;
                }
            }
            EngineLine::Malformed(text) if is_current => {
                warn!(line = text.as_str(), "Unparsable engine score line");
                if let Some(InFlight {
                    job: Job::Live { sink },
                    ..
                }) = self.in_flight.as_ref()
                {
                    let _ = sink.send(Evaluation::error(format!("unparsable engine line: {text}")));
                }
            }
            EngineLine::Info { .. } | EngineLine::Malformed(_) => {
                debug!(?owner, "Discarding stale engine line");
            }
            EngineLine::UciOk | EngineLine::ReadyOk | EngineLine::Other => {}
        }
    }

    /// `bestmove` for the current generation arrived.
    async fn finish_phase(&mut self, bestmove: String) {
        let Some(mut flight) = self.in_flight.take() else {
            return;
        };
        let settled = flight.last.take().map(Evaluation::settled);

        match flight.job {
            Job::Live { sink } => {
                let final_eval = settled
                    .unwrap_or_else(|| Evaluation::error("engine finished without a score"));
                let _ = sink.send(final_eval);
            }
            Job::Search {
                uci_move,
                best: None,
                reply,
            } => {
                let Some(best_score) = settled else {
                    let _ = reply.send(Err(EngineError::Protocol(
                        "engine finished without a score".into(),
                    )));
                    return;
                };
                let go = go_command(flight.depth, Some(&uci_move));
                let generation = flight.generation;
                let fen = flight.fen.clone();
                self.in_flight = Some(InFlight {
                    mate_seen: false,
                    last: None,
                    job: Job::Search {
                        uci_move,
                        best: Some((bestmove, best_score)),
                        reply,
                    },
                    ..flight
                });
                self.send_search(generation, &fen, &go).await;
            }
            Job::Search {
                best: Some((best_move, best_score)),
                reply,
                ..
            } => {
                let result = match settled {
                    Some(played_score) => Ok(MoveSearchResult {
                        best_move,
                        best_score,
                        played_score,
                    }),
                    None => Err(EngineError::Protocol("engine finished without a score".into())),
                };
                let _ = reply.send(result);
            }
        }
    }

    /// The engine stopped answering: fail everything that waits on it.
    fn engine_gone(&mut self, error: EngineError) {
        if self.engine_alive {
            warn!(error = %error, "Engine channel lost");
        }
        self.engine_alive = false;
        self.outstanding.clear();

        if let Some(pending) = self.pending.take() {
            let _ = pending.sink.send(Evaluation::error(error.to_string()));
        }
        if let Some(flight) = self.in_flight.take() {
            match flight.job {
                Job::Live { sink } => {
                    let _ = sink.send(Evaluation::error(error.to_string()));
                }
                Job::Search { reply, .. } => {
                    let _ = reply.send(Err(error));
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        self.pending = None;
        if self.engine_alive {
            let _ = send_line(&mut self.writer, "quit").await;
        }
        if let Some(mut child) = self.child.take() {
            match tokio::time::timeout(Duration::from_secs(2), child.wait()).await {
                Ok(_) => {}
                Err(_) => {
                    let _ = child.start_kill();
                }
            }
        }
        info!("Engine session closed");
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::{constant, fake_engine, Script};
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(250);
    const FEN_A: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const FEN_B: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    async fn session(script: Script) -> (EngineSession, super::testing::Transcript) {
        let (r, w, transcript) = fake_engine(script);
        let session = EngineSession::start_with_io(r, w, DEBOUNCE).await.unwrap();
        (session, transcript)
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_commands() {
        let (_session, transcript) = session(constant(20, "e2e4")).await;
        assert_eq!(
            transcript.commands(),
            vec!["uci", "setoption name MultiPV value 1", "isready"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluate_streams_then_settles() {
        let (session, transcript) = session(constant(35, "e2e4")).await;

        let all = session.evaluate(FEN_A, 15).collect().await;
        assert_eq!(all.len(), 3);
        assert!(all[0].loading && all[1].loading);
        assert!(!all[2].loading);
        assert_eq!(all[2].score, 0.35);

        let commands = transcript.commands();
        assert!(commands.contains(&format!("position fen {FEN_A}")));
        assert!(commands.contains(&"go depth 15".to_string()));
        // Nothing was in flight, so nothing to stop
        assert_eq!(transcript.count("stop"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_keeps_only_the_latest_request() {
        let (session, transcript) = session(constant(35, "e7e5")).await;

        let first = session.evaluate(FEN_A, 15);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = session.evaluate(FEN_B, 15);

        assert!(first.collect().await.is_empty());
        let final_eval = second.final_evaluation().await.unwrap();
        // Black to move: the engine's +0.35 is -0.35 for White
        assert_eq!(final_eval.score, -0.35);

        assert_eq!(transcript.count("go "), 1);
        assert!(!transcript.commands().contains(&format!("position fen {FEN_A}")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_black_to_move_is_negated() {
        let (session, _) = session(constant(-120, "e7e5")).await;
        let eval = session.evaluate(FEN_B, 12).final_evaluation().await.unwrap();
        assert_eq!(eval.score, 1.2);
        assert!(eval.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mate_suppresses_later_centipawn_updates() {
        let script: Script = Arc::new(|_: &str, _: Option<&str>| {
            vec![
                "info depth 1 score cp 300 pv d1h5".to_string(),
                "info depth 2 score mate 2 pv d1h5".to_string(),
                "info depth 3 score cp 900 pv d1h5".to_string(),
                "bestmove d1h5".to_string(),
            ]
        });
        let (session, _) = session(script).await;

        let all = session.evaluate(FEN_A, 15).collect().await;
        let last = all.last().unwrap();
        assert_eq!(last.mate, Some(2));
        assert!(!last.loading);
        assert!(all.iter().all(|e| e.score != 9.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_target_stops_and_discards_stale_lines() {
        let script: Script = Arc::new(|fen: &str, _: Option<&str>| {
            if fen.contains(" w ") {
                // Long search: the rest only arrives after `stop`
                vec![
                    "info depth 1 score cp 10 pv e2e4".to_string(),
                    "<hold>".to_string(),
                    "info depth 9 score cp 999 pv e2e4".to_string(),
                    "bestmove e2e4".to_string(),
                ]
            } else {
                vec![
                    "info depth 1 score cp 50 pv e7e5".to_string(),
                    "bestmove e7e5".to_string(),
                ]
            }
        });
        let (session, transcript) = session(script).await;

        let mut first = session.evaluate(FEN_A, 15);
        let update = first.next().await.unwrap();
        assert!(update.loading);

        let second = session.evaluate(FEN_B, 15);
        let all = second.collect().await;
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|e| e.score == -0.5));

        // The superseded stream ends without a settled value
        assert!(first.final_evaluation().await.is_none());

        let commands = transcript.commands();
        let stop_at = commands.iter().position(|c| c == "stop").unwrap();
        let position_b = commands
            .iter()
            .position(|c| c == &format!("position fen {FEN_B}"))
            .unwrap();
        assert!(stop_at < position_b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparsable_score_line_is_reported_not_fatal() {
        let script: Script = Arc::new(|_: &str, _: Option<&str>| {
            vec![
                "info depth 1 score cp ??? pv e2e4".to_string(),
                "info depth 2 score cp 15 pv e2e4".to_string(),
                "bestmove e2e4".to_string(),
            ]
        });
        let (session, _) = session(script).await;

        let all = session.evaluate(FEN_A, 15).collect().await;
        assert!(all[0].error.is_some());
        assert!(!all[0].loading);
        let last = all.last().unwrap();
        assert_eq!(last.score, 0.15);
        assert!(last.error.is_none());

        // Session keeps working
        let again = session.evaluate(FEN_A, 15).final_evaluation().await;
        assert!(again.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_side_to_move() {
        let (session, _) = session(constant(0, "e2e4")).await;
        let all = session.evaluate("8/8/8/8/8/8/8/K6k x - - 0 1", 10).collect().await;
        assert_eq!(all.len(), 1);
        assert!(all[0].is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_phase_search() {
        let script: Script = Arc::new(|_: &str, searchmoves: Option<&str>| match searchmoves {
            None => vec![
                "info depth 10 score cp 80 pv g1f3".to_string(),
                "bestmove g1f3".to_string(),
            ],
            Some(mv) => vec![
                format!("info depth 10 score cp -40 pv {mv}"),
                format!("bestmove {mv}"),
            ],
        });
        let (session, transcript) = session(script).await;

        let result = session.search_and_score_move(FEN_B, "a7a6", 10).await.unwrap();
        assert_eq!(result.best_move, "g1f3");
        assert_eq!(result.best_score.score, -0.8);
        assert_eq!(result.played_score.score, 0.4);
        assert!(!result.best_score.loading && !result.played_score.loading);

        let commands = transcript.commands();
        assert!(commands.contains(&"go depth 10".to_string()));
        assert!(commands.contains(&"go depth 10 searchmoves a7a6".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_supersedes_live_evaluation() {
        let script: Script = Arc::new(|fen: &str, searchmoves: Option<&str>| {
            if fen.contains(" b ") && searchmoves.is_none() {
                vec!["info depth 1 score cp 5 pv e7e5".to_string(), "<hold>".to_string(), "bestmove e7e5".to_string()]
            } else {
                let mv = searchmoves.unwrap_or("e2e4");
                vec![format!("info depth 1 score cp 20 pv {mv}"), format!("bestmove {mv}")]
            }
        });
        let (session, transcript) = session(script).await;

        let mut live = session.evaluate(FEN_B, 15);
        assert!(live.next().await.unwrap().loading);

        let result = session.search_and_score_move(FEN_A, "d2d4", 10).await.unwrap();
        assert_eq!(result.best_move, "e2e4");
        assert_eq!(result.played_score.score, 0.2);
        assert!(live.final_evaluation().await.is_none());
        assert_eq!(transcript.count("stop"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_exit_fails_pending_requests() {
        let script: Script = Arc::new(|_: &str, _: Option<&str>| {
            vec!["info depth 1 score cp 5 pv e2e4".to_string(), "<exit>".to_string()]
        });
        let (session, _) = session(script).await;

        let result = session.search_and_score_move(FEN_A, "e2e4", 10).await;
        assert_eq!(result, Err(EngineError::Closed));

        // Later requests fail fast instead of hanging
        let eval = session.evaluate(FEN_A, 10).final_evaluation().await.unwrap();
        assert!(eval.is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_ends_session() {
        let (session, transcript) = session(constant(0, "e2e4")).await;
        session.dispose();
        assert!(session.evaluate(FEN_A, 10).collect().await.is_empty());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(transcript.count("quit"), 1);
    }
}
