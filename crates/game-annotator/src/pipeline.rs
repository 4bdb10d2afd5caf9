//! Post-import classification: book first, then a two-phase engine search,
//! one move at a time.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::book::BookLookup;
use crate::classify::{centipawn_loss, classify, MoveClassification};
use crate::config::AnnotatorConfig;
use crate::error::AnnotatorError;
use crate::game_state::{is_forced, is_sacrifice, GameStateContext, MaterialCount};
use crate::rules::Rules;
use crate::session::MoveSearch;
use crate::timeline::{GameTimeline, MoveAnalysis};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub classify_depth: u32,
    /// Book lookups only while the full-move number is at most this
    pub book_max_moves: usize,
    pub engine_timeout: Duration,
    pub book_timeout: Duration,
}

impl From<&AnnotatorConfig> for PipelineOptions {
    fn from(config: &AnnotatorConfig) -> Self {
        Self {
            classify_depth: config.classify_depth,
            book_max_moves: config.book_max_moves,
            engine_timeout: config.engine_timeout(),
            book_timeout: config.book_timeout(),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&AnnotatorConfig::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub book: usize,
    pub engine: usize,
    /// Timed out or failed; left without a classification
    pub unclassified: usize,
    /// Already classified before the run
    pub kept: usize,
}

pub struct ClassificationPipeline<'a, S, B, R> {
    engine: &'a S,
    book: &'a B,
    rules: &'a R,
    options: PipelineOptions,
}

impl<'a, S, B, R> ClassificationPipeline<'a, S, B, R>
where
    S: MoveSearch,
    B: BookLookup,
    R: Rules,
{
    pub fn new(engine: &'a S, book: &'a B, rules: &'a R, options: PipelineOptions) -> Self {
        Self {
            engine,
            book,
            rules,
            options,
        }
    }

    /// Classify every move of `timeline` in order. A move that cannot be
    /// classified in time is skipped; the run never stalls on one move.
    pub async fn run(&self, timeline: &mut GameTimeline) -> PipelineSummary {
        let mut summary = PipelineSummary::default();

        for index in 0..timeline.len() {
            if timeline.moves()[index].classification().is_some() {
                summary.kept += 1;
                continue;
            }

            match self.analyze_move(timeline, index).await {
                Ok(analysis) => {
                    let kind = analysis.classification.kind;
                    if timeline.record_analysis(index, analysis) {
                        debug!(index, classification = %kind, "Move classified");
                        if kind == MoveClassification::Book {
                            summary.book += 1;
                        } else {
                            summary.engine += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(index, error = %e, "Move left unclassified");
                    summary.unclassified += 1;
                }
            }
        }

        info!(
            book = summary.book,
            engine = summary.engine,
            unclassified = summary.unclassified,
            "Classification finished"
        );
        summary
    }

    async fn analyze_move(&self, timeline: &GameTimeline, index: usize) -> Result<MoveAnalysis, AnnotatorError> {
        let record = &timeline.moves()[index];
        let fen_before = timeline.positions()[index].as_str();
        let fen_after = record.resulting_fen.as_str();

        if fullmove_number(fen_before) <= self.options.book_max_moves {
            match timeout(self.options.book_timeout, self.book.lookup(fen_before, &record.san)).await {
                Ok(Ok(Some(hit))) => return Ok(MoveAnalysis::book(hit.opening_name)),
                Ok(Ok(None)) => {}
                Ok(Err(e)) => debug!(index, error = %e, "Book lookup failed, treating as not book"),
                Err(_) => debug!(index, "Book lookup timed out, treating as not book"),
            }
        }

        let search = self
            .engine
            .search_and_score_move(fen_before, &record.uci, self.options.classify_depth);
        let result = timeout(self.options.engine_timeout, search)
            .await
            .map_err(|_| AnnotatorError::EngineTimeout(self.options.engine_timeout.as_millis() as u64))??;

        let mover = record.mover;
        let delivers_mate = self.rules.is_checkmate(fen_after)?;
        let loss = if delivers_mate {
            0.0
        } else {
            centipawn_loss(result.best_score.pawns(), result.played_score.pawns(), mover)
        };

        let settled_fen = settled_position(timeline, index);
        let material_before = MaterialCount::from_grid(&self.rules.board(fen_before)?);
        let material_after = MaterialCount::from_grid(&self.rules.board(settled_fen)?);
        let material_change = material_after.balance(mover) - material_before.balance(mover);

        let state_before = GameStateContext::new(result.best_score.clone(), &material_before).state;
        let state_after = GameStateContext::new(result.played_score.clone(), &material_after).state;

        let forced = is_forced(
            self.rules.in_check(fen_before)?,
            delivers_mate,
            self.rules.legal_moves(fen_before)?.len(),
        );
        let sacrifice = is_sacrifice(material_change, loss);
        let is_best = record.uci == result.best_move;

        let classification = classify(
            loss,
            material_change,
            state_before,
            state_after,
            is_best,
            forced,
            sacrifice,
        );
        debug!(
            index,
            san = record.san.as_str(),
            loss,
            material_change,
            best = result.best_move.as_str(),
            "Move scored"
        );

        Ok(MoveAnalysis {
            classification,
            best_move: Some(result.best_move),
            best_score: Some(result.best_score),
            move_score: Some(result.played_score),
            opening_name: None,
        })
    }
}

/// Position where the exchange begun at `index` has played out: after the
/// opponent's reply, and after the mover's answer when it lands on the same
/// square the reply captured on.
fn settled_position(timeline: &GameTimeline, index: usize) -> &str {
    let positions = timeline.positions();
    let moves = timeline.moves();
    match (moves.get(index + 1), moves.get(index + 2)) {
        (Some(reply), Some(answer)) if answer.to == reply.to => &positions[index + 3],
        (Some(_), _) => &positions[index + 2],
        _ => &positions[index + 1],
    }
}

fn fullmove_number(fen: &str) -> usize {
    fen.split_whitespace()
        .nth(5)
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::book::BookHit;
    use crate::classify::ClassificationResult;
    use crate::error::EngineError;
    use crate::evaluation::Evaluation;
    use crate::replay::ReplayBuilder;
    use crate::rules::ChessRules;
    use crate::session::MoveSearchResult;
    use chess_core::{GameHeaders, MoveDescriptor, STANDARD_START_FEN};

    /// Engine stand-in keyed on the move being scored.
    #[derive(Default)]
    struct StubEngine {
        results: HashMap<&'static str, (&'static str, f32, f32)>,
        hang_on: Option<&'static str>,
        fail_on: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl MoveSearch for StubEngine {
        async fn search_and_score_move(
            &self,
            _fen: &str,
            uci_move: &str,
            _depth: u32,
        ) -> Result<MoveSearchResult, EngineError> {
            self.calls.lock().unwrap().push(uci_move.to_string());
            if self.hang_on == Some(uci_move) {
                std::future::pending::<()>().await;
            }
            if self.fail_on == Some(uci_move) {
                return Err(EngineError::Closed);
            }
            let (best, best_score, played_score) =
                self.results.get(uci_move).copied().unwrap_or(("e2e4", 0.2, 0.2));
            Ok(MoveSearchResult {
                best_move: best.to_string(),
                best_score: Evaluation::score(best_score),
                played_score: Evaluation::score(played_score),
            })
        }
    }

    /// Book stand-in: knows the listed SAN moves.
    #[derive(Default)]
    struct StubBook {
        known: Vec<&'static str>,
        fail: bool,
        hang: bool,
    }

    impl BookLookup for StubBook {
        async fn lookup(&self, _fen: &str, played_san: &str) -> Result<Option<BookHit>, AnnotatorError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(AnnotatorError::Lookup("offline".into()));
            }
            Ok(self.known.contains(&played_san).then(|| BookHit {
                opening_name: Some("Italian Game".into()),
            }))
        }
    }

    fn timeline(fen: &str, sans: &[&str]) -> GameTimeline {
        let moves: Vec<MoveDescriptor> = sans.iter().map(|s| MoveDescriptor::san(s)).collect();
        ReplayBuilder::new(&ChessRules)
            .build(GameHeaders::default(), fen, &moves)
            .unwrap()
    }

    fn kinds(timeline: &GameTimeline) -> Vec<Option<MoveClassification>> {
        timeline
            .moves()
            .iter()
            .map(|m| m.classification().map(|c| c.kind))
            .collect()
    }

    #[tokio::test]
    async fn test_book_then_engine() {
        let mut game = timeline(STANDARD_START_FEN, &["e4", "e5", "Nf3", "a6"]);
        let mut engine = StubEngine::default();
        // White to move after Nf3: Black's a6 drops 1.5 pawns
        engine.results.insert("a7a6", ("b8c6", 0.3, 1.8));
        let book = StubBook {
            known: vec!["e4", "e5", "Nf3"],
            ..Default::default()
        };

        let pipeline = ClassificationPipeline::new(&engine, &book, &ChessRules, PipelineOptions::default());
        let summary = pipeline.run(&mut game).await;

        assert_eq!(summary.book, 3);
        assert_eq!(summary.engine, 1);
        assert_eq!(
            kinds(&game),
            vec![
                Some(MoveClassification::Book),
                Some(MoveClassification::Book),
                Some(MoveClassification::Book),
                Some(MoveClassification::Inaccuracy),
            ]
        );
        assert_eq!(game.moves()[0].opening_name(), Some("Italian Game"));
        assert_eq!(game.moves()[3].engine_best_move(), Some("b8c6"));
        assert_eq!(*engine.calls.lock().unwrap(), vec!["a7a6"]);
    }

    #[tokio::test]
    async fn test_book_window_and_book_errors() {
        // Full-move 11: outside the default window of 10
        let late = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 11";
        let mut game = timeline(late, &["e4"]);
        let engine = StubEngine::default();
        let book = StubBook {
            known: vec!["e4"],
            ..Default::default()
        };
        ClassificationPipeline::new(&engine, &book, &ChessRules, PipelineOptions::default())
            .run(&mut game)
            .await;
        assert_eq!(kinds(&game), vec![Some(MoveClassification::Best)]);

        let mut game = timeline(STANDARD_START_FEN, &["e4"]);
        let failing = StubBook {
            fail: true,
            ..Default::default()
        };
        ClassificationPipeline::new(&engine, &failing, &ChessRules, PipelineOptions::default())
            .run(&mut game)
            .await;
        assert_eq!(kinds(&game), vec![Some(MoveClassification::Best)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_search_times_out_and_pipeline_advances() {
        let mut game = timeline(STANDARD_START_FEN, &["e4", "e5", "Nf3"]);
        let engine = StubEngine {
            hang_on: Some("e7e5"),
            fail_on: Some("g1f3"),
            ..Default::default()
        };
        let book = StubBook::default();

        let summary = ClassificationPipeline::new(&engine, &book, &ChessRules, PipelineOptions::default())
            .run(&mut game)
            .await;

        assert_eq!(summary.engine, 1);
        assert_eq!(summary.unclassified, 2);
        assert_eq!(kinds(&game), vec![Some(MoveClassification::Best), None, None]);
        assert_eq!(engine.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_loss_is_oriented_to_the_mover() {
        // Black's e5: best keeps -0.3 for White, played lets White reach +2.7
        let mut game = timeline(STANDARD_START_FEN, &["e4", "e5"]);
        let mut engine = StubEngine::default();
        engine.results.insert("e7e5", ("c7c5", -0.3, 2.7));

        ClassificationPipeline::new(&engine, &StubBook::default(), &ChessRules, PipelineOptions::default())
            .run(&mut game)
            .await;
        assert_eq!(kinds(&game)[1], Some(MoveClassification::Mistake));
    }

    #[tokio::test]
    async fn test_sacrifice_reads_as_brilliant() {
        // Bxf7+ gives up the bishop for a pawn; the king must take back
        let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
        let mut game = timeline(fen, &["Bxf7+", "Kxf7"]);
        let mut engine = StubEngine::default();
        engine.results.insert("c4f7", ("f3g5", 0.6, 0.4));

        let options = PipelineOptions {
            book_max_moves: 0,
            ..PipelineOptions::default()
        };
        ClassificationPipeline::new(&engine, &StubBook::default(), &ChessRules, options)
            .run(&mut game)
            .await;
        assert_eq!(kinds(&game)[0], Some(MoveClassification::Brilliant));
    }

    #[tokio::test]
    async fn test_even_trade_started_by_opponent_is_not_a_sacrifice() {
        // Nimzo-Indian after 3...Bb4: 4.a3 Bxc3+ 5.bxc3 trades bishop for knight
        let fen = "rnbqk2r/pppp1ppp/4pn2/8/1bPP4/2N5/PP2PPPP/R1BQKBNR w KQkq - 2 4";
        let mut game = timeline(fen, &["a3", "Bxc3+", "bxc3"]);
        let engine = StubEngine::default();

        let options = PipelineOptions {
            book_max_moves: 0,
            ..PipelineOptions::default()
        };
        ClassificationPipeline::new(&engine, &StubBook::default(), &ChessRules, options)
            .run(&mut game)
            .await;
        assert_eq!(
            kinds(&game),
            vec![
                Some(MoveClassification::Best),
                Some(MoveClassification::Best),
                Some(MoveClassification::Best),
            ]
        );
    }

    #[test]
    fn test_settled_position_follows_the_recapture() {
        let fen = "rnbqk2r/pppp1ppp/4pn2/8/1bPP4/2N5/PP2PPPP/R1BQKBNR w KQkq - 2 4";
        let game = timeline(fen, &["a3", "Bxc3+", "bxc3", "O-O"]);
        let positions = game.positions();
        assert_eq!(settled_position(&game, 0), positions[3]);
        // bxc3 is not answered on c3
        assert_eq!(settled_position(&game, 1), positions[3]);
        assert_eq!(settled_position(&game, 2), positions[4]);
        assert_eq!(settled_position(&game, 3), positions[4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_book_falls_through_to_engine() {
        let mut game = timeline(STANDARD_START_FEN, &["e4"]);
        let engine = StubEngine::default();
        let book = StubBook {
            known: vec!["e4"],
            hang: true,
            ..Default::default()
        };

        let summary = ClassificationPipeline::new(&engine, &book, &ChessRules, PipelineOptions::default())
            .run(&mut game)
            .await;

        assert_eq!(summary.book, 0);
        assert_eq!(summary.engine, 1);
        assert_eq!(kinds(&game), vec![Some(MoveClassification::Best)]);
        assert_eq!(*engine.calls.lock().unwrap(), vec!["e2e4"]);
    }

    #[tokio::test]
    async fn test_existing_classifications_are_kept() {
        let mut game = timeline(STANDARD_START_FEN, &["e4"]);
        game.annotate(0, ClassificationResult::book());
        let engine = StubEngine::default();

        let summary = ClassificationPipeline::new(&engine, &StubBook::default(), &ChessRules, PipelineOptions::default())
            .run(&mut game)
            .await;
        assert_eq!(summary.kept, 1);
        assert!(engine.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fullmove_number() {
        assert_eq!(fullmove_number(STANDARD_START_FEN), 1);
        assert_eq!(fullmove_number("8/8/8/8/8/8/8/K6k b - - 3 42"), 42);
        assert_eq!(fullmove_number("8/8/8/8/8/8/8/K6k b"), 1);
    }
}
