//! Build a [`GameTimeline`] from an initial position and move descriptors.

use chess_core::{pgn, GameHeaders, ImportedGame, MoveDescriptor};
use tracing::{info, warn};

use crate::error::AnnotatorError;
use crate::explain::ExplanationGenerator;
use crate::rules::Rules;
use crate::timeline::{GameTimeline, MoveRecord};

pub struct ReplayBuilder<'a, R> {
    rules: &'a R,
}

impl<'a, R: Rules> ReplayBuilder<'a, R> {
    pub fn new(rules: &'a R) -> Self {
        Self { rules }
    }

    /// Replay `descriptors` from `initial_fen`. Moves the rules reject are
    /// skipped, so the timeline can hold fewer moves than descriptors.
    pub fn build(
        &self,
        headers: GameHeaders,
        initial_fen: &str,
        descriptors: &[MoveDescriptor],
    ) -> Result<GameTimeline, AnnotatorError> {
        // Reject a bad starting position up front
        self.rules.board(initial_fen)?;

        let explainer = ExplanationGenerator::new(self.rules);
        let mut fen = initial_fen.to_string();
        let mut moves = Vec::with_capacity(descriptors.len());

        for (index, descriptor) in descriptors.iter().enumerate() {
            let applied = match self.rules.apply(&fen, descriptor) {
                Ok(applied) => applied,
                Err(e) => {
                    warn!(index, san = descriptor.san.as_str(), error = %e, "Skipping move");
                    continue;
                }
            };

            let explanation = match descriptor.comment() {
                Some(comment) => comment.to_string(),
                None => explainer.explain(&applied),
            };
            fen = applied.fen_after.clone();
            moves.push(MoveRecord::new(applied, Some(explanation)));
        }

        let skipped = descriptors.len() - moves.len();
        info!(moves = moves.len(), skipped, "Game replayed");

        Ok(GameTimeline::from_history(headers, initial_fen, moves))
    }

    pub fn build_game(&self, game: &ImportedGame) -> Result<GameTimeline, AnnotatorError> {
        self.build(game.headers.clone(), game.initial_fen(), &game.moves)
    }

    /// Parse and replay `pgn` into `timeline`. On any failure the timeline is
    /// left as it was.
    pub fn import_pgn(&self, timeline: &mut GameTimeline, pgn_text: &str) -> Result<(), AnnotatorError> {
        let game = pgn::parse_pgn(pgn_text)?;
        *timeline = self.build_game(&game)?;
        Ok(())
    }
}
