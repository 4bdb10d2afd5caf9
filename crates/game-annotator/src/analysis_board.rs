//! Timeline navigation wired to live engine evaluation.

use crate::classify::ClassificationResult;
use crate::session::{EngineSession, EvaluationStream};
use crate::timeline::GameTimeline;

/// What to show after a navigation step. The explanation and classification
/// are the stored ones of the move that led here.
pub struct PositionView {
    pub index: usize,
    pub fen: String,
    pub san: Option<String>,
    pub explanation: Option<String>,
    pub classification: Option<ClassificationResult>,
    pub evaluation: EvaluationStream,
}

pub struct AnalysisBoard {
    timeline: GameTimeline,
    session: EngineSession,
    live_depth: u32,
}

impl AnalysisBoard {
    pub fn new(timeline: GameTimeline, session: EngineSession, live_depth: u32) -> Self {
        Self {
            timeline,
            session,
            live_depth,
        }
    }

    pub fn timeline(&self) -> &GameTimeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut GameTimeline {
        &mut self.timeline
    }

    /// Swap in a freshly imported game and show its start.
    pub fn load(&mut self, timeline: GameTimeline) -> PositionView {
        self.timeline = timeline;
        self.view()
    }

    pub fn next(&mut self) -> PositionView {
        self.timeline.next();
        self.view()
    }

    pub fn prev(&mut self) -> PositionView {
        self.timeline.prev();
        self.view()
    }

    pub fn goto(&mut self, index: usize) -> PositionView {
        self.timeline.goto(index);
        self.view()
    }

    pub fn reset(&mut self) -> PositionView {
        self.timeline.reset();
        self.view()
    }

    /// Current position, re-evaluated.
    pub fn view(&self) -> PositionView {
        let fen = self.timeline.current_position().to_string();
        let evaluation = self.session.evaluate(&fen, self.live_depth);
        let played = self.timeline.current_move();

        PositionView {
            index: self.timeline.current_index(),
            san: played.map(|m| m.san.clone()),
            explanation: played.and_then(|m| m.explanation.clone()),
            classification: played.and_then(|m| m.classification().copied()),
            fen,
            evaluation,
        }
    }
}
