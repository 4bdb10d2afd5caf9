//! Chess game annotator: live engine evaluation and per-move classification
//! for imported games.

pub use chess;

pub mod analysis_board;
pub mod book;
pub mod classify;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod explain;
pub mod game_state;
pub mod pipeline;
pub mod replay;
pub mod report;
pub mod rules;
pub mod session;
pub mod stockfish;
pub mod timeline;
pub mod uci;

pub use analysis_board::{AnalysisBoard, PositionView};
pub use book::{BookHit, BookLookup, ExplorerClient, LocalBook, OpeningBook};
pub use classify::{classify, ClassificationResult, MoveClassification};
pub use config::AnnotatorConfig;
pub use error::{AnnotatorError, EngineError};
pub use evaluation::Evaluation;
pub use pipeline::{ClassificationPipeline, PipelineOptions, PipelineSummary};
pub use replay::ReplayBuilder;
pub use report::GameReport;
pub use rules::{ChessRules, Rules};
pub use session::{EngineSession, EvaluationStream, MoveSearch, MoveSearchResult};
pub use timeline::{GameTimeline, MoveAnalysis, MoveRecord};
