//! Game import collaborators: PGN text to headers + move descriptors.

pub mod error;
pub mod game_data;
pub mod pgn;

pub use error::ImportFormatError;
pub use game_data::{GameHeaders, ImportedGame, MoveDescriptor, STANDARD_START_FEN};
