pub mod core {
	pub mod config;
	pub mod controller;
	pub mod engine;
	pub mod error;
	pub mod store;
}

pub mod cli;
pub mod puzzle;
pub mod tui;

// Re-export for convenience
pub use crate::core::controller::{GuessResult, MatchController, MatchEvent, MatchOutcome, MatchState, Phase};
pub use crate::core::engine::{MatchEngine, MatchHandle};
pub use crate::puzzle::{Puzzle, Word, WordId};
