/// Error types shared by the puzzle model and the match controller
use std::fmt;

use crate::puzzle::WordId;

/// Failures a match command can report. None of them are fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// The referenced word id is not part of the puzzle
    NotFound(WordId),
    /// The match already ended; nothing was changed
    MatchFinished,
    /// The engine task is gone and can no longer take commands
    EngineClosed,
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::NotFound(id) => write!(f, "no word {} in this puzzle", id),
            MatchError::MatchFinished => write!(f, "the match is already finished"),
            MatchError::EngineClosed => write!(f, "the match engine has stopped"),
        }
    }
}

impl std::error::Error for MatchError {}

/// Authoring mistakes caught while building a puzzle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PuzzleError {
    EmptyGrid,
    GridTooLarge { rows: usize, cols: usize },
    NoWords,
    EmptyAnswer(WordId),
    InvalidLetter { id: WordId, letter: char },
    DuplicateId(WordId),
    OutOfBounds { id: WordId, row: usize, col: usize },
    CrossingConflict { row: usize, col: usize, expected: char, found: char },
}

impl fmt::Display for PuzzleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PuzzleError::EmptyGrid => write!(f, "puzzle grid has no cells"),
            PuzzleError::GridTooLarge { rows, cols } => write!(
                f,
                "puzzle grid {}x{} is too large, at most {} per side",
                rows,
                cols,
                crate::puzzle::MAX_GRID_SIDE
            ),
            PuzzleError::NoWords => write!(f, "puzzle has no words"),
            PuzzleError::EmptyAnswer(id) => write!(f, "word {} has an empty answer", id),
            PuzzleError::InvalidLetter { id, letter } => {
                write!(f, "word {} contains '{}', only A-Z is allowed", id, letter)
            }
            PuzzleError::DuplicateId(id) => write!(f, "word {} is defined twice", id),
            PuzzleError::OutOfBounds { id, row, col } => {
                write!(f, "word {} runs off the grid at ({}, {})", id, row, col)
            }
            PuzzleError::CrossingConflict { row, col, expected, found } => write!(
                f,
                "crossing words disagree at ({}, {}): '{}' vs '{}'",
                row, col, expected, found
            ),
        }
    }
}

impl std::error::Error for PuzzleError {}
