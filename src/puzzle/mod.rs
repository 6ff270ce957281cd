/// Static crossword description: grid geometry, placed words and lookups
pub mod bank;
pub mod macros;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::controller::Solver;
use crate::core::error::{MatchError, PuzzleError};

/// Points awarded per letter of a solved answer
pub const POINTS_PER_LETTER: u32 = 10;

/// Largest row or column count a puzzle may have
pub const MAX_GRID_SIDE: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Across,
    Down,
}

impl Direction {
    pub fn suffix(self) -> char {
        match self {
            Direction::Across => 'A',
            Direction::Down => 'D',
        }
    }
}

/// Clue number plus direction, written as "1A" or "2D"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WordId {
    pub number: u32,
    pub direction: Direction,
}

impl WordId {
    pub fn new(number: u32, direction: Direction) -> Self {
        Self { number, direction }
    }

    pub fn across(number: u32) -> Self {
        Self::new(number, Direction::Across)
    }

    pub fn down(number: u32) -> Self {
        Self::new(number, Direction::Down)
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.direction.suffix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWordIdError(String);

impl fmt::Display for ParseWordIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a word id like 1A or 2D", self.0)
    }
}

impl std::error::Error for ParseWordIdError {}

impl FromStr for WordId {
    type Err = ParseWordIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseWordIdError(s.to_string());

        let mut chars = trimmed.chars();
        let suffix = chars.next_back().ok_or_else(err)?;
        let direction = match suffix.to_ascii_uppercase() {
            'A' => Direction::Across,
            'D' => Direction::Down,
            _ => return Err(err()),
        };
        let number = chars.as_str().parse::<u32>().map_err(|_| err())?;
        Ok(WordId::new(number, direction))
    }
}

// Serialized as a string so it can key a JSON object
impl Serialize for WordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One entry of the puzzle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub number: u32,
    #[serde(default)]
    pub direction: Direction,
    #[serde(rename = "row")]
    pub start_row: usize,
    #[serde(rename = "col")]
    pub start_col: usize,
    pub answer: String,
    pub clue: String,
}

impl Word {
    pub fn new(number: u32, direction: Direction, row: usize, col: usize, answer: &str, clue: &str) -> Self {
        Self {
            number,
            direction,
            start_row: row,
            start_col: col,
            answer: answer.trim().to_uppercase(),
            clue: clue.to_string(),
        }
    }

    pub fn across(number: u32, row: usize, col: usize, answer: &str, clue: &str) -> Self {
        Self::new(number, Direction::Across, row, col, answer, clue)
    }

    pub fn down(number: u32, row: usize, col: usize, answer: &str, clue: &str) -> Self {
        Self::new(number, Direction::Down, row, col, answer, clue)
    }

    pub fn id(&self) -> WordId {
        WordId::new(self.number, self.direction)
    }

    pub fn len(&self) -> usize {
        self.answer.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.answer.is_empty()
    }

    pub fn points(&self) -> u32 {
        self.len() as u32 * POINTS_PER_LETTER
    }

    /// Cells covered by the word, first letter first
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (row, col, direction) = (self.start_row, self.start_col, self.direction);
        (0..self.len()).map(move |i| match direction {
            Direction::Across => (row, col + i),
            Direction::Down => (row + i, col),
        })
    }

    /// Cells zipped with the letter expected in each
    pub fn letters(&self) -> impl Iterator<Item = ((usize, usize), char)> + '_ {
        self.cells().zip(self.answer.chars())
    }
}

/// Serialized form of a puzzle, used by puzzle files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleFile {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub rows: usize,
    pub cols: usize,
    pub words: Vec<Word>,
}

/// A validated, immutable crossword instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    id: String,
    title: String,
    rows: usize,
    cols: usize,
    words: Vec<Word>,
    index: HashMap<WordId, usize>,
    solution: Vec<Option<char>>,
}

impl Puzzle {
    /// Builds a puzzle, checking bounds, ids and crossing letters
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        rows: usize,
        cols: usize,
        words: Vec<Word>,
    ) -> std::result::Result<Self, PuzzleError> {
        if rows == 0 || cols == 0 {
            return Err(PuzzleError::EmptyGrid);
        }
        if rows > MAX_GRID_SIDE || cols > MAX_GRID_SIDE {
            return Err(PuzzleError::GridTooLarge { rows, cols });
        }
        if words.is_empty() {
            return Err(PuzzleError::NoWords);
        }

        let mut index = HashMap::with_capacity(words.len());
        let mut solution: Vec<Option<char>> = vec![None; rows * cols];

        for (i, word) in words.iter().enumerate() {
            let id = word.id();
            if word.is_empty() {
                return Err(PuzzleError::EmptyAnswer(id));
            }
            if let Some(letter) = word.answer.chars().find(|c| !c.is_ascii_uppercase()) {
                return Err(PuzzleError::InvalidLetter { id, letter });
            }
            if index.insert(id, i).is_some() {
                return Err(PuzzleError::DuplicateId(id));
            }
            // Start cell first, the rest are small offsets from it
            if word.start_row >= rows || word.start_col >= cols {
                return Err(PuzzleError::OutOfBounds { id, row: word.start_row, col: word.start_col });
            }

            for ((row, col), letter) in word.letters() {
                if row >= rows || col >= cols {
                    return Err(PuzzleError::OutOfBounds { id, row, col });
                }
                let slot = &mut solution[row * cols + col];
                match *slot {
                    Some(expected) if expected != letter => {
                        return Err(PuzzleError::CrossingConflict { row, col, expected, found: letter });
                    }
                    _ => *slot = Some(letter),
                }
            }
        }

        Ok(Self {
            id: id.into(),
            title: title.into(),
            rows,
            cols,
            words,
            index,
            solution,
        })
    }

    pub fn from_puzzle_file(file: PuzzleFile) -> std::result::Result<Self, PuzzleError> {
        let words = file
            .words
            .into_iter()
            .map(|w| Word::new(w.number, w.direction, w.start_row, w.start_col, &w.answer, &w.clue))
            .collect();
        Self::new(file.id, file.title, file.rows, file.cols, words)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: PuzzleFile = serde_json::from_str(text).context("malformed puzzle description")?;
        Ok(Self::from_puzzle_file(file)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read puzzle file {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn cells_of(&self, word: &Word) -> Vec<(usize, usize)> {
        word.cells().collect()
    }

    pub fn word_at(&self, id: WordId) -> std::result::Result<&Word, MatchError> {
        self.index
            .get(&id)
            .map(|&i| &self.words[i])
            .ok_or(MatchError::NotFound(id))
    }

    /// Letter a cell must hold, or None for a block
    pub fn solution_at(&self, row: usize, col: usize) -> Option<char> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.solution[row * self.cols + col]
    }

    pub fn is_block(&self, row: usize, col: usize) -> bool {
        self.solution_at(row, col).is_none()
    }

    /// Words not yet attributed to anyone, in puzzle order
    pub fn unsolved_words(&self, solved_by: &BTreeMap<WordId, Solver>) -> Vec<&Word> {
        self.words
            .iter()
            .filter(|w| !solved_by.contains_key(&w.id()))
            .collect()
    }

    pub fn is_complete(&self, solved_by: &BTreeMap<WordId, Solver>) -> bool {
        self.words.iter().all(|w| solved_by.contains_key(&w.id()))
    }
}
