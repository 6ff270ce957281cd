/// Match rules: the only code allowed to mutate a match's state
use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::config::MatchConfig;
use crate::core::error::MatchError;
use crate::puzzle::{Puzzle, Word, WordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Solver {
    Human,
    Opponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    /// Not covered by any word
    Block,
    Empty,
    Letter(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    HumanWin,
    OpponentWin,
    Tie,
}

impl MatchOutcome {
    /// Only the final scores matter; no tie-break on time or move order
    pub fn from_scores(human: u32, opponent: u32) -> Self {
        use std::cmp::Ordering;
        match human.cmp(&opponent) {
            Ordering::Greater => MatchOutcome::HumanWin,
            Ordering::Less => MatchOutcome::OpponentWin,
            Ordering::Equal => MatchOutcome::Tie,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    InProgress,
    Finished(MatchOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Completed,
    TimeUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessResult {
    Correct,
    Incorrect,
    /// The word was already taken; nothing changed
    AlreadySolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpponentSolveResult {
    Solved(WordId),
    NothingToSolve,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryEntry {
    Guess { word: WordId, guess: String, correct: bool },
    OpponentSolve { word: WordId },
}

/// What happened, for the presentation layer to react to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchEvent {
    MatchStarted { puzzle_id: String },
    Correct { word: WordId, points: u32 },
    Incorrect { word: WordId, guess: String },
    OpponentSolved { word: WordId, points: u32 },
    MatchFinished { outcome: MatchOutcome, reason: FinishReason },
}

/// Complete mutable state of one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    pub puzzle_id: String,
    pub grid: Vec<Vec<Cell>>,
    pub solved_by: BTreeMap<WordId, Solver>,
    pub human_score: u32,
    pub opponent_score: u32,
    /// Seconds left, None for an untimed match
    pub time_remaining: Option<u32>,
    pub phase: Phase,
    pub history: Vec<HistoryEntry>,
}

impl MatchState {
    pub fn new(puzzle: &Puzzle, duration_secs: Option<u32>) -> Self {
        let grid = (0..puzzle.rows())
            .map(|row| {
                (0..puzzle.cols())
                    .map(|col| if puzzle.is_block(row, col) { Cell::Block } else { Cell::Empty })
                    .collect()
            })
            .collect();

        Self {
            puzzle_id: puzzle.id().to_string(),
            grid,
            solved_by: BTreeMap::new(),
            human_score: 0,
            opponent_score: 0,
            time_remaining: duration_secs,
            phase: Phase::InProgress,
            history: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        match self.phase {
            Phase::Finished(outcome) => Some(outcome),
            Phase::InProgress => None,
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.grid
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(Cell::Block)
    }
}

/// Read-only projection handed to the front end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub generation: u64,
    pub state: MatchState,
}

/// Trim the ends and upper-case; inner whitespace stays significant
pub fn normalize_guess(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub struct MatchController {
    puzzle: Arc<Puzzle>,
    state: MatchState,
    rng: StdRng,
    events: Vec<MatchEvent>,
}

impl MatchController {
    pub fn new(puzzle: Arc<Puzzle>, config: &MatchConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(puzzle, config.duration_secs, rng)
    }

    pub fn with_rng(puzzle: Arc<Puzzle>, duration_secs: Option<u32>, rng: StdRng) -> Self {
        let state = MatchState::new(&puzzle, duration_secs);
        info!(puzzle = puzzle.id(), words = puzzle.words().len(), ?duration_secs, "match started");
        let events = vec![MatchEvent::MatchStarted { puzzle_id: puzzle.id().to_string() }];
        Self { puzzle, state, rng, events }
    }

    pub fn puzzle(&self) -> &Arc<Puzzle> {
        &self.puzzle
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn snapshot(&self, generation: u64) -> MatchSnapshot {
        MatchSnapshot { generation, state: self.state.clone() }
    }

    /// Events produced since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<MatchEvent> {
        std::mem::take(&mut self.events)
    }

    /// Human answers the selected word
    pub fn submit_guess(&mut self, word_id: WordId, guess: &str) -> Result<GuessResult, MatchError> {
        if self.is_finished() {
            return Err(MatchError::MatchFinished);
        }

        let puzzle = Arc::clone(&self.puzzle);
        let word = puzzle.word_at(word_id)?;

        if self.state.solved_by.contains_key(&word_id) {
            debug!(word = %word_id, "guess for a word that is already solved");
            return Ok(GuessResult::AlreadySolved);
        }

        let normalized = normalize_guess(guess);
        if normalized != word.answer {
            debug!(word = %word_id, guess = %normalized, "incorrect guess");
            self.state.history.push(HistoryEntry::Guess {
                word: word_id,
                guess: normalized.clone(),
                correct: false,
            });
            self.events.push(MatchEvent::Incorrect { word: word_id, guess: normalized });
            return Ok(GuessResult::Incorrect);
        }

        let points = self.apply_solve(word, Solver::Human);
        self.state.history.push(HistoryEntry::Guess { word: word_id, guess: normalized, correct: true });
        self.events.push(MatchEvent::Correct { word: word_id, points });
        info!(word = %word_id, points, score = self.state.human_score, "human solved a word");

        self.finish_if_complete();
        Ok(GuessResult::Correct)
    }

    /// Scripted opponent fills in one unsolved word picked uniformly at random
    pub fn opponent_auto_solve_tick(&mut self) -> Result<OpponentSolveResult, MatchError> {
        if self.is_finished() {
            return Err(MatchError::MatchFinished);
        }

        let puzzle = Arc::clone(&self.puzzle);
        let unsolved = puzzle.unsolved_words(&self.state.solved_by);
        let Some(&word) = unsolved.choose(&mut self.rng) else {
            return Ok(OpponentSolveResult::NothingToSolve);
        };

        let word_id = word.id();
        let points = self.apply_solve(word, Solver::Opponent);
        self.state.history.push(HistoryEntry::OpponentSolve { word: word_id });
        self.events.push(MatchEvent::OpponentSolved { word: word_id, points });
        info!(word = %word_id, points, score = self.state.opponent_score, "opponent solved a word");

        self.finish_if_complete();
        Ok(OpponentSolveResult::Solved(word_id))
    }

    /// One second of match time passes
    pub fn tick_clock(&mut self) {
        if self.is_finished() {
            return;
        }
        let Some(remaining) = self.state.time_remaining.as_mut() else {
            return;
        };

        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.finish(FinishReason::TimeUp);
        }
    }

    /// Ends the match. Calling it again returns the first outcome unchanged.
    pub(crate) fn finish(&mut self, reason: FinishReason) -> MatchOutcome {
        if let Phase::Finished(outcome) = self.state.phase {
            return outcome;
        }

        let outcome = MatchOutcome::from_scores(self.state.human_score, self.state.opponent_score);
        self.state.phase = Phase::Finished(outcome);
        self.events.push(MatchEvent::MatchFinished { outcome, reason });
        info!(
            ?outcome,
            ?reason,
            human = self.state.human_score,
            opponent = self.state.opponent_score,
            "match finished"
        );
        outcome
    }

    fn finish_if_complete(&mut self) {
        if self.puzzle.is_complete(&self.state.solved_by) {
            self.finish(FinishReason::Completed);
        }
    }

    fn apply_solve(&mut self, word: &Word, solver: Solver) -> u32 {
        let points = word.points();
        self.state.solved_by.insert(word.id(), solver);
        match solver {
            Solver::Human => self.state.human_score += points,
            Solver::Opponent => self.state.opponent_score += points,
        }
        for ((row, col), letter) in word.letters() {
            self.state.grid[row][col] = Cell::Letter(letter);
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::Word;

    fn cpu_ram() -> Arc<Puzzle> {
        Arc::new(
            Puzzle::new(
                "cpu-ram",
                "CPU / RAM",
                1,
                9,
                vec![
                    Word::across(1, 0, 0, "CPU", "Does the thinking"),
                    Word::across(2, 0, 6, "RAM", "Forgets on power loss"),
                ],
            )
            .unwrap(),
        )
    }

    fn controller(puzzle: Arc<Puzzle>, duration: Option<u32>) -> MatchController {
        MatchController::with_rng(puzzle, duration, StdRng::seed_from_u64(7))
    }

    #[test]
    fn fresh_state() {
        let ctl = controller(cpu_ram(), Some(120));
        let state = ctl.state();
        assert_eq!(state.grid[0][0], Cell::Empty);
        assert_eq!(state.grid[0][4], Cell::Block);
        assert!(state.solved_by.is_empty());
        assert_eq!((state.human_score, state.opponent_score), (0, 0));
        assert_eq!(state.time_remaining, Some(120));
        assert_eq!(state.phase, Phase::InProgress);
    }

    #[test]
    fn correct_guess_fills_grid_and_scores() {
        let mut ctl = controller(cpu_ram(), Some(120));
        assert_eq!(ctl.submit_guess(WordId::across(1), "  cpu "), Ok(GuessResult::Correct));

        let state = ctl.state();
        let row: Vec<Cell> = state.grid[0][..3].to_vec();
        assert_eq!(row, vec![Cell::Letter('C'), Cell::Letter('P'), Cell::Letter('U')]);
        assert_eq!(state.human_score, 30);
        assert_eq!(state.solved_by.get(&WordId::across(1)), Some(&Solver::Human));
        assert_eq!(state.phase, Phase::InProgress);
    }

    #[test]
    fn second_correct_guess_is_a_no_op() {
        let mut ctl = controller(cpu_ram(), Some(120));
        ctl.submit_guess(WordId::across(1), "CPU").unwrap();
        let before = ctl.state().clone();

        assert_eq!(ctl.submit_guess(WordId::across(1), "cpu"), Ok(GuessResult::AlreadySolved));
        assert_eq!(ctl.state(), &before);
    }

    #[test]
    fn wrong_guess_changes_nothing_but_history() {
        let mut ctl = controller(cpu_ram(), Some(120));
        ctl.drain_events();
        let grid_before = ctl.state().grid.clone();

        for guess in ["GPU", "C PU", "", "cpus"] {
            assert_eq!(ctl.submit_guess(WordId::across(1), guess), Ok(GuessResult::Incorrect));
        }

        let state = ctl.state();
        assert!(state.solved_by.is_empty());
        assert_eq!(state.human_score, 0);
        assert_eq!(state.grid, grid_before);
        assert_eq!(state.history.len(), 4);
        assert_eq!(
            ctl.drain_events()[0],
            MatchEvent::Incorrect { word: WordId::across(1), guess: "GPU".into() }
        );
    }

    #[test]
    fn unknown_word_is_not_found() {
        let mut ctl = controller(cpu_ram(), Some(120));
        assert_eq!(
            ctl.submit_guess(WordId::down(1), "CPU"),
            Err(MatchError::NotFound(WordId::down(1)))
        );
    }

    #[test]
    fn opponent_takes_the_last_word() {
        let mut ctl = controller(cpu_ram(), Some(120));
        ctl.submit_guess(WordId::across(1), "cpu").unwrap();

        assert_eq!(ctl.opponent_auto_solve_tick(), Ok(OpponentSolveResult::Solved(WordId::across(2))));
        let state = ctl.state();
        assert_eq!(state.opponent_score, 30);
        assert_eq!(state.grid[0][6..], [Cell::Letter('R'), Cell::Letter('A'), Cell::Letter('M')]);
        // Completing the puzzle finishes the match with time still on the clock
        assert_eq!(state.phase, Phase::Finished(MatchOutcome::Tie));
        assert_eq!(state.time_remaining, Some(120));
    }

    #[test]
    fn opponent_with_nothing_left() {
        let mut ctl = controller(cpu_ram(), None);
        ctl.opponent_auto_solve_tick().unwrap();
        ctl.opponent_auto_solve_tick().unwrap();
        assert!(ctl.is_finished());
        assert_eq!(ctl.opponent_auto_solve_tick(), Err(MatchError::MatchFinished));

        // Unreachable through the public flow, but the rule still holds
        let mut ctl = controller(cpu_ram(), None);
        ctl.state.solved_by.insert(WordId::across(1), Solver::Human);
        ctl.state.solved_by.insert(WordId::across(2), Solver::Human);
        assert_eq!(ctl.opponent_auto_solve_tick(), Ok(OpponentSolveResult::NothingToSolve));
    }

    #[test]
    fn clock_runs_out() {
        let mut ctl = controller(cpu_ram(), Some(3));
        ctl.tick_clock();
        assert_eq!(ctl.state().time_remaining, Some(2));
        ctl.tick_clock();
        assert_eq!(ctl.state().time_remaining, Some(1));
        assert!(!ctl.is_finished());
        ctl.tick_clock();
        assert_eq!(ctl.state().time_remaining, Some(0));
        assert_eq!(ctl.state().phase, Phase::Finished(MatchOutcome::Tie));

        ctl.tick_clock();
        assert_eq!(ctl.state().time_remaining, Some(0));
        assert!(ctl.is_finished());
        assert_eq!(ctl.submit_guess(WordId::across(1), "CPU"), Err(MatchError::MatchFinished));
    }

    #[test]
    fn untimed_clock_never_finishes() {
        let mut ctl = controller(cpu_ram(), None);
        for _ in 0..1000 {
            ctl.tick_clock();
        }
        assert_eq!(ctl.state().time_remaining, None);
        assert!(!ctl.is_finished());
    }

    #[test]
    fn finish_is_idempotent() {
        let mut ctl = controller(cpu_ram(), Some(60));
        ctl.submit_guess(WordId::across(1), "CPU").unwrap();
        assert_eq!(ctl.finish(FinishReason::TimeUp), MatchOutcome::HumanWin);
        ctl.drain_events();

        ctl.state.opponent_score = 500;
        assert_eq!(ctl.finish(FinishReason::Completed), MatchOutcome::HumanWin);
        assert!(ctl.drain_events().is_empty());
    }

    #[test]
    fn outcome_from_scores() {
        assert_eq!(MatchOutcome::from_scores(90, 60), MatchOutcome::HumanWin);
        assert_eq!(MatchOutcome::from_scores(50, 50), MatchOutcome::Tie);
        assert_eq!(MatchOutcome::from_scores(30, 80), MatchOutcome::OpponentWin);
    }

    #[test]
    fn events_arrive_in_order() {
        let mut ctl = controller(cpu_ram(), Some(60));
        ctl.submit_guess(WordId::across(1), "CPU").unwrap();
        ctl.submit_guess(WordId::across(2), "RAM").unwrap();

        let events = ctl.drain_events();
        assert_eq!(
            events,
            vec![
                MatchEvent::MatchStarted { puzzle_id: "cpu-ram".into() },
                MatchEvent::Correct { word: WordId::across(1), points: 30 },
                MatchEvent::Correct { word: WordId::across(2), points: 30 },
                MatchEvent::MatchFinished { outcome: MatchOutcome::HumanWin, reason: FinishReason::Completed },
            ]
        );
    }

    #[test]
    fn crossing_letters_are_shared() {
        let puzzle = Arc::new(
            Puzzle::new(
                "cross",
                "",
                3,
                3,
                vec![Word::across(1, 0, 0, "CAT", "Pet"), Word::down(1, 0, 0, "COW", "Farm animal")],
            )
            .unwrap(),
        );
        let mut ctl = controller(puzzle, None);
        ctl.submit_guess(WordId::down(1), "cow").unwrap();
        ctl.submit_guess(WordId::across(1), "cat").unwrap();

        let state = ctl.state();
        assert_eq!(state.grid[0][0], Cell::Letter('C'));
        assert_eq!(state.grid[2][0], Cell::Letter('W'));
        assert_eq!(state.grid[0][2], Cell::Letter('T'));
        assert_eq!(state.grid[1][1], Cell::Block);
        assert_eq!(state.human_score, 60);
        assert!(ctl.is_finished());
    }

    #[test]
    fn seeded_opponent_is_repeatable() {
        let puzzle = Arc::new(
            Puzzle::new(
                "five",
                "",
                5,
                5,
                (0..5).map(|r| Word::across(r as u32 + 1, r, 0, "ABCDE", "Letters")).collect(),
            )
            .unwrap(),
        );
        let picks = |seed| {
            let mut ctl = MatchController::with_rng(Arc::clone(&puzzle), None, StdRng::seed_from_u64(seed));
            (0..5)
                .map(|_| match ctl.opponent_auto_solve_tick().unwrap() {
                    OpponentSolveResult::Solved(id) => id,
                    OpponentSolveResult::NothingToSolve => panic!("ran out early"),
                })
                .collect::<Vec<_>>()
        };
        let first = picks(42);
        assert_eq!(first, picks(42));

        let mut sorted = first.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 5);
    }
}
