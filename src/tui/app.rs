/// Presentation state: selection, input line, chat transcript.
/// Never decides whether a guess is right or a match is over.
use std::sync::Arc;

use tracing::warn;

use crate::core::controller::{GuessResult, MatchEvent, MatchSnapshot};
use crate::core::engine::EngineEvent;
use crate::core::error::MatchError;
use crate::puzzle::{Puzzle, Word};
use crate::tui::banter::{Banter, Reaction};

const MAX_INPUT: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Guess,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Me,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub who: Speaker,
    pub text: String,
}

pub struct App {
    pub puzzle: Arc<Puzzle>,
    pub selected: usize,
    pub input: String,
    pub mode: InputMode,
    pub chat: Vec<ChatLine>,
    pub banter: Banter,
    /// Match this screen is showing. This app is the only one starting matches,
    /// so it can follow the engine's counter.
    pub generation: u64,
    pub should_quit: bool,
}

impl App {
    pub fn new(puzzle: Arc<Puzzle>, mut banter: Banter) -> Self {
        let greeting = banter.greeting(false);
        Self {
            puzzle,
            selected: 0,
            input: String::new(),
            mode: InputMode::Guess,
            chat: vec![ChatLine { who: Speaker::Bot, text: greeting }],
            banter,
            generation: 1,
            should_quit: false,
        }
    }

    /// Resets the screen for the next match
    pub fn restart(&mut self, puzzle: Arc<Puzzle>) {
        self.puzzle = puzzle;
        self.selected = 0;
        self.input.clear();
        self.mode = InputMode::Guess;
        self.generation += 1;
        let greeting = self.banter.greeting(true);
        self.chat = vec![ChatLine { who: Speaker::Bot, text: greeting }];
    }

    pub fn selected_word(&self) -> &Word {
        let words = self.puzzle.words();
        &words[self.selected.min(words.len() - 1)]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % self.puzzle.words().len();
    }

    pub fn select_prev(&mut self) {
        let len = self.puzzle.words().len();
        self.selected = (self.selected + len - 1) % len;
    }

    /// Moves to the first unsolved clue after the current one, wrapping around
    pub fn select_next_unsolved(&mut self, snapshot: &MatchSnapshot) {
        let words = self.puzzle.words();
        let len = words.len();
        if let Some(i) = (1..=len)
            .map(|step| (self.selected + step) % len)
            .find(|&i| !snapshot.state.solved_by.contains_key(&words[i].id()))
        {
            self.selected = i;
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            InputMode::Guess => InputMode::Chat,
            InputMode::Chat => InputMode::Guess,
        };
    }

    pub fn push_char(&mut self, c: char) {
        if self.input.chars().count() < MAX_INPUT {
            self.input.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    fn say(&mut self, who: Speaker, text: impl Into<String>) {
        self.chat.push(ChatLine { who, text: text.into() });
    }

    fn bot_says(&mut self, reaction: Reaction) {
        let text = self.banter.reply(&reaction);
        self.say(Speaker::Bot, text);
    }

    /// Shows the engine's verdict on a guess
    pub fn record_guess(
        &mut self,
        guess: &str,
        result: &Result<GuessResult, MatchError>,
        snapshot: Option<&MatchSnapshot>,
    ) {
        let shown = guess.trim().to_uppercase();
        match result {
            Ok(GuessResult::Correct) => {
                self.say(Speaker::Me, shown);
                self.bot_says(Reaction::Correct);
                if let Some(snapshot) = snapshot {
                    self.select_next_unsolved(snapshot);
                }
            }
            Ok(GuessResult::Incorrect) => {
                self.say(Speaker::Me, if shown.is_empty() { "(blank)".to_string() } else { shown });
                self.bot_says(Reaction::Wrong);
            }
            Ok(GuessResult::AlreadySolved) => self.bot_says(Reaction::AlreadySolved),
            Err(MatchError::MatchFinished) => self.bot_says(Reaction::MatchOver),
            Err(e) => warn!(error = %e, "guess was not accepted"),
        }
    }

    pub fn record_chat(&mut self, msg: &str) {
        let msg = msg.trim();
        if msg.is_empty() {
            return;
        }
        self.say(Speaker::Me, msg);
        self.bot_says(Reaction::Chat(msg.to_string()));
    }

    /// Reacts to things the player did not cause directly
    pub fn on_event(&mut self, event: &EngineEvent, snapshot: Option<&MatchSnapshot>) {
        if event.generation != self.generation {
            return;
        }
        match &event.event {
            MatchEvent::OpponentSolved { word, .. } => {
                let text = format!("Solved {}. {}", word, self.banter.reply(&Reaction::OpponentScored));
                self.say(Speaker::Bot, text);
                if let Some(snapshot) = snapshot {
                    if self.selected_word().id() == *word {
                        self.select_next_unsolved(snapshot);
                    }
                }
            }
            MatchEvent::MatchFinished { outcome, .. } => self.say(Speaker::Bot, Banter::verdict(*outcome)),
            MatchEvent::MatchStarted { .. } | MatchEvent::Correct { .. } | MatchEvent::Incorrect { .. } => {}
        }
    }

    /// Share of words solved by anyone, 0..=100
    pub fn progress(&self, snapshot: Option<&MatchSnapshot>) -> u16 {
        let total = self.puzzle.words().len();
        let solved = snapshot.map(|s| s.state.solved_by.len()).unwrap_or(0);
        ((solved * 100) / total.max(1)) as u16
    }
}
