use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use rand::rngs::StdRng;
use ratatui::DefaultTerminal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::core::config::MatchConfig;
use crate::core::engine::MatchHandle;
use crate::core::error::MatchError;
use crate::puzzle::{bank, Puzzle};
use crate::tui::app::{App, InputMode};
use crate::tui::render;

const FRAME_RATE: Duration = Duration::from_millis(33);

/// Where the next match's puzzle comes from
pub enum PuzzleSource {
    /// Random pick from the built-in bank every match
    Bank,
    /// The same puzzle every match
    Fixed(Arc<Puzzle>),
}

impl PuzzleSource {
    pub fn next(&self, rng: &mut StdRng) -> Result<Arc<Puzzle>> {
        match self {
            PuzzleSource::Bank => bank::random_puzzle(rng),
            PuzzleSource::Fixed(puzzle) => Ok(Arc::clone(puzzle)),
        }
    }
}

/// Front-end loop: draw, poll keys, react to engine events.
/// Expects the first match to be started already.
pub async fn run(
    mut terminal: DefaultTerminal,
    handle: MatchHandle,
    mut app: App,
    config: MatchConfig,
    source: PuzzleSource,
    mut rng: StdRng,
) -> Result<()> {
    let mut events = handle.subscribe();
    let mut render_timer = tokio::time::interval(FRAME_RATE);

    loop {
        let snapshot = handle.snapshot();
        terminal.draw(|f| render::render(f, &app, snapshot.as_ref()))?;

        // INPUT (Non-blocking)
        if event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(key, &mut app, &handle, &config, &source, &mut rng).await?;
                }
            }
        }
        if app.should_quit {
            break;
        }

        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => app.on_event(&event, handle.snapshot().as_ref()),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "front end fell behind on match events"),
                Err(RecvError::Closed) => break,
            },

            _ = render_timer.tick() => {}
        }
    }

    Ok(())
}

async fn handle_key(
    key: KeyEvent,
    app: &mut App,
    handle: &MatchHandle,
    config: &MatchConfig,
    source: &PuzzleSource,
    rng: &mut StdRng,
) -> Result<()> {
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Up => app.select_prev(),
        KeyCode::Down => app.select_next(),
        KeyCode::Tab => app.toggle_mode(),
        KeyCode::Backspace => app.pop_char(),
        KeyCode::Char(c) => app.push_char(c),
        KeyCode::F(2) => {
            let puzzle = source.next(rng)?;
            info!(puzzle = puzzle.id(), "player asked for a new match");
            app.restart(Arc::clone(&puzzle));
            handle.start_new_match(puzzle, config.clone())?;
        }
        KeyCode::Enter => {
            let text = app.take_input();
            match app.mode {
                InputMode::Chat => app.record_chat(&text),
                InputMode::Guess => {
                    let word = app.selected_word().id();
                    let result = handle.submit_guess(word, text.as_str()).await;
                    if result == Err(MatchError::EngineClosed) {
                        return Err(MatchError::EngineClosed.into());
                    }
                    app.record_guess(&text, &result, handle.snapshot().as_ref());
                }
            }
        }
        _ => {}
    }
    Ok(())
}
