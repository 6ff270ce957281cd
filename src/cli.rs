use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::Level;

use crate::core::config::{MatchConfig, Pace};
use crate::core::controller::{MatchOutcome, MatchState, Phase, Solver};
use crate::core::engine::MatchEngine;
use crate::core::store::{JsonFileStore, MatchStore, NoopStore};
use crate::puzzle::{bank, Puzzle};
use crate::tui::{self, app::App, banter::Banter, PuzzleSource};

#[derive(Parser)]
#[command(name = "xword-arena")]
#[command(about = "🧩 Race a sarcastic bot through a crossword in your terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play a match (the default)
    Play(PlayArgs),
    /// List the built-in puzzles
    List,
    /// Show the match stored by `play --save`
    Last {
        /// File written by `play --save`
        path: PathBuf,
    },
}

#[derive(Args, Default)]
pub struct PlayArgs {
    /// Built-in puzzle id (random if not given)
    #[arg(short, long, conflicts_with = "puzzle_file")]
    pub puzzle: Option<String>,

    /// Load the puzzle from a JSON file instead
    #[arg(long)]
    pub puzzle_file: Option<PathBuf>,

    /// Timing preset
    #[arg(long, value_enum, default_value_t = Pace::Classic)]
    pub pace: Pace,

    /// JSON file overriding the preset
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Match length in seconds
    #[arg(long, conflicts_with = "untimed")]
    pub duration: Option<u32>,

    /// Play until the grid is full
    #[arg(long)]
    pub untimed: bool,

    /// Seconds between opponent solves
    #[arg(long)]
    pub opponent_interval: Option<u64>,

    /// Seed for the opponent's picks
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the finished match to this JSON file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Write logs to this file (the terminal is busy with the game)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl PlayArgs {
    /// Preset, then config file, then individual flags
    pub fn match_config(&self) -> Result<MatchConfig> {
        let mut config = self.pace.config();
        if let Some(path) = &self.config {
            config = config.merge_file(path)?;
        }
        if self.untimed {
            config.duration_secs = None;
        }
        if let Some(duration) = self.duration {
            config.duration_secs = Some(duration);
        }
        if let Some(interval) = self.opponent_interval {
            config.opponent_interval_secs = interval;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate()?;
        Ok(config)
    }

    fn puzzle_source(&self) -> Result<PuzzleSource> {
        if let Some(path) = &self.puzzle_file {
            return Ok(PuzzleSource::Fixed(Arc::new(Puzzle::from_json_file(path)?)));
        }
        match &self.puzzle {
            Some(id) => {
                let entry = bank::get_puzzle(id)
                    .ok_or_else(|| anyhow!("Puzzle '{}' not found, try `xword-arena list`", id))?;
                Ok(PuzzleSource::Fixed(entry.load()?))
            }
            None => Ok(PuzzleSource::Bank),
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or_else(|| Commands::Play(PlayArgs::default())) {
        Commands::Play(args) => play(args).await,
        Commands::List => {
            init_stderr_tracing();
            println!("🧩 Available puzzles:");
            println!();
            for entry in bank::get_all_puzzles() {
                println!("📦 {}", entry.info.id);
                println!("   {}", entry.info.title);
                println!("   {}x{} grid, {} words", entry.info.rows, entry.info.cols, entry.info.words);
                println!();
            }
            Ok(())
        }
        Commands::Last { path } => {
            init_stderr_tracing();
            match JsonFileStore::new(path).load()? {
                Some(state) => print_summary(&state),
                None => println!("No saved match yet."),
            }
            Ok(())
        }
    }
}

async fn play(args: PlayArgs) -> Result<()> {
    if let Some(path) = &args.log_file {
        init_file_tracing(path, args.verbose)?;
    }

    let config = args.match_config()?;
    let source = args.puzzle_source()?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let puzzle = source.next(&mut rng)?;

    let store: Box<dyn MatchStore> = match &args.save {
        Some(path) => Box::new(JsonFileStore::new(path)),
        None => Box::new(NoopStore),
    };
    let (handle, engine_task) = MatchEngine::spawn_with_store(store);
    handle.start_new_match(Arc::clone(&puzzle), config.clone())?;

    let app = App::new(puzzle, Banter::new(StdRng::from_rng(&mut rng)));
    let terminal = ratatui::init();
    let result = tui::run(terminal, handle.clone(), app, config, source, rng).await;
    ratatui::restore();

    handle.shutdown();
    engine_task.await.context("match engine panicked")?;

    if let Some(state) = handle.snapshot().map(|s| s.state) {
        print_summary(&state);
    }
    result
}

/// The game owns the terminal, so logs only go to a file when asked for
fn init_file_tracing(path: &Path, verbose: bool) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn init_stderr_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(state: &MatchState) {
    let verdict = match state.phase {
        Phase::Finished(MatchOutcome::HumanWin) => "You won",
        Phase::Finished(MatchOutcome::OpponentWin) => "The bot won",
        Phase::Finished(MatchOutcome::Tie) => "It was a tie",
        Phase::InProgress => "Unfinished",
    };
    println!("🏁 {} on '{}': you {} · bot {}", verdict, state.puzzle_id, state.human_score, state.opponent_score);
    for (word, solver) in &state.solved_by {
        let who = match solver {
            Solver::Human => "you",
            Solver::Opponent => "bot",
        };
        println!("   {:>4}  {}", word.to_string(), who);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> PlayArgs {
        let cli = Cli::try_parse_from(std::iter::once("xword-arena").chain(args.iter().copied())).unwrap();
        match cli.command {
            Some(Commands::Play(play)) => play,
            _ => panic!("expected play"),
        }
    }

    #[test]
    fn flags_override_the_preset() {
        let config = parse(&["play", "--pace", "relaxed", "--opponent-interval", "4", "--seed", "8"])
            .match_config()
            .unwrap();
        assert_eq!(config.duration_secs, Some(180));
        assert_eq!(config.opponent_interval_secs, 4);
        assert_eq!(config.seed, Some(8));

        let config = parse(&["play", "--untimed"]).match_config().unwrap();
        assert_eq!(config.duration_secs, None);
    }

    #[test]
    fn invalid_timings_are_rejected() {
        assert!(parse(&["play", "--opponent-interval", "0"]).match_config().is_err());
        assert!(parse(&["play", "--opponent-interval", "18446744073709551615"]).match_config().is_err());
        assert!(Cli::try_parse_from(["xword-arena", "play", "--duration", "5", "--untimed"]).is_err());
    }

    #[test]
    fn unknown_puzzle_is_an_error() {
        assert!(parse(&["play", "--puzzle", "nope"]).puzzle_source().is_err());
        assert!(matches!(
            parse(&["play", "--puzzle", "mini-cpu-ram"]).puzzle_source().unwrap(),
            PuzzleSource::Fixed(_)
        ));
    }

    #[test]
    fn no_subcommand_means_play() {
        let cli = Cli::try_parse_from(["xword-arena"]).unwrap();
        assert!(cli.command.is_none());
    }
}
