/// Built-in puzzles. Add new ones to the `register_puzzles!` block.
use std::sync::Arc;

use anyhow::{anyhow, Result};
use rand::Rng;

use crate::core::error::PuzzleError;
use crate::puzzle::Puzzle;
use crate::register_puzzles;

/// What the bank knows about a puzzle without building it
#[derive(Clone, Debug)]
pub struct PuzzleInfo {
    pub id: &'static str,
    pub title: &'static str,
    pub rows: usize,
    pub cols: usize,
    pub words: usize,
}

pub type PuzzleBuilder = fn() -> Result<Puzzle, PuzzleError>;

#[derive(Clone)]
pub struct PuzzleEntry {
    pub info: PuzzleInfo,
    pub build: PuzzleBuilder,
}

impl PuzzleEntry {
    pub fn load(&self) -> Result<Arc<Puzzle>> {
        let puzzle = (self.build)().map_err(|e| anyhow!("built-in puzzle '{}' is broken: {}", self.info.id, e))?;
        Ok(Arc::new(puzzle))
    }
}

register_puzzles! {
    "mini-apple-robot-india" => {
        title: "Apple, Robot, India",
        size: (5, 5),
        words: [
            (1, Across, 0, 0, "APPLE", "Keeps the doctor away (allegedly)"),
            (2, Across, 2, 0, "ROBOT", "Mechanized helper"),
            (3, Across, 4, 0, "INDIA", "Country with the Taj Mahal"),
        ]
    },
    "mini-mango-laser-earth" => {
        title: "Mango, Laser, Earth",
        size: (5, 5),
        words: [
            (1, Across, 0, 0, "MANGO", "The king of fruits (in summer)"),
            (2, Across, 2, 0, "LASER", "Intense light beam"),
            (3, Across, 4, 0, "EARTH", "Our home planet"),
        ]
    },
    "mini-pearl-spice-river" => {
        title: "Pearl, Spice, River",
        size: (5, 5),
        words: [
            (1, Across, 0, 0, "PEARL", "Gem from an oyster"),
            (2, Across, 2, 0, "SPICE", "Adds heat to curry"),
            (3, Across, 4, 0, "RIVER", "Flows to the sea"),
        ]
    },
    "mini-cpu-ram" => {
        title: "Hardware",
        size: (1, 9),
        words: [
            (1, Across, 0, 0, "CPU", "Does the thinking"),
            (2, Across, 0, 6, "RAM", "Forgets everything on power loss"),
        ]
    },
    "frame-stack-local" => {
        title: "Frame",
        size: (5, 5),
        words: [
            (1, Across, 0, 0, "STACK", "Pile of plates, or of frames"),
            (1, Down, 0, 0, "SHELL", "Where commands get typed"),
            (2, Down, 0, 4, "KNEEL", "Get down on one knee"),
            (3, Across, 4, 0, "LOCAL", "Nearby, or not global"),
        ]
    },
}

/// Picks one bank puzzle uniformly at random
pub fn random_puzzle<R: Rng + ?Sized>(rng: &mut R) -> Result<Arc<Puzzle>> {
    let all = get_all_puzzles();
    if all.is_empty() {
        return Err(anyhow!("the puzzle bank is empty"));
    }
    all[rng.random_range(0..all.len())].load()
}
