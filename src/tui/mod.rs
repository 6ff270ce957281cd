/// Terminal front end built on ratatui
pub mod app;
pub mod banter;
pub mod render;
pub mod runner;

pub use runner::{run, PuzzleSource};
