/// Macro to register built-in puzzles with an automatic builder per entry
///
/// Usage in puzzle/bank.rs:
/// ```ignore
/// register_puzzles! {
///     "mini-cpu-ram" => {
///         title: "Hardware",
///         size: (1, 9),
///         words: [
///             (1, Across, 0, 0, "CPU", "Does the thinking"),
///             (2, Across, 0, 6, "RAM", "Forgets on power loss"),
///         ]
///     },
/// }
/// ```
#[macro_export]
macro_rules! register_puzzles {
    (
        $(
            $id:literal => {
                title: $title:expr,
                size: ($rows:expr, $cols:expr),
                words: [
                    $( ($num:expr, $dir:ident, $row:expr, $col:expr, $answer:expr, $clue:expr) ),* $(,)?
                ]
            }
        ),* $(,)?
    ) => {
        /// Every built-in puzzle, in registration order
        pub fn get_all_puzzles() -> Vec<PuzzleEntry> {
            vec![
                $(
                    PuzzleEntry {
                        info: PuzzleInfo {
                            id: $id,
                            title: $title,
                            rows: $rows,
                            cols: $cols,
                            words: [$($answer),*].len(),
                        },
                        build: || {
                            use $crate::puzzle::{Direction, Puzzle, Word};

                            Puzzle::new($id, $title, $rows, $cols, vec![
                                $( Word::new($num, Direction::$dir, $row, $col, $answer, $clue) ),*
                            ])
                        },
                    }
                ),*
            ]
        }

        /// Get a puzzle entry by id
        pub fn get_puzzle(id: &str) -> Option<PuzzleEntry> {
            get_all_puzzles().into_iter().find(|p| p.info.id == id)
        }
    };
}
