use std::collections::HashMap;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::core::controller::{Cell, MatchOutcome, MatchSnapshot, Phase, Solver};
use crate::tui::app::{App, InputMode, Speaker};

/// Draws the whole match screen from the latest snapshot
pub fn render(frame: &mut Frame, app: &App, snapshot: Option<&MatchSnapshot>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Progress
            Constraint::Min(0),    // Board + chat
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app, snapshot);

    frame.render_widget(
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(" Progress "))
            .gauge_style(Style::default().fg(Color::Green))
            .percent(app.progress(snapshot)),
        chunks[1],
    );

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[2]);

    let grid_height = app.puzzle.rows() as u16 + 2;
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(grid_height), Constraint::Min(0), Constraint::Length(3)])
        .split(body[0]);

    render_grid(frame, left[0], app, snapshot);
    render_clues(frame, left[1], app, snapshot);
    render_input(frame, left[2], app);
    render_chat(frame, body[1], app);

    frame.render_widget(
        Paragraph::new("[↑/↓] Clue  [Enter] Submit  [Tab] Guess/Chat  [F2] New match  [Esc] Quit")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray)),
        chunks[3],
    );

    if let Some(MatchSnapshot { state, .. }) = snapshot {
        if let Phase::Finished(outcome) = state.phase {
            render_game_over(frame, outcome, state.human_score, state.opponent_score);
        }
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App, snapshot: Option<&MatchSnapshot>) {
    let (human, opponent, clock) = match snapshot {
        Some(s) => (
            s.state.human_score,
            s.state.opponent_score,
            s.state.time_remaining.map(|t| format!("⏱ {}s", t)).unwrap_or_else(|| "⏱ --".to_string()),
        ),
        None => (0, 0, "⏱ --".to_string()),
    };

    let leader = Style::default().fg(Color::Black).bg(Color::White).add_modifier(Modifier::BOLD);
    let (you_style, bot_style) = if human >= opponent {
        (leader, Style::default())
    } else {
        (Style::default(), leader)
    };

    let line = Line::from(vec![
        Span::styled(" XB ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {}  vs  {}   ", "You", app.banter.bot_name())),
        Span::styled(format!(" You {} ", human), you_style),
        Span::raw("  "),
        Span::styled(format!(" Bot {} ", opponent), bot_style),
        Span::raw(format!("   {}", clock)),
    ]);

    frame.render_widget(
        Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Crossword Battle Arena: {} ", app.puzzle.title())),
        ),
        area,
    );
}

fn render_grid(frame: &mut Frame, area: Rect, app: &App, snapshot: Option<&MatchSnapshot>) {
    // Who filled each cell, so letters can be colored by solver
    let mut owners: HashMap<(usize, usize), Solver> = HashMap::new();
    if let Some(s) = snapshot {
        for word in app.puzzle.words() {
            if let Some(&solver) = s.state.solved_by.get(&word.id()) {
                for cell in word.cells() {
                    owners.insert(cell, solver);
                }
            }
        }
    }
    let highlighted: Vec<(usize, usize)> = app.selected_word().cells().collect();

    let lines: Vec<Line> = (0..app.puzzle.rows())
        .map(|row| {
            let spans: Vec<Span> = (0..app.puzzle.cols())
                .map(|col| {
                    let cell = match snapshot {
                        Some(s) => s.state.cell(row, col),
                        None if app.puzzle.is_block(row, col) => Cell::Block,
                        None => Cell::Empty,
                    };
                    let mut style = match owners.get(&(row, col)) {
                        Some(Solver::Human) => Style::default().fg(Color::Green),
                        Some(Solver::Opponent) => Style::default().fg(Color::Red),
                        None => Style::default(),
                    };
                    if highlighted.contains(&(row, col)) {
                        style = style.bg(Color::Blue);
                    }
                    match cell {
                        Cell::Block => Span::styled("███", Style::default().fg(Color::DarkGray)),
                        Cell::Empty => Span::styled(" · ", style),
                        Cell::Letter(c) => Span::styled(format!(" {} ", c), style.add_modifier(Modifier::BOLD)),
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Grid ")),
        area,
    );
}

fn render_clues(frame: &mut Frame, area: Rect, app: &App, snapshot: Option<&MatchSnapshot>) {
    let items: Vec<ListItem> = app
        .puzzle
        .words()
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let solver = snapshot.and_then(|s| s.state.solved_by.get(&word.id()).copied());
            let status = match solver {
                Some(Solver::Human) => format!("✔ you: {}", word.answer),
                Some(Solver::Opponent) => format!("✘ bot: {}", word.answer),
                None => format!("{} letters", word.len()),
            };
            let mut style = match solver {
                Some(Solver::Human) => Style::default().fg(Color::Green),
                Some(Solver::Opponent) => Style::default().fg(Color::Red),
                None => Style::default(),
            };
            if i == app.selected {
                style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
            }
            ListItem::new(format!(" {:>4}  {}  ({})", word.id().to_string(), word.clue, status)).style(style)
        })
        .collect();

    frame.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title(" Clues ")),
        area,
    );
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let title = match app.mode {
        InputMode::Guess => format!(" Answer {} ", app.selected_word().id()),
        InputMode::Chat => " Chat ".to_string(),
    };
    frame.render_widget(
        Paragraph::new(format!("> {}", app.input)).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
    frame.set_cursor_position((area.x + 3 + app.input.chars().count() as u16, area.y + 1));
}

fn render_chat(frame: &mut Frame, area: Rect, app: &App) {
    // Only the tail that fits; older lines scroll away
    let visible = area.height.saturating_sub(2) as usize;
    let start = app.chat.len().saturating_sub(visible);
    let lines: Vec<Line> = app.chat[start..]
        .iter()
        .map(|line| match line.who {
            Speaker::Me => Line::from(vec![
                Span::styled("you: ", Style::default().fg(Color::Cyan)),
                Span::raw(line.text.as_str()),
            ]),
            Speaker::Bot => Line::from(vec![
                Span::styled("bot: ", Style::default().fg(Color::Magenta)),
                Span::raw(line.text.as_str()),
            ]),
        })
        .collect();

    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(format!(" {} ", app.banter.bot_name()))),
        area,
    );
}

fn render_game_over(frame: &mut Frame, outcome: MatchOutcome, human: u32, opponent: u32) {
    let area = centered_rect(50, 30, frame.area());
    let headline = match outcome {
        MatchOutcome::HumanWin => "🏆 You win!",
        MatchOutcome::OpponentWin => "💀 Bot wins!",
        MatchOutcome::Tie => "It's a tie!",
    };
    let text = vec![
        Line::from(Span::styled(headline, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(format!("You {}  ·  Bot {}", human, opponent)),
        Line::from(""),
        Line::from("[F2] Play again   [Esc] Quit"),
    ];

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Game over ")),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
