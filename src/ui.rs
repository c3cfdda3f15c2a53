use anyhow::Result;
use bingo_ledger::{
    GameError, Line as BingoLine, SessionController, SessionState, SessionView, GRID_SIZE,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

const COLUMN_LETTERS: [&str; GRID_SIZE] = ["B", "I", "N", "G", "O"];

pub struct App {
    pub controller: SessionController,
    pub message: Option<(String, Color)>,
    pub paused: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(controller: SessionController, tick_ms: u64) -> Self {
        Self {
            controller,
            message: None,
            paused: false,
            tick_rate: Duration::from_millis(tick_ms),
        }
    }

    pub fn draw_number(&mut self) {
        match self.controller.draw() {
            Ok(outcome) if outcome.won => {
                self.message = Some((
                    format!("BINGO! You win! +{} coins", outcome.bonus),
                    Color::Yellow,
                ));
            }
            Ok(outcome) => {
                let text = if outcome.marked.is_some() {
                    format!("{} is on your card!", outcome.number)
                } else {
                    format!("Drew {}", outcome.number)
                };
                self.message = Some((text, Color::White));
            }
            Err(e) => self.report(e),
        }
    }

    pub fn restart(&mut self) {
        match self.controller.restart() {
            Ok(()) => self.message = Some(("Game restarted!".to_string(), Color::Green)),
            Err(e) => self.report(e),
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.controller.on_foreground();
            self.paused = false;
            self.message = Some(("Welcome back".to_string(), Color::Green));
        } else {
            match self.controller.on_background() {
                Ok(()) => {
                    self.paused = true;
                    self.message = Some(("Paused - coin timer stopped".to_string(), Color::DarkGray));
                }
                Err(e) => self.report(e),
            }
        }
    }

    pub fn tick(&mut self) {
        match self.controller.tick() {
            Ok(Some(outcome)) if outcome.credited > 0 => {
                self.message = Some((format!("+{} coin!", outcome.credited), Color::Green));
            }
            Ok(_) => {}
            Err(e) => self.report(e),
        }
    }

    fn report(&mut self, error: GameError) {
        if error.is_user_facing() {
            self.message = Some((error.user_message(), Color::Red));
        } else {
            tracing::error!(error = %error, "action failed");
            self.message = Some((format!("Error: {}", error), Color::Red));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.controller.on_foreground();

    // Run the app
    let res = run_app(&mut terminal, app);

    // Leaving the screen is a background event: stop coins, save the game
    let saved = app.controller.on_background();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }
    saved?;

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = app.tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('d') | KeyCode::Char(' ') if !app.paused => {
                            app.draw_number()
                        }
                        KeyCode::Char('r') if !app.paused => app.restart(),
                        KeyCode::Char('p') => app.toggle_pause(),
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= app.tick_rate {
            app.tick();
            last_tick = Instant::now();
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let view = app.controller.view();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Player header
            Constraint::Min(0),    // Card + draws
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], &view);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    render_card(f, content_chunks[0], &view);
    render_draws(f, content_chunks[1], &view);
    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, view: &SessionView) {
    let resets = match view.resets_left {
        Some(left) => format!("Resets left: {}", left),
        None => "Resets left: Unlimited (Guest)".to_string(),
    };
    let timer = match view.next_coin_secs {
        Some(secs) => format!("Next coin in: {}s", secs),
        None => String::new(),
    };

    let spans = vec![
        Span::styled(
            format!("Welcome, {}!", view.username),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(format!("Wins: {}", view.wins), Style::default().fg(Color::Yellow)),
        Span::raw("  |  "),
        Span::styled(format!("Coins: {}", view.coins), Style::default().fg(Color::Green)),
        Span::raw("  |  "),
        Span::styled(resets, Style::default().fg(Color::White)),
        Span::raw("  |  "),
        Span::styled(timer, Style::default().fg(Color::DarkGray)),
    ];

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_card(f: &mut Frame, area: Rect, view: &SessionView) {
    let header_cells = COLUMN_LETTERS.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = (0..GRID_SIZE).map(|row| {
        let cells = (0..GRID_SIZE).map(|col| {
            let label = match view.card {
                Some(card) if card.is_free(row, col) => "FREE".to_string(),
                Some(card) => card.get(row, col).to_string(),
                None => String::new(),
            };
            Cell::from(label).style(cell_style(view, row, col))
        });
        Row::new(cells).height(2)
    });

    let title = match view.state {
        SessionState::Won => " BINGO! ",
        _ => " Card ",
    };

    let table = Table::new(rows, vec![Constraint::Length(8); GRID_SIZE])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(title),
        );

    f.render_widget(table, area);
}

fn cell_style(view: &SessionView, row: usize, col: usize) -> Style {
    let on_line = view
        .winning_lines
        .iter()
        .any(|line: &BingoLine| line.contains(row, col));

    if on_line {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else if view.marks.is_marked(row, col) {
        Style::default().fg(Color::Black).bg(Color::Green)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render_draws(f: &mut Frame, area: Rect, view: &SessionView) {
    let drawn_label = match view.last_drawn {
        Some(number) => format!("Drawn: {}", number),
        None => "Drawn Number".to_string(),
    };

    let history = view
        .drawn
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    let lines = vec![
        Line::from(Span::styled(
            drawn_label,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("History ({}/75):", view.drawn.len()),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(history),
    ];

    let panel = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Draws "));

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if let Some((text, color)) = &app.message {
        status_spans.push(Span::styled(format!(" {} ", text), Style::default().fg(*color)));
        status_spans.push(Span::raw(" | "));
    }

    status_spans.push(Span::styled("d", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Draw | "));
    status_spans.push(Span::styled("r", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Restart | "));
    status_spans.push(Span::styled("p", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(if app.paused { " Resume | " } else { " Pause | " }));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}
