// 🎲 Game Session - card, draw history and marks for one game
//
// State machine: Uninitialized → Active ⇄ Won
// - initialize/restart: fresh card, cleared history → Active
// - load: restores a saved game → Active, or Won if it already has a line
// - draw: only while Active; may complete a line → Won
//
// The session never looks at coins. Callers gate draws on the ledger first.

use crate::card::{Card, CardGenerator, GRID_SIZE, MAX_NUMBER};
use crate::error::{GameError, GameResult};
use crate::win::{Line, MarkGrid, WinDetector};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Active,
    Won,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "Uninitialized",
            SessionState::Active => "Active",
            SessionState::Won => "Won",
        }
    }
}

/// Persisted unit: raw card values, draw order, marks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub card: [[i32; GRID_SIZE]; GRID_SIZE],
    pub drawn: Vec<i32>,
    pub marks: MarkGrid,
}

pub struct GameSession<R: Rng = StdRng> {
    rng: R,
    card: Option<Card>,
    drawn: Vec<u8>,
    marks: MarkGrid,
    state: SessionState,
}

impl<R: Rng> GameSession<R> {
    pub fn new(rng: R) -> Self {
        GameSession {
            rng,
            card: None,
            drawn: Vec::new(),
            marks: MarkGrid::new(),
            state: SessionState::Uninitialized,
        }
    }

    pub fn initialize(&mut self) {
        self.card = Some(CardGenerator::generate(&mut self.rng));
        self.marks = MarkGrid::new();
        self.drawn = Vec::new();
        self.state = SessionState::Active;
    }

    pub fn restart(&mut self) {
        self.initialize();
    }

    /// Restore a saved game verbatim. On error the session is untouched.
    pub fn load(&mut self, saved: GameState) -> GameResult<SessionState> {
        let card = Card::from_rows(saved.card)?;
        let drawn = validate_history(&saved.drawn)?;

        self.card = Some(card);
        self.drawn = drawn;
        self.marks = saved.marks;
        self.state = if WinDetector::has_win(&self.marks) {
            SessionState::Won
        } else {
            SessionState::Active
        };

        Ok(self.state)
    }

    /// Reveal one not-yet-drawn number and mark it if it is on the card
    pub fn draw(&mut self) -> GameResult<u8> {
        if self.is_exhausted() {
            return Err(GameError::Exhausted);
        }
        if self.state != SessionState::Active {
            return Err(GameError::NotActive);
        }

        let number = loop {
            let candidate = self.rng.gen_range(1..=MAX_NUMBER);
            if !self.drawn.contains(&candidate) {
                break candidate;
            }
        };
        self.drawn.push(number);

        if let Some((row, col)) = self.card.as_ref().and_then(|c| c.position_of(number)) {
            self.marks.mark(row, col);
            if WinDetector::has_win(&self.marks) {
                self.state = SessionState::Won;
            }
        }

        Ok(number)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn card(&self) -> Option<&Card> {
        self.card.as_ref()
    }

    pub fn drawn(&self) -> &[u8] {
        &self.drawn
    }

    pub fn marks(&self) -> MarkGrid {
        self.marks
    }

    pub fn last_drawn(&self) -> Option<u8> {
        self.drawn.last().copied()
    }

    pub fn is_exhausted(&self) -> bool {
        self.drawn.len() >= MAX_NUMBER as usize
    }

    pub fn winning_lines(&self) -> Vec<Line> {
        WinDetector::winning_lines(&self.marks)
    }

    /// Persistable copy; None before the first card exists
    pub fn snapshot(&self) -> Option<GameState> {
        self.card.as_ref().map(|card| GameState {
            card: card.rows(),
            drawn: self.drawn.iter().map(|n| *n as i32).collect(),
            marks: self.marks,
        })
    }
}

fn validate_history(drawn: &[i32]) -> GameResult<Vec<u8>> {
    let mut seen = HashSet::new();
    let mut history = Vec::with_capacity(drawn.len());

    for &number in drawn {
        if number < 1 || number > MAX_NUMBER as i32 {
            return Err(GameError::InvalidState(format!(
                "drawn number {} outside 1-{}",
                number, MAX_NUMBER
            )));
        }
        if !seen.insert(number) {
            return Err(GameError::InvalidState(format!(
                "number {} drawn twice",
                number
            )));
        }
        history.push(number as u8);
    }

    Ok(history)
}
