// 🧾 State Codec - flat text form of a game for the users table
//
// card_state:   25 comma-separated integers, row-major, FREE as 0
// drawn_state:  comma-separated draw order, "" when nothing drawn
// marked_state: 25 comma-separated "1"/"0" flags, row-major
//
// An empty card_state means "no saved game". It is not an error.

use crate::card::GRID_SIZE;
use crate::error::{GameError, GameResult};
use crate::session::GameState;
use crate::win::MarkGrid;

const CELLS: usize = GRID_SIZE * GRID_SIZE;

/// The three persisted state columns, exactly as stored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedGame {
    pub card: String,
    pub drawn: String,
    pub marked: String,
}

impl EncodedGame {
    /// Canonical "no saved state" marker
    pub fn absent() -> Self {
        EncodedGame::default()
    }

    pub fn is_absent(&self) -> bool {
        self.card.is_empty()
    }
}

pub fn encode(state: &GameState) -> EncodedGame {
    let card = state
        .card
        .iter()
        .flatten()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let drawn = state
        .drawn
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let marked = state
        .marks
        .cells()
        .iter()
        .flatten()
        .map(|m| if *m { "1" } else { "0" })
        .collect::<Vec<_>>()
        .join(",");

    EncodedGame { card, drawn, marked }
}

/// Ok(None) when nothing is saved; CorruptState when the fields do not parse
pub fn decode(encoded: &EncodedGame) -> GameResult<Option<GameState>> {
    if encoded.is_absent() {
        return Ok(None);
    }

    let card = decode_card(&encoded.card)?;
    let drawn = decode_drawn(&encoded.drawn)?;
    let marks = decode_marked(&encoded.marked);

    Ok(Some(GameState { card, drawn, marks }))
}

fn decode_card(field: &str) -> GameResult<[[i32; GRID_SIZE]; GRID_SIZE]> {
    let parts: Vec<&str> = field.split(',').collect();
    if parts.len() != CELLS {
        return Err(GameError::CorruptState(format!(
            "card has {} cells, expected {}",
            parts.len(),
            CELLS
        )));
    }

    let mut card = [[0i32; GRID_SIZE]; GRID_SIZE];
    for (index, part) in parts.iter().enumerate() {
        let value = part.trim().parse::<i32>().map_err(|_| {
            GameError::CorruptState(format!("card cell {} is not a number: {:?}", index, part))
        })?;
        card[index / GRID_SIZE][index % GRID_SIZE] = value;
    }

    Ok(card)
}

fn decode_drawn(field: &str) -> GameResult<Vec<i32>> {
    if field.is_empty() {
        return Ok(Vec::new());
    }

    field
        .split(',')
        .map(|part| {
            part.trim().parse::<i32>().map_err(|_| {
                GameError::CorruptState(format!("drawn entry is not a number: {:?}", part))
            })
        })
        .collect()
}

// Lenient: anything but "1" is unmarked, missing flags are unmarked
fn decode_marked(field: &str) -> MarkGrid {
    let mut cells = [[false; GRID_SIZE]; GRID_SIZE];
    if !field.is_empty() {
        for (index, flag) in field.split(',').take(CELLS).enumerate() {
            cells[index / GRID_SIZE][index % GRID_SIZE] = flag.trim() == "1";
        }
    }
    MarkGrid::from_cells(cells)
}
