// 🎴 Bingo Card - 5×5 grid, one 15-number range per column
//
// Column c holds values from [15c+1, 15c+15], sorted top to bottom.
// The center cell is the FREE sentinel (0) and is always marked.

use crate::error::{GameError, GameResult};
use rand::Rng;
use std::collections::BTreeSet;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const GRID_SIZE: usize = 5;
pub const CENTER: usize = 2;
pub const FREE: u8 = 0;
pub const MAX_NUMBER: u8 = 75;
pub const NUMBERS_PER_COLUMN: u8 = 15;

/// Inclusive value range for a column
pub fn column_range(col: usize) -> (u8, u8) {
    let min = col as u8 * NUMBERS_PER_COLUMN + 1;
    (min, min + NUMBERS_PER_COLUMN - 1)
}

// ============================================================================
// CARD
// ============================================================================

/// Validated bingo card, indexed `[row][col]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    cells: [[u8; GRID_SIZE]; GRID_SIZE],
}

impl Card {
    /// Build a card from raw values, rejecting anything that breaks the card rules
    pub fn from_rows(rows: [[i32; GRID_SIZE]; GRID_SIZE]) -> GameResult<Self> {
        let mut cells = [[FREE; GRID_SIZE]; GRID_SIZE];

        for col in 0..GRID_SIZE {
            let (min, max) = column_range(col);
            let mut seen = BTreeSet::new();

            for row in 0..GRID_SIZE {
                let value = rows[row][col];

                if row == CENTER && col == CENTER {
                    if value != FREE as i32 {
                        return Err(GameError::InvalidState(format!(
                            "center cell must be FREE, found {}",
                            value
                        )));
                    }
                    continue;
                }

                if value < min as i32 || value > max as i32 {
                    return Err(GameError::InvalidState(format!(
                        "value {} at ({}, {}) outside column range {}-{}",
                        value, row, col, min, max
                    )));
                }
                if !seen.insert(value) {
                    return Err(GameError::InvalidState(format!(
                        "duplicate value {} in column {}",
                        value, col
                    )));
                }

                cells[row][col] = value as u8;
            }
        }

        Ok(Card { cells })
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row][col]
    }

    /// Raw values, row-major, for persistence and display
    pub fn rows(&self) -> [[i32; GRID_SIZE]; GRID_SIZE] {
        let mut rows = [[0i32; GRID_SIZE]; GRID_SIZE];
        for (row, line) in self.cells.iter().enumerate() {
            for (col, value) in line.iter().enumerate() {
                rows[row][col] = *value as i32;
            }
        }
        rows
    }

    /// Position of a number on the card, if present. FREE never matches.
    pub fn position_of(&self, number: u8) -> Option<(usize, usize)> {
        if number == FREE {
            return None;
        }
        // Each number can only live in its own column
        let col = ((number - 1) / NUMBERS_PER_COLUMN) as usize;
        if col >= GRID_SIZE {
            return None;
        }
        (0..GRID_SIZE)
            .find(|&row| self.cells[row][col] == number)
            .map(|row| (row, col))
    }

    pub fn is_free(&self, row: usize, col: usize) -> bool {
        self.cells[row][col] == FREE
    }
}

// ============================================================================
// GENERATOR
// ============================================================================

/// Produces fresh cards from a random source
pub struct CardGenerator;

impl CardGenerator {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Card {
        let mut cells = [[FREE; GRID_SIZE]; GRID_SIZE];

        for col in 0..GRID_SIZE {
            let (min, max) = column_range(col);

            // Sample with replacement, rejecting repeats; BTreeSet keeps them sorted
            let mut column = BTreeSet::new();
            while column.len() < GRID_SIZE {
                column.insert(rng.gen_range(min..=max));
            }

            for (row, value) in column.into_iter().enumerate() {
                cells[row][col] = if row == CENTER && col == CENTER {
                    FREE
                } else {
                    value
                };
            }
        }

        Card { cells }
    }
}
