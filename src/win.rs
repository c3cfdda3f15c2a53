// 🏁 Marking grid and win detection
// A win is any fully-marked row, column or diagonal (12 lines)

use crate::card::{CENTER, GRID_SIZE};

// ============================================================================
// MARK GRID
// ============================================================================

/// Marked cells parallel to the card. The FREE cell is always marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkGrid {
    cells: [[bool; GRID_SIZE]; GRID_SIZE],
}

impl MarkGrid {
    /// Fresh grid: only the FREE cell marked
    pub fn new() -> Self {
        let mut cells = [[false; GRID_SIZE]; GRID_SIZE];
        cells[CENTER][CENTER] = true;
        MarkGrid { cells }
    }

    /// Grid from raw flags; the FREE cell is forced on
    pub fn from_cells(mut cells: [[bool; GRID_SIZE]; GRID_SIZE]) -> Self {
        cells[CENTER][CENTER] = true;
        MarkGrid { cells }
    }

    pub fn is_marked(&self, row: usize, col: usize) -> bool {
        self.cells[row][col]
    }

    pub fn mark(&mut self, row: usize, col: usize) {
        self.cells[row][col] = true;
    }

    pub fn cells(&self) -> [[bool; GRID_SIZE]; GRID_SIZE] {
        self.cells
    }

    pub fn marked_count(&self) -> usize {
        self.cells.iter().flatten().filter(|m| **m).count()
    }
}

impl Default for MarkGrid {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// LINES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Row(usize),
    Column(usize),
    /// (0,0) .. (4,4)
    Diagonal,
    /// (0,4) .. (4,0)
    AntiDiagonal,
}

impl Line {
    /// All 12 lines
    pub fn all() -> impl Iterator<Item = Line> {
        (0..GRID_SIZE)
            .map(Line::Row)
            .chain((0..GRID_SIZE).map(Line::Column))
            .chain([Line::Diagonal, Line::AntiDiagonal])
    }

    pub fn cells(&self) -> [(usize, usize); GRID_SIZE] {
        let mut cells = [(0, 0); GRID_SIZE];
        for (i, cell) in cells.iter_mut().enumerate() {
            *cell = match *self {
                Line::Row(row) => (row, i),
                Line::Column(col) => (i, col),
                Line::Diagonal => (i, i),
                Line::AntiDiagonal => (i, GRID_SIZE - 1 - i),
            };
        }
        cells
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.cells().contains(&(row, col))
    }
}

// ============================================================================
// WIN DETECTOR
// ============================================================================

pub struct WinDetector;

impl WinDetector {
    pub fn has_win(marks: &MarkGrid) -> bool {
        Line::all().any(|line| Self::is_complete(marks, line))
    }

    /// Every completed line, in row/column/diagonal order
    pub fn winning_lines(marks: &MarkGrid) -> Vec<Line> {
        Line::all()
            .filter(|line| Self::is_complete(marks, *line))
            .collect()
    }

    fn is_complete(marks: &MarkGrid, line: Line) -> bool {
        line.cells()
            .iter()
            .all(|&(row, col)| marks.is_marked(row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(cells: &[(usize, usize)]) -> MarkGrid {
        let mut grid = MarkGrid::new();
        for &(row, col) in cells {
            grid.mark(row, col);
        }
        grid
    }

    #[test]
    fn test_all_marked_wins() {
        let grid = MarkGrid::from_cells([[true; 5]; 5]);
        assert!(WinDetector::has_win(&grid));
        assert_eq!(WinDetector::winning_lines(&grid).len(), 12);
    }

    #[test]
    fn test_fresh_grid_does_not_win() {
        // FREE cell alone is never a line
        assert!(!WinDetector::has_win(&MarkGrid::new()));
    }

    #[test]
    fn test_row_zero_wins() {
        let grid = grid_with(&[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)]);
        assert!(WinDetector::has_win(&grid));
        assert_eq!(WinDetector::winning_lines(&grid), vec![Line::Row(0)]);
    }

    #[test]
    fn test_anti_diagonal_wins() {
        let grid = grid_with(&[(0, 4), (1, 3), (3, 1), (4, 0)]);
        assert!(WinDetector::has_win(&grid));
        assert_eq!(WinDetector::winning_lines(&grid), vec![Line::AntiDiagonal]);
    }

    #[test]
    fn test_column_and_diagonal() {
        let column = grid_with(&[(0, 3), (1, 3), (2, 3), (3, 3), (4, 3)]);
        assert_eq!(WinDetector::winning_lines(&column), vec![Line::Column(3)]);

        let diagonal = grid_with(&[(0, 0), (1, 1), (3, 3), (4, 4)]);
        assert_eq!(WinDetector::winning_lines(&diagonal), vec![Line::Diagonal]);
    }

    #[test]
    fn test_four_in_a_row_is_not_a_win() {
        let grid = grid_with(&[(4, 0), (4, 1), (4, 2), (4, 3)]);
        assert!(!WinDetector::has_win(&grid));
    }

    #[test]
    fn test_free_cell_forced_on() {
        let grid = MarkGrid::from_cells([[false; 5]; 5]);
        assert!(grid.is_marked(2, 2));
        assert_eq!(grid.marked_count(), 1);
    }

    #[test]
    fn test_line_contains() {
        assert!(Line::AntiDiagonal.contains(2, 2));
        assert!(Line::Column(1).contains(4, 1));
        assert!(!Line::Row(0).contains(1, 0));
    }
}
