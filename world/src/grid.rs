//! Row-major storage of the live rows, addressed by absolute coordinates.

use std::collections::VecDeque;

use endless_pipes_core::{CellCoord, Direction};

use crate::{cell::Cell, config::ConfigError, flow::PipeNetwork};

/// Contiguous row-major storage for the live rows of the level.
///
/// Rows keep their absolute index while older rows are retired from the
/// front, so coordinates handed out earlier stay valid until their row is
/// dropped.
#[derive(Clone, Debug)]
pub struct Grid {
    columns: u32,
    first_row: u32,
    cells: VecDeque<Cell>,
}

impl Grid {
    /// Creates an empty grid with the provided width.
    #[must_use]
    pub fn new(columns: u32) -> Self {
        Self {
            columns,
            first_row: 0,
            cells: VecDeque::new(),
        }
    }

    /// Builds a grid from hand-authored rows starting at `first_row`.
    pub fn from_rows(
        columns: u32,
        first_row: u32,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self, ConfigError> {
        let mut grid = Self {
            columns,
            first_row,
            cells: VecDeque::new(),
        };
        for (offset, row) in rows.into_iter().enumerate() {
            if row.len() != columns as usize {
                return Err(ConfigError::RowWidth {
                    row: first_row.saturating_add(offset as u32),
                    expected: columns,
                    found: row.len(),
                });
            }
            grid.cells.extend(row);
        }
        Ok(grid)
    }

    /// Number of columns in every row.
    #[must_use]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Absolute index of the oldest live row.
    #[must_use]
    pub fn first_row(&self) -> u32 {
        self.first_row
    }

    /// Absolute index one past the newest live row.
    #[must_use]
    pub fn end_row(&self) -> u32 {
        self.first_row.saturating_add(self.row_count())
    }

    /// Number of live rows.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        if self.columns == 0 {
            return 0;
        }
        (self.cells.len() / self.columns as usize) as u32
    }

    /// Returns the cell stored at the provided coordinate, if it is live.
    #[must_use]
    pub fn cell(&self, at: CellCoord) -> Option<&Cell> {
        self.index(at).and_then(|index| self.cells.get(index))
    }

    /// Returns mutable access to the cell stored at the provided coordinate.
    pub fn cell_mut(&mut self, at: CellCoord) -> Option<&mut Cell> {
        self.index(at).and_then(|index| self.cells.get_mut(index))
    }

    /// Iterates every live cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &Cell)> + '_ {
        let columns = self.columns.max(1) as usize;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            let column = (index % columns) as u32;
            let row = self.first_row + (index / columns) as u32;
            (CellCoord::new(column, row), cell)
        })
    }

    /// Iterates every live cell mutably in row-major order.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (CellCoord, &mut Cell)> + '_ {
        let columns = self.columns.max(1) as usize;
        let first_row = self.first_row;
        self.cells.iter_mut().enumerate().map(move |(index, cell)| {
            let column = (index % columns) as u32;
            let row = first_row + (index / columns) as u32;
            (CellCoord::new(column, row), cell)
        })
    }

    /// Resolves the neighbour reached through `direction` together with the
    /// port through which it would receive fluid.
    ///
    /// Returns `None` at the left, right and top edges and beyond the newest
    /// generated row.
    #[must_use]
    pub fn get_from(&self, at: CellCoord, direction: Direction) -> Option<(Direction, CellCoord)> {
        let neighbor = at.step(direction)?;
        self.index(neighbor).map(|_| (direction.opposite(), neighbor))
    }

    pub(crate) fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns as usize, "row width mismatch");
        self.cells.extend(row);
    }

    pub(crate) fn retire_front_row(&mut self) -> Option<Vec<Cell>> {
        if self.row_count() == 0 {
            return None;
        }
        let row: Vec<Cell> = self.cells.drain(..self.columns as usize).collect();
        self.first_row += 1;
        Some(row)
    }

    pub(crate) fn swap_cells(&mut self, first: CellCoord, second: CellCoord) -> bool {
        let (Some(a), Some(b)) = (self.index(first), self.index(second)) else {
            return false;
        };
        self.cells.swap(a, b);
        for index in [a, b] {
            if let Some(cell) = self.cells.get_mut(index) {
                cell.mark_dirty();
            }
        }
        true
    }

    fn index(&self, at: CellCoord) -> Option<usize> {
        if at.column() >= self.columns || at.row() < self.first_row || at.row() >= self.end_row() {
            return None;
        }
        let row = usize::try_from(at.row() - self.first_row).ok()?;
        let column = usize::try_from(at.column()).ok()?;
        Some(row * self.columns as usize + column)
    }
}

impl PipeNetwork for Grid {
    fn cell_mut(&mut self, at: CellCoord) -> Option<&mut Cell> {
        Grid::cell_mut(self, at)
    }

    fn get_from(&self, at: CellCoord, direction: Direction) -> Option<(Direction, CellCoord)> {
        Grid::get_from(self, at, direction)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use endless_pipes_core::{Orientation, TileCatalog};

    use super::*;

    fn row_of(columns: u32) -> Vec<Cell> {
        let catalog = TileCatalog::standard();
        let cross = catalog.get("cross").expect("cross");
        (0..columns)
            .map(|_| Cell::new(Arc::clone(cross), Orientation::IDENTITY))
            .collect()
    }

    #[test]
    fn neighbour_lookup_stops_at_edges() {
        let grid = Grid::from_rows(3, 0, vec![row_of(3), row_of(3)]).expect("valid rows");

        assert!(grid.get_from(CellCoord::new(0, 0), Direction::Top).is_none());
        assert!(grid.get_from(CellCoord::new(0, 0), Direction::Left).is_none());
        assert!(grid.get_from(CellCoord::new(2, 1), Direction::Right).is_none());
        assert!(grid.get_from(CellCoord::new(1, 1), Direction::Bottom).is_none());
        assert_eq!(
            grid.get_from(CellCoord::new(1, 0), Direction::Bottom),
            Some((Direction::Top, CellCoord::new(1, 1)))
        );
        assert_eq!(
            grid.get_from(CellCoord::new(1, 0), Direction::Right),
            Some((Direction::Left, CellCoord::new(2, 0)))
        );
    }

    #[test]
    fn retiring_rows_keeps_absolute_coordinates() {
        let mut grid = Grid::from_rows(2, 0, vec![row_of(2), row_of(2), row_of(2)])
            .expect("valid rows");
        let retired = grid.retire_front_row().expect("row available");

        assert_eq!(retired.len(), 2);
        assert_eq!(grid.first_row(), 1);
        assert_eq!(grid.end_row(), 3);
        assert!(grid.cell(CellCoord::new(0, 0)).is_none());
        assert!(grid.cell(CellCoord::new(1, 2)).is_some());
        assert!(
            grid.get_from(CellCoord::new(0, 1), Direction::Top).is_none(),
            "retired rows behave like the top edge"
        );
        let coords: Vec<CellCoord> = grid.iter().map(|(coord, _)| coord).collect();
        assert_eq!(coords.first(), Some(&CellCoord::new(0, 1)));
        assert_eq!(coords.last(), Some(&CellCoord::new(1, 2)));
    }

    #[test]
    fn mismatched_row_width_is_rejected() {
        let error = Grid::from_rows(3, 4, vec![row_of(3), row_of(2)]).expect_err("bad width");
        assert_eq!(
            error,
            ConfigError::RowWidth {
                row: 5,
                expected: 3,
                found: 2
            }
        );
    }
}
