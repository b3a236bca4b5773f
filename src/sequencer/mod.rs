/// Note grid - the single source of truth for which notes are active
///
/// Cells are atomics so the audio callback can read them while the control
/// side edits, without locks. A late write shows up at most one buffer late.
use std::sync::atomic::{AtomicBool, Ordering};

pub mod history;
pub mod playback;

#[derive(Debug)]
pub struct NoteGrid {
    /// Column-major: cell (col, row) lives at `col * rows + row`
    cells: Box<[AtomicBool]>,
    columns: usize,
    rows: usize,
}

impl NoteGrid {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            cells: (0..columns * rows).map(|_| AtomicBool::new(false)).collect(),
            columns,
            rows,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Out-of-range coordinates map to `None`; callers treat them as no-ops.
    fn index(&self, col: i32, row: i32) -> Option<usize> {
        let col = usize::try_from(col).ok().filter(|&c| c < self.columns)?;
        let row = usize::try_from(row).ok().filter(|&r| r < self.rows)?;
        Some(col * self.rows + row)
    }

    pub fn get(&self, col: i32, row: i32) -> bool {
        self.index(col, row)
            .map(|i| self.cells[i].load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    pub fn set(&self, col: i32, row: i32, value: bool) {
        if let Some(i) = self.index(col, row) {
            self.cells[i].store(value, Ordering::Relaxed);
        }
    }

    pub fn toggle(&self, col: i32, row: i32) {
        if let Some(i) = self.index(col, row) {
            self.cells[i].fetch_xor(true, Ordering::Relaxed);
        }
    }

    /// Whether `row` is active in `column`, for the render path which
    /// already works in unsigned indices.
    pub fn is_active(&self, column: usize, row: usize) -> bool {
        if column >= self.columns || row >= self.rows {
            return false;
        }
        self.cells[column * self.rows + row].load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        for cell in self.cells.iter() {
            cell.store(false, Ordering::Relaxed);
        }
    }

    /// Number of cells, i.e. the length `copy_to` and `copy_from` expect.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Copy every cell into `out` (column-major).
    pub fn copy_to(&self, out: &mut [bool]) {
        for (dst, cell) in out.iter_mut().zip(self.cells.iter()) {
            *dst = cell.load(Ordering::Relaxed);
        }
    }

    /// Overwrite every cell from `cells` (column-major).
    pub fn copy_from(&self, cells: &[bool]) {
        for (cell, &value) in self.cells.iter().zip(cells) {
            cell.store(value, Ordering::Relaxed);
        }
    }

    pub fn active_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.load(Ordering::Relaxed))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_creation() {
        let grid = NoteGrid::new(32, 25);
        assert_eq!(grid.columns(), 32);
        assert_eq!(grid.rows(), 25);
        assert_eq!(grid.len(), 32 * 25);
        assert_eq!(grid.active_count(), 0);
    }

    #[test]
    fn test_grid_toggle() {
        let grid = NoteGrid::new(4, 4);
        assert!(!grid.get(0, 0));
        grid.toggle(0, 0);
        assert!(grid.get(0, 0));
        grid.toggle(0, 0);
        assert!(!grid.get(0, 0));
    }

    #[test]
    fn test_set_only_touches_one_cell() {
        let grid = NoteGrid::new(4, 3);
        grid.set(2, 1, true);
        assert!(grid.get(2, 1));
        assert!(grid.is_active(2, 1));
        assert_eq!(grid.active_count(), 1);
        assert!(!grid.get(1, 2));
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let grid = NoteGrid::new(4, 3);
        for (col, row) in [(-1, 0), (0, -1), (4, 0), (0, 3), (i32::MIN, i32::MAX)] {
            grid.set(col, row, true);
            grid.toggle(col, row);
            assert!(!grid.get(col, row));
        }
        assert!(!grid.is_active(4, 0));
        assert_eq!(grid.active_count(), 0);
    }

    #[test]
    fn test_copy_round_trip() {
        let grid = NoteGrid::new(3, 2);
        grid.set(0, 1, true);
        grid.set(2, 0, true);

        let mut saved = vec![false; grid.len()];
        grid.copy_to(&mut saved);
        grid.clear();
        assert_eq!(grid.active_count(), 0);

        grid.copy_from(&saved);
        assert!(grid.get(0, 1));
        assert!(grid.get(2, 0));
        assert_eq!(grid.active_count(), 2);
    }
}
