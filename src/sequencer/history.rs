/// Undo/redo log of grid edits
///
/// A `ClearAll` cannot be reversed from its record alone, so the log keeps a
/// single saved copy of the grid taken when the clear ran. Only one clear can
/// be undone this way: clearing again before undoing drops the copy, and
/// undoing a clear with no copy discards the rest of the undo history.
use std::collections::VecDeque;

use super::NoteGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ToggleNote { col: i32, row: i32 },
    AddNote { col: i32, row: i32 },
    RemoveNote { col: i32, row: i32 },
    ClearAll,
}

pub struct ActionLog {
    undo_stack: VecDeque<Action>,
    redo_stack: Vec<Action>,
    saved: Box<[bool]>,
    has_saved: bool,
    max_history: usize,
}

impl ActionLog {
    /// `cells` must match the length of the grid this log edits.
    pub fn new(cells: usize, max_history: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_history.min(1024)),
            redo_stack: Vec::new(),
            saved: vec![false; cells].into_boxed_slice(),
            has_saved: false,
            max_history: max_history.max(1),
        }
    }

    /// Apply `action` to the grid and make it the newest undo entry.
    /// Any redo history is dropped.
    pub fn record_and_apply(&mut self, grid: &NoteGrid, action: Action) {
        self.apply(grid, action);
        self.push_undo(action);
        self.redo_stack.clear();
    }

    /// Reverse the newest action. Returns false when there was nothing to undo.
    pub fn undo(&mut self, grid: &NoteGrid) -> bool {
        let Some(action) = self.undo_stack.pop_back() else {
            return false;
        };

        match action {
            Action::ToggleNote { col, row } => grid.toggle(col, row),
            Action::AddNote { col, row } => grid.set(col, row, false),
            Action::RemoveNote { col, row } => grid.set(col, row, true),
            Action::ClearAll => {
                if self.has_saved {
                    debug_assert_eq!(self.saved.len(), grid.len());
                    grid.copy_from(&self.saved);
                    self.has_saved = false;
                } else {
                    // what the grid held before this clear is gone
                    self.undo_stack.clear();
                }
            }
        }

        self.redo_stack.push(action);
        true
    }

    /// Re-apply the newest undone action. Returns false when there was
    /// nothing to redo.
    pub fn redo(&mut self, grid: &NoteGrid) -> bool {
        let Some(action) = self.redo_stack.pop() else {
            return false;
        };

        self.apply(grid, action);
        self.push_undo(action);
        true
    }

    fn apply(&mut self, grid: &NoteGrid, action: Action) {
        match action {
            Action::ToggleNote { col, row } => grid.toggle(col, row),
            Action::AddNote { col, row } => grid.set(col, row, true),
            Action::RemoveNote { col, row } => grid.set(col, row, false),
            Action::ClearAll => {
                if self.has_saved {
                    // only one clear is remembered
                    self.has_saved = false;
                } else {
                    debug_assert_eq!(self.saved.len(), grid.len());
                    grid.copy_to(&mut self.saved);
                    self.has_saved = true;
                }
                grid.clear();
            }
        }
    }

    fn push_undo(&mut self, action: Action) {
        while self.undo_stack.len() >= self.max_history {
            let evicted = self.undo_stack.pop_front();
            if evicted == Some(Action::ClearAll)
                && !self.undo_stack.contains(&Action::ClearAll)
            {
                self.has_saved = false;
            }
        }
        self.undo_stack.push_back(action);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Whether the next clear undo can restore the grid.
    pub fn has_snapshot(&self) -> bool {
        self.has_saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(grid: &NoteGrid) -> Vec<bool> {
        let mut out = vec![false; grid.len()];
        grid.copy_to(&mut out);
        out
    }

    fn setup() -> (NoteGrid, ActionLog) {
        let grid = NoteGrid::new(8, 5);
        let log = ActionLog::new(grid.len(), 64);
        (grid, log)
    }

    #[test]
    fn test_empty_history_is_noop() {
        let (grid, mut log) = setup();
        assert!(!log.undo(&grid));
        assert!(!log.redo(&grid));
        assert_eq!(grid.active_count(), 0);
    }

    #[test]
    fn test_toggle_undo_redo() {
        let (grid, mut log) = setup();
        log.record_and_apply(&grid, Action::ToggleNote { col: 1, row: 2 });
        assert!(grid.get(1, 2));

        assert!(log.undo(&grid));
        assert!(!grid.get(1, 2));
        assert_eq!(log.redo_len(), 1);

        assert!(log.redo(&grid));
        assert!(grid.get(1, 2));
        assert_eq!(log.undo_len(), 1);
        assert_eq!(log.redo_len(), 0);
    }

    #[test]
    fn test_add_and_remove_inverses() {
        let (grid, mut log) = setup();
        log.record_and_apply(&grid, Action::AddNote { col: 0, row: 0 });
        log.record_and_apply(&grid, Action::RemoveNote { col: 3, row: 3 });
        assert!(grid.get(0, 0));
        assert!(!grid.get(3, 3));

        log.undo(&grid);
        assert!(grid.get(3, 3));
        log.undo(&grid);
        assert!(!grid.get(0, 0));
    }

    #[test]
    fn test_undo_sequence_restores_start() {
        let (grid, mut log) = setup();
        grid.set(4, 4, true);
        let before = cells(&grid);

        let actions = [
            Action::ToggleNote { col: 0, row: 1 },
            Action::AddNote { col: 2, row: 2 },
            Action::ToggleNote { col: 0, row: 1 },
            Action::RemoveNote { col: 4, row: 4 },
            Action::ClearAll,
            Action::ToggleNote { col: 7, row: 0 },
            Action::ToggleNote { col: -3, row: 0 },
        ];
        for action in actions {
            log.record_and_apply(&grid, action);
        }
        for _ in actions {
            assert!(log.undo(&grid));
        }

        assert_eq!(cells(&grid), before);
        assert!(!log.can_undo());
    }

    #[test]
    fn test_record_clears_redo() {
        let (grid, mut log) = setup();
        log.record_and_apply(&grid, Action::ToggleNote { col: 0, row: 0 });
        log.record_and_apply(&grid, Action::ToggleNote { col: 1, row: 0 });
        log.undo(&grid);
        log.undo(&grid);
        assert_eq!(log.redo_len(), 2);

        log.record_and_apply(&grid, Action::AddNote { col: 5, row: 1 });
        assert!(!log.can_redo());
        assert!(!log.redo(&grid));
    }

    #[test]
    fn test_clear_undo_restores_grid() {
        let (grid, mut log) = setup();
        grid.set(1, 1, true);
        grid.set(6, 3, true);
        let before = cells(&grid);

        log.record_and_apply(&grid, Action::ClearAll);
        assert_eq!(grid.active_count(), 0);
        assert!(log.has_snapshot());

        log.undo(&grid);
        assert_eq!(cells(&grid), before);
        assert!(!log.has_snapshot());
    }

    #[test]
    fn test_clear_redo_recaptures() {
        let (grid, mut log) = setup();
        grid.set(2, 2, true);

        log.record_and_apply(&grid, Action::ClearAll);
        log.undo(&grid);
        assert!(grid.get(2, 2));

        log.redo(&grid);
        assert_eq!(grid.active_count(), 0);
        assert!(log.has_snapshot());

        log.undo(&grid);
        assert!(grid.get(2, 2));
    }

    #[test]
    fn test_double_clear_loses_history() {
        let (grid, mut log) = setup();
        log.record_and_apply(&grid, Action::AddNote { col: 3, row: 1 });

        log.record_and_apply(&grid, Action::ClearAll);
        log.record_and_apply(&grid, Action::ClearAll);
        assert!(!log.has_snapshot());

        assert!(log.undo(&grid));
        assert!(!grid.get(3, 1));
        assert!(!log.has_snapshot());
        assert!(!log.can_undo());
        assert_eq!(log.redo_len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let grid = NoteGrid::new(4, 4);
        let mut log = ActionLog::new(grid.len(), 3);
        for col in 0..4 {
            log.record_and_apply(&grid, Action::AddNote { col, row: 0 });
        }
        assert_eq!(log.undo_len(), 3);

        while log.undo(&grid) {}
        // the oldest edit fell off the end
        assert!(grid.get(0, 0));
        assert_eq!(grid.active_count(), 1);
    }

    #[test]
    fn test_evicting_clear_drops_snapshot() {
        let grid = NoteGrid::new(4, 4);
        let mut log = ActionLog::new(grid.len(), 2);
        grid.set(0, 0, true);

        log.record_and_apply(&grid, Action::ClearAll);
        log.record_and_apply(&grid, Action::ToggleNote { col: 1, row: 1 });
        assert!(log.has_snapshot());

        log.record_and_apply(&grid, Action::ToggleNote { col: 2, row: 2 });
        assert!(!log.has_snapshot());
    }
}
