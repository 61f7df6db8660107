/// Undo/redo stacks for view state
///
/// History is linear: pushing a new snapshot throws away the redo branch.
/// Callers push the state as it was *before* a mutation.

#[derive(Debug, Clone)]
pub struct HistoryStack<T> {
    undo: Vec<T>,
    redo: Vec<T>,
}

impl<T> Default for HistoryStack<T> {
    fn default() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }
}

impl<T: Clone> HistoryStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pre-mutation snapshot and invalidate the redo branch
    pub fn push(&mut self, state: T) {
        self.undo.push(state);
        self.redo.clear();
    }

    /// Step back. `current` goes onto the redo stack and the previous
    /// snapshot is returned for the caller to restore.
    /// Returns None (and changes nothing) when there is nothing to undo.
    pub fn undo(&mut self, current: &T) -> Option<T> {
        let previous = self.undo.pop()?;
        self.redo.push(current.clone());
        Some(previous)
    }

    /// Mirror of `undo`
    pub fn redo(&mut self, current: &T) -> Option<T> {
        let next = self.redo.pop()?;
        self.undo.push(current.clone());
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Forget everything, e.g. when a different directory is opened
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
