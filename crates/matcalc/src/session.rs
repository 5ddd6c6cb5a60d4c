//! Presentation-facing wrapper: an [`Engine`] plus the focused entry.

use crate::engine::{Engine, Recompute};
use crate::evaluator::MathEngine;
use crate::math::Interpreter;
use crate::snapshot::Snapshot;

/// What a presentation layer asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    EditEntry { index: usize, text: String },
    /// Enter at the end of an entry opens a new one below it.
    EnterPressed(usize),
    /// Backspace in an entry that is already empty removes it.
    DeleteKeyAtEmpty(usize),
    FocusChanged(usize),
    AddMatrixVariable,
}

pub struct Session<E = Interpreter> {
    engine: Engine<E>,
    focused_index: usize,
}

impl Session<Interpreter> {
    pub fn new() -> Self {
        Self::with_engine(Engine::new())
    }
}

impl Default for Session<Interpreter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: MathEngine> Session<E> {
    pub fn with_engine(engine: Engine<E>) -> Self {
        Self {
            engine,
            focused_index: 0,
        }
    }

    pub fn engine(&self) -> &Engine<E> {
        &self.engine
    }

    pub fn focused_index(&self) -> usize {
        self.focused_index
    }

    /// Applies `intent` and returns what the engine reported, if it ran a
    /// recompute-capable operation.
    ///
    /// # Panics
    /// Panics if an intent carries an index outside the list.
    pub fn dispatch(&mut self, intent: Intent) -> Option<Recompute> {
        log::debug!("{intent:?}");
        let report = match intent {
            Intent::EditEntry { index, text } => Some(self.engine.edit_entry(index, &text)),
            Intent::EnterPressed(index) => {
                self.focused_index = self.engine.insert_entry_after(index);
                None
            }
            Intent::DeleteKeyAtEmpty(index) => {
                let report = self.engine.delete_entry(index);
                self.focused_index = index.saturating_sub(1);
                Some(report)
            }
            Intent::FocusChanged(index) => {
                let len = self.engine.entries().len();
                assert!(index < len, "focus index {index} out of bounds for {len} entries");
                self.focused_index = index;
                None
            }
            Intent::AddMatrixVariable => {
                self.focused_index = self.engine.add_matrix_variable(self.focused_index);
                None
            }
        };
        self.focused_index = self.focused_index.min(self.engine.entries().len() - 1);
        report
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.engine, self.focused_index)
    }
}
