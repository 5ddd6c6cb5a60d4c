//! Reactive recompute engine.
//!
//! The engine owns the ordered entry list and the shared [`Scope`]. Every
//! operation that can change a binding ends in a fixed-point full pass: all
//! entries are rebuilt in list order against the live scope, assignments
//! rebind their names, and passes repeat until one leaves the scope
//! untouched. Entries may reference names defined further down the list, so
//! a chain written in reverse order needs one pass per link.
//!
//! When several entries assign the same name, only the last of them binds
//! it. The others still evaluate and show their own value.

use crate::classify::classify;
use crate::config::EngineConfig;
use crate::entry::Entry;
use crate::evaluator::{Evaluator, MathEngine};
use crate::math::Interpreter;
use crate::scope::Scope;
use crate::value::{Matrix, Outcome};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Idle,
    Recomputing,
}

/// What an operation did to the scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Recompute {
    /// A binding was touched and a full pass ran.
    pub scope_dirty: bool,
    pub passes: usize,
    /// Bindings changed by the full passes, counted once per pass.
    pub scope_changes: usize,
    /// False when the divergence guard had to settle names to unevaluable.
    pub converged: bool,
}

impl Recompute {
    fn clean() -> Self {
        Self {
            scope_dirty: false,
            passes: 0,
            scope_changes: 0,
            converged: true,
        }
    }
}

pub struct Engine<E = Interpreter> {
    entries: Vec<Entry>,
    scope: Scope,
    evaluator: Evaluator<E>,
    config: EngineConfig,
    state: EngineState,
}

impl Engine<Interpreter> {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_engine(Interpreter, config)
    }

    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut engine = Self::new();
        engine.load(texts);
        engine
    }
}

impl Default for Engine<Interpreter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: MathEngine> Engine<E> {
    pub fn with_engine(engine: E, config: EngineConfig) -> Self {
        Self {
            entries: vec![Entry::empty()],
            scope: Scope::new(),
            evaluator: Evaluator::new(engine),
            config,
            state: EngineState::Idle,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// # Panics
    /// Panics if `index` is outside the list.
    pub fn entry(&self, index: usize) -> &Entry {
        self.assert_index(index);
        &self.entries[index]
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn evaluator(&self) -> &Evaluator<E> {
        &self.evaluator
    }

    /// Replaces the whole list with `texts`, one entry each, and settles.
    /// No texts leaves a single empty entry.
    pub fn load<I, S>(&mut self, texts: I) -> Recompute
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.assert_idle();
        self.scope = Scope::new();
        self.entries = texts
            .into_iter()
            .map(|text| {
                let text = text.as_ref();
                Entry::new(text.to_owned(), classify(text), Outcome::Unevaluable, false)
            })
            .collect();
        if self.entries.is_empty() {
            self.entries.push(Entry::empty());
        }
        self.settle()
    }

    /// Reclassifies and re-evaluates entry `index` from `new_text`.
    ///
    /// A full pass runs only when a binding is touched: the entry is an
    /// assignment that differs from what was there before, or it stopped
    /// being an assignment.
    ///
    /// # Panics
    /// Panics if `index` is outside the list.
    pub fn edit_entry(&mut self, index: usize, new_text: &str) -> Recompute {
        self.assert_idle();
        self.assert_index(index);
        let matrix_kind = self.entries[index].is_matrix_kind();
        self.edit_entry_as(index, new_text, matrix_kind)
    }

    fn edit_entry_as(&mut self, index: usize, new_text: &str, matrix_kind: bool) -> Recompute {
        let previous = &self.entries[index];
        let updated = self.build_entry(new_text, matrix_kind, &HashSet::new());

        let mut scope_dirty = false;
        if let Some(name) = updated.assigned_name() {
            if !updated.is_equivalent(previous) {
                if let Some(old_name) = previous.assigned_name()
                    && old_name != name
                {
                    log::debug!("`{old_name}` renamed to `{name}`");
                    self.scope.remove(old_name);
                }
                self.scope.set(name, updated.value().clone());
                scope_dirty = true;
            }
        } else if let Some(old_name) = previous.assigned_name() {
            log::debug!("`{old_name}` is no longer assigned");
            self.scope.remove(old_name);
            scope_dirty = true;
        }

        self.entries[index] = updated;
        if scope_dirty {
            self.settle()
        } else {
            Recompute::clean()
        }
    }

    /// Removes `name` from the scope and settles. An entry that still
    /// assigns `name` binds it again during the pass.
    pub fn delete_variable(&mut self, name: &str) -> Recompute {
        self.assert_idle();
        if self.scope.remove(name).is_some() {
            log::debug!("`{name}` deleted");
        }
        self.settle()
    }

    /// Inserts an empty entry after `index` and returns its index.
    ///
    /// # Panics
    /// Panics if `index` is outside the list.
    pub fn insert_entry_after(&mut self, index: usize) -> usize {
        self.assert_idle();
        self.assert_index(index);
        self.entries.insert(index + 1, Entry::empty());
        index + 1
    }

    /// Removes entry `index`. The list never drops below one entry; deleting
    /// the last one left is a no-op.
    ///
    /// Deleting an assignment unbinds its name unless another entry still
    /// assigns it, then settles.
    ///
    /// # Panics
    /// Panics if `index` is outside the list.
    pub fn delete_entry(&mut self, index: usize) -> Recompute {
        self.assert_idle();
        self.assert_index(index);
        if self.entries.len() == 1 {
            return Recompute::clean();
        }
        let removed = self.entries.remove(index);
        let Some(name) = removed.assigned_name() else {
            return Recompute::clean();
        };
        let still_assigned = self
            .entries
            .iter()
            .any(|entry| entry.assigned_name() == Some(name));
        if !still_assigned {
            log::debug!("`{name}` deleted with its entry");
            self.scope.remove(name);
        }
        self.settle()
    }

    /// Inserts `M_<n>=[[0,0],[0,0]]` as a matrix entry after `after`, using
    /// the smallest `n` whose name is unbound. Returns the new index.
    ///
    /// # Panics
    /// Panics if `after` is outside the list.
    pub fn add_matrix_variable(&mut self, after: usize) -> usize {
        let index = self.insert_entry_after(after);
        let name = self.unused_matrix_name();
        let text = format!("{name}={}", Matrix::zeros(2, 2).to_expression_text());
        self.edit_entry_as(index, &text, true);
        index
    }

    fn unused_matrix_name(&self) -> String {
        (0..)
            .map(|n| format!("M_{n}"))
            .find(|name| !self.scope.contains(name))
            .unwrap_or_else(|| unreachable!("matrix names exhausted"))
    }

    /// Rewrites a matrix entry's right-hand side from `matrix` and settles.
    ///
    /// # Panics
    /// Panics if `index` is outside the list or not a matrix entry.
    pub fn set_matrix(&mut self, index: usize, matrix: &Matrix) -> Recompute {
        self.assert_idle();
        self.assert_index(index);
        let entry = &self.entries[index];
        assert!(
            entry.is_matrix_kind(),
            "entry {index} (`{}`) is not a matrix entry",
            entry.raw_text()
        );
        let text = format!("{}={}", entry.lhs(), matrix.to_expression_text());
        self.edit_entry_as(index, &text, true)
    }

    /// Runs the fixed-point pass unconditionally.
    pub fn recompute(&mut self) -> Recompute {
        self.assert_idle();
        self.settle()
    }

    fn assert_idle(&self) {
        assert_eq!(
            self.state,
            EngineState::Idle,
            "engine entered while recomputing"
        );
    }

    fn assert_index(&self, index: usize) {
        assert!(
            index < self.entries.len(),
            "entry index {index} out of bounds for {} entries",
            self.entries.len()
        );
    }

    /// `poisoned` names are forced to unevaluable like self-references.
    fn build_entry(&self, raw_text: &str, matrix_kind: bool, poisoned: &HashSet<String>) -> Entry {
        let classification = classify(raw_text);
        let value = if classification.is_self_referential() {
            log::trace!("`{raw_text}` refers to itself");
            Outcome::Unevaluable
        } else if classification.is_assignment && poisoned.contains(&classification.lhs) {
            Outcome::Unevaluable
        } else {
            self.evaluator
                .evaluate(classification.expression(), &self.scope)
        };
        Entry::new(raw_text.to_owned(), classification, value, matrix_kind)
    }

    /// Name → index of the last entry assigning it.
    fn owners(&self) -> HashMap<String, usize> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.assigned_name().map(|name| (name.to_owned(), index)))
            .collect()
    }

    fn settle(&mut self) -> Recompute {
        self.state = EngineState::Recomputing;
        let owners = self.owners();
        let limit = self.config.pass_limit(self.entries.len());
        let mut poisoned = HashSet::new();
        let mut report = Recompute {
            scope_dirty: true,
            passes: 0,
            scope_changes: 0,
            converged: true,
        };

        // Each guard round poisons at least one more name, and a poisoned
        // name never changes again, so this terminates.
        let mut round_passes = 0;
        loop {
            let changed = self.run_pass(&owners, &poisoned);
            report.passes += 1;
            round_passes += 1;
            report.scope_changes += changed.len();
            if changed.is_empty() {
                break;
            }
            if round_passes >= limit {
                log::warn!(
                    "Bindings still changing after {round_passes} passes, settling {} to unevaluable",
                    changed.join(", ")
                );
                report.converged = false;
                for name in changed {
                    self.scope.set(name.clone(), Outcome::Unevaluable);
                    poisoned.insert(name);
                }
                round_passes = 0;
            }
        }

        log::debug!(
            "Settled in {} passes with {} binding changes",
            report.passes,
            report.scope_changes
        );
        self.state = EngineState::Idle;
        report
    }

    /// Rebuilds every entry in order and returns the names whose binding
    /// changed.
    fn run_pass(&mut self, owners: &HashMap<String, usize>, poisoned: &HashSet<String>) -> Vec<String> {
        let mut changed = Vec::new();
        for index in 0..self.entries.len() {
            let previous = &self.entries[index];
            let rebuilt = self.build_entry(previous.raw_text(), previous.is_matrix_kind(), poisoned);
            log::trace!("Entry {index}: `{}` = {:?}", rebuilt.raw_text(), rebuilt.value());
            if let Some(name) = rebuilt.assigned_name()
                && owners.get(name) == Some(&index)
                && self.scope.set(name, rebuilt.value().clone())
            {
                log::debug!("`{name}` rebound");
                changed.push(name.to_owned());
            }
            self.entries[index] = rebuilt;
        }
        changed
    }
}
