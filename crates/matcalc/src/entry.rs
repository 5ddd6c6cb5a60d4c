use crate::classify::Classification;
use crate::value::Outcome;
use serde::Serialize;

/// What kind of row an entry is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum EntryKind {
    PlainExpression,
    Assignment,
    /// An assignment edited through a matrix editor. Evaluates like
    /// [`EntryKind::Assignment`].
    MatrixAssignment,
}

/// One calculator row.
///
/// Entries are values: the engine replaces them wholesale on every
/// recompute instead of mutating them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Entry {
    raw_text: String,
    lhs: String,
    rhs_text: Option<String>,
    value: Outcome,
    kind: EntryKind,
}

impl Entry {
    pub fn empty() -> Self {
        Self {
            raw_text: String::new(),
            lhs: String::new(),
            rhs_text: None,
            value: Outcome::Unevaluable,
            kind: EntryKind::PlainExpression,
        }
    }

    /// `matrix_kind` only sticks to assignments; a plain expression is
    /// always [`EntryKind::PlainExpression`].
    pub fn new(
        raw_text: String,
        classification: Classification,
        value: Outcome,
        matrix_kind: bool,
    ) -> Self {
        let kind = match (classification.is_assignment, matrix_kind) {
            (false, _) => EntryKind::PlainExpression,
            (true, false) => EntryKind::Assignment,
            (true, true) => EntryKind::MatrixAssignment,
        };
        Self {
            raw_text,
            lhs: classification.lhs,
            rhs_text: classification.rhs_text,
            value,
            kind,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn lhs(&self) -> &str {
        &self.lhs
    }

    pub fn rhs_text(&self) -> Option<&str> {
        self.rhs_text.as_deref()
    }

    pub fn value(&self) -> &Outcome {
        &self.value
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_assignment(&self) -> bool {
        match self.kind {
            EntryKind::Assignment | EntryKind::MatrixAssignment => true,
            EntryKind::PlainExpression => false,
        }
    }

    pub fn is_matrix_kind(&self) -> bool {
        self.kind == EntryKind::MatrixAssignment
    }

    /// The variable this entry binds, if it is an assignment.
    pub fn assigned_name(&self) -> Option<&str> {
        self.is_assignment().then_some(self.lhs.as_str())
    }

    /// Change-detection equality: same raw text, same assignment flag and
    /// the same value. Two `Unevaluable` values are equal.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.raw_text == other.raw_text
            && self.is_assignment() == other.is_assignment()
            && self.value == other.value
    }
}

impl Default for Entry {
    fn default() -> Self {
        Self::empty()
    }
}
