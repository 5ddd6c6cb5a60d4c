//! Read-only view of the engine for a presentation layer.

use crate::engine::{Engine, EngineState};
use crate::entry::Entry;
use crate::evaluator::MathEngine;
use crate::value::Outcome;
use serde::Serialize;

pub const EMPTY_PLACEHOLDER: &str = "[empty]";
pub const UNEVALUABLE_PLACEHOLDER: &str = "[oops]";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub display_text: String,
    pub rendered_value: String,
    pub is_assignment: bool,
    pub is_matrix_kind: bool,
}

impl EntryView {
    pub fn new(entry: &Entry, precision: u32) -> Self {
        Self {
            display_text: entry.raw_text().to_owned(),
            rendered_value: render_entry(entry, precision),
            is_assignment: entry.is_assignment(),
            is_matrix_kind: entry.is_matrix_kind(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VariableView {
    pub name: String,
    pub rendered_value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub entries: Vec<EntryView>,
    pub focused_index: usize,
    pub variables: Vec<VariableView>,
    pub state: EngineState,
}

impl Snapshot {
    /// `focused_index` is clamped to the list.
    pub fn capture<E: MathEngine>(engine: &Engine<E>, focused_index: usize) -> Self {
        let precision = engine.config().precision;
        let entries: Vec<EntryView> = engine
            .entries()
            .iter()
            .map(|entry| EntryView::new(entry, precision))
            .collect();
        let variables = engine
            .scope()
            .iter()
            .map(|(name, outcome)| VariableView {
                name: name.to_owned(),
                rendered_value: render_outcome(outcome, precision),
            })
            .collect();
        Self {
            focused_index: focused_index.min(entries.len().saturating_sub(1)),
            entries,
            variables,
            state: engine.state(),
        }
    }
}

/// `[empty]` for an entry with nothing to evaluate, `[oops]` when it is
/// unevaluable, otherwise its value rounded to `precision` decimals.
pub fn render_entry(entry: &Entry, precision: u32) -> String {
    if entry.lhs().is_empty() {
        return EMPTY_PLACEHOLDER.to_owned();
    }
    render_outcome(entry.value(), precision)
}

pub fn render_outcome(outcome: &Outcome, precision: u32) -> String {
    match outcome {
        Outcome::Value(value) => value.render(precision),
        Outcome::Unevaluable => UNEVALUABLE_PLACEHOLDER.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_and_rounding() {
        let engine = Engine::from_texts(["", "bogus", "1/3", "m = [[1, 2], [3, 4]] / 3"]);
        let snapshot = Snapshot::capture(&engine, 99);
        let rendered: Vec<&str> = snapshot
            .entries
            .iter()
            .map(|view| view.rendered_value.as_str())
            .collect();
        assert_eq!(rendered[0], "[empty]");
        assert_eq!(rendered[1], "[oops]");
        assert_eq!(rendered[2], "0.33333");
        assert_eq!(rendered[3], "[[0.33333,0.66667],[1,1.33333]]");
        assert_eq!(snapshot.focused_index, 3);
        assert_eq!(snapshot.state, EngineState::Idle);
    }

    #[test]
    fn variables_follow_scope() {
        let engine = Engine::from_texts(["a = 2", "b = a / 0", "c = bogus"]);
        let snapshot = Snapshot::capture(&engine, 0);
        let variables: Vec<(&str, &str)> = snapshot
            .variables
            .iter()
            .map(|view| (view.name.as_str(), view.rendered_value.as_str()))
            .collect();
        assert_eq!(
            variables,
            vec![("a", "2"), ("b", "Infinity"), ("c", "[oops]")]
        );
        assert!(snapshot.entries[0].is_assignment);
        assert_eq!(snapshot.entries[1].display_text, "b = a / 0");
    }

    #[test]
    fn serializes_for_a_presentation_layer() {
        let engine = Engine::from_texts(["a = 2", "a * 3"]);
        let json = serde_json::to_value(Snapshot::capture(&engine, 1)).unwrap();
        assert_eq!(json["focused_index"], 1);
        assert_eq!(json["state"], "Idle");
        assert_eq!(json["entries"][0]["display_text"], "a = 2");
        assert_eq!(json["entries"][0]["is_assignment"], true);
        assert_eq!(json["entries"][1]["rendered_value"], "6");
        assert_eq!(json["entries"][1]["is_matrix_kind"], false);
        assert_eq!(json["variables"][0]["name"], "a");
        assert_eq!(json["variables"][0]["rendered_value"], "2");
    }

    #[test]
    fn blank_text_is_empty_placeholder() {
        let engine = Engine::from_texts(["   "]);
        assert_eq!(render_entry(&engine.entries()[0], 5), "[empty]");
    }
}
