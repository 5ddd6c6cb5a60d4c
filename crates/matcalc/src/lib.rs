//! Reactive recompute engine for a matrix-aware expression calculator.
//!
//! An ordered list of text entries, each a plain expression or a `name = rhs`
//! assignment, evaluated against one shared variable scope and kept
//! consistent whenever a binding changes.

pub mod classify;
pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod evaluator;
pub mod math;
pub mod scope;
pub mod session;
pub mod snapshot;
pub mod value;

pub use classify::{Classification, classify};
pub use config::{DEFAULT_PRECISION, EngineConfig};
pub use engine::{Engine, EngineState, Recompute};
pub use entry::{Entry, EntryKind};
pub use error::{MathError, MathResult};
pub use evaluator::{Evaluator, MathEngine, Raw};
pub use math::{Diagnostic, Interpreter};
pub use scope::Scope;
pub use session::{Intent, Session};
pub use snapshot::{EntryView, Snapshot, VariableView};
pub use value::{Matrix, Outcome, Value};
