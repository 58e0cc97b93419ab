//! Shared primitives used across the orbc crates: name/string interning,
//! reserved-word classification, source locations, numeric literal
//! parsing, compiler limits, and diagnostics.

pub mod diagnostics;
pub mod interner;
pub mod limits;
pub mod numeric;
pub mod position;
pub mod reserved;

pub use diagnostics::{CompilationMessages, DiagKind, Diagnostic, Severity};
pub use interner::{Atom, NameId, NamePool, StringId, StringPool};
pub use numeric::{parse_float_literal, parse_int_literal};
pub use position::{CodeIndex, CodeLoc, LineMap, Position};
pub use reserved::{Keyword, Meaningful, Oper, OperInfo, ReservedTables};
