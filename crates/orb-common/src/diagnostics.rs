//! Diagnostic catalog and `CompilationMessages` status tracking (spec.md §7).
//!
//! Mirrors `tsz-common::diagnostics`'s split of "category" (severity) from
//! "kind" (what happened), but folds the message text directly onto each
//! [`DiagKind`] variant instead of a numeric-code lookup table, since orbc
//! has no localization requirement (§D of `SPEC_FULL.md`). Callers that
//! need to name a type or identifier in the message render that piece of
//! text themselves (via `NamePool`/`TypeTable`, which this crate does not
//! depend on) and pass it in as a `String`.

use crate::position::{LineMap, Position};
use colored::Colorize;
use rustc_hash::FxHashMap;
use std::fmt;

use crate::interner::{StringId, StringPool};
use crate::position::CodeLoc;

/// Severity, monotonically increasing per spec.md §7: `info < warning <
/// error < internal`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Internal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Internal => write!(f, "internal error"),
        }
    }
}

/// Every diagnosable condition named in spec.md §7's error taxonomy, plus
/// the §D-supplemented `message` keyword pass-through. Variants carry
/// already-rendered text for any type/name references since this crate
/// has no visibility into `TypeTable`/`SymbolTable`.
#[derive(Clone, Debug)]
pub enum DiagKind {
    // Lex/parse
    BadToken,
    BadLiteral { text: String },
    UnclosedMultilineComment,
    UnexpectedToken { found: String },
    UnbalancedNode,

    // Import
    ImportNotAString,
    ImportFileNotFound { path: String },
    ImportCyclical { path: String },

    // Type
    TypeUndefined { name: String },
    TypeMalformedDescr,
    TypeBadArraySize { size: i128 },
    TypeNonTypeWhereTypeRequired,
    TypeCannotCast { from: String, into: String },
    TypeCannotImplicitCast { from: String, into: String },
    TypeAmbiguousImplicitCast { from: String, into: String },
    TypeDataRedefinition { name: String },
    TypeDataMemberDuplicate { name: String },
    TypeDataNoMembers { name: String },

    // Symbol
    SymbolNameTaken { name: String },
    SymbolNotFound { name: String },
    SymbolConstWithoutInit { name: String },
    SymbolOwningValueAtGlobalScope { name: String },
    SymbolArgNameDuplicate { name: String },

    // Callable
    FuncNotFound { name: String },
    FuncCallAmbiguous { name: String, candidates: Vec<CodeLoc> },
    FuncSignatureCollision { name: String },
    FuncRedefinitionMismatch { name: String },
    MacroArgAfterVariadic,
    MacroArgModeConflict { name: String },
    MacroConflict { name: String },
    EvalCallNotEvaluable { name: String },

    // Control flow
    ExitNowhere { name: Option<String> },
    LoopNowhere { name: Option<String> },
    PassOnNonPassingBlock,
    PassOnBlockNoPass,
    ExpressionBlockNoPass,
    RetOutsideCallable,
    RetValue,
    RetNoValue,

    // Ownership
    MoveOnNoDrop,
    MoveOnConst,
    MoveOnInvocationArg,
    BadTransferWithoutMove,

    // Operator
    OperNonUnary { op: String },
    OperNonBinary { op: String },
    OperBadOperandType { op: String, ty: String },
    DivByZero,
    ShiftOfNegative,
    AddressOfNonRef,
    DerefNonPointer { ty: String },
    IndexNonIndexable { ty: String },
    IndexNotIntegral,
    IndexOutOfBounds { index: i128, len: u64 },

    // Internal
    Internal { detail: String },

    // Warnings
    WarnIndexOutOfBounds { index: i128, len: u64 },
    WarnMacroArgTyped { name: String },
    WarnPassUnreachable,

    // §D supplement: user-triggered `message` keyword.
    UserMessage { text: String },
}

impl DiagKind {
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            DiagKind::Internal { .. } => Severity::Internal,
            DiagKind::WarnIndexOutOfBounds { .. }
            | DiagKind::WarnMacroArgTyped { .. }
            | DiagKind::WarnPassUnreachable => Severity::Warning,
            DiagKind::UserMessage { .. } => Severity::Info,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagKind::BadToken => write!(f, "bad token"),
            DiagKind::BadLiteral { text } => write!(f, "bad literal '{text}'"),
            DiagKind::UnclosedMultilineComment => write!(f, "unclosed multi-line comment"),
            DiagKind::UnexpectedToken { found } => write!(f, "unexpected token '{found}'"),
            DiagKind::UnbalancedNode => write!(f, "unbalanced node"),
            DiagKind::ImportNotAString => write!(f, "import path must be a string literal"),
            DiagKind::ImportFileNotFound { path } => write!(f, "import file not found: '{path}'"),
            DiagKind::ImportCyclical { path } => write!(f, "cyclical import of '{path}'"),
            DiagKind::TypeUndefined { name } => write!(f, "type '{name}' is undefined"),
            DiagKind::TypeMalformedDescr => write!(f, "malformed type descriptor"),
            DiagKind::TypeBadArraySize { size } => write!(f, "bad array size {size}"),
            DiagKind::TypeNonTypeWhereTypeRequired => write!(f, "expected a type"),
            DiagKind::TypeCannotCast { from, into } => {
                write!(f, "cannot cast '{from}' into '{into}'")
            }
            DiagKind::TypeCannotImplicitCast { from, into } => {
                write!(f, "cannot implicitly cast '{from}' into '{into}'")
            }
            DiagKind::TypeAmbiguousImplicitCast { from, into } => {
                write!(f, "ambiguous implicit cast from '{from}' into '{into}'")
            }
            DiagKind::TypeDataRedefinition { name } => {
                write!(f, "data type '{name}' already defined")
            }
            DiagKind::TypeDataMemberDuplicate { name } => {
                write!(f, "duplicate data member name '{name}'")
            }
            DiagKind::TypeDataNoMembers { name } => {
                write!(f, "data type '{name}' has no members")
            }
            DiagKind::SymbolNameTaken { name } => write!(f, "name '{name}' already taken"),
            DiagKind::SymbolNotFound { name } => write!(f, "symbol '{name}' not found"),
            DiagKind::SymbolConstWithoutInit { name } => {
                write!(f, "const '{name}' declared without an initializer")
            }
            DiagKind::SymbolOwningValueAtGlobalScope { name } => {
                write!(f, "owning value '{name}' not allowed at global scope")
            }
            DiagKind::SymbolArgNameDuplicate { name } => {
                write!(f, "duplicate argument name '{name}'")
            }
            DiagKind::FuncNotFound { name } => write!(f, "no function '{name}' matches the call"),
            DiagKind::FuncCallAmbiguous { name, candidates } => write!(
                f,
                "call to '{name}' is ambiguous between {} candidates",
                candidates.len()
            ),
            DiagKind::FuncSignatureCollision { name } => {
                write!(f, "function '{name}' collides with an existing signature")
            }
            DiagKind::FuncRedefinitionMismatch { name } => write!(
                f,
                "redefinition of '{name}' does not match its declaration"
            ),
            DiagKind::MacroArgAfterVariadic => {
                write!(f, "macro argument declared after the variadic argument")
            }
            DiagKind::MacroArgModeConflict { name } => write!(
                f,
                "macro argument '{name}' cannot be both preprocess and plus-escape"
            ),
            DiagKind::MacroConflict { name } => {
                write!(f, "macro '{name}' conflicts with an existing overload")
            }
            DiagKind::EvalCallNotEvaluable { name } => write!(
                f,
                "call to '{name}' cannot be evaluated at compile time and has no compiled form"
            ),
            DiagKind::ExitNowhere { name } => match name {
                Some(n) => write!(f, "no enclosing block named '{n}' to exit"),
                None => write!(f, "exit outside of any block"),
            },
            DiagKind::LoopNowhere { name } => match name {
                Some(n) => write!(f, "no enclosing block named '{n}' to loop"),
                None => write!(f, "loop outside of any block"),
            },
            DiagKind::PassOnNonPassingBlock => write!(f, "pass on a bare or void block"),
            DiagKind::PassOnBlockNoPass => write!(f, "this block does not accept a pass value"),
            DiagKind::ExpressionBlockNoPass => {
                write!(f, "expression block finished without a pass")
            }
            DiagKind::RetOutsideCallable => write!(f, "ret outside of any callable"),
            DiagKind::RetValue => write!(f, "ret with a value in a function with no return type"),
            DiagKind::RetNoValue => write!(f, "ret without a value in a function with a return type"),
            DiagKind::MoveOnNoDrop => write!(f, "move on a value with no drop function"),
            DiagKind::MoveOnConst => write!(f, "cannot move a const value"),
            DiagKind::MoveOnInvocationArg => write!(f, "cannot move a call argument"),
            DiagKind::BadTransferWithoutMove => {
                write!(f, "value transferred without an explicit move")
            }
            DiagKind::OperNonUnary { op } => write!(f, "'{op}' is not a unary operator"),
            DiagKind::OperNonBinary { op } => write!(f, "'{op}' is not a binary operator"),
            DiagKind::OperBadOperandType { op, ty } => {
                write!(f, "operator '{op}' does not accept operand of type '{ty}'")
            }
            DiagKind::DivByZero => write!(f, "division by zero"),
            DiagKind::ShiftOfNegative => write!(f, "left-shift of a negative value"),
            DiagKind::AddressOfNonRef => write!(f, "address-of applied to a non-reference value"),
            DiagKind::DerefNonPointer { ty } => write!(f, "cannot dereference non-pointer type '{ty}'"),
            DiagKind::IndexNonIndexable { ty } => write!(f, "type '{ty}' is not indexable"),
            DiagKind::IndexNotIntegral => write!(f, "index is not an integral value"),
            DiagKind::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} is out of bounds for length {len}")
            }
            DiagKind::Internal { detail } => write!(f, "internal compiler error: {detail}"),
            DiagKind::WarnIndexOutOfBounds { index, len } => {
                write!(f, "index {index} is out of bounds for length {len}")
            }
            DiagKind::WarnMacroArgTyped { name } => write!(
                f,
                "macro argument '{name}' has a 'type:' attribute, which has no effect"
            ),
            DiagKind::WarnPassUnreachable => {
                write!(f, "this pass is unreachable; the block already passed a value")
            }
            DiagKind::UserMessage { text } => write!(f, "{text}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub loc: CodeLoc,
    pub kind: DiagKind,
    pub related: Vec<(CodeLoc, String)>,
}

/// Tracks overall compilation status and renders diagnostics with a
/// `file:line:col` prefix and a source-excerpt caret underline
/// (spec.md §7 "User-visible output").
pub struct CompilationMessages {
    diagnostics: Vec<Diagnostic>,
    status: Severity,
    file_texts: FxHashMap<StringId, (String, LineMap)>,
    use_color: bool,
}

impl CompilationMessages {
    #[must_use]
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
            status: Severity::Info,
            file_texts: FxHashMap::default(),
            use_color: true,
        }
    }

    pub fn set_color(&mut self, enabled: bool) {
        self.use_color = enabled;
    }

    /// Registers a file's source text so later diagnostics against it can
    /// render a caret-underlined excerpt.
    pub fn register_file(&mut self, id: StringId, text: String) {
        let map = LineMap::build(&text);
        self.file_texts.insert(id, (text, map));
    }

    #[must_use]
    pub fn status(&self) -> Severity {
        self.status
    }

    #[must_use]
    pub fn is_failing(&self) -> bool {
        self.status >= Severity::Error
    }

    pub fn raise(&mut self, loc: CodeLoc, kind: DiagKind) {
        let severity = kind.severity();
        if severity > self.status {
            self.status = severity;
        }
        self.diagnostics.push(Diagnostic {
            severity,
            loc,
            kind,
            related: Vec::new(),
        });
    }

    pub fn raise_with_related(&mut self, loc: CodeLoc, kind: DiagKind, related: Vec<(CodeLoc, String)>) {
        let severity = kind.severity();
        if severity > self.status {
            self.status = severity;
        }
        self.diagnostics.push(Diagnostic {
            severity,
            loc,
            kind,
            related,
        });
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Renders every diagnostic as the §7 prefix + sentence + caret excerpt.
    pub fn render_all(&self, strings: &StringPool) -> String {
        let mut out = String::new();
        for diag in &self.diagnostics {
            out.push_str(&self.render_one(diag, strings));
            out.push('\n');
        }
        out
    }

    fn render_one(&self, diag: &Diagnostic, strings: &StringPool) -> String {
        let file_name = strings.get(diag.loc.file);
        let pos = self.position_of(diag.loc, strings);
        let header = format!("{file_name}:{}:{}: ", pos.line, pos.column);
        let sev = diag.severity.to_string();
        let sev_colored = if self.use_color {
            match diag.severity {
                Severity::Info => sev.blue().to_string(),
                Severity::Warning => sev.yellow().to_string(),
                Severity::Error | Severity::Internal => sev.red().bold().to_string(),
            }
        } else {
            sev
        };
        let mut body = format!("{header}{sev_colored}: {}\n", diag.kind);
        if let Some(excerpt) = self.excerpt(diag.loc) {
            body.push_str(&excerpt);
            body.push('\n');
        }
        for (loc, text) in &diag.related {
            let pos = self.position_of(*loc, strings);
            body.push_str(&format!(
                "  note: {text} at {}:{}:{}\n",
                strings.get(loc.file),
                pos.line,
                pos.column
            ));
        }
        body
    }

    fn position_of(&self, loc: CodeLoc, _strings: &StringPool) -> Position {
        self.file_texts
            .get(&loc.file)
            .map(|(_, map)| map.offset_to_position(loc.start))
            .unwrap_or(Position { line: 0, column: 0 })
    }

    fn excerpt(&self, loc: CodeLoc) -> Option<String> {
        let (text, map) = self.file_texts.get(&loc.file)?;
        let pos = map.offset_to_position(loc.start);
        let line_idx = (pos.line - 1) as usize;
        let line_start = map.line_start(line_idx)? as usize;
        let line_end = map
            .line_start(line_idx + 1)
            .map(|s| s as usize - 1)
            .unwrap_or(text.len());
        let line_text = text.get(line_start..line_end.min(text.len()))?.trim_end_matches('\r');
        let width = (loc.end.saturating_sub(loc.start)).max(1) as usize;
        let caret_col = (pos.column as usize).saturating_sub(1);
        let caret = " ".repeat(caret_col) + &"^".repeat(width.min(line_text.len().saturating_sub(caret_col).max(1)));
        let caret = if self.use_color {
            caret.green().to_string()
        } else {
            caret
        };
        Some(format!("{line_text}\n{caret}"))
    }
}

impl Default for CompilationMessages {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_escalates_monotonically() {
        let mut strings = StringPool::new();
        let file = strings.add("a.orb");
        let mut msgs = CompilationMessages::new();
        msgs.register_file(file, "sym x:i32 = 1\n".to_string());
        assert_eq!(msgs.status(), Severity::Info);
        msgs.raise(CodeLoc::point(file, 0), DiagKind::WarnPassUnreachable);
        assert_eq!(msgs.status(), Severity::Warning);
        msgs.raise(
            CodeLoc::point(file, 0),
            DiagKind::SymbolNotFound { name: "y".into() },
        );
        assert_eq!(msgs.status(), Severity::Error);
        assert!(msgs.is_failing());
        // Status never regresses after a later info-level message.
        msgs.raise(CodeLoc::point(file, 0), DiagKind::UserMessage { text: "hi".into() });
        assert_eq!(msgs.status(), Severity::Error);
    }

    #[test]
    fn renders_caret_excerpt() {
        let mut strings = StringPool::new();
        let file = strings.add("a.orb");
        let mut msgs = CompilationMessages::new();
        msgs.set_color(false);
        msgs.register_file(file, "sym x:i32 = bogus\n".to_string());
        msgs.raise(
            CodeLoc::new(file, 13, 18),
            DiagKind::SymbolNotFound { name: "bogus".into() },
        );
        let rendered = msgs.render_all(&strings);
        assert!(rendered.contains("a.orb:1:14"));
        assert!(rendered.contains("bogus"));
        assert!(rendered.contains('^'));
    }
}
