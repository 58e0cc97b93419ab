//! `NodeVal`: the universal tagged value every processor operation
//! passes and returns (spec.md §3).
//!
//! Grounded on `original_source/include/NodeVal.h`'s sum-of-kinds shape,
//! but implemented as an exhaustively-matched Rust enum per the spec's
//! redesign note rather than a kind-tag-plus-union. The `ref`
//! self-reference that the original stored as a raw pointer into another
//! `NodeVal` is replaced with [`RefTarget`], a `(callable_depth,
//! block_depth, index)` coordinate into the symbol table's block storage
//! plus an aggregate sub-path — never a pointer that could outlive its
//! scope.

use crate::node::Node;
use orb_common::reserved::{Keyword, Meaningful, Oper};
use orb_common::{CodeLoc, NameId, StringId};
use orb_types::TypeId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// One step of a sub-path through an aggregate, chained onto a
/// [`RefTarget`] so that `arr[i]` and `data.field` name an alias into
/// the array/data's own storage rather than a disconnected copy of one
/// element.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PathStep {
    /// A tuple/array element, addressed by its position.
    Index(u32),
    /// A data member, addressed by its declaration order (the same
    /// position `TypeTable`'s `DataType::members` uses).
    Member(u32),
}

/// Coordinate of a variable slot inside the symbol table's nested block
/// storage, used as the non-owning "this value aliases that variable"
/// link (spec.md §3 NodeVal "ref-pointer"), plus the path through that
/// slot's own aggregate storage that `arr[i]`/`data.field` walked to
/// reach the value this `RefTarget` was attached to.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RefTarget {
    pub callable_depth: u32,
    pub block_depth: u32,
    pub index: u32,
    pub path: SmallVec<[PathStep; 2]>,
}

impl RefTarget {
    #[must_use]
    pub fn with_step(mut self, step: PathStep) -> Self {
        self.path.push(step);
        self
    }
}

/// A bare keyword/operator/meaningful-word marker, e.g. the callee
/// position of `(sym x i32)` before the processor interprets it. Also
/// carries an identifier's function- or macro-overload-set name once
/// resolved, so the first-child dispatch in spec.md §4.3 ("function
/// value ⇒ call", "macro value ⇒ invoke") can tell those two apart from
/// an ordinary eval-value without a separate NodeVal variant.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpecialMarker {
    Keyword(Keyword),
    Oper(Oper),
    Meaningful(Meaningful),
    FuncSet(NameId),
    MacroSet(NameId),
}

/// A non-aggregate compile-time value (spec.md §3 "scalar union").
#[derive(Clone, Debug)]
pub enum ScalarVal {
    Bool(bool),
    I(i64),
    U(u64),
    F(f64),
    C8(u8),
    /// `0` denotes the null pointer.
    Ptr(u64),
    Id(NameId),
    Type(TypeId),
    /// A `str`-typed literal's interned text.
    Str(StringId),
    /// An uninterpreted, still-escaped tree (the `raw` primitive).
    Raw(Box<Node>),
}

/// An eval-value's payload: either one scalar, or an ordered list of
/// children for tuple/array aggregates.
#[derive(Clone, Debug)]
pub enum EvalPayload {
    Scalar(ScalarVal),
    Children(Vec<NodeVal>),
}

#[derive(Clone, Debug)]
pub struct EvalValue {
    pub ty: TypeId,
    pub payload: EvalPayload,
    pub reference: Option<RefTarget>,
}

/// An opaque handle into the compiler backend's own value representation
/// (e.g. an LLVM value index); orb-ast never interprets its bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BackendToken(pub u64);

#[derive(Clone, Debug)]
pub struct BackendValue {
    pub ty: TypeId,
    pub token: BackendToken,
    pub reference: Option<BackendToken>,
}

/// The universal tagged value (spec.md §3 "NodeVal").
#[derive(Clone, Debug)]
pub enum NodeValData {
    /// Error sentinel: propagates without further diagnostics.
    Invalid,
    /// OK but carries no value (e.g. a successful `sym` declaration).
    ValidVoid,
    /// The file-path request from an `import` form.
    Import(StringId),
    Literal(crate::node::LiteralKind),
    Special(SpecialMarker),
    AttributeMap(FxHashMap<NameId, NodeVal>),
    Eval(EvalValue),
    Backend(BackendValue),
}

/// One value flowing through the processor, with its location and
/// attributes attached uniformly regardless of variant (spec.md §3
/// "Every NodeVal also carries...").
#[derive(Clone, Debug)]
pub struct NodeVal {
    pub data: NodeValData,
    pub loc: CodeLoc,
    pub type_attr: Option<TypeId>,
    pub attrs: Option<Box<FxHashMap<NameId, NodeVal>>>,
    pub escape_score: u32,
}

impl NodeVal {
    #[must_use]
    pub fn new(data: NodeValData, loc: CodeLoc) -> Self {
        Self {
            data,
            loc,
            type_attr: None,
            attrs: None,
            escape_score: 0,
        }
    }

    #[must_use]
    pub fn invalid(loc: CodeLoc) -> Self {
        Self::new(NodeValData::Invalid, loc)
    }

    #[must_use]
    pub fn valid_void(loc: CodeLoc) -> Self {
        Self::new(NodeValData::ValidVoid, loc)
    }

    #[must_use]
    pub fn eval(ty: TypeId, payload: EvalPayload, loc: CodeLoc) -> Self {
        Self::new(
            NodeValData::Eval(EvalValue {
                ty,
                payload,
                reference: None,
            }),
            loc,
        )
    }

    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self.data, NodeValData::Invalid)
    }

    #[must_use]
    pub fn with_escape(mut self, score: u32) -> Self {
        self.escape_score = score;
        self
    }

    #[must_use]
    pub fn is_escaped(&self) -> bool {
        self.escape_score > 0
    }

    pub fn unescape_one(&mut self) {
        self.escape_score = self.escape_score.saturating_sub(1);
    }

    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        match &self.data {
            NodeValData::Eval(v) => Some(v.ty),
            NodeValData::Backend(v) => Some(v.ty),
            _ => self.type_attr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_common::StringPool;

    fn loc() -> CodeLoc {
        let mut s = StringPool::new();
        let f = s.add("t.orb");
        CodeLoc::point(f, 0)
    }

    #[test]
    fn invalid_propagates_without_extra_state() {
        let v = NodeVal::invalid(loc());
        assert!(v.is_invalid());
        assert!(v.type_id().is_none());
    }

    #[test]
    fn eval_value_reports_its_type_id() {
        let v = NodeVal::eval(
            TypeId::Primitive(orb_types::Primitive::I32),
            EvalPayload::Scalar(ScalarVal::I(5)),
            loc(),
        );
        assert_eq!(v.type_id(), Some(TypeId::Primitive(orb_types::Primitive::I32)));
    }

    #[test]
    fn escape_score_decrements_via_node_val_too() {
        let mut v = NodeVal::invalid(loc()).with_escape(2);
        v.unescape_one();
        assert_eq!(v.escape_score, 1);
    }
}
