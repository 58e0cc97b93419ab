//! Classification of reserved words: meaningful tokens, keywords, and operators.
//!
//! Grounded on `original_source/include/Reserved.h`: the name pool records
//! a fixed set of name→classification tables built once at start-up, so
//! lookups during processing are O(1) instead of string comparisons.

use crate::interner::{NameId, NamePool};
use rustc_hash::FxHashMap;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Meaningful {
    Main,
    Cn,
    Asterisk,
    Square,
    Ellipsis,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Keyword {
    Sym,
    Cast,
    Block,
    Exit,
    Loop,
    Pass,
    Fnc,
    Ret,
    Mac,
    Eval,
    Tup,
    TypeOf,
    LenOf,
    SizeOf,
    IsDef,
    AttrOf,
    AttrIsDef,
    Import,
    Message,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Oper {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Asgn,
    Not,
    BitNot,
    Ind,
    Addr,
    Move,
}

#[derive(Clone, Copy, Default, Debug)]
pub struct OperInfo {
    pub unary: bool,
    pub binary: bool,
    pub comparison: bool,
}

/// Fixed operator trait table, indexed by [`Oper`] (spec.md §4.5).
#[must_use]
pub fn oper_info(op: Oper) -> OperInfo {
    use Oper::{
        Add, Addr, Asgn, BitAnd, BitNot, BitOr, BitXor, Div, Eq, Gt, GtEq, Ind, Lt, LtEq, Mul,
        Move, Neq, Not, Rem, Shl, Shr, Sub,
    };
    match op {
        Add | Sub | Mul | Div | Rem | Shl | Shr | BitAnd | BitXor | BitOr => OperInfo {
            // `*` doubles as the deref operator and `>>` as the move
            // operator when written with a single operand; the processor
            // tells the two uses apart by operand count, not by token.
            unary: matches!(op, Add | Sub | Mul | Shr),
            binary: true,
            comparison: false,
        },
        Eq | Neq | Lt | LtEq | Gt | GtEq => OperInfo {
            unary: false,
            binary: true,
            comparison: true,
        },
        Asgn => OperInfo {
            unary: false,
            binary: true,
            comparison: false,
        },
        Not | BitNot | Addr | Move => OperInfo {
            unary: true,
            binary: false,
            comparison: false,
        },
        Ind => OperInfo {
            unary: false,
            binary: true,
            comparison: false,
        },
    }
}

/// Deref `*` is ambiguous with the `Asterisk` meaningful token and is
/// resolved contextually by the processor rather than looked up here.
#[derive(Default)]
pub struct ReservedTables {
    pub meaningfuls: FxHashMap<NameId, Meaningful>,
    pub keywords: FxHashMap<NameId, Keyword>,
    pub opers: FxHashMap<NameId, Oper>,
}

impl ReservedTables {
    pub fn build(pool: &mut NamePool) -> Self {
        let mut t = Self::default();
        let mut meaningful = |t: &mut Self, pool: &mut NamePool, s: &str, m: Meaningful| {
            let id = pool.add(s);
            t.meaningfuls.insert(id, m);
        };
        meaningful(&mut t, pool, "main", Meaningful::Main);
        meaningful(&mut t, pool, "cn", Meaningful::Cn);
        meaningful(&mut t, pool, "*", Meaningful::Asterisk);
        meaningful(&mut t, pool, "[]", Meaningful::Square);
        meaningful(&mut t, pool, "...", Meaningful::Ellipsis);

        let mut keyword = |t: &mut Self, pool: &mut NamePool, s: &str, k: Keyword| {
            let id = pool.add(s);
            t.keywords.insert(id, k);
        };
        keyword(&mut t, pool, "sym", Keyword::Sym);
        keyword(&mut t, pool, "cast", Keyword::Cast);
        keyword(&mut t, pool, "block", Keyword::Block);
        keyword(&mut t, pool, "exit", Keyword::Exit);
        keyword(&mut t, pool, "loop", Keyword::Loop);
        keyword(&mut t, pool, "pass", Keyword::Pass);
        keyword(&mut t, pool, "fnc", Keyword::Fnc);
        keyword(&mut t, pool, "ret", Keyword::Ret);
        keyword(&mut t, pool, "mac", Keyword::Mac);
        keyword(&mut t, pool, "eval", Keyword::Eval);
        keyword(&mut t, pool, "tup", Keyword::Tup);
        keyword(&mut t, pool, "typeOf", Keyword::TypeOf);
        keyword(&mut t, pool, "lenOf", Keyword::LenOf);
        keyword(&mut t, pool, "sizeOf", Keyword::SizeOf);
        keyword(&mut t, pool, "isDef", Keyword::IsDef);
        keyword(&mut t, pool, "attrOf", Keyword::AttrOf);
        keyword(&mut t, pool, "attrIsDef", Keyword::AttrIsDef);
        keyword(&mut t, pool, "import", Keyword::Import);
        keyword(&mut t, pool, "message", Keyword::Message);

        let mut oper = |t: &mut Self, pool: &mut NamePool, s: &str, o: Oper| {
            let id = pool.add(s);
            t.opers.insert(id, o);
        };
        oper(&mut t, pool, "+", Oper::Add);
        oper(&mut t, pool, "-", Oper::Sub);
        oper(&mut t, pool, "*", Oper::Mul);
        oper(&mut t, pool, "/", Oper::Div);
        oper(&mut t, pool, "%", Oper::Rem);
        oper(&mut t, pool, "<<", Oper::Shl);
        oper(&mut t, pool, ">>", Oper::Shr);
        oper(&mut t, pool, "&", Oper::BitAnd);
        oper(&mut t, pool, "^", Oper::BitXor);
        oper(&mut t, pool, "|", Oper::BitOr);
        oper(&mut t, pool, "==", Oper::Eq);
        oper(&mut t, pool, "!=", Oper::Neq);
        oper(&mut t, pool, "<", Oper::Lt);
        oper(&mut t, pool, "<=", Oper::LtEq);
        oper(&mut t, pool, ">", Oper::Gt);
        oper(&mut t, pool, ">=", Oper::GtEq);
        oper(&mut t, pool, "=", Oper::Asgn);
        oper(&mut t, pool, "!", Oper::Not);
        oper(&mut t, pool, "~", Oper::BitNot);
        oper(&mut t, pool, "[]", Oper::Ind);

        t
    }

    #[must_use]
    pub fn meaningful(&self, id: NameId) -> Option<Meaningful> {
        self.meaningfuls.get(&id).copied()
    }

    #[must_use]
    pub fn keyword(&self, id: NameId) -> Option<Keyword> {
        self.keywords.get(&id).copied()
    }

    #[must_use]
    pub fn oper(&self, id: NameId) -> Option<Oper> {
        self.opers.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_keywords_and_opers_distinctly() {
        let mut pool = NamePool::new();
        let tables = ReservedTables::build(&mut pool);
        let sym = pool.add("sym");
        let plus = pool.add("+");
        assert_eq!(tables.keyword(sym), Some(Keyword::Sym));
        assert_eq!(tables.oper(plus), Some(Oper::Add));
        assert!(tables.keyword(plus).is_none());
    }
}
