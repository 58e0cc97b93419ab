//! Interning of identifiers and string literals.
//!
//! The orb language is homoiconic and re-walks the same identifiers
//! constantly (symbol lookup, macro substitution, overload keys), so every
//! name and string literal is interned once into a stable, `Copy` small
//! integer. Equality on the integer is equality on the text.

use rustc_hash::FxHashMap;
use std::fmt;

/// A small opaque handle into an [`Interner`]. Two handles from the same
/// interner compare equal iff the underlying text is equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(u32);

impl Atom {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({})", self.0)
    }
}

/// Append-only string interner. Never evicts; IDs are stable for the
/// lifetime of the pool, which is the lifetime of one compilation.
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: FxHashMap<Box<str>, Atom>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> Atom {
        if let Some(&id) = self.lookup.get(text) {
            return id;
        }
        let id = Atom(u32::try_from(self.strings.len()).expect("interner overflow"));
        let boxed: Box<str> = text.into();
        self.strings.push(boxed.clone());
        self.lookup.insert(boxed, id);
        id
    }

    #[must_use]
    pub fn resolve(&self, atom: Atom) -> &str {
        &self.strings[atom.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Identifier pool. Distinct type from [`StringPool`] so a `NameId` can
/// never be confused with a `StringId` at the type level, even though both
/// wrap an [`Interner`].
#[derive(Debug, Default)]
pub struct NamePool {
    interner: Interner,
    main: Option<NameId>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NameId(pub Atom);

impl NamePool {
    #[must_use]
    pub fn new() -> Self {
        let mut pool = Self::default();
        let main = pool.add("main");
        pool.main = Some(main);
        pool
    }

    pub fn add(&mut self, text: &str) -> NameId {
        NameId(self.interner.intern(text))
    }

    #[must_use]
    pub fn get(&self, id: NameId) -> &str {
        self.interner.resolve(id.0)
    }

    #[must_use]
    pub fn main(&self) -> NameId {
        self.main.expect("NamePool::new always seeds `main`")
    }
}

/// String-literal pool (distinct from [`NamePool`] so that, e.g., a
/// string literal `"x"` is never accidentally looked up as the identifier
/// `x`).
#[derive(Debug, Default)]
pub struct StringPool {
    interner: Interner,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct StringId(pub Atom);

impl StringPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, text: &str) -> StringId {
        StringId(self.interner.intern(text))
    }

    #[must_use]
    pub fn get(&self, id: StringId) -> &str {
        self.interner.resolve(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interns_repeated_text_to_same_atom() {
        let mut pool = NamePool::new();
        let a = pool.add("foo");
        let b = pool.add("bar");
        let c = pool.add("foo");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.get(a), "foo");
    }

    #[test]
    fn name_pool_seeds_main() {
        let pool = NamePool::new();
        assert_eq!(pool.get(pool.main()), "main");
    }

    #[test]
    fn string_pool_is_disjoint_in_type_from_name_pool() {
        let mut names = NamePool::new();
        let mut strings = StringPool::new();
        let n = names.add("x");
        let s = strings.add("x");
        // Different pools, different handles, but same text round-trips.
        assert_eq!(names.get(n), strings.get(s));
    }
}
