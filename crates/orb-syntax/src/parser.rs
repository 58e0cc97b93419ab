//! Recursive-descent parser: tokens to [`orb_ast::Node`] trees.
//!
//! Grounded on `original_source/include/AST.h`'s `AstNode` (two kinds,
//! `kTuple`/`kTerminal`, matching [`orb_ast::NodeKind::Composite`] and
//! [`orb_ast::NodeKind::Leaf`] here) and `include/Values.h`'s
//! `TerminalVal` literal-kind set.

use crate::lexer::{Lexer, TokKind};
use orb_ast::{LiteralKind, Node};
use orb_common::{CodeLoc, DiagKind, NamePool, StringId, StringPool};

pub struct ParseOutcome {
    pub forms: Vec<Node>,
    pub errors: Vec<(CodeLoc, DiagKind)>,
}

/// Parses one source file's full token stream into its top-level forms.
#[must_use]
pub fn parse_file(
    source: &str,
    file: StringId,
    names: &mut NamePool,
    strings: &mut StringPool,
) -> ParseOutcome {
    let lexed = Lexer::new(source, file).tokenize();
    let mut parser = Parser {
        tokens: lexed.tokens,
        pos: 0,
        names,
        strings,
        errors: lexed.errors,
    };
    let mut forms = Vec::new();
    while !parser.at_eof() {
        match parser.primary() {
            Some(node) => forms.push(node),
            None => break,
        }
    }
    ParseOutcome {
        forms,
        errors: parser.errors,
    }
}

struct Parser<'n, 's> {
    tokens: Vec<crate::lexer::Tok>,
    pos: usize,
    names: &'n mut NamePool,
    strings: &'s mut StringPool,
    errors: Vec<(CodeLoc, DiagKind)>,
}

impl<'n, 's> Parser<'n, 's> {
    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokKind::Eof)
    }

    fn peek_kind(&self) -> &TokKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_loc(&self) -> CodeLoc {
        self.tokens[self.pos.min(self.tokens.len() - 1)].loc
    }

    fn advance(&mut self) -> crate::lexer::Tok {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error_unexpected(&mut self) -> Node {
        let loc = self.peek_loc();
        let found = format!("{:?}", self.peek_kind());
        self.errors.push((loc, DiagKind::UnexpectedToken { found }));
        self.advance();
        Node::leaf(LiteralKind::Null, loc)
    }

    /// Parses one primary expression followed by any `::name value`
    /// attribute suffixes.
    fn primary(&mut self) -> Option<Node> {
        let mut node = self.atom()?;
        while matches!(self.peek_kind(), TokKind::DoubleColon) {
            self.advance();
            let name_loc = self.peek_loc();
            let attr_name = match self.peek_kind().clone() {
                TokKind::Id(text) => {
                    self.advance();
                    self.names.add(&text)
                }
                _ => {
                    self.errors.push((name_loc, DiagKind::UnexpectedToken {
                        found: format!("{:?}", self.peek_kind()),
                    }));
                    self.names.add("")
                }
            };
            let value = self.primary().unwrap_or_else(|| Node::leaf(LiteralKind::Null, name_loc));
            if self.names.get(attr_name) == "type" {
                node.type_attr = Some(Box::new(value));
            } else {
                node.attrs.push((attr_name, Box::new(value)));
            }
        }
        Some(node)
    }

    fn atom(&mut self) -> Option<Node> {
        let loc = self.peek_loc();
        match self.peek_kind().clone() {
            TokKind::Eof => None,
            TokKind::LParen => Some(self.delimited(TokKind::RParen)),
            TokKind::LBrace => Some(self.delimited(TokKind::RBrace)),
            TokKind::Backslash => {
                self.advance();
                let inner = self.atom().unwrap_or_else(|| Node::leaf(LiteralKind::Null, loc));
                let score = inner.escape_score + 1;
                Some(inner.with_escape(score))
            }
            TokKind::Comma => {
                self.advance();
                let mut inner = self.atom().unwrap_or_else(|| Node::leaf(LiteralKind::Null, loc));
                inner.unescape_one();
                Some(inner)
            }
            TokKind::Id(text) => {
                self.advance();
                let id = self.names.add(&text);
                Some(Node::leaf(LiteralKind::Id(id), loc))
            }
            TokKind::Int(v) => {
                self.advance();
                Some(Node::leaf(LiteralKind::SignedInt(v), loc))
            }
            TokKind::Float(v) => {
                self.advance();
                Some(Node::leaf(LiteralKind::Float(v), loc))
            }
            TokKind::Char(c) => {
                self.advance();
                Some(Node::leaf(LiteralKind::Char(c), loc))
            }
            TokKind::Bool(b) => {
                self.advance();
                Some(Node::leaf(LiteralKind::Bool(b), loc))
            }
            TokKind::Null => {
                self.advance();
                Some(Node::leaf(LiteralKind::Null, loc))
            }
            TokKind::Str(text) => {
                self.advance();
                let id = self.strings.add(&text);
                Some(Node::leaf(LiteralKind::Str(id), loc))
            }
            TokKind::DoubleColon | TokKind::RParen | TokKind::RBrace => Some(self.error_unexpected()),
        }
    }

    fn delimited(&mut self, closer: TokKind) -> Node {
        let start = self.peek_loc();
        self.advance();
        let mut children = Vec::new();
        loop {
            if self.peek_kind() == &closer {
                break;
            }
            if self.at_eof() {
                self.errors.push((self.peek_loc(), DiagKind::UnbalancedNode));
                break;
            }
            match self.primary() {
                Some(node) => children.push(node),
                None => break,
            }
        }
        let end_loc = self.peek_loc();
        if self.peek_kind() == &closer {
            self.advance();
        }
        Node::composite(children, CodeLoc::new(start.file, start.start, end_loc.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_ast::NodeKind;

    fn parse(src: &str) -> (Vec<Node>, NamePool, StringPool) {
        let mut names = NamePool::new();
        let mut strings = StringPool::new();
        let file = strings.add("t.orb");
        let outcome = parse_file(src, file, &mut names, &mut strings);
        assert!(outcome.errors.is_empty(), "unexpected errors: {:?}", outcome.errors);
        (outcome.forms, names, strings)
    }

    #[test]
    fn parses_nested_composite() {
        let (forms, _, _) = parse("(sym x i32)");
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].children().len(), 3);
    }

    #[test]
    fn brace_form_is_also_composite() {
        let (forms, _, _) = parse("{ (ret 1) }");
        assert!(matches!(*forms[0].kind, NodeKind::Composite(_)));
    }

    #[test]
    fn type_attribute_populates_type_attr_not_attrs() {
        let (forms, names, _) = parse("(sym x ::type i32)");
        let sym_call = &forms[0];
        let x_node = &sym_call.children()[1];
        assert!(x_node.type_attr.is_some());
        assert!(x_node.attrs.is_empty());
        let ty = x_node.type_attr.as_ref().unwrap();
        assert_eq!(names.get(ty.as_id().unwrap()), "i32");
    }

    #[test]
    fn other_attribute_goes_into_attrs() {
        let (forms, names, _) = parse("(x ::note hi)");
        let attrs = &forms[0].children()[0].attrs;
        assert_eq!(attrs.len(), 1);
        assert_eq!(names.get(attrs[0].0), "note");
    }

    #[test]
    fn backslash_escapes_and_comma_unescapes() {
        let (forms, _, _) = parse("(\\x ,\\x)");
        let escaped = &forms[0].children()[0];
        assert_eq!(escaped.escape_score, 1);
        let roundtrip = &forms[0].children()[1];
        assert_eq!(roundtrip.escape_score, 0);
    }

    #[test]
    fn unbalanced_paren_reports_error() {
        let mut names = NamePool::new();
        let mut strings = StringPool::new();
        let file = strings.add("t.orb");
        let outcome = parse_file("(sym x", file, &mut names, &mut strings);
        assert!(matches!(outcome.errors.first(), Some((_, DiagKind::UnbalancedNode))));
    }
}
