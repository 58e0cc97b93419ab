//! Character-level tokenizer (spec.md §6 "Source surface").
//!
//! Grounded on `original_source/include/Token.h`'s token-kind set
//! (`T_DOUBLE_COLON`, `T_BACKSLASH`, `T_COMMA`, `T_BRACE_L_REG/CUR`,
//! ...), re-expressed as a Rust enum instead of a C++ enum-plus-union.

use orb_common::{parse_float_literal, parse_int_literal, CodeIndex, CodeLoc, DiagKind, StringId};

#[derive(Clone, Debug, PartialEq)]
pub enum TokKind {
    LParen,
    RParen,
    LBrace,
    RBrace,
    DoubleColon,
    Comma,
    Backslash,
    Id(String),
    Int(i128),
    Float(f64),
    Char(char),
    Bool(bool),
    Str(String),
    Null,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tok {
    pub kind: TokKind,
    pub loc: CodeLoc,
}

/// Characters that, in a contiguous run, form one operator-like
/// identifier (e.g. `==`, `<<`, `...`). Brackets are handled separately
/// since only the exact pair `[]` is meaningful (spec.md §6).
const SYMBOL_CHARS: &str = "+-*/%<>=!&|^~.";

pub struct Lexer<'a> {
    chars: Vec<(usize, char)>,
    source: &'a str,
    pos: usize,
    file: StringId,
}

pub struct LexOutcome {
    pub tokens: Vec<Tok>,
    pub errors: Vec<(CodeLoc, DiagKind)>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str, file: StringId) -> Self {
        Self {
            chars: source.char_indices().collect(),
            source,
            pos: 0,
            file,
        }
    }

    #[must_use]
    pub fn tokenize(mut self) -> LexOutcome {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        loop {
            self.skip_trivia(&mut errors);
            let start = self.byte_offset();
            let Some((_, ch)) = self.peek() else {
                tokens.push(Tok {
                    kind: TokKind::Eof,
                    loc: CodeLoc::point(self.file, start),
                });
                break;
            };
            let tok = match ch {
                '(' => self.single(TokKind::LParen),
                ')' => self.single(TokKind::RParen),
                '{' => self.single(TokKind::LBrace),
                '}' => self.single(TokKind::RBrace),
                ',' => self.single(TokKind::Comma),
                '\\' => self.single(TokKind::Backslash),
                ':' => self.colon(&mut errors),
                '[' => self.bracket_pair(&mut errors),
                '"' => self.string_literal(&mut errors),
                '\'' => self.char_literal(&mut errors),
                c if c.is_ascii_digit() => self.number(),
                c if c.is_alphabetic() || c == '_' => self.identifier(),
                c if SYMBOL_CHARS.contains(c) => self.symbol_run(),
                _ => {
                    self.advance();
                    errors.push((CodeLoc::new(self.file, start, self.byte_offset()), DiagKind::BadToken));
                    continue;
                }
            };
            tokens.push(tok);
        }
        LexOutcome { tokens, errors }
    }

    fn peek(&self) -> Option<(usize, char)> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<(usize, char)> {
        self.chars.get(self.pos + offset).copied()
    }

    fn byte_offset(&self) -> CodeIndex {
        match self.peek() {
            Some((b, _)) => u32::try_from(b).unwrap_or(u32::MAX),
            None => u32::try_from(self.source.len()).unwrap_or(u32::MAX),
        }
    }

    fn advance(&mut self) -> Option<char> {
        let (_, c) = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn single(&mut self, kind: TokKind) -> Tok {
        let start = self.byte_offset();
        self.advance();
        let end = self.byte_offset();
        Tok {
            kind,
            loc: CodeLoc::new(self.file, start, end),
        }
    }

    fn skip_trivia(&mut self, errors: &mut Vec<(CodeLoc, DiagKind)>) {
        loop {
            match self.peek() {
                Some((_, c)) if c.is_whitespace() => {
                    self.advance();
                }
                Some((_, '/')) if matches!(self.peek_at(1), Some((_, '/'))) => {
                    while !matches!(self.peek(), None | Some((_, '\n'))) {
                        self.advance();
                    }
                }
                Some((_, '/')) if matches!(self.peek_at(1), Some((_, '*'))) => {
                    let start = self.byte_offset();
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some((_, c)) = self.peek() {
                        if c == '*' && matches!(self.peek_at(1), Some((_, '/'))) {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        errors.push((
                            CodeLoc::new(self.file, start, self.byte_offset()),
                            DiagKind::UnclosedMultilineComment,
                        ));
                    }
                }
                _ => break,
            }
        }
    }

    fn colon(&mut self, errors: &mut Vec<(CodeLoc, DiagKind)>) -> Tok {
        let start = self.byte_offset();
        self.advance();
        if matches!(self.peek(), Some((_, ':'))) {
            self.advance();
            return Tok {
                kind: TokKind::DoubleColon,
                loc: CodeLoc::new(self.file, start, self.byte_offset()),
            };
        }
        let loc = CodeLoc::new(self.file, start, self.byte_offset());
        errors.push((loc, DiagKind::BadToken));
        Tok {
            kind: TokKind::Id(":".to_string()),
            loc,
        }
    }

    fn bracket_pair(&mut self, errors: &mut Vec<(CodeLoc, DiagKind)>) -> Tok {
        let start = self.byte_offset();
        self.advance();
        if matches!(self.peek(), Some((_, ']'))) {
            self.advance();
            return Tok {
                kind: TokKind::Id("[]".to_string()),
                loc: CodeLoc::new(self.file, start, self.byte_offset()),
            };
        }
        let loc = CodeLoc::new(self.file, start, self.byte_offset());
        errors.push((loc, DiagKind::BadToken));
        Tok {
            kind: TokKind::Id("[".to_string()),
            loc,
        }
    }

    fn identifier(&mut self) -> Tok {
        let start = self.byte_offset();
        let mut text = String::new();
        while let Some((_, c)) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let loc = CodeLoc::new(self.file, start, self.byte_offset());
        match text.as_str() {
            "true" => Tok { kind: TokKind::Bool(true), loc },
            "false" => Tok { kind: TokKind::Bool(false), loc },
            "null" => Tok { kind: TokKind::Null, loc },
            _ => Tok { kind: TokKind::Id(text), loc },
        }
    }

    fn symbol_run(&mut self) -> Tok {
        let start = self.byte_offset();
        let mut text = String::new();
        while let Some((_, c)) = self.peek() {
            if SYMBOL_CHARS.contains(c) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Tok {
            kind: TokKind::Id(text),
            loc: CodeLoc::new(self.file, start, self.byte_offset()),
        }
    }

    fn number(&mut self) -> Tok {
        let start = self.byte_offset();
        let mut text = String::new();
        let mut is_float = false;
        if matches!(self.peek(), Some((_, '0'))) && matches!(self.peek_at(1), Some((_, 'x' | 'X' | 'b' | 'B' | 'o' | 'O'))) {
            text.push(self.advance().unwrap());
            text.push(self.advance().unwrap());
            while let Some((_, c)) = self.peek() {
                if c.is_alphanumeric() || c == '_' {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        } else {
            while let Some((_, c)) = self.peek() {
                if c.is_ascii_digit() || c == '_' {
                    text.push(c);
                    self.advance();
                } else if c == '.' && matches!(self.peek_at(1), Some((_, d)) if d.is_ascii_digit()) {
                    is_float = true;
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            if matches!(self.peek(), Some((_, 'u' | 'U'))) && !is_float {
                text.push(self.advance().unwrap());
            }
        }
        let loc = CodeLoc::new(self.file, start, self.byte_offset());
        if is_float {
            match parse_float_literal(&text) {
                Some(v) => Tok { kind: TokKind::Float(v), loc },
                None => Tok { kind: TokKind::Float(0.0), loc },
            }
        } else {
            match parse_int_literal(&text) {
                Some(v) => Tok { kind: TokKind::Int(v), loc },
                None => Tok { kind: TokKind::Int(0), loc },
            }
        }
    }

    fn string_literal(&mut self, errors: &mut Vec<(CodeLoc, DiagKind)>) -> Tok {
        let start = self.byte_offset();
        self.advance();
        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some((_, '\n')) => {
                    errors.push((
                        CodeLoc::new(self.file, start, self.byte_offset()),
                        DiagKind::BadLiteral { text: text.clone() },
                    ));
                    break;
                }
                Some((_, '"')) => {
                    self.advance();
                    break;
                }
                Some((_, '\\')) => {
                    self.advance();
                    match self.read_escape(errors, start) {
                        Some(c) => text.push(c),
                        None => break,
                    }
                }
                Some((_, c)) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        Tok {
            kind: TokKind::Str(text),
            loc: CodeLoc::new(self.file, start, self.byte_offset()),
        }
    }

    fn char_literal(&mut self, errors: &mut Vec<(CodeLoc, DiagKind)>) -> Tok {
        let start = self.byte_offset();
        self.advance();
        let value = match self.peek() {
            Some((_, '\\')) => {
                self.advance();
                self.read_escape(errors, start)
            }
            Some((_, c)) => {
                self.advance();
                Some(c)
            }
            None => None,
        };
        if !matches!(self.peek(), Some((_, '\''))) {
            errors.push((
                CodeLoc::new(self.file, start, self.byte_offset()),
                DiagKind::BadLiteral {
                    text: value.map(String::from).unwrap_or_default(),
                },
            ));
        } else {
            self.advance();
        }
        Tok {
            kind: TokKind::Char(value.unwrap_or('\0')),
            loc: CodeLoc::new(self.file, start, self.byte_offset()),
        }
    }

    fn read_escape(&mut self, errors: &mut Vec<(CodeLoc, DiagKind)>, start: CodeIndex) -> Option<char> {
        let (_, c) = self.peek()?;
        self.advance();
        match c {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            '0' => Some('\0'),
            '\\' => Some('\\'),
            '"' => Some('"'),
            '\'' => Some('\''),
            'x' => {
                let mut hex = String::new();
                for _ in 0..2 {
                    if let Some((_, h)) = self.peek() {
                        if h.is_ascii_hexdigit() {
                            hex.push(h);
                            self.advance();
                        }
                    }
                }
                u8::from_str_radix(&hex, 16).ok().map(char::from)
            }
            other => {
                errors.push((
                    CodeLoc::new(self.file, start, self.byte_offset()),
                    DiagKind::BadLiteral { text: format!("\\{other}") },
                ));
                Some(other)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_common::StringPool;

    fn toks(src: &str) -> Vec<TokKind> {
        let mut strings = StringPool::new();
        let f = strings.add("t.orb");
        Lexer::new(src, f).tokenize().tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_parens_and_ids() {
        let t = toks("(sym x i32)");
        assert_eq!(
            t,
            vec![
                TokKind::LParen,
                TokKind::Id("sym".into()),
                TokKind::Id("x".into()),
                TokKind::Id("i32".into()),
                TokKind::RParen,
                TokKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_attribute_prefix_and_unescape() {
        let t = toks(":: type, x");
        assert_eq!(
            t,
            vec![
                TokKind::DoubleColon,
                TokKind::Id("type".into()),
                TokKind::Comma,
                TokKind::Id("x".into()),
                TokKind::Eof,
            ]
        );
    }

    #[test]
    fn string_literal_decodes_hex_escape() {
        let t = toks("\"a\\x41b\"");
        assert_eq!(t, vec![TokKind::Str("aAb".into()), TokKind::Eof]);
    }

    #[test]
    fn unclosed_block_comment_reports_error() {
        let mut strings = StringPool::new();
        let f = strings.add("t.orb");
        let outcome = Lexer::new("/* never closes", f).tokenize();
        assert!(matches!(outcome.errors.first(), Some((_, DiagKind::UnclosedMultilineComment))));
    }

    #[test]
    fn recognizes_reserved_literal_spellings() {
        assert_eq!(toks("true false null"), vec![
            TokKind::Bool(true),
            TokKind::Bool(false),
            TokKind::Null,
            TokKind::Eof,
        ]);
    }
}
