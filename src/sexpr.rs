use std::fmt;
use std::rc::Rc;

/// A piece of wire text in the engine's prefix syntax.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SExpr(Rc<SExprInner>);

impl SExpr {
    pub fn new(inner: SExprInner) -> Self {
        SExpr(Rc::new(inner))
    }

    pub fn list(args: Vec<SExpr>) -> SExpr {
        SExpr::new(SExprInner::List(args))
    }

    pub fn atom<S: AsRef<str>>(sym: S) -> SExpr {
        SExpr::new(SExprInner::Atom(String::from(sym.as_ref())))
    }

    /// A yices typed binder, `name::sort`.
    pub fn typed<S: AsRef<str>>(name: S, sort: SExpr) -> SExpr {
        SExpr::new(SExprInner::Typed(String::from(name.as_ref()), sort))
    }

    pub fn binop(op: SExpr, lhs: SExpr, rhs: SExpr) -> SExpr {
        SExpr::list(vec![op, lhs, rhs])
    }

    /// `(head args...)`
    pub fn apply<I: IntoIterator<Item = SExpr>>(head: SExpr, args: I) -> SExpr {
        SExpr::list(std::iter::once(head).chain(args).collect())
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self.as_ref() {
            SExprInner::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self.as_ref() {
            SExprInner::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<SExprInner> for SExpr {
    fn as_ref(&self) -> &SExprInner {
        self.0.as_ref()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum SExprInner {
    Atom(String),
    List(Vec<SExpr>),
    Typed(String, SExpr),
}

impl fmt::Display for SExprInner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SExprInner::Atom(str) => write!(f, "{}", str),
            SExprInner::List(nodes) => {
                write!(f, "(")?;
                let mut sep = "";
                for node in nodes.iter() {
                    write!(f, "{}", sep)?;
                    node.fmt(f)?;
                    sep = " ";
                }
                write!(f, ")")
            }
            SExprInner::Typed(name, sort) => write!(f, "{}::{}", name, sort),
        }
    }
}

/// Incremental reader for engine replies. Unbalanced input is kept until
/// more text arrives.
pub(crate) struct Parser {
    context: Vec<Vec<SExpr>>,
}

impl Parser {
    pub(crate) fn new() -> Self {
        Self {
            context: Vec::new(),
        }
    }

    /// True when a list has been opened but not closed yet.
    pub(crate) fn is_pending(&self) -> bool {
        !self.context.is_empty()
    }

    fn atom<S: AsRef<str>>(&mut self, sym: S) -> Option<SExpr> {
        let expr = SExpr::atom(sym);
        if let Some(outer) = self.context.last_mut() {
            outer.push(expr);
            None
        } else {
            Some(expr)
        }
    }

    fn app(&mut self) -> Option<SExpr> {
        if let Some(args) = self.context.pop() {
            let expr = SExpr::list(args);
            if let Some(outer) = self.context.last_mut() {
                outer.push(expr);
            } else {
                return Some(expr);
            }
        }
        None
    }

    /// Read every complete top-level expression in `text`.
    pub(crate) fn parse(&mut self, text: &str) -> Vec<SExpr> {
        let mut exprs = Vec::new();
        for line in text.lines() {
            for token in Lexer::new(line) {
                let res = match token {
                    Token::Symbol(sym) => self.atom(sym),
                    Token::LParen => {
                        self.context.push(Vec::new());
                        None
                    }
                    Token::RParen => self.app(),
                };
                exprs.extend(res);
            }
        }
        exprs
    }
}

#[derive(Debug)]
enum Token<'a> {
    LParen,
    RParen,
    Symbol(&'a str),
}

struct Lexer<'a> {
    chars: &'a str,
    indices: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(chars: &'a str) -> Self {
        Self {
            chars,
            indices: chars.char_indices().peekable(),
        }
    }

    fn scan_symbol(&mut self, start: usize) -> &'a str {
        let mut end;
        loop {
            if let Some((ix, c)) = self.indices.peek() {
                end = *ix;
                if c.is_alphabetic() || c.is_numeric() || "~!@$%^&*_-+=<>.?/:#'".contains(*c) {
                    self.indices.next();
                    continue;
                }
            } else {
                end = self.chars.len();
            }

            break;
        }

        &self.chars[start..end]
    }

    fn scan_string(&mut self, start: usize) -> &'a str {
        while let Some((ix, c)) = self.indices.next() {
            if c == '"' {
                return &self.chars[start..ix + 1];
            }
        }
        &self.chars[start..]
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((start, c)) = self.indices.next() {
            match c {
                '(' => {
                    return Some(Token::LParen);
                }

                ')' => {
                    return Some(Token::RParen);
                }

                '"' => return Some(Token::Symbol(self.scan_string(start))),

                // comments run to the end of the line, and the lexer only ever sees one line
                ';' => self.indices = self.chars[0..0].char_indices().peekable(),

                c if c.is_whitespace() => {}

                _ => return Some(Token::Symbol(self.scan_symbol(start))),
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nested_lists() {
        let e = SExpr::apply(
            SExpr::atom("and"),
            vec![
                SExpr::binop(SExpr::atom("<="), SExpr::atom("a"), SExpr::atom("b")),
                SExpr::binop(SExpr::atom("<="), SExpr::atom("b"), SExpr::atom("c")),
            ],
        );
        assert_eq!(e.to_string(), "(and (<= a b) (<= b c))");
    }

    #[test]
    fn display_typed_binders() {
        let arrow = SExpr::list(vec![SExpr::atom("->"), SExpr::atom("int"), SExpr::atom("bool")]);
        assert_eq!(SExpr::typed("f", arrow).to_string(), "f::(-> int bool)");
        assert_eq!(SExpr::typed("x", SExpr::atom("int")).to_string(), "x::int");
    }

    #[test]
    fn parse_multiple_replies() {
        let mut parser = Parser::new();
        let exprs = parser.parse("(= x 5)\n(= b true)\n");
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[0].to_string(), "(= x 5)");
        assert_eq!(exprs[1].as_list().map(|l| l.len()), Some(3));
        assert!(!parser.is_pending());
    }

    #[test]
    fn parse_keeps_unbalanced_input_pending() {
        let mut parser = Parser::new();
        assert!(parser.parse("(= y").is_empty());
        assert!(parser.is_pending());
        let exprs = parser.parse(" -1/2)");
        assert_eq!(exprs[0].to_string(), "(= y -1/2)");
        assert!(!parser.is_pending());
    }

    #[test]
    fn parse_skips_comments_and_reads_strings() {
        let mut parser = Parser::new();
        let exprs = parser.parse("; a comment (\n(echo \"a b\")");
        assert_eq!(exprs.len(), 1);
        assert_eq!(exprs[0].as_list().unwrap()[1].as_atom(), Some("\"a b\""));
    }
}
