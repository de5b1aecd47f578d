//! The solver-independent SMT-LIB syntax tree handed to a [`Session`][crate::Session].
//!
//! Trees are produced by an external parser. Every node optionally records the
//! character range it came from so that errors can point back into the input.

use std::fmt;

/// A half-open range of character offsets into a [`Source`][crate::Source].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub start: usize,
    pub end: usize,
}

impl Pos {
    pub fn new(start: usize, end: usize) -> Self {
        Pos { start, end }
    }
}

/// A symbol, with the position it was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub pos: Option<Pos>,
}

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol {
            name: name.into(),
            pos: None,
        }
    }

    pub fn at(mut self, pos: Pos) -> Self {
        self.pos = Some(pos);
        self
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A keyword such as `:status`. The name includes the leading colon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyword {
    pub name: String,
    pub pos: Option<Pos>,
}

impl Keyword {
    pub fn new(name: impl Into<String>) -> Self {
        Keyword {
            name: name.into(),
            pos: None,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An identifier: a symbol, optionally indexed as in `(_ extract 3 0)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identifier {
    pub symbol: Symbol,
    pub indices: Vec<String>,
}

impl Identifier {
    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    pub fn pos(&self) -> Option<Pos> {
        self.symbol.pos
    }
}

impl From<Symbol> for Identifier {
    fn from(symbol: Symbol) -> Self {
        Identifier {
            symbol,
            indices: Vec::new(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.indices.is_empty() {
            self.symbol.fmt(f)
        } else {
            write!(f, "(_ {} {})", self.symbol, self.indices.join(" "))
        }
    }
}

/// An identifier with an optional `(as id sort)` qualification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualifiedIdentifier {
    pub id: Identifier,
    pub sort: Option<Sort>,
}

impl QualifiedIdentifier {
    pub fn pos(&self) -> Option<Pos> {
        self.id.pos()
    }
}

impl From<Symbol> for QualifiedIdentifier {
    fn from(symbol: Symbol) -> Self {
        QualifiedIdentifier {
            id: symbol.into(),
            sort: None,
        }
    }
}

impl fmt::Display for QualifiedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.sort {
            Some(sort) => write!(f, "(as {} {})", self.id, sort),
            None => self.id.fmt(f),
        }
    }
}

/// A sorted variable, as bound by `forall` and `exists` or as a
/// `define-fun` parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub parameter: Symbol,
    pub sort: Sort,
}

/// A `let` binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub parameter: Symbol,
    pub expr: Expr,
}

/// The value half of an attribute or an option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeValue {
    Symbol(String),
    Numeral(String),
    Str(String),
    Keyword(String),
    List(Vec<AttributeValue>),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttributeValue::Symbol(s) | AttributeValue::Numeral(s) | AttributeValue::Keyword(s) => {
                f.write_str(s)
            }
            AttributeValue::Str(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            AttributeValue::List(items) => {
                write!(f, "(")?;
                let mut sep = "";
                for item in items {
                    write!(f, "{}{}", sep, item)?;
                    sep = " ";
                }
                write!(f, ")")
            }
        }
    }
}

/// An expression attribute such as `:named a1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub keyword: Keyword,
    pub value: Option<AttributeValue>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    Numeral(String),
    Decimal(String),
    Hex(String),
    Binary(String),
    Str(String),
    Identifier(QualifiedIdentifier),
    Apply {
        head: QualifiedIdentifier,
        args: Vec<Expr>,
    },
    Forall {
        params: Vec<Declaration>,
        body: Box<Expr>,
    },
    Exists {
        params: Vec<Declaration>,
        body: Box<Expr>,
    },
    Let {
        bindings: Vec<Binding>,
        body: Box<Expr>,
    },
    Attributed {
        expr: Box<Expr>,
        attributes: Vec<Attribute>,
    },
    /// A malformed fragment left behind by the parser.
    Error(String),
}

/// An SMT-LIB term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Option<Pos>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr { kind, pos: None }
    }

    pub fn at(mut self, pos: Pos) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn numeral(value: impl fmt::Display) -> Self {
        Expr::new(ExprKind::Numeral(value.to_string()))
    }

    pub fn decimal(value: impl Into<String>) -> Self {
        Expr::new(ExprKind::Decimal(value.into()))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::new(ExprKind::Str(value.into()))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::new(ExprKind::Identifier(Symbol::new(name).into()))
    }

    pub fn apply<I: IntoIterator<Item = Expr>>(head: impl Into<String>, args: I) -> Self {
        Expr::new(ExprKind::Apply {
            head: Symbol::new(head).into(),
            args: args.into_iter().collect(),
        })
    }

    pub fn forall(params: Vec<Declaration>, body: Expr) -> Self {
        Expr::new(ExprKind::Forall {
            params,
            body: Box::new(body),
        })
    }

    pub fn exists(params: Vec<Declaration>, body: Expr) -> Self {
        Expr::new(ExprKind::Exists {
            params,
            body: Box::new(body),
        })
    }

    pub fn let_(bindings: Vec<Binding>, body: Expr) -> Self {
        Expr::new(ExprKind::Let {
            bindings,
            body: Box::new(body),
        })
    }

    pub fn named(self, name: impl Into<String>) -> Self {
        Expr::new(ExprKind::Attributed {
            expr: Box::new(self),
            attributes: vec![Attribute {
                keyword: Keyword::new(":named"),
                value: Some(AttributeValue::Symbol(name.into())),
            }],
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortKind {
    /// The built-in `Bool` sort.
    Bool,
    /// A sort constructor applied to zero or more argument sorts.
    Family { name: Identifier, params: Vec<Sort> },
    /// A `define-sort` abbreviation that has not been expanded.
    Abbreviation { name: Identifier, params: Vec<Sort> },
    /// The sort of a function, `(-> args result)`.
    Function { args: Vec<Sort>, result: Box<Sort> },
    /// A sort parameter inside a `define-sort` body.
    Parameter(Symbol),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
    pub kind: SortKind,
    pub pos: Option<Pos>,
}

impl Sort {
    pub fn new(kind: SortKind) -> Self {
        Sort { kind, pos: None }
    }

    pub fn at(mut self, pos: Pos) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn bool() -> Self {
        Sort::new(SortKind::Bool)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Sort::family(name, Vec::new())
    }

    pub fn family(name: impl Into<String>, params: Vec<Sort>) -> Self {
        Sort::new(SortKind::Family {
            name: Symbol::new(name).into(),
            params,
        })
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn list(f: &mut fmt::Formatter, head: &dyn fmt::Display, items: &[Sort]) -> fmt::Result {
            write!(f, "({}", head)?;
            for item in items {
                write!(f, " {}", item)?;
            }
            write!(f, ")")
        }

        match &self.kind {
            SortKind::Bool => f.write_str("Bool"),
            SortKind::Family { name, params } | SortKind::Abbreviation { name, params } => {
                if params.is_empty() {
                    name.fmt(f)
                } else {
                    list(f, name, params)
                }
            }
            SortKind::Function { args, result } => {
                write!(f, "(->")?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, " {})", result)
            }
            SortKind::Parameter(sym) => sym.fmt(f),
        }
    }
}

/// One SMT-LIB command, as dispatched by [`Session::execute`][crate::Session::execute].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Assert(Expr),
    CheckSat,
    DeclareFun {
        name: Symbol,
        args: Vec<Sort>,
        result: Sort,
    },
    DefineFun {
        name: Symbol,
        params: Vec<Declaration>,
        result: Sort,
        body: Expr,
    },
    DeclareSort {
        name: Symbol,
        arity: usize,
    },
    DefineSort {
        name: Symbol,
        params: Vec<Symbol>,
        sort: Sort,
    },
    Exit,
    GetAssignment,
    GetInfo(Keyword),
    GetOption(Keyword),
    GetProof,
    GetUnsatCore,
    GetValue(Vec<Expr>),
    Pop(usize),
    Push(usize),
    SetLogic(Symbol),
    SetOption(Keyword, AttributeValue),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_display_in_smtlib_syntax() {
        let array = Sort::family("Array", vec![Sort::named("Int"), Sort::bool()]);
        assert_eq!(array.to_string(), "(Array Int Bool)");

        let fun = Sort::new(SortKind::Function {
            args: vec![Sort::named("Int")],
            result: Box::new(Sort::bool()),
        });
        assert_eq!(fun.to_string(), "(-> Int Bool)");
    }

    #[test]
    fn qualified_identifiers_display() {
        let id = QualifiedIdentifier {
            id: Identifier {
                symbol: Symbol::new("extract"),
                indices: vec!["3".into(), "0".into()],
            },
            sort: None,
        };
        assert_eq!(id.to_string(), "(_ extract 3 0)");

        let as_id = QualifiedIdentifier {
            id: Symbol::new("nil").into(),
            sort: Some(Sort::family("List", vec![Sort::named("Int")])),
        };
        assert_eq!(as_id.to_string(), "(as nil (List Int))");
    }

    #[test]
    fn string_attribute_values_escape_quotes() {
        let v = AttributeValue::Str("say \"hi\"".into());
        assert_eq!(v.to_string(), "\"say \"\"hi\"\"\"");
    }
}
