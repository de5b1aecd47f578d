//! Drive the yices SMT engine with SMT-LIB commands.
//!
//! A [`Session`] takes parsed SMT-LIB commands, rewrites them into the yices
//! input language and talks to a `yices -i` subprocess, reading each reply up
//! to the engine's prompt.
//!
//! ```no_run
//! use smt_bridge::{Expr, Response, SessionBuilder, Sort, Symbol, Verdict};
//!
//! let mut session = SessionBuilder::new().build();
//! assert!(session.start().is_ok());
//! session.declare_fun(&Symbol::new("x"), &[], &Sort::named("Int"));
//! session.assert(&Expr::apply(">", [Expr::symbol("x"), Expr::numeral(0)]));
//! assert_eq!(session.check_sat(), Response::Verdict(Verdict::Sat));
//! session.exit();
//! ```

mod ast;
mod error;
mod known_atoms;
mod response;
mod session;
mod sexpr;
mod source;
mod translate;
mod transport;

pub use ast::{
    Attribute, AttributeValue, Binding, Command, Declaration, Expr, ExprKind, Identifier, Keyword,
    Pos, QualifiedIdentifier, Sort, SortKind, Symbol,
};
pub use error::{TranslateError, TransportError};
pub use known_atoms::KnownAtoms;
pub use response::{ErrorResponse, Response, Verdict};
pub use session::{Lifecycle, Session, SessionBuilder, SessionConfig, SessionState};
pub use sexpr::{SExpr, SExprInner};
pub use source::{Location, Source};
pub use translate::Translator;
pub use transport::{ProcessTransport, Transport};
