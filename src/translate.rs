//! Rewriting SMT-LIB terms and sorts into the yices input language.
//!
//! yices has no chainable comparisons, no n-ary `xor`, `=>` or `distinct`, and
//! no unary minus, so applications of those operators are expanded into
//! equivalent binary forms. Everything else maps one to one.

use crate::ast::{Declaration, Expr, ExprKind, QualifiedIdentifier, Sort, SortKind, Symbol};
use crate::error::TranslateError;
use crate::known_atoms::KnownAtoms;
use crate::sexpr::SExpr;
use std::collections::HashMap;

type Result<T> = std::result::Result<T, TranslateError>;

pub struct Translator {
    atoms: KnownAtoms,
    sorts: HashMap<String, String>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    /// A translator knowing the core `Bool`, `Int` and `Real` sorts.
    pub fn new() -> Self {
        let atoms = KnownAtoms::new();
        let mut sorts = HashMap::new();
        sorts.insert("Bool".to_string(), atoms.bool.to_string());
        sorts.insert("Int".to_string(), atoms.int.to_string());
        sorts.insert("Real".to_string(), atoms.real.to_string());
        Translator { atoms, sorts }
    }

    /// Render the nullary sort `smt` as `native`.
    pub fn with_sort(mut self, smt: impl Into<String>, native: impl Into<String>) -> Self {
        self.sorts.insert(smt.into(), native.into());
        self
    }

    pub fn atoms(&self) -> &KnownAtoms {
        &self.atoms
    }

    pub fn symbol(&self, sym: &Symbol) -> SExpr {
        SExpr::atom(&sym.name)
    }

    pub fn expr(&self, expr: &Expr) -> Result<SExpr> {
        match &expr.kind {
            ExprKind::Numeral(n) => Ok(SExpr::atom(n)),
            ExprKind::Decimal(_) => Err(TranslateError::UnsupportedLiteral {
                kind: "decimal",
                pos: expr.pos,
            }),
            ExprKind::Str(_) => Err(TranslateError::UnsupportedLiteral {
                kind: "string",
                pos: expr.pos,
            }),
            ExprKind::Hex(_) => Err(unexpected("a Hex literal", expr.pos)),
            ExprKind::Binary(_) => Err(unexpected("a Binary literal", expr.pos)),
            ExprKind::Identifier(id) => self.identifier(id),
            ExprKind::Apply { head, args } => self.apply(expr, head, args),
            ExprKind::Forall { params, body } => self.quantifier(&self.atoms.forall, params, body),
            ExprKind::Exists { params, body } => self.quantifier(&self.atoms.exists, params, body),
            ExprKind::Let { bindings, body } => {
                let bindings = bindings
                    .iter()
                    .map(|b| Ok(SExpr::list(vec![self.symbol(&b.parameter), self.expr(&b.expr)?])))
                    .collect::<Result<Vec<_>>>()?;
                Ok(SExpr::list(vec![
                    self.atoms.let_.clone(),
                    SExpr::list(bindings),
                    self.expr(body)?,
                ]))
            }
            // annotations such as `:named` have no yices counterpart
            ExprKind::Attributed { expr, .. } => self.expr(expr),
            ExprKind::Error(_) => Err(unexpected("an Error token", expr.pos)),
        }
    }

    pub fn sort(&self, sort: &Sort) -> Result<SExpr> {
        match &sort.kind {
            SortKind::Bool => Ok(self.atoms.bool.clone()),
            SortKind::Family { name, params } if params.is_empty() && !name.is_indexed() => {
                let name = &name.symbol.name;
                Ok(SExpr::atom(self.sorts.get(name).unwrap_or(name)))
            }
            _ => Err(TranslateError::UnsupportedSort {
                sort: sort.to_string(),
                pos: sort.pos,
            }),
        }
    }

    /// The type of a function from `args` to `result`, `(-> args... result)`.
    pub fn function_sort(&self, args: &[Sort], result: &Sort) -> Result<SExpr> {
        let mut items = Vec::with_capacity(args.len() + 2);
        items.push(self.atoms.arrow.clone());
        for arg in args {
            items.push(self.sort(arg)?);
        }
        items.push(self.sort(result)?);
        Ok(SExpr::list(items))
    }

    /// `name::sort` for a sorted variable.
    pub fn declaration(&self, decl: &Declaration) -> Result<SExpr> {
        Ok(SExpr::typed(&decl.parameter.name, self.sort(&decl.sort)?))
    }

    fn identifier(&self, id: &QualifiedIdentifier) -> Result<SExpr> {
        if id.sort.is_some() {
            return Err(unexpected(format!("a qualified identifier `{}`", id), id.pos()));
        }
        if id.id.is_indexed() {
            return Err(unexpected(format!("an indexed identifier `{}`", id), id.pos()));
        }
        Ok(self.symbol(&id.id.symbol))
    }

    fn quantifier(&self, binder: &SExpr, params: &[Declaration], body: &Expr) -> Result<SExpr> {
        let params = params
            .iter()
            .map(|d| self.declaration(d))
            .collect::<Result<Vec<_>>>()?;
        Ok(SExpr::list(vec![
            binder.clone(),
            SExpr::list(params),
            self.expr(body)?,
        ]))
    }

    fn apply(&self, expr: &Expr, head: &QualifiedIdentifier, args: &[Expr]) -> Result<SExpr> {
        if args.is_empty() {
            return Err(unexpected("an empty argument list", expr.pos));
        }
        let op = self.identifier(head)?;
        let name = head.id.symbol.name.as_str();
        let args = args
            .iter()
            .map(|a| self.expr(a))
            .collect::<Result<Vec<_>>>()?;

        match name {
            "or" | "and" => Ok(SExpr::apply(op, args)),

            "=" | "<" | ">" | "<=" | ">=" => {
                if args.len() < 2 {
                    return Err(arity(name, 2, args.len(), expr.pos));
                }
                let pairs = args
                    .windows(2)
                    .map(|w| SExpr::binop(op.clone(), w[0].clone(), w[1].clone()));
                Ok(SExpr::apply(self.atoms.and.clone(), pairs))
            }

            "xor" => {
                let mut iter = args.into_iter();
                let first = iter.next().ok_or_else(|| arity(name, 1, 0, expr.pos))?;
                Ok(iter.fold(first, |acc, a| SExpr::binop(self.atoms.neq.clone(), acc, a)))
            }

            "=>" => {
                let mut iter = args.into_iter().rev();
                let last = iter.next().ok_or_else(|| arity(name, 1, 0, expr.pos))?;
                Ok(iter.fold(last, |acc, a| SExpr::binop(op.clone(), a, acc)))
            }

            "distinct" => match args.len() {
                0 | 1 => Err(arity(name, 2, args.len(), expr.pos)),
                2 => Ok(SExpr::apply(self.atoms.neq.clone(), args)),
                _ => {
                    let mut pairs = Vec::with_capacity(args.len() * (args.len() - 1) / 2);
                    for (i, lhs) in args.iter().enumerate() {
                        for rhs in &args[i + 1..] {
                            pairs.push(SExpr::binop(self.atoms.neq.clone(), lhs.clone(), rhs.clone()));
                        }
                    }
                    Ok(SExpr::apply(self.atoms.and.clone(), pairs))
                }
            },

            // yices has no unary minus
            "-" if args.len() == 1 => Ok(SExpr::apply(
                self.atoms.minus.clone(),
                std::iter::once(self.atoms.zero.clone()).chain(args),
            )),

            _ => Ok(SExpr::apply(op, args)),
        }
    }
}

fn unexpected(what: impl Into<String>, pos: Option<crate::ast::Pos>) -> TranslateError {
    TranslateError::Unexpected {
        what: what.into(),
        pos,
    }
}

fn arity(op: &str, min: usize, got: usize, pos: Option<crate::ast::Pos>) -> TranslateError {
    TranslateError::Arity {
        op: op.to_string(),
        min,
        got,
        pos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Binding, Identifier, Pos};

    macro_rules! check_expr {
        ($tr:expr, $expr:expr, $expected:expr) => {
            let actual = $tr.expr(&$expr).unwrap().to_string();
            assert_eq!(actual, $expected);
        };
    }

    fn sym(s: &str) -> Expr {
        Expr::symbol(s)
    }

    fn abc() -> Vec<Expr> {
        vec![sym("a"), sym("b"), sym("c")]
    }

    #[test]
    fn multi_arity_boolean_ops_stay_nary() {
        let tr = Translator::new();
        check_expr!(tr, Expr::apply("or", abc()), "(or a b c)");
        check_expr!(tr, Expr::apply("and", abc()), "(and a b c)");
        check_expr!(tr, Expr::apply("not", [sym("p")]), "(not p)");
    }

    #[test]
    fn chainable_comparisons_expand_to_adjacent_pairs() {
        let tr = Translator::new();
        check_expr!(tr, Expr::apply("<=", abc()), "(and (<= a b) (<= b c))");
        check_expr!(
            tr,
            Expr::apply("=", vec![sym("a"), sym("b"), sym("c"), sym("d")]),
            "(and (= a b) (= b c) (= c d))"
        );
        check_expr!(tr, Expr::apply(">", [sym("x"), Expr::numeral(0)]), "(and (> x 0))");
    }

    #[test]
    fn chainable_comparison_needs_two_arguments() {
        let tr = Translator::new();
        let e = Expr::apply("<", [sym("a")]).at(Pos::new(0, 5));
        let err = tr.expr(&e).unwrap_err();
        assert_eq!(err.pos(), Some(Pos::new(0, 5)));
        assert!(matches!(err, TranslateError::Arity { min: 2, got: 1, .. }));
    }

    #[test]
    fn xor_folds_from_the_left() {
        let tr = Translator::new();
        check_expr!(tr, Expr::apply("xor", abc()), "(/= (/= a b) c)");
        check_expr!(tr, Expr::apply("xor", [sym("a"), sym("b")]), "(/= a b)");
        check_expr!(tr, Expr::apply("xor", [sym("a")]), "a");
    }

    #[test]
    fn implication_folds_from_the_right() {
        let tr = Translator::new();
        check_expr!(tr, Expr::apply("=>", abc()), "(=> a (=> b c))");
        check_expr!(tr, Expr::apply("=>", [sym("a")]), "a");
    }

    #[test]
    fn distinct_expands_to_all_pairs() {
        let tr = Translator::new();
        check_expr!(tr, Expr::apply("distinct", [sym("a"), sym("b")]), "(/= a b)");

        let out = tr.expr(&Expr::apply("distinct", abc())).unwrap().to_string();
        assert_eq!(out, "(and (/= a b) (/= a c) (/= b c))");
        assert_eq!(out.matches("(/=").count(), 3);

        let four = Expr::apply("distinct", vec![sym("a"), sym("b"), sym("c"), sym("d")]);
        assert_eq!(tr.expr(&four).unwrap().to_string().matches("(/=").count(), 6);
    }

    #[test]
    fn unary_minus_subtracts_from_zero() {
        let tr = Translator::new();
        let neg = tr.expr(&Expr::apply("-", [sym("a")])).unwrap();
        let sub = tr
            .expr(&Expr::apply("-", [Expr::numeral(0), sym("a")]))
            .unwrap();
        assert_eq!(neg, sub);
        assert_eq!(neg.to_string(), "(- 0 a)");
        check_expr!(tr, Expr::apply("-", [sym("a"), sym("b")]), "(- a b)");
    }

    #[test]
    fn other_applications_are_generic() {
        let tr = Translator::new();
        check_expr!(
            tr,
            Expr::apply("+", [sym("x"), Expr::apply("f", [sym("y")]), Expr::numeral(3)]),
            "(+ x (f y) 3)"
        );
    }

    #[test]
    fn empty_application_is_rejected() {
        let tr = Translator::new();
        let err = tr.expr(&Expr::apply("f", Vec::new())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Did not expect an empty argument list in an expression to be translated"
        );
    }

    #[test]
    fn unsupported_literals_carry_their_position() {
        let tr = Translator::new();
        let dec = Expr::decimal("1.5").at(Pos::new(10, 13));
        let err = tr.expr(&Expr::apply("<", [sym("x"), dec])).unwrap_err();
        assert_eq!(err.pos(), Some(Pos::new(10, 13)));
        assert_eq!(err.to_string(), "The yices solver cannot handle decimal literals");

        let err = tr.expr(&Expr::string("hi")).unwrap_err();
        assert!(matches!(err, TranslateError::UnsupportedLiteral { kind: "string", .. }));

        let err = tr.expr(&Expr::new(ExprKind::Hex("#xff".into()))).unwrap_err();
        assert!(err.to_string().contains("Hex literal"));
    }

    #[test]
    fn error_nodes_fail_translation() {
        let tr = Translator::new();
        let bad = Expr::new(ExprKind::Error("(".into())).at(Pos::new(4, 5));
        let err = tr.expr(&Expr::apply("and", [sym("p"), bad])).unwrap_err();
        assert_eq!(err.pos(), Some(Pos::new(4, 5)));
    }

    #[test]
    fn quantifiers_keep_binder_order() {
        let tr = Translator::new();
        let params = vec![
            Declaration {
                parameter: Symbol::new("x"),
                sort: Sort::named("Int"),
            },
            Declaration {
                parameter: Symbol::new("x"),
                sort: Sort::bool(),
            },
        ];
        check_expr!(
            tr,
            Expr::forall(params.clone(), Expr::apply("g", [sym("x")])),
            "(forall (x::int x::bool) (g x))"
        );
        check_expr!(tr, Expr::exists(params, sym("x")), "(exists (x::int x::bool) x)");
    }

    #[test]
    fn let_bindings_render_in_order() {
        let tr = Translator::new();
        let e = Expr::let_(
            vec![
                Binding {
                    parameter: Symbol::new("a"),
                    expr: Expr::apply("f", [sym("x")]),
                },
                Binding {
                    parameter: Symbol::new("b"),
                    expr: Expr::numeral(2),
                },
            ],
            Expr::apply("+", [sym("a"), sym("b")]),
        );
        check_expr!(tr, e, "(let ((a (f x)) (b 2)) (+ a b))");
    }

    #[test]
    fn attributes_are_dropped() {
        let tr = Translator::new();
        check_expr!(tr, Expr::apply(">", [sym("x"), sym("y")]).named("a1"), "(and (> x y))");
    }

    #[test]
    fn qualified_and_indexed_identifiers_are_rejected() {
        let tr = Translator::new();
        let indexed = Expr::new(ExprKind::Identifier(QualifiedIdentifier {
            id: Identifier {
                symbol: Symbol::new("bv5"),
                indices: vec!["32".into()],
            },
            sort: None,
        }));
        assert!(tr.expr(&indexed).unwrap_err().to_string().contains("(_ bv5 32)"));

        let qualified = Expr::new(ExprKind::Identifier(QualifiedIdentifier {
            id: Symbol::new("nil").into(),
            sort: Some(Sort::named("List")),
        }));
        assert!(tr.expr(&qualified).is_err());
    }

    #[test]
    fn sorts() {
        let tr = Translator::new();
        assert_eq!(tr.sort(&Sort::bool()).unwrap().to_string(), "bool");
        assert_eq!(tr.sort(&Sort::named("Int")).unwrap().to_string(), "int");
        assert_eq!(tr.sort(&Sort::named("Real")).unwrap().to_string(), "real");
        assert_eq!(tr.sort(&Sort::named("U")).unwrap().to_string(), "U");

        let array = Sort::family("Array", vec![Sort::named("Int"), Sort::named("Int")]).at(Pos::new(1, 2));
        let err = tr.sort(&array).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported sort: (Array Int Int)");
        assert_eq!(err.pos(), Some(Pos::new(1, 2)));

        let param = Sort::new(SortKind::Parameter(Symbol::new("X")));
        assert!(tr.sort(&param).is_err());
    }

    #[test]
    fn sort_table_can_be_extended() {
        let tr = Translator::new().with_sort("Nat", "nat");
        assert_eq!(tr.sort(&Sort::named("Nat")).unwrap().to_string(), "nat");
    }

    #[test]
    fn function_sorts() {
        let tr = Translator::new();
        let s = tr
            .function_sort(&[Sort::named("Int"), Sort::bool()], &Sort::named("Int"))
            .unwrap();
        assert_eq!(s.to_string(), "(-> int bool int)");
    }
}
