//! Rewrite rules over application spines. A rule matches the head and a
//! prefix of the argument list; whatever arguments remain are re-applied to
//! the result. The engine re-normalises every replacement, so rules are free
//! to return reducible terms.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::eval::vars::shift;
use crate::syntax::expr::{BinOp, Builtin};
use crate::syntax::{Expr, FieldMap, Var};

pub fn rewrite(head: &Expr, args: &[Expr]) -> Option<Expr> {
    use Builtin::*;
    let b = match head {
        Expr::Builtin(b) => *b,
        _ => return Option::None,
    };
    match (b, args) {
        (NaturalBuild, [g, rest @ ..]) => {
            // Natural/build (Natural/fold e) fuses to e
            if let Some(e) = fold_spine_1(g, NaturalFold) {
                return Some(respine(e.clone(), rest));
            }
            // Natural/build g → g Natural (λ(x : Natural) → x + 1) 0
            let succ = Expr::Lam(
                "x".into(),
                Box::new(Expr::Builtin(Natural)),
                Box::new(Expr::BinOp(
                    BinOp::NaturalPlus,
                    Box::new(Expr::var("x")),
                    Box::new(Expr::natural(1)),
                )),
            );
            let e = Expr::app(
                Expr::app(Expr::app(g.clone(), Expr::Builtin(Natural)), succ),
                Expr::natural(0),
            );
            Some(respine(e, rest))
        }
        (NaturalFold, [Expr::NaturalLit(n), _, s, z, rest @ ..]) => {
            let mut e = z.clone();
            let mut i = BigUint::zero();
            while i < *n {
                e = Expr::app(s.clone(), e);
                i += 1u32;
            }
            Some(respine(e, rest))
        }
        (NaturalIsZero, [Expr::NaturalLit(n), rest @ ..]) => {
            Some(respine(Expr::BoolLit(n.is_zero()), rest))
        }
        (NaturalEven, [Expr::NaturalLit(n), rest @ ..]) => {
            Some(respine(Expr::BoolLit((n % 2u32).is_zero()), rest))
        }
        (NaturalOdd, [Expr::NaturalLit(n), rest @ ..]) => {
            Some(respine(Expr::BoolLit(!(n % 2u32).is_zero()), rest))
        }
        (NaturalToInteger, [Expr::NaturalLit(n), rest @ ..]) => {
            Some(respine(Expr::IntegerLit(BigInt::from(n.clone())), rest))
        }
        (NaturalShow, [Expr::NaturalLit(n), rest @ ..]) => {
            Some(respine(Expr::text(n.to_string()), rest))
        }
        (IntegerShow, [Expr::IntegerLit(z), rest @ ..]) => {
            let s = if z.sign() == Sign::Minus {
                z.to_string()
            } else {
                format!("+{z}")
            };
            Some(respine(Expr::text(s), rest))
        }
        (IntegerToDouble, [Expr::IntegerLit(z), rest @ ..]) => {
            let d = z.to_f64().unwrap_or(f64::NAN);
            Some(respine(Expr::DoubleLit(d.into()), rest))
        }
        (DoubleShow, [Expr::DoubleLit(d), rest @ ..]) => {
            Some(respine(Expr::text(d.to_string()), rest))
        }
        (OptionalBuild, [t, g, rest @ ..]) => {
            // Optional/build _ (Optional/fold _ e) fuses to e
            if let Some(e) = fold_spine_2(g, OptionalFold) {
                return Some(respine(e.clone(), rest));
            }
            // Optional/build τ g → g (Optional τ) (λ(a : τ) → Some a) (None τ)
            let just = Expr::Lam(
                "a".into(),
                Box::new(t.clone()),
                Box::new(Expr::SomeLit(Box::new(Expr::var("a")))),
            );
            let nothing = Expr::app(Expr::Builtin(None), t.clone());
            let e = Expr::app(
                Expr::app(
                    Expr::app(g.clone(), Expr::app(Expr::Builtin(Optional), t.clone())),
                    just,
                ),
                nothing,
            );
            Some(respine(e, rest))
        }
        (OptionalFold, [_, opt, _, just, nothing, rest @ ..]) => match opt {
            Expr::SomeLit(x) => Some(respine(Expr::app(just.clone(), (**x).clone()), rest)),
            Expr::App(f, _) if matches!(&**f, Expr::Builtin(None)) => {
                Some(respine(nothing.clone(), rest))
            }
            _ => Option::None,
        },
        (ListBuild, [t, g, rest @ ..]) => {
            // List/build _ (List/fold _ e) fuses to e
            if let Some(e) = fold_spine_2(g, ListFold) {
                return Some(respine(e.clone(), rest));
            }
            // List/build τ g → g (List τ) cons ([] : List τ) where
            // cons = λ(a : τ) → λ(as : List τ₊) → [a] # as
            let shifted = shift(1, &Var::new("a", 0), t.clone());
            let cons = Expr::Lam(
                "a".into(),
                Box::new(t.clone()),
                Box::new(Expr::Lam(
                    "as".into(),
                    Box::new(Expr::app(Expr::Builtin(List), shifted)),
                    Box::new(Expr::BinOp(
                        BinOp::ListAppend,
                        Box::new(Expr::ListLit(Option::None, vec![Expr::var("a")])),
                        Box::new(Expr::var("as")),
                    )),
                )),
            );
            let nil = Expr::ListLit(Some(Box::new(t.clone())), Vec::new());
            let e = Expr::app(
                Expr::app(
                    Expr::app(g.clone(), Expr::app(Expr::Builtin(List), t.clone())),
                    cons,
                ),
                nil,
            );
            Some(respine(e, rest))
        }
        (ListFold, [_, Expr::ListLit(_, xs), _, cons, nil, rest @ ..]) => {
            let e = xs.iter().rev().fold(nil.clone(), |acc, x| {
                Expr::app(Expr::app(cons.clone(), x.clone()), acc)
            });
            Some(respine(e, rest))
        }
        (ListLength, [_, Expr::ListLit(_, xs), rest @ ..]) => {
            Some(respine(Expr::NaturalLit(BigUint::from(xs.len())), rest))
        }
        (ListHead, [t, Expr::ListLit(_, xs), rest @ ..]) => {
            let e = match xs.first() {
                Some(x) => Expr::SomeLit(Box::new(x.clone())),
                Option::None => Expr::app(Expr::Builtin(None), t.clone()),
            };
            Some(respine(e, rest))
        }
        (ListLast, [t, Expr::ListLit(_, xs), rest @ ..]) => {
            let e = match xs.last() {
                Some(x) => Expr::SomeLit(Box::new(x.clone())),
                Option::None => Expr::app(Expr::Builtin(None), t.clone()),
            };
            Some(respine(e, rest))
        }
        (ListIndexed, [t, Expr::ListLit(_, xs), rest @ ..]) => {
            let entries: Vec<Expr> = xs
                .iter()
                .enumerate()
                .map(|(i, x)| {
                    let mut kvs = FieldMap::new();
                    kvs.insert("index".to_string(), Expr::NaturalLit(BigUint::from(i)));
                    kvs.insert("value".to_string(), x.clone());
                    Expr::RecordLit(kvs)
                })
                .collect();
            let e = if entries.is_empty() {
                let mut kts = FieldMap::new();
                kts.insert("index".to_string(), Expr::Builtin(Natural));
                kts.insert("value".to_string(), t.clone());
                Expr::ListLit(Some(Box::new(Expr::Record(kts))), Vec::new())
            } else {
                Expr::ListLit(Option::None, entries)
            };
            Some(respine(e, rest))
        }
        (ListReverse, [_, Expr::ListLit(t, xs), rest @ ..]) => {
            let mut xs = xs.clone();
            xs.reverse();
            Some(respine(Expr::ListLit(t.clone(), xs), rest))
        }
        _ => Option::None,
    }
}

/// Matches `fold e` against the spine of `g`, for `Natural/fold`.
fn fold_spine_1(g: &Expr, fold: Builtin) -> Option<&Expr> {
    match g {
        Expr::App(f, e) if matches!(&**f, Expr::Builtin(b) if *b == fold) => Some(e.as_ref()),
        _ => Option::None,
    }
}

/// Matches `fold τ e` against the spine of `g`, ignoring the type argument.
fn fold_spine_2(g: &Expr, fold: Builtin) -> Option<&Expr> {
    match g {
        Expr::App(f, e) => match &**f {
            Expr::App(f0, _) if matches!(&**f0, Expr::Builtin(b) if *b == fold) => {
                Some(e.as_ref())
            }
            _ => Option::None,
        },
        _ => Option::None,
    }
}

fn respine(head: Expr, rest: &[Expr]) -> Expr {
    rest.iter().cloned().fold(head, Expr::app)
}
