//! The four variable algorithms. All of them share the binder-aware child
//! traversal of [`Expr::map_children`] / [`Expr::any_child`]: at each node
//! the searched-for variable is adjusted when the walk passes under a binder
//! of the same name.

use crate::maybe_grow;
use crate::syntax::{Expr, Var, UNDERSCORE};

/// Bump the variable's index when entering a binder of the same name.
fn under(v: &Var, binder: Option<&str>) -> Var {
    match binder {
        Some(b) if b == v.name => Var::new(v.name.clone(), v.index + 1),
        _ => v.clone(),
    }
}

/// Add `delta` to the index of every free occurrence of `var`'s name whose
/// index is at least `var.index`.
pub fn shift(delta: i64, var: &Var, e: Expr) -> Expr {
    maybe_grow(|| match e {
        Expr::Var(w) if w.name == var.name && w.index >= var.index => {
            Expr::Var(Var::new(w.name, (w.index as i64 + delta).max(0) as usize))
        }
        e => e.map_children(&mut |c, binder| shift(delta, &under(var, binder), c)),
    })
}

/// Replace every occurrence of `var` in `e` by `value`, shifting `value`
/// when the walk passes under a binder so nothing gets captured.
pub fn subst(var: &Var, value: &Expr, e: Expr) -> Expr {
    maybe_grow(|| match e {
        Expr::Var(w) if w == *var => value.clone(),
        e => e.map_children(&mut |c, binder| match binder {
            None => subst(var, value, c),
            Some(b) => {
                let value = shift(1, &Var::new(b, 0), value.clone());
                subst(&under(var, binder), &value, c)
            }
        }),
    })
}

/// The substitution used when a binder is eliminated:
/// `shift(-1, v, subst(v, shift(+1, v, value), body))`.
pub fn shift_subst_shift(var: &Var, value: &Expr, body: Expr) -> Expr {
    let value = shift(1, var, value.clone());
    shift(-1, var, subst(var, &value, body))
}

pub fn rename(from: &Var, to: &Var, e: Expr) -> Expr {
    if from == to {
        return e;
    }
    shift(-1, from, subst(from, &Expr::Var(to.clone()), shift(1, to, e)))
}

/// Rename every bound variable to `_`, bottom-up.
pub fn alpha_normalize(e: Expr) -> Expr {
    use Expr::*;
    maybe_grow(|| match e {
        Lam(x, t, b) => {
            let t = Box::new(alpha_normalize(*t));
            let b = Box::new(alpha_body(&x, *b));
            Lam(UNDERSCORE.into(), t, b)
        }
        Pi(x, t, b) => {
            let t = Box::new(alpha_normalize(*t));
            let b = Box::new(alpha_body(&x, *b));
            Pi(UNDERSCORE.into(), t, b)
        }
        Let(x, t, v, b) => {
            let t = t.map(|t| Box::new(alpha_normalize(*t)));
            let v = Box::new(alpha_normalize(*v));
            let b = Box::new(alpha_body(&x, *b));
            Let(UNDERSCORE.into(), t, v, b)
        }
        e => e.map_children(&mut |c, _| alpha_normalize(c)),
    })
}

fn alpha_body(x: &str, b: Expr) -> Expr {
    if x == UNDERSCORE {
        alpha_normalize(b)
    } else {
        alpha_normalize(rename(&Var::new(x, 0), &Var::new(UNDERSCORE, 0), b))
    }
}

/// True iff some occurrence of `var` in `e` is not shadowed.
pub fn free_in(var: &Var, e: &Expr) -> bool {
    maybe_grow(|| match e {
        Expr::Var(w) => w == var,
        e => e.any_child(&mut |c, binder| free_in(&under(var, binder), c)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::expr::Builtin;

    fn lam(x: &str, b: Expr) -> Expr {
        Expr::Lam(x.into(), Box::new(Expr::Builtin(Builtin::Natural)), Box::new(b))
    }

    fn v(name: &str, index: usize) -> Expr {
        Expr::Var(Var::new(name, index))
    }

    #[test]
    fn shift_by_zero_is_identity() {
        let e = lam("x", Expr::app(v("f", 0), v("x", 0)));
        assert_eq!(shift(0, &Var::new("f", 0), e.clone()), e);
    }

    #[test]
    fn shift_composes() {
        let e = lam("x", Expr::app(v("f", 1), v("x", 0)));
        let var = Var::new("f", 0);
        let twice = shift(1, &var, shift(2, &var, e.clone()));
        assert_eq!(twice, shift(3, &var, e));
    }

    #[test]
    fn shift_respects_cutoff() {
        // the bound `x` is untouched, the free `x@1` moves
        let e = lam("x", Expr::app(v("x", 0), v("x", 1)));
        let shifted = shift(1, &Var::new("x", 0), e);
        assert_eq!(shifted, lam("x", Expr::app(v("x", 0), v("x", 2))));
    }

    #[test]
    fn subst_avoids_capture() {
        // (λ(y : Natural) → x)[x := y]  must not capture the bound y
        let e = lam("y", v("x", 0));
        let out = subst(&Var::new("x", 0), &v("y", 0), e);
        assert_eq!(out, lam("y", v("y", 1)));
    }

    #[test]
    fn subst_hits_only_matching_index() {
        let e = Expr::app(v("x", 0), v("x", 1));
        let out = subst(&Var::new("x", 1), &Expr::natural(7), e);
        assert_eq!(out, Expr::app(v("x", 0), Expr::natural(7)));
    }

    #[test]
    fn alpha_renames_binders_only() {
        let e = lam("x", Expr::app(v("x", 0), v("free", 0)));
        let out = alpha_normalize(e);
        assert_eq!(out, lam("_", Expr::app(v("_", 0), v("free", 0))));
    }

    #[test]
    fn alpha_is_idempotent() {
        let e = lam("x", lam("y", Expr::app(v("x", 0), v("y", 0))));
        let once = alpha_normalize(e);
        assert_eq!(alpha_normalize(once.clone()), once);
    }

    #[test]
    fn alpha_keeps_free_variables() {
        // Seen from outside, the free variable is `x@1` both before and
        // after: the renamed binder no longer shadows the `x` namespace.
        let e = lam("x", v("x", 2));
        assert_eq!(alpha_normalize(e), lam("_", v("x", 1)));
    }

    #[test]
    fn free_in_sees_through_other_binders() {
        let e = lam("y", v("x", 0));
        assert!(free_in(&Var::new("x", 0), &e));
        assert!(!free_in(&Var::new("y", 0), &e));
    }

    #[test]
    fn free_in_shadowed() {
        let e = lam("x", v("x", 0));
        assert!(!free_in(&Var::new("x", 0), &e));
        let deeper = lam("x", v("x", 1));
        assert!(free_in(&Var::new("x", 0), &deeper));
    }

    #[test]
    fn rename_same_var_is_identity() {
        let e = v("x", 0);
        assert_eq!(rename(&Var::new("x", 0), &Var::new("x", 0), e.clone()), e);
    }

    #[test]
    fn rename_rewrites_free_occurrences() {
        let e = Expr::app(v("x", 0), v("y", 0));
        let out = rename(&Var::new("x", 0), &Var::new("z", 0), e);
        assert_eq!(out, Expr::app(v("z", 0), v("y", 0)));
    }
}
