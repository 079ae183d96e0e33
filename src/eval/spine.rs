//! The application-spine view: a left-nested application
//! `((h a₁) a₂) … aₖ` seen as a head and its argument list. The rewrite
//! rules in [`crate::eval::builtin`] pattern-match this shape with slice
//! patterns over the argument vector.

use crate::syntax::Expr;

/// Unfold left-nested applications into the non-`App` head and its
/// arguments, in application order.
pub fn view(mut e: Expr) -> (Expr, Vec<Expr>) {
    let mut args = Vec::new();
    while let Expr::App(f, a) = e {
        args.push(*a);
        e = *f;
    }
    args.reverse();
    (e, args)
}

/// Rebuild the left-nested applications of a spine.
pub fn review(head: Expr, args: Vec<Expr>) -> Expr {
    args.into_iter().fold(head, Expr::app)
}
