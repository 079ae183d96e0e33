mod builtin;
mod normalize;
pub mod spine;
pub mod vars;

pub use normalize::{Hook, Normalizer};
pub use vars::{alpha_normalize, free_in, rename, shift, shift_subst_shift, subst};

use crate::syntax::Expr;

/// Reduce an expression to normal form. Total: ill-typed sub-terms are left
/// as they are, unresolved imports pass through untouched.
pub fn normalize(e: Expr) -> Expr {
    Normalizer::new(None).normalize(e)
}

/// Like [`normalize`], with a user rewrite consulted on application spines
/// before the built-in rules.
pub fn normalize_with(hook: &Hook, e: Expr) -> Expr {
    Normalizer::new(Some(hook)).normalize(e)
}

/// True iff [`normalize`] would report no change anywhere in the tree.
pub fn is_normalized(e: &Expr) -> bool {
    Normalizer::new(None).is_normalized(e)
}

pub fn is_normalized_with(hook: &Hook, e: &Expr) -> bool {
    Normalizer::new(Some(hook)).is_normalized(e)
}

/// Judgmental equality: α- and β-equivalence combined.
pub fn judgmentally_equal(a: &Expr, b: &Expr) -> bool {
    alpha_normalize(normalize(a.clone())) == alpha_normalize(normalize(b.clone()))
}
