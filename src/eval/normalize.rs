//! The bottom-up rewriter. Children normalise first; the node rule then
//! either produces a specific replacement (marking the result changed and
//! re-normalising it) or rebuilds the node by congruence, changed only if a
//! child changed. `is_normalized` is "no rewrite anywhere reported a change".

use num_traits::{One, Zero};

use crate::eval::vars::{alpha_normalize, free_in, shift, shift_subst_shift};
use crate::eval::{builtin, spine};
use crate::maybe_grow;
use crate::syntax::expr::{BinOp, Builtin, Chunks};
use crate::syntax::{Expr, FieldMap};

/// A user rewrite consulted on application spines before the built-in
/// rules; the first rule returning `Some` wins and its replacement is
/// re-normalised.
///
/// The hook may observe sub-terms that are not yet in normal form when they
/// were substituted for `let`- or λ-bound variables: substitution happens
/// first, normalisation afterwards.
pub type Hook = dyn Fn(&Expr, &[Expr]) -> Option<Expr>;

pub struct Normalizer<'a> {
    hook: Option<&'a Hook>,
}

struct Out {
    expr: Expr,
    changed: bool,
}

fn kept(expr: Expr, changed: bool) -> Out {
    Out { expr, changed }
}

fn done(expr: Expr) -> Out {
    Out {
        expr,
        changed: true,
    }
}

fn alpha_eq(a: &Expr, b: &Expr) -> bool {
    alpha_normalize(a.clone()) == alpha_normalize(b.clone())
}

impl<'a> Normalizer<'a> {
    pub fn new(hook: Option<&'a Hook>) -> Self {
        Self { hook }
    }

    pub fn normalize(&self, e: Expr) -> Expr {
        self.term(e).expr
    }

    pub fn is_normalized(&self, e: &Expr) -> bool {
        !self.term(e.clone()).changed
    }

    fn term(&self, e: Expr) -> Out {
        maybe_grow(|| self.term_impl(e))
    }

    /// A rule fired: re-normalise the replacement so it reaches its own
    /// normal form, and mark the node changed.
    fn simpler(&self, e: Expr) -> Out {
        done(self.term(e).expr)
    }

    fn term_impl(&self, e: Expr) -> Out {
        use Expr::*;

        // Annotations vanish and `let` inlines before children normalise;
        // the substituted value is normalised in place afterwards.
        let e = match e {
            Annot(x, _) => return self.simpler(*x),
            Let(x, _, v, b) => {
                return self.simpler(shift_subst_shift(&crate::syntax::Var::new(x, 0), &v, *b))
            }
            e => e,
        };

        let mut changed = false;
        let e = e.map_children(&mut |c, _| {
            let o = self.term(c);
            changed |= o.changed;
            o.expr
        });

        match e {
            BinOp(op, l, r) => self.bin_op(op, *l, *r, changed),
            BoolIf(c, t, f) => match (*c, *t, *f) {
                (BoolLit(true), t, _) => done(t),
                (BoolLit(false), _, f) => done(f),
                (c, BoolLit(true), BoolLit(false)) => done(c),
                (c, t, f) if alpha_eq(&t, &f) => done(t),
                (c, t, f) => kept(BoolIf(Box::new(c), Box::new(t), Box::new(f)), changed),
            },
            TextLit(chunks) => self.text_lit(chunks, changed),
            ListLit(t, xs) if t.is_some() && !xs.is_empty() => done(ListLit(None, xs)),
            OptionalLit(t, x) => match x {
                Some(x) => done(SomeLit(x)),
                None => done(App(Box::new(Builtin(self::Builtin::None)), t)),
            },
            Merge(h, u, t) => {
                if let (Some(hs), Some((k, v, _))) = (h.as_record_lit(), u.as_union_lit()) {
                    if let Some(handler) = hs.get(k) {
                        return self.simpler(Expr::app(handler.clone(), v.clone()));
                    }
                }
                kept(Merge(h, u, t), changed)
            }
            Constructors(u) => {
                if let Union(kts) = &*u {
                    return self.simpler(RecordLit(constructor_fields(kts)));
                }
                kept(Constructors(u), changed)
            }
            Field(r, k) => match &*r {
                RecordLit(kvs) => match kvs.get(&k) {
                    Some(v) => self.simpler(v.clone()),
                    None => kept(Field(r, k), changed),
                },
                Union(kts) => match kts.get(&k) {
                    Some(t) => self.simpler(constructor(&k, t, kts)),
                    None => kept(Field(r, k), changed),
                },
                _ => kept(Field(r, k), changed),
            },
            Project(r, ks) => {
                if let RecordLit(kvs) = &*r {
                    if ks.iter().all(|k| kvs.contains_key(k)) {
                        let mut m = FieldMap::new();
                        for k in &ks {
                            if let Some(v) = kvs.get(k) {
                                m.insert(k.clone(), v.clone());
                            }
                        }
                        return self.simpler(RecordLit(m));
                    }
                }
                kept(Project(r, ks), changed)
            }
            Lam(x, t, b) => {
                // η: λ(x : τ) → f x  reduces to f when x is not free in f
                if let App(f, a) = &*b {
                    let vx = crate::syntax::Var::new(x.as_str(), 0);
                    if matches!(&**a, Var(w) if *w == vx) && !free_in(&vx, f) {
                        return done(shift(-1, &vx, (**f).clone()));
                    }
                }
                kept(Lam(x, t, b), changed)
            }
            App(f, a) => match *f {
                Lam(x, _, b) => {
                    self.simpler(shift_subst_shift(&crate::syntax::Var::new(x, 0), &a, *b))
                }
                f => {
                    let (head, args) = spine::view(Expr::app(f, *a));
                    let user = self.hook.and_then(|h| h(&head, &args));
                    match user.or_else(|| builtin::rewrite(&head, &args)) {
                        Some(e) => self.simpler(e),
                        None => kept(spine::review(head, args), changed),
                    }
                }
            },
            e => kept(e, changed),
        }
    }

    fn bin_op(&self, op: BinOp, l: Expr, r: Expr, changed: bool) -> Out {
        use crate::syntax::expr::BinOp::*;
        use Expr::*;
        match (op, l, r) {
            (BoolAnd, BoolLit(true), r) => done(r),
            (BoolAnd, BoolLit(false), _) => done(BoolLit(false)),
            (BoolAnd, l, BoolLit(true)) => done(l),
            (BoolAnd, _, BoolLit(false)) => done(BoolLit(false)),
            (BoolAnd, l, r) if alpha_eq(&l, &r) => done(l),

            (BoolOr, BoolLit(false), r) => done(r),
            (BoolOr, BoolLit(true), _) => done(BoolLit(true)),
            (BoolOr, l, BoolLit(false)) => done(l),
            (BoolOr, _, BoolLit(true)) => done(BoolLit(true)),
            (BoolOr, l, r) if alpha_eq(&l, &r) => done(l),

            (BoolEQ, BoolLit(a), BoolLit(b)) => done(BoolLit(a == b)),
            (BoolEQ, BoolLit(true), r) => done(r),
            (BoolEQ, l, BoolLit(true)) => done(l),
            (BoolEQ, l, r) if alpha_eq(&l, &r) => done(BoolLit(true)),

            (BoolNE, BoolLit(a), BoolLit(b)) => done(BoolLit(a != b)),
            (BoolNE, BoolLit(false), r) => done(r),
            (BoolNE, l, BoolLit(false)) => done(l),
            (BoolNE, l, r) if alpha_eq(&l, &r) => done(BoolLit(false)),

            (NaturalPlus, NaturalLit(a), NaturalLit(b)) => done(NaturalLit(a + b)),
            (NaturalPlus, NaturalLit(a), r) if a.is_zero() => done(r),
            (NaturalPlus, l, NaturalLit(b)) if b.is_zero() => done(l),

            (NaturalTimes, NaturalLit(a), NaturalLit(b)) => done(NaturalLit(a * b)),
            (NaturalTimes, NaturalLit(a), _) if a.is_zero() => done(NaturalLit(a)),
            (NaturalTimes, _, NaturalLit(b)) if b.is_zero() => done(NaturalLit(b)),
            (NaturalTimes, NaturalLit(a), r) if a.is_one() => done(r),
            (NaturalTimes, l, NaturalLit(b)) if b.is_one() => done(l),

            (TextAppend, TextLit(a), r) if a.is_empty() => done(r),
            (TextAppend, l, TextLit(b)) if b.is_empty() => done(l),
            (TextAppend, TextLit(a), TextLit(b)) => self.simpler(TextLit(a.append(b))),

            (ListAppend, ListLit(_, xs), r) if xs.is_empty() => done(r),
            (ListAppend, l, ListLit(_, ys)) if ys.is_empty() => done(l),
            (ListAppend, ListLit(_, mut xs), ListLit(_, ys)) => {
                xs.extend(ys);
                done(ListLit(None, xs))
            }

            (Combine, RecordLit(a), r) if a.is_empty() => done(r),
            (Combine, l, RecordLit(b)) if b.is_empty() => done(l),
            (Combine, RecordLit(a), RecordLit(b)) => {
                self.simpler(RecordLit(merge_maps(a, b, Combine)))
            }

            (CombineTypes, Record(a), r) if a.is_empty() => done(r),
            (CombineTypes, l, Record(b)) if b.is_empty() => done(l),
            (CombineTypes, Record(a), Record(b)) => {
                self.simpler(Record(merge_maps(a, b, CombineTypes)))
            }

            (Prefer, RecordLit(a), r) if a.is_empty() => done(r),
            (Prefer, l, RecordLit(b)) if b.is_empty() => done(l),
            (Prefer, RecordLit(a), RecordLit(mut b)) => {
                let mut m = FieldMap::new();
                for (k, av) in a {
                    match b.remove(&k) {
                        Some(bv) => m.insert(k, bv),
                        None => m.insert(k, av),
                    };
                }
                for (k, bv) in b {
                    m.insert(k, bv);
                }
                done(RecordLit(m))
            }

            (op, l, r) => kept(Expr::BinOp(op, Box::new(l), Box::new(r)), changed),
        }
    }

    /// Splice interpolated text literals into the outer chunk sequence, then
    /// collapse a bare single interpolation.
    fn text_lit(&self, chunks: Chunks, child_changed: bool) -> Out {
        let mut out = Chunks {
            head: chunks.head,
            tail: Vec::new(),
        };
        let mut changed = child_changed;
        for (e, s) in chunks.tail {
            match e {
                Expr::TextLit(inner) => {
                    changed = true;
                    out.push_text(&inner.head);
                    for (ie, is) in inner.tail {
                        out.push(ie, is);
                    }
                    out.push_text(&s);
                }
                e => out.push(e, s),
            }
        }
        if out.head.is_empty() && out.tail.len() == 1 && out.tail[0].1.is_empty() {
            let (e, _) = out.tail.remove(0);
            return done(e);
        }
        kept(Expr::TextLit(out), changed)
    }
}

/// Deterministic by-key merge: the left operand's keys in their original
/// order, then the right-only keys. Overlapping keys recurse through `op`.
fn merge_maps(a: FieldMap, mut b: FieldMap, op: BinOp) -> FieldMap {
    let mut out = FieldMap::new();
    for (k, av) in a {
        match b.remove(&k) {
            Some(bv) => out.insert(k, Expr::BinOp(op, Box::new(av), Box::new(bv))),
            None => out.insert(k, av),
        };
    }
    for (k, bv) in b {
        out.insert(k, bv);
    }
    out
}

/// The constructor function for alternative `k` of type `t`:
/// `λ(k : t) → < k = k | rest… >`.
fn constructor(k: &str, t: &Expr, kts: &FieldMap) -> Expr {
    let mut rest = kts.clone();
    rest.remove(k);
    Expr::Lam(
        k.into(),
        Box::new(t.clone()),
        Box::new(Expr::UnionLit(k.into(), Box::new(Expr::var(k)), rest)),
    )
}

fn constructor_fields(kts: &FieldMap) -> FieldMap {
    let mut m = FieldMap::new();
    for (k, t) in kts.iter() {
        m.insert(k.clone(), constructor(k, t, kts));
    }
    m
}
