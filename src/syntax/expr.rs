use num_bigint::{BigInt, BigUint};

use crate::syntax::{Binary64, FieldMap, Label, Var};

/// Universe constants.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Const {
    Type,
    Kind,
    Sort,
}

/// The nullary built-in identifiers. `None` lives here because it only
/// becomes an optional value once applied to its element type.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Builtin {
    Bool,
    Natural,
    Integer,
    Double,
    Text,
    List,
    Optional,
    None,
    NaturalFold,
    NaturalBuild,
    NaturalIsZero,
    NaturalEven,
    NaturalOdd,
    NaturalToInteger,
    NaturalShow,
    IntegerShow,
    IntegerToDouble,
    DoubleShow,
    ListBuild,
    ListFold,
    ListLength,
    ListHead,
    ListLast,
    ListIndexed,
    ListReverse,
    OptionalBuild,
    OptionalFold,
}

/// Binary operators, loosest (`ImportAlt`) to tightest (`NaturalTimes`).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BinOp {
    ImportAlt,
    BoolOr,
    NaturalPlus,
    TextAppend,
    ListAppend,
    CombineTypes,
    Prefer,
    Combine,
    BoolAnd,
    BoolNE,
    BoolEQ,
    NaturalTimes,
}

/// A text literal: a leading string chunk followed by alternating
/// interpolations and string chunks, `s₀ e₁ s₁ … eₙ sₙ`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chunks {
    pub head: String,
    pub tail: Vec<(Expr, String)>,
}

impl Chunks {
    pub fn from_text<S: Into<String>>(s: S) -> Self {
        Chunks {
            head: s.into(),
            tail: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.tail.is_empty()
    }

    /// Concatenate two chunk sequences, joining the seam strings.
    pub fn append(mut self, other: Chunks) -> Chunks {
        match self.tail.last_mut() {
            Option::None => self.head.push_str(&other.head),
            Option::Some((_, s)) => s.push_str(&other.head),
        }
        self.tail.extend(other.tail);
        self
    }

    /// Push one interpolation followed by a literal chunk.
    pub fn push(&mut self, e: Expr, s: String) {
        self.tail.push((e, s));
    }

    /// Append literal text to the trailing chunk.
    pub fn push_text(&mut self, s: &str) {
        match self.tail.last_mut() {
            Option::None => self.head.push_str(s),
            Option::Some((_, t)) => t.push_str(s),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FilePrefix {
    /// `./`
    Here,
    /// `../`
    Parent,
    /// `~/`
    Home,
    /// `/`
    Absolute,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Scheme {
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Url {
    pub scheme: Scheme,
    pub authority: String,
    pub path: Vec<String>,
    pub file: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
    pub headers: Option<Box<ImportHashed>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportKind {
    /// `missing`
    Missing,
    /// `./dir/file` and friends
    Local(FilePrefix, Vec<String>, String),
    /// `http(s)://…`
    Remote(Url),
    /// `env:NAME`
    Env(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportHashed {
    pub kind: ImportKind,
    /// `sha256:` pin, 64 hex digits.
    pub hash: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ImportMode {
    Code,
    /// `as Text`
    RawText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub hashed: ImportHashed,
    pub mode: ImportMode,
}

/// The expression tree. Every transformation produces a new tree; subtrees
/// are immutable values.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(Const),
    Var(Var),
    Lam(Label, Box<Expr>, Box<Expr>),
    Pi(Label, Box<Expr>, Box<Expr>),
    Let(Label, Option<Box<Expr>>, Box<Expr>, Box<Expr>),
    App(Box<Expr>, Box<Expr>),
    Annot(Box<Expr>, Box<Expr>),
    Builtin(Builtin),
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    BoolLit(bool),
    BoolIf(Box<Expr>, Box<Expr>, Box<Expr>),
    NaturalLit(BigUint),
    IntegerLit(BigInt),
    DoubleLit(Binary64),
    TextLit(Chunks),
    /// Element type is present iff the element vector is empty, once
    /// normalised; the parser may attach one to a non-empty literal.
    ListLit(Option<Box<Expr>>, Vec<Expr>),
    OptionalLit(Box<Expr>, Option<Box<Expr>>),
    SomeLit(Box<Expr>),
    Record(FieldMap),
    RecordLit(FieldMap),
    Union(FieldMap),
    /// Active label, its payload, and the remaining alternatives. The
    /// active label never appears among the alternatives.
    UnionLit(Label, Box<Expr>, FieldMap),
    Merge(Box<Expr>, Box<Expr>, Option<Box<Expr>>),
    Constructors(Box<Expr>),
    Field(Box<Expr>, Label),
    Project(Box<Expr>, Vec<Label>),
    Import(Import),
}

impl Expr {
    pub fn var<S: Into<Label>>(name: S) -> Expr {
        Expr::Var(Var::new(name, 0))
    }

    pub fn natural(n: u64) -> Expr {
        Expr::NaturalLit(BigUint::from(n))
    }

    pub fn text<S: Into<String>>(s: S) -> Expr {
        Expr::TextLit(Chunks::from_text(s))
    }

    pub fn app(f: Expr, a: Expr) -> Expr {
        Expr::App(Box::new(f), Box::new(a))
    }

    pub fn as_natural_lit(&self) -> Option<&BigUint> {
        match self {
            Expr::NaturalLit(n) => Some(n),
            _ => Option::None,
        }
    }

    pub fn as_bool_lit(&self) -> Option<bool> {
        match self {
            Expr::BoolLit(b) => Some(*b),
            _ => Option::None,
        }
    }

    pub fn as_text_lit(&self) -> Option<&Chunks> {
        match self {
            Expr::TextLit(c) => Some(c),
            _ => Option::None,
        }
    }

    pub fn as_list_lit(&self) -> Option<(Option<&Expr>, &[Expr])> {
        match self {
            Expr::ListLit(t, xs) => Some((t.as_deref(), xs.as_slice())),
            _ => Option::None,
        }
    }

    pub fn as_record_lit(&self) -> Option<&FieldMap> {
        match self {
            Expr::RecordLit(m) => Some(m),
            _ => Option::None,
        }
    }

    pub fn as_union_lit(&self) -> Option<(&Label, &Expr, &FieldMap)> {
        match self {
            Expr::UnionLit(k, v, rest) => Some((k, v, rest)),
            _ => Option::None,
        }
    }

    /// Rebuild this node, transforming every immediate child. The callback
    /// receives the label the node binds over that child, if any: the bodies
    /// of `Lam`, `Pi` and `Let` are guarded, their annotations and the `Let`
    /// value are not.
    pub fn map_children<F>(self, f: &mut F) -> Expr
    where
        F: FnMut(Expr, Option<&str>) -> Expr,
    {
        use Expr::*;
        match self {
            e @ (Const(_) | Var(_) | Builtin(_) | BoolLit(_) | NaturalLit(_) | IntegerLit(_)
            | DoubleLit(_) | Import(_)) => e,
            Lam(x, t, b) => {
                let t = Box::new(f(*t, Option::None));
                let b = Box::new(f(*b, Some(x.as_str())));
                Lam(x, t, b)
            }
            Pi(x, t, b) => {
                let t = Box::new(f(*t, Option::None));
                let b = Box::new(f(*b, Some(x.as_str())));
                Pi(x, t, b)
            }
            Let(x, t, v, b) => {
                let t = t.map(|t| Box::new(f(*t, Option::None)));
                let v = Box::new(f(*v, Option::None));
                let b = Box::new(f(*b, Some(x.as_str())));
                Let(x, t, v, b)
            }
            App(a, b) => App(
                Box::new(f(*a, Option::None)),
                Box::new(f(*b, Option::None)),
            ),
            Annot(a, b) => Annot(
                Box::new(f(*a, Option::None)),
                Box::new(f(*b, Option::None)),
            ),
            BinOp(op, a, b) => BinOp(
                op,
                Box::new(f(*a, Option::None)),
                Box::new(f(*b, Option::None)),
            ),
            BoolIf(c, t, e) => BoolIf(
                Box::new(f(*c, Option::None)),
                Box::new(f(*t, Option::None)),
                Box::new(f(*e, Option::None)),
            ),
            TextLit(chunks) => {
                let tail = chunks
                    .tail
                    .into_iter()
                    .map(|(e, s)| (f(e, Option::None), s))
                    .collect();
                TextLit(self::Chunks {
                    head: chunks.head,
                    tail,
                })
            }
            ListLit(t, xs) => ListLit(
                t.map(|t| Box::new(f(*t, Option::None))),
                xs.into_iter().map(|x| f(x, Option::None)).collect(),
            ),
            OptionalLit(t, x) => OptionalLit(
                Box::new(f(*t, Option::None)),
                x.map(|x| Box::new(f(*x, Option::None))),
            ),
            SomeLit(x) => SomeLit(Box::new(f(*x, Option::None))),
            Record(m) => Record(map_values(m, f)),
            RecordLit(m) => RecordLit(map_values(m, f)),
            Union(m) => Union(map_values(m, f)),
            UnionLit(k, v, rest) => {
                let v = Box::new(f(*v, Option::None));
                UnionLit(k, v, map_values(rest, f))
            }
            Merge(h, u, t) => Merge(
                Box::new(f(*h, Option::None)),
                Box::new(f(*u, Option::None)),
                t.map(|t| Box::new(f(*t, Option::None))),
            ),
            Constructors(u) => Constructors(Box::new(f(*u, Option::None))),
            Field(e, k) => Field(Box::new(f(*e, Option::None)), k),
            Project(e, ks) => Project(Box::new(f(*e, Option::None)), ks),
        }
    }

    /// Short-circuit fold over immediate children with the same binder
    /// information as [`Expr::map_children`].
    pub fn any_child<F>(&self, f: &mut F) -> bool
    where
        F: FnMut(&Expr, Option<&str>) -> bool,
    {
        use Expr::*;
        match self {
            Const(_) | Var(_) | Builtin(_) | BoolLit(_) | NaturalLit(_) | IntegerLit(_)
            | DoubleLit(_) | Import(_) => false,
            Lam(x, t, b) | Pi(x, t, b) => f(t, Option::None) || f(b, Some(x.as_str())),
            Let(x, t, v, b) => {
                t.as_deref().is_some_and(|t| f(t, Option::None))
                    || f(v, Option::None)
                    || f(b, Some(x.as_str()))
            }
            App(a, b) | Annot(a, b) | BinOp(_, a, b) => f(a, Option::None) || f(b, Option::None),
            BoolIf(c, t, e) => f(c, Option::None) || f(t, Option::None) || f(e, Option::None),
            TextLit(chunks) => chunks.tail.iter().any(|(e, _)| f(e, Option::None)),
            ListLit(t, xs) => {
                t.as_deref().is_some_and(|t| f(t, Option::None))
                    || xs.iter().any(|x| f(x, Option::None))
            }
            OptionalLit(t, x) => {
                f(t, Option::None) || x.as_deref().is_some_and(|x| f(x, Option::None))
            }
            SomeLit(x) => f(x, Option::None),
            Record(m) | RecordLit(m) | Union(m) => m.values().any(|v| f(v, Option::None)),
            UnionLit(_, v, rest) => {
                f(v, Option::None) || rest.values().any(|v| f(v, Option::None))
            }
            Merge(h, u, t) => {
                f(h, Option::None)
                    || f(u, Option::None)
                    || t.as_deref().is_some_and(|t| f(t, Option::None))
            }
            Constructors(u) => f(u, Option::None),
            Field(e, _) | Project(e, _) => f(e, Option::None),
        }
    }
}

fn map_values<F>(m: FieldMap, f: &mut F) -> FieldMap
where
    F: FnMut(Expr, Option<&str>) -> Expr,
{
    m.into_iter()
        .map(|(k, v)| (k, f(v, Option::None)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_children_reports_binders() {
        let e = Expr::Lam(
            "x".into(),
            Box::new(Expr::Builtin(Builtin::Natural)),
            Box::new(Expr::var("x")),
        );
        let mut seen = Vec::new();
        e.map_children(&mut |c, binder| {
            seen.push(binder.map(str::to_string));
            c
        });
        assert_eq!(seen, vec![Option::None, Some("x".to_string())]);
    }

    #[test]
    fn chunks_append_joins_seam() {
        let mut a = Chunks::from_text("a");
        a.push(Expr::var("x"), "b".into());
        let b = Chunks::from_text("c");
        let joined = a.append(b);
        assert_eq!(joined.head, "a");
        assert_eq!(joined.tail.len(), 1);
        assert_eq!(joined.tail[0].1, "bc");
    }

    #[test]
    fn prisms_observe_or_fail() {
        let n = Expr::natural(3);
        assert!(n.as_natural_lit().is_some());
        assert!(n.as_bool_lit().is_none());
        assert!(Expr::text("x").as_text_lit().is_some());
        let l = Expr::ListLit(Option::None, vec![n]);
        let (t, xs) = l.as_list_lit().unwrap();
        assert!(t.is_none());
        assert_eq!(xs.len(), 1);
        assert!(l.as_record_lit().is_none());
        assert!(l.as_union_lit().is_none());
    }

    #[test]
    fn any_child_short_circuits_on_let_value() {
        let e = Expr::Let(
            "x".into(),
            Option::None,
            Box::new(Expr::natural(1)),
            Box::new(Expr::var("x")),
        );
        assert!(e.any_child(&mut |c, _| matches!(c, Expr::NaturalLit(_))));
        assert!(!e.any_child(&mut |c, _| matches!(c, Expr::BoolLit(_))));
    }
}
