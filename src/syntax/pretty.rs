//! `Display` renders re-parseable ASCII source. Each node knows the loosest
//! grammar level it may appear at; printing at a tighter position inserts
//! parentheses. Used by the CLI and by the parse∘print round-trip tests.

use std::fmt::{Display, Formatter, Result};

use crate::syntax::expr::{
    BinOp, Builtin, Const, Expr, FilePrefix, Import, ImportHashed, ImportKind, ImportMode, Scheme,
};
use crate::syntax::{is_reserved, FieldMap};

// Grammar levels, loosest to tightest. Binary operators occupy 1..=12.
const EXPR: u8 = 0;
const APP: u8 = 13;
const IMPORT: u8 = 14;
const PRIM: u8 = 15;

fn rank(op: BinOp) -> u8 {
    use BinOp::*;
    match op {
        ImportAlt => 1,
        BoolOr => 2,
        NaturalPlus => 3,
        TextAppend => 4,
        ListAppend => 5,
        CombineTypes => 6,
        Prefer => 7,
        Combine => 8,
        BoolAnd => 9,
        BoolNE => 10,
        BoolEQ => 11,
        NaturalTimes => 12,
    }
}

fn op_symbol(op: BinOp) -> &'static str {
    use BinOp::*;
    match op {
        ImportAlt => "?",
        BoolOr => "||",
        NaturalPlus => "+",
        TextAppend => "++",
        ListAppend => "#",
        CombineTypes => "//\\\\",
        Prefer => "//",
        Combine => "/\\",
        BoolAnd => "&&",
        BoolNE => "!=",
        BoolEQ => "==",
        NaturalTimes => "*",
    }
}

fn level(e: &Expr) -> u8 {
    use Expr::*;
    match e {
        Lam(..) | Pi(..) | Let(..) | BoolIf(..) | Annot(..) | Merge(..) | OptionalLit(..) => EXPR,
        ListLit(t, _) if t.is_some() => EXPR,
        BinOp(op, _, _) => rank(*op),
        App(..) | SomeLit(..) | Constructors(..) => APP,
        Import(..) => IMPORT,
        _ => PRIM,
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        fmt_at(self, EXPR, f)
    }
}

fn fmt_at(e: &Expr, min: u8, f: &mut Formatter<'_>) -> Result {
    if level(e) < min {
        write!(f, "(")?;
        fmt_at(e, EXPR, f)?;
        write!(f, ")")
    } else {
        fmt_node(e, f)
    }
}

fn fmt_node(e: &Expr, f: &mut Formatter<'_>) -> Result {
    use Expr::*;
    match e {
        Lam(x, t, b) => {
            write!(f, "\\({} : ", LabelRef(x))?;
            fmt_at(t, EXPR, f)?;
            write!(f, ") -> ")?;
            fmt_at(b, EXPR, f)
        }
        Pi(x, t, b) if x.as_str() == "_" => {
            fmt_at(t, 1, f)?;
            write!(f, " -> ")?;
            fmt_at(b, EXPR, f)
        }
        Pi(x, t, b) => {
            write!(f, "forall ({} : ", LabelRef(x))?;
            fmt_at(t, EXPR, f)?;
            write!(f, ") -> ")?;
            fmt_at(b, EXPR, f)
        }
        Let(x, t, v, b) => {
            write!(f, "let {}", LabelRef(x))?;
            if let Some(t) = t {
                write!(f, " : ")?;
                fmt_at(t, EXPR, f)?;
            }
            write!(f, " = ")?;
            fmt_at(v, EXPR, f)?;
            write!(f, " in ")?;
            fmt_at(b, EXPR, f)
        }
        BoolIf(c, t, e) => {
            write!(f, "if ")?;
            fmt_at(c, EXPR, f)?;
            write!(f, " then ")?;
            fmt_at(t, EXPR, f)?;
            write!(f, " else ")?;
            fmt_at(e, EXPR, f)
        }
        Annot(a, b) => {
            fmt_at(a, 1, f)?;
            write!(f, " : ")?;
            fmt_at(b, EXPR, f)
        }
        Merge(h, u, t) => {
            write!(f, "merge ")?;
            fmt_at(h, IMPORT, f)?;
            write!(f, " ")?;
            fmt_at(u, IMPORT, f)?;
            if let Some(t) = t {
                write!(f, " : ")?;
                fmt_at(t, APP, f)?;
            }
            Ok(())
        }
        ListLit(Some(t), xs) => {
            fmt_list(xs, f)?;
            write!(f, " : List ")?;
            fmt_at(t, IMPORT, f)
        }
        ListLit(None, xs) => fmt_list(xs, f),
        OptionalLit(t, x) => {
            match x {
                Some(x) => {
                    write!(f, "[")?;
                    fmt_at(x, EXPR, f)?;
                    write!(f, "]")?;
                }
                None => write!(f, "[]")?,
            }
            write!(f, " : Optional ")?;
            fmt_at(t, IMPORT, f)
        }
        BinOp(op, l, r) => {
            fmt_at(l, rank(*op), f)?;
            write!(f, " {} ", op_symbol(*op))?;
            fmt_at(r, rank(*op) + 1, f)
        }
        App(g, a) => {
            fmt_at(g, APP, f)?;
            write!(f, " ")?;
            fmt_at(a, IMPORT, f)
        }
        SomeLit(x) => {
            write!(f, "Some ")?;
            fmt_at(x, IMPORT, f)
        }
        Constructors(u) => {
            write!(f, "constructors ")?;
            fmt_at(u, IMPORT, f)
        }
        Field(e, k) => {
            fmt_at(e, PRIM, f)?;
            write!(f, ".{}", LabelRef(k))
        }
        Project(e, ks) => {
            fmt_at(e, PRIM, f)?;
            write!(f, ".{{")?;
            for (i, k) in ks.iter().enumerate() {
                write!(f, "{}{}", if i == 0 { " " } else { ", " }, LabelRef(k))?;
            }
            write!(f, "{}}}", if ks.is_empty() { "" } else { " " })
        }
        Var(v) => {
            write!(f, "{}", LabelRef(&v.name))?;
            if v.index != 0 {
                write!(f, "@{}", v.index)?;
            }
            Ok(())
        }
        Const(c) => f.write_str(match c {
            self::Const::Type => "Type",
            self::Const::Kind => "Kind",
            self::Const::Sort => "Sort",
        }),
        Builtin(b) => f.write_str(builtin_name(*b)),
        BoolLit(b) => f.write_str(if *b { "True" } else { "False" }),
        NaturalLit(n) => write!(f, "{n}"),
        IntegerLit(z) => {
            if z.sign() == num_bigint::Sign::Minus {
                write!(f, "{z}")
            } else {
                write!(f, "+{z}")
            }
        }
        DoubleLit(d) => write!(f, "{d}"),
        TextLit(chunks) => {
            write!(f, "\"")?;
            fmt_text(&chunks.head, f)?;
            for (e, s) in &chunks.tail {
                write!(f, "${{")?;
                fmt_at(e, EXPR, f)?;
                write!(f, "}}")?;
                fmt_text(s, f)?;
            }
            write!(f, "\"")
        }
        Record(m) => fmt_fields(m, ":", "{}", f),
        RecordLit(m) => fmt_fields(m, "=", "{=}", f),
        Union(m) => {
            if m.is_empty() {
                return write!(f, "<>");
            }
            write!(f, "<")?;
            let mut first = true;
            for (k, v) in m.iter() {
                fmt_alternative(k, v, ":", first, f)?;
                first = false;
            }
            write!(f, " >")
        }
        UnionLit(k, v, m) => {
            write!(f, "<")?;
            fmt_alternative(k, v, "=", true, f)?;
            for (k, v) in m.iter() {
                fmt_alternative(k, v, ":", false, f)?;
            }
            write!(f, " >")
        }
        Import(i) => fmt_import(i, f),
    }
}

fn fmt_list(xs: &[Expr], f: &mut Formatter<'_>) -> Result {
    write!(f, "[")?;
    for (i, x) in xs.iter().enumerate() {
        if i != 0 {
            write!(f, ", ")?;
        }
        fmt_at(x, EXPR, f)?;
    }
    write!(f, "]")
}

fn fmt_fields(m: &FieldMap, sep: &str, empty: &str, f: &mut Formatter<'_>) -> Result {
    if m.is_empty() {
        return f.write_str(empty);
    }
    write!(f, "{{")?;
    for (i, (k, v)) in m.iter().enumerate() {
        write!(f, "{}{} {} ", if i == 0 { " " } else { ", " }, LabelRef(k), sep)?;
        fmt_at(v, EXPR, f)?;
    }
    write!(f, " }}")
}

fn fmt_alternative(
    k: &str,
    v: &Expr,
    sep: &str,
    first: bool,
    f: &mut Formatter<'_>,
) -> Result {
    write!(f, "{}{} {} ", if first { " " } else { " | " }, LabelRef(k), sep)?;
    fmt_at(v, EXPR, f)
}

/// A label as it appears in source: backticked when it collides with a
/// reserved word or leaves the simple-label alphabet.
struct LabelRef<'a>(&'a str);

impl Display for LabelRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if is_simple_label(self.0) {
            f.write_str(self.0)
        } else {
            write!(f, "`{}`", self.0)
        }
    }
}

fn is_simple_label(s: &str) -> bool {
    let mut cs = s.chars();
    let head = match cs.next() {
        Some(c) => c.is_ascii_alphabetic() || c == '_',
        None => false,
    };
    head && cs.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/' || c == '_')
        && !is_reserved(s)
}

fn fmt_text(s: &str, f: &mut Formatter<'_>) -> Result {
    let mut cs = s.chars().peekable();
    while let Some(c) = cs.next() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            '\u{0008}' => write!(f, "\\b")?,
            '\u{000C}' => write!(f, "\\f")?,
            '$' if cs.peek() == Some(&'{') => write!(f, "\\u0024")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    Ok(())
}

fn builtin_name(b: Builtin) -> &'static str {
    use Builtin::*;
    match b {
        Bool => "Bool",
        Natural => "Natural",
        Integer => "Integer",
        Double => "Double",
        Text => "Text",
        List => "List",
        Optional => "Optional",
        None => "None",
        NaturalFold => "Natural/fold",
        NaturalBuild => "Natural/build",
        NaturalIsZero => "Natural/isZero",
        NaturalEven => "Natural/even",
        NaturalOdd => "Natural/odd",
        NaturalToInteger => "Natural/toInteger",
        NaturalShow => "Natural/show",
        IntegerShow => "Integer/show",
        IntegerToDouble => "Integer/toDouble",
        DoubleShow => "Double/show",
        ListBuild => "List/build",
        ListFold => "List/fold",
        ListLength => "List/length",
        ListHead => "List/head",
        ListLast => "List/last",
        ListIndexed => "List/indexed",
        ListReverse => "List/reverse",
        OptionalBuild => "Optional/build",
        OptionalFold => "Optional/fold",
    }
}

fn fmt_import(i: &Import, f: &mut Formatter<'_>) -> Result {
    fmt_import_hashed(&i.hashed, f)?;
    if i.mode == ImportMode::RawText {
        write!(f, " as Text")?;
    }
    Ok(())
}

fn fmt_import_hashed(h: &ImportHashed, f: &mut Formatter<'_>) -> Result {
    match &h.kind {
        ImportKind::Missing => write!(f, "missing")?,
        ImportKind::Env(name) => {
            if is_bash_env_name(name) {
                write!(f, "env:{name}")?;
            } else {
                write!(f, "env:\"")?;
                for c in name.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\r' => write!(f, "\\r")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")?;
            }
        }
        ImportKind::Local(prefix, dirs, file) => {
            f.write_str(match prefix {
                FilePrefix::Here => ".",
                FilePrefix::Parent => "..",
                FilePrefix::Home => "~",
                FilePrefix::Absolute => "",
            })?;
            for d in dirs {
                write!(f, "/{d}")?;
            }
            write!(f, "/{file}")?;
        }
        ImportKind::Remote(url) => {
            write!(
                f,
                "{}://{}",
                match url.scheme {
                    Scheme::Http => "http",
                    Scheme::Https => "https",
                },
                url.authority
            )?;
            for d in &url.path {
                write!(f, "/{d}")?;
            }
            if !url.file.is_empty() || !url.path.is_empty() {
                write!(f, "/{}", url.file)?;
            }
            if let Some(q) = &url.query {
                write!(f, "?{q}")?;
            }
            if let Some(frag) = &url.fragment {
                write!(f, "#{frag}")?;
            }
            if let Some(headers) = &url.headers {
                write!(f, " using (")?;
                fmt_import_hashed(headers, f)?;
                write!(f, ")")?;
            }
        }
    }
    if let Some(hash) = &h.hash {
        write!(f, " sha256:{hash}")?;
    }
    Ok(())
}

fn is_bash_env_name(s: &str) -> bool {
    let mut cs = s.chars();
    let head = match cs.next() {
        Some(c) => c.is_ascii_alphabetic() || c == '_',
        None => false,
    };
    head && cs.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
