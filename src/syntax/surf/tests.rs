use num_bigint::BigInt;

use crate::syntax::expr::{
    BinOp, Builtin, Chunks, Const, FilePrefix, ImportKind, ImportMode, Scheme,
};
use crate::syntax::surf::parse_text;
use crate::syntax::{Expr, FieldMap, Var};

fn parse(text: &str) -> Expr {
    match parse_text(text) {
        Ok(e) => e,
        Err(e) => panic!("parse failure: {e}"),
    }
}

fn rejects(text: &str) {
    assert!(parse_text(text).is_err(), "accepted: {text}");
}

fn nat(n: u64) -> Expr {
    Expr::natural(n)
}

fn v(name: &str) -> Expr {
    Expr::var(name)
}

fn bin(op: BinOp, l: Expr, r: Expr) -> Expr {
    Expr::BinOp(op, Box::new(l), Box::new(r))
}

#[test]
fn test_numeric_literals() {
    assert_eq!(parse("42"), nat(42));
    assert_eq!(parse("+42"), Expr::IntegerLit(BigInt::from(42)));
    assert_eq!(parse("-7"), Expr::IntegerLit(BigInt::from(-7)));
    assert_eq!(parse("1.5"), Expr::DoubleLit(1.5.into()));
    assert_eq!(parse("-1.5e3"), Expr::DoubleLit((-1.5e3).into()));
    assert_eq!(parse("1e2"), Expr::DoubleLit(100.0.into()));
}

#[test]
fn test_builtin_words() {
    assert_eq!(parse("Natural"), Expr::Builtin(Builtin::Natural));
    assert_eq!(parse("Natural/fold"), Expr::Builtin(Builtin::NaturalFold));
    assert_eq!(parse("True"), Expr::BoolLit(true));
    assert_eq!(parse("Type"), Expr::Const(Const::Type));
    assert_eq!(parse("Sort"), Expr::Const(Const::Sort));
    // a builtin name extended with label characters is an ordinary variable
    assert_eq!(parse("Naturals"), v("Naturals"));
    assert_eq!(parse("Natural/folds"), v("Natural/folds"));
}

#[test]
fn test_reserved_words_are_not_variables() {
    rejects("in");
    rejects("let");
    rejects("then");
    rejects("env");
}

#[test]
fn test_backtick_labels() {
    // S7: a reserved word can be bound and referenced when quoted
    assert_eq!(
        parse("let `in` = 1 in `in`"),
        Expr::Let(
            "in".into(),
            None,
            Box::new(nat(1)),
            Box::new(v("in")),
        )
    );
}

#[test]
fn test_identifier_index() {
    assert_eq!(parse("x@1"), Expr::Var(Var::new("x", 1)));
    assert_eq!(parse("x"), Expr::Var(Var::new("x", 0)));
}

#[test]
fn test_operator_precedence() {
    use BinOp::*;
    assert_eq!(
        parse("1 + 2 * 3"),
        bin(NaturalPlus, nat(1), bin(NaturalTimes, nat(2), nat(3)))
    );
    assert_eq!(
        parse("a && b || c"),
        bin(BoolOr, bin(BoolAnd, v("a"), v("b")), v("c"))
    );
    assert_eq!(
        parse("1 + 2 + 3"),
        bin(NaturalPlus, bin(NaturalPlus, nat(1), nat(2)), nat(3))
    );
    assert_eq!(
        parse("a == b != c"),
        bin(BoolNE, bin(BoolEQ, v("a"), v("b")), v("c"))
    );
}

#[test]
fn test_plus_needs_whitespace() {
    use BinOp::*;
    assert_eq!(parse("1 + 2"), bin(NaturalPlus, nat(1), nat(2)));
    // without trailing whitespace `+2` is an integer literal argument
    assert_eq!(
        parse("f +2"),
        Expr::app(v("f"), Expr::IntegerLit(BigInt::from(2)))
    );
}

#[test]
fn test_unicode_synonyms() {
    assert_eq!(parse("λ(x : Natural) → x"), parse("\\(x : Natural) -> x"));
    assert_eq!(parse("∀(a : Type) → a"), parse("forall (a : Type) -> a"));
    assert_eq!(parse("a ∧ b"), parse("a /\\ b"));
    assert_eq!(parse("a ⫽ b"), parse("a // b"));
    assert_eq!(parse("a ⩓ b"), parse("a //\\\\ b"));
}

#[test]
fn test_lambda_pi_let_if() {
    assert_eq!(
        parse("\\(x : Natural) -> x"),
        Expr::Lam(
            "x".into(),
            Box::new(Expr::Builtin(Builtin::Natural)),
            Box::new(v("x"))
        )
    );
    assert_eq!(
        parse("Natural -> Bool"),
        Expr::Pi(
            "_".into(),
            Box::new(Expr::Builtin(Builtin::Natural)),
            Box::new(Expr::Builtin(Builtin::Bool))
        )
    );
    assert_eq!(
        parse("let x : Natural = 1 in x"),
        Expr::Let(
            "x".into(),
            Some(Box::new(Expr::Builtin(Builtin::Natural))),
            Box::new(nat(1)),
            Box::new(v("x"))
        )
    );
    assert_eq!(
        parse("if b then 1 else 2"),
        Expr::BoolIf(Box::new(v("b")), Box::new(nat(1)), Box::new(nat(2)))
    );
}

#[test]
fn test_annotation() {
    assert_eq!(
        parse("x : Natural"),
        Expr::Annot(Box::new(v("x")), Box::new(Expr::Builtin(Builtin::Natural)))
    );
}

#[test]
fn test_application_nests_left() {
    assert_eq!(
        parse("f x y"),
        Expr::app(Expr::app(v("f"), v("x")), v("y"))
    );
}

#[test]
fn test_some_and_constructors_prefixes() {
    assert_eq!(parse("Some x"), Expr::SomeLit(Box::new(v("x"))));
    assert_eq!(
        parse("Some x y"),
        Expr::app(Expr::SomeLit(Box::new(v("x"))), v("y"))
    );
    assert_eq!(
        parse("constructors u"),
        Expr::Constructors(Box::new(v("u")))
    );
}

#[test]
fn test_selectors() {
    assert_eq!(parse("r.x"), Expr::Field(Box::new(v("r")), "x".into()));
    assert_eq!(
        parse("r.x.y"),
        Expr::Field(
            Box::new(Expr::Field(Box::new(v("r")), "x".into())),
            "y".into()
        )
    );
    assert_eq!(
        parse("r.{ a, b }"),
        Expr::Project(Box::new(v("r")), vec!["a".into(), "b".into()])
    );
    assert_eq!(parse("r.{}"), Expr::Project(Box::new(v("r")), Vec::new()));
    rejects("r.{ a, a }");
}

#[test]
fn test_records() {
    assert_eq!(parse("{}"), Expr::Record(FieldMap::new()));
    assert_eq!(parse("{=}"), Expr::RecordLit(FieldMap::new()));

    let mut m = FieldMap::new();
    m.insert("a".to_string(), nat(1));
    m.insert("b".to_string(), nat(2));
    assert_eq!(parse("{ a = 1, b = 2 }"), Expr::RecordLit(m));

    let mut t = FieldMap::new();
    t.insert("a".to_string(), Expr::Builtin(Builtin::Natural));
    assert_eq!(parse("{ a : Natural }"), Expr::Record(t));

    // the first entry's separator decides; a mismatch is a parse error
    rejects("{ a = 1, b : Natural }");
    rejects("{ a = 1, a = 2 }");
}

#[test]
fn test_unions() {
    assert_eq!(parse("<>"), Expr::Union(FieldMap::new()));

    let mut m = FieldMap::new();
    m.insert("a".to_string(), Expr::Builtin(Builtin::Natural));
    assert_eq!(parse("< a : Natural >"), Expr::Union(m));

    let mut rest = FieldMap::new();
    rest.insert("b".to_string(), Expr::Builtin(Builtin::Text));
    assert_eq!(
        parse("< a = 1 | b : Text >"),
        Expr::UnionLit("a".into(), Box::new(nat(1)), rest)
    );

    rejects("< a = 1 | b = 2 >");
    rejects("< a : Natural | a : Text >");
}

#[test]
fn test_lists_and_optionals() {
    assert_eq!(parse("[1, 2]"), Expr::ListLit(None, vec![nat(1), nat(2)]));
    assert_eq!(
        parse("[] : List Natural"),
        Expr::ListLit(Some(Box::new(Expr::Builtin(Builtin::Natural))), Vec::new())
    );
    assert_eq!(
        parse("[1, 2] : List Natural"),
        Expr::ListLit(
            Some(Box::new(Expr::Builtin(Builtin::Natural))),
            vec![nat(1), nat(2)]
        )
    );
    assert_eq!(
        parse("[] : Optional Natural"),
        Expr::OptionalLit(Box::new(Expr::Builtin(Builtin::Natural)), None)
    );
    assert_eq!(
        parse("[1] : Optional Natural"),
        Expr::OptionalLit(Box::new(Expr::Builtin(Builtin::Natural)), Some(Box::new(nat(1))))
    );
    rejects("[]");
    rejects("[1, 2] : Optional Natural");
}

#[test]
fn test_list_append_operands() {
    assert_eq!(
        parse("[1] # [2]"),
        Expr::BinOp(
            BinOp::ListAppend,
            Box::new(Expr::ListLit(None, vec![nat(1)])),
            Box::new(Expr::ListLit(None, vec![nat(2)]))
        )
    );
}

#[test]
fn test_text_literals() {
    assert_eq!(parse("\"hello\""), Expr::text("hello"));
    assert_eq!(parse("\"a\\nb\\\"\""), Expr::text("a\nb\""));
    assert_eq!(parse("\"\\u0041\""), Expr::text("A"));

    let mut chunks = Chunks::from_text("a");
    chunks.push(v("x"), "b".into());
    assert_eq!(parse("\"a${x}b\""), Expr::TextLit(chunks));

    rejects("\"unterminated");
}

#[test]
fn test_single_quote_literals() {
    assert_eq!(parse("''line''"), Expr::text("line"));
    // ''' escapes a quote pair, ''${ escapes an interpolation
    assert_eq!(parse("''a'''b''"), Expr::text("a''b"));
    assert_eq!(parse("''a''${b''"), Expr::text("a${b"));

    let mut chunks = Chunks::from_text("n = ");
    chunks.push(v("n"), "\n".into());
    assert_eq!(parse("''n = ${n}\n''"), Expr::TextLit(chunks));
}

#[test]
fn test_comments() {
    assert_eq!(parse("1 -- trailing"), nat(1));
    assert_eq!(parse("{- a {- nested -} b -} 1"), nat(1));
    assert_eq!(parse("1 {- tabs\tand\nnewlines -}"), nat(1));
    rejects("{- unclosed 1");
}

#[test]
fn test_merge() {
    let e = parse("merge {=} <>:Natural");
    assert_eq!(
        e,
        Expr::Merge(
            Box::new(Expr::RecordLit(FieldMap::new())),
            Box::new(Expr::Union(FieldMap::new())),
            Some(Box::new(Expr::Builtin(Builtin::Natural)))
        )
    );
}

#[test]
fn test_local_imports() {
    let here = parse("./foo/bar");
    match here {
        Expr::Import(i) => match i.hashed.kind {
            ImportKind::Local(FilePrefix::Here, dirs, file) => {
                assert_eq!(dirs, vec!["foo".to_string()]);
                assert_eq!(file, "bar");
            }
            k => panic!("unexpected import kind: {k:?}"),
        },
        e => panic!("not an import: {e:?}"),
    }
    assert!(matches!(
        parse("../x"),
        Expr::Import(i) if matches!(i.hashed.kind, ImportKind::Local(FilePrefix::Parent, _, _))
    ));
    assert!(matches!(
        parse("~/x"),
        Expr::Import(i) if matches!(i.hashed.kind, ImportKind::Local(FilePrefix::Home, _, _))
    ));
    assert!(matches!(
        parse("/a/b"),
        Expr::Import(i) if matches!(i.hashed.kind, ImportKind::Local(FilePrefix::Absolute, _, _))
    ));
}

#[test]
fn test_env_and_missing_imports() {
    assert!(matches!(
        parse("env:HOME"),
        Expr::Import(i) if i.hashed.kind == ImportKind::Env("HOME".to_string())
    ));
    assert!(matches!(
        parse("env:\"A B\\n\""),
        Expr::Import(i) if i.hashed.kind == ImportKind::Env("A B\n".to_string())
    ));
    assert!(matches!(
        parse("missing"),
        Expr::Import(i) if i.hashed.kind == ImportKind::Missing
    ));
}

#[test]
fn test_remote_imports() {
    match parse("https://example.com/a/b?x=1#frag") {
        Expr::Import(i) => match i.hashed.kind {
            ImportKind::Remote(url) => {
                assert_eq!(url.scheme, Scheme::Https);
                assert_eq!(url.authority, "example.com");
                assert_eq!(url.path, vec!["a".to_string()]);
                assert_eq!(url.file, "b");
                assert_eq!(url.query.as_deref(), Some("x=1"));
                assert_eq!(url.fragment.as_deref(), Some("frag"));
            }
            k => panic!("unexpected import kind: {k:?}"),
        },
        e => panic!("not an import: {e:?}"),
    }
}

#[test]
fn test_import_hash_headers_and_mode() {
    let hash = "a".repeat(64);
    let e = parse(&format!("./pinned sha256:{hash} as Text"));
    match e {
        Expr::Import(i) => {
            assert_eq!(i.mode, ImportMode::RawText);
            assert_eq!(i.hashed.hash.as_deref(), Some(hash.as_str()));
        }
        e => panic!("not an import: {e:?}"),
    }

    match parse("http://example.com/a using (./headers)") {
        Expr::Import(i) => match i.hashed.kind {
            ImportKind::Remote(url) => assert!(url.headers.is_some()),
            k => panic!("unexpected import kind: {k:?}"),
        },
        e => panic!("not an import: {e:?}"),
    }
}

#[test]
fn test_import_alternative_operator() {
    assert!(matches!(
        parse("env:A ? env:B"),
        Expr::BinOp(BinOp::ImportAlt, _, _)
    ));
}

#[test]
fn test_whole_input_must_be_consumed() {
    rejects("1 )");
    rejects("(1");
    rejects("let x = 1");
}
