use std::str::FromStr;
use std::sync::OnceLock;

use num_bigint::{BigInt, BigUint};
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};

use crate::syntax::expr::{
    BinOp, Builtin, Chunks, Const, FilePrefix, Import, ImportHashed, ImportKind, ImportMode,
    Scheme, Url,
};
use crate::syntax::surf::Rule;
use crate::syntax::{Expr, FieldMap, Label, Loc, Var, UNDERSCORE};
use crate::Error;

fn expr_pratt() -> &'static PrattParser<Rule> {
    static ONCE: OnceLock<PrattParser<Rule>> = OnceLock::new();
    ONCE.get_or_init(|| {
        PrattParser::new()
            .op(Op::infix(Rule::import_alt_op, Assoc::Left))
            .op(Op::infix(Rule::or_op, Assoc::Left))
            .op(Op::infix(Rule::plus_op, Assoc::Left))
            .op(Op::infix(Rule::text_append_op, Assoc::Left))
            .op(Op::infix(Rule::list_append_op, Assoc::Left))
            .op(Op::infix(Rule::combine_types_op, Assoc::Left))
            .op(Op::infix(Rule::prefer_op, Assoc::Left))
            .op(Op::infix(Rule::combine_op, Assoc::Left))
            .op(Op::infix(Rule::and_op, Assoc::Left))
            .op(Op::infix(Rule::ne_op, Assoc::Left))
            .op(Op::infix(Rule::eq_op, Assoc::Left))
            .op(Op::infix(Rule::times_op, Assoc::Left))
    })
}

fn is_kw(r: Rule) -> bool {
    matches!(
        r,
        Rule::kw_if
            | Rule::kw_then
            | Rule::kw_else
            | Rule::kw_let
            | Rule::kw_in
            | Rule::kw_merge
            | Rule::kw_as
            | Rule::kw_using
            | Rule::kw_forall
            | Rule::EOI
    )
}

/// Translates pest pairs into the expression tree, validating label
/// uniqueness along the way.
#[derive(Default)]
pub struct Trans;

impl Trans {
    pub fn complete(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        self.expr(p.into_inner().next().unwrap())
    }

    fn expr(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        match p.as_rule() {
            Rule::lambda_expression => self.binder(p, false),
            Rule::forall_expression => self.binder(p, true),
            Rule::if_expression => self.if_expr(p),
            Rule::let_expression => self.let_expr(p),
            Rule::merge_expression => self.merge_expr(p),
            Rule::empty_collection => self.empty_collection(p),
            Rule::nonempty_collection => self.nonempty_collection(p),
            Rule::operator_chain => self.operator_chain(p),
            _ => unreachable!(),
        }
    }

    fn binder(&self, p: Pair<Rule>, pi: bool) -> Result<Expr, Error> {
        let mut it = p.into_inner().filter(|q| !is_kw(q.as_rule()));
        let x = self.label(it.next().unwrap());
        let t = Box::new(self.expr(it.next().unwrap())?);
        let b = Box::new(self.expr(it.next().unwrap())?);
        Ok(if pi {
            Expr::Pi(x, t, b)
        } else {
            Expr::Lam(x, t, b)
        })
    }

    fn if_expr(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        let mut it = p.into_inner().filter(|q| !is_kw(q.as_rule()));
        let c = Box::new(self.expr(it.next().unwrap())?);
        let t = Box::new(self.expr(it.next().unwrap())?);
        let e = Box::new(self.expr(it.next().unwrap())?);
        Ok(Expr::BoolIf(c, t, e))
    }

    fn let_expr(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        let mut it = p.into_inner().filter(|q| !is_kw(q.as_rule()));
        let x = self.label(it.next().unwrap());
        let rest: Vec<_> = it.collect();
        let mut rest = rest.into_iter();
        let annot = if rest.len() == 3 {
            Some(Box::new(self.expr(rest.next().unwrap())?))
        } else {
            None
        };
        let v = Box::new(self.expr(rest.next().unwrap())?);
        let b = Box::new(self.expr(rest.next().unwrap())?);
        Ok(Expr::Let(x, annot, v, b))
    }

    fn merge_expr(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        let mut it = p.into_inner().filter(|q| !is_kw(q.as_rule()));
        let h = Box::new(self.import_or_selector(it.next().unwrap())?);
        let u = Box::new(self.import_or_selector(it.next().unwrap())?);
        let t = match it.next() {
            Some(t) => Some(Box::new(self.application(t)?)),
            None => None,
        };
        Ok(Expr::Merge(h, u, t))
    }

    fn empty_collection(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        let mut it = p.into_inner();
        let kind = it.next().unwrap();
        let t = Box::new(self.import_or_selector(it.next().unwrap())?);
        Ok(match kind.as_rule() {
            Rule::kw_list => Expr::ListLit(Some(t), Vec::new()),
            Rule::kw_optional => Expr::OptionalLit(t, None),
            _ => unreachable!(),
        })
    }

    fn nonempty_collection(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        let mut it = p.into_inner();
        let list = it.next().unwrap();
        let loc = Loc::from(list.as_span());
        let elems = list
            .into_inner()
            .map(|e| self.expr(e))
            .collect::<Result<Vec<_>, _>>()?;
        let kind = it.next().unwrap();
        let t = Box::new(self.import_or_selector(it.next().unwrap())?);
        match kind.as_rule() {
            Rule::kw_list => Ok(Expr::ListLit(Some(t), elems)),
            Rule::kw_optional => {
                if elems.len() > 1 {
                    return Err(Error::ExtraOptionalElement(loc));
                }
                Ok(Expr::OptionalLit(
                    t,
                    elems.into_iter().next().map(Box::new),
                ))
            }
            _ => unreachable!(),
        }
    }

    fn operator_chain(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        let mut it = p.into_inner();
        let e = self.operator_expr(it.next().unwrap())?;
        match it.next() {
            None => Ok(e),
            Some(tail) => {
                let rule = tail.as_rule();
                let t = self.expr(tail.into_inner().next().unwrap())?;
                Ok(match rule {
                    Rule::arrow_tail => {
                        Expr::Pi(UNDERSCORE.into(), Box::new(e), Box::new(t))
                    }
                    Rule::annot_tail => Expr::Annot(Box::new(e), Box::new(t)),
                    _ => unreachable!(),
                })
            }
        }
    }

    fn operator_expr(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        expr_pratt()
            .map_primary(|x| self.application(x))
            .map_infix(|l, op, r| {
                let op = match op.as_rule() {
                    Rule::import_alt_op => BinOp::ImportAlt,
                    Rule::or_op => BinOp::BoolOr,
                    Rule::plus_op => BinOp::NaturalPlus,
                    Rule::text_append_op => BinOp::TextAppend,
                    Rule::list_append_op => BinOp::ListAppend,
                    Rule::combine_types_op => BinOp::CombineTypes,
                    Rule::prefer_op => BinOp::Prefer,
                    Rule::combine_op => BinOp::Combine,
                    Rule::and_op => BinOp::BoolAnd,
                    Rule::ne_op => BinOp::BoolNE,
                    Rule::eq_op => BinOp::BoolEQ,
                    Rule::times_op => BinOp::NaturalTimes,
                    _ => unreachable!(),
                };
                Ok(Expr::BinOp(op, Box::new(l?), Box::new(r?)))
            })
            .parse(p.into_inner())
    }

    fn application(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        let mut it = p.into_inner().peekable();
        let prefix = match it.peek().map(|q| q.as_rule()) {
            Some(Rule::kw_constructors) => {
                it.next();
                Some(Rule::kw_constructors)
            }
            Some(Rule::kw_some) => {
                it.next();
                Some(Rule::kw_some)
            }
            _ => None,
        };
        let mut e = self.import_or_selector(it.next().unwrap())?;
        e = match prefix {
            Some(Rule::kw_constructors) => Expr::Constructors(Box::new(e)),
            Some(Rule::kw_some) => Expr::SomeLit(Box::new(e)),
            _ => e,
        };
        for a in it {
            e = Expr::app(e, self.import_or_selector(a)?);
        }
        Ok(e)
    }

    fn import_or_selector(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        match p.as_rule() {
            Rule::import => self.import(p),
            Rule::selector_expression => self.selector_expr(p),
            _ => unreachable!(),
        }
    }

    fn selector_expr(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        let mut it = p.into_inner();
        let mut e = self.primitive(it.next().unwrap())?;
        for s in it {
            let loc = Loc::from(s.as_span());
            let sel = s.into_inner().next().unwrap();
            match sel.as_rule() {
                Rule::labels => {
                    let mut ks: Vec<Label> = Vec::new();
                    for l in sel.into_inner() {
                        let k = self.label(l);
                        if ks.contains(&k) {
                            return Err(Error::DuplicateLabel(loc));
                        }
                        ks.push(k);
                    }
                    e = Expr::Project(Box::new(e), ks);
                }
                Rule::simple_label | Rule::backtick_label => {
                    e = Expr::Field(Box::new(e), self.label(sel));
                }
                _ => unreachable!(),
            }
        }
        Ok(e)
    }

    fn primitive(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        match p.as_rule() {
            Rule::double_literal => Ok(Expr::DoubleLit(
                p.as_str().parse::<f64>().unwrap().into(),
            )),
            Rule::natural_literal => {
                Ok(Expr::NaturalLit(BigUint::from_str(p.as_str()).unwrap()))
            }
            Rule::integer_literal => {
                let s = p.as_str();
                let s = s.strip_prefix('+').unwrap_or(s);
                Ok(Expr::IntegerLit(BigInt::from_str(s).unwrap()))
            }
            Rule::double_quote_literal => self.double_quote(p),
            Rule::single_quote_literal => self.single_quote(p),
            Rule::record_literal => Ok(Expr::RecordLit(self.field_map(p)?)),
            Rule::record_type => Ok(Expr::Record(self.field_map(p)?)),
            Rule::union => self.union(p),
            Rule::nonempty_list_literal => {
                let elems = p
                    .into_inner()
                    .map(|e| self.expr(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::ListLit(None, elems))
            }
            Rule::builtin => Ok(builtin(p.as_str())),
            Rule::identifier => Ok(self.identifier(p)),
            Rule::paren_expression => self.expr(p.into_inner().next().unwrap()),
            _ => unreachable!(),
        }
    }

    fn identifier(&self, p: Pair<Rule>) -> Expr {
        let mut it = p.into_inner();
        let name = self.label(it.next().unwrap());
        let index = it.next().map_or(0, |n| n.as_str().parse().unwrap());
        Expr::Var(Var::new(name, index))
    }

    fn label(&self, p: Pair<Rule>) -> Label {
        match p.as_rule() {
            Rule::simple_label => p.as_str().to_string(),
            Rule::backtick_label => {
                let s = p.as_str();
                s[1..s.len() - 1].to_string()
            }
            _ => unreachable!(),
        }
    }

    fn field_map(&self, p: Pair<Rule>) -> Result<FieldMap, Error> {
        let mut m = FieldMap::new();
        for entry in p.into_inner() {
            let loc = Loc::from(entry.as_span());
            let mut it = entry.into_inner();
            let k = self.label(it.next().unwrap());
            let v = self.expr(it.next().unwrap())?;
            if m.insert(k, v).is_some() {
                return Err(Error::DuplicateLabel(loc));
            }
        }
        Ok(m)
    }

    fn union(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        let mut active: Option<(Label, Expr)> = None;
        let mut rest = FieldMap::new();
        for entry in p.into_inner() {
            let loc = Loc::from(entry.as_span());
            let literal = entry.as_rule() == Rule::union_literal_entry;
            let mut it = entry.into_inner();
            let k = self.label(it.next().unwrap());
            let v = self.expr(it.next().unwrap())?;
            if rest.contains_key(&k) || active.as_ref().is_some_and(|(a, _)| *a == k) {
                return Err(Error::DuplicateLabel(loc));
            }
            if literal {
                if active.is_some() {
                    return Err(Error::ExtraUnionActive(loc));
                }
                active = Some((k, v));
            } else {
                rest.insert(k, v);
            }
        }
        Ok(match active {
            Some((k, v)) => Expr::UnionLit(k, Box::new(v), rest),
            None => Expr::Union(rest),
        })
    }

    fn double_quote(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        let mut chunks = Chunks::default();
        for c in p.into_inner() {
            match c.as_rule() {
                Rule::double_quote_chars => chunks.push_text(c.as_str()),
                Rule::double_quote_escaped => {
                    chunks.push_text(decode_escape(c.as_str()).encode_utf8(&mut [0; 4]))
                }
                Rule::interpolation => {
                    let e = self.expr(c.into_inner().next().unwrap())?;
                    chunks.push(e, String::new());
                }
                _ => unreachable!(),
            }
        }
        Ok(Expr::TextLit(chunks))
    }

    fn single_quote(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        let mut chunks = Chunks::default();
        for c in p.into_inner() {
            match c.as_rule() {
                Rule::single_quote_chars => chunks.push_text(c.as_str()),
                Rule::escaped_quote_pair => chunks.push_text("''"),
                Rule::escaped_interpolation => chunks.push_text("${"),
                Rule::interpolation => {
                    let e = self.expr(c.into_inner().next().unwrap())?;
                    chunks.push(e, String::new());
                }
                _ => unreachable!(),
            }
        }
        Ok(Expr::TextLit(chunks))
    }

    fn import(&self, p: Pair<Rule>) -> Result<Expr, Error> {
        let mut it = p.into_inner();
        let hashed = self.import_hashed(it.next().unwrap())?;
        let mode = match it.next() {
            Some(_) => ImportMode::RawText,
            None => ImportMode::Code,
        };
        Ok(Expr::Import(Import { hashed, mode }))
    }

    fn import_hashed(&self, p: Pair<Rule>) -> Result<ImportHashed, Error> {
        let mut it = p.into_inner();
        let kind_pair = it.next().unwrap();
        let kind = match kind_pair.as_rule() {
            Rule::missing_import => ImportKind::Missing,
            Rule::env_import => {
                let v = kind_pair.into_inner().next().unwrap();
                match v.as_rule() {
                    Rule::bash_env_var => ImportKind::Env(v.as_str().to_string()),
                    Rule::posix_env_var => ImportKind::Env(decode_posix(v.as_str())),
                    _ => unreachable!(),
                }
            }
            Rule::http_import => self.http(kind_pair)?,
            Rule::parent_path => local(FilePrefix::Parent, kind_pair),
            Rule::here_path => local(FilePrefix::Here, kind_pair),
            Rule::home_path => local(FilePrefix::Home, kind_pair),
            Rule::absolute_path => local(FilePrefix::Absolute, kind_pair),
            _ => unreachable!(),
        };
        let hash = it.next().map(|h| h.as_str()["sha256:".len()..].to_string());
        Ok(ImportHashed { kind, hash })
    }

    fn http(&self, p: Pair<Rule>) -> Result<ImportKind, Error> {
        let mut it = p.into_inner();
        let mut url = url(it.next().unwrap());
        for q in it {
            if q.as_rule() == Rule::import_hashed {
                url.headers = Some(Box::new(self.import_hashed(q)?));
            }
        }
        Ok(ImportKind::Remote(url))
    }
}

fn builtin(s: &str) -> Expr {
    use Builtin::*;
    match s {
        "Type" => Expr::Const(Const::Type),
        "Kind" => Expr::Const(Const::Kind),
        "Sort" => Expr::Const(Const::Sort),
        "True" => Expr::BoolLit(true),
        "False" => Expr::BoolLit(false),
        "Bool" => Expr::Builtin(Bool),
        "Natural" => Expr::Builtin(Natural),
        "Integer" => Expr::Builtin(Integer),
        "Double" => Expr::Builtin(Double),
        "Text" => Expr::Builtin(Text),
        "List" => Expr::Builtin(List),
        "Optional" => Expr::Builtin(Optional),
        "None" => Expr::Builtin(None),
        "Natural/fold" => Expr::Builtin(NaturalFold),
        "Natural/build" => Expr::Builtin(NaturalBuild),
        "Natural/isZero" => Expr::Builtin(NaturalIsZero),
        "Natural/even" => Expr::Builtin(NaturalEven),
        "Natural/odd" => Expr::Builtin(NaturalOdd),
        "Natural/toInteger" => Expr::Builtin(NaturalToInteger),
        "Natural/show" => Expr::Builtin(NaturalShow),
        "Integer/show" => Expr::Builtin(IntegerShow),
        "Integer/toDouble" => Expr::Builtin(IntegerToDouble),
        "Double/show" => Expr::Builtin(DoubleShow),
        "List/build" => Expr::Builtin(ListBuild),
        "List/fold" => Expr::Builtin(ListFold),
        "List/length" => Expr::Builtin(ListLength),
        "List/head" => Expr::Builtin(ListHead),
        "List/last" => Expr::Builtin(ListLast),
        "List/indexed" => Expr::Builtin(ListIndexed),
        "List/reverse" => Expr::Builtin(ListReverse),
        "Optional/build" => Expr::Builtin(OptionalBuild),
        "Optional/fold" => Expr::Builtin(OptionalFold),
        _ => unreachable!(),
    }
}

fn local(prefix: FilePrefix, p: Pair<Rule>) -> ImportKind {
    let mut parts: Vec<String> = p.into_inner().map(|c| c.as_str()[1..].to_string()).collect();
    let file = parts.pop().unwrap();
    ImportKind::Local(prefix, parts, file)
}

fn url(p: Pair<Rule>) -> Url {
    let mut u = Url {
        scheme: Scheme::Http,
        authority: String::new(),
        path: Vec::new(),
        file: String::new(),
        query: None,
        fragment: None,
        headers: None,
    };
    for q in p.into_inner() {
        match q.as_rule() {
            Rule::scheme => {
                if q.as_str() == "https" {
                    u.scheme = Scheme::Https;
                }
            }
            Rule::authority => u.authority = q.as_str().to_string(),
            Rule::url_path => {
                let mut parts: Vec<String> =
                    q.into_inner().map(|c| c.as_str()[1..].to_string()).collect();
                if let Some(file) = parts.pop() {
                    u.file = file;
                }
                u.path = parts;
            }
            Rule::query => u.query = Some(q.as_str().to_string()),
            Rule::url_fragment => u.fragment = Some(q.as_str().to_string()),
            _ => unreachable!(),
        }
    }
    u
}

fn decode_escape(s: &str) -> char {
    let body = &s[1..];
    match body.as_bytes()[0] {
        b'"' => '"',
        b'\\' => '\\',
        b'/' => '/',
        b'b' => '\u{0008}',
        b'f' => '\u{000C}',
        b'n' => '\n',
        b'r' => '\r',
        b't' => '\t',
        b'u' => {
            let code = u32::from_str_radix(&body[1..], 16).unwrap();
            char::from_u32(code).unwrap_or('\u{FFFD}')
        }
        _ => unreachable!(),
    }
}

fn decode_posix(s: &str) -> String {
    let body = &s[1..s.len() - 1];
    let mut out = String::new();
    let mut cs = body.chars();
    while let Some(c) = cs.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        out.push(match cs.next() {
            Some('"') => '"',
            Some('\\') => '\\',
            Some('a') => '\u{0007}',
            Some('b') => '\u{0008}',
            Some('f') => '\u{000C}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('v') => '\u{000B}',
            _ => unreachable!(),
        });
    }
    out
}
