// SPDX: CC0-1.0

// recursive descent: tokens are first read into nested lists, which are then
// lowered into expressions with special forms recognized by their head symbol

use crate::{
    lex::{LexErr, LexErrTyp, Lexer, SubStr, Tok, TokTyp},
    Number,
};
use core::{fmt, iter::Peekable, num::ParseFloatError};
use std::rc::Rc;

pub const DEFINE: &str = "define";
pub const LAMBDA: &str = "lambda";
pub const IF: &str = "if";
pub const LET: &str = "let";
pub const LETREC: &str = "letrec";

pub const SPECIAL_FORMS: [&str; 5] = [DEFINE, LAMBDA, IF, LET, LETREC];

/// Deepest parenthesis nesting accepted by the reader.
pub const MAX_NESTING: usize = 256;

#[derive(Debug)]
pub enum ParseErrTyp {
    LexErr(LexErrTyp),
    ParseNum(ParseFloatError),
    ParenMismatch,
    TooDeep,
    Empty,
    EmptyCall,
    BadForm {
        form: &'static str,
        usage: &'static str,
    },
}

impl fmt::Display for ParseErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexErr(err) => write!(f, "{err}"),
            Self::ParseNum(err) => write!(f, "invalid number: {err}"),
            Self::ParenMismatch => write!(f, "mismatched parentheses"),
            Self::TooDeep => write!(f, "nested deeper than {MAX_NESTING} parentheses"),
            Self::Empty => write!(f, "expected an expression but found nothing"),
            Self::EmptyCall => write!(f, "cannot call an empty list"),
            Self::BadForm { form, usage } => {
                write!(f, "malformed '{form}', expected {usage}")
            }
        }
    }
}

#[derive(Debug)]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl fmt::Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at '{}'", self.typ, self.loc)
    }
}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Binding {
    pub name: SubStr,
    pub value: Expr,
}

#[derive(Clone, Debug)]
pub enum ExprTyp {
    Number(Number),
    Bool(bool),
    Symbol,
    Call {
        head: Box<Expr>,
        args: Vec<Expr>,
    },
    Lambda {
        params: Rc<[SubStr]>,
        body: Rc<[Expr]>,
    },
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },
    Define {
        name: SubStr,
        value: Box<Expr>,
    },
    Let {
        bindings: Vec<Binding>,
        body: Rc<[Expr]>,
    },
    LetRec {
        bindings: Vec<Binding>,
        body: Rc<[Expr]>,
    },
}

/// Immutable expression tree. Every node keeps the span it was parsed from.
#[derive(Clone, Debug)]
pub struct Expr {
    pub typ: ExprTyp,
    pub loc: SubStr,
}

impl Expr {
    /// Name of a symbol node.
    pub fn symbol(&self) -> Option<&str> {
        match self.typ {
            ExprTyp::Symbol => Some(self.loc.get()),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.loc.get())
    }
}

#[derive(Debug)]
pub struct Program {
    pub(crate) exprs: Vec<Expr>,
}

impl Program {
    #[inline]
    pub const fn new(exprs: Vec<Expr>) -> Self {
        Self { exprs }
    }

    /// Takes the only expression of the program.
    pub fn into_single(mut self) -> Option<Expr> {
        if self.exprs.len() == 1 {
            self.exprs.pop()
        } else {
            None
        }
    }
}

// reader output, before special forms are recognized
enum Datum {
    Atom(Tok),
    List { items: Vec<Datum>, loc: SubStr },
}

impl Datum {
    fn loc(&self) -> &SubStr {
        match self {
            Self::Atom(tok) => &tok.loc,
            Self::List { loc, .. } => loc,
        }
    }

    fn symbol(&self) -> Option<&SubStr> {
        match self {
            Self::Atom(Tok {
                typ: TokTyp::Symbol,
                loc,
            }) => Some(loc),
            _ => None,
        }
    }
}

fn read<I>(toks: &mut Peekable<I>, first: Tok, depth: usize) -> Result<Datum, ParseErr>
where
    I: Iterator<Item = Result<Tok, LexErr>>,
{
    match first.typ {
        TokTyp::OpenParen => {
            if depth >= MAX_NESTING {
                return Err(ParseErr {
                    typ: ParseErrTyp::TooDeep,
                    loc: first.loc,
                });
            }
            let mut loc = first.loc;
            let mut items = Vec::new();
            loop {
                let Some(tok) = toks.next() else {
                    return Err(ParseErr {
                        typ: ParseErrTyp::ParenMismatch,
                        loc,
                    });
                };
                let tok = tok?;
                if tok.typ == TokTyp::CloseParen {
                    loc.extend_to(&tok.loc);
                    return Ok(Datum::List { items, loc });
                }
                items.push(read(toks, tok, depth + 1)?);
            }
        }

        TokTyp::CloseParen => Err(ParseErr {
            typ: ParseErrTyp::ParenMismatch,
            loc: first.loc,
        }),

        _ => Ok(Datum::Atom(first)),
    }
}

fn bad_form(form: &'static str, usage: &'static str, loc: &SubStr) -> ParseErr {
    ParseErr {
        typ: ParseErrTyp::BadForm { form, usage },
        loc: loc.clone(),
    }
}

fn lower_body(items: Vec<Datum>) -> Result<Rc<[Expr]>, ParseErr> {
    items
        .into_iter()
        .map(lower)
        .collect::<Result<Vec<_>, _>>()
        .map(Rc::from)
}

fn lower_params(
    form: &'static str,
    usage: &'static str,
    items: Vec<Datum>,
) -> Result<Rc<[SubStr]>, ParseErr> {
    items
        .iter()
        .map(|param| param.symbol().cloned().ok_or_else(|| bad_form(form, usage, param.loc())))
        .collect::<Result<Vec<_>, _>>()
        .map(Rc::from)
}

fn lower_bindings(
    form: &'static str,
    usage: &'static str,
    datum: Datum,
) -> Result<Vec<Binding>, ParseErr> {
    let items = match datum {
        Datum::List { items, .. } => items,
        other => return Err(bad_form(form, usage, other.loc())),
    };
    items
        .into_iter()
        .map(|binding| match binding {
            Datum::List { mut items, loc } if items.len() == 2 => {
                let value = items.pop().map(lower).transpose()?;
                let name = items.pop().and_then(|name| name.symbol().cloned());
                match (name, value) {
                    (Some(name), Some(value)) => Ok(Binding { name, value }),
                    _ => Err(bad_form(form, usage, &loc)),
                }
            }
            other => Err(bad_form(form, usage, other.loc())),
        })
        .collect()
}

fn lower_special(
    form: &'static str,
    mut items: Vec<Datum>,
    loc: &SubStr,
) -> Result<ExprTyp, ParseErr> {
    // drop the head symbol
    items.remove(0);

    match form {
        DEFINE => {
            const USAGE: &str = "(define name expr) or (define (name params...) body...)";
            if items.len() < 2 {
                return Err(bad_form(DEFINE, USAGE, loc));
            }
            let target = items.remove(0);
            match target {
                Datum::List {
                    items: mut signature,
                    loc: sig_loc,
                } => {
                    if signature.is_empty() {
                        return Err(bad_form(DEFINE, USAGE, &sig_loc));
                    }
                    let name = signature
                        .remove(0)
                        .symbol()
                        .cloned()
                        .ok_or_else(|| bad_form(DEFINE, USAGE, &sig_loc))?;
                    let params = lower_params(DEFINE, USAGE, signature)?;
                    let body = lower_body(items)?;
                    Ok(ExprTyp::Define {
                        name,
                        value: Box::new(Expr {
                            typ: ExprTyp::Lambda { params, body },
                            loc: loc.clone(),
                        }),
                    })
                }
                atom => {
                    let name = atom
                        .symbol()
                        .cloned()
                        .ok_or_else(|| bad_form(DEFINE, USAGE, atom.loc()))?;
                    if items.len() != 1 {
                        return Err(bad_form(DEFINE, USAGE, loc));
                    }
                    let value = items.pop().map(lower).transpose()?;
                    let value = value.ok_or_else(|| bad_form(DEFINE, USAGE, loc))?;
                    Ok(ExprTyp::Define {
                        name,
                        value: Box::new(value),
                    })
                }
            }
        }

        LAMBDA => {
            const USAGE: &str = "(lambda (params...) body...)";
            if items.len() < 2 {
                return Err(bad_form(LAMBDA, USAGE, loc));
            }
            let params = match items.remove(0) {
                Datum::List { items: params, .. } => lower_params(LAMBDA, USAGE, params)?,
                other => return Err(bad_form(LAMBDA, USAGE, other.loc())),
            };
            let body = lower_body(items)?;
            Ok(ExprTyp::Lambda { params, body })
        }

        IF => {
            const USAGE: &str = "(if cond then) or (if cond then else)";
            if !(2..=3).contains(&items.len()) {
                return Err(bad_form(IF, USAGE, loc));
            }
            let mut exprs = items.into_iter().map(lower);
            let cond = exprs.next().transpose()?;
            let then = exprs.next().transpose()?;
            let otherwise = exprs.next().transpose()?.map(Box::new);
            match (cond, then) {
                (Some(cond), Some(then)) => Ok(ExprTyp::If {
                    cond: Box::new(cond),
                    then: Box::new(then),
                    otherwise,
                }),
                _ => Err(bad_form(IF, USAGE, loc)),
            }
        }

        LET | LETREC => {
            let (form, usage) = if form == LET {
                (LET, "(let ((name expr)...) body...)")
            } else {
                (LETREC, "(letrec ((name expr)...) body...)")
            };
            if items.len() < 2 {
                return Err(bad_form(form, usage, loc));
            }
            let bindings = lower_bindings(form, usage, items.remove(0))?;
            let body = lower_body(items)?;
            if form == LET {
                Ok(ExprTyp::Let { bindings, body })
            } else {
                Ok(ExprTyp::LetRec { bindings, body })
            }
        }

        _ => unreachable!("'{form}' is not a special form"),
    }
}

fn lower(datum: Datum) -> Result<Expr, ParseErr> {
    match datum {
        Datum::Atom(tok) => {
            let typ = match tok.typ {
                TokTyp::Number => match tok.loc.get().parse() {
                    Ok(num) => ExprTyp::Number(num),
                    Err(err) => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::ParseNum(err),
                            loc: tok.loc,
                        })
                    }
                },
                TokTyp::Bool(val) => ExprTyp::Bool(val),
                TokTyp::Symbol => ExprTyp::Symbol,
                _ => unreachable!("reader only yields atoms for numbers, booleans and symbols"),
            };
            Ok(Expr { typ, loc: tok.loc })
        }

        Datum::List { items, loc } => {
            let Some(head) = items.first() else {
                return Err(ParseErr {
                    typ: ParseErrTyp::EmptyCall,
                    loc,
                });
            };

            let form = head
                .symbol()
                .and_then(|sym| SPECIAL_FORMS.into_iter().find(|form| *form == sym.get()));
            let typ = if let Some(form) = form {
                lower_special(form, items, &loc)?
            } else {
                let mut exprs = items.into_iter().map(lower);
                let head = exprs.next().transpose()?;
                let args = exprs.collect::<Result<Vec<_>, _>>()?;
                match head {
                    Some(head) => ExprTyp::Call {
                        head: Box::new(head),
                        args,
                    },
                    None => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::EmptyCall,
                            loc,
                        })
                    }
                }
            };
            Ok(Expr { typ, loc })
        }
    }
}

pub fn parse(lex: Lexer<'_>) -> Result<Program, ParseErr> {
    let src = SubStr::all(lex.src().clone());
    let mut toks = lex.peekable();
    let mut exprs = Vec::new();

    while let Some(tok) = toks.next() {
        let datum = read(&mut toks, tok?, 0)?;
        exprs.push(lower(datum)?);
    }

    if exprs.is_empty() {
        return Err(ParseErr {
            typ: ParseErrTyp::Empty,
            loc: src,
        });
    }

    Ok(Program::new(exprs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn parse_str(src: &str) -> Result<Program, ParseErr> {
        let src = Arc::new(String::from(src));
        parse(Lexer::new(&src))
    }

    #[test]
    fn call_tree() {
        let prog = parse_str("(+ (* x x) 1)").unwrap();
        let expr = prog.into_single().unwrap();
        let ExprTyp::Call { head, args } = expr.typ else {
            panic!("expected call, found {expr:?}");
        };
        assert_eq!(head.symbol(), Some("+"));
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].loc.get(), "(* x x)");
        assert!(matches!(args[1].typ, ExprTyp::Number(n) if n == 1.0));
    }

    #[test]
    fn define_sugar_becomes_lambda() {
        let expr = parse_str("(define (sq x) (* x x))")
            .unwrap()
            .into_single()
            .unwrap();
        let ExprTyp::Define { name, value } = expr.typ else {
            panic!("expected define");
        };
        assert_eq!(name.get(), "sq");
        assert!(matches!(value.typ, ExprTyp::Lambda { ref params, .. } if params.len() == 1));
    }

    #[test]
    fn several_top_level_exprs() {
        let prog = parse_str("(define a 1) (define b 2) (+ a b)").unwrap();
        assert_eq!(prog.exprs.len(), 3);
    }

    #[test]
    fn unbalanced_parens() {
        let err = parse_str("(* x").unwrap_err();
        assert!(matches!(err.typ, ParseErrTyp::ParenMismatch));
        assert_eq!(err.loc.get(), "(");

        let err = parse_str("x)").unwrap_err();
        assert!(matches!(err.typ, ParseErrTyp::ParenMismatch));
    }

    #[test]
    fn empty_inputs() {
        assert!(matches!(parse_str("  ").unwrap_err().typ, ParseErrTyp::Empty));
        assert!(matches!(parse_str("()").unwrap_err().typ, ParseErrTyp::EmptyCall));
    }

    #[test]
    fn malformed_special_forms() {
        for src in [
            "(lambda x x)",
            "(lambda (1) x)",
            "(if 1)",
            "(define 3 4)",
            "(let (x 1) x)",
            "(letrec ((f)) f)",
        ] {
            let err = parse_str(src).unwrap_err();
            assert!(
                matches!(err.typ, ParseErrTyp::BadForm { .. }),
                "{src} gave {err}"
            );
        }
    }

    fn nested(depth: usize) -> String {
        format!("{}x{}", "(+ 1 ".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn nesting_is_bounded() {
        let prog = parse_str(&nested(MAX_NESTING)).unwrap();
        assert_eq!(prog.exprs.len(), 1);

        let err = parse_str(&nested(MAX_NESTING + 1)).unwrap_err();
        assert!(matches!(err.typ, ParseErrTyp::TooDeep));
        assert_eq!(err.loc.get(), "(");
        assert_eq!(err.loc.start(), 5 * MAX_NESTING);

        let err = parse_str(&nested(10 * MAX_NESTING)).unwrap_err();
        assert!(matches!(err.typ, ParseErrTyp::TooDeep));
    }

    #[test]
    fn bad_number() {
        let err = parse_str("(+ 1.2.3 x)").unwrap_err();
        assert!(matches!(err.typ, ParseErrTyp::ParseNum(_)));
        assert_eq!(err.loc.get(), "1.2.3");
    }
}
