// SPDX: CC0-1.0

use crate::{
    eval::{self, Arity, Builtin, Env, EvalErrTyp, Procedure, Value},
    lex::Lexer,
    parse, Number,
};
use core::f64::consts;
use std::{rc::Rc, sync::Arc};

/// Formal parameter of every registered function.
pub const X: &str = "x";

/// Step of the forward difference used by `derivative`.
pub const DX: Number = 0.001;

// defined in the language itself, on top of the builtins
const PRELUDE: &str = "
(define (derivative f)
  (lambda (x) (/ (- (f (+ x dx)) (f x)) dx)))
(define (logB x B)
  (/ (log x) (log B)))
(define (log10func f)
  (lambda (x) (logB (abs (f x)) 10)))
";

macro_rules! builtin {
    ($name:literal, $arity:expr, $fun:expr) => {
        Builtin {
            name: $name,
            arity: $arity,
            fun: $fun,
        }
    };
}

pub static BUILTINS: &[Builtin] = &[
    builtin!("+", Arity::AtLeast(0), add),
    builtin!("-", Arity::AtLeast(1), sub),
    builtin!("*", Arity::AtLeast(0), mul),
    builtin!("/", Arity::AtLeast(1), div),
    builtin!("expt", Arity::Exactly(2), expt),
    builtin!("abs", Arity::Exactly(1), abs),
    builtin!("log", Arity::Exactly(1), log),
    builtin!("exp", Arity::Exactly(1), exp),
    builtin!("sqrt", Arity::Exactly(1), sqrt),
    builtin!("sin", Arity::Exactly(1), sin),
    builtin!("cos", Arity::Exactly(1), cos),
    builtin!("tan", Arity::Exactly(1), tan),
    builtin!("asin", Arity::Exactly(1), asin),
    builtin!("acos", Arity::Exactly(1), acos),
    builtin!("atan", Arity::Exactly(1), atan),
    builtin!("=", Arity::AtLeast(2), num_eq),
    builtin!("<", Arity::AtLeast(2), lt),
    builtin!(">", Arity::AtLeast(2), gt),
    builtin!("<=", Arity::AtLeast(2), le),
    builtin!(">=", Arity::AtLeast(2), ge),
    builtin!("not", Arity::Exactly(1), not),
    builtin!("cons", Arity::Exactly(2), cons),
    builtin!("list", Arity::AtLeast(0), list),
    builtin!("car", Arity::Exactly(1), car),
    builtin!("cdr", Arity::Exactly(1), cdr),
    builtin!("null?", Arity::Exactly(1), is_null),
];

/// Fresh environment holding the builtins, the constants and the prelude.
pub fn standard_env() -> Env {
    let env = Env::new();

    for builtin in BUILTINS {
        env.define(builtin.name, Value::Procedure(Procedure::Builtin(builtin)));
    }

    env.define("pi", Value::Number(consts::PI));
    env.define("e", Value::Number(consts::E));
    env.define("dx", Value::Number(DX));

    let src = Arc::new(String::from(PRELUDE));
    let loaded = parse::parse(Lexer::new(&src))
        .map_err(|err| err.to_string())
        .and_then(|prog| eval::eval(&prog, &env).map_err(|err| err.to_string()));
    if let Err(err) = loaded {
        unreachable!("prelude failed to load: {err}");
    }

    env
}

fn number(name: &'static str, val: &Value) -> Result<Number, EvalErrTyp> {
    val.as_number().ok_or(EvalErrTyp::NotANumber {
        name,
        found: val.type_name(),
    })
}

fn numbers(name: &'static str, args: &[Value]) -> Result<Vec<Number>, EvalErrTyp> {
    args.iter().map(|arg| number(name, arg)).collect()
}

fn items<'a>(name: &'static str, val: &'a Value) -> Result<&'a Rc<[Value]>, EvalErrTyp> {
    match val {
        Value::List(items) => Ok(items),
        other => Err(EvalErrTyp::NotAList {
            name,
            found: other.type_name(),
        }),
    }
}

fn unary(name: &'static str, args: &[Value], f: fn(Number) -> Number) -> Result<Value, EvalErrTyp> {
    let [x] = args else {
        unreachable!("arity of '{name}' is checked before the call");
    };
    Ok(Value::Number(f(number(name, x)?)))
}

// folds left over the arguments, or applies `single` to a lone argument
fn fold(
    name: &'static str,
    args: &[Value],
    identity: Number,
    single: fn(Number) -> Number,
    op: fn(Number, Number) -> Number,
) -> Result<Value, EvalErrTyp> {
    let nums = numbers(name, args)?;
    let ret = match nums.as_slice() {
        [] => identity,
        [x] => single(*x),
        [first, rest @ ..] => rest.iter().fold(*first, |acc, x| op(acc, *x)),
    };
    Ok(Value::Number(ret))
}

fn compare(
    name: &'static str,
    args: &[Value],
    op: fn(Number, Number) -> bool,
) -> Result<Value, EvalErrTyp> {
    let nums = numbers(name, args)?;
    Ok(Value::Bool(nums.windows(2).all(|pair| op(pair[0], pair[1]))))
}

pub fn add(args: &[Value]) -> Result<Value, EvalErrTyp> {
    fold("+", args, 0.0, |x| x, |a, b| a + b)
}

pub fn sub(args: &[Value]) -> Result<Value, EvalErrTyp> {
    fold("-", args, 0.0, |x| -x, |a, b| a - b)
}

pub fn mul(args: &[Value]) -> Result<Value, EvalErrTyp> {
    fold("*", args, 1.0, |x| x, |a, b| a * b)
}

pub fn div(args: &[Value]) -> Result<Value, EvalErrTyp> {
    fold("/", args, 1.0, |x| 1.0 / x, |a, b| a / b)
}

pub fn expt(args: &[Value]) -> Result<Value, EvalErrTyp> {
    let nums = numbers("expt", args)?;
    Ok(Value::Number(nums[0].powf(nums[1])))
}

pub fn abs(args: &[Value]) -> Result<Value, EvalErrTyp> {
    unary("abs", args, Number::abs)
}

pub fn log(args: &[Value]) -> Result<Value, EvalErrTyp> {
    unary("log", args, Number::ln)
}

pub fn exp(args: &[Value]) -> Result<Value, EvalErrTyp> {
    unary("exp", args, Number::exp)
}

pub fn sqrt(args: &[Value]) -> Result<Value, EvalErrTyp> {
    unary("sqrt", args, Number::sqrt)
}

pub fn sin(args: &[Value]) -> Result<Value, EvalErrTyp> {
    unary("sin", args, Number::sin)
}

pub fn cos(args: &[Value]) -> Result<Value, EvalErrTyp> {
    unary("cos", args, Number::cos)
}

pub fn tan(args: &[Value]) -> Result<Value, EvalErrTyp> {
    unary("tan", args, Number::tan)
}

pub fn asin(args: &[Value]) -> Result<Value, EvalErrTyp> {
    unary("asin", args, Number::asin)
}

pub fn acos(args: &[Value]) -> Result<Value, EvalErrTyp> {
    unary("acos", args, Number::acos)
}

pub fn atan(args: &[Value]) -> Result<Value, EvalErrTyp> {
    unary("atan", args, Number::atan)
}

pub fn num_eq(args: &[Value]) -> Result<Value, EvalErrTyp> {
    compare("=", args, |a, b| a == b)
}

pub fn lt(args: &[Value]) -> Result<Value, EvalErrTyp> {
    compare("<", args, |a, b| a < b)
}

pub fn gt(args: &[Value]) -> Result<Value, EvalErrTyp> {
    compare(">", args, |a, b| a > b)
}

pub fn le(args: &[Value]) -> Result<Value, EvalErrTyp> {
    compare("<=", args, |a, b| a <= b)
}

pub fn ge(args: &[Value]) -> Result<Value, EvalErrTyp> {
    compare(">=", args, |a, b| a >= b)
}

pub fn not(args: &[Value]) -> Result<Value, EvalErrTyp> {
    Ok(Value::Bool(!args[0].is_truthy()))
}

pub fn cons(args: &[Value]) -> Result<Value, EvalErrTyp> {
    let tail = items("cons", &args[1])?;
    let mut ret = Vec::with_capacity(tail.len() + 1);
    ret.push(args[0].clone());
    ret.extend(tail.iter().cloned());
    Ok(Value::List(ret.into()))
}

pub fn list(args: &[Value]) -> Result<Value, EvalErrTyp> {
    Ok(Value::List(args.into()))
}

pub fn car(args: &[Value]) -> Result<Value, EvalErrTyp> {
    items("car", &args[0])?
        .first()
        .cloned()
        .ok_or(EvalErrTyp::EmptyList { name: "car" })
}

pub fn cdr(args: &[Value]) -> Result<Value, EvalErrTyp> {
    match items("cdr", &args[0])?.split_first() {
        Some((_, rest)) => Ok(Value::List(rest.into())),
        None => Err(EvalErrTyp::EmptyList { name: "cdr" }),
    }
}

pub fn is_null(args: &[Value]) -> Result<Value, EvalErrTyp> {
    Ok(Value::Bool(items("null?", &args[0])?.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn call(env: &Env, name: &str, args: &[Number]) -> Number {
        let Some(Value::Procedure(proc)) = env.lookup(name) else {
            panic!("'{name}' is not a procedure");
        };
        let args = args.iter().copied().map(Value::Number).collect();
        eval::apply(&proc, args)
            .unwrap()
            .as_number()
            .unwrap()
    }

    fn procedure(env: &Env, src: &str) -> Procedure {
        let src = Arc::new(String::from(src));
        let prog = parse::parse(Lexer::new(&src)).unwrap();
        match eval::eval(&prog, env).unwrap() {
            Value::Procedure(proc) => proc,
            other => panic!("expected a procedure, found {other}"),
        }
    }

    #[test]
    fn builtins_are_bound() {
        let env = standard_env();
        for builtin in BUILTINS {
            assert!(env.contains(builtin.name), "{} missing", builtin.name);
        }
        assert_eq!(env.lookup("dx").and_then(|v| v.as_number()), Some(DX));
    }

    #[test]
    fn log_base() {
        let env = standard_env();
        assert_relative_eq!(call(&env, "logB", &[1000.0, 10.0]), 3.0, epsilon = 1e-12);
        assert_relative_eq!(call(&env, "logB", &[8.0, 2.0]), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn derivative_of_square() {
        let env = standard_env();
        let d = procedure(&env, "(derivative (lambda (x) (* x x)))");
        let val = eval::apply(&d, vec![Value::Number(2.0)])
            .unwrap()
            .as_number()
            .unwrap();
        assert_relative_eq!(val, 4.0, epsilon = 1e-2);
    }

    #[test]
    fn log10func_takes_magnitude() {
        let env = standard_env();
        let f = procedure(&env, "(log10func (lambda (x) (- 0 x)))");
        let val = eval::apply(&f, vec![Value::Number(100.0)])
            .unwrap()
            .as_number()
            .unwrap();
        assert_relative_eq!(val, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn comparisons_chain() {
        let env = standard_env();
        let check = |src: &str| {
            let src = Arc::new(String::from(src));
            let prog = parse::parse(Lexer::new(&src)).unwrap();
            eval::eval(&prog, &env).unwrap().is_truthy()
        };
        assert!(check("(<= 1 2 2 3)"));
        assert!(!check("(< 1 3 2)"));
        assert!(check("(= 2 2.0)"));
        assert!(check("(>= 3 2 1)"));
        assert!(check("(not (> 1 2))"));
    }

    #[test]
    fn division_by_zero_is_infinite() {
        let env = standard_env();
        assert_eq!(call(&env, "/", &[1.0, 0.0]), Number::INFINITY);
    }
}
