// SPDX: CC0-1.0

use crate::{
    lex::SubStr,
    parse::{Binding, Expr, ExprTyp, Program},
    Number,
};
use core::fmt;
use std::{cell::RefCell, collections::HashMap, rc::Rc, sync::Arc};

/// Deepest evaluation before giving up. Every nested subexpression and every
/// procedure application counts one level, so a recursive function of `x`
/// typically spends three levels per call. Sized for the 8 MiB main thread.
pub const MAX_DEPTH: usize = 800;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub const fn accepts(&self, found: usize) -> bool {
        match *self {
            Self::Exactly(n) => found == n,
            Self::AtLeast(n) => found >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, n) = match *self {
            Self::Exactly(n) => ("", n),
            Self::AtLeast(n) => ("at least ", n),
        };
        write!(
            f,
            "{prefix}{n} argument{s}",
            s = if n == 1 { "" } else { "s" }
        )
    }
}

#[derive(Debug)]
pub enum EvalErrTyp {
    WrongArity {
        name: String,
        arity: Arity,
        found: usize,
    },
    UndefinedIdent {
        text: SubStr,
    },
    NotANumber {
        name: &'static str,
        found: &'static str,
    },
    NotAList {
        name: &'static str,
        found: &'static str,
    },
    EmptyList {
        name: &'static str,
    },
    NotAProcedure {
        found: &'static str,
    },
    RecursionLimit,
}

#[derive(Debug)]
pub struct EvalErr {
    pub typ: EvalErrTyp,
    pub loc: Option<SubStr>, // none when a procedure is applied from outside an expression
}

impl fmt::Display for EvalErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.typ {
            EvalErrTyp::WrongArity { name, arity, found } => write!(
                f,
                "procedure '{name}' requires {arity}, but found {found}"
            ),

            EvalErrTyp::UndefinedIdent { text } => {
                write!(f, "undefined identifier '{}'", text.get())
            }

            EvalErrTyp::NotANumber { name, found } => {
                write!(f, "'{name}' expects numbers, but found a {found}")
            }

            EvalErrTyp::NotAList { name, found } => {
                write!(f, "'{name}' expects a list, but found a {found}")
            }

            EvalErrTyp::EmptyList { name } => write!(f, "'{name}' of an empty list"),

            EvalErrTyp::NotAProcedure { found } => {
                write!(f, "cannot call a {found}, it is not a procedure")
            }

            EvalErrTyp::RecursionLimit => write!(
                f,
                "evaluation went deeper than {MAX_DEPTH} levels of calls and nesting"
            ),
        }
    }
}

pub type BuiltinFn = fn(&[Value]) -> Result<Value, EvalErrTyp>;

pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub fun: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

pub struct Closure {
    name: Option<IdentKey>,
    params: Rc<[SubStr]>,
    body: Rc<[Expr]>,
    env: Env,
}

impl Closure {
    pub fn new(name: Option<IdentKey>, params: Rc<[SubStr]>, body: Rc<[Expr]>, env: Env) -> Self {
        Self {
            name,
            params,
            body,
            env,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(IdentKey::get)
    }
}

// the captured environment usually holds the closure itself, so it is left out
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name())
            .field(
                "params",
                &self.params.iter().map(SubStr::get).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub enum Procedure {
    Builtin(&'static Builtin),
    Closure(Rc<Closure>),
}

impl Procedure {
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(builtin) => builtin.name,
            Self::Closure(closure) => closure.name().unwrap_or("lambda"),
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Self::Builtin(builtin) => builtin.arity,
            Self::Closure(closure) => Arity::Exactly(closure.params.len()),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Number(Number),
    Bool(bool),
    List(Rc<[Value]>),
    Procedure(Procedure),
}

impl Value {
    pub fn nil() -> Self {
        Self::List(Rc::new([]))
    }

    pub fn as_number(&self) -> Option<Number> {
        match *self {
            Self::Number(num) => Some(num),
            _ => None,
        }
    }

    /// Everything except `#f` counts as true.
    pub const fn is_truthy(&self) -> bool {
        !matches!(self, Self::Bool(false))
    }

    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Bool(_) => "boolean",
            Self::List(_) => "list",
            Self::Procedure(_) => "procedure",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(num) => write!(f, "{num}"),
            Self::Bool(true) => write!(f, "#t"),
            Self::Bool(false) => write!(f, "#f"),
            Self::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::Procedure(Procedure::Builtin(builtin)) => {
                write!(f, "#<builtin {}>", builtin.name)
            }
            Self::Procedure(proc) => write!(f, "#<procedure {}>", proc.name()),
        }
    }
}

#[derive(Clone, Debug, Eq)]
pub enum IdentKey {
    Arc(SubStr),
    Static(&'static str),
}

impl PartialEq for IdentKey {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl core::hash::Hash for IdentKey {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.get().hash(state)
    }
}

// hash and equality both go through `get`, so lookups by `&str` agree
impl core::borrow::Borrow<str> for IdentKey {
    fn borrow(&self) -> &str {
        self.get()
    }
}

impl IdentKey {
    pub fn get(&self) -> &str {
        match self {
            Self::Arc(s) => s.get(),
            Self::Static(s) => s,
        }
    }
}

impl fmt::Display for IdentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

impl From<SubStr> for IdentKey {
    fn from(s: SubStr) -> Self {
        Self::Arc(s)
    }
}

impl From<&'static str> for IdentKey {
    fn from(s: &'static str) -> Self {
        Self::Static(s)
    }
}

impl From<String> for IdentKey {
    fn from(s: String) -> Self {
        Self::Arc(SubStr::all(Arc::new(s)))
    }
}

// a lambda bound in the frame it closes over, kept without the frame so the
// two do not own each other; lookups rebuild the closure
struct Lambda {
    name: IdentKey,
    params: Rc<[SubStr]>,
    body: Rc<[Expr]>,
}

impl Lambda {
    fn instantiate(&self, env: &Env) -> Value {
        Value::Procedure(Procedure::Closure(Rc::new(Closure::new(
            Some(self.name.clone()),
            Rc::clone(&self.params),
            Rc::clone(&self.body),
            env.clone(),
        ))))
    }
}

enum Bound {
    Value(Value),
    Lambda(Lambda),
}

#[derive(Default)]
struct Frame {
    vars: HashMap<IdentKey, Bound>,
    parent: Option<Env>,
}

/// Chain of binding frames. Cloning shares the frames, so closures observe
/// definitions made after they were created.
#[derive(Clone, Default)]
pub struct Env(Rc<RefCell<Frame>>);

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.0.borrow();
        f.debug_struct("Env")
            .field("names", &frame.vars.keys().map(IdentKey::get).collect::<Vec<_>>())
            .field("has_parent", &frame.parent.is_some())
            .finish()
    }
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        Self(Rc::new(RefCell::new(Frame {
            vars: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    /// Binds `name` in this frame, replacing any earlier binding.
    pub fn define(&self, name: impl Into<IdentKey>, val: Value) {
        self.0.borrow_mut().vars.insert(name.into(), Bound::Value(val));
    }

    /// Binds `name` to a procedure closing over this frame, so its body can
    /// refer to `name`. Returns the procedure.
    pub fn define_lambda(
        &self,
        name: impl Into<IdentKey>,
        params: Rc<[SubStr]>,
        body: Rc<[Expr]>,
    ) -> Value {
        let name = name.into();
        let lambda = Lambda {
            name: name.clone(),
            params,
            body,
        };
        let val = lambda.instantiate(self);
        self.0.borrow_mut().vars.insert(name, Bound::Lambda(lambda));
        val
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let frame = self.0.borrow();
        match frame.vars.get(name) {
            Some(Bound::Value(val)) => Some(val.clone()),
            Some(Bound::Lambda(lambda)) => Some(lambda.instantiate(self)),
            None => frame.parent.as_ref()?.lookup(name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Every name visible from this frame, with the value it resolves to.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let frame = self.0.borrow();
        let mut ret = match frame.parent {
            Some(ref parent) => parent.bindings(),
            None => Vec::new(),
        };
        for (key, bound) in &frame.vars {
            let val = match bound {
                Bound::Value(val) => val.clone(),
                Bound::Lambda(lambda) => lambda.instantiate(self),
            };
            match ret.iter_mut().find(|(name, _)| name == key.get()) {
                Some(shadowed) => shadowed.1 = val,
                None => ret.push((key.get().to_string(), val)),
            }
        }
        ret
    }

    /// Drops every binding of this frame. Closures stored in a frame keep it
    /// alive through their captured environment, so owners call this to
    /// release the cycle.
    pub fn clear(&self) {
        let vars = core::mem::take(&mut self.0.borrow_mut().vars);
        drop(vars);
    }

    fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn descends_from(&self, ancestor: &Env) -> bool {
        let mut cur = self.0.borrow().parent.clone();
        while let Some(env) = cur {
            if env.ptr_eq(ancestor) {
                return true;
            }
            cur = env.0.borrow().parent.clone();
        }
        false
    }

    /// Whether `val` holds a closure that can see this frame, directly or
    /// through values bound in the frames it captured.
    fn reachable_from(&self, val: &Value) -> bool {
        self.reaches(val, &mut Vec::new())
    }

    fn reaches(&self, val: &Value, seen: &mut Vec<*const RefCell<Frame>>) -> bool {
        match val {
            Value::List(items) => items.iter().any(|item| self.reaches(item, seen)),
            Value::Procedure(Procedure::Closure(closure)) => self.reaches_env(&closure.env, seen),
            Value::Number(_) | Value::Bool(_) | Value::Procedure(Procedure::Builtin(_)) => false,
        }
    }

    fn reaches_env(&self, env: &Env, seen: &mut Vec<*const RefCell<Frame>>) -> bool {
        let mut cur = Some(env.clone());
        while let Some(env) = cur {
            if env.ptr_eq(self) {
                return true;
            }
            // frames around this one existed before it and cannot point back
            if self.descends_from(&env) || seen.contains(&Rc::as_ptr(&env.0)) {
                return false;
            }
            seen.push(Rc::as_ptr(&env.0));

            let frame = env.0.borrow();
            for bound in frame.vars.values() {
                if let Bound::Value(val) = bound {
                    if self.reaches(val, seen) {
                        return true;
                    }
                }
            }
            cur = frame.parent.clone();
        }
        false
    }

    /// Drops the bindings of a frame that has finished evaluating, unless
    /// `result` still needs them. Bindings can only outlive their frame
    /// through the result, so this frees cycles between the frame and
    /// closures stored in it.
    fn release(&self, result: Option<&Value>) {
        if !result.is_some_and(|val| self.reachable_from(val)) {
            self.clear();
        }
    }
}

fn err(typ: EvalErrTyp, loc: &SubStr) -> EvalErr {
    EvalErr {
        typ,
        loc: Some(loc.clone()),
    }
}

fn eval_body(body: &[Expr], env: &Env, depth: usize) -> Result<Value, EvalErr> {
    let mut ret = Value::nil();
    for expr in body {
        ret = eval_at(expr, env, depth)?;
    }
    Ok(ret)
}

fn eval_call(
    head: &Expr,
    args: &[Expr],
    loc: &SubStr,
    env: &Env,
    depth: usize,
) -> Result<Value, EvalErr> {
    let fun = eval_at(head, env, depth + 1)?;
    let args = args
        .iter()
        .map(|arg| eval_at(arg, env, depth + 1))
        .collect::<Result<Vec<_>, _>>()?;
    match fun {
        Value::Procedure(proc) => apply_at(&proc, args, Some(loc), depth + 1),
        other => Err(err(
            EvalErrTyp::NotAProcedure {
                found: other.type_name(),
            },
            &head.loc,
        )),
    }
}

fn eval_define(name: &SubStr, value: &Expr, env: &Env, depth: usize) -> Result<Value, EvalErr> {
    match &value.typ {
        ExprTyp::Lambda { params, body } => {
            Ok(env.define_lambda(name.clone(), Rc::clone(params), Rc::clone(body)))
        }
        _ => {
            let val = eval_at(value, env, depth + 1)?;
            env.define(name.clone(), val.clone());
            Ok(val)
        }
    }
}

fn eval_let(
    bindings: &[Binding],
    body: &[Expr],
    recursive: bool,
    env: &Env,
    depth: usize,
) -> Result<Value, EvalErr> {
    let inner = env.child();
    let ret = bind_let(bindings, body, recursive, env, &inner, depth);
    inner.release(ret.as_ref().ok());
    ret
}

fn bind_let(
    bindings: &[Binding],
    body: &[Expr],
    recursive: bool,
    env: &Env,
    inner: &Env,
    depth: usize,
) -> Result<Value, EvalErr> {
    for Binding { name, value } in bindings {
        // letrec evaluates each binding where the earlier ones (and, through
        // closures, the later ones) are already visible
        if recursive {
            eval_define(name, value, inner, depth)?;
        } else {
            let val = eval_at(value, env, depth + 1)?;
            inner.define(name.clone(), val);
        }
    }
    eval_body(body, inner, depth)
}

fn eval_at(expr: &Expr, env: &Env, depth: usize) -> Result<Value, EvalErr> {
    if depth > MAX_DEPTH {
        return Err(err(EvalErrTyp::RecursionLimit, &expr.loc));
    }

    match &expr.typ {
        ExprTyp::Number(num) => Ok(Value::Number(*num)),

        ExprTyp::Bool(val) => Ok(Value::Bool(*val)),

        ExprTyp::Symbol => env.lookup(expr.loc.get()).ok_or_else(|| {
            err(
                EvalErrTyp::UndefinedIdent {
                    text: expr.loc.clone(),
                },
                &expr.loc,
            )
        }),

        ExprTyp::Call { head, args } => eval_call(head, args, &expr.loc, env, depth),

        ExprTyp::Lambda { params, body } => Ok(Value::Procedure(Procedure::Closure(Rc::new(
            Closure::new(None, Rc::clone(params), Rc::clone(body), env.clone()),
        )))),

        ExprTyp::If {
            cond,
            then,
            otherwise,
        } => {
            if eval_at(cond, env, depth + 1)?.is_truthy() {
                eval_at(then, env, depth + 1)
            } else if let Some(otherwise) = otherwise {
                eval_at(otherwise, env, depth + 1)
            } else {
                Ok(Value::nil())
            }
        }

        ExprTyp::Define { name, value } => eval_define(name, value, env, depth),

        ExprTyp::Let { bindings, body } => eval_let(bindings, body, false, env, depth),

        ExprTyp::LetRec { bindings, body } => eval_let(bindings, body, true, env, depth),
    }
}

fn apply_at(
    proc: &Procedure,
    args: Vec<Value>,
    loc: Option<&SubStr>,
    depth: usize,
) -> Result<Value, EvalErr> {
    let fail = |typ| EvalErr {
        typ,
        loc: loc.cloned(),
    };

    let arity = proc.arity();
    if !arity.accepts(args.len()) {
        return Err(fail(EvalErrTyp::WrongArity {
            name: proc.name().to_string(),
            arity,
            found: args.len(),
        }));
    }

    match proc {
        Procedure::Builtin(builtin) => (builtin.fun)(&args).map_err(fail),

        Procedure::Closure(closure) => {
            let env = closure.env.child();
            for (param, arg) in closure.params.iter().zip(args) {
                env.define(param.clone(), arg);
            }
            let ret = eval_body(&closure.body, &env, depth);
            env.release(ret.as_ref().ok());
            ret
        }
    }
}

/// Evaluates every expression of the program in order and returns the value
/// of the last one.
pub fn eval(prog: &Program, env: &Env) -> Result<Value, EvalErr> {
    eval_body(&prog.exprs, env, 0)
}

pub fn apply(proc: &Procedure, args: Vec<Value>) -> Result<Value, EvalErr> {
    apply_at(proc, args, None, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::Lexer, parse, stdlib};
    use approx::assert_relative_eq;

    fn run(env: &Env, src: &str) -> Result<Value, EvalErr> {
        let src = Arc::new(String::from(src));
        let prog = parse::parse(Lexer::new(&src)).unwrap();
        eval(&prog, env)
    }

    fn num(env: &Env, src: &str) -> Number {
        match run(env, src) {
            Ok(Value::Number(n)) => n,
            other => panic!("{src} gave {other:?}"),
        }
    }

    #[test]
    fn arithmetic() {
        let env = stdlib::standard_env();
        assert_eq!(num(&env, "(+ 1 2 3)"), 6.0);
        assert_eq!(num(&env, "(- 5)"), -5.0);
        assert_eq!(num(&env, "(- 10 1 2)"), 7.0);
        assert_eq!(num(&env, "(/ 2)"), 0.5);
        assert_eq!(num(&env, "(expt 2 10)"), 1024.0);
        assert_relative_eq!(num(&env, "(log (expt e 2))"), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn define_and_redefine() {
        let env = stdlib::standard_env();
        run(&env, "(define a 2)").unwrap();
        assert_eq!(num(&env, "(* a a)"), 4.0);
        run(&env, "(define a 3)").unwrap();
        assert_eq!(num(&env, "(* a a)"), 9.0);
    }

    #[test]
    fn recursion_through_define() {
        let env = stdlib::standard_env();
        run(
            &env,
            "(define fact (lambda (n) (if (<= n 1) 1 (* n (fact (- n 1))))))",
        )
        .unwrap();
        assert_eq!(num(&env, "(fact 10)"), 3628800.0);
    }

    #[test]
    fn closures_capture_environment() {
        let env = stdlib::standard_env();
        run(&env, "(define (adder n) (lambda (x) (+ x n)))").unwrap();
        run(&env, "(define add5 (adder 5))").unwrap();
        assert_eq!(num(&env, "(add5 1)"), 6.0);
    }

    #[test]
    fn letrec_allows_mutual_recursion() {
        let env = stdlib::standard_env();
        let src = "(letrec ((even (lambda (n) (if (= n 0) #t (odd (- n 1)))))
                            (odd (lambda (n) (if (= n 0) #f (even (- n 1))))))
                     (even 10))";
        assert!(matches!(run(&env, src), Ok(Value::Bool(true))));
        assert!(!env.contains("even"));
    }

    #[test]
    fn let_does_not_see_its_own_bindings() {
        let env = stdlib::standard_env();
        assert_eq!(num(&env, "(let ((a 1) (b 2)) (+ a b))"), 3.0);
        let err = run(&env, "(let ((a 1) (b a)) b)").unwrap_err();
        assert!(matches!(err.typ, EvalErrTyp::UndefinedIdent { .. }));
    }

    #[test]
    fn lists() {
        let env = stdlib::standard_env();
        let val = run(&env, "(cons 1 (list 2 3))").unwrap();
        assert_eq!(val.to_string(), "(1 2 3)");
        assert_eq!(num(&env, "(car (cdr (list 1 2 3)))"), 2.0);
        assert!(matches!(run(&env, "(null? (list))"), Ok(Value::Bool(true))));
    }

    #[test]
    fn errors() {
        let env = stdlib::standard_env();

        let err = run(&env, "(+ y 1)").unwrap_err();
        assert!(matches!(err.typ, EvalErrTyp::UndefinedIdent { ref text } if text.get() == "y"));

        let err = run(&env, "(abs 1 2)").unwrap_err();
        assert!(matches!(err.typ, EvalErrTyp::WrongArity { found: 2, .. }));

        let err = run(&env, "(+ 1 (list 2))").unwrap_err();
        assert!(matches!(err.typ, EvalErrTyp::NotANumber { name: "+", .. }));

        let err = run(&env, "(1 2)").unwrap_err();
        assert!(matches!(err.typ, EvalErrTyp::NotAProcedure { found: "number" }));
        assert_eq!(err.loc.unwrap().get(), "1");
    }

    // test threads get a small stack, the shell runs on the main thread
    fn on_main_sized_stack(f: impl FnOnce() + Send + 'static) {
        std::thread::Builder::new()
            .stack_size(8 << 20)
            .spawn(f)
            .unwrap()
            .join()
            .unwrap();
    }

    #[test]
    fn runaway_recursion_is_an_error() {
        on_main_sized_stack(|| {
            let env = stdlib::standard_env();
            run(&env, "(define (forever x) (forever x))").unwrap();
            let err = run(&env, "(forever 1)").unwrap_err();
            assert!(matches!(err.typ, EvalErrTyp::RecursionLimit));
            // still usable afterwards
            assert_eq!(num(&env, "(+ 1 1)"), 2.0);
            env.clear();
        });
    }

    #[test]
    fn ordinary_recursion_fits() {
        on_main_sized_stack(|| {
            let env = stdlib::standard_env();
            run(&env, "(define (sum x) (if (<= x 0) 0 (+ x (sum (- x 1)))))").unwrap();
            assert_eq!(num(&env, "(sum 200)"), 20100.0);
            env.clear();
        });
    }

    fn closure(val: Value) -> Rc<Closure> {
        match val {
            Value::Procedure(Procedure::Closure(closure)) => closure,
            other => panic!("expected a closure, found {other}"),
        }
    }

    #[test]
    fn letrec_frame_is_freed() {
        let env = stdlib::standard_env();
        let f = closure(run(&env, "(letrec ((f (lambda (n) n))) f)").unwrap());
        let frame = Rc::downgrade(&f.env.0);
        drop(f);
        env.clear();
        drop(env);
        assert!(frame.upgrade().is_none());
    }

    #[test]
    fn call_frame_with_inner_define_is_freed() {
        let env = stdlib::standard_env();
        run(
            &env,
            "(define (make) (define (g n) (if (= n 0) 0 (g (- n 1)))) g)",
        )
        .unwrap();
        let g = closure(run(&env, "(make)").unwrap());
        assert!(matches!(
            apply(&Procedure::Closure(Rc::clone(&g)), vec![Value::Number(3.0)]),
            Ok(Value::Number(n)) if n == 0.0
        ));
        let frame = Rc::downgrade(&g.env.0);
        drop(g);
        assert!(frame.upgrade().is_none());
        env.clear();
    }

    #[test]
    fn finished_frames_are_emptied() {
        let env = stdlib::standard_env();
        let frame = env.child();
        // a closure stored in the frame, over a frame inside it
        let inner = frame.child();
        inner.define("j", Value::Number(1.0));
        let h = Value::Procedure(Procedure::Closure(Rc::new(Closure::new(
            None,
            Rc::new([]),
            Rc::new([]),
            inner,
        ))));
        frame.define("h", h.clone());

        frame.release(Some(&h));
        assert!(frame.contains("h"));
        frame.release(Some(&Value::List(Rc::new([h]))));
        assert!(frame.contains("h"));

        frame.release(Some(&Value::Number(1.0)));
        assert!(!frame.contains("h"));
        env.clear();
    }

    #[test]
    fn escaping_closures_keep_their_frames() {
        let env = stdlib::standard_env();
        run(&env, "(define (wrap v) (lambda () v))").unwrap();
        // `g` escapes through the frame of `wrap`, not directly
        run(&env, "(define (outer n) (define (g) n) (wrap g))").unwrap();
        assert_eq!(num(&env, "(((outer 5)))"), 5.0);

        let src = "((car (list (letrec ((f (lambda (n) (if (= n 0) 1 (* n (f (- n 1))))))) f))) 5)";
        assert_eq!(num(&env, src), 120.0);
        env.clear();
    }

    #[test]
    fn apply_from_outside() {
        let env = stdlib::standard_env();
        let Some(Value::Procedure(abs)) = env.lookup("abs") else {
            panic!("abs is not a procedure");
        };
        let val = apply(&abs, vec![Value::Number(-3.0)]).unwrap();
        assert_eq!(val.as_number(), Some(3.0));
    }
}
