// SPDX: CC0-1.0

use crate::{
    eval::{self, Env, EvalErr, Procedure, Value},
    lex::{Lexer, SubStr, TokTyp},
    parse::{self, ParseErr, SPECIAL_FORMS},
    plot::{Curve, CurveSet, PlotConfig, MAX_FUNCTIONS},
    sample, stdlib, Number,
};
use core::{fmt, num::NonZeroUsize};
use log::{debug, info, warn};
use std::{collections::HashMap, rc::Rc, sync::Arc};

/// Lower integration bound used in place of non-positive ones on a
/// logarithmic plot.
pub const LOG_FLOOR: Number = 0.001;

/// Shown instead of an area that could not be computed.
pub const NOT_AVAILABLE: &str = "N/A";

const DERIVATIVE: &str = "derivative";
const LOG10FUNC: &str = "log10func";

#[derive(Debug)]
pub enum Cause {
    Parse(ParseErr),
    Eval(EvalErr),
    NotANumber { found: &'static str },
    InvalidId,
    UnknownId,
    NotSingle,
    NoRectangles,
    NonFiniteBounds,
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::Eval(err) => write!(f, "{err}"),
            Self::NotANumber { found } => write!(f, "result is a {found}, not a number"),
            Self::InvalidId => write!(f, "id must be a plain symbol"),
            Self::UnknownId => write!(f, "no function is registered under this id"),
            Self::NotSingle => write!(f, "expected exactly one expression"),
            Self::NoRectangles => write!(f, "rectangle count must be positive"),
            Self::NonFiniteBounds => write!(f, "integration bounds must be finite"),
        }
    }
}

#[derive(Debug)]
pub enum SchemerErrTyp {
    /// Carries the text the user wrote, never the internal id.
    InvalidFunctionExpression { expr: Arc<String> },
    CannotIntegrate { id: String },
    InvalidProgram { src: Arc<String> },
}

#[derive(Debug)]
pub struct SchemerErr {
    pub typ: SchemerErrTyp,
    pub cause: Cause,
}

impl fmt::Display for SchemerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.typ {
            SchemerErrTyp::InvalidFunctionExpression { expr } => {
                write!(f, "invalid function expression '{expr}': {}", self.cause)
            }
            SchemerErrTyp::CannotIntegrate { id } => {
                write!(f, "cannot integrate '{id}': {}", self.cause)
            }
            SchemerErrTyp::InvalidProgram { .. } => write!(f, "{}", self.cause),
        }
    }
}

impl std::error::Error for SchemerErr {}

impl SchemerErr {
    /// Span of the offending text, when the failure can be pinned to one.
    pub fn loc(&self) -> Option<&SubStr> {
        match &self.cause {
            Cause::Parse(err) => Some(&err.loc),
            Cause::Eval(err) => err.loc.as_ref(),
            _ => None,
        }
    }
}

/// Result of one rectangle-rule pass for the function at `index`.
#[derive(Debug)]
pub struct Area {
    pub index: usize,
    pub derivative: bool,
    pub value: Result<Number, SchemerErr>,
}

/// Registry of user functions over a private environment.
#[derive(Debug)]
pub struct Schemer {
    env: Env,
    exprs: HashMap<String, Arc<String>>,
}

impl Default for Schemer {
    fn default() -> Self {
        Self::new()
    }
}

// closures hold the environment that holds them
impl Drop for Schemer {
    fn drop(&mut self) {
        self.env.clear();
    }
}

pub fn function_id(index: usize) -> String {
    format!("f{index}")
}

/// Real magnitudes at the ends of a log-transformed y range.
pub fn log_extremes(y_min: Number, y_max: Number) -> (Number, Number) {
    (Number::powf(10.0, y_min), Number::powf(10.0, y_max))
}

pub fn format_area(area: Number) -> String {
    format!("{area:.4}")
}

fn is_plain_symbol(id: &str) -> bool {
    let src = Arc::new(String::from(id));
    let mut toks = Lexer::new(&src);
    match (toks.next(), toks.next()) {
        (Some(Ok(tok)), None) => {
            tok.typ == TokTyp::Symbol && tok.loc.get() == id && !SPECIAL_FORMS.contains(&id)
        }
        _ => false,
    }
}

impl Schemer {
    pub fn new() -> Self {
        Self {
            env: stdlib::standard_env(),
            exprs: HashMap::new(),
        }
    }

    /// Binds `id` to a one-argument procedure of `x` whose body is `expr`.
    ///
    /// Registering an id again replaces the earlier function. On failure any
    /// earlier function under `id` is left alone.
    pub fn register_function(&mut self, expr: &str, id: &str) -> Result<(), SchemerErr> {
        let src = Arc::new(String::from(expr));
        let invalid = |cause| SchemerErr {
            typ: SchemerErrTyp::InvalidFunctionExpression {
                expr: Arc::clone(&src),
            },
            cause,
        };

        if !is_plain_symbol(id) {
            return Err(invalid(Cause::InvalidId));
        }

        let body = parse::parse(Lexer::new(&src))
            .map_err(|err| invalid(Cause::Parse(err)))?
            .into_single()
            .ok_or_else(|| invalid(Cause::NotSingle))?;

        let param = SubStr::all(Arc::new(String::from(stdlib::X)));
        self.env
            .define_lambda(id.to_string(), Rc::new([param]), Rc::new([body]));

        debug!("registered {id} = {expr}");
        self.exprs.insert(id.to_string(), src);
        Ok(())
    }

    /// Text that `id` was registered with.
    pub fn expression(&self, id: &str) -> Option<&str> {
        self.exprs.get(id).map(|s| s.as_str())
    }

    /// Names visible in the environment, for suggestions.
    pub fn names(&self) -> Vec<String> {
        self.env
            .bindings()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    fn source_of(&self, id: &str) -> Arc<String> {
        match self.exprs.get(id) {
            Some(src) => Arc::clone(src),
            None => Arc::new(id.to_string()),
        }
    }

    fn procedure(&self, name: &str) -> Result<Procedure, Cause> {
        match self.env.lookup(name) {
            Some(Value::Procedure(proc)) => Ok(proc),
            _ => Err(Cause::UnknownId),
        }
    }

    // applies a one-argument procedure that returns a procedure
    fn compose(&self, wrapper: &str, inner: Procedure) -> Result<Procedure, Cause> {
        let wrapper = self.procedure(wrapper)?;
        match eval::apply(&wrapper, vec![Value::Procedure(inner)]).map_err(Cause::Eval)? {
            Value::Procedure(proc) => Ok(proc),
            other => Err(Cause::NotANumber {
                found: other.type_name(),
            }),
        }
    }

    fn target(&self, id: &str, derivative: bool) -> Result<Procedure, Cause> {
        let proc = self.procedure(id)?;
        if derivative {
            self.compose(DERIVATIVE, proc)
        } else {
            Ok(proc)
        }
    }

    fn sample_at(proc: &Procedure, x: Number) -> Result<Number, Cause> {
        let val = eval::apply(proc, vec![Value::Number(x)]).map_err(Cause::Eval)?;
        val.as_number().ok_or(Cause::NotANumber {
            found: val.type_name(),
        })
    }

    fn curve_values(
        &self,
        id: &str,
        derivative: bool,
        xs: &[Number],
        logarithmic: bool,
    ) -> Result<Vec<Number>, SchemerErr> {
        let fill = || -> Result<Vec<Number>, Cause> {
            let proc = self.target(id, derivative)?;
            xs.iter()
                .map(|&x| {
                    let y = Self::sample_at(&proc, x)?;
                    Ok(if logarithmic { y.abs().log10() } else { y })
                })
                .collect()
        };
        fill().map_err(|cause| SchemerErr {
            typ: SchemerErrTyp::InvalidFunctionExpression {
                expr: self.source_of(id),
            },
            cause,
        })
    }

    /// Values of `id` at each of `xs`, in order. Either every sample
    /// succeeds or the whole curve is an error.
    pub fn evaluate(
        &self,
        id: &str,
        xs: &[Number],
        logarithmic: bool,
    ) -> Result<Vec<Number>, SchemerErr> {
        self.curve_values(id, false, xs, logarithmic)
    }

    /// Like [`Schemer::evaluate`], for the forward-difference derivative.
    pub fn evaluate_derivative(
        &self,
        id: &str,
        xs: &[Number],
        logarithmic: bool,
    ) -> Result<Vec<Number>, SchemerErr> {
        self.curve_values(id, true, xs, logarithmic)
    }

    /// Left-rectangle sum of `id` (or its derivative) over `[a, b]`.
    pub fn integrate(
        &self,
        id: &str,
        a: Number,
        b: Number,
        rectangles: usize,
        derivative: bool,
        logarithmic: bool,
    ) -> Result<Number, SchemerErr> {
        self.rectangle_sum(id, a, b, rectangles, derivative, logarithmic)
            .map_err(|cause| SchemerErr {
                typ: SchemerErrTyp::CannotIntegrate { id: id.to_string() },
                cause,
            })
    }

    fn rectangle_sum(
        &self,
        id: &str,
        a: Number,
        b: Number,
        rectangles: usize,
        derivative: bool,
        logarithmic: bool,
    ) -> Result<Number, Cause> {
        if rectangles == 0 {
            return Err(Cause::NoRectangles);
        }
        if !a.is_finite() || !b.is_finite() {
            return Err(Cause::NonFiniteBounds);
        }

        let mut proc = self.target(id, derivative)?;
        let mut a = a;
        if logarithmic {
            proc = self.compose(LOG10FUNC, proc)?;
            if a <= 0.0 {
                info!("lower bound {a} of {id} raised to {LOG_FLOOR} for log scale");
                a = LOG_FLOOR;
            }
        }

        let h = (b - a) / rectangles as Number;
        let mut sum = 0.0;
        for k in 0..rectangles {
            sum += Self::sample_at(&proc, a + k as Number * h)?;
        }
        let area = h * sum;

        debug!("area of {id} over [{a}, {b}] with {rectangles} rectangles: {area}");
        Ok(if logarithmic { area.abs() } else { area })
    }

    /// Registers every non-blank function under its slot id. Returns the
    /// slots that registered, and the failures.
    pub fn register_all<S: AsRef<str>>(&mut self, functions: &[S]) -> (Vec<usize>, Vec<SchemerErr>) {
        if functions.len() > MAX_FUNCTIONS {
            warn!("only the first {MAX_FUNCTIONS} of {} functions are used", functions.len());
        }

        let mut registered = Vec::new();
        let mut errs = Vec::new();
        for (i, expr) in functions.iter().take(MAX_FUNCTIONS).enumerate() {
            let expr = expr.as_ref();
            if expr.trim().is_empty() {
                continue;
            }
            match self.register_function(expr, &function_id(i)) {
                Ok(()) => registered.push(i),
                Err(err) => errs.push(err),
            }
        }
        (registered, errs)
    }

    /// One redraw: registers every non-blank function and samples it (and
    /// its derivative, when shown) over the x range.
    ///
    /// Failed functions leave their slots empty and are reported together,
    /// once per function.
    pub fn draw<S: AsRef<str>>(
        &mut self,
        functions: &[S],
        config: &PlotConfig,
    ) -> (CurveSet, Vec<SchemerErr>) {
        let mut curves = CurveSet::new();
        let (registered, mut errs) = self.register_all(functions);

        let xs: Arc<[Number]> =
            sample::generate_points(NonZeroUsize::from(config.points), config.x.start, config.x.end)
                .into();

        for i in registered {
            let id = function_id(i);
            let mut passes = vec![(i, false)];
            if config.show_derivative {
                passes.push((CurveSet::derivative_slot(i), true));
            }
            for (slot, derivative) in passes {
                match self.curve_values(&id, derivative, &xs, config.logarithmic) {
                    Ok(ys) => match Curve::new(Arc::clone(&xs), ys) {
                        Some(curve) => {
                            if curves.insert(slot, curve).is_err() {
                                warn!("no curve slot {slot}");
                            }
                        }
                        None => warn!("curve of {id} has mismatched lengths"),
                    },
                    Err(err) => {
                        errs.push(err);
                        // one report per function
                        break;
                    }
                }
            }
        }

        (curves, errs)
    }

    /// Rectangle-rule areas for every non-blank function registered by an
    /// earlier [`Schemer::register_all`] or [`Schemer::draw`].
    pub fn areas<S: AsRef<str>>(
        &self,
        functions: &[S],
        config: &PlotConfig,
        plain: bool,
        derivative: bool,
    ) -> Vec<Area> {
        let rectangles = usize::from(config.rectangles.get());
        let (a, b) = (config.integral.start, config.integral.end);
        let mut ret = Vec::new();

        for (index, expr) in functions.iter().take(MAX_FUNCTIONS).enumerate() {
            if expr.as_ref().trim().is_empty() {
                continue;
            }
            let id = function_id(index);
            let passes = [(plain, false), (derivative, true)];
            for (_, derivative) in passes.into_iter().filter(|(wanted, _)| *wanted) {
                ret.push(Area {
                    index,
                    derivative,
                    value: self.integrate(&id, a, b, rectangles, derivative, config.logarithmic),
                });
            }
        }
        ret
    }

    /// Evaluates arbitrary program text in the registry's environment and
    /// returns the value of its last expression.
    pub fn eval_str(&self, text: &str) -> Result<Value, SchemerErr> {
        let src = Arc::new(String::from(text));
        let fail = |cause| SchemerErr {
            typ: SchemerErrTyp::InvalidProgram {
                src: Arc::clone(&src),
            },
            cause,
        };
        let prog = parse::parse(Lexer::new(&src)).map_err(|err| fail(Cause::Parse(err)))?;
        eval::eval(&prog, &self.env).map_err(|err| fail(Cause::Eval(err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ParseErrTyp;
    use approx::assert_relative_eq;
    use core::num::NonZeroU16;

    fn registered(pairs: &[(&str, &str)]) -> Schemer {
        let mut schemer = Schemer::new();
        for (expr, id) in pairs {
            schemer.register_function(expr, id).unwrap();
        }
        schemer
    }

    #[test]
    fn square_matches_closed_form() {
        let schemer = registered(&[("(* x x)", "f0")]);
        let xs = sample::generate_points(NonZeroUsize::new(10).unwrap(), -5.0, 5.0);
        let ys = schemer.evaluate("f0", &xs, false).unwrap();
        assert_eq!(ys.len(), xs.len());
        for (x, y) in xs.iter().zip(&ys) {
            assert_relative_eq!(*y, x * x, epsilon = 1e-9);
        }
    }

    #[test]
    fn derivative_of_square() {
        let schemer = registered(&[("(* x x)", "f0")]);
        let ys = schemer.evaluate_derivative("f0", &[2.0], false).unwrap();
        assert_relative_eq!(ys[0], 4.0, epsilon = 1e-2);
    }

    #[test]
    fn log_curve_uses_magnitude() {
        let schemer = registered(&[("(- 0 x)", "f0")]);
        let ys = schemer.evaluate("f0", &[100.0, 0.1], true).unwrap();
        assert_relative_eq!(ys[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(ys[1], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn log_derivative_curve() {
        let schemer = registered(&[("(* 10 x)", "f0")]);
        let ys = schemer.evaluate_derivative("f0", &[1.0, -3.0], true).unwrap();
        for y in ys {
            assert_relative_eq!(y, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn constant_integrates_exactly() {
        let schemer = registered(&[("1", "f0")]);
        let area = schemer.integrate("f0", 0.0, 10.0, 10, false, false).unwrap();
        assert_eq!(area, 10.0);
    }

    #[test]
    fn left_rectangles() {
        // x over [0, 1] with 2 rectangles samples 0 and 0.5
        let schemer = registered(&[("x", "f0")]);
        let area = schemer.integrate("f0", 0.0, 1.0, 2, false, false).unwrap();
        assert_relative_eq!(area, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn log_integration_clamps_lower_bound() {
        let schemer = registered(&[("(- 0 (* x x))", "f0")]);
        let clamped = schemer.integrate("f0", -5.0, 2.0, 10, false, true).unwrap();
        let floor = schemer.integrate("f0", LOG_FLOOR, 2.0, 10, false, true).unwrap();
        assert_eq!(clamped, floor);
        assert!(clamped >= 0.0);

        let zero = schemer.integrate("f0", 0.0, 2.0, 10, false, true).unwrap();
        assert_eq!(zero, floor);
    }

    #[test]
    fn derivative_integration() {
        // the derivative of x^2 over [0, 1] is 2x, so roughly 1 less a step
        let schemer = registered(&[("(* x x)", "f0")]);
        let area = schemer.integrate("f0", 0.0, 1.0, 100, true, false).unwrap();
        assert_relative_eq!(area, 0.99, epsilon = 1e-2);
    }

    #[test]
    fn log_derivative_integration() {
        // a slope of magnitude 10 is 1 on the log scale; a is raised to LOG_FLOOR
        let b = LOG_FLOOR + 2.0;
        for expr in ["(* 10 x)", "(- 0 (* 10 x))"] {
            let schemer = registered(&[(expr, "f0")]);
            let area = schemer.integrate("f0", -5.0, b, 10, true, true).unwrap();
            assert_relative_eq!(area, 2.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn empty_interval_is_zero() {
        let schemer = registered(&[("(* x x)", "f0")]);
        assert_eq!(schemer.integrate("f0", 0.0, 0.0, 10, false, false).unwrap(), 0.0);
    }

    #[test]
    fn degenerate_integration() {
        let schemer = registered(&[("(* x x)", "f0")]);
        let err = schemer.integrate("f0", 0.0, 1.0, 0, false, false).unwrap_err();
        assert!(matches!(err.cause, Cause::NoRectangles));
        let err = schemer
            .integrate("f0", Number::NEG_INFINITY, 1.0, 10, false, false)
            .unwrap_err();
        assert!(matches!(err.cause, Cause::NonFiniteBounds));
        let err = schemer.integrate("f9", 0.0, 1.0, 10, false, false).unwrap_err();
        assert!(matches!(err.typ, SchemerErrTyp::CannotIntegrate { ref id } if id == "f9"));
        assert!(matches!(err.cause, Cause::UnknownId));
    }

    #[test]
    fn reregistering_replaces_only_that_id() {
        let mut schemer = registered(&[("(* x x)", "f0"), ("(+ x 1)", "f1")]);
        schemer.register_function("(* 3 x)", "f0").unwrap();
        assert_eq!(schemer.evaluate("f0", &[2.0], false).unwrap(), [6.0]);
        assert_eq!(schemer.evaluate("f1", &[2.0], false).unwrap(), [3.0]);
        assert_eq!(schemer.expression("f0"), Some("(* 3 x)"));
    }

    #[test]
    fn malformed_expression_leaves_registry_usable() {
        let mut schemer = Schemer::new();
        let err = schemer.register_function("(* x", "f0").unwrap_err();
        assert!(
            matches!(err.typ, SchemerErrTyp::InvalidFunctionExpression { ref expr } if **expr == "(* x")
        );
        assert!(matches!(err.cause, Cause::Parse(_)));

        schemer.register_function("(* x 2)", "f0").unwrap();
        assert_eq!(schemer.evaluate("f0", &[4.0], false).unwrap(), [8.0]);
    }

    #[test]
    fn rejects_bad_ids_and_multiple_expressions() {
        let mut schemer = Schemer::new();
        for id in ["", "f 0", "(f)", "12", "lambda", "#t"] {
            let err = schemer.register_function("x", id).unwrap_err();
            assert!(matches!(err.cause, Cause::InvalidId), "accepted '{id}'");
        }
        let err = schemer.register_function("x x", "f0").unwrap_err();
        assert!(matches!(err.cause, Cause::NotSingle));
    }

    #[test]
    fn recursion_through_own_id() {
        let schemer = registered(&[("(if (<= x 1) 1 (* x (fact (- x 1))))", "fact")]);
        assert_eq!(schemer.evaluate("fact", &[5.0], false).unwrap(), [120.0]);
    }

    #[test]
    fn unbound_symbol_reports_expression_text() {
        let schemer = registered(&[("(* y y)", "f0")]);
        let err = schemer.evaluate("f0", &[1.0, 2.0], false).unwrap_err();
        assert!(
            matches!(err.typ, SchemerErrTyp::InvalidFunctionExpression { ref expr } if **expr == "(* y y)")
        );
        assert_eq!(err.loc().map(SubStr::get), Some("y"));
    }

    #[test]
    fn draw_fills_slots() {
        let mut schemer = Schemer::new();
        let config = PlotConfig {
            points: NonZeroU16::new(4).unwrap(),
            show_derivative: true,
            ..PlotConfig::default()
        };
        let functions = ["(* x x)", "", "(* x", "(car x)"];
        let (curves, errs) = schemer.draw(&functions, &config);

        let f0 = curves.get(0).unwrap();
        assert_eq!(f0.len(), 5);
        assert_eq!(f0.x()[0], 5.0);
        assert_eq!(f0.y()[0], 25.0);
        assert!(curves.get(CurveSet::derivative_slot(0)).is_some());

        for slot in [1, 2, 3] {
            assert!(curves.get(slot).is_none());
            assert!(curves.get(CurveSet::derivative_slot(slot)).is_none());
        }
        assert_eq!(errs.len(), 2);
        assert!(matches!(errs[0].cause, Cause::Parse(_)));
        assert!(matches!(errs[1].cause, Cause::Eval(_)));
    }

    #[test]
    fn register_all_reports_each_failure_once() {
        let mut schemer = Schemer::new();
        let functions = ["(car x)", "", "(* x", "x"];
        let (registered, errs) = schemer.register_all(&functions);
        assert_eq!(registered, [0, 3]);
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0].cause, Cause::Parse(_)));

        // (car x) only fails once it is evaluated
        let config = PlotConfig::default();
        let areas = schemer.areas(&["(car x)"], &config, true, false);
        assert_eq!(areas.len(), 1);
        let err = areas[0].value.as_ref().unwrap_err();
        assert!(matches!(err.typ, SchemerErrTyp::CannotIntegrate { ref id } if id == "f0"));
        assert!(matches!(err.cause, Cause::Eval(_)));
    }

    #[test]
    fn deep_expressions() {
        fn nested(depth: usize) -> String {
            format!("{}x{}", "(+ 1 ".repeat(depth), ")".repeat(depth))
        }
        std::thread::Builder::new()
            .stack_size(8 << 20)
            .spawn(|| {
                let mut schemer = Schemer::new();
                let err = schemer.register_function(&nested(500), "f0").unwrap_err();
                assert!(matches!(
                    err.cause,
                    Cause::Parse(ParseErr { typ: ParseErrTyp::TooDeep, .. })
                ));

                schemer.register_function(&nested(200), "f0").unwrap();
                assert_eq!(schemer.evaluate("f0", &[1.0], false).unwrap(), [201.0]);
            })
            .unwrap()
            .join()
            .unwrap();
    }

    #[test]
    fn areas_for_each_function() {
        let mut schemer = Schemer::new();
        let config = PlotConfig {
            integral: 0.0..10.0,
            ..PlotConfig::default()
        };
        let functions = ["1", "", "(* 2 x)"];
        let (_, errs) = schemer.draw(&functions, &config);
        assert!(errs.is_empty());

        let areas = schemer.areas(&functions, &config, true, true);
        let found: Vec<_> = areas.iter().map(|a| (a.index, a.derivative)).collect();
        assert_eq!(found, [(0, false), (0, true), (2, false), (2, true)]);
        assert_eq!(*areas[0].value.as_ref().unwrap(), 10.0);
        assert_relative_eq!(*areas[1].value.as_ref().unwrap(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(*areas[2].value.as_ref().unwrap(), 90.0, epsilon = 1e-9);
        assert_relative_eq!(*areas[3].value.as_ref().unwrap(), 20.0, epsilon = 1e-6);
    }

    #[test]
    fn formatting() {
        assert_eq!(format_area(core::f64::consts::PI), "3.1416");
        assert_eq!(format_area(10.0), "10.0000");
        let (lo, hi) = log_extremes(-1.0, 2.0);
        assert_relative_eq!(lo, 0.1, epsilon = 1e-12);
        assert_relative_eq!(hi, 100.0, epsilon = 1e-9);
        assert_eq!(function_id(3), "f3");
    }

    #[test]
    fn eval_str_shares_environment() {
        let schemer = registered(&[("(* x 10)", "f0")]);
        let val = schemer.eval_str("(define y 2) (f0 y)").unwrap();
        assert_eq!(val.as_number(), Some(20.0));
        assert!(schemer.names().iter().any(|name| name == "y"));
        assert!(schemer.eval_str("(f0").is_err());
    }
}
