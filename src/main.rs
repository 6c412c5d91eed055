// SPDX: CC0-1.0

use anyhow::Context;
use chrono::{DateTime, Local};
use core::num::NonZeroU16;
use log::{info, LevelFilter};
use schemer_plot::{
    engine::{self, Area, Cause, SchemerErr, NOT_AVAILABLE},
    eval::EvalErrTyp,
    lex::{LexErrTyp, TokTyp},
    parse::ParseErrTyp,
    plot::{self, Canvas, PlotConfig, MAX_FUNCTIONS},
    render,
    shell::{self, Command, Slot},
    Number, Schemer,
};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::{
    fs::OpenOptions,
    io::{stdout, BufWriter, Write},
    process::ExitCode,
};

const LOG_ENV: &str = "SCHEMER_LOG";

fn output_svg_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        "svg"
    )
}

fn log_level() -> LevelFilter {
    match std::env::var(LOG_ENV).as_deref() {
        Ok("error") => LevelFilter::Error,
        Ok("info") => LevelFilter::Info,
        Ok("debug") => LevelFilter::Debug,
        Ok("trace") => LevelFilter::Trace,
        Ok("off") => LevelFilter::Off,
        _ => LevelFilter::Warn,
    }
}

fn main() -> ExitCode {
    let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
    // fails only when a logger is already installed
    let _ = TermLogger::init(log_level(), config, TerminalMode::Stderr, ColorChoice::Auto);

    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct AreaLabels {
    function: String,
    derivative: String,
}

impl Default for AreaLabels {
    fn default() -> Self {
        Self {
            function: NOT_AVAILABLE.to_string(),
            derivative: NOT_AVAILABLE.to_string(),
        }
    }
}

#[derive(Debug)]
struct State {
    functions: [String; MAX_FUNCTIONS],
    schemer: Schemer,
    config: PlotConfig,
    canvas: Canvas,
    areas: [AreaLabels; MAX_FUNCTIONS],
}

fn try_main() -> anyhow::Result<()> {
    let mut state = State {
        functions: Default::default(),
        schemer: Schemer::new(),
        config: PlotConfig::default(),
        canvas: Canvas::default(),
        areas: Default::default(),
    };
    state.functions[0] = String::from("(* x x)");

    let mut stdout = BufWriter::new(stdout());
    loop {
        let defined = state.functions.iter().filter(|f| !f.is_empty()).count();
        writeln!(stdout, "{defined} of {MAX_FUNCTIONS} functions defined")?;

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::SetFunc => set_func(&mut stdout, &mut state)?,

                Command::ClearFunc => {
                    if let Ok(Some(Slot(i))) =
                        shell::read_fromstr::<_, Slot>(&mut stdout, "?function number = ", true)?
                    {
                        state.functions[i].clear();
                        state.areas[i] = AreaLabels::default();
                    }
                }

                Command::List => list(&mut stdout, &state)?,

                Command::SetWin => set_win(&mut stdout, &mut state)?,

                Command::SetRect => set_rect(&mut stdout, &mut state)?,

                Command::ToggleLog => {
                    state.config.logarithmic = !state.config.logarithmic;
                    writeln!(stdout, "logarithmic = {}", state.config.logarithmic)?;
                }

                Command::ToggleDeriv => {
                    state.config.show_derivative = !state.config.show_derivative;
                    writeln!(stdout, "show derivative = {}", state.config.show_derivative)?;
                }

                Command::Plot => plot_functions(&mut stdout, &mut state)?,

                Command::Area => compute_areas(&mut stdout, &mut state)?,

                Command::Eval => eval_input(&mut stdout, &mut state)?,
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn list<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    for (i, (expr, area)) in state.functions.iter().zip(&state.areas).enumerate() {
        if expr.is_empty() {
            writeln!(out, "f{i} is not set")?;
        } else {
            writeln!(
                out,
                "f{i}(x) = {expr}  area = {}  derivative area = {}",
                area.function, area.derivative
            )?;
        }
    }
    writeln!(out, "config = {:#}", state.config)?;
    Ok(())
}

fn set_func<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Ok(Some(Slot(i))) = shell::read_fromstr::<_, Slot>(&mut out, "?function number = ", true)?
    else {
        return Ok(());
    };
    let input = shell::input(&mut out, format_args!("f{i}(x) = "))?;
    if input.is_empty() {
        return Ok(());
    }

    let id = engine::function_id(i);
    match state.schemer.register_function(&input, &id) {
        Ok(()) => {
            state.functions[i] = input;
            state.areas[i] = AreaLabels::default();
        }
        Err(err) => report(&mut out, state, &err)?,
    }
    Ok(())
}

fn set_win<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "config = {:#}", state.config)?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip")?;

    let mut x = state.config.x.clone();
    let mut y = state.config.y.clone();
    for (name, dst) in [
        ("x min", &mut x.start),
        ("x max", &mut x.end),
        ("y min", &mut y.start),
        ("y max", &mut y.end),
    ] {
        match shell::read_fromstr::<_, Number>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }
    for (axis, range) in [("x", &x), ("y", &y)] {
        if !(range.end > range.start) {
            writeln!(out, "error: {axis} max must be greater than {axis} min")?;
            return Ok(());
        }
    }
    state.config.x = x;
    state.config.y = y;

    writeln!(out, "note: points must be a nonzero integer")?;
    read_count(&mut out, "points", &mut state.config.points)?;
    Ok(())
}

fn set_rect<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "note: leave blank to skip")?;
    let integral = &mut state.config.integral;
    for (name, dst) in [("a", &mut integral.start), ("b", &mut integral.end)] {
        match shell::read_fromstr::<_, Number>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    writeln!(out, "note: rectangles must be a nonzero integer")?;
    read_count(&mut out, "rectangles", &mut state.config.rectangles)?;
    Ok(())
}

fn read_count<W: Write>(mut out: W, name: &str, dst: &mut NonZeroU16) -> anyhow::Result<()> {
    if let Ok(Some(new)) = shell::read_fromstr::<_, NonZeroU16>(
        &mut out,
        format_args!("?{name} (is {cur}) = ", cur = *dst),
        true,
    )? {
        *dst = new;
    }
    Ok(())
}

fn plot_functions<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    if state.functions.iter().all(String::is_empty) {
        shell::no_functions(&mut out)?;
        return Ok(());
    }

    let (curves, errs) = state.schemer.draw(&state.functions, &state.config);
    for err in &errs {
        report(&mut out, state, err)?;
    }

    let scene = match plot::map(&state.config, &curves, state.canvas) {
        Ok(scene) => scene,
        Err(err) => {
            writeln!(out, "error: {err}")?;
            return Ok(());
        }
    };

    let svg_path = output_svg_filename(Local::now());
    let mut svg = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&svg_path)
            .context("failed to open output svg file")?,
    );
    render::write_svg(&mut svg, &scene).context("failed to write output svg file")?;
    svg.flush()?;
    svg.get_mut().sync_data()?;

    info!("wrote {} curves to {svg_path}", scene.curves.len());
    writeln!(out, "wrote {svg_path}")?;
    Ok(())
}

fn compute_areas<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    if state.functions.iter().all(String::is_empty) {
        shell::no_functions(&mut out)?;
        return Ok(());
    }

    let (registered, errs) = state.schemer.register_all(&state.functions);
    for err in &errs {
        report(&mut out, state, err)?;
    }

    // slots that failed to register were reported already
    let active: Vec<&str> = state
        .functions
        .iter()
        .enumerate()
        .map(|(i, f)| if registered.contains(&i) { f.as_str() } else { "" })
        .collect();
    let derivative = state.config.show_derivative;
    let areas = state
        .schemer
        .areas(&active, &state.config, true, derivative);
    for Area {
        index,
        derivative,
        value,
    } in areas
    {
        match value {
            Ok(area) => {
                let label = &mut state.areas[index];
                let dst = if derivative {
                    &mut label.derivative
                } else {
                    &mut label.function
                };
                *dst = engine::format_area(area);
                let kind = if derivative { "derivative area" } else { "area" };
                writeln!(out, "f{index}: {kind} = {dst}")?;
            }
            // previous labels stay as they were
            Err(err) => report(&mut out, state, &err)?,
        }
    }
    Ok(())
}

fn eval_input<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let input = shell::input(&mut out, "eval> ")?;
    if input.is_empty() {
        return Ok(());
    }
    match state.schemer.eval_str(&input) {
        Ok(val) => writeln!(out, "{val}")?,
        Err(err) => report(&mut out, state, &err)?,
    }
    Ok(())
}

fn report<W: Write>(mut out: W, state: &State, err: &SchemerErr) -> anyhow::Result<()> {
    writeln!(out)?;
    if let Some(loc) = err.loc() {
        shell::underline(&mut out, loc)?;
    }
    writeln!(out, "error: {err}")?;

    match &err.cause {
        Cause::Parse(parse_err) => match &parse_err.typ {
            ParseErrTyp::LexErr(LexErrTyp::InvalidChar) => writeln!(
                out,
                "note: '#' may only start the booleans #t and #f"
            )?,
            ParseErrTyp::LexErr(LexErrTyp::Unsupported(typ)) => match typ {
                TokTyp::XQuote | TokTyp::XQuasiQuote | TokTyp::XUnquote => {
                    writeln!(out, "note: quoting is not supported, use 'list' instead")?
                }
                TokTyp::XString => writeln!(out, "note: strings are not supported")?,
                _ => writeln!(out, "note: only round parentheses group expressions")?,
            },
            ParseErrTyp::ParenMismatch => {
                writeln!(out, "note: every '(' needs a matching ')'")?
            }
            ParseErrTyp::TooDeep => {
                writeln!(out, "note: split the expression into smaller definitions")?
            }
            _ => {}
        },

        Cause::Eval(eval_err) => match &eval_err.typ {
            EvalErrTyp::UndefinedIdent { text } => {
                suggest_similar(&mut out, state, text.get())?;
            }
            EvalErrTyp::NotAProcedure { .. } => writeln!(
                out,
                "note: implicit multiplication is not supported, so for example '2x' would be '(* 2 x)'"
            )?,
            EvalErrTyp::RecursionLimit => writeln!(
                out,
                "note: recursive functions need a base case that is always reached"
            )?,
            _ => {}
        },

        Cause::InvalidId => writeln!(out, "note: functions are named f0 to f{}", MAX_FUNCTIONS - 1)?,

        _ => {}
    }
    Ok(())
}

fn suggest_similar<W: Write>(mut out: W, state: &State, text: &str) -> anyhow::Result<()> {
    let text = text.to_ascii_lowercase();
    let most_similar = state
        .schemer
        .names()
        .into_iter()
        .map(|name| {
            (
                strsim::normalized_damerau_levenshtein(&text, &name.to_ascii_lowercase()),
                name,
            )
        })
        .reduce(|acc, elem| if elem.0 > acc.0 { elem } else { acc });
    if let Some((sim, name)) = most_similar {
        if sim > 0.3 {
            writeln!(out, "note: '{name}' has a similar name")?;
        }
    }
    Ok(())
}
