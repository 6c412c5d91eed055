// SPDX: CC0-1.0

use crate::{lex::SubStr, plot::MAX_FUNCTIONS};
use anyhow::Context;
use core::fmt;
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    SetFunc,
    ClearFunc,
    List,
    SetWin,
    SetRect,
    ToggleLog,
    ToggleDeriv,
    Plot,
    Area,
    Eval,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::SetFunc,
            Self::ClearFunc,
            Self::List,
            Self::SetWin,
            Self::SetRect,
            Self::ToggleLog,
            Self::ToggleDeriv,
            Self::Plot,
            Self::Area,
            Self::Eval,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::SetFunc => "set one of the functions of x to plot",
            Self::ClearFunc => "remove one of the functions",
            Self::List => "list functions, settings and the last computed areas",
            Self::SetWin => "set window bounds and number of points",
            Self::SetRect => "set integration bounds and number of rectangles",
            Self::ToggleLog => "toggle logarithmic y axis",
            Self::ToggleDeriv => "toggle drawing and integrating derivatives",
            Self::Plot => "plot every function to an svg file",
            Self::Area => "approximate the area under every function",
            Self::Eval => "evaluate an expression (definitions are kept)",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::SetFunc => "set",
            Self::ClearFunc => "clear",
            Self::List => "list",
            Self::SetWin => "window",
            Self::SetRect => "rect",
            Self::ToggleLog => "log",
            Self::ToggleDeriv => "deriv",
            Self::Plot => "plot",
            Self::Area => "area",
            Self::Eval => "eval",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::exhaustive()
            .iter()
            .find(|c| c.name() == s)
            .copied()
            .ok_or(())
    }
}

/// Index of one of the function slots, as typed by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot(pub usize);

#[derive(Debug)]
pub struct SlotErr;

impl fmt::Display for SlotErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected a function number from 0 to {}", MAX_FUNCTIONS - 1)
    }
}

impl core::str::FromStr for Slot {
    type Err = SlotErr;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<usize>() {
            Ok(n) if n < MAX_FUNCTIONS => Ok(Self(n)),
            _ => Err(SlotErr),
        }
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut s = String::new();
        stdin().lock().read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    inner(out, prompt).context("read from standard input failed")
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input = Arc::new(input(&mut out, prompt)?);
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    let src = span.src();
    writeln!(out, "{src}")?;
    let before = &src[..span.start()];
    writeln!(
        out,
        "{}{}",
        " ".repeat(before.chars().count()),
        "^".repeat(span.get().chars().count().max(1))
    )?;
    Ok(())
}

pub fn no_functions<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "error: no function is defined, try \"set\"")
}
