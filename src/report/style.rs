//! Terminal styling shared by the console reporter and the CLI

use std::io::Write;

use colored::{ColoredString, Colorize};

use crate::error::{EvalError, Result};

pub(crate) const RULE_WIDTH: usize = 56;

pub(crate) fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}

pub(crate) fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}

pub(crate) fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}

pub(crate) fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

pub(crate) fn caution(s: &str) -> ColoredString {
    s.truecolor(240, 190, 90)
}

pub(crate) fn section<W: Write>(w: &mut W, title: &str) -> Result<()> {
    writeln!(w).map_err(io_err)?;
    writeln!(w, "  {}", title.white().bold()).map_err(io_err)?;
    writeln!(w, "  {}", dim(&"─".repeat(RULE_WIDTH))).map_err(io_err)
}

/// Key padded to `width`, then the value
pub(crate) fn kv<W: Write>(w: &mut W, key: &str, value: &str, width: usize) -> Result<()> {
    writeln!(w, "  {} {}", muted(&format!("{:<width$}", key, width = width)), value.white())
        .map_err(io_err)
}

/// Horizontal bar of `fraction` (0..=1) over `width` cells
pub(crate) fn bar(fraction: f64, width: usize) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub(crate) fn io_err(e: std::io::Error) -> EvalError {
    EvalError::PresentationError(format!("failed to write report: {}", e))
}
