//! Terminal.
//!
//! This module contains terminal related things: window title, progress indicator and the indented
//! detail lines printed while a step runs.

use crate::colors::*;
use std::fmt::Display;

// https://learn.microsoft.com/en-us/windows/console/console-virtual-terminal-sequences
#[doc(hidden)]
pub(crate) fn set_window_title(title: &str) {
    print!("\x1b]0;{title}\x1b\\");
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

// https://github.com/rust-lang/cargo/blob/cbd05082547daf4f10044bb2fc8a8eb8696a05d8/src/cargo/util/progress.rs#L163
#[doc(hidden)]
pub(crate) fn set_windows_progress(progress: Option<usize>) {
    let (state, progress) = if let Some(progress) = progress { (1, progress as f64) } else { (0, 0.0) };
    print!("\x1b]9;4;{state};{progress:.0}\x1b\\");
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

/// Prints an indented detail line of the running step.
pub(crate) fn detail(message: impl Display) {
    println!("   {message}");
}

/// Prints an indented warning line of the running step.
pub(crate) fn warning(message: impl Display) {
    let message = WARN_COLOR.paint(format!("⚠️  Warning: {message}"));
    println!("   {message}");
}

/// Prints captured output of a failed command verbatim, below a short header.
pub(crate) fn failed_output(program: &str, output: &str) {
    let header = ATTENTION_COLOR.paint(format!("❌ {program} output:"));
    println!("   {header}");
    for line in output.lines() {
        println!("      {line}");
    }
}

/// Returns the percentage of `done` out of `total`.
pub(crate) fn percent(done: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }

    done * 100 / total
}
