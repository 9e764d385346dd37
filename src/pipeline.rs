//! Installation pipeline.
//!
//! This module contains the pipeline running the steps of an installation plan one after another.

use crate::colors::*;
use crate::context::InstallContext;
use crate::step::{Severity, Step, StepOutcome};
use crate::terminal::{self, set_window_title, set_windows_progress};
use tracing::{debug, instrument, warn};

/// The error returned when a fatal step fails.
#[derive(Debug, thiserror::Error)]
pub(crate) enum PipelineError {
    /// The step at the given (1-based) index failed.
    #[error("{name} failed: {cause:#}")]
    StepFailed { index: usize, name: String, cause: anyhow::Error },
}

/// Counts of what happened during a successful run.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct PipelineSummary {
    /// Steps whose action ran.
    pub(crate) completed: usize,
    /// Steps whose check reported the end-state as present.
    pub(crate) skipped: usize,
    /// Steps that failed but were downgraded to a warning.
    pub(crate) warnings: usize,
}

/// The ordered, immutable list of steps of one run.
#[derive(Debug)]
pub(crate) struct Pipeline<'a> {
    steps: Vec<Step<'a>>,
}

impl<'a> Pipeline<'a> {
    /// Creates a new `Pipeline` out of the given steps.
    pub(crate) fn new(steps: Vec<Step<'a>>) -> Self {
        Self { steps }
    }

    /// Returns the number of steps.
    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns the names of the steps in order.
    pub(crate) fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(Step::name)
    }

    /// Runs all steps in order and stops at the first failing fatal step.
    #[instrument(level = "trace", skip_all)]
    pub(crate) fn run(&self, ctx: &mut InstallContext) -> Result<PipelineSummary, PipelineError> {
        let total = self.len();
        let mut summary = PipelineSummary::default();

        for (i, step) in self.steps.iter().enumerate() {
            let index = i + 1;
            let name = step.name();
            println!("[{index}/{total}] {name}...");
            set_window_title(&format!("[{index}/{total}] {name}"));
            set_windows_progress(Some(terminal::percent(i, total)));

            match step.run(ctx) {
                Ok(StepOutcome::Done) => summary.completed += 1,
                Ok(StepOutcome::Skipped) => summary.skipped += 1,
                Err(cause) if step.severity() == Severity::WarnOnly => {
                    warn!(step = name, cause = %format!("{cause:#}"), "step failed, continuing");
                    terminal::warning(format!("{cause:#}"));
                    summary.warnings += 1;
                }
                Err(cause) => {
                    debug!(step = name, index, "step failed, stopping");
                    set_windows_progress(None);
                    return Err(PipelineError::StepFailed {
                        index,
                        name: name.to_string(),
                        cause,
                    });
                }
            }

            let completed = SUCCESS_COLOR.paint(format!("✅ {name} completed"));
            println!("{completed}");
            println!("{}", "-".repeat(50));
        }

        set_windows_progress(None);
        debug!(?summary);

        Ok(summary)
    }
}
