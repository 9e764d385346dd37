//! Installation step.
//!
//! This module contains the unit of work the pipeline is made of: a name, an optional idempotency
//! check, an action, an optional fallback chain and a severity policy.

use crate::context::InstallContext;
use std::fmt;
use tracing::{debug, trace, warn};

/// Predicate telling whether the desired end-state already holds.
pub(crate) type Check<'a> = Box<dyn Fn(&InstallContext) -> bool + 'a>;

/// The work of a step (or of one of its fallbacks).
pub(crate) type Action<'a> = Box<dyn Fn(&mut InstallContext) -> anyhow::Result<()> + 'a>;

/// How the pipeline treats a failing step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Severity {
    /// The failure aborts the pipeline.
    Fatal,
    /// The failure is reported as a warning, the pipeline continues.
    WarnOnly,
}

/// The result of a successful step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    /// The action (or one of its fallbacks) ran.
    Done,
    /// The check reported the end-state as already present, nothing ran.
    Skipped,
}

/// Error reported when the action and every fallback failed.
#[derive(Debug, thiserror::Error)]
#[error("{attempted} failed, please restart your terminal and run: {command}")]
pub(crate) struct FallbackExhausted {
    /// What the step tried to do in the first place.
    pub(crate) attempted: String,
    /// The command the operator should run manually.
    pub(crate) command: String,
}

/// A named unit of work.
pub(crate) struct Step<'a> {
    name: String,
    severity: Severity,
    check: Option<Check<'a>>,
    action: Action<'a>,
    fallbacks: Vec<Action<'a>>,
    remediation: Option<(String, String)>,
}

impl<'a> Step<'a> {
    /// Creates a new fatal `Step` without check and fallbacks.
    pub(crate) fn new<A>(name: impl Into<String>, action: A) -> Self
    where
        A: Fn(&mut InstallContext) -> anyhow::Result<()> + 'a,
    {
        Self {
            name: name.into(),
            severity: Severity::Fatal,
            check: None,
            action: Box::new(action),
            fallbacks: Vec::new(),
            remediation: None,
        }
    }

    /// Skips the action (and its fallbacks) whenever the check holds.
    pub(crate) fn skip_if<C>(mut self, check: C) -> Self
    where
        C: Fn(&InstallContext) -> bool + 'a,
    {
        self.check = Some(Box::new(check));

        self
    }

    /// Appends a fallback, tried in the order added once the action failed.
    pub(crate) fn fallback<A>(mut self, fallback: A) -> Self
    where
        A: Fn(&mut InstallContext) -> anyhow::Result<()> + 'a,
    {
        self.fallbacks.push(Box::new(fallback));

        self
    }

    /// Sets the manual remediation reported once all fallbacks are exhausted.
    pub(crate) fn remediation(mut self, attempted: impl Into<String>, command: impl Into<String>) -> Self {
        self.remediation = Some((attempted.into(), command.into()));

        self
    }

    /// Downgrades failures of this step to warnings.
    pub(crate) fn warn_only(mut self) -> Self {
        self.severity = Severity::WarnOnly;

        self
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn severity(&self) -> Severity {
        self.severity
    }

    /// Runs the step: check, then action, then fallbacks in order.
    pub(crate) fn run(&self, ctx: &mut InstallContext) -> anyhow::Result<StepOutcome> {
        if let Some(check) = &self.check {
            if check(ctx) {
                trace!(step = %self.name, "already satisfied");
                return Ok(StepOutcome::Skipped);
            }
        }

        let Err(err) = (self.action)(ctx) else {
            return Ok(StepOutcome::Done);
        };
        if self.fallbacks.is_empty() {
            return Err(err);
        }

        warn!(step = %self.name, err = %format!("{err:#}"), "action failed, trying fallbacks");
        let mut last_err = err;
        for (i, fallback) in self.fallbacks.iter().enumerate() {
            match fallback(ctx) {
                Ok(()) => return Ok(StepOutcome::Done),
                Err(err) => {
                    debug!(step = %self.name, fallback = i, err = %format!("{err:#}"), "fallback failed");
                    last_err = err;
                }
            }
        }

        match &self.remediation {
            Some((attempted, command)) => Err(FallbackExhausted {
                attempted: attempted.clone(),
                command: command.clone(),
            }
            .into()),
            None => Err(last_err),
        }
    }
}

impl fmt::Debug for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .field("check", &self.check.is_some())
            .field("fallbacks", &self.fallbacks.len())
            .finish()
    }
}
