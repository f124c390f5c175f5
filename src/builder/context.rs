//! Context kinds, states and lifecycle bookkeeping

use crate::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use tracing::{debug, warn};

/// The six builder context kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// Root context
    ExperimentSet,
    /// Declares one dimension
    Dimension,
    /// Declares one problem instance
    Instance,
    /// Declares one experiment
    Experiment,
    /// Collects the runs of one experiment on one instance
    InstanceRuns,
    /// Collects the data points of one run
    Run,
}

impl ContextKind {
    /// Kebab-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExperimentSet => "experiment-set",
            Self::Dimension => "dimension",
            Self::Instance => "instance",
            Self::Experiment => "experiment",
            Self::InstanceRuns => "instance-runs",
            Self::Run => "run",
        }
    }

    /// Whether several children of kind `child` may be open at once
    #[must_use]
    pub const fn allows_concurrent(self, child: Self) -> bool {
        matches!(
            (self, child),
            (Self::ExperimentSet, Self::Experiment)
                | (Self::Experiment, Self::InstanceRuns)
                | (Self::InstanceRuns, Self::Run)
        )
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of a context handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextState {
    /// Accepting operations
    Open,
    /// Compiled into its node
    Closed,
    /// An operation failed or the handle was dropped while open
    Failed,
}

/// Open/closed/failed state plus open-children accounting of one context.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    kind: ContextKind,
    state: ContextState,
    open_children: Option<(ContextKind, usize)>,
    failed_children: Vec<String>,
}

impl Lifecycle {
    pub(crate) const fn new(kind: ContextKind) -> Self {
        Self {
            kind,
            state: ContextState::Open,
            open_children: None,
            failed_children: Vec::new(),
        }
    }

    pub(crate) const fn kind(&self) -> ContextKind {
        self.kind
    }

    pub(crate) const fn state(&self) -> ContextState {
        self.state
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state == ContextState::Open
    }

    /// Check that `op` may run: the context is open and has no open children.
    pub(crate) fn check_usable(&self, op: &str) -> Result<()> {
        match self.state {
            ContextState::Closed => {
                return Err(Error::lifecycle(self.kind, format!("{op} after close")))
            }
            ContextState::Failed => {
                return Err(Error::lifecycle(
                    self.kind,
                    format!("{op} on a failed context"),
                ))
            }
            ContextState::Open => {}
        }
        if let Some((child, count)) = self.open_children {
            return Err(Error::lifecycle(
                self.kind,
                format!("{op} while {count} {child} context(s) are open"),
            ));
        }
        Ok(())
    }

    /// Register a newly opened child of kind `child`.
    pub(crate) fn open_child(&mut self, child: ContextKind) -> Result<()> {
        if self.state == ContextState::Open {
            if let Some((open, count)) = self.open_children {
                if open == child && self.kind.allows_concurrent(child) {
                    self.open_children = Some((open, count + 1));
                    return Ok(());
                }
            }
        }
        self.check_usable(&format!("open {child} context"))?;
        self.open_children = Some((child, 1));
        Ok(())
    }

    /// A child left the open state, successfully or with `failure`.
    pub(crate) fn child_finished(&mut self, failure: Option<String>) {
        if let Some((_, count)) = &mut self.open_children {
            *count -= 1;
            if *count == 0 {
                self.open_children = None;
            }
        }
        if let Some(message) = failure {
            self.failed_children.push(message);
        }
    }

    /// Check that the context may close: usable and no child failed.
    pub(crate) fn check_closable(&self) -> Result<()> {
        self.check_usable("close")?;
        if self.failed_children.is_empty() {
            return Ok(());
        }
        Err(Error::validation(format!(
            "{} context has {} failed child context(s): {}",
            self.kind,
            self.failed_children.len(),
            self.failed_children.join("; ")
        )))
    }

    pub(crate) fn mark_closed(&mut self) {
        self.state = ContextState::Closed;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.state = ContextState::Failed;
    }
}

/// State guarded by a context's mutex.
pub(crate) trait Tracked: Send {
    fn lifecycle(&self) -> &Lifecycle;
    fn lifecycle_mut(&mut self) -> &mut Lifecycle;
}

/// Where a child reports that it left the open state.
pub(crate) trait ParentLink: Send + Sync {
    fn child_failed(&self, message: String);
}

impl<S: Tracked> ParentLink for Mutex<S> {
    fn child_failed(&self, message: String) {
        self.lock().lifecycle_mut().child_finished(Some(message));
    }
}

/// Run `f` on the state of an open context.
///
/// An error while the context is open fails it and is reported to `parent`,
/// so the parent's close fails too.
pub(crate) fn guarded<S: Tracked, T>(
    state: &Mutex<S>,
    parent: Option<&dyn ParentLink>,
    op: &str,
    f: impl FnOnce(&mut S) -> Result<T>,
) -> Result<T> {
    let mut guard = state.lock();
    let was_open = guard.lifecycle().is_open();
    let outcome = match guard.lifecycle().check_usable(op) {
        Ok(()) => f(&mut *guard),
        Err(err) => Err(err),
    };
    match outcome {
        Ok(value) => Ok(value),
        Err(err) => {
            if was_open {
                guard.lifecycle_mut().mark_failed();
                let kind = guard.lifecycle().kind();
                drop(guard);
                warn!(context = %kind, op, error = %err, "context failed");
                if let Some(parent) = parent {
                    parent.child_failed(format!("{kind} failed during {op}: {err}"));
                }
            }
            Err(err)
        }
    }
}

/// Register a new `child` on an open context, then run `f` on its state.
///
/// Unlike [`guarded`], concurrent siblings of the same kind do not block the
/// call. If `f` fails the registration is undone and the context fails.
pub(crate) fn opening<S: Tracked, T>(
    state: &Mutex<S>,
    parent: Option<&dyn ParentLink>,
    child: ContextKind,
    f: impl FnOnce(&mut S) -> Result<T>,
) -> Result<T> {
    let mut guard = state.lock();
    let was_open = guard.lifecycle().is_open();
    let outcome = match guard.lifecycle_mut().open_child(child) {
        Ok(()) => {
            let result = f(&mut *guard);
            if result.is_err() {
                guard.lifecycle_mut().child_finished(None);
            }
            result
        }
        Err(err) => Err(err),
    };
    match outcome {
        Ok(value) => {
            debug!(parent = %guard.lifecycle().kind(), %child, "child context opened");
            Ok(value)
        }
        Err(err) => {
            if was_open {
                guard.lifecycle_mut().mark_failed();
                let kind = guard.lifecycle().kind();
                drop(guard);
                warn!(context = %kind, %child, error = %err, "opening child failed");
                if let Some(parent) = parent {
                    parent.child_failed(format!("{kind} failed opening {child}: {err}"));
                }
            }
            Err(err)
        }
    }
}

/// Fail a context whose handle is dropped while still open.
pub(crate) fn abandon<S: Tracked>(state: &Mutex<S>, parent: Option<&dyn ParentLink>) {
    let mut guard = state.lock();
    if !guard.lifecycle().is_open() {
        return;
    }
    guard.lifecycle_mut().mark_failed();
    let kind = guard.lifecycle().kind();
    drop(guard);
    warn!(context = %kind, "context dropped while open");
    if let Some(parent) = parent {
        parent.child_failed(format!("{kind} context dropped while open"));
    }
}
