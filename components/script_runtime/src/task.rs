//! The deferred-work capability tracked by the scheduler.

use crate::context::RuntimeContext;
use core_types::ScriptError;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// The identity of a task registered with the scheduler.
///
/// Ids are process-unique, so the same underlying resource can never sit
/// in the pending set under two identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocates a fresh id.
    pub fn next() -> TaskId {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn raw(self) -> u64 {
        self.0
    }

    pub(crate) fn from_raw(raw: u64) -> TaskId {
        TaskId(raw)
    }
}

/// A unit of deferred work that keeps the run loop alive while pending.
///
/// Timers are the only task kind in this crate, but the contract is
/// generic so other completions (I/O, host events) compose without
/// touching the scheduler.
///
/// `startup` and `cleanup` run under the scheduler's pending-set lock and
/// must not re-enter `push`/`pull`. `execute` runs on the script thread
/// with the lock released; returning an error aborts the run loop.
pub trait Task: Send + Sync {
    /// The stable identity of this task.
    fn id(&self) -> TaskId;

    /// Called when the task is pushed onto the pending set.
    fn startup(&self, cx: &RuntimeContext);

    /// Called when the task is pulled from the pending set.
    fn cleanup(&self, cx: &RuntimeContext);

    /// Called on the script thread once the task signalled readiness.
    fn execute(&self, cx: &RuntimeContext) -> Result<(), ScriptError>;
}
