//! The pending-task set, its signal channels, and the run loop.
//!
//! The loop waits on three outcomes: a quit signal (fatal), a ready task
//! (execute it), or an empty pending set (the only successful exit). It
//! never polls; between outcomes it blocks on the channels. The pending
//! set, its insert/remove operations, and the loop's emptiness check share
//! one exclusive lock, which is never held across `execute`.

use crate::context::RuntimeContext;
use crate::task::{Task, TaskId};
use core_types::{ScriptError, ScriptResult};
use crossbeam::channel::{after, bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use script_engine::ScriptEngine;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// The signal channels feeding the run loop.
///
/// Ready signals arrive in FIFO order on an unbounded channel. The quit
/// channel holds a single slot: the first fatal error wins and later
/// signals are dropped on the floor.
pub(crate) struct Signals {
    ready_tx: Sender<TaskId>,
    ready_rx: Receiver<TaskId>,
    quit_tx: Sender<ScriptError>,
    quit_rx: Receiver<ScriptError>,
}

impl Signals {
    pub(crate) fn new() -> Signals {
        let (ready_tx, ready_rx) = unbounded();
        let (quit_tx, quit_rx) = bounded(1);
        Signals {
            ready_tx,
            ready_rx,
            quit_tx,
            quit_rx,
        }
    }

    /// Marks a registered task ready for execution.
    pub(crate) fn ready(&self, id: TaskId) {
        let _ = self.ready_tx.send(id);
    }

    /// Raises a fatal error; a no-op if one is already pending.
    pub(crate) fn raise(&self, err: ScriptError) {
        let _ = self.quit_tx.try_send(err);
    }

    pub(crate) fn ready_sender(&self) -> Sender<TaskId> {
        self.ready_tx.clone()
    }

    pub(crate) fn quit_sender(&self) -> Sender<ScriptError> {
        self.quit_tx.clone()
    }
}

/// The identity-keyed set of pending tasks.
pub(crate) struct TaskSet {
    pending: Mutex<HashMap<TaskId, Arc<dyn Task>>>,
}

impl TaskSet {
    pub(crate) fn new() -> TaskSet {
        TaskSet {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a task and runs its `startup` hook. The task is visible
    /// to the loop before this returns.
    pub(crate) fn push(&self, cx: &RuntimeContext, task: Arc<dyn Task>) {
        let mut pending = self.pending.lock();
        pending.insert(task.id(), task.clone());
        task.startup(cx);
    }

    /// Deregisters a task and runs its `cleanup` hook. Idempotent: pulling
    /// an absent id does nothing.
    pub(crate) fn pull(&self, cx: &RuntimeContext, id: TaskId) {
        let mut pending = self.pending.lock();
        if let Some(task) = pending.remove(&id) {
            task.cleanup(cx);
        }
    }

    pub(crate) fn contains(&self, id: TaskId) -> bool {
        self.pending.lock().contains_key(&id)
    }

    pub(crate) fn get(&self, id: TaskId) -> Option<Arc<dyn Task>> {
        self.pending.lock().get(&id).cloned()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Forcibly pulls every remaining task.
    pub(crate) fn drain(&self, cx: &RuntimeContext) {
        let mut pending = self.pending.lock();
        for (_, task) in pending.drain() {
            task.cleanup(cx);
        }
    }
}

/// The armed global deadline, disarmed on drop.
///
/// The deadline is not a task and is invisible to the emptiness check; it
/// lives on its own thread and, on firing, raises the distinguished
/// timeout error and asks the engine to abandon in-flight execution.
pub(crate) struct Deadline {
    _cancel: Option<Sender<()>>,
}

impl Deadline {
    /// Arms the deadline. A zero timeout means none.
    pub(crate) fn arm(
        timeout: Duration,
        quit: Sender<ScriptError>,
        engine: Arc<dyn ScriptEngine>,
    ) -> Deadline {
        if timeout.is_zero() {
            return Deadline { _cancel: None };
        }
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        thread::spawn(move || {
            crossbeam::select! {
                recv(cancel_rx) -> _ => {}
                recv(after(timeout)) -> _ => {
                    log::warn!("deadline of {:?} elapsed, stopping script", timeout);
                    let _ = quit.try_send(ScriptError::timeout());
                    engine.interrupt();
                }
            }
        });
        Deadline {
            _cancel: Some(cancel_tx),
        }
    }
}

/// Runs the loop until the pending set drains (success) or a fatal error
/// arrives (quit signal, timeout, or a task execution failure).
pub(crate) fn run_loop(cx: &RuntimeContext) -> ScriptResult<()> {
    let signals = cx.signals();
    loop {
        // A fatal raised while the loop was busy wins over everything,
        // including an already-drained pending set.
        if let Ok(err) = signals.quit_rx.try_recv() {
            return Err(err);
        }
        if cx.tasks().is_empty() {
            return Ok(());
        }
        crossbeam::select! {
            recv(signals.quit_rx) -> msg => {
                return Err(msg.unwrap_or_else(|_| {
                    ScriptError::internal("quit channel closed")
                }));
            }
            recv(signals.ready_rx) -> msg => {
                let id = msg.map_err(|_| {
                    ScriptError::internal("ready channel closed")
                })?;
                // Cancellation outranks a ready signal that was already
                // queued: once raised, no further execution starts.
                if let Ok(err) = signals.quit_rx.try_recv() {
                    return Err(err);
                }
                // A stale id (task cancelled after its countdown fired)
                // is skipped silently.
                if let Some(task) = cx.tasks().get(id) {
                    task.execute(cx)?;
                }
            }
        }
    }
}
