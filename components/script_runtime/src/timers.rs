//! Script-facing timer primitives.
//!
//! Installs the `setTimeout` family as host globals. Every scheduled
//! timer is a [`Task`] registered with the scheduler; the host-side
//! countdown only ever posts a ready signal back to the loop, it never
//! calls into the engine.

use crate::context::RuntimeContext;
use crate::task::{Task, TaskId};
use core_types::{FunctionRef, ObjectRef, ScriptError, ScriptResult, Value};
use crossbeam::channel::Sender;
use parking_lot::Mutex;
use script_engine::ScriptEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

/// Delays clamp to one unit; nothing ever fires synchronously.
const MIN_DELAY: Duration = Duration::from_millis(1);

/// Property carrying the task id inside an opaque timer handle.
const HANDLE_KEY: &str = "__timerId";

/// A one-shot host countdown, stopped by flag.
///
/// A countdown that fires after `stop` loses the race and posts nothing;
/// a ready signal that was already posted for a pulled timer is ignored
/// by the loop.
struct Countdown {
    cancelled: Arc<AtomicBool>,
}

impl Countdown {
    fn start(delay: Duration, fire: impl FnOnce() + Send + 'static) -> Countdown {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            if !flag.load(Ordering::Acquire) {
                fire();
            }
        });
        Countdown { cancelled }
    }

    fn stop(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// A scheduled script callback, one-shot or repeating.
pub(crate) struct Timer {
    id: TaskId,
    interval: bool,
    duration: Duration,
    callback: FunctionRef,
    args: Vec<Value>,
    ready: Sender<TaskId>,
    countdown: Mutex<Option<Countdown>>,
}

impl Timer {
    pub(crate) fn new(
        interval: bool,
        duration: Duration,
        callback: FunctionRef,
        args: Vec<Value>,
        ready: Sender<TaskId>,
    ) -> Timer {
        Timer {
            id: TaskId::next(),
            interval,
            duration,
            callback,
            args,
            ready,
            countdown: Mutex::new(None),
        }
    }

    /// Arms the countdown, replacing and stopping any previous one.
    fn arm(&self) {
        let id = self.id;
        let ready = self.ready.clone();
        let countdown = Countdown::start(self.duration, move || {
            let _ = ready.send(id);
        });
        if let Some(old) = self.countdown.lock().replace(countdown) {
            old.stop();
        }
    }

    fn disarm(&self) {
        if let Some(countdown) = self.countdown.lock().take() {
            countdown.stop();
        }
    }

    /// The opaque handle returned to scripts for later cancellation.
    fn handle(&self) -> Value {
        let handle = ObjectRef::new();
        handle.set(HANDLE_KEY, Value::Number(self.id.raw() as f64));
        Value::Object(handle)
    }
}

impl Task for Timer {
    fn id(&self) -> TaskId {
        self.id
    }

    fn startup(&self, _cx: &RuntimeContext) {
        self.arm();
    }

    fn cleanup(&self, _cx: &RuntimeContext) {
        self.disarm();
    }

    fn execute(&self, cx: &RuntimeContext) -> Result<(), ScriptError> {
        cx.engine().call_function(self.callback, &self.args)?;
        if self.interval {
            // The callback may have cleared its own interval; only a
            // still-registered timer re-arms.
            if cx.tasks().contains(self.id) {
                self.arm();
            }
        } else {
            cx.pull(self.id);
        }
        Ok(())
    }
}

/// Installs the six timer globals into the engine.
pub(crate) fn install(cx: &RuntimeContext) -> ScriptResult<()> {
    let engine = cx.engine_arc();
    {
        let cx = cx.weak();
        engine.expose(
            "setTimeout",
            Arc::new(move |args: &[Value]| schedule(&cx, args, false, false)),
        )?;
    }
    {
        let cx = cx.weak();
        engine.expose(
            "setInterval",
            Arc::new(move |args: &[Value]| schedule(&cx, args, true, false)),
        )?;
    }
    {
        let cx = cx.weak();
        engine.expose(
            "setImmediate",
            Arc::new(move |args: &[Value]| schedule(&cx, args, false, true)),
        )?;
    }
    for name in ["clearTimeout", "clearInterval", "clearImmediate"] {
        let cx = cx.weak();
        engine.expose(name, Arc::new(move |args: &[Value]| clear(&cx, args)))?;
    }
    Ok(())
}

fn schedule(
    cx: &Weak<RuntimeContext>,
    args: &[Value],
    interval: bool,
    immediate: bool,
) -> ScriptResult<Value> {
    let cx = upgrade(cx)?;
    let callback = args
        .first()
        .and_then(Value::as_function)
        .ok_or_else(|| ScriptError::execution("timer callback is not a function"))?;
    let (delay, captured_from) = if immediate {
        (MIN_DELAY, 1)
    } else {
        (clamp_delay(args.get(1)), 2)
    };
    let captured = args.get(captured_from..).unwrap_or(&[]).to_vec();
    let timer = Arc::new(Timer::new(
        interval,
        delay,
        callback,
        captured,
        cx.ready_sender(),
    ));
    let handle = timer.handle();
    cx.push(timer);
    Ok(handle)
}

fn clear(cx: &Weak<RuntimeContext>, args: &[Value]) -> ScriptResult<Value> {
    let cx = upgrade(cx)?;
    // Anything that does not decode as a timer handle is a silent no-op,
    // as is cancelling twice or cancelling an already-fired one-shot.
    if let Some(id) = handle_id(args.first()) {
        cx.pull(id);
    }
    Ok(Value::Undefined)
}

fn upgrade(cx: &Weak<RuntimeContext>) -> ScriptResult<Arc<RuntimeContext>> {
    cx.upgrade()
        .ok_or_else(|| ScriptError::internal("runtime context dropped"))
}

/// Clamps a script-supplied delay: absent, non-numeric, zero, and
/// negative delays all become the minimum unit.
fn clamp_delay(arg: Option<&Value>) -> Duration {
    match arg.and_then(Value::as_number) {
        Some(ms) if ms >= 1.0 => Duration::from_millis(ms as u64),
        _ => MIN_DELAY,
    }
}

fn handle_id(value: Option<&Value>) -> Option<TaskId> {
    let raw = value?.as_object()?.get(HANDLE_KEY)?.as_number()?;
    Some(TaskId::from_raw(raw as u64))
}
