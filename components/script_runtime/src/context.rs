//! The per-run runtime context and its builder.
//!
//! A `RuntimeContext` owns everything one script process needs: the
//! engine handle, the pending-task set and its signal channels, the
//! module cache, and the staged global table. It shares the immutable
//! [`Registry`] with every other context but never shares mutable
//! scheduler state; derived runtimes are built, not cloned.

use crate::module;
use crate::registry::Registry;
use crate::scheduler::{self, Deadline, Signals, TaskSet};
use crate::task::{Task, TaskId};
use crate::timers;
use core_types::{ScriptError, ScriptResult, Value};
use crossbeam::channel::Sender;
use parking_lot::Mutex;
use script_engine::ScriptEngine;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Builds a [`RuntimeContext`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use script_engine::ScriptedEngine;
/// use script_runtime::{Registry, RuntimeContext};
///
/// let registry = Arc::new(Registry::with_defaults());
/// let cx = RuntimeContext::builder()
///     .engine(Arc::new(ScriptedEngine::new()))
///     .registry(registry)
///     .timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// cx.run("main.js", "").unwrap();
/// ```
#[derive(Default)]
pub struct ContextBuilder {
    engine: Option<Arc<dyn ScriptEngine>>,
    registry: Option<Arc<Registry>>,
    timeout: Duration,
}

impl ContextBuilder {
    /// Sets the script engine. Required.
    pub fn engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Sets the shared registry. Defaults to [`Registry::with_defaults`].
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the global deadline. Zero, the default, means no timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the context.
    pub fn build(self) -> ScriptResult<Arc<RuntimeContext>> {
        let engine = self
            .engine
            .ok_or_else(|| ScriptError::internal("a script engine is required"))?;
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(Registry::with_defaults()));
        Ok(Arc::new_cyclic(|weak| RuntimeContext {
            engine,
            registry,
            tasks: TaskSet::new(),
            signals: Signals::new(),
            timeout: self.timeout,
            modules: Mutex::new(HashMap::new()),
            globals: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            weak_self: weak.clone(),
        }))
    }
}

/// One script process: engine, scheduler state, module cache, deadline.
///
/// A context runs at most once; build a new one for the next run.
pub struct RuntimeContext {
    engine: Arc<dyn ScriptEngine>,
    registry: Arc<Registry>,
    tasks: TaskSet,
    signals: Signals,
    timeout: Duration,
    modules: Mutex<HashMap<String, Value>>,
    globals: Mutex<Vec<(String, Value)>>,
    started: AtomicBool,
    weak_self: Weak<RuntimeContext>,
}

impl RuntimeContext {
    /// Starts building a context.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// The embedded engine.
    pub fn engine(&self) -> &dyn ScriptEngine {
        self.engine.as_ref()
    }

    /// The shared registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Stages a global binding, materialized into the engine when the run
    /// starts.
    pub fn def(&self, name: impl Into<String>, value: Value) -> ScriptResult<()> {
        if self.started.load(Ordering::SeqCst) {
            return Err(ScriptError::internal("globals must be defined before run"));
        }
        self.globals.lock().push((name.into(), value));
        Ok(())
    }

    /// Raises a host-issued cancellation. The run loop stops before the
    /// next task executes; an in-flight task still completes.
    pub fn quit(&self, cause: impl Into<String>) {
        self.signals.raise(ScriptError::cancelled(cause));
    }

    /// Registers a task with the scheduler; the run will not finish while
    /// it is pending.
    pub fn push(&self, task: Arc<dyn Task>) {
        self.tasks.push(self, task);
    }

    /// Deregisters a task. Idempotent.
    pub fn pull(&self, id: TaskId) {
        self.tasks.pull(self, id);
    }

    /// Signals that a registered task is ready to execute. Safe to call
    /// from any thread.
    pub fn next(&self, id: TaskId) {
        self.signals.ready(id);
    }

    /// Executes the entry module and blocks until every pending task has
    /// drained, a fatal error occurs, or the deadline fires.
    ///
    /// On every outcome: the deadline is disarmed, remaining tasks are
    /// forcibly pulled, failure hooks run once on the fatal path, and
    /// exit hooks run once unconditionally.
    pub fn run(&self, name: &str, code: &str) -> ScriptResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ScriptError::internal("runtime context already consumed"));
        }
        log::debug!("running entry module {:?}", name);
        let deadline = Deadline::arm(
            self.timeout,
            self.signals.quit_sender(),
            self.engine.clone(),
        );
        let result = self.run_inner(name, code);
        drop(deadline);
        self.tasks.drain(self);
        if let Err(err) = &result {
            log::warn!("run of {:?} failed: {}", name, err);
            for fail in self.registry.fails() {
                fail(self, err);
            }
        }
        for exit in self.registry.exits() {
            exit(self);
        }
        result
    }

    fn run_inner(&self, name: &str, code: &str) -> ScriptResult<()> {
        let staged: Vec<(String, Value)> = std::mem::take(&mut *self.globals.lock());
        for (global, value) in staged {
            self.engine.set_global(&global, value)?;
        }
        timers::install(self)?;
        for init in self.registry.inits() {
            init(self);
        }
        module::evaluate(self, name, name, code, None)?;
        scheduler::run_loop(self)
    }

    pub(crate) fn signals(&self) -> &Signals {
        &self.signals
    }

    pub(crate) fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    pub(crate) fn engine_arc(&self) -> Arc<dyn ScriptEngine> {
        self.engine.clone()
    }

    pub(crate) fn weak(&self) -> Weak<RuntimeContext> {
        self.weak_self.clone()
    }

    pub(crate) fn ready_sender(&self) -> Sender<TaskId> {
        self.signals.ready_sender()
    }

    pub(crate) fn cached_module(&self, name: &str) -> Option<Value> {
        self.modules.lock().get(name).cloned()
    }

    pub(crate) fn cache_module(&self, name: &str, value: Value) {
        self.modules.lock().insert(name.to_string(), value);
    }

    pub(crate) fn evict_module(&self, name: &str) {
        self.modules.lock().remove(name);
    }
}
