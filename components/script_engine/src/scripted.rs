//! A programmable engine for driving the runtime without a real language
//! implementation.

use crate::engine::{Executable, HostFunction, ScriptEngine};
use core_types::{FunctionRef, ScriptError, ScriptResult, Value};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A behavior standing in for a piece of script code.
///
/// The program receives the engine (to reach globals and other callables),
/// the `this` value, and the call arguments.
pub type ScriptProgram =
    Arc<dyn Fn(&ScriptedEngine, &Value, &[Value]) -> ScriptResult<Value> + Send + Sync>;

enum Callable {
    Host(HostFunction),
    Scripted(ScriptProgram),
}

impl Clone for Callable {
    fn clone(&self) -> Self {
        match self {
            Callable::Host(f) => Callable::Host(f.clone()),
            Callable::Scripted(p) => Callable::Scripted(p.clone()),
        }
    }
}

struct CompiledUnit {
    name: String,
    source: String,
}

/// A script engine whose "programs" are host-registered Rust closures.
///
/// `compile` records the unit; `call` dispatches to the behavior
/// registered for the unit's name (or, failing that, for a fragment of
/// its source), defaulting to an empty program that returns undefined.
/// Functions created with [`function`](ScriptedEngine::function) stand in
/// for script-side callbacks, so timer and module flows can be exercised
/// end to end.
#[derive(Default)]
pub struct ScriptedEngine {
    next_id: AtomicU64,
    units: Mutex<HashMap<u64, CompiledUnit>>,
    by_name: Mutex<HashMap<String, ScriptProgram>>,
    by_source: Mutex<Vec<(String, ScriptProgram)>>,
    functions: Mutex<HashMap<u64, Callable>>,
    globals: Mutex<HashMap<String, Value>>,
    interrupted: AtomicBool,
}

impl ScriptedEngine {
    /// Creates an engine with no registered programs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the behavior for units compiled under `name`.
    pub fn on_module<F>(&self, name: impl Into<String>, program: F)
    where
        F: Fn(&ScriptedEngine, &Value, &[Value]) -> ScriptResult<Value> + Send + Sync + 'static,
    {
        self.by_name.lock().insert(name.into(), Arc::new(program));
    }

    /// Registers the behavior for any unit whose source contains
    /// `fragment`. Name matches take precedence.
    pub fn on_source<F>(&self, fragment: impl Into<String>, program: F)
    where
        F: Fn(&ScriptedEngine, &Value, &[Value]) -> ScriptResult<Value> + Send + Sync + 'static,
    {
        self.by_source
            .lock()
            .push((fragment.into(), Arc::new(program)));
    }

    /// Creates a script-side function value backed by `program` — what a
    /// script would pass to `setTimeout` or export from a module.
    pub fn function<F>(&self, program: F) -> Value
    where
        F: Fn(&ScriptedEngine, &Value, &[Value]) -> ScriptResult<Value> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.functions
            .lock()
            .insert(id, Callable::Scripted(Arc::new(program)));
        Value::Function(FunctionRef::new(id))
    }

    /// Returns a clone of the global binding `name`.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.lock().get(name).cloned()
    }

    /// Calls the global function `name` — how a program reaches exposed
    /// host functions such as `setTimeout`.
    pub fn call_global(&self, name: &str, args: &[Value]) -> ScriptResult<Value> {
        let func = self
            .global(name)
            .and_then(|v| v.as_function())
            .ok_or_else(|| ScriptError::execution(format!("{} is not a function", name)))?;
        self.call_function(func, args)
    }

    /// Whether an interrupt was requested.
    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    fn program_for(&self, unit: &CompiledUnit) -> Option<ScriptProgram> {
        if let Some(program) = self.by_name.lock().get(&unit.name) {
            return Some(program.clone());
        }
        self.by_source
            .lock()
            .iter()
            .find(|(fragment, _)| unit.source.contains(fragment.as_str()))
            .map(|(_, program)| program.clone())
    }
}

impl ScriptEngine for ScriptedEngine {
    fn compile(&self, name: &str, source: &str) -> ScriptResult<Executable> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.units.lock().insert(
            id,
            CompiledUnit {
                name: name.to_string(),
                source: source.to_string(),
            },
        );
        Ok(Executable::new(id, name))
    }

    fn call(&self, executable: &Executable, this: Value, args: &[Value]) -> ScriptResult<Value> {
        let program = {
            let units = self.units.lock();
            let unit = units.get(&executable.id()).ok_or_else(|| {
                ScriptError::internal(format!("unknown executable '{}'", executable.name()))
            })?;
            self.program_for(unit)
        };
        match program {
            Some(program) => program(self, &this, args),
            None => Ok(Value::Undefined),
        }
    }

    fn call_function(&self, function: FunctionRef, args: &[Value]) -> ScriptResult<Value> {
        let callable = self
            .functions
            .lock()
            .get(&function.id())
            .cloned()
            .ok_or_else(|| ScriptError::execution("value is not a function"))?;
        match callable {
            Callable::Host(f) => f(args),
            Callable::Scripted(p) => p(self, &Value::Undefined, args),
        }
    }

    fn bind_function(&self, function: HostFunction) -> ScriptResult<FunctionRef> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.functions.lock().insert(id, Callable::Host(function));
        Ok(FunctionRef::new(id))
    }

    fn expose(&self, name: &str, function: HostFunction) -> ScriptResult<()> {
        let func = self.bind_function(function)?;
        self.globals
            .lock()
            .insert(name.to_string(), Value::Function(func));
        Ok(())
    }

    fn set_global(&self, name: &str, value: Value) -> ScriptResult<()> {
        self.globals.lock().insert(name.to_string(), value);
        Ok(())
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
    }
}
