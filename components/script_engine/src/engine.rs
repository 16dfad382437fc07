//! The capability set the runtime requires from an embedded engine.

use core_types::{FunctionRef, ScriptResult, Value};
use std::sync::Arc;

/// A host closure callable from script code.
///
/// Host functions receive the call arguments and return a value or an
/// error; an error surfaces inside the script as a thrown exception.
pub type HostFunction = Arc<dyn Fn(&[Value]) -> ScriptResult<Value> + Send + Sync>;

/// A compiled unit of script source.
///
/// The id is meaningful only to the engine that produced it; the name is
/// carried for diagnostics.
#[derive(Debug, Clone)]
pub struct Executable {
    id: u64,
    name: String,
}

impl Executable {
    /// Creates a handle for an engine-compiled unit.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Executable {
            id,
            name: name.into(),
        }
    }

    /// The engine-assigned id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The name the unit was compiled under.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The capability set an embedded script engine provides to the runtime.
///
/// Implementations must be safe to share across threads: the runtime's
/// deadline thread may request [`interrupt`](ScriptEngine::interrupt)
/// while the script thread is inside [`call`](ScriptEngine::call). All
/// other methods are only ever invoked from the single script thread.
pub trait ScriptEngine: Send + Sync {
    /// Compiles `source` into an executable unit. `name` identifies the
    /// unit in diagnostics and, for modules, carries the resolved path.
    fn compile(&self, name: &str, source: &str) -> ScriptResult<Executable>;

    /// Calls a compiled unit with the given `this` value and arguments.
    fn call(&self, executable: &Executable, this: Value, args: &[Value]) -> ScriptResult<Value>;

    /// Calls a script-owned function value.
    fn call_function(&self, function: FunctionRef, args: &[Value]) -> ScriptResult<Value>;

    /// Wraps a host closure into a callable script value.
    fn bind_function(&self, function: HostFunction) -> ScriptResult<FunctionRef>;

    /// Installs a host closure under a global name.
    fn expose(&self, name: &str, function: HostFunction) -> ScriptResult<()>;

    /// Installs a global binding.
    fn set_global(&self, name: &str, value: Value) -> ScriptResult<()>;

    /// Requests that the engine abandon in-flight execution.
    ///
    /// Best effort: engines without an interruption mechanism may ignore
    /// the request, in which case a runaway script is only stopped at the
    /// next run-loop boundary.
    fn interrupt(&self) {}
}
