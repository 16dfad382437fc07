//! Integration test suite for the embedding runtime.
//!
//! Verifies the scheduler, timer registry, and module loader working
//! together across component boundaries, driven through the scripted
//! reference engine.

use core_types::{ScriptResult, Value};
use script_engine::{ScriptEngine, ScriptedEngine};
use script_runtime::{Registry, RuntimeContext};
use std::sync::Arc;

/// Builds a context over `engine` and `registry` with no deadline.
pub fn context_with(engine: Arc<ScriptedEngine>, registry: Registry) -> Arc<RuntimeContext> {
    RuntimeContext::builder()
        .engine(engine)
        .registry(Arc::new(registry))
        .build()
        .unwrap()
}

/// Calls the `require` binding of the module object handed to a program.
pub fn require_from(
    engine: &ScriptedEngine,
    module_args: &[Value],
    name: &str,
) -> ScriptResult<Value> {
    let module = module_args[0].as_object().expect("module object");
    let require = module
        .get("require")
        .and_then(|v| v.as_function())
        .expect("require binding");
    engine.call_function(require, &[Value::string(name)])
}
