//! Process-wide registration: lifecycle hooks, the module table, and the
//! source finder.
//!
//! A `Registry` is built once at host startup with the `&mut`
//! registration methods, then frozen behind an `Arc` and shared by every
//! context. Freezing is what enforces the register-before-any-run
//! discipline: once shared, the registry can no longer be mutated.

use crate::builtins;
use crate::context::RuntimeContext;
use crate::module::FoundSource;
use core_types::{ScriptError, ScriptResult, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A callback invoked once when a run starts.
pub type InitHook = Box<dyn Fn(&RuntimeContext) + Send + Sync>;

/// A callback invoked once when a run finishes, on every outcome.
pub type ExitHook = Box<dyn Fn(&RuntimeContext) + Send + Sync>;

/// A callback invoked once when a run fails, with the fatal error.
pub type FailHook = Box<dyn Fn(&RuntimeContext, &ScriptError) + Send + Sync>;

/// The host's source lookup: given candidate paths, supply the first one
/// it can, with its source text. Must be deterministic and side-effect
/// free from the runtime's perspective.
pub type Finder =
    Box<dyn Fn(&RuntimeContext, &[String]) -> ScriptResult<FoundSource> + Send + Sync>;

/// A native module initializer, evaluated once per context on first
/// require.
pub type ModuleInit = Box<dyn Fn(&RuntimeContext) -> ScriptResult<Value> + Send + Sync>;

/// How a registered module produces its value.
pub(crate) enum ModuleSource {
    /// A host-side initializer.
    Native(ModuleInit),
    /// Script source evaluated through the module envelope.
    Source(String),
}

/// The registration tables shared by every context.
#[derive(Default)]
pub struct Registry {
    inits: Vec<InitHook>,
    exits: Vec<ExitHook>,
    fails: Vec<FailHook>,
    finder: Option<Finder>,
    modules: HashMap<String, ModuleSource>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Creates a registry with the bundled modules pre-registered.
    pub fn with_defaults() -> Registry {
        let mut registry = Registry::new();
        builtins::register(&mut registry);
        registry
    }

    /// Appends a callback run at the start of every run.
    pub fn on_init<F>(&mut self, hook: F)
    where
        F: Fn(&RuntimeContext) + Send + Sync + 'static,
    {
        self.inits.push(Box::new(hook));
    }

    /// Appends a callback run at the end of every run.
    pub fn on_exit<F>(&mut self, hook: F)
    where
        F: Fn(&RuntimeContext) + Send + Sync + 'static,
    {
        self.exits.push(Box::new(hook));
    }

    /// Appends a callback run when a run fails.
    pub fn on_fail<F>(&mut self, hook: F)
    where
        F: Fn(&RuntimeContext, &ScriptError) + Send + Sync + 'static,
    {
        self.fails.push(Box::new(hook));
    }

    /// Registers the source finder. The last registration wins; without
    /// one, any require that reaches the finder fails as not found.
    pub fn on_file<F>(&mut self, finder: F)
    where
        F: Fn(&RuntimeContext, &[String]) -> ScriptResult<FoundSource> + Send + Sync + 'static,
    {
        self.finder = Some(Box::new(finder));
    }

    /// Registers module source text under a logical name.
    pub fn add(&mut self, name: &str, source: impl Into<String>) {
        self.modules
            .insert(name.to_string(), ModuleSource::Source(source.into()));
    }

    /// Registers a native module initializer under a logical name.
    pub fn add_native<F>(&mut self, name: &str, init: F)
    where
        F: Fn(&RuntimeContext) -> ScriptResult<Value> + Send + Sync + 'static,
    {
        self.modules
            .insert(name.to_string(), ModuleSource::Native(Box::new(init)));
    }

    /// Registers the contents of one file under a logical name.
    pub fn add_file(&mut self, name: &str, path: impl AsRef<Path>) -> ScriptResult<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            ScriptError::internal(format!(
                "cannot read module file '{}': {}",
                path.display(),
                err
            ))
        })?;
        self.add(name, text);
        Ok(())
    }

    /// Registers every file matching `pattern` as `name@<stem>`, and
    /// aliases `name` and `name@latest` to the last match.
    pub fn add_glob(&mut self, name: &str, pattern: &str) -> ScriptResult<()> {
        let entries = glob::glob(pattern).map_err(|err| {
            ScriptError::internal(format!("bad module glob '{}': {}", pattern, err))
        })?;
        let mut latest: Option<String> = None;
        for entry in entries {
            let path = entry.map_err(|err| {
                ScriptError::internal(format!("cannot walk module glob '{}': {}", pattern, err))
            })?;
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let text = fs::read_to_string(&path).map_err(|err| {
                ScriptError::internal(format!(
                    "cannot read module file '{}': {}",
                    path.display(),
                    err
                ))
            })?;
            self.add(&format!("{}@{}", name, stem), text.clone());
            latest = Some(text);
        }
        if let Some(text) = latest {
            self.add(name, text.clone());
            self.add(&format!("{}@latest", name), text);
        }
        Ok(())
    }

    pub(crate) fn module(&self, name: &str) -> Option<&ModuleSource> {
        self.modules.get(name)
    }

    pub(crate) fn finder(&self) -> Option<&Finder> {
        self.finder.as_ref()
    }

    pub(crate) fn inits(&self) -> &[InitHook] {
        &self.inits
    }

    pub(crate) fn exits(&self) -> &[ExitHook] {
        &self.exits
    }

    pub(crate) fn fails(&self) -> &[FailHook] {
        &self.fails
    }
}
