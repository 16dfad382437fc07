//! Node-style runtime services around a pluggable script engine.
//!
//! This crate keeps an embedded script process alive exactly as long as
//! pending asynchronous work exists, and gives scripts a CommonJS module
//! system. It provides:
//!
//! - [`RuntimeContext`] - one script process: run loop, scheduler state,
//!   module cache, optional deadline
//! - [`Registry`] - process-wide registration of lifecycle hooks,
//!   built-in modules, and the source finder, frozen before any run
//! - [`Task`] - the deferred-work capability the scheduler tracks; timers
//!   are the built-in task kind, installed as the `setTimeout` family
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use core_types::Value;
//! use script_engine::ScriptedEngine;
//! use script_runtime::{Registry, RuntimeContext};
//!
//! let mut registry = Registry::with_defaults();
//! registry.add_native("answer", |_| Ok(Value::Number(42.0)));
//!
//! let engine = Arc::new(ScriptedEngine::new());
//! let cx = RuntimeContext::builder()
//!     .engine(engine)
//!     .registry(Arc::new(registry))
//!     .build()
//!     .unwrap();
//!
//! cx.run("main.js", "require('answer');").unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod module;
pub mod registry;
pub mod task;

mod builtins;
mod scheduler;
mod timers;

pub use context::{ContextBuilder, RuntimeContext};
pub use module::FoundSource;
pub use registry::{ExitHook, FailHook, Finder, InitHook, ModuleInit, Registry};
pub use task::{Task, TaskId};
