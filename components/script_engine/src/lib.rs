//! The script engine seam.
//!
//! The runtime never parses or executes script source itself; it drives an
//! embedded engine through the small capability set in [`ScriptEngine`]:
//! compile source, call compiled units and function values, wrap host
//! closures into callable values, and install globals.
//!
//! [`ScriptedEngine`] is a programmable reference implementation: instead
//! of interpreting source, it runs host-registered behaviors keyed by the
//! compiled unit's name. Hosts use it to exercise an embedding without a
//! real language engine, and this repository's own test suites are built
//! on it.
//!
//! # Examples
//!
//! ```
//! use core_types::Value;
//! use script_engine::{ScriptEngine, ScriptedEngine};
//!
//! let engine = ScriptedEngine::new();
//! engine.on_module("hello.js", |_, _, _| Ok(Value::Number(7.0)));
//!
//! let unit = engine.compile("hello.js", "7;").unwrap();
//! let result = engine.call(&unit, Value::Undefined, &[]).unwrap();
//! assert_eq!(result, Value::Number(7.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod engine;
mod scripted;

pub use engine::{Executable, HostFunction, ScriptEngine};
pub use scripted::{ScriptProgram, ScriptedEngine};
