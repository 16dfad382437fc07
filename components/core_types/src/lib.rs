//! Core value and error types for the embedding runtime.
//!
//! This crate provides the foundational types shared by every component:
//! the host/script interchange value, the shared-object and function
//! handles that cross the engine boundary, and the runtime error taxonomy.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of values exchanged with the engine
//! - [`ObjectRef`] - Shared, mutable property map behind [`Value::Object`]
//! - [`FunctionRef`] - Opaque handle to an engine-owned callable
//! - [`ScriptError`] - Runtime errors with a fatal/recoverable split
//! - [`ErrorKind`] - Classes of runtime errors
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, ScriptError, Value};
//!
//! let num = Value::Number(42.0);
//! assert_eq!(num.type_of(), "number");
//!
//! let err = ScriptError::resolution("Cannot find module 'x'");
//! assert_eq!(err.kind(), ErrorKind::Resolution);
//! assert!(!err.is_fatal());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod value;

pub use error::{ErrorKind, ScriptError, ScriptResult};
pub use value::{FunctionRef, ObjectRef, Value};
