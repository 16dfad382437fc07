//! Module resolution, loading, and caching.
//!
//! `require` works through a small state machine per module name: the
//! per-context cache first, then the registered module table, then the
//! host finder over a candidate path list. Resolved source runs inside a
//! CommonJS envelope that hands the body its `module` object; `.json`
//! files bypass the envelope and parse as data.

use crate::context::RuntimeContext;
use core_types::{ObjectRef, ScriptError, ScriptResult, Value};
use script_engine::ScriptEngine;
use std::path::Path;
use std::sync::Arc;

/// The extension appended to extensionless module names.
const DEFAULT_EXTENSION: &str = "js";

/// Source text plus the candidate path the finder resolved it to.
#[derive(Debug, Clone)]
pub struct FoundSource {
    /// The module source text.
    pub source: String,
    /// The winning candidate path.
    pub path: String,
}

impl FoundSource {
    /// Creates a finder result.
    pub fn new(source: impl Into<String>, path: impl Into<String>) -> FoundSource {
        FoundSource {
            source: source.into(),
            path: path.into(),
        }
    }
}

/// Resolves and evaluates `name` on behalf of a module living in `dir`.
pub(crate) fn require(cx: &RuntimeContext, name: &str, dir: &str) -> ScriptResult<Value> {
    if name.is_empty() {
        return Err(ScriptError::resolution("No module name specified"));
    }

    if let Some(value) = cx.cached_module(name) {
        return Ok(value);
    }

    if let Some(source) = cx.registry().module(name) {
        return match source {
            crate::registry::ModuleSource::Native(init) => {
                let value = init(cx)?;
                cx.cache_module(name, value.clone());
                Ok(value)
            }
            crate::registry::ModuleSource::Source(text) => {
                evaluate(cx, name, name, text, Some(name))
            }
        };
    }

    let paths = candidates(name, dir);
    log::debug!("resolving module {:?} against {:?}", name, paths);
    let found = {
        let finder = cx.registry().finder().ok_or_else(|| not_found(name))?;
        finder(cx, &paths).map_err(|_| not_found(name))?
    };

    if found.path.ends_with(".json") {
        let value = parse_json_module(&found.source)?;
        cx.cache_module(name, value.clone());
        return Ok(value);
    }

    evaluate(cx, name, &found.path, &found.source, Some(name))
}

fn not_found(name: &str) -> ScriptError {
    ScriptError::resolution(format!("Cannot find module '{}'", name))
}

/// Executes `source` inside the CommonJS envelope and determines the
/// module's value.
///
/// When `cache_as` is set, the default `exports` object is cached under
/// that name before the body runs, so a cyclic require observes the
/// partially-populated exports instead of deadlocking; the entry is
/// replaced by the final value afterwards, or evicted if evaluation
/// fails.
pub(crate) fn evaluate(
    cx: &RuntimeContext,
    name: &str,
    path: &str,
    source: &str,
    cache_as: Option<&str>,
) -> ScriptResult<Value> {
    let engine = cx.engine();
    let dir = parent_dir(path);

    let exports = ObjectRef::new();
    let module = ObjectRef::new();
    module.set("id", Value::string(name));
    module.set("filename", Value::string(path));
    module.set("loaded", Value::Boolean(false));
    module.set("__dirname", Value::string(&dir));
    module.set("__filename", Value::string(path));
    module.set("exports", Value::Object(exports.clone()));

    // Nested requires resolve against the resolving module's own
    // directory, not the requester's.
    let weak = cx.weak();
    let require_fn = engine.bind_function(Arc::new(move |args: &[Value]| {
        let cx = weak
            .upgrade()
            .ok_or_else(|| ScriptError::internal("runtime context dropped"))?;
        let name = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| ScriptError::execution("require expects a module name"))?
            .to_string();
        require(&cx, &name, &dir)
    }))?;
    module.set("require", Value::Function(require_fn));

    if let Some(key) = cache_as {
        cx.cache_module(key, Value::Object(exports.clone()));
    }

    let returned = engine
        .compile(path, &wrap(source))
        .and_then(|unit| engine.call(&unit, Value::Undefined, &[Value::Object(module.clone())]));
    let returned = match returned {
        Ok(returned) => returned,
        Err(err) => {
            if let Some(key) = cache_as {
                cx.evict_module(key);
            }
            return Err(err);
        }
    };

    let value = module_value(&module, &exports, returned);
    module.set("loaded", Value::Boolean(true));
    if let Some(key) = cache_as {
        cx.cache_module(key, value.clone());
    }
    Ok(value)
}

/// The candidate paths for `name` requested from a module in `dir`.
pub(crate) fn candidates(name: &str, dir: &str) -> Vec<String> {
    if has_extension(name) {
        vec![resolve(name, dir)]
    } else {
        vec![
            resolve(&format!("{}.{}", name, DEFAULT_EXTENSION), dir),
            resolve(&format!("{}/index.{}", name, DEFAULT_EXTENSION), dir),
        ]
    }
}

fn wrap(source: &str) -> String {
    format!(
        "(function(module) {{ var require = module.require; var exports = module.exports; \
         var __dirname = module.__dirname; var __filename = module.__filename;\n{}\n}})",
        source
    )
}

/// The module value precedence: `module.exports` wins if it was replaced
/// or populated; otherwise the envelope's defined return value; otherwise
/// the module has no value.
fn module_value(module: &ObjectRef, default_exports: &ObjectRef, returned: Value) -> Value {
    match module.get("exports") {
        Some(Value::Object(exports)) if exports.ptr_eq(default_exports) => {
            if !exports.is_empty() {
                Value::Object(exports)
            } else if !returned.is_undefined() {
                returned
            } else {
                Value::Undefined
            }
        }
        Some(replaced) => replaced,
        None => {
            if !returned.is_undefined() {
                returned
            } else {
                Value::Undefined
            }
        }
    }
}

fn parse_json_module(source: &str) -> ScriptResult<Value> {
    let json: serde_json::Value = serde_json::from_str(source)
        .map_err(|err| ScriptError::execution(format!("JSON parse error: {}", err)))?;
    Ok(json_to_value(&json))
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            Value::Array(items.iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => {
            let obj = ObjectRef::new();
            for (key, value) in map {
                obj.set(key.clone(), json_to_value(value));
            }
            Value::Object(obj)
        }
    }
}

fn has_extension(name: &str) -> bool {
    Path::new(name).extension().is_some()
}

fn resolve(name: &str, dir: &str) -> String {
    if Path::new(name).is_absolute() {
        name.to_string()
    } else {
        join_path(dir, name)
    }
}

fn parent_dir(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Joins a relative module name onto a directory, collapsing `.` and `..`
/// segments. An empty directory leaves the name untouched.
fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return name.to_string();
    }
    let mut parts: Vec<&str> = Vec::new();
    for segment in dir.split('/').chain(name.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.is_empty() || matches!(parts.last(), Some(&"..")) {
                    parts.push("..");
                } else {
                    parts.pop();
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if dir.starts_with('/') {
        format!("/{}", joined)
    } else {
        joined
    }
}
