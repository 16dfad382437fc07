//! Cross-component properties: cache idempotence, drain termination,
//! timeout precedence, cancel idempotence, and the delay clamp.

use core_types::{ErrorKind, Value};
use integration_tests::{context_with, require_from};
use parking_lot::Mutex;
use script_engine::ScriptedEngine;
use script_runtime::{FoundSource, Registry, RuntimeContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// P1: two requires of the same name return the identical cached value
/// and the body executes at most once.
#[test]
fn cache_idempotence() {
    let engine = Arc::new(ScriptedEngine::new());
    let executions = Arc::new(AtomicUsize::new(0));
    {
        let executions = executions.clone();
        engine.on_module("./shared.js", move |_, _, args| {
            executions.fetch_add(1, Ordering::SeqCst);
            let module = args[0].as_object().unwrap();
            let exports = module.get("exports").unwrap();
            exports
                .as_object()
                .unwrap()
                .set("stamp", Value::Number(1.0));
            Ok(Value::Undefined)
        });
    }
    let values: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let values = values.clone();
        engine.on_module("main.js", move |eng, _, args| {
            values.lock().push(require_from(eng, args, "./shared.js")?);
            values.lock().push(require_from(eng, args, "./shared.js")?);
            Ok(Value::Undefined)
        });
    }

    let mut registry = Registry::new();
    registry.on_file(|_, paths| Ok(FoundSource::new("", paths[0].clone())));
    let cx = context_with(engine, registry);
    cx.run("main.js", "").unwrap();

    assert_eq!(executions.load(Ordering::SeqCst), 1);
    let values = values.lock();
    // Identical, not merely equal-shaped: the same exports object.
    assert_eq!(values[0], values[1]);
}

/// P2: a script registering no timers finishes as soon as the entry
/// module does, without waiting on the deadline.
#[test]
fn drain_termination_beats_the_deadline() {
    let engine = Arc::new(ScriptedEngine::new());
    let cx = RuntimeContext::builder()
        .engine(engine)
        .registry(Arc::new(Registry::new()))
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap();

    let started = Instant::now();
    cx.run("main.js", "1 + 1;").unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// P3: an unbounded interval plus a deadline produces the timeout error
/// at roughly the deadline, and no callback fires after the run returns.
#[test]
fn timeout_precedence_stops_all_timers() {
    let engine = Arc::new(ScriptedEngine::new());
    let fired = Arc::new(AtomicUsize::new(0));
    {
        let fired = fired.clone();
        engine.on_module("main.js", move |eng, _, _| {
            let cb = {
                let fired = fired.clone();
                eng.function(move |_, _, _| {
                    fired.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Undefined)
                })
            };
            eng.call_global("setInterval", &[cb, Value::Number(10.0)])?;
            Ok(Value::Undefined)
        });
    }

    let deadline = Duration::from_millis(100);
    let cx = RuntimeContext::builder()
        .engine(engine)
        .registry(Arc::new(Registry::new()))
        .timeout(deadline)
        .build()
        .unwrap();

    let started = Instant::now();
    let err = cx.run("main.js", "setInterval(cb, 10);").unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(elapsed >= deadline);
    assert!(elapsed < deadline + Duration::from_secs(5));

    // All timers were forcibly pulled; nothing fires after the return.
    let after_return = fired.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(60));
    assert_eq!(fired.load(Ordering::SeqCst), after_return);
}

/// P4: double-cancel and cancel-after-fire never error and never reach
/// a second cleanup (a second cleanup would stop a re-used countdown and
/// hang the run; success here implies it did not happen).
#[test]
fn cancel_idempotence() {
    let engine = Arc::new(ScriptedEngine::new());
    let fired = Arc::new(AtomicUsize::new(0));
    {
        let fired = fired.clone();
        engine.on_module("main.js", move |eng, _, _| {
            let noop = eng.function(|_, _, _| Ok(Value::Undefined));
            let cancelled = eng.call_global("setTimeout", &[noop, Value::Number(5.0)])?;
            eng.call_global("clearTimeout", &[cancelled.clone()])?;
            eng.call_global("clearTimeout", &[cancelled])?;

            // A live timer that clears its own already-fired handle.
            let handle: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
            let cb = {
                let fired = fired.clone();
                let handle = handle.clone();
                eng.function(move |eng, _, _| {
                    fired.fetch_add(1, Ordering::SeqCst);
                    let stale = handle.lock().clone().expect("own handle");
                    eng.call_global("clearTimeout", &[stale])?;
                    Ok(Value::Undefined)
                })
            };
            let returned = eng.call_global("setTimeout", &[cb, Value::Number(5.0)])?;
            *handle.lock() = Some(returned);
            Ok(Value::Undefined)
        });
    }
    let cx = context_with(engine, Registry::new());
    cx.run("main.js", "").unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

/// P5: zero and negative delays clamp to the minimum unit and never run
/// before the entry module finishes.
#[test]
fn delay_clamp() {
    let engine = Arc::new(ScriptedEngine::new());
    let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let order = order.clone();
        engine.on_module("main.js", move |eng, _, _| {
            for (label, delay) in [("zero", 0.0), ("negative", -5.0)] {
                let cb = {
                    let order = order.clone();
                    eng.function(move |_, _, _| {
                        order.lock().push(label.to_string());
                        Ok(Value::Undefined)
                    })
                };
                eng.call_global("setTimeout", &[cb, Value::Number(delay)])?;
            }
            order.lock().push("entry".to_string());
            Ok(Value::Undefined)
        });
    }
    let cx = context_with(engine, Registry::new());
    cx.run("main.js", "setTimeout(fn, 0); setTimeout(fn, -5);")
        .unwrap();

    let order = order.lock();
    assert_eq!(order[0], "entry");
    assert_eq!(order.len(), 3);
    assert!(order.contains(&"zero".to_string()));
    assert!(order.contains(&"negative".to_string()));
}
