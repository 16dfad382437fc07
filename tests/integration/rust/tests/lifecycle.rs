//! Lifecycle hooks, staged globals, and host-issued cancellation.

use core_types::{ErrorKind, ScriptError, Value};
use integration_tests::context_with;
use parking_lot::Mutex;
use script_engine::ScriptedEngine;
use script_runtime::Registry;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn recording_registry(events: &Arc<Mutex<Vec<String>>>) -> Registry {
    let mut registry = Registry::new();
    for label in ["init one", "init two"] {
        let events = events.clone();
        registry.on_init(move |_| events.lock().push(label.to_string()));
    }
    {
        let events = events.clone();
        registry.on_exit(move |_| events.lock().push("exit".to_string()));
    }
    {
        let events = events.clone();
        registry.on_fail(move |_, err| events.lock().push(format!("fail: {}", err)));
    }
    registry
}

#[test]
fn hooks_run_in_registration_order_on_success() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let engine = Arc::new(ScriptedEngine::new());
    {
        let events = events.clone();
        engine.on_module("main.js", move |_, _, _| {
            events.lock().push("entry".to_string());
            Ok(Value::Undefined)
        });
    }

    let cx = context_with(engine, recording_registry(&events));
    cx.run("main.js", "").unwrap();

    assert_eq!(
        *events.lock(),
        vec!["init one", "init two", "entry", "exit"]
    );
}

#[test]
fn failure_hooks_run_once_then_exit_hooks_on_the_fatal_path() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let engine = Arc::new(ScriptedEngine::new());
    engine.on_module("main.js", |_, _, _| {
        Err(ScriptError::execution("boom"))
    });

    let cx = context_with(engine, recording_registry(&events));
    let err = cx.run("main.js", "throw new Error('boom');").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);

    assert_eq!(
        *events.lock(),
        vec!["init one", "init two", "fail: boom", "exit"]
    );
}

#[test]
fn staged_globals_are_visible_before_the_entry_module() {
    let engine = Arc::new(ScriptedEngine::new());
    let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    {
        let seen = seen.clone();
        engine.on_module("main.js", move |eng, _, _| {
            *seen.lock() = eng.global("answer");
            Ok(Value::Undefined)
        });
    }

    let cx = context_with(engine, Registry::new());
    cx.def("answer", Value::Number(42.0)).unwrap();
    cx.run("main.js", "answer;").unwrap();
    assert_eq!(seen.lock().clone(), Some(Value::Number(42.0)));

    // Once the run started the table is sealed.
    let err = cx.def("late", Value::Null).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn host_cancellation_reports_the_cause_to_failure_hooks() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let engine = Arc::new(ScriptedEngine::new());
    engine.on_module("main.js", |eng, _, _| {
        let noop = eng.function(|_, _, _| Ok(Value::Undefined));
        eng.call_global("setInterval", &[noop, Value::Number(5.0)])?;
        Ok(Value::Undefined)
    });

    let cx = context_with(engine, recording_registry(&events));
    let quitter = cx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        quitter.quit("maintenance window");
    });

    let err = cx.run("main.js", "setInterval(noop, 5);").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    let events = events.lock();
    assert!(events.contains(&"fail: maintenance window".to_string()));
    assert_eq!(events.last().unwrap(), "exit");
    // Exactly one failure report.
    assert_eq!(events.iter().filter(|e| e.starts_with("fail")).count(), 1);
}

#[test]
fn exit_hooks_run_exactly_once_per_run() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let engine = Arc::new(ScriptedEngine::new());
    let cx = context_with(engine, recording_registry(&events));
    cx.run("main.js", "").unwrap();
    assert_eq!(events.lock().iter().filter(|e| *e == "exit").count(), 1);
}
