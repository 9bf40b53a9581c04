//! Fan-out / fan-in: fork, join, and the end-to-end checkout shape.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use yield_effect::{
    fork, from_fn, join, Dispatch, EffectError, MemoryDispatchSink, Output, Scheduler, Target,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn scheduler() -> (Scheduler, Arc<MemoryDispatchSink>) {
    let sink = Arc::new(MemoryDispatchSink::new());
    (Scheduler::new(sink.clone()), sink)
}

/// A pending function target that settles with `value` after `ms`.
fn delayed(name: &str, ms: u64, value: Value) -> Target {
    Target::future(name, move |_args| {
        let value = value.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(value)
        }
    })
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn fork_returns_before_forked_work_runs() {
    let (scheduler, _sink) = scheduler();
    let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));

    let child = {
        let log = log.clone();
        Target::coroutine("child", move |_args| {
            let log = log.clone();
            from_fn(move |_co| async move {
                log.lock().unwrap().push("child runs");
                Ok(json!("child done"))
            })
        })
    };

    let task = scheduler.start({
        let log = log.clone();
        from_fn(move |co| async move {
            let forked = co.fork(child, vec![]).await?;
            log.lock().unwrap().push("parent continues");
            co.join(&forked).await
        })
    });

    assert_eq!(task.result().await, Ok(json!("child done")));
    assert_eq!(*log.lock().unwrap(), vec!["parent continues", "child runs"]);
}

#[tokio::test]
async fn fork_resolves_with_a_task_handle() {
    let (scheduler, _sink) = scheduler();
    let slow = delayed("slow", 20, json!("eventually"));

    let task = scheduler.start(from_fn(move |co| async move {
        let output = co.perform(fork(slow, vec![])).await?;
        let forked = output.into_task()?;
        let settled_at_fork = forked.is_settled();
        let value = co.join(&forked).await?;
        Ok(json!({"settled_at_fork": settled_at_fork, "value": value}))
    }));

    assert_eq!(
        task.result().await,
        Ok(json!({"settled_at_fork": false, "value": "eventually"}))
    );
}

#[tokio::test]
async fn join_after_settlement_still_yields_the_value() {
    let (scheduler, _sink) = scheduler();
    let quick = Target::function("quick", |_args| Ok(json!("quick result")));
    let pause = delayed("pause", 10, Value::Null);

    let task = scheduler.start(from_fn(move |co| async move {
        let forked = co.fork(quick, vec![]).await?;
        co.call(pause, vec![]).await?;
        let settled_before_join = forked.is_settled();
        let first = co.join(&forked).await?;
        let second = co.join(&forked).await?;
        Ok(json!([settled_before_join, first, second]))
    }));

    assert_eq!(
        task.result().await,
        Ok(json!([true, "quick result", "quick result"]))
    );
    assert!(scheduler.active_tasks().is_empty());
}

#[tokio::test]
async fn join_rejects_with_the_forked_error() {
    let (scheduler, _sink) = scheduler();
    let error = EffectError::failure_with("db timeout", json!({"table": "users"}));
    let failing = {
        let error = error.clone();
        Target::coroutine("failing", move |_args| {
            let error = error.clone();
            from_fn(move |_co| async move { Err(error) })
        })
    };

    let task = scheduler.start(from_fn(move |co| async move {
        let forked = co.fork(failing, vec![]).await?;
        match co.join(&forked).await {
            Ok(_) => Ok(json!("no error")),
            Err(err) => Err(err),
        }
    }));

    assert_eq!(task.result().await, Err(error));
    assert!(scheduler.active_tasks().is_empty());
}

#[tokio::test]
async fn forked_handle_is_observable_outside_the_coroutine() {
    let (scheduler, _sink) = scheduler();
    let work = delayed("work", 5, json!(99));

    let task = scheduler.start(from_fn(move |co| async move {
        let forked = co.fork(work, vec![]).await?;
        Ok(serde_json::to_value(Output::Task(forked)).unwrap_or_default())
    }));

    // The parent returns the serialized handle; the forked task keeps going.
    let wire = task.result().await.unwrap();
    assert_eq!(wire, json!({"id": 2}));
}

#[tokio::test]
async fn join_of_a_plain_value_is_rejected_at_creation() {
    let err = join(json!({"id": 1})).unwrap_err();
    assert!(matches!(err, EffectError::InvalidEffectArgument(_)));
}

#[tokio::test]
async fn fork_fork_call_join_join_put() {
    let (scheduler, sink) = scheduler();

    // A settles after B even though it was forked first.
    let a = delayed("A", 30, json!({"source": "A"}));
    let b = Target::coroutine("B", |_args| {
        from_fn(|co| async move {
            let inner = delayed("B-inner", 5, json!({"source": "B"}));
            co.call(inner, vec![]).await
        })
    });
    let c = Target::function("C", |_args| Ok(json!("C done")));

    let task = scheduler.start(from_fn(move |co| async move {
        let fork_a = co.fork(a, vec![]).await?;
        let fork_b = co.fork(b, vec![]).await?;
        co.call(c, vec![]).await?;
        let a = co.join(&fork_a).await?;
        let b = co.join(&fork_b).await?;
        co.put(json!({"kind": "X"})).await?;
        Ok(json!({"a": a, "b": b}))
    }));

    assert_eq!(
        task.result().await,
        Ok(json!({"a": {"source": "A"}, "b": {"source": "B"}}))
    );

    let events = sink.events();
    let x_events: Vec<&Value> = events.iter().filter(|e| e["kind"] == "X").collect();
    assert_eq!(x_events.len(), 1);
    assert_eq!(events.len(), 1);
    assert!(scheduler.active_tasks().is_empty());
}

#[tokio::test]
async fn puts_dispatch_in_declaration_order() {
    let (scheduler, sink) = scheduler();

    let task = scheduler.start(from_fn(|co| async move {
        for n in 1..=3 {
            co.put(json!({"type": "STEP", "n": n})).await?;
        }
        Ok(Value::Null)
    }));

    task.result().await.unwrap();
    let order: Vec<i64> = sink
        .events_of_type("STEP")
        .iter()
        .filter_map(|e| e["n"].as_i64())
        .collect();
    assert_eq!(order, vec![1, 2, 3]);
}

#[tokio::test]
async fn put_dispatches_after_already_scheduled_work() {
    let log = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink: Arc<dyn Dispatch> = {
        let log = log.clone();
        Arc::new(move |event: Value| {
            log.lock().unwrap().push(format!("dispatched {}", event["type"]));
            Value::Null
        })
    };
    let scheduler = Scheduler::new(sink);

    let sibling = {
        let log = log.clone();
        Target::coroutine("sibling", move |_args| {
            let log = log.clone();
            from_fn(move |_co| async move {
                log.lock().unwrap().push("sibling ran".to_string());
                Ok(Value::Null)
            })
        })
    };

    let task = scheduler.start(from_fn(move |co| async move {
        co.fork(sibling, vec![]).await?;
        co.put(json!({"type": "DONE"})).await
    }));

    task.result().await.unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["sibling ran".to_string(), "dispatched \"DONE\"".to_string()]
    );
}

#[tokio::test]
async fn join_of_a_panicked_fork_rejects_as_abandoned() {
    let (scheduler, _sink) = scheduler();
    let broken = Target::coroutine("broken", |_args| {
        from_fn(|_co| async move {
            if true {
                panic!("forked body panicked");
            }
            Ok(Value::Null)
        })
    });

    let task = scheduler.start(from_fn(move |co| async move {
        let forked = co.fork(broken, vec![]).await?;
        match co.join(&forked).await {
            Err(EffectError::Abandoned(id)) if id == forked.id() => Ok(json!("abandoned")),
            other => Ok(json!(format!("{other:?}"))),
        }
    }));

    assert_eq!(task.result().await, Ok(json!("abandoned")));
    assert!(scheduler.active_tasks().is_empty());
}
