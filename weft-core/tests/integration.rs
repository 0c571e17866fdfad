//! Integration Tests for the Reactive Runtime
//!
//! These tests drive effects, computed values and watchers together through
//! the public API only.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{json, Value as Json};

use weft_core::reactive::{
    watch, Computed, Effect, EffectOptions, JobQueue, ObservableKey, ReactiveContext,
    ReactiveObject, Ref, Runtime, TargetId,
};
use weft_core::RuntimeConfig;

fn counter() -> Rc<Cell<usize>> {
    Rc::new(Cell::new(0))
}

fn bump(count: &Cell<usize>) {
    count.set(count.get() + 1);
}

/// Reading inside a computation subscribes it; reading outside does not.
#[test]
fn reads_are_attributed_to_the_running_computation() {
    let object = ReactiveObject::from_json(json!({ "k": 1 }));

    object.get("k");
    assert_eq!(Runtime::subscriber_count(&object.key("k")), 0);

    let effect = Effect::new({
        let object = object.clone();
        move || {
            object.get("k");
        }
    });
    assert!(Runtime::is_subscribed(&object.key("k"), effect.id()));
    assert_eq!(effect.dependencies(), vec![object.key("k")]);
}

/// Switching branches drops the subscription to the branch no longer taken.
#[test]
fn branch_switch_cleans_stale_edges() {
    let object = ReactiveObject::from_json(json!({ "flag": true, "k1": 1, "k2": 2 }));
    let runs = counter();

    let _effect = Effect::new({
        let (object, runs) = (object.clone(), runs.clone());
        move || {
            bump(&runs);
            if object.get_plain("flag") == Some(json!(true)) {
                object.get("k1");
            } else {
                object.get("k2");
            }
        }
    });
    assert_eq!(runs.get(), 1);

    // k2 was never read.
    object.set("k2", 20);
    assert_eq!(runs.get(), 1);

    object.set("flag", false);
    assert_eq!(runs.get(), 2);

    // k1 is stale now; k2 is live.
    object.set("k1", 10);
    assert_eq!(runs.get(), 2);
    object.set("k2", 21);
    assert_eq!(runs.get(), 3);
}

/// A body that reads and writes the same key runs once per external write.
#[test]
fn read_then_write_does_not_recurse() {
    let object = ReactiveObject::from_json(json!({ "foo": 0 }));
    let runs = counter();

    let _effect = Effect::new({
        let (object, runs) = (object.clone(), runs.clone());
        move || {
            bump(&runs);
            let foo = object.get_plain("foo").and_then(|v| v.as_i64()).unwrap_or(0);
            object.set("foo", foo + 1);
        }
    });
    assert_eq!(runs.get(), 1);
    assert_eq!(object.get_plain("foo"), Some(json!(1)));

    object.set("foo", 10);
    assert_eq!(runs.get(), 2);
    assert_eq!(object.get_plain("foo"), Some(json!(11)));
}

/// After an inner effect completes, the outer one is active again.
#[test]
fn nested_effects_restore_the_outer_context() {
    let object = ReactiveObject::from_json(json!({ "outer": 1, "inner": 1 }));
    let observed = Rc::new(RefCell::new(Vec::new()));
    let inner_slot: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));
    let outer_runs = counter();
    let inner_runs = counter();

    let outer = Effect::new({
        let (object, observed, inner_slot) = (object.clone(), observed.clone(), inner_slot.clone());
        let (outer_runs, inner_runs) = (outer_runs.clone(), inner_runs.clone());
        move || {
            bump(&outer_runs);
            let inner = Effect::new({
                let (object, inner_runs) = (object.clone(), inner_runs.clone());
                move || {
                    bump(&inner_runs);
                    object.get("inner");
                }
            });
            observed
                .borrow_mut()
                .push(ReactiveContext::current_subscriber());
            object.get("outer");
            *inner_slot.borrow_mut() = Some(inner);
        }
    });

    assert_eq!(*observed.borrow(), vec![Some(outer.id())]);
    assert!(ReactiveContext::current_subscriber().is_none());

    // The inner read was credited to the inner effect only.
    object.set("inner", 2);
    assert_eq!(outer_runs.get(), 1);
    assert_eq!(inner_runs.get(), 2);

    object.set("outer", 2);
    assert_eq!(outer_runs.get(), 2);

    inner_slot.borrow_mut().take();
}

/// Computed values recompute once per invalidation.
#[test]
fn computed_memoizes_between_writes() {
    let object = ReactiveObject::from_json(json!({ "a": 1, "b": 1 }));
    let sum = Computed::new({
        let object = object.clone();
        move || {
            let a = object.get_plain("a").and_then(|v| v.as_i64()).unwrap_or(0);
            let b = object.get_plain("b").and_then(|v| v.as_i64()).unwrap_or(0);
            a + b
        }
    });

    assert_eq!(sum.get(), 2);
    assert_eq!(sum.get(), 2);
    assert_eq!(sum.compute_count(), 1);

    object.set("a", 2);
    assert_eq!(sum.get(), 3);
    assert_eq!(sum.compute_count(), 2);
}

/// An effect reading a computed re-runs when the computed's inputs change.
#[test]
fn effects_observe_computed_values() {
    let count = Ref::new(1);
    let doubled = Computed::new({
        let count = count.clone();
        move || count.get() * 2
    });
    let seen = Rc::new(RefCell::new(Vec::new()));

    let _effect = Effect::new({
        let (doubled, seen) = (doubled.clone(), seen.clone());
        move || seen.borrow_mut().push(doubled.get())
    });

    count.set(2);
    count.set(3);
    assert_eq!(*seen.borrow(), vec![2, 4, 6]);
    assert_eq!(doubled.compute_count(), 3);
}

/// A deep watcher delivers structural new and old values.
#[test]
fn watch_delivers_new_and_old() {
    let object = ReactiveObject::from_json(json!({ "x": 1 }));
    let calls: Rc<RefCell<Vec<(Json, Json)>>> = Rc::new(RefCell::new(Vec::new()));

    let _watcher = watch(object.clone(), {
        let calls = calls.clone();
        move |new: &Json, old: &Json| calls.borrow_mut().push((new.clone(), old.clone()))
    })
    .unwrap();

    object.set("x", 2);
    assert_eq!(*calls.borrow(), vec![(json!({ "x": 2 }), json!({ "x": 1 }))]);
}

/// The end-to-end branch-switch scenario.
#[test]
fn fallback_branch_stops_tracking_text() {
    let object = ReactiveObject::from_json(json!({ "ok": true, "text": "a" }));
    let result = Rc::new(RefCell::new(String::new()));
    let runs = counter();

    let _effect = Effect::new({
        let (object, result, runs) = (object.clone(), result.clone(), runs.clone());
        move || {
            bump(&runs);
            let text = if object.get_plain("ok") == Some(json!(true)) {
                object
                    .get_plain("text")
                    .and_then(|t| t.as_str().map(str::to_owned))
                    .unwrap_or_default()
            } else {
                "fallback".to_owned()
            };
            *result.borrow_mut() = text;
        }
    });
    assert_eq!(*result.borrow(), "a");
    assert_eq!(Runtime::subscriber_count(&object.key("text")), 1);

    object.set("ok", false);
    assert_eq!(*result.borrow(), "fallback");
    assert_eq!(Runtime::subscriber_count(&object.key("text")), 0);

    object.set("text", "b");
    assert_eq!(*result.borrow(), "fallback");
    assert_eq!(runs.get(), 2);
}

/// Two effects feeding each other terminate at the re-entrancy bound.
#[test]
fn mutual_cycle_is_bounded() {
    Runtime::configure(RuntimeConfig::default().with_max_reentrancy(3));

    let x = Ref::new(0);
    let y = Ref::new(0);
    let a_runs = counter();
    let b_runs = counter();

    let _a = Effect::new({
        let (x, y, a_runs) = (x.clone(), y.clone(), a_runs.clone());
        move || {
            bump(&a_runs);
            x.set(y.get() + 1);
        }
    });
    let _b = Effect::new({
        let (x, y, b_runs) = (x.clone(), y.clone(), b_runs.clone());
        move || {
            bump(&b_runs);
            y.set(x.get() + 1);
        }
    });

    // b's creation run re-enters a, and the two alternate until b would be
    // on the stack a fifth time.
    assert!(!ReactiveContext::is_active());
    assert_eq!(a_runs.get(), 5);
    assert_eq!(b_runs.get(), 4);
    assert_eq!(x.get_untracked(), 9);
    assert_eq!(y.get_untracked(), 8);
}

/// A computation subscribed during a trigger round is not run by that round.
#[test]
fn subscriber_added_mid_round_waits_for_next_trigger() {
    let cell = Ref::new(0);
    let late_runs = counter();
    let late: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));

    let _spawner = Effect::new({
        let (cell, late, late_runs) = (cell.clone(), late.clone(), late_runs.clone());
        move || {
            let missing = cell.get() > 0 && late.borrow().is_none();
            if missing {
                let effect = Effect::new({
                    let (cell, late_runs) = (cell.clone(), late_runs.clone());
                    move || {
                        cell.get();
                        bump(&late_runs);
                    }
                });
                *late.borrow_mut() = Some(effect);
            }
        }
    });

    cell.set(1);
    assert_eq!(late_runs.get(), 1);
    assert_eq!(Runtime::subscriber_count(&cell.key()), 2);

    cell.set(2);
    assert_eq!(late_runs.get(), 2);
}

/// Dropping a subscriber mid-round does not shrink the round; it is gone
/// from the next one.
#[test]
fn subscriber_dropped_mid_round_still_runs_that_round() {
    let cell = Ref::new(0);
    let victim_runs = counter();
    let victim: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));

    let _dropper = Effect::new({
        let (cell, victim) = (cell.clone(), victim.clone());
        move || {
            if cell.get() > 0 {
                victim.borrow_mut().take();
            }
        }
    });
    *victim.borrow_mut() = Some(Effect::new({
        let (cell, victim_runs) = (cell.clone(), victim_runs.clone());
        move || {
            cell.get();
            bump(&victim_runs);
        }
    }));

    cell.set(1);
    assert_eq!(victim_runs.get(), 2);
    assert!(victim.borrow().is_none());

    cell.set(2);
    assert_eq!(victim_runs.get(), 2);
    assert_eq!(Runtime::subscriber_count(&cell.key()), 1);
}

/// Disposal is checked at notify time, so a subscriber disposed earlier in
/// the round is skipped.
#[test]
fn subscriber_disposed_mid_round_is_skipped() {
    let cell = Ref::new(0);
    let victim_runs = counter();
    let victim = Effect::new_lazy({
        let (cell, victim_runs) = (cell.clone(), victim_runs.clone());
        move || {
            cell.get();
            bump(&victim_runs);
        }
    });

    let _disposer = Effect::new({
        let (cell, victim) = (cell.clone(), victim.clone());
        move || {
            if cell.get() > 0 {
                victim.dispose();
            }
        }
    });
    victim.run().unwrap();
    assert_eq!(victim_runs.get(), 1);

    cell.set(1);
    assert_eq!(victim_runs.get(), 1);
    assert!(victim.is_disposed());
    assert_eq!(Runtime::subscriber_count(&cell.key()), 1);
}

/// A scheduler hook can coalesce several writes into one re-run.
#[test]
fn scheduler_coalesces_writes() {
    let queue = JobQueue::new();
    let count = Ref::new(0);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let _effect = Effect::with_options(
        {
            let (count, seen) = (count.clone(), seen.clone());
            move || seen.borrow_mut().push(count.get())
        },
        EffectOptions::new().scheduler(queue.scheduler()),
    );

    count.set(1);
    count.set(2);
    count.set(3);
    queue.flush();

    assert_eq!(*seen.borrow(), vec![0, 3]);
}

/// The host-facing read/write hooks drive arbitrary targets.
#[test]
fn host_hooks_drive_custom_targets() {
    let target = TargetId::new();
    let runs = counter();

    let _effect = Effect::new({
        let runs = runs.clone();
        move || {
            bump(&runs);
            Runtime::on_read(target, "field");
        }
    });

    Runtime::on_write(target, "field");
    Runtime::on_write(target, "other");
    assert_eq!(runs.get(), 2);

    Runtime::forget_target(target);
    Runtime::on_write(target, "field");
    assert_eq!(runs.get(), 2);
    assert_eq!(
        Runtime::subscriber_count(&ObservableKey::new(target, "field")),
        0
    );
}

/// A panicking body does not disturb unrelated computations.
#[test]
fn failed_run_leaves_tracking_usable() {
    let cell = Ref::new(0);
    let other = Ref::new(0);
    let other_runs = counter();

    let _failing = Effect::new({
        let cell = cell.clone();
        move || {
            if cell.get() > 0 {
                panic!("cannot handle positive values");
            }
        }
    });
    let _healthy = Effect::new({
        let (other, other_runs) = (other.clone(), other_runs.clone());
        move || {
            other.get();
            bump(&other_runs);
        }
    });

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cell.set(1)));
    assert!(result.is_err());
    assert!(!ReactiveContext::is_active());

    other.set(1);
    assert_eq!(other_runs.get(), 2);
    assert_eq!(other.subscriber_count(), 1);
}
