//! Runtime tests on a paused Tokio clock.

use serde_json::json;
use statecraft::builder::{DefinitionBuilder, StateBuilder, TransitionBuilder};
use statecraft::config::RuntimeConfig;
use statecraft::core::JsonContext;
use statecraft::definition::{Invocation, MachineDefinition};
use statecraft::machine::{Machine, Status};
use statecraft::retry::RetryPolicy;
use statecraft::runtime::{self, MachineHandle, RuntimeError};
use statecraft::state_enum;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

state_enum! {
    enum Light {
        Green,
        Yellow,
        Red,
        Flashing,
    }
}

state_enum! {
    enum Fetch {
        Idle,
        Loading,
        Loaded,
        Failed,
    }
    error: [Failed]
}

fn light() -> MachineDefinition<Light, &'static str, JsonContext> {
    DefinitionBuilder::new()
        .initial(Light::Green)
        .state(StateBuilder::new(Light::Green).on("NEXT", Light::Yellow))
        .state(
            StateBuilder::new(Light::Yellow)
                .after(Duration::from_millis(1000), Light::Red)
                .on("FAULT", Light::Flashing),
        )
        .state(
            StateBuilder::new(Light::Red)
                .transition(
                    TransitionBuilder::after(Duration::from_millis(2000))
                        .to(Light::Green)
                        .action(|ctx: &JsonContext, _| {
                            json!({ "cycles": ctx.get_u64("cycles").unwrap_or(0) + 1 })
                        }),
                ),
        )
        .state(StateBuilder::new(Light::Flashing).on("RESET", Light::Green))
        .build()
        .unwrap()
}

fn spawn_light() -> MachineHandle<Light, &'static str, JsonContext> {
    let machine = Machine::new(light(), JsonContext::new()).unwrap();
    runtime::spawn(machine, &RuntimeConfig::default())
}

/// Loader whose first `failures` calls fail.
fn fetcher(failures: u32) -> MachineDefinition<Fetch, String, JsonContext> {
    let calls = Arc::new(AtomicU32::new(0));

    DefinitionBuilder::new()
        .initial(Fetch::Idle)
        .state(StateBuilder::new(Fetch::Idle).on("LOAD", Fetch::Loading))
        .state(
            StateBuilder::new(Fetch::Loading)
                .invoke(Invocation::fallible(
                    "fetch",
                    move |_ctx: &JsonContext| {
                        let call = calls.fetch_add(1, Ordering::SeqCst);
                        async move {
                            sleep(Duration::from_millis(100)).await;
                            if call < failures {
                                Err(format!("attempt {} failed", call + 1))
                            } else {
                                Ok(call + 1)
                            }
                        }
                    },
                    |_calls| "LOADED".to_string(),
                    |_error| "LOAD_FAILED".to_string(),
                ))
                .transition(
                    TransitionBuilder::on("LOADED")
                        .to(Fetch::Loaded)
                        .reset_retries("fetch"),
                )
                .transition(
                    TransitionBuilder::on("LOAD_FAILED")
                        .to(Fetch::Loading)
                        .retry("fetch", Fetch::Failed),
                )
                .on("CANCEL", Fetch::Idle),
        )
        .state(StateBuilder::new(Fetch::Loaded).on("LOAD", Fetch::Loading))
        .state(StateBuilder::new(Fetch::Failed).final_state())
        .retry_policy("fetch", RetryPolicy::new(3))
        .build()
        .unwrap()
}

fn spawn_fetcher(failures: u32) -> MachineHandle<Fetch, String, JsonContext> {
    let machine = Machine::new(fetcher(failures), JsonContext::new()).unwrap();
    runtime::spawn(machine, &RuntimeConfig::default())
}

#[tokio::test(start_paused = true)]
async fn delayed_transition_fires_after_its_delay() {
    let handle = spawn_light();
    handle.start().await.unwrap();
    handle.send("NEXT").await.unwrap();

    sleep(Duration::from_millis(999)).await;
    assert_eq!(handle.snapshot().await.unwrap().state(), Some(&Light::Yellow));

    sleep(Duration::from_millis(2)).await;
    assert_eq!(handle.snapshot().await.unwrap().state(), Some(&Light::Red));

    sleep(Duration::from_millis(2000)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state(), Some(&Light::Green));
    assert_eq!(snapshot.context.get_u64("cycles"), Some(1));
}

#[tokio::test(start_paused = true)]
async fn exiting_a_state_cancels_its_timer() {
    let handle = spawn_light();
    handle.start().await.unwrap();
    handle.send("NEXT").await.unwrap();

    sleep(Duration::from_millis(500)).await;
    let exited = handle.send("FAULT").await.unwrap();
    assert_eq!(exited.state(), Some(&Light::Flashing));

    sleep(Duration::from_millis(1000)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state(), Some(&Light::Flashing));
    assert_eq!(snapshot.generation, exited.generation);
}

#[tokio::test(start_paused = true)]
async fn reentering_a_state_arms_a_fresh_timer() {
    let handle = spawn_light();
    handle.start().await.unwrap();
    handle.send("NEXT").await.unwrap();

    sleep(Duration::from_millis(600)).await;
    handle.send("FAULT").await.unwrap();
    handle.send("RESET").await.unwrap();
    handle.send("NEXT").await.unwrap();

    // The first timer would have fired at 1000ms.
    sleep(Duration::from_millis(600)).await;
    assert_eq!(handle.snapshot().await.unwrap().state(), Some(&Light::Yellow));

    sleep(Duration::from_millis(500)).await;
    assert_eq!(handle.snapshot().await.unwrap().state(), Some(&Light::Red));
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_timers() {
    let handle = spawn_light();
    handle.start().await.unwrap();
    handle.send("NEXT").await.unwrap();

    let stopped = handle.stop().await.unwrap();
    assert_eq!(stopped.status, Status::Stopped);

    sleep(Duration::from_millis(5000)).await;
    assert_eq!(handle.snapshot().await.unwrap(), stopped);
}

#[tokio::test(start_paused = true)]
async fn watchers_see_timer_driven_transitions() {
    let handle = spawn_light();
    let (_id, mut updates) = handle.watch().await.unwrap();

    handle.start().await.unwrap();
    handle.send("NEXT").await.unwrap();
    sleep(Duration::from_millis(1001)).await;

    let mut paths = Vec::new();
    while let Ok(snapshot) = updates.try_recv() {
        paths.push(snapshot.path());
    }
    assert_eq!(paths, vec!["Green", "Yellow", "Red"]);
}

#[tokio::test(start_paused = true)]
async fn invocation_result_drives_transition() {
    let handle = spawn_fetcher(0);
    handle.start().await.unwrap();

    let loading = handle.send("LOAD".to_string()).await.unwrap();
    assert_eq!(loading.state(), Some(&Fetch::Loading));

    sleep(Duration::from_millis(150)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state(), Some(&Fetch::Loaded));
    assert_eq!(snapshot.attempts("fetch"), 0);
}

#[tokio::test(start_paused = true)]
async fn failing_invocation_is_retried_until_success() {
    let handle = spawn_fetcher(2);
    handle.start().await.unwrap();
    handle.send("LOAD".to_string()).await.unwrap();

    sleep(Duration::from_millis(150)).await;
    assert_eq!(handle.snapshot().await.unwrap().attempts("fetch"), 1);

    sleep(Duration::from_millis(200)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state(), Some(&Fetch::Loaded));
    assert_eq!(snapshot.attempts("fetch"), 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_invocation_retries_end_in_failure() {
    let handle = spawn_fetcher(10);
    handle.start().await.unwrap();
    handle.send("LOAD".to_string()).await.unwrap();

    sleep(Duration::from_millis(1000)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state(), Some(&Fetch::Failed));
    assert_eq!(snapshot.status, Status::Stopped);
    assert_eq!(snapshot.attempts("fetch"), 3);
}

#[tokio::test(start_paused = true)]
async fn result_of_exited_invocation_is_ignored() {
    let handle = spawn_fetcher(0);
    handle.start().await.unwrap();
    handle.send("LOAD".to_string()).await.unwrap();

    sleep(Duration::from_millis(50)).await;
    let cancelled = handle.send("CANCEL".to_string()).await.unwrap();
    assert_eq!(cancelled.state(), Some(&Fetch::Idle));

    sleep(Duration::from_millis(500)).await;
    assert_eq!(handle.snapshot().await.unwrap(), cancelled);
}

#[tokio::test(start_paused = true)]
async fn lifecycle_errors_cross_the_handle() {
    let handle = spawn_light();

    let error = handle.send("NEXT").await.unwrap_err();
    assert_eq!(
        error,
        RuntimeError::Machine(statecraft::machine::MachineError::NotStarted)
    );

    handle.start().await.unwrap();
    assert!(matches!(
        handle.start().await,
        Err(RuntimeError::Machine(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn checkpoint_from_running_machine_resumes_timers() {
    let handle = spawn_light();
    handle.start().await.unwrap();
    handle.send("NEXT").await.unwrap();
    let checkpoint = handle.checkpoint().await.unwrap();
    handle.stop().await.unwrap();

    let machine: Machine<Light, &'static str, JsonContext> =
        Machine::from_checkpoint(light(), checkpoint, Default::default()).unwrap();
    let resumed = runtime::spawn(machine, &RuntimeConfig::default());
    assert_eq!(resumed.snapshot().await.unwrap().state(), Some(&Light::Yellow));

    sleep(Duration::from_millis(1001)).await;
    assert_eq!(resumed.snapshot().await.unwrap().state(), Some(&Light::Red));
}
