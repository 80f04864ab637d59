// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::cast_possible_wrap)] // Test conversions

//! Wait set integration tests over the in-process middleware.
//!
//! Exercises readiness across every waitable kind, wake-ups from other
//! threads, snapshot invalidation and the configured slot capacity.

use parking_lot::Mutex;
use rclcore::{
    ClientBase, Context, Disposable, EntityKind, EnvConfig, Error, GuardCondition, HandleId,
    QosProfile, Waitable,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn context(domain_id: u32) -> anyhow::Result<Context> {
    let config = EnvConfig {
        domain_id,
        ..EnvConfig::default()
    };
    Ok(Context::with_config(config)?)
}

fn ids<T: Waitable + ?Sized>(waitables: &[Arc<T>]) -> HashSet<HandleId> {
    waitables.iter().map(|w| w.handle_id()).collect()
}

#[test]
fn test_client_and_guard_scenario() -> anyhow::Result<()> {
    let ctx = context(9501)?;
    let node = ctx.create_node("scenario", "/")?;
    let server = node.create_service::<i64, i64, _>("/inc", QosProfile::services_default(), |x| x + 1)?;
    let client = node.create_client::<i64, i64>("/inc", QosProfile::services_default())?;
    let guard = ctx.create_guard_condition(|| {})?;

    let mut wait_set = ctx.create_wait_set()?;
    wait_set.add_client(client.clone())?;
    wait_set.add_guard_condition(Arc::clone(&guard))?;
    let mut server_wait_set = ctx.create_wait_set()?;
    server_wait_set.add_service(server.clone())?;

    let mut future = client.call_async(&1)?;

    let remote = Arc::clone(&guard);
    let trigger = thread::spawn(move || remote.trigger());
    let result = wait_set.wait(None)?;
    trigger.join().expect("trigger thread")?;

    let ready = result.ready()?;
    assert_eq!(ids(&ready.guard_conditions), ids(&[Arc::clone(&guard)]));
    assert!(ready.clients.is_empty());

    // The peer answers, then the client becomes ready on the next wait.
    let served = server_wait_set.wait(Some(Duration::from_secs(1)))?;
    assert_eq!(served.ready()?.process_all()?, 1);

    let result = wait_set.wait(Some(Duration::from_secs(1)))?;
    let ready_clients = result.ready_clients()?;
    assert_eq!(ready_clients.len(), 1);
    assert_eq!(ready_clients[0].pending_requests(), vec![future.sequence_number()]);
    assert!(ready_clients[0].try_process()?);

    assert_eq!(future.try_result().expect("resolved")?, 2);
    assert!(client.pending_requests().is_empty());
    Ok(())
}

#[test]
fn test_no_lost_wakeups_under_publishing_thread() -> anyhow::Result<()> {
    const COUNT: i32 = 200;
    let ctx = context(9502)?;
    let node = ctx.create_node("wakeups", "/")?;
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let subscription = node.create_subscription::<i32, _>(
        "/ticks",
        QosProfile::default().keep_all(),
        move |value| sink.lock().push(value),
    )?;
    let publisher = node.create_publisher::<i32>("/ticks", QosProfile::default())?;

    let mut wait_set = ctx.create_wait_set()?;
    wait_set.add_subscription(subscription.clone())?;

    let producer = thread::spawn(move || -> rclcore::Result<()> {
        for value in 0..COUNT {
            publisher.publish(&value)?;
            if value % 16 == 0 {
                thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(())
    });

    let deadline = Instant::now() + Duration::from_secs(10);
    while received.lock().len() < COUNT as usize {
        assert!(Instant::now() < deadline, "stalled at {}", received.lock().len());
        let result = wait_set.wait(Some(Duration::from_secs(2)))?;
        for ready in result.ready_subscriptions()? {
            while ready.try_process()? {}
        }
    }
    producer.join().expect("producer thread")?;

    assert_eq!(*received.lock(), (0..COUNT).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_randomized_registration_readiness() -> anyhow::Result<()> {
    let ctx = context(9503)?;
    let mut rng = fastrand::Rng::with_seed(2024);

    for round in 0..10 {
        let mut guards: Vec<Arc<GuardCondition>> = (0..rng.usize(1..24))
            .map(|_| ctx.create_guard_condition(|| {}))
            .collect::<rclcore::Result<_>>()?;
        rng.shuffle(&mut guards);

        let mut wait_set = ctx.create_wait_set()?;
        for guard in &guards {
            wait_set.add_guard_condition(Arc::clone(guard))?;
        }
        assert_eq!(wait_set.len(), guards.len());

        let mut expected = HashSet::new();
        for guard in guards.iter().filter(|_| rng.bool()) {
            guard.trigger()?;
            expected.insert(guard.handle_id());
        }

        match wait_set.try_wait(Some(Duration::ZERO))? {
            Some(result) => assert_eq!(ids(&result.ready_guard_conditions()?), expected, "round {round}"),
            None => assert!(expected.is_empty(), "round {round}"),
        }
    }
    Ok(())
}

#[test]
fn test_every_accessor_fails_after_next_wait() -> anyhow::Result<()> {
    let ctx = context(9504)?;
    let guard = ctx.create_guard_condition(|| {})?;
    let mut wait_set = ctx.create_wait_set()?;
    wait_set.add_guard_condition(Arc::clone(&guard))?;

    guard.trigger()?;
    let old = wait_set.wait(Some(Duration::from_secs(1)))?;
    // A new wait invalidates the old result even when it times out.
    assert!(wait_set.try_wait(Some(Duration::ZERO))?.is_none());

    assert!(old.is_stale());
    assert!(matches!(old.ready_subscriptions(), Err(Error::StaleWaitResult)));
    assert!(matches!(old.ready_guard_conditions(), Err(Error::StaleWaitResult)));
    assert!(matches!(old.ready_clients(), Err(Error::StaleWaitResult)));
    assert!(matches!(old.ready_services(), Err(Error::StaleWaitResult)));
    assert!(matches!(old.ready(), Err(Error::StaleWaitResult)));
    Ok(())
}

#[test]
fn test_empty_wait_set_rejected() -> anyhow::Result<()> {
    let ctx = context(9505)?;
    let guard = ctx.create_guard_condition(|| {})?;
    let mut wait_set = ctx.create_wait_set()?;
    assert!(matches!(wait_set.wait(None), Err(Error::EmptyWaitSet)));

    wait_set.add_guard_condition(Arc::clone(&guard))?;
    wait_set.remove_guard_condition(&guard);
    let start = Instant::now();
    assert!(matches!(wait_set.wait(None), Err(Error::EmptyWaitSet)));
    assert!(start.elapsed() < Duration::from_secs(1));
    Ok(())
}

#[test]
fn test_capacity_from_config() -> anyhow::Result<()> {
    let config = EnvConfig {
        domain_id: 9506,
        wait_set_capacity: 2,
        ..EnvConfig::default()
    };
    let ctx = Context::with_config(config)?;
    let mut wait_set = ctx.create_wait_set()?;
    for _ in 0..3 {
        let guard = ctx.create_guard_condition(|| {})?;
        guard.trigger()?;
        wait_set.add_guard_condition(guard)?;
    }

    let err = wait_set.wait(Some(Duration::ZERO)).unwrap_err();
    assert!(matches!(
        err,
        Error::CapacityExceeded {
            kind: EntityKind::GuardCondition,
            capacity: 2
        }
    ));
    Ok(())
}

#[test]
fn test_context_dispose_invalidates_wait_set() -> anyhow::Result<()> {
    let ctx = context(9507)?;
    let guard = ctx.create_guard_condition(|| {})?;
    let mut wait_set = ctx.create_wait_set()?;
    wait_set.add_guard_condition(Arc::clone(&guard))?;
    guard.trigger()?;
    let result = wait_set.wait(Some(Duration::from_secs(1)))?;

    ctx.dispose()?;
    assert!(wait_set.is_disposed());
    assert!(matches!(result.ready(), Err(Error::StaleWaitResult)));
    assert!(matches!(wait_set.wait(None), Err(Error::Disposed(_))));
    Ok(())
}

#[test]
fn test_context_dispose_during_infinite_wait() -> anyhow::Result<()> {
    let ctx = Arc::new(context(9508)?);
    let guard = ctx.create_guard_condition(|| {})?;
    let mut wait_set = ctx.create_wait_set()?;
    wait_set.add_guard_condition(Arc::clone(&guard))?;

    let (tx, rx) = crossbeam::channel::bounded(1);
    let waiter = thread::spawn(move || {
        let _ = tx.send(wait_set.wait(None).err());
    });
    thread::sleep(Duration::from_millis(30));

    let disposer = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || ctx.dispose())
    };
    let outcome = rx.recv_timeout(Duration::from_secs(5))?;
    assert!(matches!(outcome, Some(Error::Disposed(_))), "unexpected outcome: {:?}", outcome);
    disposer.join().expect("disposer thread")?;
    waiter.join().expect("waiter thread");
    assert!(ctx.is_disposed());
    assert!(guard.is_disposed());
    Ok(())
}

#[test]
fn test_endpoint_dispose_during_infinite_wait() -> anyhow::Result<()> {
    let ctx = context(9509)?;
    let node = ctx.create_node("listener", "/")?;
    let subscription = node.create_subscription::<i32, _>("/ticks", QosProfile::default(), |_| {})?;
    let mut wait_set = ctx.create_wait_set()?;
    wait_set.add_subscription(subscription.clone())?;

    let (tx, rx) = crossbeam::channel::bounded(1);
    let waiter = thread::spawn(move || {
        let outcome = wait_set.wait(None).err();
        let _ = tx.send(outcome);
        wait_set
    });
    thread::sleep(Duration::from_millis(30));
    subscription.dispose()?;

    let outcome = rx.recv_timeout(Duration::from_secs(5))?;
    assert!(matches!(outcome, Some(Error::Disposed(_))), "unexpected outcome: {:?}", outcome);
    let mut wait_set = waiter.join().expect("waiter thread");
    assert_eq!(wait_set.prune_disposed(), 1);
    assert!(wait_set.is_empty());
    Ok(())
}
