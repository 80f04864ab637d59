// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::items_after_statements)] // Test helpers
#![allow(clippy::needless_pass_by_value)] // Test functions

//! Service client / server integration tests over the in-process middleware.
//!
//! Covers request/response correlation, cancellation racing a late response,
//! disposal of pending calls, and blocking or async callers on application
//! threads while a driving thread polls the wait set.

use rclcore::{
    Client, Context, Disposable, EnvConfig, Error, QosProfile, ResponseFuture, Service,
    ServiceBase, WaitSet, Waitable,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn context(domain_id: u32) -> anyhow::Result<Context> {
    let config = EnvConfig {
        domain_id,
        ..EnvConfig::default()
    };
    Ok(Context::with_config(config)?)
}

/// Poll `wait_set` until `future` resolves.
fn spin_until<T>(
    wait_set: &mut WaitSet,
    future: &mut ResponseFuture<T>,
) -> anyhow::Result<rclcore::Result<T>> {
    for _ in 0..100 {
        if let Some(outcome) = future.try_result() {
            return Ok(outcome);
        }
        if let Some(result) = wait_set.try_wait(Some(Duration::from_millis(50)))? {
            result.ready()?.process_all()?;
        }
    }
    anyhow::bail!("response {} never arrived", future.sequence_number())
}

/// Drive a wait set on a background thread until `stop` is set.
struct Spinner {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<rclcore::Result<usize>>>,
}

impl Spinner {
    fn start(mut wait_set: WaitSet) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let mut processed = 0;
            while !flag.load(Ordering::Acquire) {
                if let Some(result) = wait_set.try_wait(Some(Duration::from_millis(10)))? {
                    processed += result.ready()?.process_all()?;
                }
            }
            Ok(processed)
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    fn stop(mut self) -> usize {
        self.stop.store(true, Ordering::Release);
        let handle = self.handle.take().expect("spinner handle");
        handle.join().expect("spinner thread").expect("spinner loop")
    }
}

type Adder = Service<i64, i64>;
type AdderClient = Client<i64, i64>;

fn adder(context: &Context, node: &rclcore::Node) -> anyhow::Result<(Arc<Adder>, Arc<AdderClient>, WaitSet)> {
    let server = node.create_service::<i64, i64, _>("add_one", QosProfile::services_default(), |x| x + 1)?;
    let client = node.create_client::<i64, i64>("add_one", QosProfile::services_default())?;
    let mut wait_set = context.create_wait_set()?;
    wait_set.add_service(server.clone())?;
    wait_set.add_client(client.clone())?;
    Ok((server, client, wait_set))
}

#[test]
fn test_call_round_trip() -> anyhow::Result<()> {
    let ctx = context(9401)?;
    let node = ctx.create_node("adder", "/math")?;
    let (server, client, mut wait_set) = adder(&ctx, &node)?;
    assert_eq!(server.topic(), "/math/add_one");
    assert!(client.service_is_available()?);

    let mut future = client.call_async(&41)?;
    assert_eq!(future.sequence_number(), 1);
    assert_eq!(client.pending_requests(), vec![1]);

    let response = spin_until(&mut wait_set, &mut future)??;
    assert_eq!(response, 42);
    assert!(client.pending_requests().is_empty());
    // The future yields its outcome once.
    assert!(future.try_result().is_none());
    Ok(())
}

#[test]
fn test_responses_routed_to_issuing_client() -> anyhow::Result<()> {
    let ctx = context(9402)?;
    let node = ctx.create_node("router", "/")?;
    let (_server, first, mut wait_set) = adder(&ctx, &node)?;
    let second = node.create_client::<i64, i64>("add_one", QosProfile::services_default())?;
    wait_set.add_client(second.clone())?;

    let mut a = first.call_async(&10)?;
    let mut b = second.call_async(&20)?;
    let mut c = first.call_async(&30)?;
    // Sequence numbers are per client.
    assert_eq!((a.sequence_number(), b.sequence_number(), c.sequence_number()), (1, 1, 2));

    assert_eq!(spin_until(&mut wait_set, &mut a)??, 11);
    assert_eq!(spin_until(&mut wait_set, &mut b)??, 21);
    assert_eq!(spin_until(&mut wait_set, &mut c)??, 31);
    assert!(first.pending_requests().is_empty());
    assert!(second.pending_requests().is_empty());
    Ok(())
}

#[test]
fn test_cancel_then_late_response_is_discarded() -> anyhow::Result<()> {
    let ctx = context(9403)?;
    let node = ctx.create_node("canceller", "/")?;
    let (server, client, _wait_set) = adder(&ctx, &node)?;

    let mut future = client.call_async(&1)?;
    assert!(client.cancel(&future));
    assert!(!client.cancel(&future));
    assert!(matches!(future.try_result(), Some(Err(Error::Cancelled))));
    assert!(client.pending_requests().is_empty());

    // The server still answers; the client consumes and drops the response.
    assert!(server.try_process()?);
    assert!(client.try_process()?);
    assert!(!client.try_process()?);
    assert!(future.try_result().is_none());
    Ok(())
}

#[test]
fn test_dispose_fails_pending_calls() -> anyhow::Result<()> {
    let ctx = context(9404)?;
    let node = ctx.create_node("disposer", "/")?;
    let client = node.create_client::<i64, i64>("nobody_home", QosProfile::services_default())?;
    assert!(!client.service_is_available()?);

    let first = client.call_async(&1)?;
    let second = client.call_async(&2)?;
    assert_eq!(client.pending_requests(), vec![1, 2]);

    client.dispose()?;
    client.dispose()?;
    assert!(client.pending_requests().is_empty());
    assert!(matches!(first.wait(), Err(Error::Disposed(_))));
    assert!(matches!(second.wait(), Err(Error::Disposed(_))));
    assert!(matches!(client.call_async(&3), Err(Error::Disposed(_))));
    assert!(matches!(client.try_process(), Err(Error::Disposed(_))));
    Ok(())
}

#[test]
fn test_node_dispose_reaches_clients() -> anyhow::Result<()> {
    let ctx = context(9405)?;
    let node = ctx.create_node("owner", "/")?;
    let client = node.create_client::<i64, i64>("nobody_home", QosProfile::services_default())?;
    let pending = client.call_async(&5)?;

    node.dispose()?;
    assert!(client.is_disposed());
    assert!(matches!(pending.wait(), Err(Error::Disposed(_))));
    assert!(matches!(
        node.create_client::<i64, i64>("late", QosProfile::services_default()),
        Err(Error::Disposed(_))
    ));
    Ok(())
}

#[test]
fn test_second_server_and_type_mismatch_rejected() -> anyhow::Result<()> {
    let ctx = context(9406)?;
    let node = ctx.create_node("strict", "/")?;
    let _server = node.create_service::<i64, i64, _>("/unique", QosProfile::services_default(), |x| x)?;

    let again = node.create_service::<i64, i64, _>("/unique", QosProfile::services_default(), |x| x);
    assert!(matches!(again, Err(Error::InvalidArgument(_))));

    let wrong = node.create_client::<String, String>("/unique", QosProfile::services_default());
    assert!(matches!(wrong, Err(Error::TypeMismatch { .. })));
    Ok(())
}

#[test]
fn test_blocking_calls_from_application_threads() -> anyhow::Result<()> {
    let ctx = context(9407)?;
    let node = ctx.create_node("blocking", "/")?;
    let (_server, client, wait_set) = adder(&ctx, &node)?;
    let spinner = Spinner::start(wait_set);

    let callers: Vec<_> = (0..4)
        .map(|caller| {
            let client = Arc::clone(&client);
            thread::spawn(move || -> rclcore::Result<Vec<i64>> {
                (0..25).map(|i| client.call(&(caller * 100 + i))).collect()
            })
        })
        .collect();

    for (caller, handle) in callers.into_iter().enumerate() {
        let responses = handle.join().expect("caller thread")?;
        let expected: Vec<i64> = (0..25).map(|i| caller as i64 * 100 + i + 1).collect();
        assert_eq!(responses, expected);
    }

    // 100 requests served and 100 responses consumed.
    assert!(spinner.stop() >= 200);
    assert!(client.pending_requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_await_response() -> anyhow::Result<()> {
    let ctx = context(9408)?;
    let node = ctx.create_node("async", "/")?;
    let (_server, client, wait_set) = adder(&ctx, &node)?;
    let spinner = Spinner::start(wait_set);

    let response = client.call_async(&99)?.await?;
    assert_eq!(response, 100);
    let timed = client.call_with_timeout(&1, Duration::from_secs(5)).await?;
    assert_eq!(timed, 2);

    spinner.stop();
    Ok(())
}

#[tokio::test]
async fn test_call_with_timeout_cancels() -> anyhow::Result<()> {
    let ctx = context(9409)?;
    let node = ctx.create_node("impatient", "/")?;
    let client = node.create_client::<i64, i64>("nobody_home", QosProfile::services_default())?;

    let outcome = client.call_with_timeout(&1, Duration::from_millis(20)).await;
    assert!(matches!(outcome, Err(Error::Timeout)));
    assert!(client.pending_requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_dropped_timed_call_is_cancelled() -> anyhow::Result<()> {
    let ctx = context(9410)?;
    let node = ctx.create_node("fickle", "/")?;
    let client = node.create_client::<i64, i64>("nobody_home", QosProfile::services_default())?;

    tokio::select! {
        _ = client.call_with_timeout(&1, Duration::from_secs(30)) => panic!("no server should answer"),
        () = tokio::time::sleep(Duration::from_millis(20)) => {}
    }
    assert!(client.pending_requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_blocking_call_inside_runtime_is_refused() -> anyhow::Result<()> {
    let ctx = context(9411)?;
    let node = ctx.create_node("blocking", "/")?;
    let client = node.create_client::<i64, i64>("nobody_home", QosProfile::services_default())?;

    assert!(matches!(client.call(&1), Err(Error::InvalidArgument(_))));
    assert!(client.pending_requests().is_empty());

    let future = client.call_async(&2)?;
    assert!(matches!(future.wait(), Err(Error::InvalidArgument(_))));
    Ok(())
}
