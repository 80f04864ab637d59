// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unwrap_used)] // test scaffolding

use super::*;
use parking_lot::Mutex as PlMutex;
use std::collections::VecDeque;
use std::sync::atomic::AtomicI64;
use std::thread;

fn table() -> PendingRequestTable<String> {
    PendingRequestTable::new("client for service '/test'")
}

#[test]
fn test_matched_response_resolves_once() {
    let table = table();
    let mut future = table.register(|| Ok(7)).unwrap();
    assert_eq!(future.sequence_number(), 7);
    assert!(table.contains(7));
    assert!(future.try_result().is_none());

    let delivery = table
        .receive(|| Ok(Some((7, "y=2".to_string()))))
        .unwrap()
        .unwrap();
    assert_eq!(delivery.sequence_number, 7);
    assert!(!table.contains(7));
    assert!(delivery.resolver.unwrap().resolve(Ok(delivery.payload)));

    assert_eq!(future.try_result().unwrap().unwrap(), "y=2");
    assert!(future.try_result().is_none());
}

#[test]
fn test_unmatched_response_has_no_resolver() {
    let table = table();
    let _pending = table.register(|| Ok(1)).unwrap();
    let delivery = table
        .receive(|| Ok(Some((99, "stray".to_string()))))
        .unwrap()
        .unwrap();
    assert!(delivery.resolver.is_none());
    assert_eq!(table.pending_ids(), vec![1]);
}

#[test]
fn test_nothing_available_and_take_errors() {
    let table = table();
    assert!(table
        .receive(|| Ok(None::<(i64, String)>))
        .unwrap()
        .is_none());

    let err = table
        .receive(|| Err::<Option<(i64, String)>, _>(Error::Middleware("broken".into())))
        .err()
        .unwrap();
    assert!(matches!(err, Error::Middleware(_)));
}

#[test]
fn test_send_failure_inserts_nothing() {
    let table = table();
    let err = table
        .register(|| Err(Error::Middleware("link down".into())))
        .unwrap_err();
    assert!(matches!(err, Error::Middleware(_)));
    assert!(table.is_empty());
}

#[test]
fn test_cancel_then_late_response_is_discarded() {
    let table = table();
    let mut future = table.register(|| Ok(3)).unwrap();

    assert!(table.cancel(&future));
    assert!(!table.cancel(&future));
    assert!(matches!(future.try_result(), Some(Err(Error::Cancelled))));

    let late = table
        .receive(|| Ok(Some((3, "late".to_string()))))
        .unwrap()
        .unwrap();
    assert!(late.resolver.is_none());
    assert!(future.try_result().is_none());
}

#[test]
fn test_cancel_after_completion_reports_not_found() {
    let table = table();
    let future = table.register(|| Ok(4)).unwrap();
    let delivery = table
        .receive(|| Ok(Some((4, "done".to_string()))))
        .unwrap()
        .unwrap();
    delivery.resolver.unwrap().resolve(Ok(delivery.payload));
    assert!(!table.cancel(&future));
    assert_eq!(future.wait().unwrap(), "done");
}

#[test]
fn test_cancel_ignores_foreign_future() {
    let first = table();
    let second = table();
    let foreign = second.register(|| Ok(1)).unwrap();
    let _own = first.register(|| Ok(1)).unwrap();

    assert!(!first.cancel(&foreign));
    assert!(first.contains(1));
    assert!(second.cancel(&foreign));
}

#[test]
fn test_dispose_all_drains_and_closes() {
    let table = table();
    let futures: Vec<_> = (1..=3).map(|id| table.register(move || Ok(id)).unwrap()).collect();
    assert_eq!(table.len(), 3);

    assert_eq!(table.dispose_all(), 3);
    assert!(table.is_empty());
    assert!(table.is_closed());
    assert_eq!(table.dispose_all(), 0);

    for future in futures {
        let err = future.wait().unwrap_err();
        assert!(err.is_disposed());
        assert!(err.to_string().contains("'/test'"));
    }

    let mut sent = false;
    let err = table
        .register(|| {
            sent = true;
            Ok(9)
        })
        .unwrap_err();
    assert!(err.is_disposed());
    assert!(!sent, "send must not run once the table is closed");
}

#[test]
fn test_dropped_table_fails_future() {
    let table = table();
    let future = table.register(|| Ok(5)).unwrap();
    drop(table);
    assert!(future.wait().unwrap_err().is_disposed());
}

// Responses become available the instant the id is issued; every call must
// still be matched.
#[test]
fn test_concurrent_calls_against_instant_responses() {
    const CALLERS: usize = 4;
    const CALLS: usize = 50;

    let table = Arc::new(PendingRequestTable::<i64>::new("client for service '/echo'"));
    let wire = Arc::new(PlMutex::new(VecDeque::<(i64, i64)>::new()));
    let next_id = Arc::new(AtomicI64::new(1));

    let callers: Vec<_> = (0..CALLERS)
        .map(|_| {
            let table = Arc::clone(&table);
            let wire = Arc::clone(&wire);
            let next_id = Arc::clone(&next_id);
            thread::spawn(move || {
                (0..CALLS)
                    .map(|_| {
                        table
                            .register(|| {
                                let id = next_id.fetch_add(1, Ordering::Relaxed);
                                wire.lock().push_back((id, id * 10));
                                Ok(id)
                            })
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let driver = {
        let table = Arc::clone(&table);
        let wire = Arc::clone(&wire);
        thread::spawn(move || {
            let mut matched = 0;
            while matched < CALLERS * CALLS {
                let delivery = table.receive(|| Ok(wire.lock().pop_front())).unwrap();
                match delivery {
                    Some(delivery) => {
                        let resolver = delivery.resolver.expect("every response must match");
                        resolver.resolve(Ok(delivery.payload));
                        matched += 1;
                    }
                    None => thread::yield_now(),
                }
            }
        })
    };

    for caller in callers {
        for future in caller.join().expect("caller panicked") {
            let id = future.sequence_number();
            assert_eq!(future.wait().unwrap(), id * 10);
        }
    }
    driver.join().expect("driver panicked");
    assert!(table.is_empty());
}

#[tokio::test]
async fn test_future_is_awaitable() {
    let table = Arc::new(table());
    let future = table.register(|| Ok(11)).unwrap();

    let remote = Arc::clone(&table);
    let handle = thread::spawn(move || {
        let delivery = remote
            .receive(|| Ok(Some((11, "async".to_string()))))
            .unwrap()
            .unwrap();
        delivery.resolver.unwrap().resolve(Ok(delivery.payload))
    });

    let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), future)
        .await
        .expect("future should resolve");
    assert_eq!(outcome.unwrap(), "async");
    assert!(handle.join().expect("resolver thread panicked"));
}
