// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request/response correlation for one client.
//!
//! A correlation id enters the table in the same lock scope that obtained it
//! from the send primitive, and leaves it exactly once: when its response is
//! taken, when the call is cancelled, or when the table is drained on
//! dispose. Futures are always resolved after the lock is released.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::error::{Error, Result};

struct TableState<T> {
    entries: HashMap<i64, oneshot::Sender<Result<T>>>,
    /// Set by `dispose_all`; later registrations fail.
    closed: bool,
}

/// Pending calls of one client, keyed by correlation id.
pub struct PendingRequestTable<T> {
    id: u64,
    owner: Arc<str>,
    state: Mutex<TableState<T>>,
}

/// Completes one pending call.
pub struct Resolver<T> {
    sender: oneshot::Sender<Result<T>>,
}

impl<T> Resolver<T> {
    /// Deliver the outcome. `false` if the awaiting side is gone.
    pub fn resolve(self, outcome: Result<T>) -> bool {
        self.sender.send(outcome).is_ok()
    }
}

/// One message taken through [`PendingRequestTable::receive`].
pub struct Delivery<T, P> {
    pub sequence_number: i64,
    pub payload: P,
    /// `None` when the id was not pending (cancelled, already resolved or never issued).
    pub resolver: Option<Resolver<T>>,
}

impl<T: Send> PendingRequestTable<T> {
    /// `owner` names the client in disposed errors (e.g. "client for service '/add'").
    pub fn new(owner: impl Into<String>) -> Self {
        static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);
        let owner: String = owner.into();
        Self {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            owner: owner.into(),
            state: Mutex::new(TableState {
                entries: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Run `send` and insert the id it returns, in one lock scope.
    ///
    /// A response cannot be matched between the two steps.
    pub fn register<F>(&self, send: F) -> Result<ResponseFuture<T>>
    where
        F: FnOnce() -> Result<i64>,
    {
        let (sender, receiver) = oneshot::channel();
        let (sequence_number, displaced) = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Error::Disposed(self.owner.to_string()));
            }
            let sequence_number = send()?;
            (sequence_number, state.entries.insert(sequence_number, sender))
        };

        debug_assert!(
            displaced.is_none(),
            "correlation id {sequence_number} issued twice"
        );
        if let Some(previous) = displaced {
            log::error!(
                "[client] {} reused correlation id {}, failing the older call",
                self.owner,
                sequence_number
            );
            let _ = previous.send(Err(Error::Middleware(format!(
                "correlation id {sequence_number} reused"
            ))));
        }

        Ok(ResponseFuture {
            table_id: self.id,
            sequence_number,
            owner: Arc::clone(&self.owner),
            receiver,
            completed: false,
        })
    }

    /// Run `take` under the lock and detach the resolver of the id it yields.
    ///
    /// `take` returning `Ok(None)` means nothing was available.
    pub fn receive<F, P>(&self, take: F) -> Result<Option<Delivery<T, P>>>
    where
        F: FnOnce() -> Result<Option<(i64, P)>>,
    {
        let mut state = self.state.lock();
        let Some((sequence_number, payload)) = take()? else {
            return Ok(None);
        };
        let resolver = state
            .entries
            .remove(&sequence_number)
            .map(|sender| Resolver { sender });
        Ok(Some(Delivery {
            sequence_number,
            payload,
            resolver,
        }))
    }

    /// Remove the entry backing `future` and resolve it as cancelled.
    ///
    /// `false` if it already completed, was cancelled, or belongs to another table.
    pub fn cancel(&self, future: &ResponseFuture<T>) -> bool {
        if future.table_id != self.id {
            return false;
        }
        let sender = self.state.lock().entries.remove(&future.sequence_number);
        match sender {
            Some(sender) => {
                let _ = sender.send(Err(Error::Cancelled));
                true
            }
            None => false,
        }
    }

    /// Fail every pending call with a disposed error and refuse new ones.
    ///
    /// Returns how many calls were drained; a second call drains nothing.
    pub fn dispose_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.entries.drain().collect()
        };
        let count = drained.len();
        for (_, sender) in drained {
            let _ = sender.send(Err(Error::Disposed(self.owner.to_string())));
        }
        count
    }

    /// Snapshot of pending correlation ids, ascending.
    pub fn pending_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.state.lock().entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, sequence_number: i64) -> bool {
        self.state.lock().entries.contains_key(&sequence_number)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Blocking on a response would stall the runtime's worker thread (tokio panics).
pub(crate) fn ensure_blocking_allowed() -> Result<()> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(Error::InvalidArgument(
            "blocking wait for a response inside an async runtime".to_string(),
        ));
    }
    Ok(())
}

/// Outcome of one call; await it, poll it with [`try_result`](Self::try_result),
/// or block with [`wait`](Self::wait).
pub struct ResponseFuture<T> {
    table_id: u64,
    sequence_number: i64,
    owner: Arc<str>,
    receiver: oneshot::Receiver<Result<T>>,
    completed: bool,
}

impl<T> ResponseFuture<T> {
    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    fn closed_error(&self) -> Error {
        Error::Disposed(self.owner.to_string())
    }

    /// Non-blocking check. Yields the outcome once, then `None`.
    pub fn try_result(&mut self) -> Option<Result<T>> {
        if self.completed {
            return None;
        }
        let outcome = match self.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(self.closed_error()),
        };
        self.completed = true;
        Some(outcome)
    }

    /// Block the current thread until resolved.
    ///
    /// Another thread must drive the client's `try_process`. Inside an
    /// async runtime this fails with `InvalidArgument`; `.await` the future there.
    pub fn wait(self) -> Result<T> {
        ensure_blocking_allowed()?;
        let closed = self.closed_error();
        self.receiver.blocking_recv().unwrap_or(Err(closed))
    }
}

impl<T> Future for ResponseFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.completed {
            return Poll::Ready(Err(Error::InvalidArgument(format!(
                "response {} already consumed",
                this.sequence_number
            ))));
        }
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(outcome) => {
                this.completed = true;
                Poll::Ready(outcome.unwrap_or_else(|_| Err(this.closed_error())))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> std::fmt::Debug for ResponseFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseFuture")
            .field("owner", &self.owner)
            .field("sequence_number", &self.sequence_number)
            .field("completed", &self.completed)
            .finish()
    }
}

#[cfg(test)]
mod tests;
