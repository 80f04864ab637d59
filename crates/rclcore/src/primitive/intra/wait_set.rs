// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process positional wait primitive.
//!
//! Each entity kind gets a fixed array of positions. Placement takes the
//! first free position. While placed, an entity holds a weak signal back to
//! this primitive so readiness edges wake a blocked `wait`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::wake::WakeNotifier;
use crate::error::{Error, Result};
use crate::primitive::{
    EntityKind, RawHandle, Slot, WaitInterrupt, WaitSetPrimitive, WaitSetSizes, WaitSignal,
    WaitStatus,
};

fn kind_index(kind: EntityKind) -> usize {
    match kind {
        EntityKind::Subscription => 0,
        EntityKind::GuardCondition => 1,
        EntityKind::Client => 2,
        EntityKind::Service => 3,
    }
}

struct NotifierSignal {
    id: u64,
    notifier: WakeNotifier,
    /// Sticky; set once the owning wait set is being disposed.
    interrupted: AtomicBool,
}

impl NotifierSignal {
    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }
}

impl WaitSignal for NotifierSignal {
    fn signal(&self) {
        self.notifier.notify();
    }

    fn id(&self) -> u64 {
        self.id
    }
}

impl WaitInterrupt for NotifierSignal {
    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
        self.notifier.notify();
    }
}

pub(crate) struct IntraWaitSet {
    capacity: usize,
    slots: [Vec<Option<RawHandle>>; 4],
    /// Handles carrying our signal; detached on clear, resize and fini.
    attached: Vec<RawHandle>,
    signal: Arc<NotifierSignal>,
    valid: bool,
}

impl IntraWaitSet {
    pub(crate) fn new(capacity: usize) -> Self {
        static NEXT_SIGNAL_ID: AtomicU64 = AtomicU64::new(1);
        Self {
            capacity,
            slots: Default::default(),
            attached: Vec::new(),
            signal: Arc::new(NotifierSignal {
                id: NEXT_SIGNAL_ID.fetch_add(1, Ordering::Relaxed),
                notifier: WakeNotifier::new(),
                interrupted: AtomicBool::new(false),
            }),
            valid: true,
        }
    }

    fn ensure_valid(&self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(Error::disposed("wait set primitive"))
        }
    }

    fn detach_all(&mut self) {
        let id = self.signal.id;
        for handle in self.attached.drain(..) {
            handle.remove_wait_signal(id);
        }
    }

    /// Evaluate readiness once; on any hit, clear the positions that are not ready.
    ///
    /// A placed handle that was invalidated fails the wait.
    fn collect_ready(&mut self) -> Result<bool> {
        let mut readiness: Vec<Vec<bool>> = Vec::with_capacity(self.slots.len());
        for positions in &self.slots {
            let mut ready = Vec::with_capacity(positions.len());
            for slot in positions {
                match slot {
                    Some(handle) if !handle.is_valid() => {
                        return Err(Error::disposed(format!(
                            "{} handle {} disposed during wait",
                            handle.kind(),
                            handle.handle_id()
                        )));
                    }
                    Some(handle) => ready.push(handle.is_ready()),
                    None => ready.push(false),
                }
            }
            readiness.push(ready);
        }

        if !readiness.iter().flatten().any(|&ready| ready) {
            return Ok(false);
        }

        for (positions, ready) in self.slots.iter_mut().zip(&readiness) {
            for (slot, &is_ready) in positions.iter_mut().zip(ready) {
                if !is_ready {
                    *slot = None;
                }
            }
        }
        Ok(true)
    }

    fn clear_positions(&mut self) {
        for positions in &mut self.slots {
            positions.iter_mut().for_each(|slot| *slot = None);
        }
    }
}

impl WaitSetPrimitive for IntraWaitSet {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn sizes(&self) -> WaitSetSizes {
        WaitSetSizes {
            subscriptions: self.slots[0].len(),
            guard_conditions: self.slots[1].len(),
            clients: self.slots[2].len(),
            services: self.slots[3].len(),
        }
    }

    fn resize(&mut self, sizes: WaitSetSizes) -> Result<()> {
        self.ensure_valid()?;
        for kind in EntityKind::ALL {
            if sizes.of(kind) > self.capacity {
                return Err(Error::CapacityExceeded {
                    kind,
                    capacity: self.capacity,
                });
            }
        }
        self.detach_all();
        for kind in EntityKind::ALL {
            self.slots[kind_index(kind)] = vec![None; sizes.of(kind)];
        }
        log::trace!("[intra-waitset] resized to {:?}", sizes);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.ensure_valid()?;
        self.detach_all();
        self.clear_positions();
        Ok(())
    }

    fn add(&mut self, kind: EntityKind, handle: &RawHandle) -> Result<usize> {
        self.ensure_valid()?;
        if !handle.is_valid() {
            return Err(Error::disposed(format!("{} handle {}", kind, handle.handle_id())));
        }
        if handle.kind() != kind {
            return Err(Error::InvalidArgument(format!(
                "{} handle placed as {}",
                handle.kind(),
                kind
            )));
        }

        let positions = &mut self.slots[kind_index(kind)];
        let index = positions
            .iter()
            .position(Option::is_none)
            .ok_or(Error::CapacityExceeded {
                kind,
                capacity: positions.len(),
            })?;
        positions[index] = Some(Arc::clone(handle));

        handle.add_wait_signal(self.signal.clone());
        self.attached.push(Arc::clone(handle));
        Ok(index)
    }

    fn get(&self, kind: EntityKind, index: usize) -> Option<Slot> {
        self.slots[kind_index(kind)].get(index).map(|slot| match slot {
            Some(handle) => Slot::Filled(handle.handle_id()),
            None => Slot::Empty,
        })
    }

    fn wait(&mut self, timeout: Option<Duration>) -> Result<WaitStatus> {
        self.ensure_valid()?;
        if self.sizes().total() == 0 {
            return Err(Error::EmptyWaitSet);
        }

        // Overflowing deadlines block indefinitely.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        loop {
            if self.signal.is_interrupted() {
                self.clear_positions();
                return Err(Error::disposed("wait set interrupted"));
            }
            if self.collect_ready()? {
                return Ok(WaitStatus::Ready);
            }

            let now = Instant::now();
            match deadline {
                Some(deadline) if now >= deadline => {
                    self.clear_positions();
                    return Ok(WaitStatus::TimedOut);
                }
                Some(deadline) => {
                    self.signal.notifier.wait_timeout(deadline - now);
                }
                None => self.signal.notifier.wait(),
            }
        }
    }

    fn fini(&mut self) -> Result<()> {
        if !self.valid {
            return Ok(());
        }
        self.detach_all();
        self.slots = Default::default();
        self.valid = false;
        Ok(())
    }

    fn interrupter(&self) -> Arc<dyn WaitInterrupt> {
        self.signal.clone()
    }
}

impl Drop for IntraWaitSet {
    fn drop(&mut self) {
        let _ = self.fini();
    }
}
