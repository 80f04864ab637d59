// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Clock queries exposed as [`RosTime`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::waitable::Disposable;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Seconds and nanoseconds, the intermediate form before packing into a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RosTime {
    pub sec: i64,
    pub nanosec: u32,
}

impl RosTime {
    #[must_use]
    pub fn new(sec: i64, nanosec: u32) -> Self {
        Self { sec, nanosec }
    }

    /// Split a nanosecond count into whole seconds and the remainder.
    #[must_use]
    pub fn from_nanos(nanos: u64) -> Self {
        Self {
            sec: (nanos / NANOS_PER_SECOND) as i64,
            nanosec: (nanos % NANOS_PER_SECOND) as u32,
        }
    }

    #[must_use]
    pub fn total_seconds(&self) -> f64 {
        self.sec as f64 + f64::from(self.nanosec) / 1e9
    }

    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::new(self.sec.max(0) as u64, self.nanosec)
    }
}

/// Time source backing a [`Clock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ClockKind {
    /// Wall clock, seconds since the Unix epoch.
    #[default]
    System,
    /// Monotonic clock with a process-local epoch.
    Steady,
}

fn steady_epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// A clock that can be queried until disposed.
#[derive(Debug)]
pub struct Clock {
    kind: ClockKind,
    disposed: AtomicBool,
}

impl Clock {
    #[must_use]
    pub fn new(kind: ClockKind) -> Self {
        if kind == ClockKind::Steady {
            let _ = steady_epoch();
        }
        Self {
            kind,
            disposed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ClockKind {
        self.kind
    }

    /// Query current time.
    pub fn now(&self) -> Result<RosTime> {
        if self.is_disposed() {
            return Err(Error::disposed("clock"));
        }
        let elapsed = match self.kind {
            ClockKind::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| Error::Middleware(format!("system clock before epoch: {e}")))?,
            ClockKind::Steady => steady_epoch().elapsed(),
        };
        Ok(RosTime::from_nanos(elapsed.as_nanos() as u64))
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(ClockKind::System)
    }
}

impl Disposable for Clock {
    fn dispose(&self) -> Result<()> {
        self.disposed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
