// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Quality of Service profiles for publishers, subscriptions, services and clients.
//!
//! Presets mirror the rmw profiles (`rmw_qos_profile_sensor_data`, ...).

/// Depth applied when a profile leaves history at the system default.
pub const SYSTEM_DEFAULT_DEPTH: usize = 10;

/// Predefined QoS configurations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QosPreset {
    SensorData,
    Parameters,
    Default,
    ServicesDefault,
    ParameterEvents,
    SystemDefault,
}

/// History policy
///
/// Determines how many samples to keep in queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum History {
    /// Left to the middleware (keep last [`SYSTEM_DEFAULT_DEPTH`]).
    SystemDefault,
    /// Keep last `depth` samples (bounded queue, drops oldest)
    #[default]
    KeepLast,
    /// Keep every sample until taken.
    KeepAll,
}

/// Reliability policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Reliability {
    /// Left to the middleware (reliable).
    SystemDefault,
    #[default]
    Reliable,
    BestEffort,
}

/// Durability policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Durability {
    /// Left to the middleware (volatile).
    SystemDefault,
    /// Publisher keeps its last `depth` samples for late-joining subscriptions.
    TransientLocal,
    #[default]
    Volatile,
}

/// QoS profile attached to an endpoint at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QosProfile {
    pub history: History,
    pub depth: usize,
    pub reliability: Reliability,
    pub durability: Durability,
}

impl Default for QosProfile {
    fn default() -> Self {
        Self::from_preset(QosPreset::Default)
    }
}

impl QosProfile {
    /// Construct using a preset.
    #[must_use]
    pub fn from_preset(preset: QosPreset) -> Self {
        match preset {
            QosPreset::SensorData => Self {
                history: History::KeepLast,
                depth: 5,
                reliability: Reliability::BestEffort,
                durability: Durability::Volatile,
            },
            QosPreset::Parameters | QosPreset::ParameterEvents => Self {
                history: History::KeepLast,
                depth: 1000,
                reliability: Reliability::Reliable,
                durability: Durability::Volatile,
            },
            QosPreset::Default | QosPreset::ServicesDefault => Self {
                history: History::KeepLast,
                depth: 10,
                reliability: Reliability::Reliable,
                durability: Durability::Volatile,
            },
            QosPreset::SystemDefault => Self {
                history: History::SystemDefault,
                depth: 0,
                reliability: Reliability::SystemDefault,
                durability: Durability::SystemDefault,
            },
        }
    }

    pub fn sensor_data() -> Self {
        Self::from_preset(QosPreset::SensorData)
    }

    pub fn parameters() -> Self {
        Self::from_preset(QosPreset::Parameters)
    }

    pub fn services_default() -> Self {
        Self::from_preset(QosPreset::ServicesDefault)
    }

    pub fn parameter_events() -> Self {
        Self::from_preset(QosPreset::ParameterEvents)
    }

    pub fn system_default() -> Self {
        Self::from_preset(QosPreset::SystemDefault)
    }

    /// Set KEEP_LAST history with the given depth.
    pub fn keep_last(mut self, depth: usize) -> Self {
        self.history = History::KeepLast;
        self.depth = depth;
        self
    }

    /// Set KEEP_ALL history policy.
    pub fn keep_all(mut self) -> Self {
        self.history = History::KeepAll;
        self
    }

    pub fn reliable(mut self) -> Self {
        self.reliability = Reliability::Reliable;
        self
    }

    pub fn best_effort(mut self) -> Self {
        self.reliability = Reliability::BestEffort;
        self
    }

    pub fn transient_local(mut self) -> Self {
        self.durability = Durability::TransientLocal;
        self
    }

    pub fn volatile(mut self) -> Self {
        self.durability = Durability::Volatile;
        self
    }

    /// Queue bound implied by the history policy; `None` means unbounded.
    #[must_use]
    pub fn queue_bound(&self) -> Option<usize> {
        match self.history {
            History::KeepAll => None,
            History::KeepLast => Some(self.depth.max(1)),
            History::SystemDefault => Some(SYSTEM_DEFAULT_DEPTH),
        }
    }

    /// True unless the profile asks for best-effort delivery.
    #[must_use]
    pub fn is_reliable(&self) -> bool {
        !matches!(self.reliability, Reliability::BestEffort)
    }

    #[must_use]
    pub fn is_transient_local(&self) -> bool {
        matches!(self.durability, Durability::TransientLocal)
    }
}
