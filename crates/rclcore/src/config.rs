// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Environment variable configuration.
//!
//! - `RCLCORE_DOMAIN_ID`: in-process domain id (default: 0, or ROS_DOMAIN_ID if set)
//! - `RCLCORE_LOG_LEVEL`: logging level (default: "info")
//! - `RCLCORE_WAIT_SET_CAPACITY`: slots per entity kind in a wait primitive (default: 2048)
//! - `RMW_IMPLEMENTATION`: requested middleware; only the in-process one ships
//!
//! # Example
//!
//! ```bash
//! export ROS_DOMAIN_ID=42
//! export RCLCORE_LOG_LEVEL=debug
//! ```

use std::env;

/// Environment variable names
pub const ENV_DOMAIN_ID: &str = "RCLCORE_DOMAIN_ID";
pub const ENV_LOG_LEVEL: &str = "RCLCORE_LOG_LEVEL";
pub const ENV_WAIT_SET_CAPACITY: &str = "RCLCORE_WAIT_SET_CAPACITY";

/// ROS 2 environment variable for domain ID (fallback)
pub const ENV_ROS_DOMAIN_ID: &str = "ROS_DOMAIN_ID";
/// ROS 2 middleware selection
pub const ENV_RMW_IMPLEMENTATION: &str = "RMW_IMPLEMENTATION";

/// Default number of positional slots per entity kind.
pub const DEFAULT_WAIT_SET_CAPACITY: usize = 2048;

/// Runtime configuration from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Domain ID; contexts on the same domain see each other's topics
    pub domain_id: u32,

    /// Logging level (trace, debug, info, warn, error, off)
    pub log_level: String,

    /// Upper bound on slots per entity kind in one wait primitive
    pub wait_set_capacity: usize,

    /// Value of RMW_IMPLEMENTATION, if any
    pub rmw_implementation: Option<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            domain_id: 0,
            log_level: "info".to_string(),
            wait_set_capacity: DEFAULT_WAIT_SET_CAPACITY,
            rmw_implementation: None,
        }
    }
}

impl EnvConfig {
    /// Load configuration from environment variables
    ///
    /// Priority for domain ID:
    /// 1. RCLCORE_DOMAIN_ID
    /// 2. ROS_DOMAIN_ID
    /// 3. Default (0)
    #[must_use]
    pub fn from_env() -> Self {
        let domain_id = env::var(ENV_DOMAIN_ID)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .or_else(|| {
                env::var(ENV_ROS_DOMAIN_ID)
                    .ok()
                    .and_then(|s| s.parse::<u32>().ok())
            })
            .unwrap_or(0);

        let log_level = env::var(ENV_LOG_LEVEL)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "info".to_string());

        let wait_set_capacity = env::var(ENV_WAIT_SET_CAPACITY)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_WAIT_SET_CAPACITY);

        let rmw_implementation = env::var(ENV_RMW_IMPLEMENTATION)
            .ok()
            .filter(|s| !s.is_empty());

        Self {
            domain_id,
            log_level,
            wait_set_capacity,
            rmw_implementation,
        }
    }

    /// Check if any custom configuration was provided
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.domain_id != 0
            || self.log_level != "info"
            || self.wait_set_capacity != DEFAULT_WAIT_SET_CAPACITY
            || self.rmw_implementation.is_some()
    }

    /// Parsed log level. Unknown values fall back to `Info`.
    #[must_use]
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info)
    }

    /// Apply log level to the `log` facade
    pub fn apply_log_level(&self) {
        log::set_max_level(self.log_level_filter());
    }
}
