//! Engine health.
//!
//! [`Engine::health`](crate::Engine::health) inspects each [`Component`] and
//! returns a [`HealthReport`]. Bounded buffers report [`HealthStatus::Degraded`]
//! above half capacity and [`HealthStatus::Unhealthy`] when full; a closed
//! emitter is unhealthy.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Status of a component; ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Accepting work
    Healthy,
    /// Accepting work, but a bounded buffer is filling up
    Degraded,
    /// Not accepting work
    Unhealthy,
}

impl HealthStatus {
    /// Whether the status is [`HealthStatus::Healthy`]
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        })
    }
}

/// Engine parts with their own health
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// State store and undo log
    Store,
    /// Superseding-request coordinator
    Coordinator,
    /// Event emitter and its delivery task
    Emitter,
    /// Diagnostics sink
    Diagnostics,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Store => "store",
            Self::Coordinator => "coordinator",
            Self::Emitter => "emitter",
            Self::Diagnostics => "diagnostics",
        })
    }
}

/// Health of one component, with the gauges it was judged on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    /// Inspected component
    pub component: Component,
    /// Judged status
    pub status: HealthStatus,
    /// Why the status is not healthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Named readings, e.g. `revision` or `listeners`
    pub gauges: BTreeMap<&'static str, u64>,
}

impl HealthCheck {
    /// Healthy check of `component`
    #[must_use]
    pub const fn new(component: Component) -> Self {
        Self {
            component,
            status: HealthStatus::Healthy,
            message: None,
            gauges: BTreeMap::new(),
        }
    }

    /// Check of a bounded buffer holding `len` of `capacity` entries
    #[must_use]
    pub fn capacity(component: Component, len: usize, capacity: usize) -> Self {
        let check = Self::new(component)
            .gauge("len", len)
            .gauge("capacity", capacity);
        if len >= capacity {
            check.escalate(HealthStatus::Unhealthy, format!("{component} full, dropping entries"))
        } else if len.saturating_mul(2) > capacity {
            check.escalate(HealthStatus::Degraded, format!("{component} above half capacity"))
        } else {
            check
        }
    }

    /// Raise the status to `status` unless it is already worse
    #[must_use]
    pub fn escalate(mut self, status: HealthStatus, message: impl Into<String>) -> Self {
        if status > self.status {
            self.status = status;
            self.message = Some(message.into());
        }
        self
    }

    /// Record a reading
    #[must_use]
    pub fn gauge(mut self, name: &'static str, value: impl TryInto<u64>) -> Self {
        self.gauges.insert(name, value.try_into().unwrap_or(u64::MAX));
        self
    }
}

/// Health of every component of an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Worst component status
    pub status: HealthStatus,
    /// One check per component
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    /// Report over `checks`
    #[must_use]
    pub fn new(checks: Vec<HealthCheck>) -> Self {
        let status = checks
            .iter()
            .map(|check| check.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);
        Self { status, checks }
    }

    /// Check of `component`, if it was inspected
    #[must_use]
    pub fn check(&self, component: Component) -> Option<&HealthCheck> {
        self.checks.iter().find(|c| c.component == component)
    }

    /// Checks that are not healthy
    pub fn problems(&self) -> impl Iterator<Item = &HealthCheck> {
        self.checks.iter().filter(|c| !c.status.is_healthy())
    }
}
