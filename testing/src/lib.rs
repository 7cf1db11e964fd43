//! # Dashflow Testing
//!
//! Testing utilities and helpers for Dashflow engines.
//!
//! This crate provides:
//! - Deterministic mock implementations of environment traits
//! - A Given-When-Then harness for reducers
//! - An event recorder for asserting what an engine delivered
//!
//! ## Example
//!
//! ```ignore
//! use dashflow_testing::{EventRecorder, test_clock};
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_rename() {
//!     let engine = Engine::<Dashboard>::builder(DashboardState::default(), dashboard_reducer())
//!         .with_clock(Arc::new(test_clock()))
//!         .handler(RENAME_DASHBOARD, RenameDashboardHandler)?
//!         .build();
//!     let recorder = EventRecorder::attach(&engine);
//!
//!     let event = engine.dispatch_and_wait(DashboardCommand::rename("Sales")).await?;
//!     assert!(!event.is_failure());
//!     assert_eq!(recorder.len(), 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use dashflow_core::environment::Clock;

/// Recording engine events
pub mod recorder;


/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making event timestamps reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use dashflow_testing::mocks::FixedClock;
    /// use dashflow_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a `tracing` subscriber writing to the test output
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use recorder::{EventRecorder, assertions};
pub use reducer_test::ReducerTest;
