//! Engine configuration.
//!
//! [`EngineConfig`] carries the few knobs the runtime has. Values come from
//! [`EngineConfig::default`], the `with_*` setters, or the process
//! environment via [`EngineConfig::from_env`].
//!
//! | Variable | Default |
//! |---|---|
//! | `DASHFLOW_DIAGNOSTICS_CAPACITY` | 1000 |
//! | `DASHFLOW_EMIT_COMMAND_STARTED` | `true` |
//! | `DASHFLOW_DELIVERY_BROADCAST_CAPACITY` | 256 |
//! | `DASHFLOW_DISPATCH_TIMEOUT_MS` | 30000 |
//! | `DASHFLOW_UNDO_CAPACITY` | 100 |
//!
//! # Example
//!
//! ```
//! use dashflow_runtime::EngineConfig;
//! use std::time::Duration;
//!
//! let config = EngineConfig::default()
//!     .with_undo_capacity(20)
//!     .with_dispatch_timeout(Duration::from_secs(5));
//!
//! assert_eq!(config.undo_capacity, 20);
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::time::Duration;

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed
    ParseError {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
    /// Configuration validation failed
    ValidationError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError { var, value } => write!(f, "Failed to parse {var}={value:?}"),
            Self::ValidationError(msg) => write!(f, "Configuration validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime settings for an [`Engine`](crate::Engine)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of entries kept by the diagnostics sink
    pub diagnostics_capacity: usize,
    /// Emit a `Started` event before each handler runs
    pub emit_command_started: bool,
    /// Capacity of the broadcast carrying delivered events and coordinator transitions
    pub delivery_broadcast_capacity: usize,
    /// Upper bound for `dispatch_and_wait`
    pub dispatch_timeout: Duration,
    /// Undo entries retained per namespace
    pub undo_capacity: usize,
}

impl EngineConfig {
    /// Load configuration from `DASHFLOW_*` environment variables
    ///
    /// Unset variables keep their default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] for unparsable values and
    /// [`ConfigError::ValidationError`] when the result fails [`Self::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, "DASHFLOW_DIAGNOSTICS_CAPACITY")? {
            config.diagnostics_capacity = v;
        }
        if let Some(v) = lookup("DASHFLOW_EMIT_COMMAND_STARTED") {
            config.emit_command_started = parse_bool("DASHFLOW_EMIT_COMMAND_STARTED", &v)?;
        }
        if let Some(v) = parse_var(&lookup, "DASHFLOW_DELIVERY_BROADCAST_CAPACITY")? {
            config.delivery_broadcast_capacity = v;
        }
        if let Some(v) = parse_var::<u64>(&lookup, "DASHFLOW_DISPATCH_TIMEOUT_MS")? {
            config.dispatch_timeout = Duration::from_millis(v);
        }
        if let Some(v) = parse_var(&lookup, "DASHFLOW_UNDO_CAPACITY")? {
            config.undo_capacity = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if a capacity or the timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.diagnostics_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "diagnostics_capacity must be > 0".to_string(),
            ));
        }
        if self.delivery_broadcast_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "delivery_broadcast_capacity must be > 0".to_string(),
            ));
        }
        if self.dispatch_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "dispatch_timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the diagnostics sink capacity
    #[must_use]
    pub const fn with_diagnostics_capacity(mut self, capacity: usize) -> Self {
        self.diagnostics_capacity = capacity;
        self
    }

    /// Enable or disable the `Started` lifecycle event
    #[must_use]
    pub const fn with_command_started(mut self, enabled: bool) -> Self {
        self.emit_command_started = enabled;
        self
    }

    /// Set the delivery broadcast capacity
    #[must_use]
    pub const fn with_delivery_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.delivery_broadcast_capacity = capacity;
        self
    }

    /// Set the `dispatch_and_wait` timeout
    #[must_use]
    pub const fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Set the number of undo entries kept per namespace
    ///
    /// Zero disables undo recording.
    #[must_use]
    pub const fn with_undo_capacity(mut self, capacity: usize) -> Self {
        self.undo_capacity = capacity;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            diagnostics_capacity: 1000,
            emit_command_started: true,
            delivery_broadcast_capacity: 256,
            dispatch_timeout: Duration::from_secs(30),
            undo_capacity: 100,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::ParseError { var, value })
        })
        .transpose()
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::ParseError {
            var,
            value: value.to_string(),
        }),
    }
}
