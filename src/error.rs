//! Error types used by the provisioner, its workers, and the broker capabilities.
//!
//! This module defines three enums:
//!
//! - [`ConfigError`]: raised at start-up when a mandatory capability is missing.
//! - [`BrokerError`]: raised by the consumed broker/getter capabilities.
//! - [`WorkerError`]: the terminal error of a supervised task.
//!
//! All of them provide `as_label` for logs, and [`WorkerError`] is `Clone` so that
//! every waiter on a supervisor observes the same terminal value.

use thiserror::Error;

/// # Errors produced while validating a provisioner configuration.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A mandatory capability field was not supplied.
    #[error("missing {field} not valid")]
    NotValid {
        /// Name of the missing field.
        field: &'static str,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use unitvisor::ConfigError;
    ///
    /// let err = ConfigError::NotValid { field: "life_getter" };
    /// assert_eq!(err.as_label(), "config_not_valid");
    /// assert_eq!(err.to_string(), "missing life_getter not valid");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NotValid { .. } => "config_not_valid",
        }
    }
}

/// # Errors produced by broker and getter capabilities.
///
/// [`BrokerError::NotFound`] is the one expected outcome: the root loop treats it
/// as "deleted upstream" rather than as a failure.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The queried entity does not exist (any more).
    #[error("{0} not found")]
    NotFound(String),

    /// Any other failure reported by the broker.
    #[error("{0}")]
    Failed(String),
}

impl BrokerError {
    /// Shorthand for [`BrokerError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        BrokerError::NotFound(what.into())
    }

    /// Shorthand for [`BrokerError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        BrokerError::Failed(message.into())
    }

    /// True for [`BrokerError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, BrokerError::NotFound(_))
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::NotFound(_) => "broker_not_found",
            BrokerError::Failed(_) => "broker_failed",
        }
    }
}

/// # Terminal errors of supervised tasks.
///
/// A supervisor records at most one of these; it is what [`Worker::wait`](crate::Worker::wait)
/// returns for the supervisor and for every ancestor the error propagates to.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// A change subscription closed its channel.
    #[error("watcher closed channel")]
    WatcherClosed,

    /// A broker call failed; `context` names the operation.
    #[error("{context}: {source}")]
    Broker {
        /// What was being attempted.
        context: String,
        /// The underlying broker failure.
        source: BrokerError,
    },

    /// Supervised work panicked.
    #[error("worker {name:?} panicked")]
    Panicked {
        /// Name of the supervisor whose work panicked.
        name: String,
    },

    /// Any other unrecoverable failure.
    #[error("{0}")]
    Fatal(String),

    /// The operation was refused because the supervisor is already dying.
    ///
    /// Never recorded as a terminal error.
    #[error("supervisor is dying")]
    Dying,
}

impl WorkerError {
    /// Wraps a broker failure with the operation that produced it.
    pub fn broker(context: impl Into<String>, source: BrokerError) -> Self {
        WorkerError::Broker {
            context: context.into(),
            source,
        }
    }

    /// Shorthand for [`WorkerError::Fatal`].
    pub fn fatal(message: impl Into<String>) -> Self {
        WorkerError::Fatal(message.into())
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use unitvisor::{BrokerError, WorkerError};
    ///
    /// let err = WorkerError::broker("deleting service \"app\"", BrokerError::failed("boom"));
    /// assert_eq!(err.as_label(), "worker_broker");
    /// assert_eq!(err.to_string(), "deleting service \"app\": boom");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::WatcherClosed => "worker_watcher_closed",
            WorkerError::Broker { .. } => "worker_broker",
            WorkerError::Panicked { .. } => "worker_panicked",
            WorkerError::Fatal(_) => "worker_fatal",
            WorkerError::Dying => "worker_dying",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_detected() {
        assert!(BrokerError::not_found("app1").is_not_found());
        assert!(!BrokerError::failed("boom").is_not_found());
        assert_eq!(BrokerError::not_found("app1").to_string(), "app1 not found");
    }

    #[test]
    fn test_watcher_closed_message() {
        assert_eq!(WorkerError::WatcherClosed.to_string(), "watcher closed channel");
    }

    #[test]
    fn test_config_error_names_field() {
        let err = ConfigError::NotValid {
            field: "container_broker",
        };
        assert_eq!(err.to_string(), "missing container_broker not valid");
    }
}
