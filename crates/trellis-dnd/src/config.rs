#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! Groups every tunable of the reparenting engine into one [`DragConfig`]
//! that can be loaded from TOML or JSON at startup (with the `config`
//! feature), removing the need for compile-time constant changes.
//!
//! # Loading
//!
//! ```toml
//! # trellis.toml
//! [coalescer]
//! hover_delay_ms = 50
//! leave_delay_ms = 100
//!
//! [validator]
//! max_ancestor_hops = 20
//! cycle_policy = "fail_open"
//!
//! [messages]
//! success = "Moved \"{name}\""
//! failure = "Failed to move node"
//! ```
//!
//! ```rust,ignore
//! let config = DragConfig::from_toml_file("trellis.toml")?;
//! let config = DragConfig::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! `DragConfig::default()` gives 50ms hover and 100ms leave delays, a
//! 20-hop ancestry cap, and fail-open on unresolved ancestry.

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trellis_core::ValidatorConfig;

use crate::event_coalescer::CoalescerConfig;
use crate::move_commit::{CommitMessages, NAME_PLACEHOLDER};

/// Top-level configuration for a drag session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct DragConfig {
    /// Hover/leave coalescing delays.
    pub coalescer: CoalescerConfig,
    /// Drop validation tunables.
    pub validator: ValidatorConfig,
    /// Commit notification texts.
    pub messages: CommitMessages,
}

impl DragConfig {
    /// Load from a TOML string and validate.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.into_validated()
    }

    /// Load from a TOML file on disk and validate.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string and validate.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.into_validated()
    }

    /// Load from a JSON file on disk and validate.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Check every parameter.
    ///
    /// Returns a list of problems. An empty list means the config is valid.
    /// Zero delays are allowed and mean "deliver on the next poll".
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.validator.max_ancestor_hops == 0 {
            errors.push("validator.max_ancestor_hops must be > 0".into());
        }
        if self.messages.success.trim().is_empty() {
            errors.push("messages.success must not be empty".into());
        }
        if self.messages.failure.trim().is_empty() {
            errors.push("messages.failure must not be empty".into());
        }
        if !self.messages.success.contains(NAME_PLACEHOLDER) {
            tracing::debug!(
                target: "trellis.drag",
                template = %self.messages.success,
                "success message has no {{name}} placeholder"
            );
        }

        errors
    }

    /// Return `self` if [`validate`](Self::validate) finds no problems.
    pub fn into_validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors from loading or validating a [`DragConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[cfg(feature = "config")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse error.
    #[cfg(feature = "config")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation errors.
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Serde adapter storing a [`Duration`](web_time::Duration) as whole milliseconds.
#[cfg(feature = "config")]
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use web_time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::CyclePolicy;
    use web_time::Duration;

    #[test]
    fn default_values() {
        let config = DragConfig::default();
        assert_eq!(config.coalescer.hover_delay, Duration::from_millis(50));
        assert_eq!(config.coalescer.leave_delay, Duration::from_millis(100));
        assert_eq!(config.validator.max_ancestor_hops, 20);
        assert_eq!(config.validator.cycle_policy, CyclePolicy::FailOpen);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn zero_hop_cap_is_invalid() {
        let mut config = DragConfig::default();
        config.validator.max_ancestor_hops = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("max_ancestor_hops"));
    }

    #[test]
    fn blank_messages_are_invalid() {
        let mut config = DragConfig::default();
        config.messages.success = " ".into();
        config.messages.failure = String::new();
        assert_eq!(config.validate().len(), 2);
    }

    #[test]
    fn into_validated_reports_all_problems() {
        let mut config = DragConfig::default();
        config.validator.max_ancestor_hops = 0;
        config.messages.failure = String::new();
        let err = config.into_validated().unwrap_err();
        match &err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("validation errors: "));
    }

    #[cfg(feature = "config")]
    mod loading {
        use super::*;

        #[test]
        fn toml_partial_override_keeps_defaults() {
            let config = DragConfig::from_toml_str(
                r#"
                [coalescer]
                hover_delay_ms = 16

                [validator]
                cycle_policy = "fail_closed"
                "#,
            )
            .unwrap();
            assert_eq!(config.coalescer.hover_delay, Duration::from_millis(16));
            assert_eq!(config.coalescer.leave_delay, Duration::from_millis(100));
            assert_eq!(config.validator.cycle_policy, CyclePolicy::FailClosed);
            assert_eq!(config.validator.max_ancestor_hops, 20);
            assert_eq!(config.messages, CommitMessages::default());
        }

        #[test]
        fn json_round_trip() {
            let mut config = DragConfig::default();
            config.coalescer.leave_delay = Duration::from_millis(250);
            let json = serde_json::to_string(&config).unwrap();
            assert!(json.contains("\"leave_delay_ms\":250"));
            assert_eq!(DragConfig::from_json_str(&json).unwrap(), config);
        }

        #[test]
        fn toml_validation_failure() {
            let err = DragConfig::from_toml_str("[validator]\nmax_ancestor_hops = 0\n").unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
        }

        #[test]
        fn toml_parse_failure() {
            let err = DragConfig::from_toml_str("[coalescer\n").unwrap_err();
            assert!(matches!(err, ConfigError::Toml(_)));
        }

        #[test]
        fn file_loading() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("trellis.toml");
            std::fs::write(&path, "[messages]\nfailure = \"Move failed\"\n").unwrap();
            let config = DragConfig::from_toml_file(&path).unwrap();
            assert_eq!(config.messages.failure, "Move failed");

            let missing = DragConfig::from_json_file(dir.path().join("missing.json")).unwrap_err();
            assert!(matches!(missing, ConfigError::Io(_)));
        }
    }
}
