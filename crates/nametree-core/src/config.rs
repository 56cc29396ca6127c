//! Tree configuration.
//!
//! Durations are written in TOML as integer milliseconds:
//!
//! ```toml
//! interest_lifetime = 4000
//! default_max_interest_lifetime = 16000
//!
//! [sync]
//! group_prefix = "/nametree-sync"
//! sync_interval = 1600
//! ```

use crate::error::ConfigError;
use crate::name::Name;
use crate::sync::SyncDepth;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration shared by every node of a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Lifetime of the first Interest expressed for a node
    #[serde(default = "default_interest_lifetime", with = "millis")]
    pub interest_lifetime: Duration,
    /// Re-expression cap used when no node sets a max interest lifetime
    #[serde(default = "default_max_interest_lifetime", with = "millis")]
    pub default_max_interest_lifetime: Duration,
    /// Sync group settings
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Sync group settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Name of the sync group joined by the tree
    #[serde(default = "default_group_prefix")]
    pub group_prefix: String,
    /// Depth used by `enable_sync` when none is given; absent means unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_depth: Option<usize>,
    /// Interval passed to the sync provider
    #[serde(default = "default_sync_interval", with = "millis")]
    pub sync_interval: Duration,
}

// Default values

fn default_interest_lifetime() -> Duration {
    Duration::from_millis(4000)
}

fn default_max_interest_lifetime() -> Duration {
    Duration::from_secs(16)
}

fn default_group_prefix() -> String {
    "/nametree-sync".to_string()
}

fn default_sync_interval() -> Duration {
    Duration::from_millis(1600)
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            interest_lifetime: default_interest_lifetime(),
            default_max_interest_lifetime: default_max_interest_lifetime(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            group_prefix: default_group_prefix(),
            default_depth: None,
            sync_interval: default_sync_interval(),
        }
    }
}

impl SyncConfig {
    /// Parsed group prefix
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the prefix is not a valid name URI.
    pub fn group_name(&self) -> Result<Name, ConfigError> {
        Name::from_uri(&self.group_prefix)
            .map_err(|e| ConfigError::Invalid(format!("sync.group_prefix: {e}").into()))
    }

    /// Depth used when `enable_sync` is called without one
    #[must_use]
    pub fn default_sync_depth(&self) -> SyncDepth {
        self.default_depth.into()
    }
}

impl TreeConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Serialize to TOML
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check the values are usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interest_lifetime.is_zero() {
            return Err(ConfigError::Invalid(
                "interest_lifetime must be greater than zero".into(),
            ));
        }

        if self.default_max_interest_lifetime < self.interest_lifetime {
            return Err(ConfigError::Invalid(
                "default_max_interest_lifetime must not be less than interest_lifetime".into(),
            ));
        }

        if self.sync.sync_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "sync.sync_interval must be greater than zero".into(),
            ));
        }

        self.sync.group_name()?;
        Ok(())
    }
}

mod millis {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TreeConfig::default();
        assert_eq!(config.interest_lifetime, Duration::from_millis(4000));
        assert_eq!(config.default_max_interest_lifetime, Duration::from_secs(16));
        assert_eq!(config.sync.group_prefix, "/nametree-sync");
        assert_eq!(config.sync.default_sync_depth(), SyncDepth::Unlimited);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = TreeConfig::from_toml_str(
            r#"
            interest_lifetime = 1000

            [sync]
            default_depth = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.interest_lifetime, Duration::from_millis(1000));
        assert_eq!(config.default_max_interest_lifetime, Duration::from_secs(16));
        assert_eq!(config.sync.default_sync_depth(), SyncDepth::Limited(2));
        assert_eq!(config.sync.sync_interval, Duration::from_millis(1600));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = TreeConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(TreeConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TreeConfig {
            interest_lifetime: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.interest_lifetime = Duration::from_secs(20);
        assert!(config.validate().is_err());

        config.interest_lifetime = Duration::from_secs(1);
        config.sync.group_prefix = "/bad/%zz".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("nametree-config-{}.toml", std::process::id()));
        fs::write(&path, "default_max_interest_lifetime = 32000\n").unwrap();
        let config = TreeConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.default_max_interest_lifetime, Duration::from_secs(32));

        assert!(matches!(
            TreeConfig::load("/nonexistent/nametree.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
