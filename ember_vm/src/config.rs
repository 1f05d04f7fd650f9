//! Fast-binding configuration.
//!
//! Read once from the environment when the process-wide binder is first
//! used:
//!
//! - `EMBER_FASTBIND`: `0`, `off`, or `false` disables specialization.
//! - `EMBER_FASTBIND_MAX_ARITY`: lowers the largest argument count that
//!   gets a specialized site (0 through 5).

use crate::error::BindError;
use crate::fast_bind::SPECIALIZATION_CAP;

/// Environment variable toggling fast binding.
pub const ENV_ENABLED: &str = "EMBER_FASTBIND";

/// Environment variable lowering the arity cap.
pub const ENV_MAX_ARITY: &str = "EMBER_FASTBIND_MAX_ARITY";

/// Tunables for the constructor fast-binding subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastBindConfig {
    /// When false every construction goes through the general protocol.
    pub enabled: bool,
    /// Largest argument count that is specialized.
    pub max_specialized_arity: usize,
}

impl Default for FastBindConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_specialized_arity: SPECIALIZATION_CAP,
        }
    }
}

impl FastBindConfig {
    /// Configuration with specialization switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_max_arity(mut self, max: usize) -> Self {
        self.max_specialized_arity = max;
        self
    }

    /// Build from process environment variables.
    pub fn from_env() -> Result<Self, BindError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BindError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_ENABLED) {
            config.enabled = parse_bool(&raw).ok_or_else(|| {
                BindError::invalid_config(format!("{ENV_ENABLED}={raw:?} is not a boolean"))
            })?;
        }

        if let Some(raw) = lookup(ENV_MAX_ARITY) {
            config.max_specialized_arity = raw.trim().parse().map_err(|_| {
                BindError::invalid_config(format!("{ENV_MAX_ARITY}={raw:?} is not a number"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject caps above what the specialized sites can express.
    pub fn validate(&self) -> Result<(), BindError> {
        if self.max_specialized_arity > SPECIALIZATION_CAP {
            return Err(BindError::invalid_config(format!(
                "max_specialized_arity {} exceeds the supported maximum {}",
                self.max_specialized_arity, SPECIALIZATION_CAP
            )));
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "on" | "true" | "yes" => Some(true),
        "0" | "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: FxHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = FastBindConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, FastBindConfig::default());
        assert!(config.enabled);
        assert_eq!(config.max_specialized_arity, 5);
    }

    #[test]
    fn test_disable_via_env() {
        let config = FastBindConfig::from_lookup(lookup_from(&[(ENV_ENABLED, "off")])).unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn test_lower_cap() {
        let config = FastBindConfig::from_lookup(lookup_from(&[(ENV_MAX_ARITY, "2")])).unwrap();
        assert_eq!(config.max_specialized_arity, 2);
    }

    #[test]
    fn test_cap_above_limit_rejected() {
        let err = FastBindConfig::from_lookup(lookup_from(&[(ENV_MAX_ARITY, "6")])).unwrap_err();
        assert!(matches!(err, BindError::InvalidConfig { .. }));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(FastBindConfig::from_lookup(lookup_from(&[(ENV_ENABLED, "maybe")])).is_err());
        assert!(FastBindConfig::from_lookup(lookup_from(&[(ENV_MAX_ARITY, "x")])).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(FastBindConfig::default().with_max_arity(5).validate().is_ok());
        assert!(FastBindConfig::default().with_max_arity(9).validate().is_err());
    }
}
