//! Runtime configuration.

use std::path::PathBuf;

use crate::SmartError;

/// Default chunk size for streamed transfers and ranged object reads (8 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 8 * 1024 * 1024;

/// Environment variable overriding [`SmartConfig::block_size`].
pub const ENV_BLOCK_SIZE: &str = "SMARTFS_BLOCK_SIZE";

/// Environment variable overriding [`SmartConfig::cache_dir`].
pub const ENV_CACHE_DIR: &str = "SMARTFS_CACHE_DIR";

/// Tunables of a [`SmartFs`](crate::SmartFs).
///
/// ```rust
/// use smartfs::SmartConfig;
///
/// let config = SmartConfig::from_lookup(|key| match key {
///     "SMARTFS_BLOCK_SIZE" => Some("4096".to_string()),
///     _ => None,
/// })
/// .unwrap();
/// assert_eq!(config.block_size, 4096);
/// assert!(config.cache_dir.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SmartConfig {
    /// Bytes per chunk when streaming between backends.
    pub block_size: usize,
    /// Where the caching façade materializes remote files; the system temp
    /// directory when unset.
    pub cache_dir: Option<PathBuf>,
}

impl Default for SmartConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            cache_dir: None,
        }
    }
}

impl SmartConfig {
    /// Defaults overridden by `SMARTFS_BLOCK_SIZE` and `SMARTFS_CACHE_DIR`.
    pub fn from_env() -> Result<Self, SmartError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    ///
    /// # Errors
    ///
    /// - [`SmartError::InvalidConfig`] if the block size is not a positive integer
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SmartError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_BLOCK_SIZE) {
            config.block_size = match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(SmartError::InvalidConfig {
                        key: ENV_BLOCK_SIZE,
                        value: raw,
                    });
                }
            };
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            if !dir.is_empty() {
                config.cache_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = SmartConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SmartConfig::default());
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn variables_override_defaults() {
        let config = SmartConfig::from_lookup(lookup(&[
            (ENV_BLOCK_SIZE, " 1024 "),
            (ENV_CACHE_DIR, "/var/cache/smartfs"),
        ]))
        .unwrap();
        assert_eq!(config.block_size, 1024);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/smartfs")));
    }

    #[test]
    fn empty_cache_dir_means_default() {
        let config = SmartConfig::from_lookup(lookup(&[(ENV_CACHE_DIR, "")])).unwrap();
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn bad_block_size_is_rejected() {
        for bad in ["0", "-1", "lots"] {
            match SmartConfig::from_lookup(lookup(&[(ENV_BLOCK_SIZE, bad)])) {
                Err(SmartError::InvalidConfig { key, value }) => {
                    assert_eq!(key, ENV_BLOCK_SIZE);
                    assert_eq!(value, bad);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_with_defaults() {
        let config: SmartConfig = serde_json::from_str(r#"{"block_size": 16}"#).unwrap();
        assert_eq!(config.block_size, 16);
        assert!(config.cache_dir.is_none());
    }
}
