//! Configuration loading from mesh.toml
//!
//! Both tools read an optional `mesh.toml` discovered by walking up
//! from the current directory. Explicit command-line flags override
//! anything found in the file.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// MeshBench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeshConfig {
    /// Group launch configuration
    #[serde(default)]
    pub launch: LaunchConfig,
    /// Statistics tool configuration
    #[serde(default)]
    pub stats: StatsConfig,
    /// Latency tool configuration
    #[serde(default)]
    pub latency: LatencyConfig,
}

/// Group launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Number of ranks to launch
    #[serde(default = "default_np")]
    pub np: u32,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self { np: default_np() }
    }
}

fn default_np() -> u32 {
    2
}

/// Statistics tool configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatsConfig {
    /// Dataset seed; a fresh entropy seed is drawn when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Gather shards back onto the root and verify reassembly
    #[serde(default)]
    pub verify: bool,
}

/// Latency tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyConfig {
    /// Untimed round trips before the clock starts
    #[serde(default)]
    pub warmup: u64,
    /// Message size in bytes
    #[serde(default = "default_message_size")]
    pub message_size: usize,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            warmup: 0,
            message_size: default_message_size(),
        }
    }
}

fn default_message_size() -> usize {
    1
}

impl MeshConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join("mesh.toml");
            if config_path.exists() {
                return Self::load(&config_path).ok();
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# MeshBench Configuration

[launch]
# Number of ranks to launch
np = 2

[stats]
# Dataset seed for reproducible runs (uncomment to enable)
# seed = 42
# Gather shards back onto the root and verify reassembly
verify = false

[latency]
# Untimed round trips before the clock starts
warmup = 0
# Message size in bytes
message_size = 1
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MeshConfig::default();
        assert_eq!(config.launch.np, 2);
        assert_eq!(config.stats.seed, None);
        assert!(!config.stats.verify);
        assert_eq!(config.latency.warmup, 0);
        assert_eq!(config.latency.message_size, 1);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [launch]
            np = 4

            [stats]
            seed = 7
        "#;

        let config: MeshConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.launch.np, 4);
        assert_eq!(config.stats.seed, Some(7));
        // Defaults should still apply
        assert!(!config.stats.verify);
        assert_eq!(config.latency.message_size, 1);
    }

    #[test]
    fn test_default_toml_parses() {
        let default_toml = MeshConfig::default_toml();
        let config: MeshConfig = toml::from_str(&default_toml).unwrap();
        assert_eq!(config.launch.np, 2);
        assert_eq!(config.latency.warmup, 0);
    }
}
