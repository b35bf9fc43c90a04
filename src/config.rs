//! Constants and runtime settings.

use std::env;
use std::path::PathBuf;

/// Lowest VXLAN/GENEVE network identifier handed out.
pub const VNI_MIN: u32 = 100;
/// Highest VXLAN/GENEVE network identifier (24-bit field).
pub const VNI_MAX: u32 = (1 << 24) - 1;
/// First MPLS label outside the reserved range.
pub const MPLS_MIN_LABEL: u32 = 16;
/// `log2` of the largest subnet capacity that can be requested.
pub const MAX_CAPACITY_LOG2: usize = 128;

/// Environment variable holding the directory relative state paths resolve against.
pub const ENV_STATE_DIR: &str = "IPAM_STATE_DIR";
/// Environment variable holding the log4rs configuration path.
pub const ENV_LOG_CONFIG: &str = "IPAM_LOG_CONFIG";
const DEFAULT_LOG_CONFIG: &str = "log4rs.yml";

/// Settings for the `ipam` binary, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub state_dir: PathBuf,
    pub log_config: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            state_dir: PathBuf::from("."),
            log_config: PathBuf::from(DEFAULT_LOG_CONFIG),
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the `IPAM_*` variables.
    pub fn from_env() -> Settings {
        dotenv::dotenv().ok();
        Settings::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Settings
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        Settings {
            state_dir: lookup(ENV_STATE_DIR)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            log_config: lookup(ENV_LOG_CONFIG)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.log_config),
        }
    }

    /// Resolve a state file path against `state_dir` unless it is absolute.
    pub fn state_path(&self, file: &str) -> PathBuf {
        let path = PathBuf::from(file);
        if path.is_absolute() {
            path
        } else {
            self.state_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.state_path("subnet.json"), PathBuf::from("./subnet.json"));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [(ENV_STATE_DIR, "/var/lib/ipam"), (ENV_LOG_CONFIG, " ")]
            .into_iter()
            .collect();
        let settings = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(settings.state_dir, PathBuf::from("/var/lib/ipam"));
        assert_eq!(settings.log_config, PathBuf::from("log4rs.yml"));
        assert_eq!(
            settings.state_path("net.json"),
            PathBuf::from("/var/lib/ipam/net.json")
        );
        assert_eq!(settings.state_path("/tmp/x.json"), PathBuf::from("/tmp/x.json"));
    }

    #[test]
    fn test_ranges() {
        assert_eq!(VNI_MAX, 16_777_215);
        assert!(VNI_MIN < VNI_MAX);
    }
}
