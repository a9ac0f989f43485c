use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{error::Error, types::duration_serde, types::ResourceLimits, Result};

/// Settings shared by the service, the handlers and the process runner.
///
/// Every field has a default, so a TOML file only needs the keys it overrides:
///
/// ```toml
/// run_timeout = 10
/// workspace_root = "/var/tmp/ide"
///
/// [limits]
/// max_output_bytes = 65536
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Wall-clock limit for running a program (seconds)
    #[serde(with = "duration_serde")]
    pub run_timeout: Duration,
    /// Wall-clock limit for a compile step (seconds)
    #[serde(with = "duration_serde")]
    pub compile_timeout: Duration,
    /// rustc is slow enough to get its own compile budget
    #[serde(with = "duration_serde")]
    pub rust_compile_timeout: Duration,
    #[serde(with = "duration_serde")]
    pub validate_timeout: Duration,
    /// Limit for `--version` style toolchain probes
    #[serde(with = "duration_serde")]
    pub probe_timeout: Duration,
    pub max_concurrent_executions: usize,
    pub max_source_bytes: usize,
    /// Directory under which per-request workspaces are created
    pub workspace_root: PathBuf,
    pub limits: ResourceLimits,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            run_timeout: Duration::from_secs(30),
            compile_timeout: Duration::from_secs(15),
            rust_compile_timeout: Duration::from_secs(20),
            validate_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            max_concurrent_executions: 10,
            max_source_bytes: 256 * 1024,
            workspace_root: std::env::temp_dir(),
            limits: ResourceLimits::default(),
        }
    }
}

impl ExecutionConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("run_timeout", self.run_timeout),
            ("compile_timeout", self.compile_timeout),
            ("rust_compile_timeout", self.rust_compile_timeout),
            ("validate_timeout", self.validate_timeout),
            ("probe_timeout", self.probe_timeout),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }
        if self.max_concurrent_executions == 0 {
            return Err(Error::Config(
                "max_concurrent_executions must be greater than zero".to_string(),
            ));
        }
        if self.max_source_bytes == 0 {
            return Err(Error::Config(
                "max_source_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
