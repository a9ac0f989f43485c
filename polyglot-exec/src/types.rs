use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Exit code reported when the failure happened outside the user's program
/// (missing toolchain, timeout, handler bug).
pub const INFRA_EXIT_CODE: i32 = -1;

/// Static metadata describing a supported language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageDescriptor {
    /// Display name, also the deduplication key of the catalog
    pub name: String,
    /// Toolchain version string shown to the user
    pub version: String,
    /// Canonical source file extension, including the leading dot
    pub file_extension: String,
    /// Editor syntax-highlight identifier
    pub syntax_id: String,
}

impl LanguageDescriptor {
    pub fn new(name: &str, version: &str, file_extension: &str, syntax_id: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            file_extension: file_extension.to_string(),
            syntax_id: syntax_id.to_string(),
        }
    }
}

/// Catalog entry: a descriptor together with the registry key that reaches it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub key: String,
    #[serde(flatten)]
    pub descriptor: LanguageDescriptor,
}

/// Code execution request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Registry key of the language, matched case-insensitively
    pub language: String,
    /// Source code to execute
    pub source_code: String,
    /// Data piped to the program's stdin
    #[serde(default)]
    pub stdin: Option<String>,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, source_code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            source_code: source_code.into(),
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }
}

/// Why an execution did not succeed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    #[default]
    None,
    ToolchainMissing,
    CompileError,
    RuntimeError,
    Timeout,
    InternalError,
}

impl FailureKind {
    /// Failures that say nothing about the user's program
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            FailureKind::ToolchainMissing | FailureKind::Timeout | FailureKind::InternalError
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::None => "none",
            FailureKind::ToolchainMissing => "toolchain_missing",
            FailureKind::CompileError => "compile_error",
            FailureKind::RuntimeError => "runtime_error",
            FailureKind::Timeout => "timeout",
            FailureKind::InternalError => "internal_error",
        };
        f.write_str(s)
    }
}

/// Canonical execution result returned for every language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Program output (stdout)
    pub stdout: String,
    /// Program errors or failure message; absent on success
    pub stderr: Option<String>,
    pub exit_code: i32,
    pub execution_time_seconds: f64,
    pub failure_kind: FailureKind,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.failure_kind == FailureKind::None
    }
}

/// Outcome of a syntax check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    pub message: Option<String>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }

    /// Validation could not run; the code is let through with an explanation
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: Some(message.into()),
        }
    }
}

/// Resource limits applied to every child process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum CPU time (seconds)
    pub cpu_time: u64,
    /// Maximum size of any file the child writes (bytes)
    pub file_size: u64,
    /// Maximum captured bytes per output stream
    pub max_output_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_time: 60,
            file_size: 64 * 1024 * 1024, // 64MB, room for compiled binaries
            max_output_bytes: 1024 * 1024, // 1MB
        }
    }
}

pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

pub(crate) fn seconds(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0).round() / 1000.0
}
