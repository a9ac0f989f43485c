//! Reconciles the result shapes handlers report into [`ExecutionResult`].
//!
//! Two shapes are in circulation. Process-backed handlers report an
//! `exit_code` next to an `error` string that is empty on success. In-process
//! handlers report an `execution_time` and an `error` that is null on success.
//! Both deserialize into [`RawExecution`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::runner::ProcessOutput;
use crate::types::{seconds, ExecutionResult, FailureKind, INFRA_EXIT_CODE};

/// A handler's report before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExecution {
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    /// Seconds
    #[serde(default)]
    pub execution_time: Option<f64>,
    /// Explicit classification; wins over anything inferred from the exit code
    #[serde(default)]
    pub failure: Option<FailureKind>,
}

impl RawExecution {
    /// Successful in-process result
    pub fn timed(output: String, execution_time: Duration) -> Self {
        Self {
            output,
            execution_time: Some(execution_time.as_secs_f64()),
            ..Self::default()
        }
    }

    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            failure: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_output(mut self, output: String) -> Self {
        self.output = output;
        self
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }
}

impl From<ProcessOutput> for RawExecution {
    fn from(output: ProcessOutput) -> Self {
        let error = if output.success() {
            String::new()
        } else {
            output.stderr
        };
        Self {
            output: output.stdout,
            error: Some(error),
            exit_code: Some(output.exit_code),
            execution_time: None,
            failure: None,
        }
    }
}

/// Fold a raw report into the canonical result. `measured` is the wall-clock
/// time observed by the caller and fills in for shapes without a timing.
pub fn normalize(raw: RawExecution, measured: Duration) -> ExecutionResult {
    let message = raw.error.filter(|e| !e.trim().is_empty());
    let nonzero_exit = raw.exit_code.filter(|code| *code != 0);

    let failure_kind = match raw.failure {
        Some(kind) => kind,
        None if nonzero_exit.is_some() => FailureKind::RuntimeError,
        // Timing shape: a populated error is the only failure signal.
        None if raw.exit_code.is_none() && message.is_some() => FailureKind::RuntimeError,
        None => FailureKind::None,
    };

    let exit_code = match (failure_kind, raw.exit_code) {
        (FailureKind::None, _) => 0,
        (kind, _) if kind.is_infrastructure() => INFRA_EXIT_CODE,
        (_, Some(code)) if code != 0 => code,
        _ => 1,
    };

    let stderr = match (failure_kind, message) {
        (FailureKind::None, _) => None,
        (_, Some(message)) => Some(message),
        (_, None) => Some(format!("Process exited with code {}", exit_code)),
    };

    let execution_time = raw
        .execution_time
        .filter(|t| t.is_finite() && *t >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(measured);

    ExecutionResult {
        stdout: raw.output,
        stderr,
        exit_code,
        execution_time_seconds: seconds(execution_time),
        failure_kind,
    }
}
