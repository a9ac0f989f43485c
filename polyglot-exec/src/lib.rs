//! # Polyglot Code Execution
//!
//! Runs user-submitted snippets in Python, JavaScript, C, Java, Go and Rust as
//! child processes under wall-clock and resource limits, plus an in-process
//! encoding/decoding pseudo-language. Every run produces the same
//! [`ExecutionResult`] regardless of language.

mod config;
mod error;
mod languages;
mod normalize;
mod registry;
mod runner;
mod service;
mod types;
mod workspace;

pub use config::ExecutionConfig;
pub use error::Error;
pub use languages::{
    extract_public_class, CHandler, EncodingError, EncodingHandler, EncodingOperation, GoHandler,
    HandlerContext, JavaHandler, JavaScriptHandler, LanguageHandler, PythonHandler, RustHandler,
    Toolchain,
};
pub use normalize::{normalize, RawExecution};
pub use registry::HandlerRegistry;
pub use runner::{ProcessOutput, ProcessRunner, RunOutcome};
pub use service::{CodeExecutionService, DEFAULT_LANGUAGE};
pub use types::{
    ExecutionRequest, ExecutionResult, FailureKind, LanguageDescriptor, LanguageInfo,
    ResourceLimits, Validation, INFRA_EXIT_CODE,
};
pub use workspace::{Workspace, WorkspaceManager};

/// Result type for code execution operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
