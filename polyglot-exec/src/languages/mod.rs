//! Language handlers

mod c;
mod encoding;
mod go;
mod java;
mod javascript;
mod python;
mod rust;

pub use c::CHandler;
pub use encoding::{EncodingError, EncodingHandler, EncodingOperation};
pub use go::GoHandler;
pub use java::{extract_public_class, JavaHandler};
pub use javascript::JavaScriptHandler;
pub use python::PythonHandler;
pub use rust::RustHandler;

use async_trait::async_trait;
use regex::Regex;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{error, warn};
use which::which;

use crate::{
    config::ExecutionConfig,
    error::Error,
    normalize::{normalize, RawExecution},
    runner::{ProcessOutput, ProcessRunner, RunOutcome},
    types::{ExecutionResult, FailureKind, LanguageDescriptor, Validation},
    workspace::{Workspace, WorkspaceManager},
    Result,
};

/// The capability set every supported language provides
#[async_trait]
pub trait LanguageHandler: Send + Sync {
    /// Syntax check without running the program
    async fn validate(&self, source: &str) -> Validation;

    /// Compile (if needed) and run `source`, piping `stdin` to the program
    async fn execute(&self, source: &str, stdin: Option<&str>) -> ExecutionResult;

    /// Static metadata
    fn describe(&self) -> LanguageDescriptor;
}

/// Everything a handler needs from its environment
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub config: Arc<ExecutionConfig>,
    pub runner: ProcessRunner,
    pub workspaces: WorkspaceManager,
}

impl HandlerContext {
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            runner: ProcessRunner::new(config.limits.clone()),
            workspaces: WorkspaceManager::new(config.workspace_root.clone()),
            config: Arc::new(config),
        }
    }
}

/// An external binary a handler shells out to
#[derive(Debug, Clone)]
pub struct Toolchain {
    program: String,
    probe_args: Vec<String>,
    label: String,
    version: OnceLock<Option<String>>,
}

impl Toolchain {
    /// `probe_args` empty means a PATH lookup is enough
    pub fn new(program: &str, probe_args: &[&str], label: &str) -> Self {
        Self {
            program: program.to_string(),
            probe_args: probe_args.iter().map(|s| s.to_string()).collect(),
            label: label.to_string(),
            version: OnceLock::new(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self.version = OnceLock::new();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn missing_message(&self) -> String {
        format!("{} is not installed on this system", self.label)
    }

    /// PATH lookup only, no process is spawned
    pub fn locate(&self) -> Result<()> {
        which(&self.program)
            .map(|_| ())
            .map_err(|_| Error::ToolchainMissing(self.missing_message()))
    }

    pub async fn is_available(&self, ctx: &HandlerContext) -> bool {
        if self.probe_args.is_empty() {
            return self.locate().is_ok();
        }
        let args: Vec<&str> = self.probe_args.iter().map(String::as_str).collect();
        ctx.runner
            .probe(&self.program, &args, ctx.config.probe_timeout)
            .await
    }

    /// Version number printed by the probe command, e.g. `3.11.4`. Detected on
    /// first use and remembered; `None` when the tool is absent or silent.
    pub fn installed_version(&self) -> Option<&str> {
        self.version
            .get_or_init(|| detect_version(&self.program, &self.probe_args))
            .as_deref()
    }

    /// Fails with [`Error::ToolchainMissing`] before anything touches disk
    pub async fn ensure(&self, ctx: &HandlerContext) -> Result<()> {
        if self.is_available(ctx).await {
            Ok(())
        } else {
            Err(Error::ToolchainMissing(self.missing_message()))
        }
    }
}

fn version_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.\d+(?:\.\d+)?").ok())
        .as_ref()
}

fn detect_version(program: &str, probe_args: &[String]) -> Option<String> {
    if probe_args.is_empty() {
        return None;
    }
    let path = which(program).ok()?;
    let output = std::process::Command::new(path)
        .args(probe_args)
        .stdin(std::process::Stdio::null())
        .output()
        .ok()?;
    // Some tools (older javac, java) print their banner on stderr.
    let banner = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    version_re()?
        .find(&banner)
        .map(|m| m.as_str().to_string())
}

/// `"{label} {version}"` when the toolchain reports one, else `label`
pub(crate) fn version_label(label: &str, toolchain: &Toolchain) -> String {
    match toolchain.installed_version() {
        Some(version) => format!("{} {}", label, version),
        None => label.to_string(),
    }
}

/// Turn a handler's internal result into the canonical shape. Errors become
/// failure kinds here so nothing escapes `execute` as a fault.
pub(crate) fn finish(
    language: &str,
    result: Result<RawExecution>,
    started: Instant,
) -> ExecutionResult {
    let raw = match result {
        Ok(raw) => raw,
        Err(Error::ToolchainMissing(message)) => {
            warn!("{}: {}", language, message);
            RawExecution::failed(FailureKind::ToolchainMissing, message)
        }
        Err(e) => {
            error!("{} handler failed: {}", language, e);
            RawExecution::failed(FailureKind::InternalError, format!("Execution error: {}", e))
        }
    };
    normalize(raw, started.elapsed())
}

/// Run a program inside the workspace with the run timeout
pub(crate) async fn run_in_workspace<S: AsRef<OsStr>>(
    ctx: &HandlerContext,
    workspace: &Workspace,
    program: impl AsRef<OsStr>,
    args: &[S],
    stdin: Option<&str>,
) -> Result<RawExecution> {
    run_in_workspace_with_env(ctx, workspace, program, args, stdin, &[]).await
}

pub(crate) async fn run_in_workspace_with_env<S: AsRef<OsStr>>(
    ctx: &HandlerContext,
    workspace: &Workspace,
    program: impl AsRef<OsStr>,
    args: &[S],
    stdin: Option<&str>,
    env: &[(&str, &OsStr)],
) -> Result<RawExecution> {
    let timeout = ctx.config.run_timeout;
    match ctx
        .runner
        .run_with_env(program, args, workspace.path(), stdin, timeout, env)
        .await?
    {
        RunOutcome::Completed(output) => Ok(output.into()),
        RunOutcome::TimedOut(output) => Ok(timed_out(
            output,
            format!(
                "Code execution timed out after {} seconds",
                timeout.as_secs()
            ),
        )),
    }
}

/// Run a compiler. `Ok(None)` means the build succeeded; `Ok(Some(_))` is
/// the failure to report to the caller.
pub(crate) async fn compile_in_workspace(
    ctx: &HandlerContext,
    workspace: &Workspace,
    compiler: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<Option<RawExecution>> {
    match ctx
        .runner
        .run(compiler, args, workspace.path(), None, timeout)
        .await?
    {
        RunOutcome::Completed(output) if output.success() => Ok(None),
        RunOutcome::Completed(output) => Ok(Some(
            RawExecution::failed(
                FailureKind::CompileError,
                format!("Compilation Error:\n{}", diagnostics(&output)),
            )
            .with_exit_code(output.exit_code),
        )),
        RunOutcome::TimedOut(output) => Ok(Some(timed_out(
            output,
            format!("Compilation timed out after {} seconds", timeout.as_secs()),
        ))),
    }
}

fn timed_out(output: ProcessOutput, message: String) -> RawExecution {
    RawExecution::failed(FailureKind::Timeout, message).with_output(output.stdout)
}

fn diagnostics(output: &ProcessOutput) -> String {
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        output.stdout.trim().to_string()
    } else {
        stderr.to_string()
    }
}

/// Where a syntax checker reads the source from
pub(crate) enum SourceInput<'a> {
    Stdin(&'a str),
    File { name: &'a str, code: &'a str },
}

/// Toolchain-assisted syntax check bounded by the validate timeout. A missing
/// or misbehaving toolchain lets the code through with an explanation.
pub(crate) async fn syntax_check(
    ctx: &HandlerContext,
    toolchain: &Toolchain,
    args: &[&str],
    input: SourceInput<'_>,
) -> Validation {
    if !toolchain.is_available(ctx).await {
        return Validation::skipped(format!(
            "Syntax validation not available ({} required)",
            toolchain.label()
        ));
    }

    let timeout = ctx.config.validate_timeout;
    let outcome = match input {
        SourceInput::Stdin(code) => {
            let cwd = std::env::temp_dir();
            ctx.runner
                .run(toolchain.program(), args, &cwd, Some(code), timeout)
                .await
        }
        SourceInput::File { name, code } => {
            check_in_workspace(ctx, toolchain.program(), args, name, code, timeout).await
        }
    };

    match outcome {
        Ok(RunOutcome::Completed(output)) if output.success() => Validation::valid(),
        Ok(RunOutcome::Completed(output)) => Validation::invalid(diagnostics(&output)),
        Ok(RunOutcome::TimedOut(_)) => Validation::skipped(format!(
            "Syntax validation timed out after {} seconds",
            timeout.as_secs()
        )),
        Err(e) => {
            warn!("Syntax check with {} failed: {}", toolchain.program(), e);
            Validation::skipped(format!("Syntax validation not available: {}", e))
        }
    }
}

async fn check_in_workspace(
    ctx: &HandlerContext,
    program: &str,
    args: &[&str],
    file_name: &str,
    code: &str,
    timeout: Duration,
) -> Result<RunOutcome> {
    let workspace = ctx.workspaces.create().await?;
    workspace.write_source(file_name, code).await?;
    ctx.runner
        .run(program, args, workspace.path(), None, timeout)
        .await
}

pub(crate) fn binary_path(workspace: &Workspace, name: &str) -> PathBuf {
    let path = workspace.artifact(name);
    if cfg!(windows) {
        path.with_extension("exe")
    } else {
        path
    }
}

#[cfg(test)]
pub(crate) fn skip_if_not_available(tools: &[&str]) -> bool {
    let missing: Vec<_> = tools
        .iter()
        .filter(|tool| which(**tool).is_err())
        .map(|s| (*s).to_string())
        .collect();

    if !missing.is_empty() {
        eprintln!("Skipping test: {} not available", missing.join(", "));
        return true;
    }
    false
}
