use async_trait::async_trait;
use std::time::Instant;

use crate::{
    languages::{
        finish, run_in_workspace, syntax_check, HandlerContext, LanguageHandler, SourceInput,
        Toolchain,
    },
    normalize::RawExecution,
    types::{ExecutionResult, LanguageDescriptor, Validation},
    Result,
};

/// Compiles stdin to bytecode without running it
const CHECK_SCRIPT: &str = "import sys; compile(sys.stdin.read(), '<source>', 'exec')";

pub struct PythonHandler {
    ctx: HandlerContext,
    interpreter: Toolchain,
}

impl PythonHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            ctx,
            interpreter: Toolchain::new("python3", &["--version"], "Python interpreter (python3)"),
        }
    }

    pub fn with_interpreter(mut self, program: &str) -> Self {
        self.interpreter = self.interpreter.with_program(program);
        self
    }

    async fn run(&self, source: &str, stdin: Option<&str>) -> Result<RawExecution> {
        // The interpreter is assumed present; a PATH lookup is the only check.
        self.interpreter.locate()?;

        let workspace = self.ctx.workspaces.create().await?;
        workspace.write_source("main.py", source).await?;
        run_in_workspace(
            &self.ctx,
            &workspace,
            self.interpreter.program(),
            &["main.py"],
            stdin,
        )
        .await
    }
}

/// `SyntaxError: msg` plus the line it points at, from a compile() traceback
fn syntax_error_message(traceback: &str) -> String {
    let last = traceback
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default()
        .trim();
    let detail = last.strip_prefix("SyntaxError: ").unwrap_or(last);

    let line = traceback.lines().find_map(|l| {
        l.trim()
            .strip_prefix("File \"<source>\", line ")
            .map(|rest| rest.split(|c: char| !c.is_ascii_digit()).next().unwrap_or(rest))
    });

    match line {
        Some(line) if !line.is_empty() => format!("Syntax Error: {} (line {})", detail, line),
        _ => format!("Syntax Error: {}", detail),
    }
}

#[async_trait]
impl LanguageHandler for PythonHandler {
    async fn validate(&self, source: &str) -> Validation {
        let check = syntax_check(
            &self.ctx,
            &self.interpreter,
            &["-c", CHECK_SCRIPT],
            SourceInput::Stdin(source),
        )
        .await;

        if check.valid {
            return check;
        }
        let traceback = check.message.as_deref().unwrap_or_default();
        Validation::invalid(syntax_error_message(traceback))
    }

    async fn execute(&self, source: &str, stdin: Option<&str>) -> ExecutionResult {
        let started = Instant::now();
        finish("python", self.run(source, stdin).await, started)
    }

    fn describe(&self) -> LanguageDescriptor {
        let version = self.interpreter.installed_version().unwrap_or("3");
        LanguageDescriptor::new("Python", version, ".py", "python")
    }
}
