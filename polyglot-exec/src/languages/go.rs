use async_trait::async_trait;
use std::time::Instant;

use crate::{
    languages::{
        finish, run_in_workspace_with_env, syntax_check, version_label, HandlerContext,
        LanguageHandler, SourceInput, Toolchain,
    },
    normalize::RawExecution,
    types::{ExecutionResult, LanguageDescriptor, Validation},
    Result,
};

pub struct GoHandler {
    ctx: HandlerContext,
    go: Toolchain,
    formatter: Toolchain,
}

impl GoHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            ctx,
            go: Toolchain::new("go", &["version"], "Go"),
            formatter: Toolchain::new("gofmt", &[], "gofmt"),
        }
    }

    pub fn with_go(mut self, program: &str) -> Self {
        self.go = self.go.with_program(program);
        self
    }

    async fn run(&self, source: &str, stdin: Option<&str>) -> Result<RawExecution> {
        self.go.ensure(&self.ctx).await?;

        let workspace = self.ctx.workspaces.create().await?;
        workspace.write_source("main.go", source).await?;

        // `go run` builds and runs in one step, so the run timeout covers both.
        // Its scratch build dir goes inside the workspace so a killed build
        // leaves nothing behind.
        run_in_workspace_with_env(
            &self.ctx,
            &workspace,
            self.go.program(),
            &["run", "main.go"],
            stdin,
            &[("GOTMPDIR", workspace.path().as_os_str())],
        )
        .await
    }
}

#[async_trait]
impl LanguageHandler for GoHandler {
    async fn validate(&self, source: &str) -> Validation {
        syntax_check(
            &self.ctx,
            &self.formatter,
            &["-e", "main.go"],
            SourceInput::File {
                name: "main.go",
                code: source,
            },
        )
        .await
    }

    async fn execute(&self, source: &str, stdin: Option<&str>) -> ExecutionResult {
        let started = Instant::now();
        finish("go", self.run(source, stdin).await, started)
    }

    fn describe(&self) -> LanguageDescriptor {
        LanguageDescriptor::new("Go", &version_label("Go", &self.go), ".go", "go")
    }
}
