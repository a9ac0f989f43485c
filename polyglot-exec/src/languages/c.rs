use async_trait::async_trait;
use std::time::Instant;

use crate::{
    languages::{
        binary_path, compile_in_workspace, finish, run_in_workspace, syntax_check,
        version_label, HandlerContext, LanguageHandler, SourceInput, Toolchain,
    },
    normalize::RawExecution,
    types::{ExecutionResult, LanguageDescriptor, Validation},
    Result,
};

pub struct CHandler {
    ctx: HandlerContext,
    compiler: Toolchain,
}

impl CHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            ctx,
            compiler: Toolchain::new("gcc", &["--version"], "GCC compiler"),
        }
    }

    pub fn with_compiler(mut self, program: &str) -> Self {
        self.compiler = self.compiler.with_program(program);
        self
    }

    async fn run(&self, source: &str, stdin: Option<&str>) -> Result<RawExecution> {
        self.compiler.ensure(&self.ctx).await?;

        let workspace = self.ctx.workspaces.create().await?;
        workspace.write_source("main.c", source).await?;

        let binary = binary_path(&workspace, "main");
        let output = binary.to_string_lossy().into_owned();
        if let Some(failure) = compile_in_workspace(
            &self.ctx,
            &workspace,
            self.compiler.program(),
            &["main.c", "-o", output.as_str()],
            self.ctx.config.compile_timeout,
        )
        .await?
        {
            return Ok(failure);
        }

        run_in_workspace(&self.ctx, &workspace, &binary, &[] as &[&str], stdin).await
    }
}

#[async_trait]
impl LanguageHandler for CHandler {
    async fn validate(&self, source: &str) -> Validation {
        syntax_check(
            &self.ctx,
            &self.compiler,
            &["-fsyntax-only", "main.c"],
            SourceInput::File {
                name: "main.c",
                code: source,
            },
        )
        .await
    }

    async fn execute(&self, source: &str, stdin: Option<&str>) -> ExecutionResult {
        let started = Instant::now();
        finish("c", self.run(source, stdin).await, started)
    }

    fn describe(&self) -> LanguageDescriptor {
        LanguageDescriptor::new("C", &version_label("GCC", &self.compiler), ".c", "c")
    }
}
