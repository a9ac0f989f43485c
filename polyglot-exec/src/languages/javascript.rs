use async_trait::async_trait;
use std::time::Instant;

use crate::{
    languages::{
        finish, run_in_workspace, syntax_check, version_label, HandlerContext, LanguageHandler,
        SourceInput, Toolchain,
    },
    normalize::RawExecution,
    types::{ExecutionResult, LanguageDescriptor, Validation},
    Result,
};

pub struct JavaScriptHandler {
    ctx: HandlerContext,
    node: Toolchain,
}

impl JavaScriptHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            ctx,
            node: Toolchain::new("node", &["--version"], "Node.js"),
        }
    }

    pub fn with_node(mut self, program: &str) -> Self {
        self.node = self.node.with_program(program);
        self
    }

    async fn run(&self, source: &str, stdin: Option<&str>) -> Result<RawExecution> {
        self.node.ensure(&self.ctx).await?;

        let workspace = self.ctx.workspaces.create().await?;
        workspace.write_source("main.js", source).await?;
        run_in_workspace(&self.ctx, &workspace, self.node.program(), &["main.js"], stdin).await
    }
}

#[async_trait]
impl LanguageHandler for JavaScriptHandler {
    async fn validate(&self, source: &str) -> Validation {
        syntax_check(
            &self.ctx,
            &self.node,
            &["--check", "main.js"],
            SourceInput::File {
                name: "main.js",
                code: source,
            },
        )
        .await
    }

    async fn execute(&self, source: &str, stdin: Option<&str>) -> ExecutionResult {
        let started = Instant::now();
        finish("javascript", self.run(source, stdin).await, started)
    }

    fn describe(&self) -> LanguageDescriptor {
        LanguageDescriptor::new(
            "JavaScript",
            &version_label("Node.js", &self.node),
            ".js",
            "javascript",
        )
    }
}
