use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Instant;

use crate::{
    languages::{
        compile_in_workspace, finish, run_in_workspace, syntax_check, version_label,
        HandlerContext, LanguageHandler, SourceInput, Toolchain,
    },
    normalize::RawExecution,
    types::{ExecutionResult, LanguageDescriptor, Validation},
    Result,
};

const DEFAULT_CLASS: &str = "Main";

fn public_class_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\bpublic\s+(?:(?:final|abstract|strictfp)\s+)*class\s+([A-Za-z_$][A-Za-z0-9_$]*)",
        )
        .ok()
    })
    .as_ref()
}

/// Name of the first `public class` declared in `source`, or `Main`.
///
/// javac requires a public class to live in a file of the same name, so the
/// source is saved under whatever this returns.
pub fn extract_public_class(source: &str) -> String {
    let Some(re) = public_class_re() else {
        return DEFAULT_CLASS.to_string();
    };
    source
        .lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .find_map(|line| re.captures(line).map(|caps| caps[1].to_string()))
        .unwrap_or_else(|| DEFAULT_CLASS.to_string())
}

pub struct JavaHandler {
    ctx: HandlerContext,
    compiler: Toolchain,
    runtime: Toolchain,
}

impl JavaHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            ctx,
            compiler: Toolchain::new("javac", &["-version"], "Java compiler (javac)"),
            runtime: Toolchain::new("java", &["-version"], "Java runtime (java)"),
        }
    }

    pub fn with_compiler(mut self, program: &str) -> Self {
        self.compiler = self.compiler.with_program(program);
        self
    }

    pub fn with_runtime(mut self, program: &str) -> Self {
        self.runtime = self.runtime.with_program(program);
        self
    }

    async fn run(&self, source: &str, stdin: Option<&str>) -> Result<RawExecution> {
        self.compiler.ensure(&self.ctx).await?;
        self.runtime.locate()?;

        let class_name = extract_public_class(source);
        let file_name = format!("{}.java", class_name);

        let workspace = self.ctx.workspaces.create().await?;
        let staged = workspace.write_source("source.java", source).await?;
        workspace.rename(&staged, &file_name).await?;

        if let Some(failure) = compile_in_workspace(
            &self.ctx,
            &workspace,
            self.compiler.program(),
            &[file_name.as_str()],
            self.ctx.config.compile_timeout,
        )
        .await?
        {
            return Ok(failure);
        }

        run_in_workspace(
            &self.ctx,
            &workspace,
            self.runtime.program(),
            &["-cp", ".", class_name.as_str()],
            stdin,
        )
        .await
    }
}

#[async_trait]
impl LanguageHandler for JavaHandler {
    async fn validate(&self, source: &str) -> Validation {
        let file_name = format!("{}.java", extract_public_class(source));
        syntax_check(
            &self.ctx,
            &self.compiler,
            &["-d", ".", file_name.as_str()],
            SourceInput::File {
                name: &file_name,
                code: source,
            },
        )
        .await
    }

    async fn execute(&self, source: &str, stdin: Option<&str>) -> ExecutionResult {
        let started = Instant::now();
        finish("java", self.run(source, stdin).await, started)
    }

    fn describe(&self) -> LanguageDescriptor {
        LanguageDescriptor::new(
            "Java",
            &version_label("OpenJDK", &self.compiler),
            ".java",
            "java",
        )
    }
}
