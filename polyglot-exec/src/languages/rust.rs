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

pub struct RustHandler {
    ctx: HandlerContext,
    compiler: Toolchain,
}

impl RustHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            ctx,
            compiler: Toolchain::new("rustc", &["--version"], "Rust compiler (rustc)"),
        }
    }

    pub fn with_compiler(mut self, program: &str) -> Self {
        self.compiler = self.compiler.with_program(program);
        self
    }

    async fn run(&self, source: &str, stdin: Option<&str>) -> Result<RawExecution> {
        self.compiler.ensure(&self.ctx).await?;

        let workspace = self.ctx.workspaces.create().await?;
        workspace.write_source("main.rs", source).await?;

        let binary = binary_path(&workspace, "main");
        let output = binary.to_string_lossy().into_owned();
        if let Some(failure) = compile_in_workspace(
            &self.ctx,
            &workspace,
            self.compiler.program(),
            &["main.rs", "-o", output.as_str()],
            self.ctx.config.rust_compile_timeout,
        )
        .await?
        {
            return Ok(failure);
        }

        run_in_workspace(&self.ctx, &workspace, &binary, &[] as &[&str], stdin).await
    }
}

#[async_trait]
impl LanguageHandler for RustHandler {
    async fn validate(&self, source: &str) -> Validation {
        syntax_check(
            &self.ctx,
            &self.compiler,
            &[
                "--emit=metadata",
                "--crate-type=bin",
                "-o",
                "main.rmeta",
                "main.rs",
            ],
            SourceInput::File {
                name: "main.rs",
                code: source,
            },
        )
        .await
    }

    async fn execute(&self, source: &str, stdin: Option<&str>) -> ExecutionResult {
        let started = Instant::now();
        finish("rust", self.run(source, stdin).await, started)
    }

    fn describe(&self) -> LanguageDescriptor {
        LanguageDescriptor::new("Rust", &version_label("Rustc", &self.compiler), ".rs", "rust")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionConfig;
    use crate::languages::skip_if_not_available;
    use crate::types::FailureKind;
    use tempfile::tempdir;

    fn handler(root: &std::path::Path) -> RustHandler {
        RustHandler::new(HandlerContext::new(
            ExecutionConfig::default().with_workspace_root(root),
        ))
    }

    #[tokio::test]
    async fn hello_world() {
        if skip_if_not_available(&["rustc"]) {
            return;
        }
        let dir = tempdir().unwrap();
        let source = r#"
fn main() {
    println!("Hello from Rust!");
}
"#;
        let result = handler(dir.path()).execute(source, None).await;

        assert!(result.is_success(), "{:?}", result);
        assert_eq!(result.stdout, "Hello from Rust!\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn reads_stdin() {
        if skip_if_not_available(&["rustc"]) {
            return;
        }
        let dir = tempdir().unwrap();
        let source = r#"
use std::io::Read;

fn main() {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input).unwrap();
    println!("{}", input.trim().to_uppercase());
}
"#;
        let result = handler(dir.path()).execute(source, Some("shout")).await;
        assert_eq!(result.stdout.trim(), "SHOUT");
    }

    #[tokio::test]
    async fn compile_error_is_reported() {
        if skip_if_not_available(&["rustc"]) {
            return;
        }
        let dir = tempdir().unwrap();
        let result = handler(dir.path())
            .execute("fn main() { let x: i32 = \"no\"; }", None)
            .await;

        assert_eq!(result.failure_kind, FailureKind::CompileError);
        assert_eq!(result.stdout, "");
        assert!(result.stderr.unwrap().contains("mismatched types"));
    }

    #[tokio::test]
    async fn panic_is_runtime_error() {
        if skip_if_not_available(&["rustc"]) {
            return;
        }
        let dir = tempdir().unwrap();
        let result = handler(dir.path())
            .execute("fn main() { panic!(\"oh no\"); }", None)
            .await;

        assert_eq!(result.failure_kind, FailureKind::RuntimeError);
        assert_eq!(result.exit_code, 101);
        assert!(result.stderr.unwrap().contains("oh no"));
    }

    #[tokio::test]
    async fn validate_emits_metadata_only() {
        if skip_if_not_available(&["rustc"]) {
            return;
        }
        let dir = tempdir().unwrap();
        let handler = handler(dir.path());

        assert!(handler.validate("fn main() {}").await.valid);
        let invalid = handler.validate("fn main() { let }").await;
        assert!(!invalid.valid);
        assert!(invalid.message.unwrap().contains("error"));
    }

    #[tokio::test]
    async fn missing_compiler_creates_nothing() {
        let dir = tempdir().unwrap();
        let result = handler(dir.path())
            .with_compiler("rustc-does-not-exist")
            .execute("fn main() {}", None)
            .await;

        assert_eq!(result.failure_kind, FailureKind::ToolchainMissing);
        assert_eq!(
            result.stderr.as_deref(),
            Some("Rust compiler (rustc) is not installed on this system")
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
