use super::utils::defaults::{service_with_timeout, short_timeout, test_service};
use super::utils::{assert_greeting, assert_workspace_root_empty, skip_if_not_available};
use crate::{ExecutionRequest, ExecutionResult, FailureKind, Result};
use tempfile::tempdir;

pub mod c;
pub mod golang;
pub mod java;
pub mod javascript;
pub mod python;
pub mod rust;

// Common test utilities for language tests
pub(crate) async fn test_language_execution(
    language: &str,
    tools: &[&str],
    code: &str,
    greeting: &str,
) -> Result<()> {
    if skip_if_not_available(tools) {
        return Ok(());
    }
    let dir = tempdir().unwrap();
    let service = test_service(dir.path(), 1);

    let result = service.execute(ExecutionRequest::new(language, code)).await?;
    assert_greeting(&result, greeting);
    assert_workspace_root_empty(dir.path());
    Ok(())
}

pub(crate) async fn test_compile_error(
    language: &str,
    tools: &[&str],
    code: &str,
) -> Result<Option<ExecutionResult>> {
    if skip_if_not_available(tools) {
        return Ok(None);
    }
    let dir = tempdir().unwrap();
    let service = test_service(dir.path(), 1);

    let result = service.execute(ExecutionRequest::new(language, code)).await?;
    assert_eq!(result.failure_kind, FailureKind::CompileError, "{:?}", result);
    assert_eq!(result.stdout, "");
    assert!(result
        .stderr
        .as_deref()
        .unwrap_or_default()
        .starts_with("Compilation Error:\n"));
    assert_workspace_root_empty(dir.path());
    Ok(Some(result))
}

pub(crate) async fn test_language_timeout(
    language: &str,
    tools: &[&str],
    code: &str,
) -> Result<()> {
    if skip_if_not_available(tools) {
        return Ok(());
    }
    let dir = tempdir().unwrap();
    let service = service_with_timeout(dir.path(), 1, short_timeout());

    let result = service.execute(ExecutionRequest::new(language, code)).await?;
    assert_eq!(result.failure_kind, FailureKind::Timeout, "{:?}", result);
    assert_eq!(result.exit_code, -1);
    assert_workspace_root_empty(dir.path());
    Ok(())
}
