use super::super::fixtures::{code_samples::PYTHON_HELLO, test_scenarios::PYTHON_INFINITE};
use super::*;

#[tokio::test]
async fn test_python_basic() -> Result<()> {
    test_language_execution("python", &["python3"], PYTHON_HELLO, "Hello from Python!").await
}

#[tokio::test]
async fn test_python_timeout() -> Result<()> {
    test_language_timeout("python", &["python3"], PYTHON_INFINITE).await
}

#[tokio::test]
async fn test_python_validate() -> Result<()> {
    if skip_if_not_available(&["python3"]) {
        return Ok(());
    }
    let dir = tempdir().unwrap();
    let service = test_service(dir.path(), 1);

    assert!(service.validate("python", PYTHON_HELLO).await?.valid);
    let invalid = service.validate("python", "print('unclosed").await?;
    assert!(!invalid.valid);
    assert!(invalid.message.unwrap().starts_with("Syntax Error:"));
    assert_workspace_root_empty(dir.path());
    Ok(())
}
