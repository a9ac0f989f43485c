use super::super::fixtures::{
    code_samples::RUST_HELLO, compile_errors::RUST_BORROW_ERROR, test_scenarios::RUST_WITH_TIMEOUT,
};
use super::*;

#[tokio::test]
async fn test_rust_basic() -> Result<()> {
    test_language_execution("rust", &["rustc"], RUST_HELLO, "Hello from Rust!").await
}

#[tokio::test]
async fn test_rust_compile_error() -> Result<()> {
    if let Some(result) = test_compile_error("rust", &["rustc"], RUST_BORROW_ERROR).await? {
        assert!(result.stderr.unwrap().contains("E0382"));
    }
    Ok(())
}

#[tokio::test]
async fn test_rust_timeout() -> Result<()> {
    test_language_timeout("rust", &["rustc"], RUST_WITH_TIMEOUT).await
}

#[tokio::test]
async fn test_rust_validate() -> Result<()> {
    if skip_if_not_available(&["rustc"]) {
        return Ok(());
    }
    let dir = tempdir().unwrap();
    let service = test_service(dir.path(), 1);

    assert!(service.validate("rust", RUST_HELLO).await?.valid);
    assert!(!service.validate("rust", RUST_BORROW_ERROR).await?.valid);
    assert_workspace_root_empty(dir.path());
    Ok(())
}
