use super::super::fixtures::{code_samples::C_HELLO, compile_errors::C_MISSING_SEMICOLON};
use super::*;

#[tokio::test]
async fn test_c_basic() -> Result<()> {
    test_language_execution("c", &["gcc"], C_HELLO, "Hello from C!").await
}

#[tokio::test]
async fn test_c_compile_error() -> Result<()> {
    if let Some(result) = test_compile_error("c", &["gcc"], C_MISSING_SEMICOLON).await? {
        assert!(result.stderr.unwrap().contains("main.c"));
    }
    Ok(())
}

#[tokio::test]
async fn test_c_infinite_loop() -> Result<()> {
    test_language_timeout("c", &["gcc"], "int main(void) { for (;;) {} }").await
}
