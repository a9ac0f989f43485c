use super::super::fixtures::{code_samples::GO_HELLO, test_scenarios::GO_WITH_TIMEOUT};
use super::*;

#[tokio::test]
async fn test_go_basic() -> Result<()> {
    test_language_execution("go", &["go"], GO_HELLO, "Hello from Go!").await
}

#[tokio::test]
async fn test_go_timeout() -> Result<()> {
    test_language_timeout("go", &["go"], GO_WITH_TIMEOUT).await
}
