use super::super::fixtures::{code_samples::JS_HELLO, test_scenarios::JS_WITH_TIMEOUT};
use super::*;

#[tokio::test]
async fn test_javascript_basic() -> Result<()> {
    test_language_execution("javascript", &["node"], JS_HELLO, "Hello from JavaScript!").await
}

#[tokio::test]
async fn test_js_alias() -> Result<()> {
    test_language_execution("JS", &["node"], JS_HELLO, "Hello from JavaScript!").await
}

#[tokio::test]
async fn test_javascript_timeout() -> Result<()> {
    test_language_timeout("javascript", &["node"], JS_WITH_TIMEOUT).await
}
