use super::super::fixtures::{
    code_samples::JAVA_HELLO, compile_errors::JAVA_TYPE_ERROR, test_scenarios::JAVA_WITH_TIMEOUT,
};
use super::*;

#[tokio::test]
async fn test_java_basic() -> Result<()> {
    test_language_execution("java", &["javac", "java"], JAVA_HELLO, "Hello from Java!").await
}

#[tokio::test]
async fn test_java_custom_class_name() -> Result<()> {
    let code = JAVA_HELLO.replace("class Main", "class Renamed");
    test_language_execution("java", &["javac", "java"], &code, "Hello from Java!").await
}

#[tokio::test]
async fn test_java_compile_error() -> Result<()> {
    if let Some(result) = test_compile_error("java", &["javac"], JAVA_TYPE_ERROR).await? {
        assert!(result.stderr.unwrap().contains("incompatible types"));
    }
    Ok(())
}

#[tokio::test]
async fn test_java_timeout() -> Result<()> {
    test_language_timeout("java", &["javac", "java"], JAVA_WITH_TIMEOUT).await
}
