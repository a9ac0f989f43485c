use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::ExecutionConfig,
    error::Error,
    languages::{HandlerContext, LanguageHandler},
    registry::HandlerRegistry,
    types::{ExecutionRequest, ExecutionResult, LanguageInfo, Validation},
    Result,
};

/// Language used when a request does not name one
pub const DEFAULT_LANGUAGE: &str = "python";

/// Entry point for callers: request checks, handler lookup and a cap on how
/// many executions run at once.
#[derive(Debug, Clone)]
pub struct CodeExecutionService {
    registry: Arc<HandlerRegistry>,
    semaphore: Arc<Semaphore>,
    config: Arc<ExecutionConfig>,
}

impl CodeExecutionService {
    /// Service over every built-in language
    pub fn new(config: ExecutionConfig) -> Result<Self> {
        config.validate()?;
        let ctx = HandlerContext::new(config.clone());
        let registry = HandlerRegistry::with_builtin(&ctx);
        Ok(Self::with_registry(config, registry))
    }

    pub fn with_registry(config: ExecutionConfig, registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_executions)),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let code = self.check_source(&request.source_code)?;
        if code.is_empty() {
            return Err(Error::EmptySource);
        }

        let language = match request.language.trim() {
            "" => DEFAULT_LANGUAGE,
            language => language,
        };
        let handler = self.handler(language)?;

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| Error::System(format!("Failed to acquire execution permit: {}", e)))?;

        let request_id = Uuid::new_v4();
        info!("[{}] Executing {} ({} bytes)", request_id, language, code.len());

        let result = handler.execute(code, request.stdin.as_deref()).await;

        if result.is_success() {
            info!(
                "[{}] Execution completed in {:.3}s",
                request_id, result.execution_time_seconds
            );
        } else {
            warn!(
                "[{}] Execution failed: {} (exit code {})",
                request_id, result.failure_kind, result.exit_code
            );
        }
        Ok(result)
    }

    pub async fn validate(&self, language: &str, source_code: &str) -> Result<Validation> {
        let code = self.check_source(source_code)?;
        if code.is_empty() {
            return Ok(Validation::skipped("No code to validate"));
        }

        let language = language.trim();
        if language.is_empty() {
            return Err(Error::MissingLanguage);
        }
        let handler = self.handler(language)?;

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| Error::System(format!("Failed to acquire execution permit: {}", e)))?;

        debug!("Validating {} source ({} bytes)", language, code.len());
        Ok(handler.validate(code).await)
    }

    /// Catalog of supported languages, one entry per display name
    pub fn languages(&self) -> Vec<LanguageInfo> {
        self.registry.list_languages()
    }

    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    fn handler(&self, language: &str) -> Result<Arc<dyn LanguageHandler>> {
        self.registry
            .get(language)
            .ok_or_else(|| Error::UnsupportedLanguage(language.to_string()))
    }

    /// Trimmed source, rejected when over the configured size
    fn check_source<'a>(&self, source: &'a str) -> Result<&'a str> {
        let code = source.trim();
        let limit = self.config.max_source_bytes;
        if code.len() > limit {
            return Err(Error::SourceTooLarge {
                actual: code.len(),
                limit,
            });
        }
        Ok(code)
    }
}
