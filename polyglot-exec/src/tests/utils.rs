use std::path::Path;
use std::time::Duration;

use crate::{CodeExecutionService, ExecutionConfig, ExecutionResult, FailureKind};

pub(crate) use crate::languages::skip_if_not_available;

pub mod defaults {
    use super::*;

    pub fn default_timeout() -> Duration {
        Duration::from_secs(10)
    }

    pub fn short_timeout() -> Duration {
        Duration::from_secs(1)
    }

    pub fn test_config(root: &Path, run_timeout: Duration) -> ExecutionConfig {
        ExecutionConfig::default()
            .with_workspace_root(root)
            .with_run_timeout(run_timeout)
    }

    pub fn test_service(root: &Path, max_concurrent: usize) -> CodeExecutionService {
        service_with_timeout(root, max_concurrent, default_timeout())
    }

    pub fn service_with_timeout(
        root: &Path,
        max_concurrent: usize,
        run_timeout: Duration,
    ) -> CodeExecutionService {
        let config = ExecutionConfig {
            max_concurrent_executions: max_concurrent,
            ..test_config(root, run_timeout)
        };
        tokio_test::assert_ok!(CodeExecutionService::new(config))
    }
}

pub fn assert_greeting(result: &ExecutionResult, greeting: &str) {
    assert_eq!(result.failure_kind, FailureKind::None, "{:?}", result);
    assert_eq!(result.exit_code, 0);
    assert!(result.stderr.is_none());
    assert!(
        result.stdout.contains(greeting),
        "expected {:?} in {:?}",
        greeting,
        result.stdout
    );
}

/// Nothing left behind under the workspace root
pub fn assert_workspace_root_empty(root: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(root)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "leftover artifacts: {:?}", leftovers);
}
