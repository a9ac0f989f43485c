//! Cross-module suites driven through [`CodeExecutionService`](crate::CodeExecutionService)

mod languages;
mod utils;
