use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use polyglot_exec::{
    CodeExecutionService, ExecutionConfig, ExecutionRequest, ExecutionResult, FailureKind,
    LanguageInfo, Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Execution(#[from] polyglot_exec::Error),
    #[error("Server error: {0}")]
    Server(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        use polyglot_exec::Error as E;

        let (status, message) = match &self {
            ServerError::Execution(
                E::UnsupportedLanguage(_)
                | E::MissingLanguage
                | E::EmptySource
                | E::SourceTooLarge { .. },
            ) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Execution(e) => {
                error!("Request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ServerError::Server(e) => {
                error!("Server error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ExecuteRequest {
    /// Defaults to python when absent
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub code: String,
    #[serde(default, alias = "input")]
    pub stdin: Option<String>,
}

/// Wire shape of an execution result
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub output: String,
    /// Null on success
    pub error: Option<String>,
    /// Seconds
    pub execution_time: f64,
    pub exit_code: i32,
    pub failure_kind: FailureKind,
}

impl From<ExecutionResult> for ExecuteResponse {
    fn from(result: ExecutionResult) -> Self {
        Self {
            output: result.stdout,
            error: result.stderr,
            execution_time: result.execution_time_seconds,
            exit_code: result.exit_code,
            failure_kind: result.failure_kind,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub message: String,
}

impl From<Validation> for ValidateResponse {
    fn from(validation: Validation) -> Self {
        let message = validation.message.unwrap_or_else(|| {
            if validation.valid {
                "Syntax is valid".to_string()
            } else {
                "Syntax error".to_string()
            }
        });
        Self {
            valid: validation.valid,
            message,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguagesResponse {
    pub languages: Vec<LanguageInfo>,
}

#[derive(Clone)]
pub struct AppState {
    service: Arc<CodeExecutionService>,
}

pub fn create_app(config: ExecutionConfig) -> Result<Router, ServerError> {
    let service = CodeExecutionService::new(config)?;
    Ok(app_with_service(service))
}

pub fn app_with_service(service: CodeExecutionService) -> Router {
    let state = AppState {
        service: Arc::new(service),
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/languages", get(languages))
        .route("/execute", post(execute))
        .route("/validate", post(validate))
        .route("/api/validate", post(validate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    info!("Starting code execution server on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn languages(State(state): State<AppState>) -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: state.service.languages(),
    })
}

async fn execute(
    State(state): State<AppState>,
    Json(payload): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ServerError> {
    let mut request = ExecutionRequest::new(payload.language.unwrap_or_default(), payload.code);
    request.stdin = payload.stdin;

    let result = state.service.execute(request).await?;
    Ok(Json(result.into()))
}

async fn validate(
    State(state): State<AppState>,
    Json(payload): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ServerError> {
    let validation = state
        .service
        .validate(&payload.language, &payload.code)
        .await?;
    Ok(Json(validation.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_app(root: &std::path::Path) -> Router {
        create_app(ExecutionConfig::default().with_workspace_root(root))
            .expect("Failed to create app")
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_languages() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/languages")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let catalog: LanguagesResponse = serde_json::from_slice(&body).unwrap();
        let names: Vec<&str> = catalog
            .languages
            .iter()
            .map(|l| l.descriptor.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["C", "Encoding/Decoding", "Go", "Java", "JavaScript", "Python", "Rust"]
        );

        let mut python: Value = serde_json::to_value(&catalog.languages[5]).unwrap();
        let version = python["version"].take();
        assert!(version.as_str().unwrap().starts_with('3'), "{}", version);
        assert_eq!(
            python,
            json!({
                "key": "python",
                "name": "Python",
                "version": null,
                "file_extension": ".py",
                "syntax_id": "python"
            })
        );
    }

    #[tokio::test]
    async fn test_execute_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post_json(
            test_app(dir.path()),
            "/execute",
            json!({ "language": "encoding", "code": "base64 encode\nhi" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"], "Base64 Encoded:\naGk=");
        assert_eq!(body["error"], Value::Null);
        assert_eq!(body["exit_code"], 0);
        assert_eq!(body["failure_kind"], "none");
        assert!(body["execution_time"].is_number());
    }

    #[tokio::test]
    async fn test_execute_python() {
        if which::which("python3").is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post_json(
            test_app(dir.path()),
            "/execute",
            json!({ "code": "print(\"Hello, World!\")" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let result: ExecuteResponse = serde_json::from_value(body).unwrap();
        assert_eq!(result.output.trim(), "Hello, World!");
        assert_eq!(result.error, None);
        assert_eq!(result.failure_kind, FailureKind::None);
    }

    #[tokio::test]
    async fn test_execute_rejects_bad_requests() {
        let dir = tempfile::tempdir().unwrap();

        let (status, body) = post_json(
            test_app(dir.path()),
            "/execute",
            json!({ "language": "cobol", "code": "DISPLAY 'HI'." }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Language \"cobol\" not supported");

        let (status, body) = post_json(
            test_app(dir.path()),
            "/execute",
            json!({ "language": "python", "code": "   " }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No code provided");
    }

    #[tokio::test]
    async fn test_execute_reports_failures_in_body() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post_json(
            test_app(dir.path()),
            "/execute",
            json!({ "language": "encode", "code": "json format\n{oops" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["failure_kind"], "internal_error");
        assert_eq!(body["exit_code"], -1);
        assert!(body["error"].as_str().unwrap().starts_with("JSON format error"));
    }

    #[tokio::test]
    async fn test_validate_routes() {
        let dir = tempfile::tempdir().unwrap();

        for uri in ["/validate", "/api/validate"] {
            let (status, body) = post_json(
                test_app(dir.path()),
                uri,
                json!({ "language": "encoding", "code": "hex decode\n6869" }),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "valid": true, "message": "Syntax is valid" }));
        }

        let (_, body) = post_json(
            test_app(dir.path()),
            "/validate",
            json!({ "language": "python", "code": "" }),
        )
        .await;
        assert_eq!(body, json!({ "valid": true, "message": "No code to validate" }));

        let (status, body) = post_json(
            test_app(dir.path()),
            "/api/validate",
            json!({ "code": "print(1)" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No language specified");

        let (_, body) = post_json(
            test_app(dir.path()),
            "/validate",
            json!({ "language": "encoding", "code": "rot13\nabc" }),
        )
        .await;
        assert_eq!(body["valid"], false);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid operation"));
    }
}
