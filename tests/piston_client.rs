// tests/piston_client.rs

use std::time::Duration;

use axum::{Json, Router, http::StatusCode, routing::{get, post}};
use placement_api::sandbox::{
    ExecuteRequest, ExecuteResponse, PistonClient, Runtime, Sandbox, SandboxError, SourceFile,
    StageResult,
};
use url::Url;

/// Spawns a throwaway Piston stand-in under `/api/v2/piston` and returns its base URL.
async fn spawn_fake_piston(router: Router) -> Url {
    let app = Router::new().nest("/api/v2/piston", router);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Url::parse(&format!("http://127.0.0.1:{}/api/v2/piston", port)).unwrap()
}

fn request() -> ExecuteRequest {
    ExecuteRequest {
        language: "python".into(),
        version: "3.10.0".into(),
        files: vec![SourceFile {
            name: "main.py".into(),
            content: "print(input())".into(),
        }],
        stdin: "echo me".into(),
        args: Vec::new(),
        compile_timeout: 10000,
        run_timeout: 2000,
        compile_memory_limit: -1,
        run_memory_limit: 268435456,
    }
}

fn client(base: Url) -> PistonClient {
    PistonClient::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn execute_posts_the_wire_request() {
    // Arrange
    let base = spawn_fake_piston(Router::new().route(
        "/execute",
        post(|Json(req): Json<ExecuteRequest>| async move {
            Json(ExecuteResponse {
                language: req.language,
                version: req.version,
                run: StageResult {
                    stdout: format!("{}\n", req.stdin),
                    stderr: String::new(),
                    code: Some(0),
                    signal: None,
                },
                compile: None,
            })
        }),
    ))
    .await;

    // Act
    let response = client(base).execute(&request()).await.unwrap();

    // Assert
    assert_eq!(response.run.stdout, "echo me\n");
    assert_eq!(response.run.code, Some(0));
    assert!(response.compile.is_none());
}

#[tokio::test]
async fn runtimes_are_listed() {
    // Arrange
    let base = spawn_fake_piston(Router::new().route(
        "/runtimes",
        get(|| async {
            Json(vec![Runtime {
                language: "python".into(),
                version: "3.10.0".into(),
                aliases: vec!["py".into()],
            }])
        }),
    ))
    .await;

    // Act
    let runtimes = client(base).runtimes().await.unwrap();

    // Assert
    assert_eq!(runtimes.len(), 1);
    assert_eq!(runtimes[0].aliases, ["py"]);
}

#[tokio::test]
async fn error_status_is_rejected() {
    // Arrange
    let base = spawn_fake_piston(Router::new().route(
        "/execute",
        post(|| async { (StatusCode::BAD_REQUEST, "runtime is unknown") }),
    ))
    .await;

    // Act
    let err = client(base).execute(&request()).await.unwrap_err();

    // Assert
    match err {
        SandboxError::Rejected { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "runtime is unknown");
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn garbage_body_is_malformed() {
    // Arrange
    let base = spawn_fake_piston(
        Router::new().route("/execute", post(|| async { "not json at all" })),
    )
    .await;

    // Act
    let err = client(base).execute(&request()).await.unwrap_err();

    // Assert
    assert!(matches!(err, SandboxError::Malformed(_)));
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    // Arrange: grab a free port, then release it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let base = Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap();

    // Act
    let err = client(base).runtimes().await.unwrap_err();

    // Assert
    assert!(matches!(err, SandboxError::Unreachable(_)));
}
