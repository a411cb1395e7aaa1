//! End-to-end tests running the publish-artifacts binary

use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tempfile::TempDir;

/// Settings file without retry delays so failures exhaust quickly
const NO_DELAY_SETTINGS: &str = r#"
concurrency = 3

[retry]
signed_url_backoff_secs = [0, 0, 0, 0]
content_backoff_secs = [0, 0, 0]
object_store_backoff_secs = [0, 0, 0]
"#;

struct Workspace {
    _dir: TempDir,
    artifacts: PathBuf,
    output_file: PathBuf,
    config_dir: PathBuf,
}

impl Workspace {
    fn new(files: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let artifacts = dir.path().join("artifacts");
        std::fs::create_dir_all(&artifacts).unwrap();
        for file in files {
            let path = artifacts.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, file.as_bytes()).unwrap();
        }

        let config_dir = dir.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), NO_DELAY_SETTINGS).unwrap();

        Self {
            output_file: dir.path().join("github_output"),
            artifacts,
            config_dir,
            _dir: dir,
        }
    }

    fn output(&self) -> Option<String> {
        std::fs::read_to_string(&self.output_file).ok()
    }
}

fn signed_url_command(ws: &Workspace, fileserver: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_publish-artifacts"));
    cmd.env_clear()
        .env("PUBLISH_ARTIFACTS_CONFIG_DIR", &ws.config_dir)
        .env("INPUT_PATH", &ws.artifacts)
        .env("INPUT_FILESERVER_URL", fileserver)
        .env("GITHUB_REPOSITORY", "acme/widget")
        .env("GITHUB_RUN_ID", "42")
        .env("GITHUB_RUN_ATTEMPT", "1")
        .env("GITHUB_OUTPUT", &ws.output_file)
        .env("ACTIONS_RUNTIME_TOKEN", "tok-123")
        .args(["--no-color", "signed-url"]);
    cmd
}

fn s3_command(ws: &Workspace, endpoint: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_publish-artifacts"));
    cmd.env_clear()
        .env("PUBLISH_ARTIFACTS_CONFIG_DIR", &ws.config_dir)
        .env("INPUT_PATH", &ws.artifacts)
        .env("INPUT_S3_BUCKET", "artifacts")
        .env("GITHUB_REPOSITORY", "acme/widget")
        .env("GITHUB_RUN_ID", "42")
        .env("GITHUB_RUN_ATTEMPT", "1")
        .env("GITHUB_OUTPUT", &ws.output_file)
        .env("AWS_ACCESS_KEY_ID", "test-access-key")
        .env("AWS_SECRET_ACCESS_KEY", "test-secret-key")
        .env("AWS_EC2_METADATA_DISABLED", "true")
        .env("AWS_REQUEST_CHECKSUM_CALCULATION", "when_required")
        .args([
            "--no-color",
            "s3",
            "--endpoint-url",
            endpoint,
            "--path-style",
            "--region",
            "us-east-1",
        ]);
    cmd
}

async fn run(mut cmd: Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

#[derive(Default)]
struct FileServer {
    stored: Mutex<Vec<String>>,
}

/// Signs every path and accepts path-style object PUTs; uploads of paths
/// containing "broken" fail
async fn start_file_server() -> (String, Arc<FileServer>) {
    async fn handle(
        State(state): State<Arc<FileServer>>,
        uri: Uri,
        headers: HeaderMap,
        _body: Bytes,
    ) -> Response {
        let path = uri.path().to_string();
        if let Some(rest) = path.strip_prefix("/sign/") {
            let host = headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let location = format!("http://{host}/store/{rest}");
            return (StatusCode::CREATED, [(header::LOCATION, location)]).into_response();
        }
        if let Some(rest) = path.strip_prefix("/store/") {
            if rest.contains("broken") {
                return (StatusCode::INTERNAL_SERVER_ERROR, "disk full").into_response();
            }
            state.stored.lock().unwrap().push(rest.to_string());
            return StatusCode::OK.into_response();
        }

        // Path-style PutObject: /bucket/key
        let key = path.trim_start_matches('/');
        if key.contains("broken") {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/xml")],
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                 <Error><Code>InternalError</Code><Message>disk full</Message></Error>",
            )
                .into_response();
        }
        state.stored.lock().unwrap().push(key.to_string());
        (StatusCode::OK, [(header::ETAG, "\"d41d8cd98f00b204e9800998ecf8427e\"")]).into_response()
    }

    let state = Arc::new(FileServer::default());
    let app = Router::new().fallback(handle).with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/sign"), state)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_publish_all_files() {
    let (fileserver, state) = start_file_server().await;
    let ws = Workspace::new(&["report.json", "logs/build.log", "logs/test.log"]);

    let output = run(signed_url_command(&ws, &fileserver)).await;

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.starts_with("= Found 3 files to publish to "));
    assert_eq!(out.lines().filter(|l| l.contains(" of 3 - ")).count(), 3);

    let mut stored = state.stored.lock().unwrap().clone();
    stored.sort();
    assert_eq!(
        stored,
        [
            "acme/widget/42-1/logs/build.log",
            "acme/widget/42-1/logs/test.log",
            "acme/widget/42-1/report.json",
        ]
    );

    assert_eq!(
        ws.output().unwrap(),
        format!("build_url={fileserver}/acme/widget/42-1/\n")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_upload_exits_one_without_output() {
    let (fileserver, state) = start_file_server().await;
    let ws = Workspace::new(&["ok.txt", "broken.bin"]);

    let output = run(signed_url_command(&ws, &fileserver)).await;

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("|-> ERROR: Unable to upload content HTTP_500 - disk full"));
    assert_eq!(state.stored.lock().unwrap().len(), 1);
    assert!(ws.output().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_json_summary() {
    let (fileserver, _state) = start_file_server().await;
    let ws = Workspace::new(&["a.txt", "b.txt"]);

    let mut cmd = signed_url_command(&ws, &fileserver);
    cmd.arg("--json");
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(0));
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["failed"], 0);
    assert_eq!(summary["succeeded"], true);
    assert_eq!(summary["destination"]["backend"], "signed_url");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_directory_succeeds() {
    let (fileserver, _state) = start_file_server().await;
    let ws = Workspace::new(&[]);

    let output = run(signed_url_command(&ws, &fileserver)).await;

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).starts_with("= Found 0 files"));
    assert!(stderr(&output).contains("No files found in"));
    assert!(ws.output().unwrap().starts_with("build_url="));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_s3_publish_under_run_prefix() {
    let (fileserver, state) = start_file_server().await;
    let endpoint = fileserver.trim_end_matches("/sign").to_string();
    let ws = Workspace::new(&["report.json", "logs/build.log"]);

    let output = run(s3_command(&ws, &endpoint)).await;

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("= Found 2 files to publish to s3://artifacts/acme/widget/42-1/"));

    let mut stored = state.stored.lock().unwrap().clone();
    stored.sort();
    assert_eq!(
        stored,
        [
            "artifacts/acme/widget/42-1/logs/build.log",
            "artifacts/acme/widget/42-1/report.json",
        ]
    );
    assert_eq!(
        ws.output().unwrap(),
        "s3_url=s3://artifacts/acme/widget/42-1/\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_s3_explicit_prefix_overrides_run_path() {
    let (fileserver, state) = start_file_server().await;
    let endpoint = fileserver.trim_end_matches("/sign").to_string();
    let ws = Workspace::new(&["a.txt"]);

    let mut cmd = s3_command(&ws, &endpoint);
    cmd.env("INPUT_S3_PREFIX", "nightly");
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(
        state.stored.lock().unwrap().as_slice(),
        ["artifacts/nightly/a.txt"]
    );
    assert_eq!(ws.output().unwrap(), "s3_url=s3://artifacts/nightly/\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_s3_failed_put_exits_one_without_output() {
    let (fileserver, state) = start_file_server().await;
    let endpoint = fileserver.trim_end_matches("/sign").to_string();
    let ws = Workspace::new(&["ok.txt", "broken.bin"]);

    let output = run(s3_command(&ws, &endpoint)).await;

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("|-> ERROR: Unable to upload content HTTP_500"));
    assert_eq!(
        state.stored.lock().unwrap().as_slice(),
        ["artifacts/acme/widget/42-1/ok.txt"]
    );
    assert!(ws.output().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_directory_is_usage_error() {
    let ws = Workspace::new(&[]);
    let mut cmd = signed_url_command(&ws, "http://127.0.0.1:9/sign");
    cmd.env("INPUT_PATH", ws.artifacts.join("missing"));

    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("does not exist"));
    assert!(ws.output().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_token_is_usage_error() {
    let ws = Workspace::new(&["a.txt"]);
    let mut cmd = signed_url_command(&ws, "http://127.0.0.1:9/sign");
    cmd.env_remove("ACTIONS_RUNTIME_TOKEN");

    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("ACTIONS_RUNTIME_TOKEN"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_settings_file_is_usage_error() {
    let ws = Workspace::new(&["a.txt"]);
    std::fs::write(ws.config_dir.join("config.toml"), "concurrency = 0\n").unwrap();

    let output = run(signed_url_command(&ws, "http://127.0.0.1:9/sign")).await;

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("concurrency"));
}

#[test]
fn test_completions() {
    let output = Command::new(env!("CARGO_BIN_EXE_publish-artifacts"))
        .args(["completions", "bash"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("publish-artifacts"));
}
