use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

use phono_core::testing::fixtures;

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a minimal valid config
fn minimal_config(port: u16) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[limits]
wav = 10485760
"#,
        port
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &Path, temp_base: &Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_phono"))
        .arg("serve")
        .arg("--tempdir")
        .arg(temp_base)
        .env("PHONO_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_health_endpoint() {
    let port = get_available_port();
    let config = write_config(&minimal_config(port));
    let temp_base = TempDir::new().unwrap();

    let mut server = spawn_server(config.path(), temp_base.path()).await;

    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "ok");

    // Cleanup
    server.kill().await.ok();
}

#[tokio::test]
async fn test_config_endpoint_returns_sanitized() {
    let port = get_available_port();
    let config = write_config(&minimal_config(port));
    let temp_base = TempDir::new().unwrap();

    let mut server = spawn_server(config.path(), temp_base.path()).await;

    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let text = response.text().await.expect("Failed to read body");
    let json: serde_json::Value = serde_json::from_str(&text).expect("Failed to parse JSON");
    assert_eq!(json["server"]["port"], port);
    assert_eq!(json["limits"]["wav"], 10485760);
    assert_eq!(json["converter"]["temp_dir_configured"], true);
    assert!(!text.contains(&*temp_base.path().to_string_lossy()));

    // Cleanup
    server.kill().await.ok();
}

#[tokio::test]
async fn test_convert_over_http() {
    let port = get_available_port();
    let config = write_config(&minimal_config(port));
    let temp_base = TempDir::new().unwrap();

    let mut server = spawn_server(config.path(), temp_base.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let samples = fixtures::sine_samples(22_050, 1, 2_205);
    let wav = fixtures::wav_bytes(22_050, 1, 16, &samples);
    let part = reqwest::multipart::Part::bytes(wav)
        .file_name("beep.wav")
        .mime_str("audio/wav")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .part("input-file", part)
        .text("format", "mp3")
        .text("bitRateMode", "ABR")
        .text("bitRate", "96")
        .text("channelMode", "0");

    let response = Client::new()
        .post(format!("http://127.0.0.1:{}/api/v1/convert/beep.wav", port))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_DISPOSITION],
        "attachment; filename=\"beep.mp3\""
    );
    let body = response.bytes().await.unwrap();
    assert!(!body.is_empty());

    server.kill().await.ok();
}

#[tokio::test]
async fn test_invalid_config_exits_with_error() {
    let config = write_config("[server]\nport = 0\n");

    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_phono"))
            .arg("serve")
            .env("PHONO_CONFIG", config.path())
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_encode_rejects_invalid_params_before_touching_files() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("clip.wav");
    fixtures::write_wav_file(&source, 1_000);

    let result = timeout(
        Duration::from_secs(10),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_phono"))
            .args(["encode", "wav", "--bitdepth", "11"])
            .arg(dir.path())
            .env("PHONO_CONFIG", "/nonexistent/phono.toml")
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert_eq!(result.status.code(), Some(1));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_encode_walks_directories() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("album");
    std::fs::create_dir(&nested).unwrap();
    fixtures::write_wav_file(&dir.path().join("intro.wav"), 2_000);
    fixtures::write_wav_file(&nested.join("track.wav"), 2_000);
    std::fs::write(nested.join("notes.txt"), b"liner notes").unwrap();

    let result = timeout(
        Duration::from_secs(30),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_phono"))
            .args(["encode", "mp3", "--bitratemode", "cbr", "--bitrate", "128"])
            .arg(dir.path())
            .env("PHONO_CONFIG", "/nonexistent/phono.toml")
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(result.status.success());
    assert!(dir.path().join("intro.mp3").is_file());
    assert!(nested.join("track.mp3").is_file());
    assert!(!nested.join("notes.mp3").exists());
}

#[tokio::test]
async fn test_encode_does_not_overwrite() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("loop.wav");
    fixtures::write_wav_file(&source, 1_000);

    let result = timeout(
        Duration::from_secs(30),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_phono"))
            .args(["encode", "wav", "--bitdepth", "16"])
            .arg(&source)
            .env("PHONO_CONFIG", "/nonexistent/phono.toml")
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(result.status.success());
    assert!(dir.path().join("loop_1.wav").is_file());
}

#[cfg(unix)]
#[tokio::test]
async fn test_encode_interrupt_leaves_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    // long enough that the signal lands mid-encode
    fixtures::write_wav_file(&dir.path().join("long.wav"), 44_100 * 120);

    let mut child = tokio::process::Command::new(env!("CARGO_BIN_EXE_phono"))
        .args(["encode", "mp3"])
        .arg(dir.path())
        .env("PHONO_CONFIG", "/nonexistent/phono.toml")
        .env("TMPDIR", tmp.path())
        .env("RUST_LOG", "error")
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn encoder");

    sleep(Duration::from_millis(1_500)).await;
    let pid = child.id().expect("encoder exited before the signal");
    std::process::Command::new("kill")
        .args(["-INT", &pid.to_string()])
        .status()
        .expect("Failed to send SIGINT");

    let status = timeout(Duration::from_secs(60), child.wait())
        .await
        .expect("Encoder did not stop after SIGINT")
        .expect("Failed to wait for encoder");

    // exited through its own shutdown path rather than the default signal action
    assert!(status.code().is_some(), "killed by signal: {:?}", status);
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    if status.success() {
        assert!(dir.path().join("long.mp3").is_file());
    } else {
        assert_eq!(status.code(), Some(1));
        assert!(!dir.path().join("long.mp3").exists());
    }
}
