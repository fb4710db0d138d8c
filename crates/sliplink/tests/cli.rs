#![cfg(all(unix, feature = "cli"))]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/slipcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn sliplink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sliplink"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn run_with_stdin(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = sliplink()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("sliplink should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(stdin)
        .expect("stdin write should succeed");
    child.wait_with_output().expect("sliplink should exit")
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect()
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        if start.elapsed() >= timeout {
            panic!("socket {} never appeared", path.display());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn spawn_listener(sock_path: &Path, extra: &[&str]) -> Child {
    let child = sliplink()
        .arg("--format")
        .arg("json")
        .arg("listen")
        .arg(sock_path)
        .args(extra)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen command should start");
    wait_for_socket(sock_path, Duration::from_secs(3));
    child
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Output {
    let start = Instant::now();
    loop {
        if child.try_wait().expect("try_wait should work").is_some() {
            return child.wait_with_output().expect("output should be collected");
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let output = child.wait_with_output().expect("output should be collected");
            panic!(
                "process timed out; stderr: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn encode_writes_escaped_frame() {
    let output = run_with_stdin(&["encode"], &[0x01, 0xC0, 0xDB]);

    assert!(output.status.success());
    assert_eq!(output.stdout, vec![0xC0, 0x01, 0xDB, 0xDC, 0xDB, 0xDD, 0xC0]);
}

#[test]
fn encode_empty_input_is_bare_delimiters() {
    let output = run_with_stdin(&["encode", "--hex"], b"");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "c0c0");
}

#[test]
fn decode_prints_each_datagram_and_drops_unterminated_tail() {
    let output = run_with_stdin(
        &["--format", "json", "decode"],
        b"\xC0AB\xC0\xC0C\xDB\xDCD\xC0\xC0tail",
    );

    assert!(output.status.success());
    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["text"], "AB");
    assert_eq!(lines[0]["source"], "stdin");
    assert_eq!(lines[1]["hex"], "43c044");
    assert_eq!(lines[1]["size"], 3);
}

#[test]
fn decode_strict_drops_malformed_frame() {
    let output = run_with_stdin(
        &["--format", "json", "decode", "--strict"],
        b"\xC0bad\xDBx\xC0\xC0good\xC0",
    );

    assert!(output.status.success());
    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["text"], "good");
}

#[test]
fn decode_stops_after_count() {
    let output = run_with_stdin(
        &["--format", "raw", "decode", "--count", "1"],
        b"\xC0one\xC0\xC0two\xC0",
    );

    assert!(output.status.success());
    assert_eq!(output.stdout, b"one");
}

#[test]
fn send_reaches_listener() {
    let dir = unique_temp_dir("send");
    let sock_path = dir.join("link.sock");
    let listener = spawn_listener(&sock_path, &["--count", "1"]);

    let status = sliplink()
        .arg("send")
        .arg(&sock_path)
        .arg("--hex")
        .arg("45c0db00")
        .status()
        .expect("send command should run");
    assert!(status.success());

    let output = wait_with_timeout(listener, Duration::from_secs(5));
    assert!(output.status.success());
    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["hex"], "45c0db00");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_wait_gets_echo() {
    let dir = unique_temp_dir("echo");
    let sock_path = dir.join("echo.sock");
    let listener = spawn_listener(&sock_path, &["--count", "1", "--echo"]);

    let output = sliplink()
        .arg("--format")
        .arg("json")
        .arg("send")
        .arg(&sock_path)
        .arg("--data")
        .arg("ping")
        .arg("--wait")
        .arg("--wait-timeout")
        .arg("5s")
        .output()
        .expect("send command should run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let lines = json_lines(&output.stdout);
    assert_eq!(lines[0]["text"], "ping");

    let listener_output = wait_with_timeout(listener, Duration::from_secs(5));
    assert!(listener_output.status.success());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_to_missing_socket_is_transport_error() {
    let dir = unique_temp_dir("missing");
    let output = sliplink()
        .arg("send")
        .arg(dir.join("nobody.sock"))
        .arg("--data")
        .arg("x")
        .output()
        .expect("send command should run");

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn serve_forwards_stdin_lines_and_prints_replies() {
    let dir = unique_temp_dir("serve");
    let sock_path = dir.join("router.sock");
    let listener = spawn_listener(&sock_path, &["--count", "1", "--echo"]);

    let config_path = dir.join("links.json");
    std::fs::write(
        &config_path,
        format!(
            r#"{{ "neighbors": {{ "10.0.0.1": {{ "connect": "{}" }} }} }}"#,
            sock_path.display()
        ),
    )
    .expect("config should be writable");

    let mut serve = sliplink()
        .arg("--format")
        .arg("json")
        .arg("serve")
        .arg("--config")
        .arg(&config_path)
        .arg("--count")
        .arg("1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("serve command should start");
    {
        let mut stdin = serve.stdin.take().expect("stdin should be piped");
        stdin
            .write_all(b"9.9.9.9 lost\n10.0.0.1 hello router\n")
            .expect("stdin write should succeed");
    }

    let output = wait_with_timeout(serve, Duration::from_secs(5));
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["text"], "hello router");

    let listener_output = wait_with_timeout(listener, Duration::from_secs(5));
    assert!(listener_output.status.success());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn serve_rejects_invalid_config() {
    let dir = unique_temp_dir("badcfg");
    let config_path = dir.join("links.json");
    std::fs::write(&config_path, r#"{ "neighbors": {} }"#).expect("config should be writable");

    let output = sliplink()
        .arg("serve")
        .arg("--config")
        .arg(&config_path)
        .output()
        .expect("serve command should run");

    assert_eq!(output.status.code(), Some(78));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no neighbors configured"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let output = sliplink()
        .arg("version")
        .output()
        .expect("version command should run");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("sliplink {}", env!("CARGO_PKG_VERSION"))
    );
}
