#![cfg(all(unix, feature = "cli"))]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

const EXIT_TRANSPORT_ERROR: i32 = 3;
const EXIT_DISCONNECTED: i32 = 4;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/sensorlink-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn sensorlink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sensorlink"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn spawn_listen(path: &Path, extra: &[&str]) -> Child {
    let child = sensorlink()
        .arg("--format")
        .arg("json")
        .arg("listen")
        .arg(path)
        .args(extra)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen command should start");

    let start = Instant::now();
    while !path.exists() {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "listener socket did not appear"
        );
        thread::sleep(Duration::from_millis(25));
    }
    child
}

fn send(path: &Path, args: &[&str]) -> ExitStatus {
    sensorlink()
        .arg("send")
        .arg(path)
        .args(args)
        .status()
        .expect("send command should run")
}

struct Finished {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

fn wait_finished(mut child: Child) -> Finished {
    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().expect("child status should be readable") {
            break status;
        }
        if start.elapsed() > Duration::from_secs(10) {
            let _ = child.kill();
            panic!("listen command did not exit");
        }
        thread::sleep(Duration::from_millis(25));
    };

    let mut stdout = String::new();
    let mut stderr = String::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_string(&mut stdout).expect("stdout should be readable");
    }
    if let Some(mut err) = child.stderr.take() {
        err.read_to_string(&mut stderr).expect("stderr should be readable");
    }
    Finished {
        status,
        stdout,
        stderr,
    }
}

fn records(stdout: &str) -> Vec<Value> {
    stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be a JSON record"))
        .collect()
}

#[test]
fn listen_prints_images_in_order() {
    let dir = unique_temp_dir("images");
    let sock = dir.join("device.sock");
    let listen = spawn_listen(&sock, &["--count", "3"]);

    let sent = send(&sock, &["--kind", "img", "--count", "3", "--seq-start", "10"]);
    assert!(sent.success());

    let done = wait_finished(listen);
    assert!(done.status.success(), "stderr: {}", done.stderr);

    let records = records(&done.stdout);
    assert_eq!(records.len(), 3);
    for (record, seq) in records.iter().zip(10..) {
        assert_eq!(record["kind"], "ImgFrame");
        assert_eq!(record["seq"], seq);
        assert_eq!(record["size"], 64 * 48 * 3 / 2);
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn listen_prints_group_members() {
    let dir = unique_temp_dir("group");
    let sock = dir.join("device.sock");
    let listen = spawn_listen(&sock, &["--count", "1"]);

    assert!(send(&sock, &["--kind", "group", "--seq-start", "5"]).success());

    let done = wait_finished(listen);
    assert!(done.status.success(), "stderr: {}", done.stderr);

    let records = records(&done.stdout);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["kind"], "MessageGroup");
    let members = records[0]["members"]
        .as_array()
        .expect("group record should list members");
    let slots: Vec<&str> = members
        .iter()
        .map(|m| m["slot"].as_str().expect("slot should be a string"))
        .collect();
    assert_eq!(slots, ["rgb", "imu"]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn malformed_frame_is_dropped_and_link_recovers() {
    let dir = unique_temp_dir("recover");
    let sock = dir.join("device.sock");
    let listen = spawn_listen(&sock, &["--count", "1"]);

    assert!(send(&sock, &["--kind", "malformed"]).success());
    assert!(send(&sock, &["--kind", "buffer", "--seq-start", "7"]).success());

    let done = wait_finished(listen);
    assert!(done.status.success(), "stderr: {}", done.stderr);

    let records = records(&done.stdout);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["kind"], "Buffer");
    assert_eq!(records[0]["seq"], 7);
    assert!(
        done.stderr.contains("parse_errors=1"),
        "stderr: {}",
        done.stderr
    );
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn no_reconnect_exits_disconnected_after_link_loss() {
    let dir = unique_temp_dir("no-reconnect");
    let sock = dir.join("device.sock");
    let listen = spawn_listen(&sock, &["--no-reconnect"]);

    assert!(send(&sock, &["--kind", "buffer", "--count", "2"]).success());

    let done = wait_finished(listen);
    assert_eq!(done.status.code(), Some(EXIT_DISCONNECTED));
    assert_eq!(records(&done.stdout).len(), 2);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_without_listener_is_a_transport_error() {
    let dir = unique_temp_dir("missing");
    let status = send(&dir.join("absent.sock"), &["--kind", "buffer"]);
    assert_eq!(status.code(), Some(EXIT_TRANSPORT_ERROR));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_reports_package_version() {
    let output = sensorlink()
        .arg("version")
        .output()
        .expect("version command should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("sensorlink {}", env!("CARGO_PKG_VERSION"))
    );
}
