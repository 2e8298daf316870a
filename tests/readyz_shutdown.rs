#![cfg(unix)]

use assert_cmd::prelude::*;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use reqwest::blocking::Client;
use std::io::{BufRead, BufReader, Read};
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::tempdir;
use wait_timeout::ChildExt;

const UPLOAD: &str = r#"[{
    "name": "up",
    "type": "gauge",
    "metrics": [{"labels": [{"name": "job", "value": "api"}], "gauge": 1, "timestamp_ms": 1562500000000}]
}]"#;

fn wait_for_status(client: &Client, url: &str, want: u16, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Ok(resp) = client.get(url).send() {
            if resp.status().as_u16() == want {
                return true;
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

fn wait_for_metric(client: &Client, url: &str, needle: &str, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Ok(body) = client.get(url).send().and_then(|r| r.text()) {
            if body.contains(needle) {
                return true;
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

fn read_listen_addr<R: Read>(reader: &mut BufReader<R>) -> String {
    let mut line = String::new();
    let start = Instant::now();
    loop {
        line.clear();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            if start.elapsed() > Duration::from_secs(5) {
                panic!("timed out waiting for 'listening on …'");
            }
            std::thread::sleep(Duration::from_millis(20));
            continue;
        }
        if let Some(rest) = line.trim().strip_prefix("listening on ") {
            return rest.to_string();
        }
        if start.elapsed() > Duration::from_secs(5) {
            panic!("did not see 'listening on …'; last line: {line}");
        }
    }
}

fn spawn_forwarder(dir: &std::path::Path) -> Child {
    let mut cmd = Command::cargo_bin("forwarder").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("FORWARDER__HTTP__BIND")
        .env_remove("FORWARDER__FORWARD__URL")
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());
    cmd.spawn().expect("failed to spawn forwarder")
}

#[test]
fn serves_uploads_then_drains_on_sigterm() {
    let dir = tempdir().unwrap();
    // Nothing listens on the discard port, so every forward attempt fails.
    std::fs::write(
        dir.path().join("forwarder.toml"),
        r#"[http]
bind = "127.0.0.1:0"
shutdown_drain_ms = 1500

[forward]
url = "http://127.0.0.1:9/api/v1/receive"
"#,
    )
    .unwrap();

    let mut child = spawn_forwarder(dir.path());
    let stdout = child.stdout.take().expect("no stdout captured");
    let addr = read_listen_addr(&mut BufReader::new(stdout));

    let client = Client::new();
    let readyz = format!("http://{addr}/readyz");
    assert!(
        wait_for_status(&client, &readyz, 200, Duration::from_secs(5)),
        "readyz never became 200 OK"
    );

    // The authoritative write succeeds even though forwarding cannot.
    let resp = client
        .post(format!("http://{addr}/upload/cluster-a"))
        .header("content-type", "application/json")
        .body(UPLOAD)
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert!(
        wait_for_metric(
            &client,
            &format!("http://{addr}/metrics"),
            "telemeter_forward_request_errors_total 1",
            Duration::from_secs(10),
        ),
        "forwarding error was never counted"
    );

    let pid = child.id();
    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).expect("failed to send SIGTERM");

    assert!(
        wait_for_status(&client, &readyz, 503, Duration::from_secs(5)),
        "readyz did not flip to 503 after SIGTERM"
    );

    match child
        .wait_timeout(Duration::from_secs(5))
        .expect("wait_timeout failed")
    {
        Some(status) => assert!(
            status.success() || status.signal().is_some(),
            "unexpected exit status: {status:?}"
        ),
        None => {
            let _ = child.kill();
            panic!("process did not exit within timeout after SIGTERM");
        }
    }
}
