#![cfg(feature = "cli")]

use std::io::Read;
use std::net::TcpListener;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("ephemeral port should be available")
}

fn malwire() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_malwire"));
    command.arg("--log-level").arg("error");
    command
}

#[test]
fn send_reaches_listen() {
    let addr = format!("127.0.0.1:{}", free_port());

    let mut child = malwire()
        .arg("--format")
        .arg("json")
        .arg("listen")
        .arg(format!("malspp://{addr}/42"))
        .arg("--count")
        .arg("1")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen command should start");

    let start = Instant::now();
    loop {
        let status = malwire()
            .arg("send")
            .arg(format!("malspp://{addr}/42"))
            .arg("--data")
            .arg("hello spacecraft")
            .status()
            .expect("send should run");
        if status.success() {
            break;
        }
        if start.elapsed() >= Duration::from_secs(5) {
            let _ = child.kill();
            panic!("send never connected");
        }
        thread::sleep(Duration::from_millis(25));
    }

    let status = child.wait().expect("listen should exit");
    assert!(status.success());
    let mut stdout = String::new();
    child
        .stdout
        .take()
        .expect("stdout should be piped")
        .read_to_string(&mut stdout)
        .expect("stdout should be readable");
    assert!(stdout.contains("\"payload\":\"hello spacecraft\""), "{stdout}");
    assert!(stdout.contains("\"apid\":\"42\""), "{stdout}");
}

#[test]
fn send_to_closed_port_fails() {
    let output = malwire()
        .arg("send")
        .arg(format!("127.0.0.1:{}", free_port()))
        .arg("--data")
        .arg("x")
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn send_rejects_bad_address() {
    let output = malwire()
        .arg("send")
        .arg("malcan://3")
        .arg("--data")
        .arg("x")
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn header_decodes_fields() {
    let output = malwire()
        .arg("--format")
        .arg("json")
        .arg("header")
        .arg("1923402a0009")
        .output()
        .expect("header should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"packet_type\":\"telecommand\""), "{stdout}");
    assert!(stdout.contains("\"apid\":291"), "{stdout}");
    assert!(stdout.contains("\"sequence_flags\":\"first\""), "{stdout}");
    assert!(stdout.contains("\"sequence_count\":42"), "{stdout}");
    assert!(stdout.contains("\"data_length\":10"), "{stdout}");
}

#[test]
fn header_rejects_short_input() {
    let output = malwire()
        .arg("header")
        .arg("1923")
        .output()
        .expect("header should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn fragment_lists_frames() {
    let output = malwire()
        .arg("--format")
        .arg("json")
        .arg("fragment")
        .arg("--data")
        .arg("0123456789abcdefghijklmnopqrstuvwxyz!")
        .output()
        .expect("fragment should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("\"frame_type\"").count(), 5, "{stdout}");
    assert!(stdout.contains("\"frame_type\":\"END\""), "{stdout}");
}

#[test]
fn version_prints_name() {
    let output = malwire()
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("malwire "));
}
