//! Drives the `tron1-ability` binary over its remote CLI.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

struct Host(Child);

impl Drop for Host {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> u16 {
    TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn connect(port: u16) -> TcpStream {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        match TcpStream::connect((Ipv4Addr::LOCALHOST, port)) {
            Ok(s) => return s,
            Err(_) if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => panic!("remote CLI never came up: {}", e),
        }
    }
}

fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !String::from_utf8_lossy(&buf).contains(needle) {
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "closed before {:?}: {}", needle, String::from_utf8_lossy(&buf));
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf).to_string()
}

#[test]
fn test_remote_cli_session() {
    let dir = tempfile::tempdir().unwrap();
    let port = free_port();
    let config = dir.path().join("abilities.yaml");
    std::fs::write(
        &config,
        format!(
            r#"
robot_ip: 127.0.0.1
robot_type: PointFoot
remote_cli_port: {port}
libraries:
  - library: demo
    abilities:
      - name: walker
        type: dummy/ability1
        autostart: true
        config:
          update_rate: 20.0
      - name: idle
        type: dummy/ability1
"#
        ),
    )
    .unwrap();

    let _host = Host(
        Command::new(env!("CARGO_BIN_EXE_tron1-ability"))
            .arg(&config)
            .current_dir(dir.path())
            .env_remove("ROBOT_IP")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap(),
    );

    let mut stream = connect(port);
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let greeting = read_until(&mut stream, "tron1> ");
    assert!(greeting.contains("Type 'help' for available commands."));

    stream.write_all(b"list\n").unwrap();
    let listing = read_until(&mut stream, "tron1> ");
    assert!(listing.contains("* idle [state: stopped, type: dummy/ability1]"), "{}", listing);
    assert!(listing.contains("* walker [state: running, type: dummy/ability1]"), "{}", listing);

    stream.write_all(b"switch \"walker\" \"idle\"\n").unwrap();
    let switched = read_until(&mut stream, "tron1> ");
    assert!(switched.contains("Stopped: walker\nStarted: idle\n"), "{}", switched);

    stream.write_all(b"exit\n").unwrap();
    assert!(read_until(&mut stream, "Goodbye!").contains("Goodbye!"));
}

#[test]
fn test_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_tron1-ability"))
        .arg(dir.path().join("none.yaml"))
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("none.yaml"));
}
