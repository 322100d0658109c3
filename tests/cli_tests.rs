/// Process-level tests for the chronos-redirect binary
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[cfg(unix)]
#[test]
fn test_interrupt_while_reading_stdin_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_chronos-redirect"))
        .arg("--silent")
        .current_dir(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("binary should start");

    // stdin stays open, so the process is still waiting for targets
    let _stdin = child.stdin.take();
    thread::sleep(Duration::from_millis(1000));

    let sent = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("kill should run");
    assert!(sent.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("process did not exit after interrupt");
        }
        thread::sleep(Duration::from_millis(50));
    };

    assert_eq!(status.code(), Some(0));
}
