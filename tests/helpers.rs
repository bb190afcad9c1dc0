use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::net::TcpListener;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::sync::Notify;

pub type Lines<T> = Arc<Mutex<tokio::io::Lines<BufReader<T>>>>;

/// Returns a port that is free at the time of the call.
#[allow(dead_code)] // Not dead code, used in tests.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("A local port should be available.")
        .local_addr()
        .expect("The listener should have an address.")
        .port()
}

#[allow(dead_code)] // Not dead code, used in tests.
pub async fn start_server(
    env_vars: &[(&str, &str)],
) -> (tokio::process::Child, Lines<tokio::process::ChildStderr>) {
    // Run `cargo run -- server start` as a child process.
    let mut server = Command::new("cargo")
        .args(["run", "--", "server", "start"])
        .env("RUST_LOG", "info")
        .envs(env_vars.to_owned())
        .stderr(Stdio::piped())
        .spawn()
        .expect("The command to start the server should spawn a child process.");

    // Capture the server's log output on stderr.
    let stderr = server
        .stderr
        .take()
        .expect("Stderr output should be captured.");
    let lines = Arc::new(Mutex::new(BufReader::new(stderr).lines()));

    // Wait for the server to start by checking for the log message "Server started." in an
    // asynchronous task.
    let notify = Arc::new(Notify::new());
    let notify_clone = notify.clone();
    let lines_clone = Arc::clone(&lines);
    tokio::spawn(async move {
        while let Ok(Some(line)) = lines_clone.lock().await.next_line().await {
            if line.contains("Server started.") {
                notify_clone.notify_one();
                break;
            }
        }
    });
    notify.notified().await;

    (server, lines)
}

#[allow(dead_code)] // Not dead code, used in tests.
pub async fn stop_server(server: &mut tokio::process::Child) {
    let pid = Pid::from_raw(
        server
            .id()
            .expect("The server process should be running and have a process ID.") as i32,
    );
    kill(pid, Signal::SIGINT).expect("The SIGINT signal should be sent.");

    // Wait for the server to shut down.
    let status = server
        .wait()
        .await
        .expect("The server process should exit.");
    assert!(status.success(), "Server did not shut down gracefully");
}

/// Runs `cargo run -- <args>` and captures its output.
#[allow(dead_code)] // Not dead code, used in tests.
pub async fn execute_command(
    args: &[&str],
    env_vars: &[(&str, &str)],
) -> (
    tokio::process::Child,
    Lines<tokio::process::ChildStdout>,
    Lines<tokio::process::ChildStderr>,
) {
    let mut command = Command::new("cargo")
        .arg("run")
        .arg("--")
        .args(args)
        .envs(env_vars.to_owned())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("The command should spawn a child process.");

    let stdout = command
        .stdout
        .take()
        .expect("Stdout output should be captured.");
    let stdout_lines = Arc::new(Mutex::new(BufReader::new(stdout).lines()));

    let stderr = command
        .stderr
        .take()
        .expect("Stderr output should be captured.");
    let stderr_lines = Arc::new(Mutex::new(BufReader::new(stderr).lines()));

    (command, stdout_lines, stderr_lines)
}

#[allow(dead_code)] // Not dead code, used in tests.
pub async fn assert_exit_code(mut command: tokio::process::Child, expected: i32) {
    let status = command.wait().await.expect("The command should exit.");
    assert_eq!(
        Some(expected),
        status.code(),
        "The command should exit with code {}.",
        expected
    );
}

#[allow(dead_code)] // Not dead code, used in tests.
pub async fn check_log_output_regex<T>(lines: Lines<T>, regex_expected_lines: Vec<&str>)
where
    T: tokio::io::AsyncRead + Unpin,
{
    let mut captured_lines = Vec::new();
    while let Ok(Some(line)) = lines.lock().await.next_line().await {
        captured_lines.push(line);
    }

    for expected_line in regex_expected_lines {
        let re = regex::Regex::new(expected_line).expect("Failed to compile regex");
        let found = captured_lines.iter().any(|line| re.is_match(line.as_ref()));
        assert!(found, "The output contains the line '{}'.", expected_line);
    }
}

#[allow(dead_code)] // Not dead code, used in tests.
pub async fn check_log_output<T>(lines: Lines<T>, expected_lines: Vec<&str>)
where
    T: tokio::io::AsyncRead + Unpin,
{
    let mut captured_lines = Vec::new();
    while let Ok(Some(line)) = lines.lock().await.next_line().await {
        captured_lines.push(line);
    }

    for expected_line in expected_lines {
        let found = captured_lines.iter().any(|line| line == expected_line);
        assert!(found, "The output contains the line '{}'.", expected_line);
    }
}
