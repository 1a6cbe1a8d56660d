// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level process integration tests. Every crate already carries
//! scripted-transport unit tests for its core scenarios (simple success,
//! retry-then-success, validation rejection, context save/restore, cache
//! TTL round-trip, pool admission under contention — see
//! `crates/engine/src/executor_tests.rs`, `crates/cache/src/unified_cache_tests.rs`,
//! `crates/transport/src/pool_tests.rs`). This suite instead drives the
//! real `windbgmcpd` and `wmb` binaries as separate OS processes talking
//! over real Unix sockets, exercising daemon startup/shutdown and the CLI
//! rather than re-testing internals already covered above.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_cmd::cargo::cargo_bin;
use tempfile::TempDir;

const WAIT_MAX_MS: u64 = 5_000;

fn wait_for(max_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Stand-in for the debugger extension (§1's "remote endpoint of the
/// pipe"), the out-of-scope collaborator on the other end of
/// `wmb_transport::UnixSocketTransport`. Echoes a canned success response
/// for every `execute_command` request and counts how many it served, so
/// tests can assert things like "the validator rejected this before any
/// transport call was made."
struct MockExtension {
    calls: Arc<AtomicUsize>,
}

impl MockExtension {
    fn start(path: &Path) -> Self {
        let listener = UnixListener::bind(path).expect("bind mock debugger extension socket");
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_bg = Arc::clone(&calls);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let calls = Arc::clone(&calls_bg);
                std::thread::spawn(move || Self::serve(stream, calls));
            }
        });
        Self { calls }
    }

    fn serve(stream: UnixStream, calls: Arc<AtomicUsize>) {
        let mut reader = BufReader::new(stream.try_clone().expect("clone mock extension stream"));
        let mut writer = stream;
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
            calls.fetch_add(1, Ordering::SeqCst);
            let request: serde_json::Value = match serde_json::from_str(line.trim_end()) {
                Ok(v) => v,
                Err(_) => return,
            };
            let response = Self::respond(&request);
            let body = serde_json::to_string(&response).unwrap_or_default();
            if writeln!(writer, "{body}").is_err() {
                return;
            }
        }
    }

    fn respond(request: &serde_json::Value) -> serde_json::Value {
        let handler = request.get("command").and_then(|v| v.as_str()).unwrap_or("");
        if handler == "execute_command" {
            let inner = request.get("args").and_then(|a| a.get("command")).and_then(|c| c.as_str()).unwrap_or("");
            serde_json::json!({ "status": "success", "output": format!("mock-output:{inner}") })
        } else {
            serde_json::json!({ "status": "success", "output": "ok" })
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Owns a temp state directory, a running mock debugger extension, and
/// (optionally) a spawned `windbgmcpd` child — everything one spec needs,
/// torn down together on drop.
struct Harness {
    state_dir: TempDir,
    extension: MockExtension,
    daemon: Option<Child>,
}

impl Harness {
    fn new() -> Self {
        let state_dir = TempDir::new().expect("create temp state dir");
        let extension_path = state_dir.path().join("mock_extension.sock");
        let extension = MockExtension::start(&extension_path);

        let config_path = state_dir.path().join("config.toml");
        std::fs::write(&config_path, format!("endpoint_name = {:?}\n", extension_path.to_string_lossy()))
            .expect("write mock config");

        Self { state_dir, extension, daemon: None }
    }

    fn state_path(&self) -> PathBuf {
        self.state_dir.path().to_path_buf()
    }

    fn config_path(&self) -> PathBuf {
        self.state_path().join("config.toml")
    }

    fn wmb(&self) -> Command {
        let mut cmd = Command::new(cargo_bin("wmb"));
        cmd.env("WMB_STATE_DIR", self.state_path());
        cmd.env("WMB_CONFIG_FILE", self.config_path());
        cmd
    }

    fn start_daemon(&mut self) {
        let mut cmd = Command::new(cargo_bin("windbgmcpd"));
        cmd.env("WMB_STATE_DIR", self.state_path());
        cmd.env("WMB_CONFIG_FILE", self.config_path());
        cmd.env("RUST_LOG", "warn");
        let child = cmd.spawn().expect("spawn windbgmcpd");
        self.daemon = Some(child);

        let socket = self.state_path().join("control.sock");
        assert!(wait_for(WAIT_MAX_MS, || socket.exists()), "control socket should appear after startup");
    }

    fn stop_daemon(&mut self) {
        if let Some(mut child) = self.daemon.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.stop_daemon();
    }
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn daemon_status_reports_not_running_before_start() {
    let harness = Harness::new();
    let output = harness.wmb().args(["daemon", "status"]).output().expect("run wmb daemon status");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("not running"));
}

#[test]
fn daemon_start_creates_socket_pid_and_version_files() {
    let mut harness = Harness::new();
    harness.start_daemon();

    assert!(harness.state_path().join("control.sock").exists());
    assert!(harness.state_path().join("daemon.pid").exists());
    assert!(harness.state_path().join("daemon.version").exists());
}

#[test]
fn daemon_status_shows_running_after_start() {
    let mut harness = Harness::new();
    harness.start_daemon();

    let output = harness.wmb().args(["daemon", "status"]).output().expect("run wmb daemon status");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("running"));
}

#[test]
fn daemon_version_matches_cli_build() {
    let mut harness = Harness::new();
    harness.start_daemon();

    let output = harness.wmb().args(["daemon", "version"]).output().expect("run wmb daemon version");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn daemon_stop_over_control_socket_shuts_it_down() {
    let mut harness = Harness::new();
    harness.start_daemon();

    let stop = harness.wmb().args(["daemon", "stop"]).output().expect("run wmb daemon stop");
    assert!(stop.status.success());
    assert!(stdout_of(&stop).contains("stopped"));

    if let Some(child) = harness.daemon.as_mut() {
        let exited = wait_for(WAIT_MAX_MS, || matches!(child.try_wait(), Ok(Some(_))));
        assert!(exited, "daemon process should exit after a control-socket shutdown request");
    }
    harness.daemon = None;

    let status = harness.wmb().args(["daemon", "status"]).output().expect("run wmb daemon status");
    assert!(stdout_of(&status).contains("not running"));
}

/// §8 scenario 1 ("simple success"), driven end-to-end through real
/// processes: `wmb daemon exec` round-trips through the control socket,
/// the unified executor, the connection pool, and the mock debugger
/// extension, and back.
#[test]
fn execute_command_round_trips_through_the_real_pipeline() {
    let mut harness = Harness::new();
    harness.start_daemon();

    let output = harness.wmb().args(["daemon", "exec", "version"]).output().expect("run wmb daemon exec");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("mock-output:version"));
    assert!(harness.extension.call_count() >= 1);
}

/// §4.4 rule 3 / §8 "validation rejection": a dangerous command must never
/// reach the transport layer at all.
#[test]
fn dangerous_command_is_rejected_before_reaching_the_transport() {
    let mut harness = Harness::new();
    harness.start_daemon();

    let before = harness.extension.call_count();
    let output = harness.wmb().args(["daemon", "exec", ".kill"]).output().expect("run wmb daemon exec .kill");
    assert!(!output.status.success(), "rejected commands should exit non-zero");
    assert_eq!(harness.extension.call_count(), before, "validator must reject before any transport call");
}

#[test]
fn wmb_test_flag_fails_cleanly_without_a_running_daemon() {
    let harness = Harness::new();
    let output = harness.wmb().arg("--test").output().expect("run wmb --test");
    assert!(!output.status.success());
}

#[test]
fn wmb_test_flag_succeeds_against_a_running_daemon() {
    let mut harness = Harness::new();
    harness.start_daemon();

    let output = harness.wmb().arg("--test").output().expect("run wmb --test");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn install_then_uninstall_round_trips_the_tool_manifest() {
    let harness = Harness::new();
    let manifest_path = harness.state_path().join("mcp_tool.json");

    let install = harness.wmb().arg("--install").output().expect("run wmb --install");
    assert!(install.status.success());
    assert!(manifest_path.exists());

    let uninstall = harness.wmb().arg("--uninstall").output().expect("run wmb --uninstall");
    assert!(uninstall.status.success());
    assert!(!manifest_path.exists());
}

#[test]
fn install_dry_run_never_writes_the_manifest() {
    let harness = Harness::new();
    let manifest_path = harness.state_path().join("mcp_tool.json");

    let output = harness.wmb().args(["--install", "--dry-run"]).output().expect("run wmb --install --dry-run");
    assert!(output.status.success());
    assert!(!manifest_path.exists());
}

#[test]
fn install_refuses_to_overwrite_without_force() {
    let harness = Harness::new();
    let manifest_path = harness.state_path().join("mcp_tool.json");

    harness.wmb().arg("--install").output().expect("first install");
    std::fs::write(&manifest_path, "corrupted").unwrap();

    harness.wmb().arg("--install").output().expect("second install without --force");
    assert_eq!(std::fs::read_to_string(&manifest_path).unwrap(), "corrupted");

    harness.wmb().args(["--install", "--force"]).output().expect("install with --force");
    assert_ne!(std::fs::read_to_string(&manifest_path).unwrap(), "corrupted");
}
