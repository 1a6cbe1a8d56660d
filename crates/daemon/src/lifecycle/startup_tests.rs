// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use fs2::FileExt;
use tempfile::tempdir;

use super::super::{control_socket_path, lock_path};
use super::startup;
use crate::config::BridgeConfig;

fn test_config(dir: &std::path::Path) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.state_dir = dir.to_path_buf();
    config.endpoint_name = dir.join("debugger.sock").to_string_lossy().into_owned();
    config.session.snapshot_file = dir.join("session.json");
    config
}

#[tokio::test]
async fn startup_binds_control_socket_and_writes_version_file() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let result = startup(config.clone()).await.unwrap();

    assert!(control_socket_path(&config).exists());
    assert!(config.state_dir.join("daemon.version").exists());
    drop(result);
}

/// A second startup attempt while a lock is held must fail without
/// deleting the files belonging to the running instance.
#[tokio::test]
async fn startup_lock_failed_does_not_remove_existing_files() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.state_dir).unwrap();

    let socket_path = control_socket_path(&config);
    let version_path = config.state_dir.join("daemon.version");
    std::fs::write(&socket_path, b"").unwrap();
    std::fs::write(&version_path, b"0.1.0+deadbeef").unwrap();

    let held_lock = std::fs::OpenOptions::new().write(true).create(true).open(lock_path(&config)).unwrap();
    held_lock.try_lock_exclusive().unwrap();

    let err = startup(config).await.unwrap_err();
    assert!(matches!(err, crate::lifecycle::LifecycleError::LockFailed(_)));

    assert!(socket_path.exists(), "existing socket must survive a failed second startup");
    assert!(version_path.exists(), "existing version file must survive a failed second startup");
}
