// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::tempdir;

fn with_state_dir<T>(f: impl FnOnce(&std::path::Path) -> T) -> T {
    let dir = tempdir().unwrap();
    std::env::set_var("WMB_STATE_DIR", dir.path());
    let result = f(dir.path());
    std::env::remove_var("WMB_STATE_DIR");
    result
}

#[test]
#[serial]
fn install_writes_manifest() {
    with_state_dir(|state_dir| {
        install(InstallFlags::default()).unwrap();
        assert!(manifest_path(state_dir).exists());
    });
}

#[test]
#[serial]
fn install_dry_run_does_not_write() {
    with_state_dir(|state_dir| {
        install(InstallFlags { dry_run: true, ..Default::default() }).unwrap();
        assert!(!manifest_path(state_dir).exists());
    });
}

#[test]
#[serial]
fn install_without_force_does_not_overwrite_existing() {
    with_state_dir(|state_dir| {
        install(InstallFlags::default()).unwrap();
        let path = manifest_path(state_dir);
        let original = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, "corrupted").unwrap();

        install(InstallFlags::default()).unwrap();
        let after = std::fs::read_to_string(&path).unwrap();
        assert_eq!(after, "corrupted", "non-forced install must not touch an existing manifest");
        assert_ne!(after, original);
    });
}

#[test]
#[serial]
fn install_with_force_overwrites() {
    with_state_dir(|state_dir| {
        install(InstallFlags::default()).unwrap();
        let path = manifest_path(state_dir);
        std::fs::write(&path, "corrupted").unwrap();

        install(InstallFlags { force: true, ..Default::default() }).unwrap();
        let after = std::fs::read_to_string(&path).unwrap();
        assert_ne!(after, "corrupted");
    });
}

#[test]
#[serial]
fn uninstall_removes_manifest() {
    with_state_dir(|state_dir| {
        install(InstallFlags::default()).unwrap();
        uninstall(InstallFlags::default()).unwrap();
        assert!(!manifest_path(state_dir).exists());
    });
}

#[test]
#[serial]
fn uninstall_is_a_no_op_when_nothing_installed() {
    with_state_dir(|_state_dir| {
        uninstall(InstallFlags::default()).unwrap();
    });
}

#[tokio::test]
#[serial]
async fn run_test_fails_without_a_running_daemon() {
    let dir = tempdir().unwrap();
    std::env::set_var("WMB_STATE_DIR", dir.path());

    let err = run_test(InstallFlags::default()).await.unwrap_err();
    assert_eq!(err.code, 1);

    std::env::remove_var("WMB_STATE_DIR");
}
