// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
    let cfg = ManagerConfig::load(&dir.path().join("nonexistent.toml")).unwrap();
    assert_eq!(cfg.default_timeout, Duration::from_secs(90));
}

#[test]
fn a_present_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
    let path = dir.path().join("oddjobsd.toml");
    std::fs::write(&path, "units_directory = \"/srv/units\"\ndefault_timeout = 30\n").unwrap();

    let cfg = ManagerConfig::load(&path).unwrap();
    assert_eq!(cfg.units_directory, PathBuf::from("/srv/units"));
    assert_eq!(cfg.default_timeout, Duration::from_secs(30));
}

#[test]
fn bad_toml_is_reported_as_bad_config() {
    let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
    let path = dir.path().join("oddjobsd.toml");
    std::fs::write(&path, "not valid toml {{{").unwrap();

    let err = ManagerConfig::load(&path).unwrap_err();
    assert!(matches!(err, DaemonError::BadConfig { .. }));
}
