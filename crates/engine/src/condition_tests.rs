// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_condition_list_passes() {
    let common = CommonSettings::default();
    assert!(conditions_pass(&common));
}

#[test]
fn missing_path_fails() {
    let mut common = CommonSettings::default();
    common.condition_path_exists.push("/definitely/not/a/real/path/oj-engine-test".to_string());
    assert!(!conditions_pass(&common));
}

#[test]
fn existing_path_passes() {
    let mut common = CommonSettings::default();
    common.condition_path_exists.push("/".to_string());
    assert!(conditions_pass(&common));
}

#[tokio::test]
async fn check_at_runtime_defaults_to_check_now() {
    let check = ConditionPathExists(vec!["/".to_string()]);
    assert!(check.check_now());
    assert!(check.check_at_runtime().await);

    let missing = ConditionPathExists(vec!["/definitely/not/a/real/path/oj-engine-test".to_string()]);
    assert!(!missing.check_at_runtime().await);
}
