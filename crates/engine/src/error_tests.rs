// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn cycle_found_message_includes_path() {
    let err = TransactionError::CycleFound { path: vec!["a".into(), "b".into(), "c".into()] };
    assert!(err.to_string().contains("a"));
}

#[test]
fn runner_error_wraps_transaction_error() {
    let txn = TransactionError::MaskedUnit { unit: "a.service".into() };
    let runner: RunnerError = txn.into();
    assert!(matches!(runner, RunnerError::Transaction(_)));
}
