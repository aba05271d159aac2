// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn default_context_is_a_reasonable_sandboxed_baseline() {
    let ctx = ExecContext::default();
    assert!(ctx.no_new_privileges);
    assert_eq!(ctx.stdin, StdioTarget::Null);
    assert_eq!(ctx.stdout, StdioTarget::Inherit);
    assert_eq!(ctx.working_directory, PathBuf::from("/"));
    assert!(ctx.mount_view.is_empty());
}

#[test]
fn exec_command_defaults_to_not_ignoring_failure() {
    let cmd = ExecCommand::new("/bin/true", vec![]);
    assert!(!cmd.ignore_failure);
    assert_eq!(cmd.path, PathBuf::from("/bin/true"));
}

#[test]
fn exec_runtime_starts_with_no_shared_namespaces() {
    let runtime = ExecRuntime::new();
    assert!(runtime.shared_namespaces.is_empty());
    assert!(runtime.temp_dirs.is_empty());
}
