// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn identical_job_types_merge_into_themselves() {
    assert_eq!(JobType::Start.merge_with(JobType::Start), Some(JobType::Start));
}

#[test]
fn restart_absorbs_start_and_stop() {
    assert_eq!(JobType::Restart.merge_with(JobType::Start), Some(JobType::Restart));
    assert_eq!(JobType::Stop.merge_with(JobType::Restart), Some(JobType::Restart));
}

#[test]
fn start_and_stop_do_not_merge() {
    assert_eq!(JobType::Start.merge_with(JobType::Stop), None);
    assert!(JobType::Start.conflicts_with(JobType::Stop));
}

#[test]
fn verify_is_absorbed_by_start_or_stop() {
    assert_eq!(JobType::Verify.merge_with(JobType::Start), Some(JobType::Start));
    assert_eq!(JobType::Stop.merge_with(JobType::Verify), Some(JobType::Stop));
}

#[test]
fn new_job_starts_unfinished() {
    let unit = crate::unit::UnitIdx { slot: 0, generation: 0 };
    let job = Job::new(unit, JobType::Start, JobMode::Replace);
    assert!(!job.is_finished());
    assert!(job.id.as_str().starts_with("jobid_"));
}
