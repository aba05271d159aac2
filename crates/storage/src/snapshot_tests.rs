// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::test_support::loaded_stub;
use oj_core::{JobMode, JobType};
use oj_unitconf::test_support::{minimal_service, FixtureSource};

#[test]
fn serializes_and_round_trips_a_unit_record() {
    let mut unit = loaded_stub("a.service", UnitKind::Service);
    unit.failed_latch = true;
    unit.refs = 2;
    unit.cgroup_path = Some("/sys/fs/cgroup/a.service".to_string());

    let record = serialize_unit(&unit).unwrap();
    assert_eq!(record.kind, "unit");
    assert_eq!(record.get("id"), Some("a.service"));
    assert_eq!(record.get("kind"), Some("service"));
    assert_eq!(record.get_bool("failed_latch"), Some(true));
    assert_eq!(record.get_u64("refs").unwrap(), Some(2));

    let restored = deserialize_unit(&record).unwrap();
    assert_eq!(restored.id, "a.service");
    assert_eq!(restored.kind, UnitKind::Service);
    assert!(restored.failed_latch);
    assert_eq!(restored.refs, 2);
    assert_eq!(restored.cgroup_path.as_deref(), Some("/sys/fs/cgroup/a.service"));
}

#[test]
fn serializes_and_round_trips_a_job_record_with_edges() {
    let mut graph = oj_core::UnitGraph::new(FixtureSource::new().with(minimal_service("a.service")));
    let unit_idx = graph.get_or_load("a.service").unwrap();

    let mut job = Job::new(unit_idx, JobType::Start, JobMode::Replace);
    let requester = JobId::generate();
    let dependency = JobId::generate();
    job.requested_by.push(requester);
    job.waits_for.push(dependency);

    let record = serialize_job(&job, "a.service").unwrap();
    let restored = deserialize_job(&record).unwrap();
    assert_eq!(restored.id, job.id);
    assert_eq!(restored.unit_name, "a.service");
    assert_eq!(restored.job_type, JobType::Start);
    assert_eq!(restored.mode, JobMode::Replace);
    assert_eq!(restored.ordered_after, vec![dependency]);
    assert_eq!(restored.requested_by, vec![requester]);
    assert!(restored.result.is_none());
}

#[test]
fn unrecognized_enum_value_is_a_bad_encoding_error() {
    let mut r = Record::new("job");
    r.set("id", "job_x").unwrap();
    r.set("unit", "a.service").unwrap();
    r.set("job_type", "not-a-real-type").unwrap();
    r.set("mode", "replace").unwrap();

    let err = deserialize_job(&r).unwrap_err();
    assert!(matches!(err, SerializationError::BadEncoding { encoding: "enum", .. }));
}
