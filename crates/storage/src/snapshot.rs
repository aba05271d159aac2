// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridges [`oj_core`] types to the textual record format (spec.md §4.2,
//! §6 "Persisted state", §8 re-exec round-trip scenario). Each function
//! here owns exactly one record kind; `oj-engine` (which has the unit
//! graph and job queue in scope) drives the overall re-exec sequence by
//! calling these once per live unit/job and handing the result to
//! [`crate::reexec::ReexecCoordinator::snapshot`].

use crate::error::SerializationError;
use crate::record::Record;
use oj_core::{ActiveState, Job, JobId, JobMode, JobResult, JobType, LoadState, SubState, Unit, UnitKind};

pub fn parse_job_type(s: &str) -> Option<JobType> {
    Some(match s {
        "start" => JobType::Start,
        "stop" => JobType::Stop,
        "restart" => JobType::Restart,
        "try-restart" => JobType::TryRestart,
        "reload" => JobType::Reload,
        "reload-or-restart" => JobType::ReloadOrRestart,
        "verify" => JobType::Verify,
        _ => return None,
    })
}

fn job_mode_tag(m: JobMode) -> &'static str {
    match m {
        JobMode::Fail => "fail",
        JobMode::Replace => "replace",
        JobMode::ReplaceIrreversibly => "replace-irreversibly",
        JobMode::Isolate => "isolate",
        JobMode::IgnoreDependencies => "ignore-dependencies",
        JobMode::Flush => "flush",
    }
}

fn parse_job_mode(s: &str) -> Option<JobMode> {
    Some(match s {
        "fail" => JobMode::Fail,
        "replace" => JobMode::Replace,
        "replace-irreversibly" => JobMode::ReplaceIrreversibly,
        "isolate" => JobMode::Isolate,
        "ignore-dependencies" => JobMode::IgnoreDependencies,
        "flush" => JobMode::Flush,
        _ => return None,
    })
}

fn parse_job_result(s: &str) -> Option<JobResult> {
    Some(match s {
        "done" => JobResult::Done,
        "canceled" => JobResult::Canceled,
        "timeout" => JobResult::Timeout,
        "failed" => JobResult::Failed,
        "dependency" => JobResult::Dependency,
        "skipped" => JobResult::Skipped,
        "invalid" => JobResult::Invalid,
        _ => return None,
    })
}

/// Serialize the identity- and lifecycle-relevant fields of a unit
/// (spec.md §8 scenario 6: "every unit id/sub-state... bit-equal to a
/// pre-serialization snapshot"). Dependency edges are not carried here —
/// they are recomputed on reload from the collaborator's config source,
/// since `oj-core::Unit` doesn't own a serializable `UnitConfig` summary
/// independent of that source.
pub fn serialize_unit(unit: &Unit) -> Result<Record, SerializationError> {
    let mut r = Record::new("unit");
    r.set("id", unit.id.clone())?;
    r.set("kind", unit.kind.to_string())?;
    r.set("load_state", load_state_tag(unit.load_state))?;
    r.set("active_state", active_state_tag(unit.active_state))?;
    let sub_state = serde_json::to_string(&unit.sub_state).map_err(|e| SerializationError::BadEncoding {
        key: "sub_state".to_string(),
        encoding: "json",
        reason: e.to_string(),
    })?;
    r.set("sub_state", sub_state)?;
    r.set_bool("failed_latch", unit.failed_latch)?;
    r.set_u64("refs", u64::from(unit.refs))?;
    if let Some(path) = &unit.cgroup_path {
        r.set("cgroup_path", path.clone())?;
    }
    if let Some(job) = unit.job {
        r.set("job", job.as_str().to_string())?;
    }
    Ok(r)
}

fn load_state_tag(s: LoadState) -> &'static str {
    match s {
        LoadState::Stub => "stub",
        LoadState::Loaded => "loaded",
        LoadState::NotFound => "not-found",
        LoadState::BadSetting => "bad-setting",
        LoadState::Error => "error",
        LoadState::Masked => "masked",
        LoadState::Merged => "merged",
    }
}

fn active_state_tag(s: ActiveState) -> &'static str {
    match s {
        ActiveState::Inactive => "inactive",
        ActiveState::Activating => "activating",
        ActiveState::Active => "active",
        ActiveState::Reloading => "reloading",
        ActiveState::Deactivating => "deactivating",
        ActiveState::Failed => "failed",
        ActiveState::Maintenance => "maintenance",
    }
}

fn parse_load_state(s: &str) -> Option<LoadState> {
    Some(match s {
        "stub" => LoadState::Stub,
        "loaded" => LoadState::Loaded,
        "not-found" => LoadState::NotFound,
        "bad-setting" => LoadState::BadSetting,
        "error" => LoadState::Error,
        "masked" => LoadState::Masked,
        "merged" => LoadState::Merged,
        _ => return None,
    })
}

fn parse_active_state(s: &str) -> Option<ActiveState> {
    Some(match s {
        "inactive" => ActiveState::Inactive,
        "activating" => ActiveState::Activating,
        "active" => ActiveState::Active,
        "reloading" => ActiveState::Reloading,
        "deactivating" => ActiveState::Deactivating,
        "failed" => ActiveState::Failed,
        "maintenance" => ActiveState::Maintenance,
        _ => return None,
    })
}

/// Serialize a job, including `ordered_after` (as job id strings) so the
/// restored instance can rebuild the job graph's edges without
/// re-deriving them from the unit graph (spec.md §8 scenario 6: the
/// pending job's "id, type, ordered_after set" must survive bit-equal).
pub fn serialize_job(job: &Job, unit_id: &str) -> Result<Record, SerializationError> {
    let mut r = Record::new("job");
    r.set("id", job.id.as_str().to_string())?;
    r.set("unit", unit_id.to_string())?;
    r.set("job_type", job.job_type.to_string())?;
    r.set("mode", job_mode_tag(job.mode))?;
    for waits_for in &job.waits_for {
        r.set("ordered_after", waits_for.as_str().to_string())?;
    }
    for requested_by in &job.requested_by {
        r.set("requested_by", requested_by.as_str().to_string())?;
    }
    if let Some(result) = job.result {
        r.set("result", result.to_string())?;
    }
    Ok(r)
}

/// The fields recovered from a `job` record, before the caller resolves
/// `unit`/`ordered_after`/`requested_by` id strings back to live
/// [`oj_core::UnitIdx`]/[`JobId`] values against the reconstructed graph.
pub struct RestoredJob {
    pub id: JobId,
    pub unit_name: String,
    pub job_type: JobType,
    pub mode: JobMode,
    pub ordered_after: Vec<JobId>,
    pub requested_by: Vec<JobId>,
    pub result: Option<JobResult>,
}

pub fn deserialize_job(record: &Record) -> Result<RestoredJob, SerializationError> {
    let bad = |key: &str, value: &str| SerializationError::BadEncoding {
        key: key.to_string(),
        encoding: "enum",
        reason: format!("{value:?} is not a recognized value"),
    };
    let id = record
        .get("id")
        .ok_or_else(|| bad("id", ""))
        .map(JobId::from_string)?;
    let unit_name = record.get("unit").ok_or_else(|| bad("unit", ""))?.to_string();
    let job_type_str = record.get("job_type").ok_or_else(|| bad("job_type", ""))?;
    let job_type = parse_job_type(job_type_str).ok_or_else(|| bad("job_type", job_type_str))?;
    let mode_str = record.get("mode").ok_or_else(|| bad("mode", ""))?;
    let mode = parse_job_mode(mode_str).ok_or_else(|| bad("mode", mode_str))?;
    let ordered_after = record.get_all("ordered_after").map(JobId::from_string).collect();
    let requested_by = record.get_all("requested_by").map(JobId::from_string).collect();
    let result = match record.get("result") {
        None => None,
        Some(s) => Some(parse_job_result(s).ok_or_else(|| bad("result", s))?),
    };
    Ok(RestoredJob { id, unit_name, job_type, mode, ordered_after, requested_by, result })
}

/// The subset of a unit's fields recovered purely from its own record;
/// the caller still needs to `get_or_load` the unit from its config
/// source to get a fresh [`oj_core::UnitIdx`] before re-applying these.
pub struct RestoredUnit {
    pub id: String,
    pub kind: UnitKind,
    pub load_state: LoadState,
    pub active_state: ActiveState,
    pub sub_state: SubState,
    pub failed_latch: bool,
    pub refs: u32,
    pub cgroup_path: Option<String>,
}

pub fn deserialize_unit(record: &Record) -> Result<RestoredUnit, SerializationError> {
    let bad = |key: &str| SerializationError::BadEncoding {
        key: key.to_string(),
        encoding: "unit record",
        reason: "missing required field".to_string(),
    };
    let id = record.get("id").ok_or_else(|| bad("id"))?.to_string();
    let kind_str = record.get("kind").ok_or_else(|| bad("kind"))?;
    let kind = UnitKind::from_suffix(kind_str).ok_or_else(|| SerializationError::BadEncoding {
        key: "kind".to_string(),
        encoding: "enum",
        reason: format!("{kind_str:?} is not a recognized unit kind"),
    })?;
    let load_state_str = record.get("load_state").ok_or_else(|| bad("load_state"))?;
    let load_state = parse_load_state(load_state_str).ok_or_else(|| SerializationError::BadEncoding {
        key: "load_state".to_string(),
        encoding: "enum",
        reason: format!("{load_state_str:?} is not a recognized load state"),
    })?;
    let active_state_str = record.get("active_state").ok_or_else(|| bad("active_state"))?;
    let active_state = parse_active_state(active_state_str).ok_or_else(|| SerializationError::BadEncoding {
        key: "active_state".to_string(),
        encoding: "enum",
        reason: format!("{active_state_str:?} is not a recognized active state"),
    })?;
    let sub_state_str = record.get("sub_state").ok_or_else(|| bad("sub_state"))?;
    let sub_state = serde_json::from_str(sub_state_str).map_err(|e| SerializationError::BadEncoding {
        key: "sub_state".to_string(),
        encoding: "json",
        reason: e.to_string(),
    })?;
    let failed_latch = record.get_bool("failed_latch").unwrap_or(false);
    let refs = record.get_u64("refs")?.unwrap_or(0) as u32;
    let cgroup_path = record.get("cgroup_path").map(str::to_string);
    Ok(RestoredUnit { id, kind, load_state, active_state, sub_state, failed_latch, refs, cgroup_path })
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
