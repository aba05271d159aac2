// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transaction builder (spec.md §4.5) — the crux of the manager:
//! turns a single client request into a consistent, topologically
//! ordered set of jobs, or rejects the whole thing without mutating any
//! unit state.
//!
//! Building happens entirely against an immutable borrow of the
//! [`UnitGraph`]; nothing here installs a job onto a unit. [`install`]
//! is the one function that takes `&mut UnitGraph` and does that, once a
//! [`Transaction`] has survived every validation step.

use crate::error::TransactionError;
use oj_core::{DependencyKind, Job, JobId, JobMode, JobType, LoadState, UnitGraph, UnitIdx};
use oj_unitconf::UnitConfigSource;
use std::collections::{HashMap, HashSet};

/// Why a pulled-in job was added to the transaction, tracked only for
/// cycle-relaxation tie-breaks (spec.md §4.5: "prefer... non-anchor
/// Wants-derived, then non-anchor Requires-derived, then Stop jobs over
/// Start jobs, then highest job id").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Origin {
    /// Removed first: weakest link in the dependency graph.
    Wants,
    Requires,
    Other,
    /// Never removed to break a cycle.
    Anchor,
}

/// A proposed atomic bundle of jobs, not yet installed on the graph
/// (spec.md §3 `Transaction`).
pub struct Transaction {
    jobs: Vec<Job>,
    anchor: JobId,
}

impl Transaction {
    pub fn anchor(&self) -> JobId {
        self.anchor
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn into_jobs(self) -> Vec<Job> {
        self.jobs
    }
}

struct Builder<'g, S: UnitConfigSource> {
    graph: &'g UnitGraph<S>,
    /// Jobs already installed on the graph from a previous transaction,
    /// not yet settled (spec.md §4.5 step 3: a second request against a
    /// unit that already has a job in flight merges into it rather than
    /// racing it). Looked up lazily, by `unit.job`, the first time
    /// [`Builder::add_job`] sees that unit.
    existing_jobs: &'g [Job],
    jobs: Vec<Job>,
    origins: Vec<Origin>,
    by_unit: HashMap<UnitIdx, usize>,
}

fn is_start_like(jt: JobType) -> bool {
    matches!(jt, JobType::Start | JobType::Restart | JobType::TryRestart | JobType::ReloadOrRestart)
}

fn is_stop_like(jt: JobType) -> bool {
    matches!(jt, JobType::Stop | JobType::Restart)
}

impl<'g, S: UnitConfigSource> Builder<'g, S> {
    fn new(graph: &'g UnitGraph<S>, existing_jobs: &'g [Job]) -> Self {
        Self { graph, existing_jobs, jobs: Vec::new(), origins: Vec::new(), by_unit: HashMap::new() }
    }

    fn unit_name(&self, idx: UnitIdx) -> String {
        self.graph.get(idx).map(|u| u.id.clone()).unwrap_or_else(|| "<stale>".to_string())
    }

    /// If `unit` already carries an unsettled job from a previous
    /// transaction (`unit.job`, still present and unfinished among
    /// `existing_jobs`), pull it into this builder under its own id so
    /// [`add_job`](Self::add_job) merges against it instead of minting a
    /// second, independent job for the same unit.
    fn seed_existing_job(&mut self, unit: UnitIdx) -> Option<usize> {
        if self.by_unit.contains_key(&unit) {
            return None;
        }
        let job_id = self.graph.get(unit)?.job?;
        let existing = self.existing_jobs.iter().find(|j| j.id == job_id && !j.is_finished())?;
        self.jobs.push(existing.clone());
        self.origins.push(Origin::Other);
        let i = self.jobs.len() - 1;
        self.by_unit.insert(unit, i);
        Some(i)
    }

    /// Add (or merge into an existing same-unit job) a job for `unit`.
    /// Mirrors spec.md §4.5 step 3's coalescing matrix: identical types
    /// collapse trivially, compatible pairs merge per
    /// [`JobType::merge_with`], and genuinely conflicting pairs
    /// (`Start` vs `Stop`) are an error unless the transaction's anchor
    /// is irreversible. Also merges against a unit's already-installed
    /// job from a prior transaction (see [`Self::seed_existing_job`]),
    /// not just one added earlier within this same builder call.
    fn add_job(
        &mut self,
        unit: UnitIdx,
        job_type: JobType,
        mode: JobMode,
        anchor: bool,
        origin: Origin,
    ) -> Result<usize, TransactionError> {
        self.seed_existing_job(unit);
        if let Some(&i) = self.by_unit.get(&unit) {
            let existing = self.jobs[i].job_type;
            if existing == job_type {
                if anchor {
                    self.jobs[i].anchor = true;
                    self.origins[i] = Origin::Anchor;
                }
                return Ok(i);
            }
            if let Some(merged) = existing.merge_with(job_type) {
                self.jobs[i].job_type = merged;
                if anchor {
                    self.jobs[i].anchor = true;
                    self.origins[i] = Origin::Anchor;
                }
                return Ok(i);
            }
            if existing.conflicts_with(job_type) {
                if anchor && mode == JobMode::ReplaceIrreversibly {
                    self.jobs[i].job_type = job_type;
                    self.jobs[i].anchor = true;
                    self.origins[i] = Origin::Anchor;
                    return Ok(i);
                }
                return Err(TransactionError::Conflict { unit: self.unit_name(unit) });
            }
            // Incomparable but non-conflicting (e.g. Reload vs Verify):
            // the more specific job wins, keep the existing one.
            Ok(i)
        } else {
            let mut job = Job::new(unit, job_type, mode);
            job.anchor = anchor;
            self.jobs.push(job);
            self.origins.push(if anchor { Origin::Anchor } else { origin });
            let i = self.jobs.len() - 1;
            self.by_unit.insert(unit, i);
            Ok(i)
        }
    }

    /// Recursively pull in jobs implied by `unit`'s dependency edges
    /// (spec.md §4.5 step 2).
    fn expand(
        &mut self,
        unit: UnitIdx,
        job_type: JobType,
        mode: JobMode,
        visited: &mut HashSet<UnitIdx>,
    ) -> Result<(), TransactionError> {
        if mode == JobMode::IgnoreDependencies {
            return Ok(());
        }
        if !visited.insert(unit) {
            return Ok(());
        }

        let Some(u) = self.graph.get(unit) else {
            return Err(TransactionError::UnresolvedDependency { name: self.unit_name(unit) });
        };

        if is_start_like(job_type) {
            for target in u.deps(DependencyKind::Requires).collect::<Vec<_>>() {
                self.add_job(target, JobType::Start, JobMode::Replace, false, Origin::Requires)?;
                self.expand(target, JobType::Start, mode, visited)?;
            }
            for target in u.deps(DependencyKind::BindsTo).collect::<Vec<_>>() {
                self.add_job(target, JobType::Start, JobMode::Replace, false, Origin::Requires)?;
                self.expand(target, JobType::Start, mode, visited)?;
            }
            for target in u.deps(DependencyKind::Wants).collect::<Vec<_>>() {
                self.add_job(target, JobType::Start, JobMode::Replace, false, Origin::Wants)?;
                self.expand(target, JobType::Start, mode, visited)?;
            }
            for target in u.deps(DependencyKind::Requisite).collect::<Vec<_>>() {
                self.add_job(target, JobType::Verify, JobMode::Replace, false, Origin::Other)?;
            }
            for target in u.deps(DependencyKind::Conflicts).collect::<Vec<_>>() {
                self.add_job(target, JobType::Stop, JobMode::Replace, false, Origin::Other)?;
            }
        }

        if is_stop_like(job_type) {
            for target in u.deps(DependencyKind::BoundBy).collect::<Vec<_>>() {
                self.add_job(target, JobType::Stop, JobMode::Replace, false, Origin::Other)?;
                self.expand(target, JobType::Stop, mode, visited)?;
            }
            for target in u.deps(DependencyKind::ConsistsOf).collect::<Vec<_>>() {
                if matches!(self.graph.get(target).map(|t| t.kind), Some(k) if k != oj_core::UnitKind::Slice) {
                    self.add_job(target, JobType::Stop, JobMode::Replace, false, Origin::Other)?;
                    self.expand(target, JobType::Stop, mode, visited)?;
                }
            }
            if mode != JobMode::Fail {
                for target in u.deps(DependencyKind::RequiredBy).collect::<Vec<_>>() {
                    self.add_job(target, JobType::Stop, JobMode::Replace, false, Origin::Requires)?;
                    self.expand(target, JobType::Stop, mode, visited)?;
                }
            }
        }

        if job_type == JobType::Reload || job_type == JobType::ReloadOrRestart {
            for target in u.deps(DependencyKind::PropagatesReloadTo).collect::<Vec<_>>() {
                self.add_job(target, JobType::Reload, JobMode::Replace, false, Origin::Other)?;
            }
        }

        Ok(())
    }

    /// Mode `isolate` (spec.md §4.5 step 2, §9 Open Question pinning):
    /// stop every currently non-inactive unit that isn't transitively
    /// kept alive from the anchor via `Wants|Requires|BindsTo`, skipping
    /// units with `IgnoreOnIsolate=true` that are currently active.
    fn expand_isolate(&mut self, anchor: UnitIdx) -> Result<(), TransactionError> {
        let mut keep = HashSet::new();
        let mut stack = vec![anchor];
        while let Some(idx) = stack.pop() {
            if !keep.insert(idx) {
                continue;
            }
            let Some(u) = self.graph.get(idx) else { continue };
            for kind in [DependencyKind::Wants, DependencyKind::Requires, DependencyKind::BindsTo] {
                for target in u.deps(kind) {
                    if !keep.contains(&target) {
                        stack.push(target);
                    }
                }
            }
        }

        for idx in self.graph.all_indices() {
            if keep.contains(&idx) {
                continue;
            }
            let Some(u) = self.graph.get(idx) else { continue };
            if u.active_state == oj_core::ActiveState::Inactive {
                continue;
            }
            let ignore = u.config.as_ref().is_some_and(|c| c.common.ignore_on_isolate);
            if ignore {
                continue;
            }
            self.add_job(idx, JobType::Stop, JobMode::Isolate, false, Origin::Other)?;
        }
        Ok(())
    }

    /// Project `Before`/`After` edges onto the job set as `waits_for`
    /// (spec.md §4.5 step 4). Direction is reversed for a pair of `Stop`
    /// jobs: if `A After B` (A starts after B), then stopping reverses
    /// to "B stops after A".
    fn link_ordering(&mut self) {
        let pairs: Vec<(usize, usize)> = {
            let mut out = Vec::new();
            for (&unit_a, &i) in &self.by_unit {
                let Some(ua) = self.graph.get(unit_a) else { continue };
                for unit_b in ua.deps(DependencyKind::After) {
                    if let Some(&j) = self.by_unit.get(&unit_b) {
                        out.push((i, j));
                    }
                }
            }
            out
        };

        for (i, j) in pairs {
            let start_i = is_start_like(self.jobs[i].job_type) && !matches!(self.jobs[i].job_type, JobType::Stop);
            let start_j = is_start_like(self.jobs[j].job_type) && !matches!(self.jobs[j].job_type, JobType::Stop);
            let stop_i = matches!(self.jobs[i].job_type, JobType::Stop);
            let stop_j = matches!(self.jobs[j].job_type, JobType::Stop);

            if start_i && start_j {
                // i (A) is After j (B): A waits for B.
                let id = self.jobs[j].id;
                if !self.jobs[i].waits_for.contains(&id) {
                    self.jobs[i].waits_for.push(id);
                }
            } else if stop_i && stop_j {
                // Reversed: B (j) stops after A (i).
                let id = self.jobs[i].id;
                if !self.jobs[j].waits_for.contains(&id) {
                    self.jobs[j].waits_for.push(id);
                }
            }
        }
    }

    /// Topologically sort the job set, relaxing cycles per spec.md §4.5
    /// step 4's tie-break order. Returns the ids of units on a cycle that
    /// could not be relaxed.
    fn order_and_break_cycles(&mut self) -> Result<(), TransactionError> {
        loop {
            match self.find_cycle() {
                None => return Ok(()),
                Some(cycle) => {
                    let Some(victim) = self.pick_cycle_victim(&cycle) else {
                        let path = cycle.iter().map(|&i| self.unit_name(self.jobs[i].unit)).collect();
                        return Err(TransactionError::CycleFound { path });
                    };
                    self.remove_job(victim);
                }
            }
        }
    }

    /// DFS cycle detection over the `waits_for` graph. Returns the job
    /// indices forming one cycle, if any.
    fn find_cycle(&self) -> Option<Vec<usize>> {
        let n = self.jobs.len();
        let mut state = vec![0u8; n]; // 0 unvisited, 1 in-progress, 2 done
        let mut stack = Vec::new();

        fn id_to_index(jobs: &[Job], id: JobId) -> Option<usize> {
            jobs.iter().position(|j| j.id == id)
        }

        fn visit(
            i: usize,
            jobs: &[Job],
            state: &mut [u8],
            stack: &mut Vec<usize>,
        ) -> Option<Vec<usize>> {
            state[i] = 1;
            stack.push(i);
            for &dep_id in &jobs[i].waits_for {
                let Some(j) = id_to_index(jobs, dep_id) else { continue };
                match state[j] {
                    0 => {
                        if let Some(cycle) = visit(j, jobs, state, stack) {
                            return Some(cycle);
                        }
                    }
                    1 => {
                        let start = stack.iter().position(|&x| x == j).unwrap_or(0);
                        return Some(stack[start..].to_vec());
                    }
                    _ => {}
                }
            }
            stack.pop();
            state[i] = 2;
            None
        }

        for i in 0..n {
            if state[i] == 0 {
                if let Some(cycle) = visit(i, &self.jobs, &mut state, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    /// Pick the job to drop to break `cycle`, per spec.md §4.5's tie-break
    /// order: non-anchor Wants-derived first, then non-anchor
    /// Requires-derived, then Stop jobs over Start jobs, then the highest
    /// (most recently added) job id. Returns `None` if every job in the
    /// cycle is the anchor (unresolvable).
    fn pick_cycle_victim(&self, cycle: &[usize]) -> Option<usize> {
        cycle
            .iter()
            .copied()
            .filter(|&i| !self.jobs[i].anchor)
            .max_by_key(|&i| {
                let origin_rank = match self.origins[i] {
                    Origin::Wants => 3,
                    Origin::Requires => 2,
                    Origin::Other => 1,
                    Origin::Anchor => 0,
                };
                let stop_rank = u8::from(matches!(self.jobs[i].job_type, JobType::Stop));
                (origin_rank, stop_rank, i)
            })
    }

    fn remove_job(&mut self, victim: usize) {
        let removed_id = self.jobs[victim].id;
        let removed_unit = self.jobs[victim].unit;
        self.jobs.remove(victim);
        self.origins.remove(victim);
        self.by_unit.remove(&removed_unit);
        for job in &mut self.jobs {
            job.waits_for.retain(|id| *id != removed_id);
        }
    }

    /// spec.md §4.5 step 5: reject the whole transaction if any Start
    /// job targets an unloaded/masked unit, fails a cheap condition, or
    /// if any `Requisite` check finds its target inactive.
    fn validate(&self) -> Result<(), TransactionError> {
        for job in &self.jobs {
            let Some(unit) = self.graph.get(job.unit) else {
                return Err(TransactionError::UnresolvedDependency { name: "<stale>".to_string() });
            };
            if is_start_like(job.job_type) {
                if unit.load_state == LoadState::Masked {
                    return Err(TransactionError::MaskedUnit { unit: unit.id.clone() });
                }
                if unit.load_state != LoadState::Loaded {
                    return Err(TransactionError::UnresolvedDependency { name: unit.id.clone() });
                }
                if let Some(config) = &unit.config {
                    if !crate::condition::conditions_pass(&config.common) {
                        return Err(TransactionError::ConditionFailed { unit: unit.id.clone() });
                    }
                }
            }
            if job.job_type == JobType::Verify && unit.active_state != oj_core::ActiveState::Active {
                return Err(TransactionError::RequisiteInactive { unit: unit.id.clone() });
            }
        }
        Ok(())
    }
}

/// Build a transaction for `(anchor_unit, anchor_type, mode)` (spec.md
/// §4.5). On any error the returned `Err` carries no side effects — the
/// caller's `UnitGraph` is untouched either way, since this function only
/// ever takes `&UnitGraph`. `existing_jobs` is the runner's current job
/// list, consulted so a unit that already has an unsettled job installed
/// from a previous transaction gets merged into rather than duplicated
/// (spec.md §4.5 step 3); pass `&[]` if nothing is running yet.
pub fn build_transaction<S: UnitConfigSource>(
    graph: &UnitGraph<S>,
    existing_jobs: &[Job],
    anchor_unit: UnitIdx,
    anchor_type: JobType,
    mode: JobMode,
) -> Result<Transaction, TransactionError> {
    let mut b = Builder::new(graph, existing_jobs);
    let anchor_idx = b.add_job(anchor_unit, anchor_type, mode, true, Origin::Anchor)?;
    let anchor_id = b.jobs[anchor_idx].id;

    let mut visited = HashSet::new();
    b.expand(anchor_unit, anchor_type, mode, &mut visited)?;

    if mode == JobMode::Isolate {
        b.expand_isolate(anchor_unit)?;
    }

    b.link_ordering();
    b.order_and_break_cycles()?;
    b.validate()?;

    Ok(Transaction { jobs: b.jobs, anchor: anchor_id })
}

/// spec.md §4.5 step 6: atomically install every job in `txn` onto its
/// unit (`unit.job = Some(job.id)`). Only called after [`build_transaction`]
/// has returned `Ok`, so every job here already passed validation.
///
/// Idempotent per job id: a job the builder merged into a unit's
/// already-installed one (same id, `unit.job` already pointing at it)
/// does not bump `refs` a second time — only a genuinely new job does,
/// so `refs` stays in step with the single settle-time decrement in
/// `JobRunner::finish`.
pub fn install<S: UnitConfigSource>(graph: &mut UnitGraph<S>, txn: Transaction) -> Vec<Job> {
    let jobs = txn.into_jobs();
    for job in &jobs {
        if let Some(unit) = graph.get_mut(job.unit) {
            if unit.job != Some(job.id) {
                unit.job = Some(job.id);
                unit.refs += 1;
            }
        }
    }
    jobs
}

#[cfg(test)]
#[path = "transaction_tests.rs"]
mod tests;
