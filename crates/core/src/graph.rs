// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The unit dependency graph: a generational arena of [`Unit`]s plus the
//! name/alias index and edge-mirroring logic (spec.md §3, §4.3).
//!
//! Loading is lazy and collaborator-driven: `get_or_load` asks the
//! supplied [`UnitConfigSource`] for a name the first time it's
//! referenced (directly or as a dependency target), turns the returned
//! [`UnitConfig`] into graph edges, and caches the result. Nothing here
//! parses a unit file — that's the collaborator's job.

use crate::dependency::{DependencyKind, DependencyReason, ReasonMask};
use crate::error::{GraphError, LoadError};
use crate::unit::{ActiveState, LoadState, Unit, UnitIdx, UnitKind};
use oj_unitconf::{UnitConfig, UnitConfigSource};
use std::collections::HashMap;

struct Slot {
    generation: u32,
    unit: Option<Unit>,
}

/// Owns every loaded unit and the edges between them.
pub struct UnitGraph<S: UnitConfigSource> {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Canonical name and every alias, mapped to the owning slot.
    names: HashMap<String, UnitIdx>,
    source: S,
}

impl<S: UnitConfigSource> UnitGraph<S> {
    pub fn new(source: S) -> Self {
        Self { slots: Vec::new(), free: Vec::new(), names: HashMap::new(), source }
    }

    pub fn get(&self, idx: UnitIdx) -> Option<&Unit> {
        let slot = self.slots.get(idx.slot as usize)?;
        if slot.generation != idx.generation {
            return None;
        }
        slot.unit.as_ref()
    }

    pub fn get_mut(&mut self, idx: UnitIdx) -> Option<&mut Unit> {
        let slot = self.slots.get_mut(idx.slot as usize)?;
        if slot.generation != idx.generation {
            return None;
        }
        slot.unit.as_mut()
    }

    /// Resolve an already-loaded name or alias to its index, without
    /// triggering a load.
    pub fn resolve(&self, name: &str) -> Option<UnitIdx> {
        self.names.get(name).copied()
    }

    /// Number of live units in the arena (aliases don't add to this count).
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.unit.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every live unit's index, in arena order. No ordering guarantee
    /// beyond "stable for the lifetime of this call" — callers that need
    /// determinism (e.g. isolate-mode sweeps) should sort by `id`.
    pub fn all_indices(&self) -> impl Iterator<Item = UnitIdx> + '_ {
        self.slots.iter().enumerate().filter_map(|(slot, s)| {
            s.unit.as_ref().map(|_| UnitIdx { slot: slot as u32, generation: s.generation })
        })
    }

    fn insert_unit(&mut self, unit: Unit) -> UnitIdx {
        if let Some(slot_idx) = self.free.pop() {
            let slot = &mut self.slots[slot_idx as usize];
            slot.generation = slot.generation.wrapping_add(1);
            let generation = slot.generation;
            slot.unit = Some(unit);
            UnitIdx { slot: slot_idx, generation }
        } else {
            let slot_idx = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, unit: Some(unit) });
            UnitIdx { slot: slot_idx, generation: 0 }
        }
    }

    /// Look a name up, loading it from the collaborator source on first
    /// reference (spec.md §4.3 lazy load). Template names (`foo@.service`)
    /// are rejected; instances (`foo@bar.service`) are resolved against
    /// the template's settings by the source, per [`UnitConfigSource`].
    pub fn get_or_load(&mut self, name: &str) -> Result<UnitIdx, LoadError> {
        if let Some(idx) = self.names.get(name) {
            return Ok(*idx);
        }

        let kind = kind_of(name)?;
        let config = self
            .source
            .load(name)
            .map_err(|e| LoadError::Source { name: name.to_string(), source: Box::new(e) })?;

        let mut unit = Unit::new_stub(name.to_string(), kind);
        let idx = match config {
            None => {
                unit.load_state = LoadState::NotFound;
                self.insert_unit(unit)
            }
            Some(config) => {
                if config.is_template() {
                    return Err(LoadError::UninstantiatedTemplate { name: name.to_string() });
                }
                unit.load_state = LoadState::Loaded;
                let aliases = config.install.alias.iter().cloned().collect();
                unit.aliases = aliases;
                let raw_deps = config.raw_dependencies.clone();
                unit.config = Some(config);
                let idx = self.insert_unit(unit);
                self.names.insert(name.to_string(), idx);
                if let Some(unit) = self.get(idx) {
                    for alias in unit.aliases.clone() {
                        self.names.insert(alias, idx);
                    }
                }
                self.apply_raw_dependencies(idx, name, kind, &raw_deps)?;
                return Ok(idx);
            }
        };
        self.names.insert(name.to_string(), idx);
        Ok(idx)
    }

    fn apply_raw_dependencies(
        &mut self,
        idx: UnitIdx,
        name: &str,
        kind: UnitKind,
        raw: &std::collections::BTreeMap<String, Vec<String>>,
    ) -> Result<(), LoadError> {
        for (setting, targets) in raw {
            let Some(dep_kind) = setting_to_kind(setting) else {
                // Unrecognized dependency-setting key: the loader collaborator
                // validates setting names before producing `raw_dependencies`,
                // so this is silently ignored rather than treated as fatal.
                continue;
            };
            if !kind.can_activate_dependencies() && dep_kind.implies_start() {
                return Err(LoadError::IllegalDependency {
                    name: name.to_string(),
                    kind,
                    dep_kind,
                    target: targets.first().cloned().unwrap_or_default(),
                });
            }
            for target in targets {
                if target == name {
                    return Err(LoadError::SelfDependency { name: name.to_string() });
                }
                let target_idx = self.get_or_load(target)?;
                self.add_dependency(idx, dep_kind, target_idx, DependencyReason::File)
                    .map_err(|e| match e {
                        GraphError::Load(inner) => inner,
                        other => LoadError::IllegalDependency {
                            name: name.to_string(),
                            kind,
                            dep_kind,
                            target: format!("{other}"),
                        },
                    })?;
            }
        }
        Ok(())
    }

    /// Install an edge and its mirror image (spec.md §3 edge symmetry
    /// invariant: the graph never stores a one-directional edge).
    pub fn add_dependency(
        &mut self,
        from: UnitIdx,
        kind: DependencyKind,
        to: UnitIdx,
        reason: DependencyReason,
    ) -> Result<(), GraphError> {
        if from == to {
            return Err(GraphError::SelfLoop);
        }
        {
            let from_unit = self.get_mut(from).ok_or(GraphError::StaleIndex)?;
            from_unit.dependencies.entry(kind).or_default().insert(to);
            from_unit.dependency_reasons.insert((kind, to), reason);
        }
        let inverse = kind.inverse();
        let to_unit = self.get_mut(to).ok_or(GraphError::StaleIndex)?;
        to_unit.reverse_dependencies.entry(kind).or_default().insert(from);
        to_unit.dependencies.entry(inverse).or_default().insert(from);
        Ok(())
    }

    /// Remove every forward edge from `from` installed for a reason in
    /// `mask`, along with its mirror (spec.md §4.3 `remove_dependency`,
    /// used during config reload to drop stale file-sourced edges while
    /// preserving runtime ones).
    pub fn remove_dependencies_with_reason(&mut self, from: UnitIdx, mask: ReasonMask) {
        let Some(unit) = self.get(from) else { return };
        let to_remove: Vec<(DependencyKind, UnitIdx)> = unit
            .dependency_reasons
            .iter()
            .filter(|(_, reason)| mask.contains(**reason))
            .map(|(k, _)| *k)
            .collect();

        for (kind, to) in to_remove {
            if let Some(from_unit) = self.get_mut(from) {
                if let Some(set) = from_unit.dependencies.get_mut(&kind) {
                    set.remove(&to);
                }
                from_unit.dependency_reasons.remove(&(kind, to));
            }
            let inverse = kind.inverse();
            if let Some(to_unit) = self.get_mut(to) {
                if let Some(set) = to_unit.reverse_dependencies.get_mut(&kind) {
                    set.remove(&from);
                }
                if let Some(set) = to_unit.dependencies.get_mut(&inverse) {
                    set.remove(&from);
                }
            }
        }
    }

    /// Clears `failed_latch` and, if the unit is currently sitting in
    /// `ActiveState::Failed` with no job in flight, drops it back to
    /// `Inactive` (spec.md §4.4: "`failed` is latched until an explicit
    /// `reset-failed` request or a successful `start`"). A unit mid-job
    /// is left alone — its own transition, not `ResetFailed`, decides
    /// where it lands next.
    pub fn reset_failed(&mut self, idx: UnitIdx) {
        let Some(unit) = self.get_mut(idx) else { return };
        unit.failed_latch = false;
        if unit.job.is_none() && unit.active_state == ActiveState::Failed {
            unit.sub_state = crate::state::SubState::initial_for(unit.kind);
            unit.active_state = unit.sub_state.active_state();
        }
    }

    /// `ResetFailed(*)` (spec.md §6): reset every unit currently latched.
    pub fn reset_failed_all(&mut self) {
        let idxs: Vec<UnitIdx> = self.all_indices().collect();
        for idx in idxs {
            self.reset_failed(idx);
        }
    }

    /// `Reload` (spec.md §6): re-read `idx`'s config from the collaborator
    /// source and reapply its file/implicit/default-sourced dependency
    /// edges, leaving runtime-installed edges and any job in flight
    /// untouched. A no-op for a unit that was never loaded from a real
    /// config (stub or not-found units have nothing to re-read) or that
    /// has since disappeared from the source.
    pub fn reload_unit(&mut self, idx: UnitIdx) -> Result<(), LoadError> {
        let Some(unit) = self.get(idx) else { return Ok(()) };
        if unit.config.is_none() {
            return Ok(());
        }
        let name = unit.id.clone();
        let kind = unit.kind;

        let config = self
            .source
            .load(&name)
            .map_err(|e| LoadError::Source { name: name.clone(), source: Box::new(e) })?;
        let Some(config) = config else {
            return Ok(());
        };
        if config.is_template() {
            return Err(LoadError::UninstantiatedTemplate { name });
        }

        self.remove_dependencies_with_reason(idx, ReasonMask::all_but_runtime());
        let raw_deps = config.raw_dependencies.clone();
        let aliases: std::collections::HashSet<String> = config.install.alias.iter().cloned().collect();
        if let Some(unit) = self.get_mut(idx) {
            unit.aliases = aliases.clone();
            unit.config = Some(config);
        }
        for alias in aliases {
            self.names.insert(alias, idx);
        }
        self.apply_raw_dependencies(idx, &name, kind, &raw_deps)?;
        Ok(())
    }

    /// Used when the loader discovers two stub names refer to the same
    /// real unit (spec.md §4.3): redirects every `names` entry and every
    /// inbound dependency edge pointing at `alias` onto `canonical`, then
    /// marks `alias` as `Merged`. `alias` stays in the arena rather than
    /// being removed — a `UnitIdx` held across the merge still resolves,
    /// it just carries no edges or job of its own from this point on.
    /// A no-op if either side is stale or they're already the same unit.
    pub fn merge(&mut self, alias: UnitIdx, canonical: UnitIdx) {
        if alias == canonical {
            return;
        }
        if self.get(alias).is_none() || self.get(canonical).is_none() {
            return;
        }

        for idx in self.names.values_mut() {
            if *idx == alias {
                *idx = canonical;
            }
        }

        let reverse: Vec<(DependencyKind, UnitIdx)> = self
            .get(alias)
            .map(|u| u.reverse_dependencies.iter().flat_map(|(k, set)| set.iter().map(move |from| (*k, *from))).collect())
            .unwrap_or_default();

        for (kind, from) in reverse {
            let reason = self
                .get(from)
                .and_then(|u| u.dependency_reasons.get(&(kind, alias)).copied())
                .unwrap_or(DependencyReason::Runtime);
            if let Some(from_unit) = self.get_mut(from) {
                if let Some(set) = from_unit.dependencies.get_mut(&kind) {
                    set.remove(&alias);
                }
                from_unit.dependency_reasons.remove(&(kind, alias));
            }
            let _ = self.add_dependency(from, kind, canonical, reason);
        }

        if let Some(alias_unit) = self.get_mut(alias) {
            alias_unit.dependencies.clear();
            alias_unit.reverse_dependencies.clear();
            alias_unit.dependency_reasons.clear();
            alias_unit.load_state = LoadState::Merged;
            alias_unit.active_state = ActiveState::Inactive;
            alias_unit.job = None;
            alias_unit.refs = 0;
        }
    }

    /// Drop every unit eligible for collection (spec.md §3 Lifecycle:
    /// inactive, no job, no refs) whose removal doesn't dangle a live
    /// dependent's edge. Run as an idle callback by the engine, not
    /// inline with job completion (spec.md §9 Open Question).
    pub fn garbage_collect(&mut self) -> Vec<UnitIdx> {
        let candidates: Vec<UnitIdx> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, s)| {
                let unit = s.unit.as_ref()?;
                let idx = UnitIdx { slot: slot as u32, generation: s.generation };
                unit.gc_eligible().then_some(idx)
            })
            .collect();

        let mut collected = Vec::new();
        for idx in candidates {
            if self.get(idx).is_none() {
                continue;
            }
            self.remove_dependencies_with_reason(idx, ReasonMask::all());
            let Some(slot) = self.slots.get_mut(idx.slot as usize) else { continue };
            let Some(unit) = slot.unit.take() else { continue };
            self.names.retain(|_, v| *v != idx);
            self.free.push(idx.slot);
            let _ = unit;
            collected.push(idx);
        }
        collected
    }
}

fn kind_of(name: &str) -> Result<UnitKind, LoadError> {
    let suffix = name.rsplit_once('.').map(|(_, s)| s).unwrap_or("");
    UnitKind::from_suffix(suffix).ok_or_else(|| LoadError::UnknownKind {
        name: name.to_string(),
        suffix: suffix.to_string(),
    })
}

fn setting_to_kind(setting: &str) -> Option<DependencyKind> {
    use DependencyKind::*;
    Some(match setting {
        "Requires" => Requires,
        "Requisite" => Requisite,
        "Wants" => Wants,
        "BindsTo" => BindsTo,
        "PartOf" => PartOf,
        "Conflicts" => Conflicts,
        "Before" => Before,
        "After" => After,
        "OnFailure" => OnFailure,
        "PropagatesReloadTo" => PropagatesReloadTo,
        "PropagatesStopTo" => PropagatesStopTo,
        _ => return None,
    })
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
