//! Roadmap plan versioning.
//!
//! Every function here is a pure transform: it reads a plan slice and, for
//! mutations, returns a new collection. Callers swap the whole collection in
//! one assignment, so no intermediate state is ever visible.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::ConsistencyError;
use crate::model::{PhaseDates, RoadmapPlan};

fn plans_for<'a>(
    plans: &'a [RoadmapPlan],
    capability_id: &'a str,
) -> impl Iterator<Item = &'a RoadmapPlan> + 'a {
    plans.iter().filter(move |p| p.capability_id == capability_id)
}

/// Append a new active version for `capability_id`, deactivating the others.
///
/// The new version is one more than the number of plans the capability
/// already has. The capability id is not checked against any catalog.
pub fn add_plan(
    plans: &[RoadmapPlan],
    capability_id: &str,
    phases: PhaseDates,
    id: String,
    now: DateTime<Utc>,
) -> Vec<RoadmapPlan> {
    let existing = plans_for(plans, capability_id).count();
    let mut next: Vec<RoadmapPlan> = plans
        .iter()
        .map(|p| {
            if p.capability_id == capability_id && p.is_active {
                RoadmapPlan {
                    is_active: false,
                    ..p.clone()
                }
            } else {
                p.clone()
            }
        })
        .collect();
    next.push(RoadmapPlan {
        id,
        capability_id: capability_id.to_string(),
        version: existing as u32 + 1,
        phases,
        is_active: true,
        created_at: now,
    });
    next
}

/// Remove a plan and resequence the survivors of its capability.
///
/// Returns `None` when no plan has `plan_id`. Survivors are renumbered
/// 1..=M by `created_at` (stable for equal timestamps). If the removed plan
/// was active, the most recently created survivor becomes active.
pub fn delete_plan(plans: &[RoadmapPlan], plan_id: &str) -> Option<Vec<RoadmapPlan>> {
    let removed = plans.iter().find(|p| p.id == plan_id)?;
    let capability_id = removed.capability_id.clone();
    let was_active = removed.is_active;

    let mut remaining: Vec<RoadmapPlan> =
        plans.iter().filter(|p| p.id != plan_id).cloned().collect();

    let mut siblings: Vec<usize> = remaining
        .iter()
        .enumerate()
        .filter(|(_, p)| p.capability_id == capability_id)
        .map(|(i, _)| i)
        .collect();
    siblings.sort_by_key(|&i| remaining[i].created_at);

    for (n, &i) in siblings.iter().enumerate() {
        remaining[i].version = n as u32 + 1;
    }

    if was_active {
        if let Some(&latest) = siblings.last() {
            for &i in &siblings {
                remaining[i].is_active = false;
            }
            remaining[latest].is_active = true;
        }
    }

    Some(remaining)
}

/// Drop every plan belonging to `capability_id`.
pub fn remove_capability_plans(plans: &[RoadmapPlan], capability_id: &str) -> Vec<RoadmapPlan> {
    plans
        .iter()
        .filter(|p| p.capability_id != capability_id)
        .cloned()
        .collect()
}

/// All plans for `capability_id`, newest version first.
pub fn history<'a>(plans: &'a [RoadmapPlan], capability_id: &str) -> Vec<&'a RoadmapPlan> {
    let mut out: Vec<&RoadmapPlan> = plans
        .iter()
        .filter(|p| p.capability_id == capability_id)
        .collect();
    out.sort_by(|a, b| b.version.cmp(&a.version));
    out
}

/// The active plan for `capability_id`, if any.
///
/// More than one active plan means the stored data is corrupt; that is
/// reported instead of picking one.
pub fn active_plan<'a>(
    plans: &'a [RoadmapPlan],
    capability_id: &str,
) -> Result<Option<&'a RoadmapPlan>, ConsistencyError> {
    let mut active = plans
        .iter()
        .filter(|p| p.capability_id == capability_id && p.is_active);
    let first = active.next();
    let extra = active.count();
    if extra > 0 {
        return Err(ConsistencyError::MultipleActivePlans {
            capability_id: capability_id.to_string(),
            count: extra + 1,
        });
    }
    Ok(first)
}

pub fn find_plan<'a>(plans: &'a [RoadmapPlan], plan_id: &str) -> Option<&'a RoadmapPlan> {
    plans.iter().find(|p| p.id == plan_id)
}

pub fn find_version<'a>(
    plans: &'a [RoadmapPlan],
    capability_id: &str,
    version: u32,
) -> Option<&'a RoadmapPlan> {
    plans
        .iter()
        .find(|p| p.capability_id == capability_id && p.version == version)
}

/// Check every capability's plans for version gaps and active-plan count.
pub fn check_consistency(plans: &[RoadmapPlan]) -> Vec<ConsistencyError> {
    let mut by_capability: BTreeMap<&str, Vec<&RoadmapPlan>> = BTreeMap::new();
    for plan in plans {
        by_capability
            .entry(plan.capability_id.as_str())
            .or_default()
            .push(plan);
    }

    let mut problems = Vec::new();
    for (capability_id, group) in by_capability {
        let active = group.iter().filter(|p| p.is_active).count();
        if active > 1 {
            problems.push(ConsistencyError::MultipleActivePlans {
                capability_id: capability_id.to_string(),
                count: active,
            });
        } else if active == 0 {
            problems.push(ConsistencyError::NoActivePlan {
                capability_id: capability_id.to_string(),
                count: group.len(),
            });
        }

        let mut versions: Vec<u32> = group.iter().map(|p| p.version).collect();
        versions.sort_unstable();
        let contiguous = versions
            .iter()
            .enumerate()
            .all(|(i, &v)| v == i as u32 + 1);
        if !contiguous {
            problems.push(ConsistencyError::VersionGap {
                capability_id: capability_id.to_string(),
                versions,
                expected: group.len(),
            });
        }
    }
    problems
}
