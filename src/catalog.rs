//! Capabilities and milestones.
//!
//! Like the plan functions, these take the current aggregate and return a
//! new one; the store swaps it in.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use crate::model::{AppData, Capability, CapabilityStatus, Milestone, RagStatus};
use crate::plans;
use crate::validate::validate_name;

#[derive(Debug, Clone)]
pub struct NewCapability {
    pub name: String,
    pub lead: String,
    pub sme: String,
    pub ba: String,
    pub status: CapabilityStatus,
    pub rag_status: RagStatus,
    pub notes: String,
    pub milestone: Option<String>,
}

impl NewCapability {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lead: String::new(),
            sme: String::new(),
            ba: String::new(),
            status: CapabilityStatus::NotStarted,
            rag_status: RagStatus::Green,
            notes: String::new(),
            milestone: None,
        }
    }
}

/// Fields to change on a capability; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct CapabilityPatch {
    pub name: Option<String>,
    pub lead: Option<String>,
    pub sme: Option<String>,
    pub ba: Option<String>,
    pub status: Option<CapabilityStatus>,
    pub rag_status: Option<RagStatus>,
    pub notes: Option<String>,
    /// `Some(None)` clears the milestone reference.
    pub milestone: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct MilestonePatch {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

pub fn add_capability(
    data: &AppData,
    new: NewCapability,
    id: String,
    now: DateTime<Utc>,
) -> Result<AppData> {
    let name = validate_name("capability", &new.name)?;
    let mut next = data.clone();
    next.capabilities.push(Capability {
        id,
        name,
        lead: new.lead,
        sme: new.sme,
        ba: new.ba,
        status: new.status,
        rag_status: new.rag_status,
        notes: new.notes,
        milestone: new.milestone.filter(|m| !m.trim().is_empty()),
        created_at: now,
        updated_at: now,
    });
    Ok(next)
}

pub fn update_capability(
    data: &AppData,
    id: &str,
    patch: CapabilityPatch,
    now: DateTime<Utc>,
) -> Result<AppData> {
    let name = patch
        .name
        .as_deref()
        .map(|n| validate_name("capability", n))
        .transpose()?;
    let mut next = data.clone();
    let Some(cap) = next.capabilities.iter_mut().find(|c| c.id == id) else {
        bail!("capability '{id}' not found");
    };
    if let Some(name) = name {
        cap.name = name;
    }
    if let Some(lead) = patch.lead {
        cap.lead = lead;
    }
    if let Some(sme) = patch.sme {
        cap.sme = sme;
    }
    if let Some(ba) = patch.ba {
        cap.ba = ba;
    }
    if let Some(status) = patch.status {
        cap.status = status;
    }
    if let Some(rag) = patch.rag_status {
        cap.rag_status = rag;
    }
    if let Some(notes) = patch.notes {
        cap.notes = notes;
    }
    if let Some(milestone) = patch.milestone {
        cap.milestone = milestone.filter(|m| !m.trim().is_empty());
    }
    cap.updated_at = now;
    Ok(next)
}

/// Remove a capability and every plan that belongs to it.
/// Returns `None` if no capability has `id`.
pub fn delete_capability(data: &AppData, id: &str) -> Option<AppData> {
    if !data.capabilities.iter().any(|c| c.id == id) {
        return None;
    }
    Some(AppData {
        capabilities: data
            .capabilities
            .iter()
            .filter(|c| c.id != id)
            .cloned()
            .collect(),
        milestones: data.milestones.clone(),
        roadmap_plans: plans::remove_capability_plans(&data.roadmap_plans, id),
    })
}

pub fn add_milestone(
    data: &AppData,
    name: &str,
    date: DateTime<Utc>,
    id: String,
    now: DateTime<Utc>,
) -> Result<AppData> {
    let name = validate_name("milestone", name)?;
    let mut next = data.clone();
    next.milestones.push(Milestone {
        id,
        name,
        date,
        created_at: now,
        updated_at: now,
    });
    Ok(next)
}

/// Renaming does not touch capabilities that refer to the old name.
pub fn update_milestone(
    data: &AppData,
    id: &str,
    patch: MilestonePatch,
    now: DateTime<Utc>,
) -> Result<AppData> {
    let name = patch
        .name
        .as_deref()
        .map(|n| validate_name("milestone", n))
        .transpose()?;
    let mut next = data.clone();
    let Some(milestone) = next.milestones.iter_mut().find(|m| m.id == id) else {
        bail!("milestone '{id}' not found");
    };
    if let Some(name) = name {
        milestone.name = name;
    }
    if let Some(date) = patch.date {
        milestone.date = date;
    }
    milestone.updated_at = now;
    Ok(next)
}

/// Returns `None` if no milestone has `id`. Capabilities keep their reference.
pub fn delete_milestone(data: &AppData, id: &str) -> Option<AppData> {
    if !data.milestones.iter().any(|m| m.id == id) {
        return None;
    }
    let mut next = data.clone();
    next.milestones.retain(|m| m.id != id);
    Some(next)
}

/// Look a capability up by id, or failing that by exact name.
pub fn find_capability<'a>(data: &'a AppData, key: &str) -> Result<&'a Capability> {
    if let Some(cap) = data.capabilities.iter().find(|c| c.id == key) {
        return Ok(cap);
    }
    let mut by_name = data.capabilities.iter().filter(|c| c.name == key);
    match (by_name.next(), by_name.next()) {
        (Some(cap), None) => Ok(cap),
        (Some(_), Some(_)) => bail!("capability name '{key}' is ambiguous; use its id"),
        (None, _) => bail!("capability '{key}' not found"),
    }
}

/// Look a milestone up by id, or failing that by exact name.
pub fn find_milestone<'a>(data: &'a AppData, key: &str) -> Result<&'a Milestone> {
    if let Some(m) = data.milestones.iter().find(|m| m.id == key) {
        return Ok(m);
    }
    let mut by_name = data.milestones.iter().filter(|m| m.name == key);
    match (by_name.next(), by_name.next()) {
        (Some(m), None) => Ok(m),
        (Some(_), Some(_)) => bail!("milestone name '{key}' is ambiguous; use its id"),
        (None, _) => bail!("milestone '{key}' not found"),
    }
}

/// Outcome of following a capability's milestone name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MilestoneRef<'a> {
    Unset,
    Resolved(&'a Milestone),
    /// The capability names a milestone that no longer exists.
    Dangling(&'a str),
}

pub fn resolve_milestone<'a>(data: &'a AppData, capability: &'a Capability) -> MilestoneRef<'a> {
    match capability.milestone.as_deref() {
        None => MilestoneRef::Unset,
        Some(name) => data
            .milestones
            .iter()
            .find(|m| m.name == name)
            .map_or(MilestoneRef::Dangling(name), MilestoneRef::Resolved),
    }
}

/// Plans whose capability id matches no capability.
pub fn orphaned_plan_ids(data: &AppData) -> Vec<&str> {
    data.roadmap_plans
        .iter()
        .filter(|p| !data.capabilities.iter().any(|c| c.id == p.capability_id))
        .map(|p| p.id.as_str())
        .collect()
}
