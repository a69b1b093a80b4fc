use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::MilestoneRef;
use crate::error::ConsistencyError;
use crate::model::{Capability, Milestone, Phase, RoadmapPlan};
use crate::store::Lane;
use crate::timeline::{self, MonthCell, TimelineConfig};
use crate::validate::phase_warnings;

/// Width of the name column in the text timeline.
const NAME_WIDTH: usize = 20;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDetail<'a> {
    #[serde(flatten)]
    pub capability: &'a Capability,
    pub milestone_date: Option<DateTime<Utc>>,
    pub milestone_missing: bool,
    pub active_plan: Option<&'a RoadmapPlan>,
    pub plan_versions: usize,
}

fn day(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

pub fn format_capability_detail(detail: &CapabilityDetail, milestone: MilestoneRef) -> String {
    let cap = detail.capability;
    let mut out = String::new();
    out.push_str(&format!("Name:        {}\n", cap.name));
    out.push_str(&format!("Id:          {}\n", cap.id));
    out.push_str(&format!("Status:      {}\n", cap.status.label()));
    out.push_str(&format!("RAG:         {}\n", cap.rag_status));
    if !cap.lead.is_empty() {
        out.push_str(&format!("Lead:        {}\n", cap.lead));
    }
    if !cap.sme.is_empty() {
        out.push_str(&format!("SME:         {}\n", cap.sme));
    }
    if !cap.ba.is_empty() {
        out.push_str(&format!("BA:          {}\n", cap.ba));
    }
    match milestone {
        MilestoneRef::Unset => {}
        MilestoneRef::Resolved(m) => {
            out.push_str(&format!("Milestone:   {} ({})\n", m.name, day(m.date)));
        }
        MilestoneRef::Dangling(name) => {
            out.push_str(&format!("Milestone:   {name} (no such milestone)\n"));
        }
    }
    out.push_str(&format!("Created:     {}\n", cap.created_at.to_rfc3339()));
    out.push_str(&format!("Updated:     {}\n", cap.updated_at.to_rfc3339()));
    if !cap.notes.is_empty() {
        out.push_str(&format!("Notes:       {}\n", cap.notes));
    }

    out.push('\n');
    match detail.active_plan {
        Some(plan) => {
            out.push_str(&format!(
                "Active plan (version {} of {}):\n",
                plan.version, detail.plan_versions
            ));
            out.push_str(&format_phases(plan));
        }
        None => out.push_str("No plan.\n"),
    }
    out
}

fn format_phases(plan: &RoadmapPlan) -> String {
    let mut out = String::new();
    for (phase, range) in plan.phases.ranges() {
        out.push_str(&format!("  {:<13}{}\n", phase.label(), range));
    }
    for warning in phase_warnings(&plan.phases) {
        out.push_str(&format!("  warning: {warning}\n"));
    }
    out
}

pub fn format_plan(plan: &RoadmapPlan) -> String {
    let mut out = String::new();
    let state = if plan.is_active { "active" } else { "superseded" };
    out.push_str(&format!("Version:     {} ({state})\n", plan.version));
    out.push_str(&format!("Id:          {}\n", plan.id));
    out.push_str(&format!("Created:     {}\n", plan.created_at.to_rfc3339()));
    out.push_str(&format_phases(plan));
    out
}

pub fn format_capability_list(capabilities: &[Capability], plans: &[RoadmapPlan]) -> String {
    let mut out = String::new();
    for cap in capabilities {
        let versions = plans.iter().filter(|p| p.capability_id == cap.id).count();
        let plan_info = match versions {
            0 => String::new(),
            1 => "  1 plan".to_string(),
            n => format!("  {n} plans"),
        };
        out.push_str(&format!(
            "{} {} [{}]{}\n",
            cap.status.icon(),
            cap.name,
            cap.rag_status,
            plan_info
        ));
    }
    out
}

/// One line per version, newest first as given.
pub fn format_history(history: &[&RoadmapPlan]) -> String {
    let mut out = String::new();
    for plan in history {
        let marker = if plan.is_active { "*" } else { " " };
        let span = plan.phases.span();
        out.push_str(&format!(
            "{marker} v{:<3} {}  created {}\n",
            plan.version,
            span,
            plan.created_at.format("%Y-%m-%d %H:%M")
        ));
    }
    out
}

pub fn format_milestones(milestones: &[Milestone]) -> String {
    let mut sorted: Vec<&Milestone> = milestones.iter().collect();
    sorted.sort_by_key(|m| m.date);
    let mut out = String::new();
    for m in sorted {
        out.push_str(&format!("{}  {}\n", day(m.date), m.name));
    }
    out
}

pub fn format_problems(problems: &[ConsistencyError], orphaned: &[&str]) -> String {
    let mut out = String::new();
    for p in problems {
        out.push_str(&format!("error: {p}\n"));
    }
    for id in orphaned {
        out.push_str(&format!("warning: plan {id} belongs to no capability\n"));
    }
    out
}

fn fit(name: &str, width: usize) -> String {
    let count = name.chars().count();
    if count <= width {
        format!("{name:<width$}")
    } else {
        let cut: String = name.chars().take(width.saturating_sub(1)).collect();
        format!("{cut}~")
    }
}

/// Full label when it fits with a space to spare, otherwise the month alone.
fn header_label(cell: &MonthCell) -> String {
    let width = cell.width as usize;
    if cell.label.chars().count() < width {
        fit(&cell.label, width)
    } else {
        fit(&cell.first_day.format("%b").to_string(), width)
    }
}

/// The characters of one lane's bar, `width` cells wide.
/// Later phases overwrite earlier ones where they overlap.
pub fn lane_cells(plan: &RoadmapPlan, config: &TimelineConfig, width: u16) -> Vec<Option<Phase>> {
    let mut cells = vec![None; usize::from(width)];
    for bar in timeline::plan_bars(plan, &config.window) {
        if let Some((first, len)) = bar.position.to_columns(width) {
            let end = usize::from(first + len).min(cells.len());
            for cell in &mut cells[usize::from(first)..end] {
                *cell = Some(bar.phase);
            }
        }
    }
    cells
}

/// Render lanes as a fixed-width Gantt chart under a month header.
pub fn format_timeline(lanes: &[Lane], config: &TimelineConfig, now: DateTime<Utc>) -> String {
    let grid = config.grid();
    let width = timeline::content_width(&grid);
    let today = timeline::today_marker(now, &config.window)
        .and_then(|f| timeline::fraction_to_column(f, width));

    let mut out = String::new();
    out.push_str(&" ".repeat(NAME_WIDTH + 1));
    for cell in &grid {
        out.push_str(&header_label(cell));
    }
    out.push('\n');

    for lane in lanes {
        out.push_str(&fit(&lane.name, NAME_WIDTH));
        out.push(' ');
        let cells = match &lane.plan {
            Some(plan) => lane_cells(plan, config, width),
            None => vec![None; usize::from(width)],
        };
        for (i, cell) in cells.iter().enumerate() {
            let ch = match cell {
                Some(phase) => phase.glyph(),
                None if today == Some(i as u16) => '|',
                None => '.',
            };
            out.push(ch);
        }
        if lane.plan.is_none() {
            out.push_str("  (no plan)");
        }
        out.push('\n');
    }

    out.push('\n');
    let legend: Vec<String> = Phase::ALL
        .iter()
        .map(|p| format!("{}={}", p.glyph(), p.label()))
        .collect();
    out.push_str(&legend.join("  "));
    out.push('\n');
    out
}
