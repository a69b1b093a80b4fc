use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::{deserialize_instant, midnight, DateRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityStatus {
    NotStarted,
    InProgress,
    Completed,
    OnHold,
}

impl CapabilityStatus {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "not-started" => Ok(Self::NotStarted),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "on-hold" => Ok(Self::OnHold),
            _ => anyhow::bail!(
                "invalid status '{s}': must be not-started, in-progress, completed, or on-hold"
            ),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::OnHold => "on-hold",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::OnHold => "On Hold",
        }
    }

    /// Display icon: .=not started, *=in progress, x=completed, ~=on hold
    pub fn icon(self) -> &'static str {
        match self {
            Self::NotStarted => ".",
            Self::InProgress => "*",
            Self::Completed => "x",
            Self::OnHold => "~",
        }
    }
}

impl fmt::Display for CapabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RagStatus {
    Red,
    Amber,
    Green,
}

impl RagStatus {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "red" => Ok(Self::Red),
            "amber" => Ok(Self::Amber),
            "green" => Ok(Self::Green),
            _ => anyhow::bail!("invalid RAG status '{s}': must be red, amber, or green"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Amber => "amber",
            Self::Green => "green",
        }
    }
}

impl fmt::Display for RagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lead: String,
    #[serde(default)]
    pub sme: String,
    #[serde(default)]
    pub ba: String,
    pub status: CapabilityStatus,
    pub rag_status: RagStatus,
    #[serde(default)]
    pub notes: String,
    /// Milestone name; not checked against the milestone collection.
    #[serde(default)]
    pub milestone: Option<String>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "deserialize_instant")]
    pub date: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Requirements,
    Design,
    Development,
    Cst,
    Uat,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Requirements,
        Phase::Design,
        Phase::Development,
        Phase::Cst,
        Phase::Uat,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Requirements => "Requirements",
            Self::Design => "Design",
            Self::Development => "Development",
            Self::Cst => "CST",
            Self::Uat => "UAT",
        }
    }

    /// Single-character fill used by the text timeline.
    pub fn glyph(self) -> char {
        match self {
            Self::Requirements => 'r',
            Self::Design => 'd',
            Self::Development => 'v',
            Self::Cst => 'c',
            Self::Uat => 'u',
        }
    }

    /// Default length used when a new schedule is laid out from a start date.
    pub fn default_days(self) -> i64 {
        match self {
            Self::Requirements => 30,
            Self::Design => 30,
            Self::Development => 90,
            Self::Cst => 30,
            Self::Uat => 30,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The ten date fields of a plan, stored flat as they are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDates {
    #[serde(deserialize_with = "deserialize_instant")]
    pub requirements_start: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub requirements_end: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub design_start: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub design_end: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub development_start: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub development_end: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub cst_start: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub cst_end: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub uat_start: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub uat_end: DateTime<Utc>,
}

impl PhaseDates {
    /// Back-to-back phases of their default lengths starting at `start`.
    pub fn sequential(start: NaiveDate) -> Self {
        let mut cursor = midnight(start);
        let mut ranges = [DateRange::new(cursor, cursor); 5];
        for (slot, phase) in ranges.iter_mut().zip(Phase::ALL) {
            let end = cursor + Duration::days(phase.default_days());
            *slot = DateRange::new(cursor, end);
            cursor = end;
        }
        Self::from_ranges(ranges)
    }

    pub fn from_ranges(ranges: [DateRange; 5]) -> Self {
        let [req, design, dev, cst, uat] = ranges;
        Self {
            requirements_start: req.start,
            requirements_end: req.end,
            design_start: design.start,
            design_end: design.end,
            development_start: dev.start,
            development_end: dev.end,
            cst_start: cst.start,
            cst_end: cst.end,
            uat_start: uat.start,
            uat_end: uat.end,
        }
    }

    pub fn range(&self, phase: Phase) -> DateRange {
        match phase {
            Phase::Requirements => DateRange::new(self.requirements_start, self.requirements_end),
            Phase::Design => DateRange::new(self.design_start, self.design_end),
            Phase::Development => DateRange::new(self.development_start, self.development_end),
            Phase::Cst => DateRange::new(self.cst_start, self.cst_end),
            Phase::Uat => DateRange::new(self.uat_start, self.uat_end),
        }
    }

    pub fn set_range(&mut self, phase: Phase, range: DateRange) {
        let (start, end) = match phase {
            Phase::Requirements => (&mut self.requirements_start, &mut self.requirements_end),
            Phase::Design => (&mut self.design_start, &mut self.design_end),
            Phase::Development => (&mut self.development_start, &mut self.development_end),
            Phase::Cst => (&mut self.cst_start, &mut self.cst_end),
            Phase::Uat => (&mut self.uat_start, &mut self.uat_end),
        };
        *start = range.start;
        *end = range.end;
    }

    pub fn ranges(&self) -> impl Iterator<Item = (Phase, DateRange)> + '_ {
        Phase::ALL.into_iter().map(|p| (p, self.range(p)))
    }

    /// Earliest start and latest end across all phases.
    pub fn span(&self) -> DateRange {
        let mut span = self.range(Phase::Requirements);
        for (_, r) in self.ranges() {
            span.start = span.start.min(r.start).min(r.end);
            span.end = span.end.max(r.end).max(r.start);
        }
        span
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapPlan {
    pub id: String,
    pub capability_id: String,
    pub version: u32,
    #[serde(flatten)]
    pub phases: PhaseDates,
    pub is_active: bool,
    #[serde(deserialize_with = "deserialize_instant")]
    pub created_at: DateTime<Utc>,
}

/// Everything the tracker persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    pub capabilities: Vec<Capability>,
    pub milestones: Vec<Milestone>,
    pub roadmap_plans: Vec<RoadmapPlan>,
}

impl AppData {
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty() && self.milestones.is_empty() && self.roadmap_plans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_round_trip() {
        for s in [
            CapabilityStatus::NotStarted,
            CapabilityStatus::InProgress,
            CapabilityStatus::Completed,
            CapabilityStatus::OnHold,
        ] {
            assert_eq!(CapabilityStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(CapabilityStatus::parse("done").is_err());
    }

    #[test]
    fn rag_parse() {
        assert_eq!(RagStatus::parse("amber").unwrap(), RagStatus::Amber);
        assert!(RagStatus::parse("Amber").is_err());
    }

    #[test]
    fn sequential_phases_are_back_to_back() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let dates = PhaseDates::sequential(start);
        assert_eq!(dates.requirements_start, midnight(start));
        assert_eq!(dates.requirements_end, dates.design_start);
        assert_eq!(dates.design_end, dates.development_start);
        assert_eq!(dates.development_end, dates.cst_start);
        assert_eq!(dates.cst_end, dates.uat_start);
        assert_eq!(
            dates.uat_end,
            midnight(start) + Duration::days(30 + 30 + 90 + 30 + 30)
        );
    }

    #[test]
    fn set_range_touches_only_that_phase() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut dates = PhaseDates::sequential(start);
        let before = dates;
        let r = DateRange::new(midnight(start), midnight(start));
        dates.set_range(Phase::Cst, r);
        assert_eq!(dates.range(Phase::Cst), r);
        assert_eq!(dates.range(Phase::Uat), before.range(Phase::Uat));
        assert_eq!(dates.range(Phase::Development), before.range(Phase::Development));
    }

    #[test]
    fn span_covers_reversed_phases() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut dates = PhaseDates::sequential(start);
        let early = midnight(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        // end before start is stored as-is
        dates.set_range(Phase::Design, DateRange::new(dates.design_start, early));
        assert_eq!(dates.span().start, early);
        assert_eq!(dates.span().end, dates.uat_end);
    }

    #[test]
    fn plan_serializes_flat_camel_case() {
        let dates = PhaseDates::sequential(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let plan = RoadmapPlan {
            id: "p1".into(),
            capability_id: "c1".into(),
            version: 1,
            phases: dates,
            is_active: true,
            created_at: dates.requirements_start,
        };
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["capabilityId"], "c1");
        assert_eq!(value["isActive"], true);
        assert_eq!(value["requirementsStart"], "2025-01-01T00:00:00Z");
        assert!(value.get("phases").is_none());
        let back: RoadmapPlan = serde_json::from_value(value).unwrap();
        assert_eq!(back, plan);
    }
}
