//! The tracker's single mutation surface.
//!
//! A `Store` owns the current `AppData` value. Each mutation computes a new
//! value from the pure functions in [`crate::plans`] and [`crate::catalog`],
//! swaps it in, and writes it through to the backing database if there is
//! one.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::catalog::{self, CapabilityPatch, MilestonePatch, NewCapability};
use crate::error::ConsistencyError;
use crate::model::{AppData, Capability, CapabilityStatus, PhaseDates, RagStatus, RoadmapPlan};
use crate::persist;
use crate::plans;

pub type Clock = Box<dyn FnMut() -> DateTime<Utc>>;

pub struct Store {
    data: AppData,
    conn: Option<Connection>,
    clock: Clock,
    load_error: Option<String>,
}

/// A capability paired with its active plan, as the timelines draw it.
#[derive(Debug, Clone)]
pub struct Lane {
    pub capability_id: String,
    pub name: String,
    pub status: CapabilityStatus,
    pub rag_status: RagStatus,
    pub plan: Option<RoadmapPlan>,
}

impl Store {
    /// A store with no backing database.
    pub fn in_memory() -> Self {
        Self::from_data(AppData::default())
    }

    pub fn from_data(data: AppData) -> Self {
        Self {
            data,
            conn: None,
            clock: Box::new(Utc::now),
            load_error: None,
        }
    }

    /// Load the stored aggregate from `conn` and write every change back to it.
    ///
    /// Unreadable stored data does not fail: the store starts empty and
    /// [`Store::load_error`] describes what went wrong.
    pub fn open(conn: Connection) -> Result<Self> {
        let loaded = persist::load(&conn)?;
        let load_error = loaded.error.map(|e| format!("{e:#}"));
        let store = Self {
            data: loaded.data,
            conn: Some(conn),
            clock: Box::new(Utc::now),
            load_error,
        };
        store.warn_inconsistencies();
        Ok(store)
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Re-read the database, picking up writes from other processes.
    pub fn reload(&mut self) -> Result<()> {
        let Some(conn) = self.conn.as_ref() else {
            return Ok(());
        };
        let loaded = persist::load(conn)?;
        self.data = loaded.data;
        self.load_error = loaded.error.map(|e| format!("{e:#}"));
        self.warn_inconsistencies();
        Ok(())
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn data(&self) -> &AppData {
        &self.data
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.data.capabilities
    }

    pub fn plans(&self) -> &[RoadmapPlan] {
        &self.data.roadmap_plans
    }

    fn now(&mut self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn commit(&mut self, next: AppData) -> Result<()> {
        self.data = next;
        self.load_error = None;
        if let Some(conn) = self.conn.as_ref() {
            persist::save(conn, &self.data)?;
        }
        Ok(())
    }

    fn warn_inconsistencies(&self) {
        for problem in plans::check_consistency(&self.data.roadmap_plans) {
            log::warn!("{problem}");
        }
    }

    /// Replace everything, e.g. from an imported file.
    pub fn replace_all(&mut self, data: AppData) -> Result<()> {
        log::info!(
            "replacing tracker data: {} capabilities, {} milestones, {} plans",
            data.capabilities.len(),
            data.milestones.len(),
            data.roadmap_plans.len()
        );
        self.commit(data)
    }

    // Plans

    /// Record a new schedule for `capability_id` as its next version.
    ///
    /// The capability is not required to exist.
    pub fn add_plan(&mut self, capability_id: &str, phases: PhaseDates) -> Result<String> {
        let id = new_id();
        let now = self.now();
        let next = AppData {
            roadmap_plans: plans::add_plan(
                &self.data.roadmap_plans,
                capability_id,
                phases,
                id.clone(),
                now,
            ),
            ..self.data.clone()
        };
        self.commit(next)?;
        log::debug!("added plan {id} for capability {capability_id}");
        Ok(id)
    }

    /// Same as [`Store::add_plan`]: an update is always a new version.
    pub fn update_plan(&mut self, capability_id: &str, phases: PhaseDates) -> Result<String> {
        self.add_plan(capability_id, phases)
    }

    /// Delete a plan and resequence its capability's history.
    /// Returns `false` when there was no such plan.
    pub fn delete_plan(&mut self, plan_id: &str) -> Result<bool> {
        let Some(remaining) = plans::delete_plan(&self.data.roadmap_plans, plan_id) else {
            log::debug!("delete of unknown plan {plan_id} ignored");
            return Ok(false);
        };
        let next = AppData {
            roadmap_plans: remaining,
            ..self.data.clone()
        };
        self.commit(next)?;
        log::debug!("deleted plan {plan_id}");
        Ok(true)
    }

    pub fn history(&self, capability_id: &str) -> Vec<&RoadmapPlan> {
        plans::history(&self.data.roadmap_plans, capability_id)
    }

    pub fn active_plan(&self, capability_id: &str) -> Result<Option<&RoadmapPlan>, ConsistencyError> {
        plans::active_plan(&self.data.roadmap_plans, capability_id)
    }

    pub fn plan(&self, plan_id: &str) -> Option<&RoadmapPlan> {
        plans::find_plan(&self.data.roadmap_plans, plan_id)
    }

    pub fn check(&self) -> Vec<ConsistencyError> {
        plans::check_consistency(&self.data.roadmap_plans)
    }

    /// [`Store::check`], refusing to vouch for data that failed to load.
    pub fn verify(&self) -> Result<Vec<ConsistencyError>> {
        if let Some(err) = &self.load_error {
            bail!("stored data could not be read: {err}");
        }
        Ok(self.check())
    }

    /// Every capability with its active plan, in catalog order.
    pub fn lanes(&self) -> Result<Vec<Lane>> {
        self.data
            .capabilities
            .iter()
            .map(|cap| -> Result<Lane> {
                let plan = self
                    .active_plan(&cap.id)
                    .with_context(|| format!("cannot draw capability '{}'", cap.name))?
                    .cloned();
                Ok(Lane {
                    capability_id: cap.id.clone(),
                    name: cap.name.clone(),
                    status: cap.status,
                    rag_status: cap.rag_status,
                    plan,
                })
            })
            .collect()
    }

    // Capabilities and milestones

    pub fn add_capability(&mut self, new: NewCapability) -> Result<String> {
        let id = new_id();
        let now = self.now();
        let next = catalog::add_capability(&self.data, new, id.clone(), now)?;
        self.commit(next)?;
        log::debug!("added capability {id}");
        Ok(id)
    }

    pub fn update_capability(&mut self, id: &str, patch: CapabilityPatch) -> Result<()> {
        let now = self.now();
        let next = catalog::update_capability(&self.data, id, patch, now)?;
        self.commit(next)?;
        log::debug!("updated capability {id}");
        Ok(())
    }

    /// Delete a capability and its plans. Returns `false` if it did not exist.
    pub fn delete_capability(&mut self, id: &str) -> Result<bool> {
        let Some(next) = catalog::delete_capability(&self.data, id) else {
            return Ok(false);
        };
        self.commit(next)?;
        log::debug!("deleted capability {id}");
        Ok(true)
    }

    pub fn add_milestone(&mut self, name: &str, date: DateTime<Utc>) -> Result<String> {
        let id = new_id();
        let now = self.now();
        let next = catalog::add_milestone(&self.data, name, date, id.clone(), now)?;
        self.commit(next)?;
        log::debug!("added milestone {id}");
        Ok(id)
    }

    pub fn update_milestone(&mut self, id: &str, patch: MilestonePatch) -> Result<()> {
        let now = self.now();
        let next = catalog::update_milestone(&self.data, id, patch, now)?;
        self.commit(next)?;
        log::debug!("updated milestone {id}");
        Ok(())
    }

    pub fn delete_milestone(&mut self, id: &str) -> Result<bool> {
        let Some(next) = catalog::delete_milestone(&self.data, id) else {
            return Ok(false);
        };
        self.commit(next)?;
        log::debug!("deleted milestone {id}");
        Ok(true)
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::{Duration, NaiveDate, TimeZone};

    /// A clock that advances one minute per call.
    fn ticking_clock() -> Clock {
        let mut now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Box::new(move || {
            now += Duration::minutes(1);
            now
        })
    }

    fn dates(month: u32) -> PhaseDates {
        PhaseDates::sequential(NaiveDate::from_ymd_opt(2025, month, 1).unwrap())
    }

    fn store() -> Store {
        Store::in_memory().with_clock(ticking_clock())
    }

    #[test]
    fn add_update_delete_scenario() {
        let mut s = store();
        let c1 = s.add_capability(NewCapability::named("C1")).unwrap();
        assert!(s.active_plan(&c1).unwrap().is_none());

        let p1 = s.add_plan(&c1, dates(1)).unwrap();
        let plan = s.active_plan(&c1).unwrap().unwrap();
        assert_eq!((plan.id.as_str(), plan.version), (p1.as_str(), 1));

        let p2 = s.update_plan(&c1, dates(2)).unwrap();
        assert_eq!(s.plan(&p2).unwrap().version, 2);
        assert!(s.plan(&p2).unwrap().is_active);
        assert!(!s.plan(&p1).unwrap().is_active);

        assert!(s.delete_plan(&p2).unwrap());
        let plan = s.active_plan(&c1).unwrap().unwrap();
        assert_eq!(plan.id, p1);
        assert_eq!(plan.version, 1);
        assert!(s.check().is_empty());
    }

    #[test]
    fn update_never_mutates_existing_rows() {
        let mut s = store();
        let p1 = s.add_plan("c1", dates(1)).unwrap();
        let before = s.plan(&p1).unwrap().phases;
        s.update_plan("c1", dates(6)).unwrap();
        assert_eq!(s.plan(&p1).unwrap().phases, before);
        assert_eq!(s.history("c1").len(), 2);
    }

    #[test]
    fn delete_unknown_plan_is_noop() {
        let mut s = store();
        s.add_plan("c1", dates(1)).unwrap();
        let before = s.data().clone();
        assert!(!s.delete_plan("missing").unwrap());
        assert_eq!(s.data(), &before);
    }

    #[test]
    fn capability_delete_cascades() {
        let mut s = store();
        let c1 = s.add_capability(NewCapability::named("C1")).unwrap();
        s.add_plan(&c1, dates(1)).unwrap();
        s.add_plan(&c1, dates(2)).unwrap();
        assert!(s.delete_capability(&c1).unwrap());
        assert!(s.plans().is_empty());
        assert!(!s.delete_capability(&c1).unwrap());
    }

    #[test]
    fn validation_failure_leaves_store_unchanged() {
        let mut s = store();
        s.add_capability(NewCapability::named("C1")).unwrap();
        let before = s.data().clone();
        assert!(s.add_capability(NewCapability::named("")).is_err());
        assert!(s.add_milestone(" ", Utc::now()).is_err());
        assert_eq!(s.data(), &before);
    }

    #[test]
    fn plans_for_unknown_capability_are_accepted() {
        // Known gap: plan creation does not check the capability exists.
        let mut s = store();
        s.add_plan("ghost", dates(1)).unwrap();
        assert_eq!(catalog::orphaned_plan_ids(s.data()).len(), 1);
    }

    #[test]
    fn lanes_pair_capabilities_with_active_plans() {
        let mut s = store();
        let c1 = s.add_capability(NewCapability::named("C1")).unwrap();
        let c2 = s.add_capability(NewCapability::named("C2")).unwrap();
        s.add_plan(&c1, dates(1)).unwrap();
        let p = s.add_plan(&c1, dates(3)).unwrap();
        let lanes = s.lanes().unwrap();
        assert_eq!(lanes.len(), 2);
        assert_eq!(lanes[0].plan.as_ref().unwrap().id, p);
        assert_eq!(lanes[1].capability_id, c2);
        assert!(lanes[1].plan.is_none());
    }

    #[test]
    fn lanes_report_corrupt_active_flags() {
        let mut s = store();
        let c1 = s.add_capability(NewCapability::named("C1")).unwrap();
        s.add_plan(&c1, dates(1)).unwrap();
        s.add_plan(&c1, dates(2)).unwrap();
        let mut data = s.data().clone();
        for plan in &mut data.roadmap_plans {
            plan.is_active = true;
        }
        s.replace_all(data).unwrap();
        assert!(s.lanes().is_err());
        assert_eq!(s.check().len(), 1);
    }

    #[test]
    fn mutations_write_through_to_database() {
        let conn = db::open_memory().unwrap();
        let mut s = Store::open(conn).unwrap().with_clock(ticking_clock());
        let c1 = s.add_capability(NewCapability::named("C1")).unwrap();
        s.add_plan(&c1, dates(1)).unwrap();

        let conn = s.conn.take().unwrap();
        let reopened = Store::open(conn).unwrap();
        assert_eq!(reopened.data(), s.data());
    }

    #[test]
    fn malformed_storage_opens_empty_with_error() {
        let conn = db::open_memory().unwrap();
        db::set_item(&conn, persist::STORAGE_KEY, "[]").unwrap();
        let mut s = Store::open(conn).unwrap().with_clock(ticking_clock());
        assert!(s.load_error().is_some());
        assert!(s.data().is_empty());

        // The next successful save replaces the bad blob.
        s.add_capability(NewCapability::named("C1")).unwrap();
        assert!(s.load_error().is_none());
        assert!(s.verify().unwrap().is_empty());
        s.reload().unwrap();
        assert_eq!(s.capabilities().len(), 1);
    }

    #[test]
    fn verify_refuses_unreadable_data() {
        let conn = db::open_memory().unwrap();
        db::set_item(&conn, persist::STORAGE_KEY, "not json").unwrap();
        let s = Store::open(conn).unwrap();
        assert!(s.check().is_empty());
        let err = s.verify().unwrap_err();
        assert!(err.to_string().contains("could not be read"));
    }

    #[test]
    fn verify_reports_consistency_problems() {
        let mut s = store();
        s.add_plan("c1", dates(1)).unwrap();
        s.add_plan("c1", dates(2)).unwrap();
        let mut data = s.data().clone();
        data.roadmap_plans[1].version = 5;
        s.replace_all(data).unwrap();
        assert_eq!(s.verify().unwrap().len(), 1);
    }

    #[test]
    fn catalog_mutations_write_through() {
        let conn = db::open_memory().unwrap();
        let mut s = Store::open(conn).unwrap().with_clock(ticking_clock());
        let c1 = s.add_capability(NewCapability::named("C1")).unwrap();
        let m1 = s.add_milestone("Go-live", Utc::now()).unwrap();
        s.update_capability(
            &c1,
            CapabilityPatch {
                milestone: Some(Some("Go-live".into())),
                ..Default::default()
            },
        )
        .unwrap();
        s.update_milestone(
            &m1,
            MilestonePatch {
                name: Some("Launch".into()),
                date: None,
            },
        )
        .unwrap();
        assert!(s.delete_milestone(&m1).unwrap());
        assert!(!s.delete_milestone(&m1).unwrap());

        let conn = s.conn.take().unwrap();
        let reopened = Store::open(conn).unwrap();
        assert!(reopened.data().milestones.is_empty());
        assert_eq!(
            reopened.capabilities()[0].milestone.as_deref(),
            Some("Go-live")
        );
    }
}
