// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// unitmaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

use super::entry::{Job, JobConf, JobInfo, JobKind, JobResult};
use super::slot::{JobInstall, JobSlot};
use crate::unit::{DataManager, JobMode, UnitDb, UnitX};
use core::error::*;
use core::unit::UnitRelationAtom;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// What one install did to the table, for callers interested in the delta.
#[derive(Default)]
pub(super) struct JobChanges {
    pub(super) adds: Vec<Rc<Job>>,
    pub(super) dels: Vec<Rc<Job>>,
    pub(super) updates: Vec<Rc<Job>>,
}

pub(super) struct JobTable {
    // associated objects
    db: Rc<UnitDb>,
    events: Rc<event::Events>,
    dm: Rc<DataManager>,

    // owned objects
    ids: Cell<u128>,
    t_id: RefCell<HashMap<u128, Rc<Job>>>, // job-id uniqueness
    t_unit: RefCell<HashMap<Rc<UnitX>, Rc<JobSlot>>>,
}

impl JobTable {
    pub(super) fn new(
        dbr: &Rc<UnitDb>,
        eventsr: &Rc<event::Events>,
        dmr: &Rc<DataManager>,
    ) -> JobTable {
        JobTable {
            db: Rc::clone(dbr),
            events: Rc::clone(eventsr),
            dm: Rc::clone(dmr),
            ids: Cell::new(0),
            t_id: RefCell::new(HashMap::new()),
            t_unit: RefCell::new(HashMap::new()),
        }
    }

    pub(super) fn clear(&self) {
        for (_, job) in self.t_id.borrow().iter() {
            job.clear();
        }
        self.t_id.borrow_mut().clear();
        self.t_unit.borrow_mut().clear();
        self.ids.set(0);
    }

    /// Allocate a job for the mapped config and put it into the unit's
    /// slot. Isolating modes first sweep every other unit's queue.
    pub(super) fn install(&self, config: &JobConf, mode: JobMode) -> Result<JobChanges> {
        let unit = config.get_unit();
        let mut changes = JobChanges::default();

        let job = self.alloc(config);
        job.init_attr(mode);

        let slot = self.slot_pad(Rc::clone(unit));
        match slot.install(Rc::clone(&job), mode)? {
            JobInstall::Installed(new) => {
                self.t_id.borrow_mut().insert(new.get_id(), Rc::clone(&new));
                changes.adds.push(new);
            }
            JobInstall::Merged(old) => {
                // the fresh job dissolved into the waiting one
                changes.updates.push(old);
            }
            JobInstall::Replaced(new, old) => {
                let mut t_id = self.t_id.borrow_mut();
                t_id.remove(&old.get_id());
                t_id.insert(new.get_id(), Rc::clone(&new));
                changes.adds.push(new);
                changes.dels.push(old);
            }
        }

        if matches!(mode, JobMode::Isolate | JobMode::Flush) {
            self.isolate(unit, &mut changes);
        }

        Ok(changes)
    }

    /// The next job allowed to run, preferring the given unit's when asked.
    /// Order-blocked slots are parked until a peer finishes.
    pub(super) fn pop_runnable(&self, unit: Option<&UnitX>) -> Option<Rc<Job>> {
        let slots: Vec<Rc<JobSlot>> = {
            let t_unit = self.t_unit.borrow();
            match unit {
                Some(u) => t_unit.get(u).map(Rc::clone).into_iter().collect(),
                None => t_unit.values().map(Rc::clone).collect(),
            }
        };

        for slot in slots {
            if slot.is_blocked() {
                continue;
            }
            let job = match slot.next_runnable() {
                Some(job) => job,
                None => continue,
            };
            if !self.is_order_allowed(&job) {
                slot.block();
                continue;
            }
            slot.mark_popped();
            return Some(job);
        }

        None
    }

    /// The running trigger hit a transient condition, hold it until an
    /// ordered peer finishes and resumes the slot.
    pub(super) fn retrigger_wait(&self, unit: &UnitX) {
        if let Some(slot) = self.t_unit.borrow().get(unit) {
            slot.retrigger_wait();
        }
    }

    /// Finish the identified job. None means it re-armed instead of
    /// leaving, like a restart flipping from its stop to its start phase.
    pub(super) fn finish_job(&self, info: &JobInfo, result: JobResult) -> Option<Rc<Job>> {
        let slot = match self.t_unit.borrow().get(&info.unit) {
            Some(slot) => Rc::clone(slot),
            None => return None,
        };
        let job = match self.t_id.borrow().get(&info.id) {
            Some(job) => Rc::clone(job),
            None => return None,
        };

        let del = slot.finish(&job, result);
        if let Some(d) = &del {
            self.t_id.borrow_mut().remove(&d.get_id());
        }
        self.try_gc_slot(&info.unit);

        // ordered peers waiting on this unit may be runnable now
        self.process_relation(&info.unit, del.is_some());

        del
    }

    /// Cancel everything of the unit which has not started running.
    pub(super) fn flush_unit_waiting(&self, unit: &UnitX, result: JobResult) -> Vec<Rc<Job>> {
        let slot = match self.t_unit.borrow().get(unit) {
            Some(slot) => Rc::clone(slot),
            None => return Vec::new(),
        };

        let dels = slot.flush_waiting(result);
        for del in dels.iter() {
            self.t_id.borrow_mut().remove(&del.get_id());
        }
        self.try_gc_slot(unit);
        if !dels.is_empty() {
            self.process_relation(unit, true);
        }

        dels
    }

    pub(super) fn remove_unit(&self, unit: &UnitX) -> Vec<Rc<Job>> {
        let slot = match self.t_unit.borrow_mut().remove(unit) {
            Some(slot) => slot,
            None => return Vec::new(),
        };

        let dels = slot.jobs();
        for del in dels.iter() {
            self.t_id.borrow_mut().remove(&del.get_id());
        }
        dels
    }

    pub(super) fn resume_unit(&self, unit: &UnitX) {
        if let Some(slot) = self.t_unit.borrow().get(unit) {
            slot.resume();
        }
    }

    pub(super) fn get(&self, id: u128) -> Option<JobInfo> {
        self.t_id.borrow().get(&id).map(|job| JobInfo::map(job))
    }

    /// The running trigger of the unit, with the parked flag of its slot.
    pub(super) fn get_running(&self, unit: &UnitX) -> Option<(JobInfo, bool)> {
        let t_unit = self.t_unit.borrow();
        let slot = t_unit.get(unit)?;
        slot.get_running()
            .map(|job| (JobInfo::map(&job), slot.is_blocked()))
    }

    pub(super) fn get_unit_jobs(&self, unit: &UnitX) -> Vec<JobInfo> {
        self.t_unit
            .borrow()
            .get(unit)
            .map(|slot| slot.jobs().iter().map(|j| JobInfo::map(j)).collect())
            .unwrap_or_default()
    }

    pub(super) fn is_unit_empty(&self, unit: &UnitX) -> bool {
        !self.t_unit.borrow().contains_key(unit)
    }

    pub(super) fn len(&self) -> usize {
        self.t_id.borrow().len()
    }

    pub(super) fn ready_len(&self) -> usize {
        self.t_unit.borrow().values().map(|slot| slot.ready_len()).sum()
    }

    pub(super) fn calc_ready(&self) -> bool {
        self.ready_len() > 0
    }

    fn alloc(&self, config: &JobConf) -> Rc<Job> {
        let id = self.ids.get();
        self.ids.set(id.wrapping_add(1));
        let job = Rc::new(Job::new(
            &self.events,
            &self.dm,
            id,
            Rc::clone(config.get_unit()),
            config.get_kind(),
        ));
        job.get_timer().attach_job(&job);
        job.set_timer();
        job
    }

    /// Sweep the queued jobs of every other unit, the isolation target's
    /// field must end up empty apart from the explicitly spared ones.
    fn isolate(&self, keep: &Rc<UnitX>, changes: &mut JobChanges) {
        let slots: Vec<(Rc<UnitX>, Rc<JobSlot>)> = self
            .t_unit
            .borrow()
            .iter()
            .map(|(u, s)| (Rc::clone(u), Rc::clone(s)))
            .collect();

        for (unit, slot) in slots {
            if Rc::ptr_eq(&unit, keep) {
                continue;
            }
            if unit
                .get_config()
                .config_data()
                .borrow()
                .Unit
                .IgnoreOnIsolate
            {
                continue;
            }

            let mut dels = slot.flush_waiting(JobResult::Cancelled);
            if dels.is_empty() {
                continue;
            }
            for del in dels.iter() {
                self.t_id.borrow_mut().remove(&del.get_id());
            }
            self.try_gc_slot(&unit);
            self.process_relation(&unit, true);
            changes.dels.append(&mut dels);
        }
    }

    fn is_order_allowed(&self, job: &Rc<Job>) -> bool {
        if job.kind() == JobKind::Nop || job.attr().ignore_order {
            return true;
        }

        let unit = job.unit();
        for atom in [
            UnitRelationAtom::UnitAtomAfter,
            UnitRelationAtom::UnitAtomBefore,
        ] {
            for other in self.db.dep_gets_atom(unit, atom) {
                let peer = match self.t_unit.borrow().get(&other) {
                    Some(peer) => Rc::clone(peer),
                    None => continue,
                };
                for peer_job in peer.jobs() {
                    if job.is_order_with(&peer_job, atom) > 0 {
                        return false;
                    }
                }
            }
        }

        true
    }

    fn process_relation(&self, unit: &UnitX, deleted: bool) {
        // trigger-notify only when a job really went away
        if deleted {
            let atom = UnitRelationAtom::UnitAtomTriggeredBy;
            for other in self.db.dep_gets_atom(unit, atom) {
                other.trigger(unit);
            }
        }

        for atom in [
            UnitRelationAtom::UnitAtomAfter,
            UnitRelationAtom::UnitAtomBefore,
        ] {
            for other in self.db.dep_gets_atom(unit, atom).iter() {
                self.resume_unit(other);
            }
        }
    }

    fn try_gc_slot(&self, unit: &UnitX) {
        let mut t_unit = self.t_unit.borrow_mut();
        if let Some(slot) = t_unit.get(unit) {
            if slot.is_empty() {
                t_unit.remove(unit);
            }
        }
    }

    fn slot_pad(&self, unit: Rc<UnitX>) -> Rc<JobSlot> {
        let mut t_unit = self.t_unit.borrow_mut();
        if let Some(slot) = t_unit.get(&unit) {
            return Rc::clone(slot);
        }
        let slot = Rc::new(JobSlot::new(Rc::clone(&unit)));
        t_unit.insert(unit, Rc::clone(&slot));
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::test_utils;
    use crate::unit::DataManager;
    use core::unit::{UnitDependencyMask, UnitRelations};
    use event::Events;

    fn prepare() -> (Rc<UnitDb>, JobTable, Rc<UnitX>, Rc<UnitX>) {
        log::init_log_to_console("job_table", log::Level::Trace);
        let dm = Rc::new(DataManager::new());
        let db = Rc::new(UnitDb::new());
        let events = Rc::new(Events::new().unwrap());
        let table = JobTable::new(&db, &events, &dm);

        let unit_test1 = test_utils::create_unit_for_test_pub(&dm, "test1.target");
        let unit_test2 = test_utils::create_unit_for_test_pub(&dm, "test2.target");
        db.units_insert(String::from("test1.target"), Rc::clone(&unit_test1));
        db.units_insert(String::from("test2.target"), Rc::clone(&unit_test2));
        (db, table, unit_test1, unit_test2)
    }

    #[test]
    fn table_install_assigns_unique_ids() {
        let (_db, table, unit_test1, unit_test2) = prepare();

        let changes = table
            .install(&JobConf::new(&unit_test1, JobKind::Start), JobMode::Replace)
            .unwrap();
        assert_eq!(changes.adds.len(), 1);
        let changes = table
            .install(&JobConf::new(&unit_test2, JobKind::Start), JobMode::Replace)
            .unwrap();
        assert_eq!(changes.adds.len(), 1);

        assert_eq!(table.len(), 2);
        assert_eq!(table.ready_len(), 2);
        let jobs1 = table.get_unit_jobs(&unit_test1);
        let jobs2 = table.get_unit_jobs(&unit_test2);
        assert_ne!(jobs1[0].id, jobs2[0].id);
    }

    #[test]
    fn table_replace_reports_delta() {
        let (_db, table, unit_test1, _unit_test2) = prepare();

        table
            .install(&JobConf::new(&unit_test1, JobKind::Start), JobMode::Replace)
            .unwrap();
        let changes = table
            .install(&JobConf::new(&unit_test1, JobKind::Stop), JobMode::Replace)
            .unwrap();

        assert_eq!(changes.adds.len(), 1);
        assert_eq!(changes.dels.len(), 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get_unit_jobs(&unit_test1)[0].kind, JobKind::Stop);
    }

    #[test]
    fn table_isolate_sweeps_others() {
        let (_db, table, unit_test1, unit_test2) = prepare();

        table
            .install(&JobConf::new(&unit_test2, JobKind::Start), JobMode::Replace)
            .unwrap();
        let changes = table
            .install(&JobConf::new(&unit_test1, JobKind::Start), JobMode::Isolate)
            .unwrap();

        assert_eq!(changes.adds.len(), 1);
        assert_eq!(changes.dels.len(), 1);
        assert_eq!(table.len(), 1);
        assert!(table.is_unit_empty(&unit_test2));
    }

    #[test]
    fn table_order_parks_follower() {
        let (db, table, unit_test1, unit_test2) = prepare();
        // test1 starts after test2
        db.dep_insert(
            Rc::clone(&unit_test1),
            UnitRelations::UnitAfter,
            Rc::clone(&unit_test2),
            true,
            UnitDependencyMask::FILE,
        )
        .unwrap();

        table
            .install(&JobConf::new(&unit_test1, JobKind::Start), JobMode::Replace)
            .unwrap();
        table
            .install(&JobConf::new(&unit_test2, JobKind::Start), JobMode::Replace)
            .unwrap();

        // asking for test1 parks it behind test2's start
        assert!(table.pop_runnable(Some(&unit_test1)).is_none());
        assert_eq!(table.ready_len(), 1);

        // finishing test2 resumes the parked slot
        let info2 = table.get_unit_jobs(&unit_test2).pop().unwrap();
        assert!(table.finish_job(&info2, JobResult::Done).is_some());
        let next = table.pop_runnable(None).unwrap();
        assert_eq!(next.unit().id(), unit_test1.id());
    }

    #[test]
    fn table_flush_waiting_clears_unit() {
        let (_db, table, unit_test1, _unit_test2) = prepare();

        table
            .install(&JobConf::new(&unit_test1, JobKind::Start), JobMode::Replace)
            .unwrap();
        table
            .install(&JobConf::new(&unit_test1, JobKind::Nop), JobMode::Replace)
            .unwrap();
        assert_eq!(table.len(), 2);

        let dels = table.flush_unit_waiting(&unit_test1, JobResult::Collected);
        assert_eq!(dels.len(), 2);
        assert_eq!(table.len(), 0);
        assert!(table.is_unit_empty(&unit_test1));
    }
}
