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

use super::datastore::UnitDb;
use super::entry::{CollectMode, JobMode, UnitLoadState, UnitX};
use super::{UnitRelations, UnitType};
use crate::job::{JobAffect, JobConf, JobKind, JobManager};
use crate::utils::table::{TableOp, TableSubscribe};
use core::error::*;
use core::unit::{UnitActiveState, UnitDependencyMask, UnitRelationAtom};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// how many entries one drain takes off a queue before yielding back to the
/// event loop
const QUEUE_DISPATCH_MAX: usize = 1024;

// per-sweep stamps kept in the unit's gc_marker, offset from the manager
// generation
const GC_OFFSET_IN_PATH: u64 = 1;
const GC_OFFSET_UNSURE: u64 = 2;
const GC_OFFSET_GOOD: u64 = 3;
const GC_OFFSET_BAD: u64 = 4;
const GC_OFFSET_MAX: u64 = 5;

/// receiver of property-change emissions from the dbus queue, the bus surface
/// proper lives outside the engine
pub(crate) trait UnitChangeSink {
    fn unit_changed(&self, id: &str, bus_path: &str, invocation_path: &str);
}

//#[derive(Debug)]
pub(super) struct UnitRT {
    sub_name: String, // key for table-subscriber: UnitSets
    data: Rc<UnitRTData>,
}

impl Drop for UnitRT {
    fn drop(&mut self) {
        log::debug!("UnitRT drop, clear.");
        // repeating protection
        self.entry_clear();
        self.data.db.clear();
    }
}

impl UnitRT {
    pub(super) fn new(dbr: &Rc<UnitDb>) -> UnitRT {
        let rt = UnitRT {
            sub_name: String::from("UnitRT"),
            data: Rc::new(UnitRTData::new(dbr)),
        };
        rt.register(dbr);
        rt
    }

    pub(super) fn set_jm(&self, jm: Rc<JobManager>) {
        self.data.jm.replace(Some(jm));
    }

    pub(super) fn entry_clear(&self) {
        self.data.entry_clear();
    }

    /// run every queue once, in the fixed order the engine promises
    pub(super) fn dispatch_work_queues(&self) {
        self.data.dispatch_load_queue();
        self.data.dispatch_gc_queue();
        self.data.dispatch_cgroup_realize_queue();
        self.data.dispatch_cgroup_empty_queue();
        self.data.dispatch_cgroup_oom_queue();
        self.data.dispatch_stop_when_unneeded_queue();
        self.data.dispatch_cleanup_queue();
        self.data.dispatch_dbus_queue();
    }

    pub(super) fn has_work(&self) -> bool {
        self.data.has_work()
    }

    pub(super) fn dispatch_load_queue(&self) {
        self.data.dispatch_load_queue();
    }

    pub(super) fn unit_add_dependency(
        &self,
        source: Rc<UnitX>,
        relation: UnitRelations,
        target: Rc<UnitX>,
        add_ref: bool,
        mask: UnitDependencyMask,
    ) {
        self.data
            .unit_add_dependency(source, relation, target, add_ref, mask)
    }

    pub(super) fn push_load_queue(&self, unit: Rc<UnitX>) {
        self.data.push_load_queue(unit);
    }

    pub(super) fn submit_to_gc_queue(&self, unit: Rc<UnitX>) {
        self.data.submit_to_gc_queue(unit);
    }

    pub(super) fn submit_to_cgroup_realize_queue(&self, unit: Rc<UnitX>) {
        self.data.submit_to_cgroup_realize_queue(unit);
    }

    pub(super) fn submit_to_cgroup_empty_queue(&self, unit: Rc<UnitX>) {
        self.data.submit_to_cgroup_empty_queue(unit);
    }

    pub(super) fn submit_to_cgroup_oom_queue(&self, unit: Rc<UnitX>) {
        self.data.submit_to_cgroup_oom_queue(unit);
    }

    pub(super) fn submit_to_stop_when_unneeded_queue(&self, unit: Rc<UnitX>) {
        self.data.submit_to_stop_when_unneeded_queue(unit);
    }

    pub(super) fn submit_to_cleanup_queue(&self, unit: Rc<UnitX>) {
        self.data.submit_to_cleanup_queue(unit);
    }

    pub(super) fn submit_to_dbus_queue(&self, unit: Rc<UnitX>) {
        self.data.submit_to_dbus_queue(unit);
    }

    pub(super) fn dbus_register(&self, name: &str, sink: Rc<dyn UnitChangeSink>) {
        self.data
            .change_sinks
            .borrow_mut()
            .insert(name.to_string(), sink);
    }

    fn register(&self, dbr: &Rc<UnitDb>) {
        let subscriber = Rc::clone(&self.data);
        dbr.units_register(&self.sub_name, subscriber);
    }
}

//#[derive(Debug)]
struct UnitRTData {
    // associated objects
    db: Rc<UnitDb>,
    jm: RefCell<Option<Rc<JobManager>>>,

    // owned objects
    load_queue: RefCell<VecDeque<Rc<UnitX>>>,
    target_dep_queue: RefCell<VecDeque<Rc<UnitX>>>,
    gc_queue: RefCell<VecDeque<Rc<UnitX>>>,
    cgroup_realize_queue: RefCell<VecDeque<Rc<UnitX>>>,
    cgroup_empty_queue: RefCell<VecDeque<Rc<UnitX>>>,
    cgroup_oom_queue: RefCell<VecDeque<Rc<UnitX>>>,
    stop_when_unneeded_queue: RefCell<VecDeque<Rc<UnitX>>>,
    cleanup_queue: RefCell<VecDeque<Rc<UnitX>>>,
    dbus_queue: RefCell<VecDeque<Rc<UnitX>>>,

    gc_marker: RefCell<u64>,
    change_sinks: RefCell<HashMap<String, Rc<dyn UnitChangeSink>>>,
}

impl TableSubscribe<String, Rc<UnitX>> for UnitRTData {
    fn notify(&self, op: &TableOp<String, Rc<UnitX>>) {
        match op {
            TableOp::TableInsert(_, _) => {} // do nothing
            TableOp::TableRemove(_, unit) => self.remove_unit(unit),
        }
    }
}

// the declaration "pub(self)" is for identification only.
impl UnitRTData {
    pub(self) fn new(dbr: &Rc<UnitDb>) -> UnitRTData {
        UnitRTData {
            db: Rc::clone(dbr),
            jm: RefCell::new(None),
            load_queue: RefCell::new(VecDeque::new()),
            target_dep_queue: RefCell::new(VecDeque::new()),
            gc_queue: RefCell::new(VecDeque::new()),
            cgroup_realize_queue: RefCell::new(VecDeque::new()),
            cgroup_empty_queue: RefCell::new(VecDeque::new()),
            cgroup_oom_queue: RefCell::new(VecDeque::new()),
            stop_when_unneeded_queue: RefCell::new(VecDeque::new()),
            cleanup_queue: RefCell::new(VecDeque::new()),
            dbus_queue: RefCell::new(VecDeque::new()),
            gc_marker: RefCell::new(0),
            change_sinks: RefCell::new(HashMap::new()),
        }
    }

    pub(self) fn entry_clear(&self) {
        self.load_queue.borrow_mut().clear();
        self.target_dep_queue.borrow_mut().clear();
        self.gc_queue.borrow_mut().clear();
        self.cgroup_realize_queue.borrow_mut().clear();
        self.cgroup_empty_queue.borrow_mut().clear();
        self.cgroup_oom_queue.borrow_mut().clear();
        self.stop_when_unneeded_queue.borrow_mut().clear();
        self.cleanup_queue.borrow_mut().clear();
        self.dbus_queue.borrow_mut().clear();
    }

    pub(self) fn has_work(&self) -> bool {
        !self.load_queue.borrow().is_empty()
            || !self.target_dep_queue.borrow().is_empty()
            || !self.gc_queue.borrow().is_empty()
            || !self.cgroup_realize_queue.borrow().is_empty()
            || !self.cgroup_empty_queue.borrow().is_empty()
            || !self.cgroup_oom_queue.borrow().is_empty()
            || !self.stop_when_unneeded_queue.borrow().is_empty()
            || !self.cleanup_queue.borrow().is_empty()
            || !self.dbus_queue.borrow().is_empty()
    }

    pub(self) fn dispatch_load_queue(&self) {
        if self.load_queue.borrow().is_empty() {
            self.dispatch_target_dep_queue();
            return;
        }

        log::debug!("Dispatching load queue");

        for _ in 0..QUEUE_DISPATCH_MAX {
            //Limit the scope of borrow of load queue
            //unitX pop from the load queue and then no need the ref of load queue
            //the unitX load process will borrow load queue as mut again
            // pop
            let unit = match self.load_queue.borrow_mut().pop_front() {
                None => break,
                Some(v) => v,
            };

            log::debug!("Loading unit: {}", unit.id());
            if let Err(e) = unit.load() {
                log::error!("Failed to load unit [{}]: {}", unit.id(), e);
            }

            let real_name = unit.get_real_name();
            if !real_name.is_empty() && real_name != unit.id() {
                /* We are starting an alias, merge it to the real unit. */
                log::debug!("Merging {} to {}", unit.id(), real_name);
                match self.db.units_get(&real_name) {
                    None => {
                        /* We haven't loaded the real unit, rename the current unit to real unit. */
                        unit.set_id(&real_name);
                        self.db.units_insert(real_name.to_string(), unit.clone());
                    }
                    Some(u) => {
                        if let Err(e) = self.merge_unit(&u, &unit) {
                            log::error!(
                                "Failed to merge {} into {}: {}",
                                unit.id(),
                                u.id(),
                                e
                            );
                            unit.set_load_state(UnitLoadState::Error);
                        }
                    }
                }
            } else {
                /* We are starting a real unit, remember its aliases. */
                for alias_name in unit.get_all_names() {
                    log::debug!("Add name {} to {}", alias_name, unit.id());
                    self.db.units_insert(alias_name, unit.clone());
                }
            }

            let load_state = unit.load_state();
            if load_state == UnitLoadState::Loaded {
                self.push_target_dep_queue(Rc::clone(&unit));
                self.submit_to_dbus_queue(Rc::clone(&unit));
            }
        }

        self.dispatch_target_dep_queue();
    }

    /// fold `other` into `u`: names, dependencies and references move over,
    /// `other` only remembers whom it was merged into
    fn merge_unit(&self, u: &Rc<UnitX>, other: &Rc<UnitX>) -> Result<()> {
        if let Some(m) = other.merged_into() {
            if Rc::ptr_eq(&m, u) {
                return Ok(());
            }
        }
        if u.unit_type() != other.unit_type() {
            return Err(Error::Conflict);
        }
        if other.active_or_activating() || self.jm_has_job(other) {
            return Err(Error::Conflict);
        }

        self.db.units_insert(other.id(), Rc::clone(u));
        for alias_name in other.get_all_names() {
            self.db.units_insert(alias_name, Rc::clone(u));
        }

        self.db.dep_merge(u, other);

        self.remove_from_queues(other);
        other.set_load_state(UnitLoadState::Merged);
        other.set_merge_into(Some(Rc::clone(u)));
        Ok(())
    }

    fn remove_from_queues(&self, unit: &Rc<UnitX>) {
        unit.set_in_load_queue(false);
        unit.set_in_target_dep_queue(false);
        unit.set_in_gc_queue(false);
        unit.set_in_cgroup_realize_queue(false);
        unit.set_in_cgroup_empty_queue(false);
        unit.set_in_cgroup_oom_queue(false);
        unit.set_in_stop_when_unneeded_queue(false);
        unit.set_in_cleanup_queue(false);
        unit.set_in_dbus_queue(false);

        for queue in [
            &self.load_queue,
            &self.target_dep_queue,
            &self.gc_queue,
            &self.cgroup_realize_queue,
            &self.cgroup_empty_queue,
            &self.cgroup_oom_queue,
            &self.stop_when_unneeded_queue,
            &self.cleanup_queue,
            &self.dbus_queue,
        ] {
            queue.borrow_mut().retain(|u| !Rc::ptr_eq(u, unit));
        }
    }

    pub(self) fn unit_add_dependency(
        &self,
        source: Rc<UnitX>,
        relation: UnitRelations,
        target: Rc<UnitX>,
        add_ref: bool,
        mask: UnitDependencyMask,
    ) {
        if let Err(e) = self.db.dep_insert(source, relation, target, add_ref, mask) {
            log::error!("unit_add_dependency failed: {:?}", e);
        }
    }

    fn dispatch_target_dep_queue(&self) {
        if self.target_dep_queue.borrow().is_empty() {
            return;
        }

        log::debug!("Dispatching target dep queue");

        for _ in 0..QUEUE_DISPATCH_MAX {
            let unit = match self.target_dep_queue.borrow_mut().pop_front() {
                None => break,
                Some(v) => v,
            };
            dispatch_target_dep_unit(&self.db, &unit);
        }
    }

    pub(self) fn dispatch_gc_queue(&self) {
        if self.gc_queue.borrow().is_empty() {
            return;
        }

        log::debug!("Dispatching gc queue");
        let gc_marker = {
            let mut m = self.gc_marker.borrow_mut();
            *m += GC_OFFSET_MAX;
            *m
        };

        for _ in 0..QUEUE_DISPATCH_MAX {
            let unit = match self.gc_queue.borrow_mut().pop_front() {
                None => break,
                Some(v) => v,
            };
            unit.set_in_gc_queue(false);

            self.gc_sweep_unit(&unit, gc_marker);

            let marker = unit.gc_marker();
            if marker == gc_marker + GC_OFFSET_BAD || marker == gc_marker + GC_OFFSET_UNSURE {
                log::debug!("Collecting unit {}", unit.id());
                self.submit_to_cleanup_queue(Rc::clone(&unit));
            }
        }
    }

    /// decide the fate of one candidate: a unit survives when something that
    /// is itself alive still references it
    fn gc_sweep_unit(&self, unit: &Rc<UnitX>, gc_marker: u64) {
        let marker = unit.gc_marker();
        if marker == gc_marker + GC_OFFSET_GOOD
            || marker == gc_marker + GC_OFFSET_BAD
            || marker == gc_marker + GC_OFFSET_IN_PATH
        {
            return;
        }

        if unit.in_cleanup_queue() {
            unit.set_gc_marker(gc_marker + GC_OFFSET_BAD);
            return;
        }

        if !self.unit_may_gc(unit) {
            unit.set_gc_marker(gc_marker + GC_OFFSET_GOOD);
            return;
        }

        unit.set_gc_marker(gc_marker + GC_OFFSET_IN_PATH);

        let mut is_bad = true;
        for other in self
            .db
            .dep_gets_atom(unit, UnitRelationAtom::UnitAtomReferencedBy)
        {
            self.gc_sweep_unit(&other, gc_marker);
            if other.gc_marker() == gc_marker + GC_OFFSET_GOOD {
                unit.set_gc_marker(gc_marker + GC_OFFSET_GOOD);
                return;
            }
            if other.gc_marker() != gc_marker + GC_OFFSET_BAD {
                is_bad = false;
            }
        }

        if is_bad {
            unit.set_gc_marker(gc_marker + GC_OFFSET_BAD);
        } else {
            unit.set_gc_marker(gc_marker + GC_OFFSET_UNSURE);
        }
    }

    /// true when nothing but references keeps the unit around
    fn unit_may_gc(&self, unit: &Rc<UnitX>) -> bool {
        if self.jm_has_job(unit) {
            /* queued jobs of such a type are dropped along with the unit,
             * a running one still pins it */
            if !unit.gc_jobs() || !self.jm_gc_jobs(unit) {
                return false;
            }
        }

        let state = unit.active_state();
        let eligible = match unit.collect_mode() {
            CollectMode::Inactive => state == UnitActiveState::InActive,
            CollectMode::InactiveOrFailed => state.is_inactive_or_failed(),
        };
        if !eligible {
            return false;
        }

        if unit.get_perpetual() || unit.in_load_queue() {
            return false;
        }

        if !unit.may_gc() {
            return false;
        }

        if unit.will_restart() {
            return false;
        }

        true
    }

    pub(self) fn dispatch_cgroup_realize_queue(&self) {
        if self.cgroup_realize_queue.borrow().is_empty() {
            return;
        }

        log::debug!("Dispatching cgroup realize queue");
        for _ in 0..QUEUE_DISPATCH_MAX {
            let unit = match self.cgroup_realize_queue.borrow_mut().pop_front() {
                None => break,
                Some(v) => v,
            };
            unit.set_in_cgroup_realize_queue(false);

            if unit.active_state().is_inactive_or_failed() {
                continue;
            }
            if let Err(e) = unit.realize_cgroup() {
                log::error!("Failed to realize cgroup for {}: {}", unit.id(), e);
            }
        }
    }

    pub(self) fn dispatch_cgroup_empty_queue(&self) {
        if self.cgroup_empty_queue.borrow().is_empty() {
            return;
        }

        log::debug!("Dispatching cgroup empty queue");
        for _ in 0..QUEUE_DISPATCH_MAX {
            let unit = match self.cgroup_empty_queue.borrow_mut().pop_front() {
                None => break,
                Some(v) => v,
            };
            unit.set_in_cgroup_empty_queue(false);

            if !unit.get_pids().is_empty() {
                /* something was started in the group since the event fired */
                continue;
            }
            if unit.can_delegate() && !cgroup::cg_is_empty_recursive(&unit.cg_path()).unwrap_or(true)
            {
                /* the payload owns the subtree and may have moved its
                 * processes into sub-groups of its own */
                continue;
            }
            unit.notify_cgroup_empty();
        }
    }

    pub(self) fn dispatch_cgroup_oom_queue(&self) {
        if self.cgroup_oom_queue.borrow().is_empty() {
            return;
        }

        log::debug!("Dispatching cgroup oom queue");
        for _ in 0..QUEUE_DISPATCH_MAX {
            let unit = match self.cgroup_oom_queue.borrow_mut().pop_front() {
                None => break,
                Some(v) => v,
            };
            unit.set_in_cgroup_oom_queue(false);
            unit.notify_cgroup_oom();
        }
    }

    pub(self) fn dispatch_stop_when_unneeded_queue(&self) {
        if self.stop_when_unneeded_queue.borrow().is_empty() {
            return;
        }

        log::debug!("Dispatching stop-when-unneeded queue");
        for _ in 0..QUEUE_DISPATCH_MAX {
            let unit = match self.stop_when_unneeded_queue.borrow_mut().pop_front() {
                None => break,
                Some(v) => v,
            };
            unit.set_in_stop_when_unneeded_queue(false);

            if !unit.stop_when_unneeded() || !unit.active_or_activating() {
                continue;
            }
            if self.jm_has_job(&unit) {
                /* whatever is queued decides the fate instead */
                continue;
            }

            let mut pinned = false;
            for other in self
                .db
                .dep_gets_atom(&unit, UnitRelationAtom::UnitAtomPinsStopWhenUnneeded)
            {
                if other.active_or_activating() || self.jm_has_job(&other) {
                    pinned = true;
                    break;
                }
            }
            if pinned {
                continue;
            }

            log::info!("Unit {} is not needed anymore, stopping.", unit.id());
            if let Some(jm) = self.jm.borrow().as_ref() {
                if let Err(e) = jm.exec(
                    &JobConf::new(&unit, JobKind::Stop),
                    JobMode::Replace,
                    &mut JobAffect::new(false),
                ) {
                    log::error!("Failed to enqueue the stop job for {}: {}", unit.id(), e);
                }
            }
        }
    }

    pub(self) fn dispatch_cleanup_queue(&self) {
        if self.cleanup_queue.borrow().is_empty() {
            return;
        }

        log::debug!("Dispatching cleanup queue");
        for _ in 0..QUEUE_DISPATCH_MAX {
            let unit = match self.cleanup_queue.borrow_mut().pop_front() {
                None => break,
                Some(v) => v,
            };
            unit.set_in_cleanup_queue(false);

            log::debug!("Releasing unit {}", unit.id());
            unit.release_resources();
            if unit.transient() {
                unit.remove_transient();
            }

            /* dropping the names from the table detaches dependencies,
             * references and pid watches through the set subscribers */
            let mut names = unit.get_all_names();
            names.push(unit.id());
            for name in names {
                let owner = match self.db.units_get(&name) {
                    None => continue,
                    Some(v) => v,
                };
                if Rc::ptr_eq(&owner, &unit) {
                    self.db.unit_remove(&name);
                }
            }
        }
    }

    pub(self) fn dispatch_dbus_queue(&self) {
        if self.dbus_queue.borrow().is_empty() {
            return;
        }

        for _ in 0..QUEUE_DISPATCH_MAX {
            let unit = match self.dbus_queue.borrow_mut().pop_front() {
                None => break,
                Some(v) => v,
            };
            unit.set_in_dbus_queue(false);

            let bus_path = unit_bus_path(&unit.id());
            let invocation_path = unit_invocation_bus_path(&unit.invocation_id());
            for sink in self.change_sinks.borrow().values() {
                sink.unit_changed(&unit.id(), &bus_path, &invocation_path);
            }
        }
    }

    fn jm_has_job(&self, unit: &Rc<UnitX>) -> bool {
        self.jm
            .borrow()
            .as_ref()
            .map_or(false, |jm| jm.has_job(unit))
    }

    fn jm_gc_jobs(&self, unit: &Rc<UnitX>) -> bool {
        self.jm
            .borrow()
            .as_ref()
            .map_or(true, |jm| jm.gc_unit_jobs(unit))
    }

    fn push_target_dep_queue(&self, unit: Rc<UnitX>) {
        if unit.in_target_dep_queue() {
            return;
        }
        log::debug!("push unit [{}] into target dep queue", unit.id());
        unit.set_in_target_dep_queue(true);
        self.target_dep_queue.borrow_mut().push_back(unit);
    }

    pub(self) fn push_load_queue(&self, unit: Rc<UnitX>) {
        if unit.in_load_queue() {
            return;
        }
        unit.set_in_load_queue(true);
        self.load_queue.borrow_mut().push_back(unit);
    }

    pub(self) fn submit_to_gc_queue(&self, unit: Rc<UnitX>) {
        if unit.in_gc_queue() {
            return;
        }
        unit.set_in_gc_queue(true);
        self.gc_queue.borrow_mut().push_back(unit);
    }

    pub(self) fn submit_to_cgroup_realize_queue(&self, unit: Rc<UnitX>) {
        if unit.in_cgroup_realize_queue() {
            return;
        }
        unit.set_in_cgroup_realize_queue(true);
        self.cgroup_realize_queue.borrow_mut().push_back(unit);
    }

    pub(self) fn submit_to_cgroup_empty_queue(&self, unit: Rc<UnitX>) {
        if unit.in_cgroup_empty_queue() {
            return;
        }
        unit.set_in_cgroup_empty_queue(true);
        self.cgroup_empty_queue.borrow_mut().push_back(unit);
    }

    pub(self) fn submit_to_cgroup_oom_queue(&self, unit: Rc<UnitX>) {
        if unit.in_cgroup_oom_queue() {
            return;
        }
        unit.set_in_cgroup_oom_queue(true);
        self.cgroup_oom_queue.borrow_mut().push_back(unit);
    }

    pub(self) fn submit_to_stop_when_unneeded_queue(&self, unit: Rc<UnitX>) {
        if unit.in_stop_when_unneeded_queue() {
            return;
        }
        unit.set_in_stop_when_unneeded_queue(true);
        self.stop_when_unneeded_queue.borrow_mut().push_back(unit);
    }

    pub(self) fn submit_to_cleanup_queue(&self, unit: Rc<UnitX>) {
        if unit.in_cleanup_queue() {
            return;
        }
        unit.set_in_cleanup_queue(true);
        self.cleanup_queue.borrow_mut().push_back(unit);
    }

    pub(self) fn submit_to_dbus_queue(&self, unit: Rc<UnitX>) {
        if unit.in_dbus_queue() {
            return;
        }
        unit.set_in_dbus_queue(true);
        self.dbus_queue.borrow_mut().push_back(unit);
    }

    fn remove_unit(&self, _unit: &Rc<UnitX>) {}
}

fn dispatch_target_dep_unit(db: &Rc<UnitDb>, unit: &Rc<UnitX>) {
    unit.set_in_target_dep_queue(false);
    let atom = UnitRelationAtom::UnitAtomDefaultTargetDependencies;
    let b_atom = UnitRelationAtom::UnitAtomBefore;
    let after = UnitRelations::UnitAfter;
    let mask = UnitDependencyMask::DEFAULT;
    for dep_target in db.dep_gets_atom(unit, atom) {
        if dep_target.unit_type() != UnitType::UnitTarget {
            log::debug!("dep unit type is not target, continue");
            continue;
        }
        if unit.load_state() != UnitLoadState::Loaded
            || dep_target.load_state() != UnitLoadState::Loaded
        {
            log::debug!("dep unit is not loaded, continue");
            continue;
        }
        if !unit.default_dependencies() || !dep_target.default_dependencies() {
            log::debug!("default dependencies option is false");
            continue;
        }
        if db.dep_is_dep_atom_with(&dep_target, b_atom, unit) {
            continue;
        }

        if let Err(e) = db.dep_insert(dep_target, after, Rc::clone(unit), true, mask) {
            log::error!("dispatch_target_dep_queue add default dep err {:?}", e);
        }
    }
}

fn bus_label_escape(id: &str) -> String {
    if id.is_empty() {
        return String::from("_");
    }

    let mut escaped = String::with_capacity(id.len());
    for (i, b) in id.bytes().enumerate() {
        if b.is_ascii_alphabetic() || (i > 0 && b.is_ascii_digit()) {
            escaped.push(b as char);
        } else {
            escaped.push_str(&format!("_{:02x}", b));
        }
    }
    escaped
}

fn unit_bus_path(id: &str) -> String {
    format!("/org/unitmaster1/unit/{}", bus_label_escape(id))
}

fn unit_invocation_bus_path(invocation_id: &str) -> String {
    if invocation_id.is_empty() {
        return String::new();
    }
    format!("/org/unitmaster1/unit/invocation/{}", invocation_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::data::DataManager;
    use crate::unit::test;

    #[test]
    fn rt_push_load_queue() {
        let dm = Rc::new(DataManager::new());
        let db = Rc::new(UnitDb::new());
        let rt = UnitRT::new(&db);
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);

        assert_eq!(rt.data.load_queue.borrow().len(), 0);
        assert!(!unit_test1.in_load_queue());
        assert!(!unit_test2.in_load_queue());

        rt.push_load_queue(Rc::clone(&unit_test1));
        assert_eq!(rt.data.load_queue.borrow().len(), 1);
        assert!(unit_test1.in_load_queue());
        assert!(!unit_test2.in_load_queue());

        rt.push_load_queue(Rc::clone(&unit_test2));
        assert_eq!(rt.data.load_queue.borrow().len(), 2);
        assert!(unit_test1.in_load_queue());
        assert!(unit_test2.in_load_queue());

        // pushing an already queued unit changes nothing
        rt.push_load_queue(Rc::clone(&unit_test1));
        assert_eq!(rt.data.load_queue.borrow().len(), 2);
    }

    #[test]
    fn rt_dispatch_load_queue() {
        let dm = Rc::new(DataManager::new());
        let db = Rc::new(UnitDb::new());
        let rt = UnitRT::new(&db);
        let target_name = String::from("config.target");
        let target_unit = create_unit(&dm, &target_name);
        rt.push_load_queue(Rc::clone(&target_unit));
        rt.data
            .db
            .units_insert(target_name.to_string(), target_unit);
        rt.dispatch_load_queue(); // do not register dep notify so cannot parse dependency
        let unit = rt.data.db.units_get(&target_name);
        assert_eq!(unit.unwrap().load_state(), UnitLoadState::Loaded);
    }

    #[test]
    fn rt_dispatch_load_queue_missing_unit() {
        let dm = Rc::new(DataManager::new());
        let db = Rc::new(UnitDb::new());
        let rt = UnitRT::new(&db);
        let name = String::from("not-on-disk.target");
        let unit = create_unit(&dm, &name);
        rt.data.db.units_insert(name.to_string(), Rc::clone(&unit));
        rt.push_load_queue(Rc::clone(&unit));
        rt.dispatch_load_queue();
        assert_eq!(unit.load_state(), UnitLoadState::NotFound);
        assert!(!unit.in_load_queue());
    }

    #[test]
    fn rt_gc_collects_inactive_unit() {
        let dm = Rc::new(DataManager::new());
        let db = Rc::new(UnitDb::new());
        let rt = UnitRT::new(&db);
        let name = String::from("collect-me.target");
        let unit = create_unit(&dm, &name);
        rt.data.db.units_insert(name.to_string(), Rc::clone(&unit));

        rt.submit_to_gc_queue(Rc::clone(&unit));
        assert!(unit.in_gc_queue());
        rt.data.dispatch_gc_queue();

        // nothing references the unit, it went to cleanup
        assert!(unit.in_cleanup_queue());
        rt.data.dispatch_cleanup_queue();
        assert!(rt.data.db.units_get(&name).is_none());
    }

    #[test]
    fn rt_gc_spares_referenced_unit() {
        let dm = Rc::new(DataManager::new());
        let db = Rc::new(UnitDb::new());
        let rt = UnitRT::new(&db);
        let name = String::from("wanted.target");
        let unit = create_unit(&dm, &name);
        rt.data.db.units_insert(name.to_string(), Rc::clone(&unit));

        let holder_name = String::from("config.target");
        let holder = create_unit(&dm, &holder_name);
        rt.data
            .db
            .units_insert(holder_name.to_string(), Rc::clone(&holder));
        holder.load().unwrap();
        holder.start().unwrap();

        rt.data
            .db
            .dep_insert(
                Rc::clone(&holder),
                UnitRelations::UnitRequires,
                Rc::clone(&unit),
                true,
                UnitDependencyMask::FILE,
            )
            .unwrap();

        rt.submit_to_gc_queue(Rc::clone(&unit));
        rt.data.dispatch_gc_queue();

        // the active holder keeps its reference alive
        assert!(!unit.in_cleanup_queue());
        assert!(rt.data.db.units_get(&name).is_some());
    }

    #[test]
    fn rt_merge_folds_alias_into_real_unit() {
        let dm = Rc::new(DataManager::new());
        let db = Rc::new(UnitDb::new());
        let rt = UnitRT::new(&db);

        let real = create_unit(&dm, "real.target");
        let alias = create_unit(&dm, "alias.target");
        let third = create_unit(&dm, "third.target");
        rt.data
            .db
            .units_insert(String::from("real.target"), Rc::clone(&real));
        rt.data
            .db
            .units_insert(String::from("alias.target"), Rc::clone(&alias));
        rt.data
            .db
            .units_insert(String::from("third.target"), Rc::clone(&third));

        // the alias carries an edge that must survive the merge
        rt.data
            .db
            .dep_insert(
                Rc::clone(&alias),
                UnitRelations::UnitWants,
                Rc::clone(&third),
                false,
                UnitDependencyMask::FILE,
            )
            .unwrap();

        rt.data.merge_unit(&real, &alias).unwrap();

        assert_eq!(alias.load_state(), UnitLoadState::Merged);
        assert!(alias.merged_into().is_some());
        // repeated merge of the same pair is a no-op
        assert!(rt.data.merge_unit(&real, &alias).is_ok());

        // the name now resolves to the real unit
        let resolved = rt.data.db.units_get("alias.target").unwrap();
        assert!(Rc::ptr_eq(&resolved, &real));

        // the edge moved over
        assert!(rt
            .data
            .db
            .dep_is_dep_atom_with(&real, UnitRelationAtom::UnitAtomPullInStartIgnored, &third));
    }

    #[test]
    fn rt_change_sink_sees_dbus_queue() {
        struct Recorder {
            seen: RefCell<Vec<(String, String)>>,
        }
        impl UnitChangeSink for Recorder {
            fn unit_changed(&self, id: &str, bus_path: &str, _invocation_path: &str) {
                self.seen
                    .borrow_mut()
                    .push((id.to_string(), bus_path.to_string()));
            }
        }

        let dm = Rc::new(DataManager::new());
        let db = Rc::new(UnitDb::new());
        let rt = UnitRT::new(&db);
        let unit = create_unit(&dm, "told.target");
        let recorder = Rc::new(Recorder {
            seen: RefCell::new(Vec::new()),
        });
        rt.dbus_register("test", Rc::clone(&recorder) as Rc<dyn UnitChangeSink>);

        rt.submit_to_dbus_queue(Rc::clone(&unit));
        rt.data.dispatch_dbus_queue();

        let seen = recorder.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "told.target");
        assert_eq!(seen[0].1, "/org/unitmaster1/unit/told_2etarget");
    }

    #[test]
    fn rt_gc_collect_mode_gates_failed_unit() {
        let dm = Rc::new(DataManager::new());
        let db = Rc::new(UnitDb::new());
        let rt = UnitRT::new(&db);
        let name = String::from("session-1.scope");
        let unit = create_unit(&dm, &name);
        rt.data.db.units_insert(name.to_string(), Rc::clone(&unit));

        unit.deserialize_item("scope-state", "failed").unwrap();
        assert_eq!(unit.active_state(), UnitActiveState::Failed);

        // default CollectMode=inactive spares a failed unit
        rt.submit_to_gc_queue(Rc::clone(&unit));
        rt.data.dispatch_gc_queue();
        assert!(!unit.in_cleanup_queue());
        assert!(rt.data.db.units_get(&name).is_some());

        unit.set_property("CollectMode", "inactive-or-failed")
            .unwrap();
        rt.submit_to_gc_queue(Rc::clone(&unit));
        rt.data.dispatch_gc_queue();
        assert!(unit.in_cleanup_queue());
        rt.data.dispatch_cleanup_queue();
        assert!(rt.data.db.units_get(&name).is_none());
    }

    fn create_unit(dmr: &Rc<DataManager>, name: &str) -> Rc<UnitX> {
        log::init_log_to_console("create_unit", log::Level::Trace);
        test::test_utils::create_unit_for_test_pub(dmr, name)
    }
}
