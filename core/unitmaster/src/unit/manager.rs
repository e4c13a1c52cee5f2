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

//! unitmaster entry
//! 1. Load all unit need loaded in a system
//! 2. Drive unit status through job engine
//! 3. Maintain all unit life cycle
//!
//!                     / ---->unit_load
//! ManagerX-> Manager  | ---->job_manager
//!                     \ ---->work queues
use super::super::job::{JobAffect, JobConf, JobKind, JobManager, JobResult};
use super::bus::{UnitBus, UnitProperty};
use super::datastore::UnitDb;
use super::entry::{JobMode, StartLimitResult, UnitEmergencyAction, UnitLoadState, UnitX};
use super::notify::NotifyManager;
use super::runtime::{UnitChangeSink, UnitRT};
use super::sigchld::Sigchld;
use super::submanager::UnitSubManagers;
use super::uload::UnitLoad;
use crate::manager::config::ManagerConfig;
use crate::manager::State;
use super::data::{DataManager, UnitState};
use crate::utils::table::{TableOp, TableSubscribe};
use basic::path_lookup::LookupPaths;
use core::error::*;
use core::serialize::{FdStore, SnapshotReader, SnapshotWriter};
use core::unit::{
    unit_name_is_valid, UmIf, UnitActiveState, UnitDependencyMask, UnitNameFlags, UnitNotifyFlags,
    UnitRelationAtom, UnitRelations,
};
use event::Events;
use nix::unistd::Pid;
use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::str::FromStr;

//#[derive(Debug)]
pub(crate) struct UnitManagerX {
    dm: Rc<DataManager>,
    sub_name: String, // key for table-subscriber: UnitState
    data: Rc<UnitManager>,
    state: Rc<RefCell<State>>,
    #[allow(dead_code)]
    manager_config: Rc<RefCell<ManagerConfig>>,
}

impl Drop for UnitManagerX {
    fn drop(&mut self) {
        log::debug!("UnitManagerX drop, clear.");
        // repeating protection
        self.dm.clear();
    }
}

impl UnitManagerX {
    pub(crate) fn new(
        eventr: &Rc<Events>,
        lookup_path: &Rc<LookupPaths>,
        state: Rc<RefCell<State>>,
        manager_config: Rc<RefCell<ManagerConfig>>,
    ) -> UnitManagerX {
        let _dm = Rc::new(DataManager::new());
        let umx = UnitManagerX {
            dm: Rc::clone(&_dm),
            sub_name: String::from("UnitManagerX"),
            data: UnitManager::new(eventr, &_dm, lookup_path, Rc::clone(&state)),
            state,
            manager_config,
        };
        umx.register(&_dm);
        umx
    }

    pub(crate) fn set_state(&self, state: State) {
        *self.state.borrow_mut() = state;
    }

    pub(crate) fn entry_clear(&self) {
        self.dm.entry_clear();
        self.data.entry_clear();
    }

    pub(crate) fn entry_coldplug(&self) {
        self.data.entry_coldplug();
    }

    pub(crate) fn entry_catchup(&self) {
        self.data.entry_catchup();
    }

    /// resubmit every known unit to the load queue so changed unit files are
    /// picked up without touching runtime state
    pub(crate) fn entry_reload(&self) {
        self.data.entry_reload();
    }

    pub(crate) fn start_unit(&self, name: &str, is_manual: bool, job_mode: &str) -> Result<()> {
        self.data.start_unit(name, is_manual, job_mode)
    }

    pub(crate) fn stop_unit(&self, name: &str, is_manual: bool) -> Result<()> {
        self.data.stop_unit(name, is_manual)
    }

    pub(crate) fn reload(&self, name: &str) -> Result<()> {
        self.data.reload(name)
    }

    pub(crate) fn reset_failed(&self, name: &str) -> Result<()> {
        self.data.reset_failed(name)
    }

    pub(crate) fn restart_unit(&self, name: &str, is_manual: bool) -> Result<()> {
        self.data.restart_unit(name, is_manual)
    }

    pub(crate) fn start_transient_unit(
        &self,
        job_mode: &str,
        name: &str,
        properties: &[UnitProperty],
    ) -> Result<()> {
        self.data.start_transient_unit(job_mode, name, properties)
    }

    pub(crate) fn child_sigchld_enable(&self, enable: bool) -> i32 {
        self.data.sigchld.enable(enable)
    }

    pub(crate) fn dispatch_load_queue(&self) {
        self.data.rt.dispatch_load_queue()
    }

    pub(crate) fn dispatch_work_queues(&self) {
        self.data.rt.dispatch_work_queues()
    }

    pub(crate) fn has_work(&self) -> bool {
        self.data.rt.has_work()
    }

    pub(crate) fn register_change_sink(&self, name: &str, sink: Rc<dyn UnitChangeSink>) {
        self.data.rt.dbus_register(name, sink);
    }

    /// bring up the external surfaces: the notify socket (possibly a
    /// descriptor inherited across re-exec) and the per-type perpetual units
    pub(crate) fn register_ex(&self, inherited_notify: Option<RawFd>) -> Result<()> {
        self.data.notify.startup(inherited_notify)?;
        self.data.sms.enumerate();
        Ok(())
    }

    /// one record per unit plus a preamble referring to stored descriptors
    /// by index
    pub(crate) fn serialize<W: Write>(
        &self,
        writer: &mut SnapshotWriter<W>,
        fds: &FdStore,
    ) -> Result<()> {
        let notify_fd = self.data.notify.rawfd();
        if notify_fd >= 0 {
            let index = fds.push(notify_fd)?;
            writer.item("notify-fd", &index.to_string())?;
        }

        for unit in self.data.db.units_get_all(None).iter() {
            writer.open_unit(&unit.id())?;
            for (key, value) in unit.serialize() {
                writer.item(&key, &value)?;
            }
        }
        writer.flush()
    }

    /// the counterpart of [serialize]: unknown keys are skipped with a debug
    /// line, records of units which cannot be loaded any more are dropped
    /// wholesale. Returns the inherited notify descriptor when the preamble
    /// named one.
    pub(crate) fn deserialize<R: BufRead>(
        &self,
        reader: &mut SnapshotReader<R>,
        fds: &FdStore,
    ) -> Result<Option<RawFd>> {
        let mut inherited_notify = None;
        let mut current: Option<Rc<UnitX>> = None;
        let mut in_unit = false;

        while let Some(record) = reader.next_record()? {
            if record.key == "unit" {
                in_unit = true;
                current = self.data.load_unitx(&record.value);
                if current.is_none() {
                    log::warn!("dropping snapshot record of unknown unit {}", record.value);
                }
                continue;
            }

            if !in_unit {
                match record.key.as_str() {
                    "notify-fd" => {
                        let index = record.value.parse::<usize>()?;
                        inherited_notify = Some(fds.take(index)?);
                    }
                    _ => log::debug!("skipping unknown snapshot key {}", record.key),
                }
                continue;
            }

            if let Some(unit) = &current {
                if let Err(e) = unit.deserialize_item(&record.key, &record.value) {
                    log::debug!(
                        "failed to deserialize {}={} for {}: {}",
                        record.key,
                        record.value,
                        unit.id(),
                        e
                    );
                }
            }
        }

        Ok(inherited_notify)
    }

    pub(crate) fn dump_units(&self) {
        for unit in self.data.db.units_get_all(None).iter() {
            unit.dump();
        }
    }

    fn register(&self, dm: &DataManager) {
        // dm-unit_state
        let subscriber = Rc::clone(&self.data);
        let ret = dm.register_unit_state(&self.sub_name, subscriber.clone());
        assert!(ret.is_none());

        // dm-start_limit_result
        let ret = dm.register_start_limit_result(&self.sub_name, subscriber.clone());
        assert!(ret.is_none());

        // dm-job_result
        let ret = dm.register_job_result(&self.sub_name, subscriber);
        assert!(ret.is_none());
    }
}

/// the struct for manager the unit instance
pub(crate) struct UnitManager {
    // associated objects
    state: Rc<RefCell<State>>,

    // owned objects
    db: Rc<UnitDb>,
    rt: Rc<UnitRT>,
    load: Rc<UnitLoad>,
    jm: Rc<JobManager>,
    sigchld: Sigchld,
    notify: NotifyManager,
    sms: Rc<UnitSubManagers>,
    bus: UnitBus,
}

impl UmIf for UnitManager {
    /// check the unit s_u_name and t_u_name have atom relation. If 't_u_name' is empty checks if the unit has any dependency of that atom.
    fn unit_has_dependency(&self, s_u_name: &str, atom: UnitRelationAtom, t_u_name: &str) -> bool {
        let s_unit = if let Some(s_unit) = self.db.units_get(s_u_name) {
            s_unit
        } else {
            return false;
        };

        if t_u_name.is_empty() {
            return !self.db.dep_gets_atom(&s_unit, atom).is_empty();
        }

        let t_unit = if let Some(unit) = self.db.units_get(t_u_name) {
            unit
        } else {
            return false;
        };

        self.db.dep_is_dep_atom_with(&s_unit, atom, &t_unit)
    }

    ///add a unit dependency to th unit deplist
    /// can called by sub unit
    /// sub unit add some default dependency
    ///
    fn unit_add_dependency(
        &self,
        unit_name: &str,
        relation: UnitRelations,
        target_name: &str,
        add_ref: bool,
        mask: UnitDependencyMask,
    ) -> Result<()> {
        let s_unit = if let Some(unit) = self.load_unitx(unit_name) {
            unit
        } else {
            return Err(Error::UnitActionENoent);
        };
        let t_unit = if let Some(unit) = self.load_unitx(target_name) {
            unit
        } else {
            return Err(Error::UnitActionENoent);
        };

        self.rt
            .unit_add_dependency(s_unit, relation, t_unit, add_ref, mask);
        Ok(())
    }

    ///add two unit dependency to the unit
    /// can called by sub unit
    /// sub unit add some default dependency
    ///
    fn unit_add_two_dependency(
        &self,
        unit_name: &str,
        ra: UnitRelations,
        rb: UnitRelations,
        target_name: &str,
        add_ref: bool,
        mask: UnitDependencyMask,
    ) -> Result<()> {
        self.unit_add_dependency(unit_name, ra, target_name, add_ref, mask)?;

        self.unit_add_dependency(unit_name, rb, target_name, add_ref, mask)
    }

    fn unit_has_default_dependency(&self, unit_name: &str) -> bool {
        let s_unit = if let Some(s_unit) = self.db.units_get(unit_name) {
            s_unit
        } else {
            return false;
        };
        s_unit.default_dependencies()
    }

    fn get_dependency_list(&self, unit_name: &str, atom: UnitRelationAtom) -> Vec<String> {
        let s_unit = if let Some(unit) = self.db.units_get(unit_name) {
            unit
        } else {
            log::error!("unit [{}] not found!!!!!", unit_name);
            return Vec::new();
        };
        let dep_units = self.db.dep_gets_atom(&s_unit, atom);
        dep_units.iter().map(|uxr| uxr.id()).collect::<Vec<_>>()
    }

    /// add pid and its correspond unit to the watch map
    fn child_watch_pid(&self, id: &str, pid: Pid, exclusive: bool) {
        self.db.child_add_watch_pid(id, pid, exclusive)
    }

    /// delete the pid from the watch map
    fn child_unwatch_pid(&self, id: &str, pid: Pid) {
        self.db.child_unwatch_pid(id, pid)
    }

    fn child_watch_all_pids(&self, id: &str) {
        self.db.child_watch_all_pids(id)
    }

    fn child_unwatch_all_pids(&self, id: &str) {
        self.db.child_unwatch_all_pids(id)
    }
}

/// the declaration "pub(self)" is for identification only.
impl UnitManager {
    pub(crate) fn set_state(&self, state: State) {
        *self.state.borrow_mut() = state;
    }

    pub(crate) fn units_get(&self, name: &str) -> Option<Rc<UnitX>> {
        if !unit_name_is_valid(name, UnitNameFlags::PLAIN | UnitNameFlags::INSTANCE) {
            return None;
        }
        self.db.units_get(name)
    }

    ///
    pub(crate) fn unit_emergency_action(&self, action: UnitEmergencyAction, reason: String) {
        if action == UnitEmergencyAction::None {
            return;
        }
        if matches!(
            action,
            UnitEmergencyAction::Reboot | UnitEmergencyAction::Poweroff | UnitEmergencyAction::Exit
        ) {
            if let Some(shutdown_target) = self.units_get(basic::special::SHUTDOWN_TARGET) {
                if shutdown_target.active_state().is_active_or_activating() {
                    return;
                }
                if self.jm.has_start_like_job(&shutdown_target) {
                    return;
                }
            }
        }
        match action {
            UnitEmergencyAction::Reboot => {
                log::info!("Rebooting by starting reboot.target caused by {}", reason);
                if self.unit_start_by_job("reboot.target").is_err() {
                    log::error!("Failed to start reboot.target.");
                }
            }
            UnitEmergencyAction::RebootForce => {
                log::info!("Rebooting forcely caused by {}", reason);
                self.set_state(State::Reboot);
            }
            UnitEmergencyAction::RebootImmediate => {
                log::info!("Rebooting immediately caused by {}", reason);
                nix::unistd::sync();
                if nix::sys::reboot::reboot(nix::sys::reboot::RebootMode::RB_AUTOBOOT).is_err() {
                    log::error!("Failed to reboot immediately.");
                }
            }
            UnitEmergencyAction::Poweroff => {
                log::info!(
                    "Poweroffing by starting poweroff.target caused by {}",
                    reason
                );
                if self.unit_start_by_job("poweroff.target").is_err() {
                    log::error!("Failed to start poweroff.target.");
                }
            }
            UnitEmergencyAction::PoweroffForce => {
                log::info!("Poweroffing forcely caused by {}", reason);
                self.set_state(State::PowerOff);
            }
            UnitEmergencyAction::PoweroffImmediate => {
                log::info!("Poweroffing immediately caused by {}", reason);
                nix::unistd::sync();
                if nix::sys::reboot::reboot(nix::sys::reboot::RebootMode::RB_POWER_OFF).is_err() {
                    log::error!("Failed to poweroff immediately.");
                }
            }
            UnitEmergencyAction::Exit => {
                log::info!("Exiting by starting exit.target caused by {}", reason);
                if self.unit_start_by_job("exit.target").is_err() {
                    log::error!("Failed to start exit.target.");
                }
            }
            UnitEmergencyAction::ExitForce => {
                log::info!("Exiting forcely caused by {}", reason);
                self.set_state(State::Exit);
            }
            _ => {}
        }
    }

    fn unit_start_by_job(&self, name: &str) -> Result<()> {
        self.start_unit(name, false, "replace")
    }

    fn start_unit(&self, name: &str, is_manual: bool, job_mode_str: &str) -> Result<()> {
        let unit = match self.load_unitx(name) {
            None => {
                return Err(Error::UnitActionENoent);
            }
            Some(v) => v,
        };
        if is_manual
            && unit
                .get_config()
                .config_data()
                .borrow()
                .Unit
                .RefuseManualStart
        {
            return Err(Error::UnitActionERefuseManualStart);
        }
        let job_mode = match JobMode::from_str(job_mode_str) {
            Err(e) => {
                log::info!("Failed to parse job mode: {}, assuming JobMode::Replace", e);
                JobMode::Replace
            }
            Ok(v) => v,
        };
        self.jm.exec(
            &JobConf::new(&unit, JobKind::Start),
            job_mode,
            &mut JobAffect::new(false),
        )?;
        log::debug!("job exec success");
        Ok(())
    }

    fn stop_unit(&self, name: &str, is_manual: bool) -> Result<()> {
        let unit = match self.load_unitx(name) {
            None => {
                return Err(Error::UnitActionENoent);
            }
            Some(v) => v,
        };

        if is_manual
            && matches!(
                unit.load_state(),
                UnitLoadState::NotFound | UnitLoadState::Error | UnitLoadState::BadSetting
            )
            && unit.active_state() != UnitActiveState::Active
        {
            return Err(Error::Other {
                msg: format!("unit {} Not Found", unit.id()),
            });
        }

        if is_manual
            && unit
                .get_config()
                .config_data()
                .borrow()
                .Unit
                .RefuseManualStop
        {
            return Err(Error::UnitActionERefuseManualStop);
        }
        self.jm.exec(
            &JobConf::new(&unit, JobKind::Stop),
            JobMode::Replace,
            &mut JobAffect::new(false),
        )?;
        Ok(())
    }

    pub(self) fn reload(&self, name: &str) -> Result<()> {
        if let Some(unit) = self.load_unitx(name) {
            self.jm.exec(
                &JobConf::new(&unit, JobKind::Reload),
                JobMode::Replace,
                &mut JobAffect::new(false),
            )?;
            Ok(())
        } else {
            Err(Error::Internal)
        }
    }

    fn restart_unit(&self, name: &str, is_manual: bool) -> Result<()> {
        let unit = match self.load_unitx(name) {
            None => {
                return Err(Error::UnitActionENoent);
            }
            Some(v) => v,
        };

        if is_manual
            && unit
                .get_config()
                .config_data()
                .borrow()
                .Unit
                .RefuseManualStop
        {
            return Err(Error::UnitActionERefuseManualStop);
        }

        if is_manual
            && unit
                .get_config()
                .config_data()
                .borrow()
                .Unit
                .RefuseManualStart
        {
            return Err(Error::UnitActionERefuseManualStart);
        }

        self.jm.exec(
            &JobConf::new(&unit, JobKind::Restart),
            JobMode::Replace,
            &mut JobAffect::new(false),
        )?;
        Ok(())
    }

    pub(self) fn reset_failed(&self, name: &str) -> Result<()> {
        if let Some(unit) = self.units_get(name) {
            unit.reset_failed();
            Ok(())
        } else {
            Err(Error::LoadError {
                msg: format!("Failed to load {}", name),
            })
        }
    }

    pub(self) fn start_transient_unit(
        &self,
        job_mode_str: &str,
        name: &str,
        properties: &[UnitProperty],
    ) -> Result<()> {
        let job_mode = match JobMode::from_str(job_mode_str) {
            Err(e) => {
                log::info!("Failed to parse job mode {}, err: {}", job_mode_str, e);
                return Err(Error::InvalidData);
            }
            Ok(v) => v,
        };

        let unit = self
            .bus
            .transient_unit_from_message(properties, name)
            .map_err(|e| {
                log::info!("Failed to get transient unit with err: {}", e);
                e
            })?;

        self.jm.exec(
            &JobConf::new(&unit, JobKind::Start),
            job_mode,
            &mut JobAffect::new(false),
        )?;

        Ok(())
    }

    pub(self) fn new(
        eventr: &Rc<Events>,
        dmr: &Rc<DataManager>,
        lookup_path: &Rc<LookupPaths>,
        state: Rc<RefCell<State>>,
    ) -> Rc<UnitManager> {
        let _db = Rc::new(UnitDb::new());
        let _rt = Rc::new(UnitRT::new(&_db));
        let _load = Rc::new(UnitLoad::new(dmr, &_db, &_rt, lookup_path));
        let _jm = Rc::new(JobManager::new(eventr, &_db, dmr));
        _rt.set_jm(Rc::clone(&_jm));
        let _sms = Rc::new(UnitSubManagers::new());
        let um = Rc::new(UnitManager {
            state,
            db: Rc::clone(&_db),
            rt: Rc::clone(&_rt),
            load: Rc::clone(&_load),
            jm: Rc::clone(&_jm),
            sigchld: Sigchld::new(eventr, &_db),
            notify: NotifyManager::new(eventr, &_db),
            sms: Rc::clone(&_sms),
            bus: UnitBus::new(&_load, &_jm, &_sms),
        });
        um.load.set_um(&um);
        let umif: Rc<dyn UmIf> = Rc::clone(&um) as Rc<dyn UmIf>;
        um.sms.set_um(umif);
        um
    }

    fn load_unitx(&self, name: &str) -> Option<Rc<UnitX>> {
        self.load.load_unit(name)
    }

    fn entry_coldplug(&self) {
        for unit in self.db.units_get_all(None).iter() {
            unit.coldplug();
        }
    }

    fn entry_catchup(&self) {
        for unit in self.db.units_get_all(None).iter() {
            unit.catchup();
        }
    }

    fn entry_reload(&self) {
        for unit in self.db.units_get_all(None).iter() {
            self.rt.push_load_queue(Rc::clone(unit));
        }
    }

    fn entry_clear(&self) {
        // job
        self.jm.entry_clear();

        // rt
        self.rt.entry_clear();

        // db
        self.db.entry_clear();
    }
}

// insert states need jm, so put here
impl TableSubscribe<String, UnitState> for UnitManager {
    fn notify(&self, op: &TableOp<String, UnitState>) {
        match op {
            TableOp::TableInsert(name, config) => self.insert_states(name, config),
            TableOp::TableRemove(name, _) => self.remove_states(name),
        }
    }
}

// insert start_limit_hit
impl TableSubscribe<String, StartLimitResult> for UnitManager {
    fn notify(&self, op: &TableOp<String, StartLimitResult>) {
        match op {
            TableOp::TableInsert(name, config) => self.insert_start_limit_res(name, config),
            TableOp::TableRemove(name, _) => self.remove_start_limit_res(name),
        }
    }
}

impl TableSubscribe<String, JobResult> for UnitManager {
    fn notify(&self, op: &TableOp<String, JobResult>) {
        match op {
            TableOp::TableInsert(name, config) => self.insert_job_result(name, config),
            TableOp::TableRemove(name, _) => self.remove_job_result(name),
        }
    }
}

impl UnitManager {
    fn insert_states(&self, source: &str, state: &UnitState) {
        log::debug!("insert unit states source {}, state: {:?}", source, state);
        let unitx = if let Some(u) = self.db.units_get(source) {
            u
        } else {
            return;
        };

        let auto_restart = state.flags.intersects(UnitNotifyFlags::WILL_AUTO_RESTART);
        if state.os != UnitActiveState::Failed
            && state.ns == UnitActiveState::Failed
            && !auto_restart
        {
            self.unit_emergency_action(
                unitx.get_failure_action(),
                "unit ".to_string() + source + " failed",
            );
        }
        if !state.os.is_inactive_or_failed()
            && state.ns == UnitActiveState::InActive
            && !auto_restart
        {
            self.unit_emergency_action(
                unitx.get_success_action(),
                "unit ".to_string() + source + " succeeded",
            );
        }

        if let Err(_e) = self.jm.try_finish(&unitx, state.os, state.ns, state.flags) {
            // debug
        }

        let atom = UnitRelationAtom::UnitAtomTriggeredBy;
        for other in self.db.dep_gets_atom(&unitx, atom) {
            other.trigger(&unitx);
        }

        if state.ns.is_inactive_or_failed() {
            // the unit itself becomes a collection candidate, the units only
            // it pinned may become unneeded
            let atom = UnitRelationAtom::UnitAtomAddStopWhenUnneededQueue;
            for other in self.db.dep_gets_atom(&unitx, atom) {
                self.rt.submit_to_stop_when_unneeded_queue(other);
            }
            self.rt.submit_to_gc_queue(Rc::clone(&unitx));
        }

        if state.ns == UnitActiveState::InActive {
            self.db.child_unwatch_all_pids(source);
        }

        self.rt.submit_to_dbus_queue(unitx);
    }

    fn remove_states(&self, _source: &str) {}

    fn insert_start_limit_res(&self, source: &str, start_limit_res: &StartLimitResult) {
        if start_limit_res == &StartLimitResult::StartLimitNotHit {
            return;
        }
        let unitx = if let Some(u) = self.db.units_get(source) {
            u
        } else {
            return;
        };
        let reason = "unit ".to_string() + source + " hit StartLimit";
        self.unit_emergency_action(unitx.get_start_limit_action(), reason)
    }

    fn remove_start_limit_res(&self, _source: &str) {}

    fn insert_job_result(&self, source: &str, job_result: &JobResult) {
        if job_result != &JobResult::TimeOut {
            return;
        }
        let unitx = if let Some(u) = self.db.units_get(source) {
            u
        } else {
            return;
        };
        let reason = "the job of unit ".to_string() + source + " timedout";
        self.unit_emergency_action(unitx.get_job_timeout_action(), reason)
    }

    fn remove_job_result(&self, _source: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::unit::UnitActiveState;
    use event::Events;
    use std::io::Cursor;

    fn init_dm_for_test() -> (Rc<DataManager>, Rc<Events>, Rc<UnitManager>) {
        log::init_log_to_console("init_dm_for_test", log::Level::Trace);
        let mut l_path = LookupPaths::new();
        let test_units_dir = libtests::get_project_root()
            .unwrap()
            .join("tests/test_units/")
            .to_string_lossy()
            .to_string();
        l_path.search_path.push(test_units_dir);
        let lookup_path = Rc::new(l_path);

        let event = Rc::new(Events::new().unwrap());
        let dm = Rc::new(DataManager::new());
        let state = Rc::new(RefCell::new(State::Init));
        let um = UnitManager::new(&event, &dm, &lookup_path, state);
        (dm, event, um)
    }

    fn init_umx_for_test() -> (Rc<Events>, Rc<RefCell<State>>, UnitManagerX) {
        log::init_log_to_console("init_umx_for_test", log::Level::Trace);
        let mut l_path = LookupPaths::new();
        let test_units_dir = libtests::get_project_root()
            .unwrap()
            .join("tests/test_units/")
            .to_string_lossy()
            .to_string();
        l_path.search_path.push(test_units_dir);
        let lookup_path = Rc::new(l_path);

        let event = Rc::new(Events::new().unwrap());
        let state = Rc::new(RefCell::new(State::Init));
        let config = Rc::new(RefCell::new(ManagerConfig::new(None)));
        let umx = UnitManagerX::new(&event, &lookup_path, Rc::clone(&state), config);
        (event, state, umx)
    }

    #[test]
    fn test_target_unit_load() {
        let dm = init_dm_for_test();
        let mut unit_name_lists: Vec<String> = Vec::new();

        unit_name_lists.push("test1.target".to_string());
        unit_name_lists.push("config.target".to_string());
        for u_name in unit_name_lists.iter() {
            let unit = dm.2.load_unitx(u_name);
            match unit {
                Some(unit_obj) => assert_eq!(&unit_obj.id(), u_name),
                None => panic!("test unit load, not found unit: {}", u_name),
            };
        }
    }

    #[test]
    fn test_reload_forgets_stale_file_deps() {
        log::init_log_to_console("test_reload_forgets_stale_file_deps", log::Level::Trace);
        let unit_dir =
            std::env::temp_dir().join(format!("unitmaster-reload-{}", nix::unistd::getpid()));
        std::fs::create_dir_all(&unit_dir).unwrap();
        let fragment = unit_dir.join("reload.target");
        std::fs::write(&fragment, "[Unit]\nDescription=reload\nWants=dep1.target\n").unwrap();

        let mut l_path = LookupPaths::new();
        l_path
            .search_path
            .push(unit_dir.to_string_lossy().to_string());
        let lookup_path = Rc::new(l_path);
        let event = Rc::new(Events::new().unwrap());
        let dm = Rc::new(DataManager::new());
        let state = Rc::new(RefCell::new(State::Init));
        let um = UnitManager::new(&event, &dm, &lookup_path, state);

        let unit = um.load_unitx("reload.target").unwrap();
        assert_eq!(unit.load_state(), UnitLoadState::Loaded);
        let wants = um.db.dep_gets("reload.target", UnitRelations::UnitWants);
        assert!(wants.iter().any(|u| u.id() == "dep1.target"));

        // the edge was configured in the fragment only, dropping it there and
        // reloading must drop it from the graph too
        std::fs::write(&fragment, "[Unit]\nDescription=reload\n").unwrap();
        um.entry_reload();
        um.rt.dispatch_load_queue();

        assert_eq!(unit.load_state(), UnitLoadState::Loaded);
        let wants = um.db.dep_gets("reload.target", UnitRelations::UnitWants);
        assert!(wants.iter().all(|u| u.id() != "dep1.target"));

        let _ = std::fs::remove_dir_all(&unit_dir);
    }

    #[test]
    fn test_unit_start_by_manager() {
        let dm = init_dm_for_test();
        let ret = dm.2.start_unit("test1.target", false, "replace");
        assert!(ret.is_ok());

        // a bad job mode falls back to replace instead of failing
        let ret = dm.2.start_unit("test2.target", false, "no-such-mode");
        assert!(ret.is_ok());
    }

    #[test]
    fn test_unit_start_unknown() {
        let dm = init_dm_for_test();
        let ret = dm.2.start_unit("no-such-unit.target", false, "replace");
        assert!(ret.is_err());
    }

    #[test]
    fn test_emergency_force_states() {
        let (_event, state, umx) = init_umx_for_test();

        umx.data
            .unit_emergency_action(UnitEmergencyAction::ExitForce, "test".to_string());
        assert_eq!(*state.borrow(), State::Exit);

        umx.data
            .unit_emergency_action(UnitEmergencyAction::RebootForce, "test".to_string());
        assert_eq!(*state.borrow(), State::Reboot);

        umx.data
            .unit_emergency_action(UnitEmergencyAction::PoweroffForce, "test".to_string());
        assert_eq!(*state.borrow(), State::PowerOff);

        // none never touches the manager state
        *state.borrow_mut() = State::Ok;
        umx.data
            .unit_emergency_action(UnitEmergencyAction::None, "test".to_string());
        assert_eq!(*state.borrow(), State::Ok);
    }

    #[test]
    fn test_state_subscriber_routes_to_gc_queue() {
        let (_event, _state, umx) = init_umx_for_test();
        let unit = umx.data.load_unitx("test1.target").unwrap();
        assert!(!unit.in_gc_queue());

        // publishing an inactive transition routes the unit to the gc queue
        umx.dm.insert_unit_state(
            unit.id(),
            UnitState::new(
                UnitActiveState::Active,
                UnitActiveState::InActive,
                UnitNotifyFlags::EMPTY,
            ),
        );
        assert!(unit.in_gc_queue());
        assert!(unit.in_dbus_queue());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let (_event, _state, umx) = init_umx_for_test();
        let unit = umx.data.load_unitx("config.target").unwrap();
        assert_eq!(unit.load_state(), UnitLoadState::Loaded);

        let fds = FdStore::new();
        let mut buf = Vec::new();
        {
            let mut writer = SnapshotWriter::new(&mut buf);
            umx.serialize(&mut writer, &fds).unwrap();
        }
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.contains("unit=config.target"));

        let (_event2, _state2, umx2) = init_umx_for_test();
        let mut reader = SnapshotReader::new(Cursor::new(buf));
        let inherited = umx2.deserialize(&mut reader, &fds).unwrap();
        assert!(inherited.is_none()); // notify socket was never opened
        assert!(umx2.data.units_get("config.target").is_some());
    }
}
