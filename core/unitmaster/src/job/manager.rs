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

use super::entry::{self, JobConf, JobInfo, JobKind, JobResult};
use super::notify;
use super::stat::JobStat;
use super::table::{JobChanges, JobTable};
use crate::unit::{DataManager, JobMode, UnitDb, UnitX};
use crate::utils::table::{TableOp, TableSubscribe};
use core::error::*;
use core::unit::{UnitActiveState, UnitNotifyFlags, UnitRelationAtom};
use event::{EventState, EventType, Events, Source};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug)]
pub(crate) struct JobAffect {
    // data
    pub(crate) adds: Vec<JobInfo>,
    pub(crate) dels: Vec<JobInfo>,
    pub(crate) updates: Vec<JobInfo>,

    // control
    interested: bool,
}

impl JobAffect {
    pub(crate) fn new(interested: bool) -> JobAffect {
        JobAffect {
            adds: Vec::new(),
            dels: Vec::new(),
            updates: Vec::new(),

            interested,
        }
    }

    fn record(&mut self, changes: &JobChanges) {
        if self.interested {
            self.adds
                .extend(changes.adds.iter().map(|job| JobInfo::map(job)));
            self.dels
                .extend(changes.dels.iter().map(|job| JobInfo::map(job)));
            self.updates
                .extend(changes.updates.iter().map(|job| JobInfo::map(job)));
        }
    }
}

pub(crate) struct JobManager {
    // associated objects
    event: Rc<Events>,

    // owned objects
    sub_name: String, // key for table-subscriber: UnitSets
    data: Rc<JobManagerData>,
}

impl Drop for JobManager {
    fn drop(&mut self) {
        log::debug!("JobManager drop, clear.");
        // repeating protection
        self.data.entry_clear();
        self.data.db.clear();
        self.event.clear();
    }
}

impl JobManager {
    pub(crate) fn new(
        eventr: &Rc<Events>,
        dbr: &Rc<UnitDb>,
        dmr: &Rc<DataManager>,
    ) -> JobManager {
        let jm = JobManager {
            event: Rc::clone(eventr),
            sub_name: String::from("JobManager"),
            data: Rc::new(JobManagerData::new(dbr, eventr, dmr)),
        };
        jm.register(eventr, dbr);
        jm
    }

    pub(crate) fn exec(
        &self,
        config: &JobConf,
        mode: JobMode,
        affect: &mut JobAffect,
    ) -> Result<()> {
        self.data.exec(config, mode, affect)?;
        self.try_enable();
        Ok(())
    }

    pub(crate) fn try_finish(
        &self,
        unit: &Rc<UnitX>,
        os: UnitActiveState,
        ns: UnitActiveState,
        flags: UnitNotifyFlags,
    ) -> Result<()> {
        self.data.try_finish(unit, os, ns, flags)?;
        self.try_enable();
        Ok(())
    }

    /// Collect the queued jobs of a unit that nothing is waiting on. Returns
    /// true when the unit ends up job-free.
    pub(crate) fn gc_unit_jobs(&self, unit: &Rc<UnitX>) -> bool {
        if self.data.jobs.get_running(unit).is_some() {
            return false;
        }

        for del in self
            .data
            .jobs
            .flush_unit_waiting(unit, JobResult::Collected)
        {
            log::debug!(
                "Collected queued {} job of unneeded unit {}",
                del.kind(),
                unit.id()
            );
            self.data.stat.count_finish(JobResult::Collected);
        }
        self.try_enable();

        !self.has_job(unit)
    }

    pub(crate) fn has_job(&self, unit: &Rc<UnitX>) -> bool {
        !self.data.jobs.is_unit_empty(unit)
    }

    pub(crate) fn has_start_like_job(&self, unit: &Rc<UnitX>) -> bool {
        self.data
            .jobs
            .get_unit_jobs(unit)
            .iter()
            .any(|info| matches!(info.kind, JobKind::Start | JobKind::Restart))
    }

    pub(crate) fn entry_clear(&self) {
        self.data.entry_clear();
    }

    fn try_enable(&self) {
        // prepare for async-running
        if self.data.calc_jobs_ready() && !self.data.up_ready() {
            // somethings new comes in, it should be enabled again.
            self.enable(&self.event);
        }

        // update up_ready
        self.data.update_up_ready();
    }

    fn register(&self, eventr: &Rc<Events>, dbr: &Rc<UnitDb>) {
        // event
        let source = Rc::clone(&self.data);
        eventr.add_source(source).unwrap();

        // db
        let subscriber = Rc::clone(&self.data);
        dbr.units_register(&self.sub_name, subscriber);
    }

    fn enable(&self, eventr: &Rc<Events>) {
        let source = Rc::clone(&self.data);
        eventr.set_enabled(source, EventState::OneShot).unwrap();
    }
}

impl Source for JobManagerData {
    fn event_type(&self) -> EventType {
        EventType::Defer
    }

    fn epoll_event(&self) -> u32 {
        0
    }

    fn priority(&self) -> i8 {
        100
    }

    fn token(&self) -> u64 {
        let data: u64 = unsafe { std::mem::transmute(self) };
        data
    }

    fn dispatch(&self, _event: &Events) -> i32 {
        log::debug!("job manager data dispatch");
        self.run(None);

        self.update_up_ready();
        assert!(!self.calc_jobs_ready());

        0
    }
}

impl TableSubscribe<String, Rc<UnitX>> for JobManagerData {
    fn notify(&self, op: &TableOp<String, Rc<UnitX>>) {
        match op {
            TableOp::TableInsert(_, _) => {} // do nothing
            TableOp::TableRemove(_, unit) => self.remove_unit(unit),
        }
    }
}

#[allow(clippy::type_complexity)]
struct JobManagerData {
    // associated objects
    db: Rc<UnitDb>,

    // owned objects
    jobs: JobTable,

    // status
    running: RefCell<bool>,
    up_ready: RefCell<bool>, // the readiness armed into the event loop
    text: RefCell<Option<(Rc<UnitX>, UnitActiveState, UnitActiveState, UnitNotifyFlags)>>, // (unit, os, ns, flags) of a synchronous finish

    // statistics
    stat: JobStat,
}

// the declaration "pub(self)" is for identification only.
impl JobManagerData {
    pub(self) fn new(
        dbr: &Rc<UnitDb>,
        eventsr: &Rc<Events>,
        dmr: &Rc<DataManager>,
    ) -> JobManagerData {
        JobManagerData {
            db: Rc::clone(dbr),

            jobs: JobTable::new(dbr, eventsr, dmr),

            running: RefCell::new(false),
            up_ready: RefCell::new(false),
            text: RefCell::new(None),

            stat: JobStat::new(),
        }
    }

    pub(self) fn entry_clear(&self) {
        let pending = self.jobs.len();
        if pending > 0 {
            log::debug!("Discarding {} pending jobs.", pending);
        }
        log::info!("{}", self.stat.report());

        self.jobs.clear();
        *self.running.borrow_mut() = false;
        *self.up_ready.borrow_mut() = false;
        *self.text.borrow_mut() = None;
        self.stat.clear();
    }

    pub(self) fn exec(
        &self,
        config: &JobConf,
        mode: JobMode,
        affect: &mut JobAffect,
    ) -> Result<()> {
        job_trans_check_input(config, mode)?;

        // resolve compound kinds against the unit's current state first,
        // the table only ever holds basic kinds
        let conf = JobConf::map(config);
        job_trans_check_unit(&conf)?;

        let changes = self.jobs.install(&conf, mode)?;

        self.stat.count_changes(&changes);
        affect.record(&changes);

        Ok(())
    }

    pub(self) fn run(&self, unit: Option<&UnitX>) -> usize {
        let mut cnt: usize = 0;
        loop {
            let job = match self.jobs.pop_runnable(unit) {
                Some(job) => job,
                None => break, // nothing left which is allowed to run
            };
            cnt = cnt.wrapping_add(1);
            let info = JobInfo::map(&job);

            *self.text.borrow_mut() = None; // reset every time
            *self.running.borrow_mut() = true;
            let run_ret = job.run();
            *self.running.borrow_mut() = false;

            let end_r = match run_ret {
                Ok(()) => None, // in flight, the unit reports back later
                Err(None) => {
                    // transient condition, park until an ordered peer resumes us
                    self.jobs.retrigger_wait(&info.unit);
                    None
                }
                Err(Some(result)) => Some(result),
            };

            // a state change reported synchronously by the unit overrides
            // whatever the trigger returned
            if let Some((u, os, ns, flags)) = self.text.take() {
                self.do_try_finish(&u, os, ns, flags);
            }

            if let Some(result) = end_r {
                if self.jobs.get(info.id).is_some() {
                    self.do_remove(&info, result, true);
                }
            }
        }

        cnt
    }

    pub(self) fn try_finish(
        &self,
        unit: &Rc<UnitX>,
        os: UnitActiveState,
        ns: UnitActiveState,
        flags: UnitNotifyFlags,
    ) -> Result<()> {
        // in order to simplify the mechanism, the running(trigger) and ending(finish) processes need to be isolated.
        if *self.running.borrow() {
            // (synchronous)finish in context
            if self.text.borrow().is_some() {
                // the unit has been finished already
                return Err(Error::Input);
            }

            *self.text.borrow_mut() = Some((Rc::clone(unit), os, ns, flags)); // update(delay) the finish information
        } else {
            // (asynchronous)finish not in context
            self.do_try_finish(unit, os, ns, flags); // do finish
        }

        Ok(())
    }

    pub(self) fn update_up_ready(&self) {
        *self.up_ready.borrow_mut() = self.calc_jobs_ready();
    }

    pub(self) fn up_ready(&self) -> bool {
        *self.up_ready.borrow()
    }

    pub(self) fn calc_jobs_ready(&self) -> bool {
        self.jobs.calc_ready()
    }

    fn remove_unit(&self, unit: &UnitX) {
        for del in self.jobs.remove_unit(unit) {
            del.finish(JobResult::Collected);
            self.stat.count_finish(JobResult::Collected);
        }
    }

    fn do_try_finish(
        &self,
        unit: &Rc<UnitX>,
        os: UnitActiveState,
        ns: UnitActiveState,
        flags: UnitNotifyFlags,
    ) {
        let mut generated = false;
        let mut del_one = false;
        if let Some((trigger, parked)) = self.jobs.get_running(unit) {
            generated = if parked {
                // the state change frees the slot to try again
                self.jobs.resume_unit(unit);
                true
            } else {
                let (suggest_r, suggest_g) = entry::job_process_unit(trigger.run_kind, ns, flags);
                if let Some(result) = suggest_r {
                    // the new state concludes the trigger
                    del_one = self.do_remove(&trigger, result, false);
                }
                suggest_g
            };
        }

        // simulate job events, which are not generated by the job.
        if !generated {
            self.simulate_job_notify(unit, os, ns);
        }

        // start on previous result
        self.unit_start_on(unit, os, ns, flags);

        // the deleting process contains the trigger-notify, so do the compensation
        if !del_one {
            let atom = UnitRelationAtom::UnitAtomTriggeredBy;
            for other in self.db.dep_gets_atom(unit, atom) {
                other.trigger(unit);
            }
        }
    }

    /// Returns true when the job really left the table. A restart switching
    /// over to its start phase stays installed and reports false.
    fn do_remove(&self, job_info: &JobInfo, result: JobResult, inside: bool) -> bool {
        let del = self.jobs.finish_job(job_info, result);
        if del.is_none() {
            return false;
        }

        self.stat.count_finish(result);
        self.simulate_unit_notify(&job_info.unit, result, inside);

        // a failed transition spills over to everything depending on it
        if result != JobResult::Done {
            self.do_remove_relation(job_info);
        }

        true
    }

    fn do_remove_relation(&self, job_info: &JobInfo) {
        let unit = &job_info.unit;

        if job_info.attr.no_relevancy {
            let config = JobConf::new(unit, JobKind::Stop);
            if let Err(e) = self.exec(&config, JobMode::Replace, &mut JobAffect::new(false)) {
                log::debug!("Failed to enqueue stop for {}: {}", unit.id(), e);
            }
            return;
        }

        self.fallback(unit, job_info.run_kind, JobResult::Dependency);
    }

    /// Withdraw the start-like jobs of every unit the failed transition
    /// propagates to, each withdrawal propagating in turn.
    fn fallback(&self, unit: &Rc<UnitX>, run_kind: JobKind, result: JobResult) {
        let atom = match run_kind {
            JobKind::Start | JobKind::Verify => UnitRelationAtom::UnitAtomPropagateStartFailure,
            JobKind::Stop => UnitRelationAtom::UnitAtomPropagateStopFailure,
            _ => return, // nothing to fallback
        };

        for other in self.db.dep_gets_atom(unit, atom) {
            for info in self.jobs.get_unit_jobs(&other) {
                if !matches!(info.run_kind, JobKind::Start | JobKind::Verify) {
                    continue;
                }
                if self.jobs.finish_job(&info, result).is_some() {
                    self.stat.count_finish(result);
                    self.simulate_unit_notify(&info.unit, result, true);
                    self.fallback(&info.unit, info.run_kind, result);
                }
            }
        }
    }

    fn simulate_job_notify(&self, unit: &Rc<UnitX>, os: UnitActiveState, ns: UnitActiveState) {
        match (os, ns) {
            (
                UnitActiveState::InActive | UnitActiveState::Failed,
                UnitActiveState::Active | UnitActiveState::Activating,
            ) => self.do_notify(&JobConf::new(unit, JobKind::Start), None),
            (
                UnitActiveState::Active | UnitActiveState::Activating,
                UnitActiveState::InActive | UnitActiveState::DeActivating,
            ) => self.do_notify(&JobConf::new(unit, JobKind::Stop), None),
            _ => {} // do nothing
        }
    }

    fn simulate_unit_notify(&self, unit: &Rc<UnitX>, result: JobResult, inside: bool) {
        // OnFailure=
        if inside && result != JobResult::Done {
            if let JobMode::Fail = unit
                .get_config()
                .config_data()
                .borrow()
                .Unit
                .OnFailureJobMode
            {
                self.exec_on(
                    Rc::clone(unit),
                    UnitRelationAtom::UnitAtomOnFailure,
                    JobMode::Fail,
                );
            }
        }
    }

    fn unit_start_on(
        &self,
        unit: &Rc<UnitX>,
        os: UnitActiveState,
        ns: UnitActiveState,
        flags: UnitNotifyFlags,
    ) {
        // OnFailure=
        if ns != os
            && !flags.intersects(UnitNotifyFlags::WILL_AUTO_RESTART)
            && ns == UnitActiveState::Failed
        {
            let job_mode = unit
                .get_config()
                .config_data()
                .borrow()
                .Unit
                .OnFailureJobMode;
            self.exec_on(
                Rc::clone(unit),
                UnitRelationAtom::UnitAtomOnFailure,
                job_mode,
            );
        }

        // OnSuccess=
        if ns == UnitActiveState::InActive && !flags.intersects(UnitNotifyFlags::WILL_AUTO_RESTART)
        {
            match os {
                UnitActiveState::Failed
                | UnitActiveState::InActive
                | UnitActiveState::Maintenance => {}
                _ => {
                    let job_mode = unit
                        .get_config()
                        .config_data()
                        .borrow()
                        .Unit
                        .OnSuccessJobMode;
                    self.exec_on(
                        Rc::clone(unit),
                        UnitRelationAtom::UnitAtomOnSuccess,
                        job_mode,
                    );
                }
            };
        }
    }

    fn exec_on(&self, unit: Rc<UnitX>, atom: UnitRelationAtom, mode: JobMode) {
        for (config, mode) in notify::job_notify_result(&self.db, unit, atom, mode).iter() {
            if let Err(e) = self.exec(config, *mode, &mut JobAffect::new(false)) {
                log::debug!("Failed to enqueue follow-up job: {}", e);
            }
        }
    }

    fn do_notify(&self, config: &JobConf, mode_option: Option<JobMode>) {
        for (config, mode) in notify::job_notify_event(&self.db, config, mode_option).iter() {
            if let Err(e) = self.exec(config, *mode, &mut JobAffect::new(false)) {
                log::debug!("Failed to enqueue propagated job: {}", e);
            }
        }
    }
}

fn job_trans_check_input(config: &JobConf, mode: JobMode) -> Result<()> {
    let kind = config.get_kind();

    if mode == JobMode::Isolate && kind != JobKind::Start {
        return Err(Error::Input);
    }

    if mode == JobMode::Trigger && kind != JobKind::Stop {
        return Err(Error::Input);
    }

    Ok(())
}

fn job_trans_check_unit(config: &JobConf) -> Result<()> {
    let kind = config.get_kind();
    let unit = config.get_unit();

    if !unit.is_load_complete() {
        return Err(Error::Input);
    }

    // stopping something half-loaded is always legal, anything else
    // needs a valid load state
    if kind != JobKind::Stop {
        match unit.validate_load_state() {
            Ok(()) => (),
            Err(Error::UnitActionEBadR) => return Err(Error::BadRequest),
            Err(_) => return Err(Error::Input),
        }
    }

    if !entry::job_is_unit_applicable(kind, unit) {
        return Err(Error::Input);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::JobStage;
    use super::*;
    use crate::unit::test_utils;
    use crate::unit::DataManager;
    use core::unit::{UnitDependencyMask, UnitRelations};

    #[test]
    fn job_exec_input_check() {
        let (event, db, unit_test1, _unit_test2) = prepare_unit_multi(None);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));
        let mut affect = JobAffect::new(true);

        let conf = JobConf::new(&unit_test1, JobKind::Stop);
        let ret = jm.exec(&conf, JobMode::Isolate, &mut affect);
        assert!(ret.is_err());

        let conf = JobConf::new(&unit_test1, JobKind::Start);
        let ret = jm.exec(&conf, JobMode::Trigger, &mut affect);
        assert!(ret.is_err());
    }

    #[test]
    fn job_exec_single() {
        let (event, db, unit_test1, _unit_test2) = prepare_unit_multi(None);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));

        let mut affect = JobAffect::new(true);
        let conf = JobConf::new(&unit_test1, JobKind::Start);
        let ret = jm.exec(&conf, JobMode::Replace, &mut affect);
        assert!(ret.is_ok());
        assert_eq!(jm.data.jobs.len(), 1);
        assert_eq!(jm.data.jobs.ready_len(), 1);

        assert_eq!(affect.adds.len(), 1);
        let job_info = affect.adds.pop().unwrap();
        assert!(Rc::ptr_eq(&job_info.unit, &unit_test1));
        assert_eq!(job_info.kind, JobKind::Start);
        assert_eq!(job_info.run_kind, JobKind::Start);
        assert_eq!(job_info.stage, JobStage::Wait);
    }

    #[test]
    fn job_exec_merges_same_kind() {
        let (event, db, unit_test1, _unit_test2) = prepare_unit_multi(None);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));

        let conf = JobConf::new(&unit_test1, JobKind::Start);
        jm.exec(&conf, JobMode::Replace, &mut JobAffect::new(false))
            .unwrap();

        let mut affect = JobAffect::new(true);
        jm.exec(&conf, JobMode::Replace, &mut affect).unwrap();

        // still one job, the second request dissolved into it
        assert_eq!(jm.data.jobs.len(), 1);
        assert_eq!(affect.adds.len(), 0);
        assert_eq!(affect.updates.len(), 1);
    }

    #[test]
    fn job_exec_replace_conflicting() {
        let (event, db, unit_test1, _unit_test2) = prepare_unit_multi(None);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));

        let start = JobConf::new(&unit_test1, JobKind::Start);
        jm.exec(&start, JobMode::Replace, &mut JobAffect::new(false))
            .unwrap();

        // fail mode defends the queued start
        let stop = JobConf::new(&unit_test1, JobKind::Stop);
        let ret = jm.exec(&stop, JobMode::Fail, &mut JobAffect::new(false));
        assert!(ret.is_err());
        assert!(jm.has_start_like_job(&unit_test1));

        // replace mode displaces it
        let mut affect = JobAffect::new(true);
        jm.exec(&stop, JobMode::Replace, &mut affect).unwrap();
        assert_eq!(affect.adds.len(), 1);
        assert_eq!(affect.dels.len(), 1);
        assert_eq!(jm.data.jobs.len(), 1);
        assert!(!jm.has_start_like_job(&unit_test1));
    }

    #[test]
    fn job_gc_collects_queued_jobs() {
        let (event, db, unit_test1, _unit_test2) = prepare_unit_multi(None);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));

        let conf = JobConf::new(&unit_test1, JobKind::Start);
        jm.exec(&conf, JobMode::Replace, &mut JobAffect::new(false))
            .unwrap();
        assert!(jm.has_job(&unit_test1));

        // nothing is running for the unit, the queued job goes with it
        assert!(jm.gc_unit_jobs(&unit_test1));
        assert!(!jm.has_job(&unit_test1));
        assert_eq!(jm.data.jobs.len(), 0);
    }

    #[test]
    fn job_try_finish_async() {
        let (event, db, unit_test1, _unit_test2) = prepare_unit_multi(None);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));
        let os = UnitActiveState::InActive;
        let ns = UnitActiveState::Active;
        let flags = UnitNotifyFlags::empty();

        let ret = jm.try_finish(&unit_test1, os, ns, flags);
        assert!(ret.is_ok());
    }

    #[test]
    fn job_try_finish_sync() {
        let (event, db, unit_test1, _unit_test2) = prepare_unit_multi(None);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));
        let os = UnitActiveState::InActive;
        let ns = UnitActiveState::Active;
        let flags = UnitNotifyFlags::empty();

        *jm.data.text.borrow_mut() = None; // reset every time
        *jm.data.running.borrow_mut() = true;
        let ret = jm.try_finish(&unit_test1, os, ns, flags);
        *jm.data.running.borrow_mut() = false;
        assert!(ret.is_ok());
        assert!(jm.data.text.borrow().is_some());
        let (u, o, n, f) = jm.data.text.take().unwrap();
        assert_eq!(u.id(), unit_test1.id());
        assert_eq!(o, os);
        assert_eq!(n, ns);
        assert_eq!(f, flags);
    }

    #[test]
    fn job_run_finish_single() {
        let (event, db, unit_test1, _unit_test2) = prepare_unit_multi(None);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));

        let conf = JobConf::new(&unit_test1, JobKind::Nop);
        jm.exec(&conf, JobMode::Replace, &mut JobAffect::new(false))
            .unwrap();
        assert_eq!(jm.data.jobs.len(), 1);
        assert_eq!(jm.data.jobs.ready_len(), 1);

        jm.data.run(None);
        assert_eq!(jm.data.jobs.len(), 0);
        assert_eq!(jm.data.jobs.ready_len(), 0);
    }

    #[test]
    fn job_run_finish_multi() {
        let (event, db, unit_test1, unit_test2) = prepare_unit_multi(None);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));

        let conf1 = JobConf::new(&unit_test1, JobKind::Nop);
        jm.exec(&conf1, JobMode::Replace, &mut JobAffect::new(false))
            .unwrap();
        let conf2 = JobConf::new(&unit_test2, JobKind::Nop);
        jm.exec(&conf2, JobMode::Replace, &mut JobAffect::new(false))
            .unwrap();
        assert_eq!(jm.data.jobs.len(), 2);
        assert_eq!(jm.data.jobs.ready_len(), 2);

        jm.data.run(None);
        assert_eq!(jm.data.jobs.len(), 0);
        assert_eq!(jm.data.jobs.ready_len(), 0);
    }

    #[test]
    fn job_run_unit_finish_single() {
        let (event, db, unit_test1, unit_test2) = prepare_unit_multi(None);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));

        let conf = JobConf::new(&unit_test1, JobKind::Nop);
        jm.exec(&conf, JobMode::Replace, &mut JobAffect::new(false))
            .unwrap();
        assert_eq!(jm.data.jobs.len(), 1);
        assert_eq!(jm.data.jobs.ready_len(), 1);

        jm.data.run(Some(&unit_test2));
        assert_eq!(jm.data.jobs.len(), 1);
        assert_eq!(jm.data.jobs.ready_len(), 1);

        jm.data.run(Some(&unit_test1));
        assert_eq!(jm.data.jobs.len(), 0);
        assert_eq!(jm.data.jobs.ready_len(), 0);
    }

    #[test]
    fn job_run_unit_finish_multi() {
        let (event, db, unit_test1, unit_test2) = prepare_unit_multi(None);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));

        let conf1 = JobConf::new(&unit_test1, JobKind::Nop);
        jm.exec(&conf1, JobMode::Replace, &mut JobAffect::new(false))
            .unwrap();
        let conf2 = JobConf::new(&unit_test2, JobKind::Nop);
        jm.exec(&conf2, JobMode::Replace, &mut JobAffect::new(false))
            .unwrap();
        assert_eq!(jm.data.jobs.len(), 2);
        assert_eq!(jm.data.jobs.ready_len(), 2);

        jm.data.run(Some(&unit_test2));
        assert_eq!(jm.data.jobs.len(), 1);
        assert_eq!(jm.data.jobs.ready_len(), 1);

        jm.data.run(Some(&unit_test1));
        assert_eq!(jm.data.jobs.len(), 0);
        assert_eq!(jm.data.jobs.ready_len(), 0);
    }

    #[test]
    fn job_remove_unit() {
        let (event, db, unit_test1, unit_test2) = prepare_unit_multi(None);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));
        let mut affect = JobAffect::new(true);

        let conf = JobConf::new(&unit_test1, JobKind::Start);
        let ret = jm.exec(&conf, JobMode::Replace, &mut affect);
        assert!(ret.is_ok());
        assert_eq!(jm.data.jobs.len(), 1);
        let conf = JobConf::new(&unit_test2, JobKind::Start);
        let ret = jm.exec(&conf, JobMode::Replace, &mut affect);
        assert!(ret.is_ok());
        assert_eq!(jm.data.jobs.len(), 2);

        jm.data.remove_unit(&unit_test2);
        assert_eq!(jm.data.jobs.len(), 1);
        jm.data.remove_unit(&unit_test1);
        assert_eq!(jm.data.jobs.len(), 0);
    }

    #[test]
    fn job_exec_related() {
        let relation = Some(UnitRelations::UnitRequires);
        let (event, db, unit_test1, _unit_test2) = prepare_unit_multi(relation);
        let jm = JobManager::new(&event, &db, &Rc::new(DataManager::new()));

        let mut affect = JobAffect::new(true);
        let conf = JobConf::new(&unit_test1, JobKind::Start);
        let ret = jm.exec(&conf, JobMode::Replace, &mut affect);
        assert!(ret.is_ok());

        // only the requested job is recorded here
        assert_eq!(jm.data.jobs.len(), 1);
        assert_eq!(jm.data.jobs.ready_len(), 1);
        assert_eq!(affect.adds.len(), 1);
        let job_info = affect.adds.pop().unwrap();
        assert!(Rc::ptr_eq(&job_info.unit, &unit_test1));
        assert_eq!(job_info.kind, JobKind::Start);
    }

    fn prepare_unit_multi(
        relation: Option<UnitRelations>,
    ) -> (Rc<Events>, Rc<UnitDb>, Rc<UnitX>, Rc<UnitX>) {
        let event = Rc::new(Events::new().unwrap());
        let dm = Rc::new(DataManager::new());
        let db = Rc::new(UnitDb::new());
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);

        db.units_insert(name_test1, Rc::clone(&unit_test1));
        db.units_insert(name_test2, Rc::clone(&unit_test2));
        if let Some(r) = relation {
            let u1 = Rc::clone(&unit_test1);
            let u2 = Rc::clone(&unit_test2);
            db.dep_insert(u1, r, u2, true, UnitDependencyMask::FILE)
                .unwrap();
        }
        (event, db, unit_test1, unit_test2)
    }

    fn create_unit(dmr: &Rc<DataManager>, name: &str) -> Rc<UnitX> {
        log::init_log_to_console("create_unit", log::Level::Trace);
        log::info!("test");

        let unit = test_utils::create_unit_for_test_pub(dmr, name);
        unit.load().expect("load error");
        unit
    }
}
