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

use super::entry::{Job, JobKind, JobResult, JobStage};
use crate::unit::{JobMode, UnitX};
use core::error::*;
use std::cell::RefCell;
use std::rc::Rc;

/// What installing a job into an occupied slot did with the old one.
pub(super) enum JobInstall {
    Installed(Rc<Job>),
    Merged(Rc<Job>),
    Replaced(Rc<Job>, Rc<Job>), // (new, cancelled old)
}

/// The jobs of one unit. A unit holds at most one state-changing job at a
/// time, plus an independent nop job which conflicts with nothing.
pub(super) struct JobSlot {
    data: RefCell<JobSlotData>,
}

impl JobSlot {
    pub(super) fn new(unit: Rc<UnitX>) -> JobSlot {
        JobSlot {
            data: RefCell::new(JobSlotData {
                unit,
                job: None,
                nop: None,
                blocked: false,
                retrigger: false,
            }),
        }
    }

    /// Install a freshly allocated job. The previous occupant is merged
    /// into, replaced, or defended depending on the mode.
    pub(super) fn install(&self, new: Rc<Job>, mode: JobMode) -> Result<JobInstall> {
        assert!(new.get_stage() == JobStage::Init);
        self.data.borrow_mut().install(new, mode)
    }

    /// The job to run next, if any. A waiting job goes first; a running
    /// one is handed out again only when it asked to be re-triggered.
    pub(super) fn next_runnable(&self) -> Option<Rc<Job>> {
        self.data.borrow().next_runnable()
    }

    pub(super) fn mark_popped(&self) {
        self.data.borrow_mut().retrigger = false;
    }

    /// The trigger ran into a transient condition. Hold the slot back
    /// until an ordered peer finishes and resumes it.
    pub(super) fn retrigger_wait(&self) {
        let mut data = self.data.borrow_mut();
        data.retrigger = true;
        data.blocked = true;
    }

    pub(super) fn block(&self) {
        self.data.borrow_mut().blocked = true;
    }

    pub(super) fn resume(&self) -> bool {
        let mut data = self.data.borrow_mut();
        let was = data.blocked;
        data.blocked = false;
        was
    }

    /// Finish the given job. Returns the job when it really left the
    /// slot; a restart flipping from stop to start stays and re-arms.
    pub(super) fn finish(&self, job: &Rc<Job>, result: JobResult) -> Option<Rc<Job>> {
        self.data.borrow_mut().finish(job, result)
    }

    /// Cancel everything not running yet.
    pub(super) fn flush_waiting(&self, result: JobResult) -> Vec<Rc<Job>> {
        self.data.borrow_mut().flush_waiting(result)
    }

    pub(super) fn get_job(&self) -> Option<Rc<Job>> {
        self.data.borrow().job.clone()
    }

    pub(super) fn get_nop(&self) -> Option<Rc<Job>> {
        self.data.borrow().nop.clone()
    }

    pub(super) fn get_running(&self) -> Option<Rc<Job>> {
        let data = self.data.borrow();
        data.job
            .as_ref()
            .filter(|j| j.get_stage() == JobStage::Running)
            .map(Rc::clone)
    }

    pub(super) fn jobs(&self) -> Vec<Rc<Job>> {
        let data = self.data.borrow();
        data.job.iter().chain(data.nop.iter()).map(Rc::clone).collect()
    }

    pub(super) fn get_unit(&self) -> Rc<UnitX> {
        Rc::clone(&self.data.borrow().unit)
    }

    pub(super) fn is_empty(&self) -> bool {
        let data = self.data.borrow();
        data.job.is_none() && data.nop.is_none()
    }

    pub(super) fn is_blocked(&self) -> bool {
        self.data.borrow().blocked
    }

    pub(super) fn ready_len(&self) -> usize {
        let data = self.data.borrow();
        if data.blocked {
            return 0;
        }
        data.next_runnable().is_some().into()
    }
}

struct JobSlotData {
    unit: Rc<UnitX>,

    job: Option<Rc<Job>>, // start|stop|reload|restart|verify, waiting or running
    nop: Option<Rc<Job>>,

    blocked: bool,   // an ordered peer must go first
    retrigger: bool, // the running trigger wants another round
}

impl JobSlotData {
    fn install(&mut self, new: Rc<Job>, mode: JobMode) -> Result<JobInstall> {
        assert!(new.is_basic_op());

        if new.kind() == JobKind::Nop {
            if let Some(old) = &self.nop {
                old.merge_attr(&new);
                return Ok(JobInstall::Merged(Rc::clone(old)));
            }
            new.wait();
            self.nop = Some(Rc::clone(&new));
            return Ok(JobInstall::Installed(new));
        }

        match self.job.take() {
            None => {
                new.wait();
                self.job = Some(Rc::clone(&new));
                Ok(JobInstall::Installed(new))
            }
            Some(old) => {
                if old.kind() == new.kind() && old.get_stage() == JobStage::Wait {
                    old.merge_attr(&new);
                    self.job = Some(Rc::clone(&old));
                    return Ok(JobInstall::Merged(old));
                }

                // an irreversible transition defends its slot, and in fail
                // mode nothing may be displaced at all
                if mode == JobMode::Fail || old.attr().irreversible {
                    self.job = Some(old);
                    return Err(Error::Conflict);
                }

                log::debug!(
                    "Replacing {} job of {} with {}",
                    old.kind(),
                    self.unit.id(),
                    new.kind()
                );
                old.finish(JobResult::Cancelled);
                self.retrigger = false;
                new.wait();
                self.job = Some(Rc::clone(&new));
                Ok(JobInstall::Replaced(new, old))
            }
        }
    }

    fn next_runnable(&self) -> Option<Rc<Job>> {
        if let Some(job) = &self.job {
            return match job.get_stage() {
                JobStage::Wait => Some(Rc::clone(job)),
                JobStage::Running if self.retrigger => Some(Rc::clone(job)),
                _ => None,
            };
        }
        self.nop
            .as_ref()
            .filter(|j| j.get_stage() == JobStage::Wait)
            .map(Rc::clone)
    }

    fn finish(&mut self, job: &Rc<Job>, result: JobResult) -> Option<Rc<Job>> {
        if self
            .nop
            .as_ref()
            .map(|j| j.get_id() == job.get_id())
            .unwrap_or(false)
        {
            let nop = self.nop.take().unwrap();
            nop.finish(result);
            return Some(nop);
        }

        let owned = match self.job.take() {
            Some(j) if j.get_id() == job.get_id() => j,
            other => {
                self.job = other;
                return None;
            }
        };

        if owned.finish(result) {
            // restart moved on to its start phase
            self.retrigger = true;
            self.blocked = false;
            self.job = Some(owned);
            return None;
        }

        self.retrigger = false;
        Some(owned)
    }

    fn flush_waiting(&mut self, result: JobResult) -> Vec<Rc<Job>> {
        let mut dels = Vec::new();

        if let Some(job) = &self.job {
            if job.get_stage() == JobStage::Wait {
                let job = self.job.take().unwrap();
                job.finish(result);
                dels.push(job);
            }
        }
        if let Some(nop) = self.nop.take() {
            nop.finish(result);
            dels.push(nop);
        }

        dels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::test_utils;
    use crate::unit::DataManager;
    use event::Events;

    fn prepare_unit() -> Rc<UnitX> {
        log::init_log_to_console("job_slot", log::Level::Trace);
        let dm = Rc::new(DataManager::new());
        test_utils::create_unit_for_test_pub(&dm, "test1.target")
    }

    fn new_job(unit: &Rc<UnitX>, id: u128, kind: JobKind) -> Rc<Job> {
        Rc::new(Job::new(
            &Rc::new(Events::new().unwrap()),
            &Rc::new(DataManager::new()),
            id,
            Rc::clone(unit),
            kind,
        ))
    }

    #[test]
    fn slot_install_and_merge() {
        let unit = prepare_unit();
        let slot = JobSlot::new(Rc::clone(&unit));

        let start = new_job(&unit, 1, JobKind::Start);
        assert!(matches!(
            slot.install(Rc::clone(&start), JobMode::Replace),
            Ok(JobInstall::Installed(_))
        ));
        assert_eq!(slot.get_job().unwrap().get_id(), 1);

        // a second start folds into the waiting one
        let again = new_job(&unit, 2, JobKind::Start);
        assert!(matches!(
            slot.install(again, JobMode::Replace),
            Ok(JobInstall::Merged(_))
        ));
        assert_eq!(slot.get_job().unwrap().get_id(), 1);
        assert_eq!(slot.jobs().len(), 1);
    }

    #[test]
    fn slot_replace_and_fail_mode() {
        let unit = prepare_unit();
        let slot = JobSlot::new(Rc::clone(&unit));

        let start = new_job(&unit, 1, JobKind::Start);
        slot.install(start, JobMode::Replace).unwrap();

        // fail mode refuses to displace the waiting start
        let stop = new_job(&unit, 2, JobKind::Stop);
        assert!(slot.install(stop, JobMode::Fail).is_err());
        assert_eq!(slot.get_job().unwrap().get_id(), 1);

        // replace mode cancels it
        let stop = new_job(&unit, 3, JobKind::Stop);
        match slot.install(stop, JobMode::Replace).unwrap() {
            JobInstall::Replaced(new, old) => {
                assert_eq!(new.get_id(), 3);
                assert_eq!(old.get_id(), 1);
                assert_eq!(old.get_stage(), JobStage::End(JobResult::Cancelled));
            }
            _ => panic!("expected a replacement"),
        }
    }

    #[test]
    fn slot_irreversible_defends() {
        let unit = prepare_unit();
        let slot = JobSlot::new(Rc::clone(&unit));

        let stop = new_job(&unit, 1, JobKind::Stop);
        stop.init_attr(JobMode::ReplaceIrreversible);
        slot.install(stop, JobMode::ReplaceIrreversible).unwrap();

        let start = new_job(&unit, 2, JobKind::Start);
        assert!(slot.install(start, JobMode::Replace).is_err());
        assert_eq!(slot.get_job().unwrap().get_id(), 1);
    }

    #[test]
    fn slot_nop_is_independent() {
        let unit = prepare_unit();
        let slot = JobSlot::new(Rc::clone(&unit));

        let start = new_job(&unit, 1, JobKind::Start);
        slot.install(start, JobMode::Replace).unwrap();
        let nop = new_job(&unit, 2, JobKind::Nop);
        slot.install(nop, JobMode::Fail).unwrap();

        assert_eq!(slot.jobs().len(), 2);
        // the state-changing job runs first
        assert_eq!(slot.next_runnable().unwrap().get_id(), 1);
    }

    #[test]
    fn slot_finish_releases() {
        let unit = prepare_unit();
        let slot = JobSlot::new(Rc::clone(&unit));

        let start = new_job(&unit, 1, JobKind::Start);
        slot.install(Rc::clone(&start), JobMode::Replace).unwrap();
        assert_eq!(slot.ready_len(), 1);

        let del = slot.finish(&start, JobResult::Done);
        assert!(del.is_some());
        assert!(slot.is_empty());
        assert_eq!(slot.ready_len(), 0);
    }

    #[test]
    fn slot_flush_spares_running() {
        let unit = prepare_unit();
        let slot = JobSlot::new(Rc::clone(&unit));

        let start = new_job(&unit, 1, JobKind::Start);
        slot.install(Rc::clone(&start), JobMode::Replace).unwrap();
        let nop = new_job(&unit, 2, JobKind::Nop);
        slot.install(nop, JobMode::Replace).unwrap();

        // nothing running yet, both go
        let dels = slot.flush_waiting(JobResult::Cancelled);
        assert_eq!(dels.len(), 2);
        assert!(slot.is_empty());
    }
}
