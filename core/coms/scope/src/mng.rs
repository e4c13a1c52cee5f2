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

//! is the core of the scope unit
//!
use super::comm::ScopeUnitComm;
use core::error::*;
use core::unit::{UnitActiveState, UnitNotifyFlags};
use nix::sys::signal::{self, Signal};
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use std::fmt;
use std::str::FromStr;
use std::{cell::RefCell, rc::Rc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ScopeState {
    Dead,
    Running,
    Abandoned,
    StopSigterm,
    StopSigkill,
    Failed,
    StateMax,
}

impl ScopeState {
    fn to_unit_state(self) -> UnitActiveState {
        match self {
            ScopeState::Dead | ScopeState::StateMax => UnitActiveState::InActive,
            ScopeState::Running | ScopeState::Abandoned => UnitActiveState::Active,
            ScopeState::StopSigterm | ScopeState::StopSigkill => UnitActiveState::DeActivating,
            ScopeState::Failed => UnitActiveState::Failed,
        }
    }
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScopeState::Dead | ScopeState::StateMax => "dead",
            ScopeState::Running => "running",
            ScopeState::Abandoned => "abandoned",
            ScopeState::StopSigterm => "stop-sigterm",
            ScopeState::StopSigkill => "stop-sigkill",
            ScopeState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ScopeState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dead" => Ok(ScopeState::Dead),
            "running" => Ok(ScopeState::Running),
            "abandoned" => Ok(ScopeState::Abandoned),
            "stop-sigterm" => Ok(ScopeState::StopSigterm),
            "stop-sigkill" => Ok(ScopeState::StopSigkill),
            "failed" => Ok(ScopeState::Failed),
            _ => Err(Error::InvalidData),
        }
    }
}

pub(super) struct ScopeMng {
    comm: Rc<ScopeUnitComm>,
    state: RefCell<ScopeState>,
    pids: RefCell<Vec<Pid>>,
}

impl ScopeMng {
    pub(super) fn new(_comm: &Rc<ScopeUnitComm>) -> Self {
        ScopeMng {
            comm: Rc::clone(_comm),
            state: RefCell::new(ScopeState::StateMax),
            pids: RefCell::new(Vec::new()),
        }
    }

    /// take over one externally created process, duplicates are ignored
    pub(super) fn add_pid(&self, pid: Pid) {
        let mut pids = self.pids.borrow_mut();
        if !pids.contains(&pid) {
            pids.push(pid);
        }
    }

    pub(super) fn pids(&self) -> Vec<Pid> {
        self.pids.borrow().clone()
    }

    pub(super) fn has_live_pids(&self) -> bool {
        self.pids.borrow().iter().any(|p| basic::process::alive(*p))
    }

    pub(super) fn start_check(&self) -> Result<()> {
        if matches!(
            self.state(),
            ScopeState::Running | ScopeState::Abandoned | ScopeState::StopSigterm
        ) {
            return Err(Error::UnitActionEAgain);
        }
        if self.pids.borrow().is_empty() {
            // a scope without processes has nothing to track
            return Err(Error::UnitActionENoent);
        }
        Ok(())
    }

    pub(super) fn start_action(&self, notify: bool) -> Result<()> {
        self.pids.borrow_mut().retain(|p| basic::process::alive(*p));
        if self.pids.borrow().is_empty() {
            return Err(Error::UnitActionENoent);
        }

        self.watch_pids();
        self.set_state(ScopeState::Running, notify);
        Ok(())
    }

    pub(super) fn stop_check(&self) -> Result<()> {
        if matches!(self.state(), ScopeState::Dead | ScopeState::StateMax) {
            return Err(Error::UnitActionEAgain);
        }
        Ok(())
    }

    pub(super) fn stop_action(&self, notify: bool) {
        let mut any = false;
        for pid in self.pids.borrow().iter() {
            if !basic::process::alive(*pid) {
                continue;
            }
            any = true;
            if let Err(e) = signal::kill(*pid, Signal::SIGTERM) {
                log::warn!("Failed to send SIGTERM to {}: {}", pid, e);
            }
        }

        if any {
            self.set_state(ScopeState::StopSigterm, notify);
        } else {
            self.release_pids();
            self.set_state(ScopeState::Dead, notify);
        }
    }

    /// the manager stops caring about the processes without killing them
    pub(super) fn abandon(&self) -> Result<()> {
        if self.state() != ScopeState::Running {
            return Err(Error::UnitActionEAgain);
        }
        self.set_state(ScopeState::Abandoned, true);
        Ok(())
    }

    pub(super) fn sigchld_event(&self, wait_status: WaitStatus) {
        let pid = match wait_status.pid() {
            Some(pid) => pid,
            None => return,
        };

        let um = self.comm.um();
        um.child_unwatch_pid(&self.comm.owner_id(), pid);
        self.pids.borrow_mut().retain(|p| *p != pid);

        if !self.pids.borrow().is_empty() {
            return;
        }

        // the last tracked process is gone
        let next = match self.state() {
            ScopeState::StopSigterm | ScopeState::StopSigkill => ScopeState::Dead,
            ScopeState::Running | ScopeState::Abandoned => match wait_status {
                WaitStatus::Exited(_, 0) => ScopeState::Dead,
                WaitStatus::Exited(_, _) | WaitStatus::Signaled(_, _, _) => ScopeState::Failed,
                _ => ScopeState::Dead,
            },
            other => other,
        };
        self.set_state(next, true);
    }

    /// a scope with live processes must not be collected
    pub(super) fn may_gc(&self) -> bool {
        !self.has_live_pids()
    }

    /// re-register the pid watches after deserialization
    pub(super) fn coldplug(&self) {
        self.pids.borrow_mut().retain(|p| basic::process::alive(*p));
        self.watch_pids();
    }

    /// reconcile with exits missed while the manager was not watching
    pub(super) fn catchup(&self) {
        if matches!(self.state(), ScopeState::Running | ScopeState::Abandoned)
            && !self.has_live_pids()
        {
            self.release_pids();
            self.set_state(ScopeState::Dead, true);
        }
    }

    pub(super) fn get_state(&self) -> String {
        let state = *self.state.borrow();
        state.to_string()
    }

    pub(super) fn state(&self) -> ScopeState {
        *self.state.borrow()
    }

    pub(super) fn to_unit_state(&self) -> UnitActiveState {
        self.state().to_unit_state()
    }

    pub(super) fn set_state(&self, new_state: ScopeState, notify: bool) {
        let old_state = self.state();
        self.state.replace(new_state);

        if notify {
            self.state_notify(new_state, old_state);
        }
    }

    fn watch_pids(&self) {
        let um = self.comm.um();
        let id = self.comm.owner_id();
        for pid in self.pids.borrow().iter() {
            um.child_watch_pid(&id, *pid, false);
        }
    }

    fn release_pids(&self) {
        let um = self.comm.um();
        let id = self.comm.owner_id();
        for pid in self.pids.borrow().iter() {
            um.child_unwatch_pid(&id, *pid);
        }
        self.pids.borrow_mut().clear();
    }

    fn state_notify(&self, new_state: ScopeState, old_state: ScopeState) {
        if let Some(unit) = self.comm.owner() {
            if new_state != old_state {
                log::debug!(
                    "{} original state[{:?}] ->new state[{:?}]",
                    unit.id(),
                    old_state,
                    new_state,
                );
            }
            unit.notify(
                old_state.to_unit_state(),
                new_state.to_unit_state(),
                UnitNotifyFlags::EMPTY,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_state_round_trip() {
        for state in [
            ScopeState::Dead,
            ScopeState::Running,
            ScopeState::Abandoned,
            ScopeState::StopSigterm,
            ScopeState::StopSigkill,
            ScopeState::Failed,
        ] {
            assert_eq!(ScopeState::from_str(&state.to_string()).unwrap(), state);
        }
        assert!(ScopeState::from_str("bogus").is_err());
    }

    #[test]
    fn test_scope_start_check_requires_pids() {
        let comm = Rc::new(ScopeUnitComm::new());
        let mng = ScopeMng::new(&comm);
        assert!(mng.start_check().is_err());

        mng.add_pid(Pid::from_raw(1));
        assert!(mng.start_check().is_ok());
    }

    #[test]
    fn test_scope_add_pid_dedup() {
        let comm = Rc::new(ScopeUnitComm::new());
        let mng = ScopeMng::new(&comm);
        mng.add_pid(Pid::from_raw(7));
        mng.add_pid(Pid::from_raw(7));
        assert_eq!(mng.pids().len(), 1);
    }

    #[test]
    fn test_scope_state_mapping() {
        assert_eq!(
            ScopeState::Abandoned.to_unit_state(),
            UnitActiveState::Active
        );
        assert_eq!(
            ScopeState::StopSigterm.to_unit_state(),
            UnitActiveState::DeActivating
        );
        assert_eq!(ScopeState::Failed.to_unit_state(), UnitActiveState::Failed);
    }
}
